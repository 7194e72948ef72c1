//! C8: the entry point consumed by the outer system. Recognizes a
//! specifier, constructs a session, and produces a [`Manifest`].

use std::path::Path;

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use tracing::info;

use gitpin_types::{GitUrl, Protocol};

use crate::capability::has_archive_capability;
use crate::config::Config;
use crate::error::GitpinError;
use crate::manifest::{Manifest, RemoteInfo};
use crate::process::GitRunner;
use crate::recognize::{is_git_pattern, normalize};
use crate::session::Session;

/// A previously-resolved lockfile entry, replayed unchanged when present.
/// An idempotent short circuit so a repeat resolve doesn't re-hit the
/// network for a specifier already pinned in a lockfile.
pub trait LockfileEntry {
    fn git_manifest_for(&self, specifier: &str) -> Option<Manifest>;
}

/// No-op lockfile: always misses. Callers that don't have a lockfile layer
/// can pass `&NoLockfile` to [`resolve`].
pub struct NoLockfile;

impl LockfileEntry for NoLockfile {
    fn git_manifest_for(&self, _specifier: &str) -> Option<Manifest> {
        None
    }
}

/// Resolves `specifier` against `registry_filenames` (tried in order, first
/// hit wins) and returns a decorated [`Manifest`].
pub async fn resolve(
    specifier: &str,
    registry_filenames: &[&str],
    config: &Config,
    lockfile: &dyn LockfileEntry,
) -> Result<Manifest, GitpinError> {
    if let Some(manifest) = lockfile.git_manifest_for(specifier) {
        return Ok(manifest);
    }

    if !is_git_pattern(specifier) {
        return Err(GitpinError::Validation(specifier.to_string()));
    }

    let (git_url, user_hash) = normalize(specifier)?;
    let git_url = apply_hosted_fast_path(&git_url, config).await?;

    resolve_normalized(git_url, user_hash, registry_filenames, config).await
}

/// The "HostedGit" fast-path: if the remote's SSH form supports server-side
/// `git archive`, rewrite to that SSH URL up front so the plain resolver
/// below never has to clone. Only applies to specifiers that recognized a
/// known hosted provider; everything else passes through unchanged.
async fn apply_hosted_fast_path(git_url: &GitUrl, config: &Config) -> Result<GitUrl, GitpinError> {
    if config.offline {
        return Ok(git_url.clone());
    }

    let Some(hosted) = &git_url.hosted_git else {
        return Ok(git_url.clone());
    };

    let ssh_repository = format!(
        "ssh://git@{}/{}/{}.git",
        hosted.provider.default_host(),
        hosted.fragment.user,
        hosted.fragment.repo,
    );
    let ssh_url = GitUrl {
        protocol: Protocol::Ssh,
        hostname: Some(hosted.provider.default_host().to_string()),
        repository: ssh_repository,
        hosted_git: Some(hosted.clone()),
    };

    let runner = match config.ssh_command() {
        Some(command) => GitRunner::with_ssh_command(command),
        None => GitRunner::new(),
    };
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    if has_archive_capability(&runner, &ssh_url, now).await {
        Ok(ssh_url)
    } else {
        Ok(git_url.clone())
    }
}

async fn resolve_normalized(
    git_url: GitUrl,
    user_hash: String,
    registry_filenames: &[&str],
    config: &Config,
) -> Result<Manifest, GitpinError> {
    let mut session = Session::new(config.clone(), git_url.clone(), user_hash);
    let hash = session.init().await?;
    let hash_str = hash.to_string();

    info!(repository = %git_url.repository, commit = %hash_str, "resolved git source");

    for filename in registry_filenames {
        if let Some(text) = session.get_file(filename).await? {
            let value: Value = serde_json::from_str(&text)?;
            let fields = match value {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other);
                    map
                }
            };
            let remote = remote_info(&git_url, &hash_str, Some((*filename).to_string()));
            return Ok(Manifest::from_registry_file(fields, hash_str, remote));
        }
    }

    let name = guess_name(&git_url.repository);
    let remote = remote_info(&git_url, &hash_str, None);
    Ok(Manifest::synthesize(name, hash_str, remote))
}

fn remote_info(git_url: &GitUrl, hash: &str, registry: Option<String>) -> RemoteInfo {
    RemoteInfo {
        resolved: format!("{}#{hash}", git_url.repository),
        kind: "git".to_string(),
        reference: git_url.repository.clone(),
        hash: hash.to_string(),
        registry,
    }
}

/// Guesses a package name from a repository URL's final path segment,
/// stripping `.git` and percent-decoding.
fn guess_name(repository: &str) -> String {
    let last_segment = Path::new(repository)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(repository);
    let without_git = last_segment.strip_suffix(".git").unwrap_or(last_segment);
    percent_decode_str(without_git).decode_utf8_lossy().into_owned()
}
