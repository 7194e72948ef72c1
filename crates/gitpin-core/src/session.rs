//! C7: a stateful handle for one remote across the lifetime of a resolve
//! call: init, fetch-or-clone, ref-lookup, archive/clone-to-destination,
//! read-one-file.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::str::FromStr;

use gitpin_types::{GitOid, GitUrl, Refs, RepositoryUrl, VersionResolution};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::capability;
use crate::config::Config;
use crate::error::{GitpinError, NotFoundError};
use crate::lockqueue;
use crate::process::GitRunner;
use crate::refs::parse_refs;
use crate::secure::secure_git_url;
use crate::sink;
use crate::version::{resolve_version, CommitResolver};

const DID_NOT_MATCH_ANY_FILES: &str = "did not match any files";

fn cwd_for(repository: &str) -> String {
    let digest = Sha256::digest(repository.as_bytes());
    hex::encode(digest)
}

/// A live handle to one remote, constructed after C3 normalization.
/// `git_url` and `user_hash` are fixed at construction; `reference`, `refs`,
/// `supports_archive`, and `fetched` populate as `init()` progresses.
pub struct Session {
    config: Config,
    runner: GitRunner,
    git_url: GitUrl,
    user_hash: String,
    secured_url: Option<GitUrl>,
    refs: Refs,
    hash: Option<GitOid>,
    reference: Option<String>,
    supports_archive: bool,
    fetched: bool,
}

impl Session {
    pub fn new(config: Config, git_url: GitUrl, user_hash: impl Into<String>) -> Self {
        let runner = match config.ssh_command() {
            Some(command) => GitRunner::with_ssh_command(command),
            None => GitRunner::new(),
        };
        Self {
            config,
            runner,
            git_url,
            user_hash: user_hash.into(),
            secured_url: None,
            refs: Refs::new(),
            hash: None,
            reference: None,
            supports_archive: false,
            fetched: false,
        }
    }

    fn cwd(&self) -> PathBuf {
        self.config.temp_root().join(cwd_for(&self.secured_repository()))
    }

    fn secured_repository(&self) -> String {
        self.secured_url
            .as_ref()
            .unwrap_or(&self.git_url)
            .repository
            .clone()
    }

    fn repository_key(&self) -> Result<RepositoryUrl, GitpinError> {
        Ok(RepositoryUrl::parse(&self.secured_repository())?)
    }

    /// Orchestrates `securing -> listing-refs -> resolving -> probing ->
    /// (archive-ready | cloned)`. Returns the resolved 40-hex commit.
    ///
    /// In `Config::offline` mode, no subprocess is allowed to touch the
    /// network: the repository's ref table and default branch are read from
    /// an already-populated working directory instead of `ls-remote`, and
    /// archive capability is never probed (there is no remote to probe).
    #[instrument(skip(self), fields(repository = %self.git_url.repository))]
    pub async fn init(&mut self) -> Result<GitOid, GitpinError> {
        if self.config.offline {
            return self.init_offline().await;
        }

        let secured = secure_git_url(&self.runner, &self.config, self.git_url.clone(), &self.user_hash).await?;
        self.secured_url = Some(secured.clone());

        let ls_remote_out = self
            .runner
            .run_buffered(&["ls-remote", "--tags", "--heads", &secured.repository], None)
            .await?;
        self.refs = parse_refs(&ls_remote_out);

        let resolution = resolve_version(&self.user_hash, &self.refs, &*self).await?;
        match resolution {
            VersionResolution::DefaultBranch => {
                let (reference, sha) = self.resolve_default_branch().await?;
                self.reference = reference;
                self.hash = Some(sha);
            }
            other => self.apply_resolution(other, &secured.repository)?,
        }

        if self.reference.as_deref().is_some_and(|r| !r.is_empty()) {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            self.supports_archive = capability::has_archive_capability(&self.runner, &secured, now).await;
        }

        if !self.supports_archive {
            self.fetch().await?;
        }

        Ok(self.hash.expect("set above"))
    }

    async fn init_offline(&mut self) -> Result<GitOid, GitpinError> {
        self.secured_url = Some(self.git_url.clone());
        let cwd = self.cwd();
        if !cwd.exists() {
            return Err(GitpinError::Other(format!(
                "offline mode: no cached working copy for `{}`",
                self.git_url.repository
            )));
        }

        let refs_out = self
            .runner
            .run_buffered(
                &["for-each-ref", "--format=%(objectname) %(refname)", "refs/tags", "refs/heads"],
                Some(&cwd),
            )
            .await?;
        self.refs = parse_refs(&refs_out);

        let resolution = resolve_version(&self.user_hash, &self.refs, &*self).await?;
        let repository = self.git_url.repository.clone();
        match resolution {
            VersionResolution::DefaultBranch => {
                let (reference, sha) = self.resolve_local_default_branch(&cwd).await?;
                self.reference = reference;
                self.hash = Some(sha);
            }
            other => self.apply_resolution(other, &repository)?,
        }

        self.supports_archive = false;
        self.fetched = true;
        Ok(self.hash.expect("set above"))
    }

    /// Applies a [`VersionResolution`] that isn't `DefaultBranch`. Callers
    /// handle that variant themselves since it needs a live-or-local lookup
    /// this function has no access to.
    fn apply_resolution(
        &mut self,
        resolution: VersionResolution,
        remote: &str,
    ) -> Result<(), GitpinError> {
        match resolution {
            VersionResolution::Resolved(resolved) => {
                self.hash = Some(resolved.sha);
                self.reference = resolved.reference;
                Ok(())
            }
            VersionResolution::DefaultBranch => unreachable!("callers handle DefaultBranch first"),
            VersionResolution::NotFound => Err(NotFoundError {
                version: self.user_hash.clone(),
                remote: remote.to_string(),
                refs: self.refs.clone(),
            }
            .into()),
        }
    }

    async fn resolve_default_branch(&self) -> Result<(Option<String>, GitOid), GitpinError> {
        let repository = self.secured_repository();
        match self
            .runner
            .run_buffered(&["ls-remote", "--symref", &repository, "HEAD"], None)
            .await
        {
            Ok(output) => parse_symref_output(&output),
            Err(_) => {
                // Older `git` does not understand `--symref`; fall back to
                // a plain HEAD lookup, losing the symbolic ref name.
                let output = self
                    .runner
                    .run_buffered(&["ls-remote", &repository, "HEAD"], None)
                    .await?;
                let sha = output
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().next())
                    .and_then(|sha| GitOid::from_str(sha).ok())
                    .ok_or_else(|| GitpinError::Other("HEAD not reported by ls-remote".to_string()))?;
                Ok((None, sha))
            }
        }
    }

    /// Offline counterpart of [`Self::resolve_default_branch`]: reads the
    /// local clone's symbolic HEAD instead of asking the remote.
    async fn resolve_local_default_branch(
        &self,
        cwd: &Path,
    ) -> Result<(Option<String>, GitOid), GitpinError> {
        let reference = self
            .runner
            .run_buffered(&["symbolic-ref", "HEAD"], Some(cwd))
            .await?
            .trim()
            .to_string();
        let sha_text = self
            .runner
            .run_buffered(&["rev-parse", "HEAD"], Some(cwd))
            .await?;
        let sha = GitOid::from_str(sha_text.trim())
            .map_err(|e| GitpinError::Other(format!("invalid local HEAD SHA: {e}")))?;
        Ok((Some(reference), sha))
    }

    /// Runs under C9's per-repository lock: clones if `cwd` doesn't exist
    /// yet, pulls otherwise. No-ops once `fetched` is set for this session.
    pub async fn fetch(&mut self) -> Result<(), GitpinError> {
        if self.fetched {
            return Ok(());
        }
        let key = self.repository_key()?;
        let guard = lockqueue::lock(&key).await;
        let _held = guard.guard().await;

        let cwd = self.cwd();
        if cwd.exists() {
            self.runner.run_buffered(&["pull"], Some(&cwd)).await?;
        } else {
            std::fs::create_dir_all(&cwd)?;
            self.runner
                .run_buffered(&["clone", &self.secured_repository(), "."], Some(&cwd))
                .await?;
        }
        self.fetched = true;
        Ok(())
    }

    /// Returns the file's contents, or `Ok(None)` meaning "not present at
    /// that commit", distinguished from an error, which propagates.
    pub async fn get_file(&self, name: &str) -> Result<Option<String>, GitpinError> {
        let hash = self.hash.expect("init must run before get_file");
        let reference = self.reference.clone().unwrap_or_default();

        if self.supports_archive {
            let repository = self.secured_repository();
            let args = vec![
                "archive".to_string(),
                format!("--remote={repository}"),
                reference,
                name.to_string(),
            ];
            let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
            match self
                .runner
                .run_with_stdout(&args_ref, None, |reader| {
                    sink::decode_single_tar_entry(reader)
                })
                .await
            {
                Ok(content) => return Ok(content),
                Err(e) if e.stderr.contains(DID_NOT_MATCH_ANY_FILES) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }

        if !self.fetched {
            return Err(GitpinError::Other(
                "get_file requires fetch() when archive is unsupported".to_string(),
            ));
        }
        let spec = format!("{hash}:{name}");
        match self.runner.run_buffered(&["show", &spec], Some(&self.cwd())).await {
            Ok(content) => Ok(Some(content)),
            Err(_) => Ok(None),
        }
    }

    /// Pipes a raw `git archive` stream into `dest`, returning its hex
    /// SHA-256 digest.
    pub async fn archive(&self, dest: &Path) -> Result<String, GitpinError> {
        let dest = dest.to_path_buf();
        if self.supports_archive {
            let reference = self.reference.clone().unwrap_or_default();
            let repository = self.secured_repository();
            let args = vec!["archive".to_string(), format!("--remote={repository}"), reference];
            let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
            Ok(self
                .runner
                .run_with_stdout(&args_ref, None, move |reader| sink::hash_to_file(reader, &dest))
                .await?)
        } else {
            let hash = self.hash.expect("init must run before archive");
            Ok(self
                .runner
                .run_with_stdout(
                    &["archive", hash.as_str()],
                    Some(&self.cwd()),
                    move |reader| sink::hash_to_file(reader, &dest),
                )
                .await?)
        }
    }

    /// Pipes a tar stream into `dest`, extracted with directory mode
    /// `0o555` and file mode `0o444`.
    pub async fn clone_to(&self, dest: &Path) -> Result<(), GitpinError> {
        let dest = dest.to_path_buf();
        if self.supports_archive {
            let reference = self.reference.clone().unwrap_or_default();
            let repository = self.secured_repository();
            let args = vec!["archive".to_string(), format!("--remote={repository}"), reference];
            let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
            self.runner
                .run_with_stdout(&args_ref, None, move |reader| sink::extract_tar(reader, &dest))
                .await?;
        } else {
            let hash = self.hash.expect("init must run before clone_to");
            self.runner
                .run_with_stdout(&["archive", hash.as_str()], Some(&self.cwd()), move |reader| {
                    sink::extract_tar(reader, &dest)
                })
                .await?;
        }
        Ok(())
    }
}

impl CommitResolver for Session {
    fn resolve_commit<'a>(
        &'a self,
        version: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<GitOid>, GitpinError>> + Send + 'a>> {
        Box::pin(async move {
            let cwd = self.cwd();
            if !cwd.exists() {
                if self.config.offline {
                    return Ok(None);
                }
                let key = self.repository_key()?;
                let guard = lockqueue::lock(&key).await;
                let _held = guard.guard().await;
                if !cwd.exists() {
                    std::fs::create_dir_all(&cwd)?;
                    self.runner
                        .run_buffered(&["clone", &self.secured_repository(), "."], Some(&cwd))
                        .await?;
                }
            }
            let output = self
                .runner
                .run_buffered(
                    &["rev-list", "-n", "1", "--no-abbrev-commit", "--format=oneline", version],
                    Some(&cwd),
                )
                .await;
            match output {
                Ok(text) => {
                    let sha = text.split_whitespace().next().unwrap_or("");
                    Ok(GitOid::from_str(sha).ok())
                }
                Err(_) => Ok(None),
            }
        })
    }
}

fn parse_symref_output(output: &str) -> Result<(Option<String>, GitOid), GitpinError> {
    let mut lines = output.lines();
    let first = lines
        .next()
        .ok_or_else(|| GitpinError::Other("empty ls-remote --symref output".to_string()))?;
    let reference = first.split_whitespace().nth(1).map(str::to_string);

    let second = lines
        .next()
        .ok_or_else(|| GitpinError::Other("ls-remote --symref missing SHA line".to_string()))?;
    let sha = second
        .split_whitespace()
        .next()
        .ok_or_else(|| GitpinError::Other("ls-remote --symref missing SHA".to_string()))?;
    let oid = GitOid::from_str(sha)
        .map_err(|e| GitpinError::Other(format!("invalid SHA in --symref output: {e}")))?;
    Ok((reference, oid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symref_head_output() {
        let output = "ref: refs/heads/main\tHEAD\naaaa11111111111111111111111111111111111a\tHEAD\n";
        let (reference, sha) = parse_symref_output(output).unwrap();
        assert_eq!(reference.as_deref(), Some("refs/heads/main"));
        assert_eq!(sha.as_str(), "aaaa11111111111111111111111111111111111a");
    }

    #[test]
    fn cwd_is_a_deterministic_function_of_repository() {
        assert_eq!(
            cwd_for("https://github.com/user/repo.git"),
            cwd_for("https://github.com/user/repo.git")
        );
        assert_ne!(
            cwd_for("https://github.com/user/repo.git"),
            cwd_for("https://github.com/user/other.git")
        );
    }
}
