//! C6: decide whether a remote supports server-side `git archive`.
//!
//! Only meaningful for `ssh:` remotes with a hostname. Cached process-wide
//! per hostname in a [`DashMap`], seeded with `github.com -> false` (known
//! to refuse `git archive --remote`). Caches both hits and misses, since
//! there's no reason a probe failure should re-run on every call for a host
//! that will keep refusing.

use dashmap::DashMap;
use gitpin_types::{GitUrl, Protocol};
use once_cell::sync::Lazy;

use crate::process::GitRunner;

static CAPABILITY_CACHE: Lazy<DashMap<String, bool>> = Lazy::new(|| {
    let cache = DashMap::new();
    cache.insert("github.com".to_string(), false);
    cache
});

const PROBE_FAILURE_MARKER: &str = "did not match any files";

/// Returns `true` if `url` looks like it could ever support server-side
/// archive (`ssh:` with a hostname) before doing any I/O. Used by callers
/// that want to skip the probe entirely for non-SSH remotes.
pub fn could_support_archive(url: &GitUrl) -> bool {
    url.protocol == Protocol::Ssh && url.hostname.is_some()
}

/// Probes (and caches) whether `url`'s remote supports `git archive
/// --remote`. Always returns `false` for non-SSH remotes or remotes without
/// a hostname, without touching the cache or spawning a process.
pub async fn has_archive_capability(runner: &GitRunner, url: &GitUrl, now_millis: u64) -> bool {
    let Some(hostname) = url.hostname.as_deref().filter(|_| could_support_archive(url)) else {
        return false;
    };

    if let Some(cached) = CAPABILITY_CACHE.get(hostname) {
        return *cached;
    }

    let probe_file = format!("__gitpin_capability_probe_{now_millis}__");
    let result = runner
        .probe(
            &["archive", &format!("--remote={}", url.repository), "HEAD", &probe_file],
            None,
        )
        .await;

    let capable = !result.success && result.stderr.contains(PROBE_FAILURE_MARKER);
    CAPABILITY_CACHE.insert(hostname.to_string(), capable);
    capable
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssh_url(host: &str) -> GitUrl {
        GitUrl {
            protocol: Protocol::Ssh,
            hostname: Some(host.to_string()),
            repository: format!("ssh://git@{host}/user/repo"),
            hosted_git: None,
        }
    }

    #[test]
    fn https_remotes_never_support_archive() {
        let url = GitUrl {
            protocol: Protocol::Https,
            hostname: Some("example.com".to_string()),
            repository: "https://example.com/user/repo.git".to_string(),
            hosted_git: None,
        };
        assert!(!could_support_archive(&url));
    }

    #[tokio::test]
    async fn github_is_seeded_as_incapable_without_probing() {
        let runner = GitRunner::new();
        let capable = has_archive_capability(&runner, &ssh_url("github.com"), 0).await;
        assert!(!capable);
    }
}
