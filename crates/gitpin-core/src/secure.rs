//! C4: enforce the transport security policy. An unauthenticated fetch of
//! mutable content (a branch or tag) must be integrity-protected by TLS; a
//! commit-pinned fetch is safe over any transport because the SHA
//! authenticates the content.

use gitpin_types::{looks_like_commit_hash, GitUrl, Protocol};

use crate::config::Config;
use crate::error::SecurityError;
use crate::process::GitRunner;

/// Probes whether `repository` exists by running `git ls-remote -t
/// <repo>`; "exists" is defined as the process exiting zero.
async fn remote_exists(runner: &GitRunner, repository: &str) -> bool {
    runner.probe(&["ls-remote", "-t", repository], None).await.success
}

fn with_protocol(url: &GitUrl, protocol: Protocol, repository: String) -> GitUrl {
    GitUrl {
        protocol,
        repository,
        hostname: url.hostname.clone(),
        hosted_git: url.hosted_git.clone(),
    }
}

fn rewritten_repository(repository: &str, from: &str, to: &str) -> String {
    if let Some(rest) = repository.strip_prefix(from) {
        format!("{to}{rest}")
    } else {
        repository.replacen(from, to, 1)
    }
}

/// Applies the C4 policy given the normalized `url` and the user-supplied
/// version token `user_hash`. Hosts on `config`'s insecure allowlist skip
/// the policy entirely for `git://`/`http://`, the way a trusted internal
/// mirror reachable only over plain HTTP would need to.
pub async fn secure_git_url(
    runner: &GitRunner,
    config: &Config,
    url: GitUrl,
    user_hash: &str,
) -> Result<GitUrl, SecurityError> {
    if looks_like_commit_hash(user_hash) {
        return Ok(url);
    }

    let host_allowed = url
        .hostname
        .as_deref()
        .is_some_and(|host| config.is_insecure_host_allowed(host));

    match url.protocol {
        Protocol::Git if host_allowed => Ok(url),
        Protocol::Git => {
            let https_repo = rewritten_repository(&url.repository, "git://", "https://");
            if remote_exists(runner, &https_repo).await {
                Ok(with_protocol(&url, Protocol::Https, https_repo))
            } else {
                Err(SecurityError::InsecureGitProtocol { url: url.repository })
            }
        }
        Protocol::Http if host_allowed => Ok(url),
        Protocol::Http => {
            let https_repo = rewritten_repository(&url.repository, "http://", "https://");
            if remote_exists(runner, &https_repo).await {
                return Ok(with_protocol(&url, Protocol::Https, https_repo));
            }
            if remote_exists(runner, &url.repository).await {
                return Ok(url);
            }
            Err(SecurityError::InsecureHttpProtocol { url: url.repository })
        }
        Protocol::Https => {
            if remote_exists(runner, &url.repository).await {
                Ok(url)
            } else {
                Err(SecurityError::UnreachableHttps { url: url.repository })
            }
        }
        Protocol::Ssh | Protocol::File => Ok(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssh_url() -> GitUrl {
        GitUrl {
            protocol: Protocol::Ssh,
            hostname: Some("example.com".to_string()),
            repository: "ssh://git@example.com/user/repo".to_string(),
            hosted_git: None,
        }
    }

    #[tokio::test]
    async fn commit_pin_is_identity_regardless_of_protocol() {
        let runner = GitRunner::new();
        let config = Config::default();
        let url = GitUrl {
            protocol: Protocol::Git,
            hostname: Some("example.com".to_string()),
            repository: "git://example.com/user/repo".to_string(),
            hosted_git: None,
        };
        let secured = secure_git_url(&runner, &config, url.clone(), "abcde").await.unwrap();
        assert_eq!(secured.repository, url.repository);
        assert_eq!(secured.protocol, url.protocol);
    }

    #[tokio::test]
    async fn ssh_and_file_are_always_identity() {
        let runner = GitRunner::new();
        let config = Config::default();
        let secured = secure_git_url(&runner, &config, ssh_url(), "").await.unwrap();
        assert_eq!(secured.protocol, Protocol::Ssh);
    }

    #[tokio::test]
    async fn allowlisted_host_bypasses_the_upgrade_policy_over_git() {
        let runner = GitRunner::new();
        let config = Config::default().allow_insecure_host("internal.example.com");
        let url = GitUrl {
            protocol: Protocol::Git,
            hostname: Some("internal.example.com".to_string()),
            repository: "git://internal.example.com/user/repo".to_string(),
            hosted_git: None,
        };
        let secured = secure_git_url(&runner, &config, url.clone(), "main").await.unwrap();
        assert_eq!(secured.protocol, Protocol::Git);
        assert_eq!(secured.repository, url.repository);
    }
}
