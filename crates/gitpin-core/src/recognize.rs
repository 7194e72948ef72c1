//! C3: classify an opaque specifier as git/not-git, and normalize it to a
//! canonical [`GitUrl`].
//!
//! Grounded on `orogene`'s `oro-package-spec` git parsers (shorthand / scp /
//! URL precedence) and `cache-key::canonical_url` for how `.git` suffixes
//! and host casing get folded.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use gitpin_types::{ExplodedFragment, GitUrl, HostedGit, HostedProvider, Protocol};

use crate::error::GitpinError;

// Rule 1: scp-like `git+ssh://[user@]host:path`, `path`'s first segment non-numeric.
static SCP_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^git\+ssh://(?:[^@/]*@)?([^/:]+):(.+)$").unwrap());

// Rule 2: shorthand `user/repo[#hash]`, exactly one `/`.
static SHORTHAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^:@%/\s.\-][^:@%/\s]*/[^:@\s/%#]+(?:#(.*))?$").unwrap());

// Rule 3: bare `git@host[:/]user/repo[#hash]`.
static BARE_GIT_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^git@([^:/]+)[:/]([^#]+)(?:#(.*))?$").unwrap());

// Rule 4: hosted alias `<provider>:user/repo[.git][#hash]`.
static HOSTED_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(github|gitlab|bitbucket):([^/]+)/([^#]+?)(?:\.git)?(?:#(.*))?$").unwrap()
});

const HOSTED_GIT_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org", "bitbucket.com"];

fn scp_like_host_and_path(s: &str) -> Option<(String, String)> {
    let caps = SCP_LIKE.captures(s)?;
    let host = caps[1].to_string();
    let path = caps[2].to_string();
    let first_segment = path.split('/').next().unwrap_or("");
    if !first_segment.is_empty() && first_segment.bytes().all(|b| b.is_ascii_digit()) {
        // Looks like `host:port/...` rather than `host:path`.
        return None;
    }
    Some((host, path))
}

fn strip_git_plus(s: &str) -> &str {
    s.strip_prefix("git+").unwrap_or(s)
}

/// Returns `true` if `s` matches any recognized git specifier grammar.
pub fn is_git_pattern(s: &str) -> bool {
    if scp_like_host_and_path(s).is_some() {
        return true;
    }
    if SHORTHAND.is_match(s) {
        return true;
    }
    if BARE_GIT_AT.is_match(s) {
        return true;
    }
    if HOSTED_ALIAS.is_match(s) {
        return true;
    }

    let without_prefix = strip_git_plus(s);
    if s.starts_with("git+") || s.starts_with("git://") || s.starts_with("ssh://") {
        return true;
    }

    let Ok(url) = Url::parse(without_prefix) else {
        return false;
    };
    if url.path().ends_with(".git") {
        return true;
    }
    if let Some(host) = url.host_str() {
        if HOSTED_GIT_HOSTS.contains(&host) {
            let segments = non_empty_segments(&url);
            if segments.len() == 2 {
                return true;
            }
        }
    }
    false
}

fn non_empty_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Normalizes a recognized specifier into a canonical [`GitUrl`] plus the
/// user-supplied version token carried in its `#hash` fragment (empty
/// string if the form doesn't carry one).
///
/// The fragment is never part of `GitUrl::repository`, since that string is
/// handed verbatim to `git`, which has no notion of a URL fragment. It is
/// returned alongside the URL rather than folded into it, mirroring how
/// `Session` keeps `hash` as a sibling of `gitUrl` rather than a field on it.
///
/// Callers should check [`is_git_pattern`] first; `normalize` on a
/// non-git-pattern string will generally fail, but the two functions are
/// intentionally independent pure operations.
pub fn normalize(s: &str) -> Result<(GitUrl, String), GitpinError> {
    // Step 1: scp-like. Rule 1 in §3's enumeration carries no `#hash`.
    if let Some((host, _path)) = scp_like_host_and_path(s) {
        let repository = strip_git_plus(s).to_string();
        let url = GitUrl {
            protocol: Protocol::Ssh,
            hostname: Some(host),
            repository,
            hosted_git: None,
        };
        return Ok((url, String::new()));
    }

    // Step 2: shorthand -> prepend `github:` and fall through to alias handling.
    if let Some(caps) = SHORTHAND.captures(s) {
        let hash = caps.get(1).map(|m| m.as_str().to_string());
        let (user, repo) = split_user_repo(s, hash.as_deref())?;
        let hash_owned = hash.clone().unwrap_or_default();
        return Ok((hosted_https(HostedProvider::GitHub, user, repo, hash), hash_owned));
    }

    // Step 3: bare `git@host...` -> prepend `ssh://`.
    if let Some(caps) = BARE_GIT_AT.captures(s) {
        let host = caps[1].to_string();
        let path = caps[2].to_string();
        let hash = caps.get(3).map(|m| m.as_str().to_string());
        let hash_owned = hash.clone().unwrap_or_default();
        if let Some(provider) = HostedProvider::from_hostname(&host) {
            if let Some((user, repo)) = path.split_once('/') {
                let url = hosted_https(provider, user.to_string(), repo.to_string(), hash);
                return Ok((url, hash_owned));
            }
        }
        let repository = format!("ssh://git@{host}/{path}");
        let url = GitUrl {
            protocol: Protocol::Ssh,
            hostname: Some(host),
            repository,
            hosted_git: None,
        };
        return Ok((url, hash_owned));
    }

    // Step 4: hosted-alias prefix -> rebuild via the provider template.
    if let Some(caps) = HOSTED_ALIAS.captures(s) {
        let provider = HostedProvider::from_alias(&caps[1])
            .expect("regex only matches known provider aliases");
        let user = caps[2].to_string();
        let repo = caps[3].to_string();
        let hash = caps.get(4).map(|m| m.as_str().to_string());
        let hash_owned = hash.clone().unwrap_or_default();
        return Ok((hosted_https(provider, user, repo, hash), hash_owned));
    }

    // Step 5: strip `git+`, parse as URL, fill in hostname/protocol.
    let without_prefix = strip_git_plus(s);
    let mut url = Url::parse(without_prefix)?;
    let hash = url.fragment().map(str::to_string).unwrap_or_default();
    url.set_fragment(None);

    if HOSTED_GIT_HOSTS.contains(&url.host_str().unwrap_or_default()) {
        let segments = non_empty_segments(&url);
        if segments.len() == 2 {
            let provider = HostedProvider::from_hostname(url.host_str().unwrap()).unwrap();
            let user = segments[0].clone();
            let repo_raw = segments[1].clone();
            let hash_opt = (!hash.is_empty()).then(|| hash.clone());
            let git_url = hosted_https(provider, user, repo_raw, hash_opt);
            return Ok((git_url, hash));
        }
    }

    let protocol = Protocol::from_scheme(url.scheme()).unwrap_or(Protocol::File);
    let git_url = GitUrl {
        protocol,
        hostname: url.host_str().map(str::to_string),
        repository: url.to_string(),
        hosted_git: None,
    };
    Ok((git_url, hash))
}

fn split_user_repo(s: &str, hash: Option<&str>) -> Result<(String, String), GitpinError> {
    let without_hash = hash.map_or(s, |h| {
        s.strip_suffix(&format!("#{h}")).unwrap_or(s)
    });
    without_hash
        .split_once('/')
        .map(|(u, r)| (u.to_string(), r.to_string()))
        .ok_or_else(|| GitpinError::Validation(s.to_string()))
}

fn hosted_https(
    provider: HostedProvider,
    user: String,
    repo: String,
    hash: Option<String>,
) -> GitUrl {
    let repo_trimmed = repo.strip_suffix(".git").unwrap_or(&repo).to_string();
    let host = provider.default_host();
    let repository = format!("https://{host}/{user}/{repo_trimmed}.git");
    GitUrl {
        protocol: Protocol::Https,
        hostname: Some(host.to_string()),
        repository,
        hosted_git: Some(HostedGit {
            provider,
            fragment: ExplodedFragment {
                user,
                repo: repo_trimmed,
                hash,
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_is_recognized() {
        assert!(is_git_pattern("user/repo"));
        let (url, hash) = normalize("user/repo").unwrap();
        assert_eq!(url.protocol, Protocol::Https);
        assert_eq!(url.repository, "https://github.com/user/repo.git");
        assert_eq!(hash, "");
    }

    #[test]
    fn leading_git_at_disqualifies_shorthand() {
        // "package@git@bitbucket.org:team/repo.git" isn't a recognized form:
        // the leading non-git prefix disqualifies it.
        assert!(!is_git_pattern("package@git@bitbucket.org:team/repo.git"));
    }

    #[test]
    fn numeric_port_is_not_scp_like() {
        let (url, _hash) = normalize("git+ssh://git@gitlab.tld:10202/p/m.git").unwrap();
        assert_eq!(url.protocol, Protocol::Ssh);
        assert_eq!(url.hostname.as_deref(), Some("gitlab.tld"));
        assert_eq!(url.repository, "ssh://git@gitlab.tld:10202/p/m.git");
    }

    #[test]
    fn hosted_git_path_with_extra_segments_is_not_a_pattern() {
        assert!(!is_git_pattern(
            "https://github.com/user/repo/archive/v1.0.0.tar.gz"
        ));
    }

    #[test]
    fn dot_git_suffixed_https_url_is_recognized() {
        assert!(is_git_pattern("https://example.com/some/deep/path/repo.git"));
    }

    #[test]
    fn bare_git_at_hosted_provider_normalizes_to_https() {
        let (url, _hash) = normalize("git@github.com:user/repo.git").unwrap();
        assert_eq!(url.protocol, Protocol::Https);
        assert_eq!(url.repository, "https://github.com/user/repo.git");
        assert!(url.hosted_git.is_some());
    }

    #[test]
    fn bare_git_at_non_hosted_stays_ssh() {
        let (url, _hash) = normalize("git@example.com:team/repo.git").unwrap();
        assert_eq!(url.protocol, Protocol::Ssh);
        assert_eq!(url.repository, "ssh://git@example.com/team/repo.git");
    }

    #[test]
    fn hosted_alias_rebuilds_https_template() {
        let (url, hash) = normalize("gitlab:team/project#deadbeef").unwrap();
        assert_eq!(url.repository, "https://gitlab.com/team/project.git");
        assert_eq!(hash, "deadbeef");
        let hosted = url.hosted_git.unwrap();
        assert_eq!(hosted.fragment.hash.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn generic_url_fragment_is_extracted_as_hash_not_left_in_repository() {
        let (url, hash) = normalize("https://example.com/some/deep/path/repo.git#v2.0.0").unwrap();
        assert_eq!(hash, "v2.0.0");
        assert!(!url.repository.contains('#'));
    }

    #[test]
    fn git_plus_ssh_scheme_is_recognized() {
        assert!(is_git_pattern("git+ssh://git@example.com/team/repo.git"));
    }

    #[test]
    fn bitbucket_com_alias_hostname_recognized() {
        assert!(is_git_pattern("https://bitbucket.com/user/repo"));
    }
}
