//! C5: map a user-supplied version token plus a ref table to a `{sha, ref?}`
//! or the default-branch sentinel, by trying an ordered list of strategies
//! from most to least specific. `semver` is the external constraint
//! evaluator; everything else is exact lookups against the `refs` table
//! already parsed by C2.

use std::future::Future;
use std::pin::Pin;

use gitpin_types::{looks_like_commit_hash, GitOid, Refs, ResolvedSha, VersionResolution};

use crate::error::GitpinError;

/// The one strategy that can't be satisfied by the in-memory `refs` table
/// alone: resolving a commit-SHA-shaped token that isn't any known ref's
/// prefix requires asking the live repository (`git rev-list`), which may
/// first need to fetch. C7's [`crate::session::Session`] implements this;
/// tests can supply a stub.
pub trait CommitResolver {
    fn resolve_commit<'a>(
        &'a self,
        version: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<GitOid>, GitpinError>> + Send + 'a>>;
}

fn tag_tail(name: &str) -> Option<&str> {
    name.strip_prefix("refs/tags/")
}

fn branch_tail(name: &str) -> Option<&str> {
    name.strip_prefix("refs/heads/")
}

fn parse_loose_semver(tail: &str) -> Option<semver::Version> {
    let stripped = tail.strip_prefix('v').unwrap_or(tail);
    semver::Version::parse(stripped).ok()
}

/// Among refs under `namespace` (`"refs/tags/"` or `"refs/heads/"`) whose
/// tail parses as loose semver and satisfies `req`, returns the highest.
fn best_semver_match(
    refs: &Refs,
    tail_of: impl Fn(&str) -> Option<&str>,
    req: &semver::VersionReq,
) -> Option<ResolvedSha> {
    refs.iter()
        .filter_map(|(name, sha)| {
            let tail = tail_of(name)?;
            let version = parse_loose_semver(tail)?;
            req.matches(&version).then_some((version, name, sha))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, name, sha)| ResolvedSha {
            sha: *sha,
            reference: Some(name.clone()),
        })
}

/// Applies the C5 strategy list in order and returns the first match.
pub async fn resolve_version(
    version: &str,
    refs: &Refs,
    commit_resolver: &dyn CommitResolver,
) -> Result<VersionResolution, GitpinError> {
    let trimmed = version.trim();

    // Strategy 1: empty.
    if trimmed.is_empty() {
        return Ok(VersionResolution::DefaultBranch);
    }

    // Strategy 2: commit SHA, exact-prefix against refs first, then the
    // live repository.
    if looks_like_commit_hash(trimmed) {
        let lower = trimmed.to_ascii_lowercase();
        if let Some((name, sha)) = refs.iter().find(|(_, sha)| sha.starts_with(&lower)) {
            return Ok(VersionResolution::Resolved(ResolvedSha {
                sha: *sha,
                reference: Some(name.clone()),
            }));
        }
        if let Some(sha) = commit_resolver.resolve_commit(&lower).await? {
            return Ok(VersionResolution::Resolved(ResolvedSha {
                sha,
                reference: None,
            }));
        }
    }

    // Strategy 3: full ref path.
    if trimmed.starts_with("refs/") {
        if let Some(sha) = refs.get(trimmed) {
            return Ok(VersionResolution::Resolved(ResolvedSha {
                sha: *sha,
                reference: Some(trimmed.to_string()),
            }));
        }
    }

    // Strategy 4: tag name.
    let tag_ref = format!("refs/tags/{trimmed}");
    if let Some(sha) = refs.get(&tag_ref) {
        return Ok(VersionResolution::Resolved(ResolvedSha {
            sha: *sha,
            reference: Some(tag_ref),
        }));
    }

    // Strategy 5: branch name.
    let branch_ref = format!("refs/heads/{trimmed}");
    if let Some(sha) = refs.get(&branch_ref) {
        return Ok(VersionResolution::Resolved(ResolvedSha {
            sha: *sha,
            reference: Some(branch_ref),
        }));
    }

    if let Ok(req) = semver::VersionReq::parse(trimmed) {
        // Strategy 6: semver range against tags.
        if let Some(resolved) = best_semver_match(refs, tag_tail, &req) {
            return Ok(VersionResolution::Resolved(resolved));
        }
        // Strategy 7: semver range against branches.
        if let Some(resolved) = best_semver_match(refs, branch_tail, &req) {
            return Ok(VersionResolution::Resolved(resolved));
        }
    }

    // Strategy 8: wildcard.
    if trimmed == "*" {
        return Ok(VersionResolution::DefaultBranch);
    }

    Ok(VersionResolution::NotFound)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    struct NeverResolves;

    impl CommitResolver for NeverResolves {
        fn resolve_commit<'a>(
            &'a self,
            _version: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Option<GitOid>, GitpinError>> + Send + 'a>> {
            Box::pin(async { Ok(None) })
        }
    }

    fn oid(hex: &str) -> GitOid {
        GitOid::from_str(hex).unwrap()
    }

    fn sample_refs() -> Refs {
        let mut refs = Refs::new();
        refs.insert(
            "refs/heads/1.1".to_string(),
            oid("aaaa11111111111111111111111111111111111a"),
        );
        refs.insert(
            "refs/tags/v1.1.0".to_string(),
            oid("bbbb22222222222222222222222222222222222b"),
        );
        refs.insert(
            "refs/tags/both".to_string(),
            oid("cccc33333333333333333333333333333333333c"),
        );
        refs.insert(
            "refs/heads/both".to_string(),
            oid("dddd44444444444444444444444444444444444d"),
        );
        refs
    }

    #[tokio::test]
    async fn tags_beat_branches_on_exact_name() {
        let refs = sample_refs();
        let resolved = resolve_version("both", &refs, &NeverResolves).await.unwrap();
        assert_eq!(
            resolved,
            VersionResolution::Resolved(ResolvedSha {
                sha: oid("cccc33333333333333333333333333333333333c"),
                reference: Some("refs/tags/both".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn full_ref_path_is_exact() {
        let refs = sample_refs();
        let resolved = resolve_version("refs/heads/both", &refs, &NeverResolves)
            .await
            .unwrap();
        assert_eq!(
            resolved,
            VersionResolution::Resolved(ResolvedSha {
                sha: oid("dddd44444444444444444444444444444444444d"),
                reference: Some("refs/heads/both".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn semver_range_matches_tag() {
        let refs = sample_refs();
        let resolved = resolve_version("~1.1", &refs, &NeverResolves).await.unwrap();
        assert_eq!(
            resolved,
            VersionResolution::Resolved(ResolvedSha {
                sha: oid("bbbb22222222222222222222222222222222222b"),
                reference: Some("refs/tags/v1.1.0".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn wildcard_with_no_refs_is_default_branch() {
        let resolved = resolve_version("*", &Refs::new(), &NeverResolves)
            .await
            .unwrap();
        assert_eq!(resolved, VersionResolution::DefaultBranch);
    }

    #[tokio::test]
    async fn empty_is_default_branch() {
        let resolved = resolve_version("   ", &sample_refs(), &NeverResolves)
            .await
            .unwrap();
        assert_eq!(resolved, VersionResolution::DefaultBranch);
    }

    #[tokio::test]
    async fn commit_prefix_matches_ref_table_case_insensitively() {
        let refs = sample_refs();
        let resolved = resolve_version("AAAA1111", &refs, &NeverResolves)
            .await
            .unwrap();
        assert_eq!(
            resolved,
            VersionResolution::Resolved(ResolvedSha {
                sha: oid("aaaa11111111111111111111111111111111111a"),
                reference: Some("refs/heads/1.1".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn unmatched_version_is_not_found() {
        let resolved = resolve_version("nonexistent", &sample_refs(), &NeverResolves)
            .await
            .unwrap();
        assert_eq!(resolved, VersionResolution::NotFound);
    }
}
