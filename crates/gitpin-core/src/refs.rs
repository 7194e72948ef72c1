//! C2: parse `git ls-remote` output into a ref-name → commit map.

use std::str::FromStr;

use gitpin_types::{GitOid, Refs};
use once_cell::sync::Lazy;
use regex::Regex;

static REF_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9a-fA-F]+)\s+(refs/(?:tags|heads)/.*)$").unwrap());

/// Parses the raw stdout of `git ls-remote --tags --heads <repo>` (or a
/// compatible hosted-git info-refs response).
///
/// Peeled-tag lines (`<ref>^{}`) overwrite the entry for the bare tag name,
/// so an annotated tag resolves to the commit it points at rather than the
/// tag object itself. This relies on peeled lines appearing after their
/// corresponding tag line in `git`'s own output, which is always true.
/// Lines that don't match the `<sha> refs/(tags|heads)/...` shape (banners,
/// comments, pull/merge-request refs) are ignored.
pub fn parse_refs(stdout: &str) -> Refs {
    let mut refs = Refs::new();
    for line in stdout.lines() {
        let Some(captures) = REF_LINE.captures(line) else {
            continue;
        };
        let sha = &captures[1];
        let Ok(sha) = GitOid::from_str(sha) else {
            continue;
        };
        let name = captures[2].strip_suffix("^{}").unwrap_or(&captures[2]);
        refs.insert(name.to_string(), sha);
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_banners_and_unrelated_refs() {
        let input = "\
From https://github.com/user/repo.git
ebe1234567890123456789012345678901234494  refs/tags/v0.21.0
abc1234567890123456789012345678901234567  refs/pull/42/head
70ed567890123456789012345678901234567e92  refs/tags/v0.21.0^{}
de41234567890123456789012345678901234349  refs/tags/v0.21.0-pre
";
        let refs = parse_refs(input);
        assert_eq!(refs.len(), 2);
        assert_eq!(
            refs["refs/tags/v0.21.0"].as_str(),
            "70ed567890123456789012345678901234567e92"
        );
        assert!(refs.contains_key("refs/tags/v0.21.0-pre"));
        assert!(!refs.contains_key("refs/pull/42/head"));
    }

    #[test]
    fn peeled_tag_overrides_tag_object_sha() {
        let input = "\
aaaa111111111111111111111111111111111111  refs/tags/both
bbbb222222222222222222222222222222222222  refs/heads/both
cccc333333333333333333333333333333333333  refs/tags/both^{}
";
        let refs = parse_refs(input);
        assert_eq!(
            refs["refs/tags/both"].as_str(),
            "cccc333333333333333333333333333333333333"
        );
        assert_eq!(
            refs["refs/heads/both"].as_str(),
            "bbbb222222222222222222222222222222222222"
        );
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(parse_refs("").is_empty());
    }

    #[test]
    fn idempotent_reparse() {
        let input = "\
aaaa111111111111111111111111111111111111  refs/heads/main
bbbb222222222222222222222222222222222222  refs/tags/v1.0.0
";
        let refs = parse_refs(input);
        let serialized = refs
            .iter()
            .map(|(name, sha)| format!("{sha}  {name}"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_refs(&serialized), refs);
    }
}
