use std::fmt;
use std::str::FromStr;

/// A 40-character lowercase hexadecimal git commit id.
///
/// Parsing lower-cases the input and rejects anything that isn't exactly 40
/// hex digits, so a `GitOid` in hand is always a full, canonical commit SHA.
/// The caller does not need to re-validate it before using it as a cache key
/// or printing it into a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GitOid([u8; 40]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("`{0}` is not a valid 40-character git commit hash")]
pub struct GitOidParseError(String);

impl FromStr for GitOid {
    type Err = GitOidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 40 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GitOidParseError(s.to_string()));
        }
        let mut bytes = [0u8; 40];
        for (dst, src) in bytes.iter_mut().zip(s.bytes()) {
            *dst = src.to_ascii_lowercase();
        }
        Ok(Self(bytes))
    }
}

impl GitOid {
    pub fn as_str(&self) -> &str {
        // SAFETY: constructed only from ASCII hex digits.
        std::str::from_utf8(&self.0).unwrap()
    }

    /// Whether `prefix` (case-insensitive, 5-40 hex chars) is a prefix of this oid.
    pub fn starts_with(&self, prefix: &str) -> bool {
        let prefix = prefix.to_ascii_lowercase();
        self.as_str().starts_with(&prefix)
    }
}

impl fmt::Display for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for GitOid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for GitOid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// `true` for strings that are plausible commit-hash prefixes (5-40 hex chars).
///
/// This is looser than [`GitOid::from_str`]: it accepts short prefixes, the
/// form the version resolver (C5) needs to recognize before it knows whether
/// the prefix is actually present in the ref table.
pub fn looks_like_commit_hash(s: &str) -> bool {
    (5..=40).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase() {
        let oid: GitOid = "abcdef0123456789abcdef0123456789abcdef01".parse().unwrap();
        assert_eq!(oid.as_str(), "abcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn lowercases_input() {
        let oid: GitOid = "ABCDEF0123456789abcdef0123456789abcdef01".parse().unwrap();
        assert_eq!(oid.as_str(), "abcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("abc123".parse::<GitOid>().is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let s = "g".repeat(40);
        assert!(s.parse::<GitOid>().is_err());
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        let oid: GitOid = "abcdef0123456789abcdef0123456789abcdef01".parse().unwrap();
        assert!(oid.starts_with("ABCDEF"));
        assert!(!oid.starts_with("ffffff"));
    }

    #[test]
    fn commit_hash_prefix_bounds() {
        assert!(!looks_like_commit_hash("abcd"));
        assert!(looks_like_commit_hash("abcde"));
        assert!(looks_like_commit_hash(&"a".repeat(40)));
        assert!(!looks_like_commit_hash(&"a".repeat(41)));
        assert!(!looks_like_commit_hash("abcdg"));
    }
}
