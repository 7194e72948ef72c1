//! The output type: package metadata JSON decorated with git provenance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `_remote` provenance block attached to every resolved manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteInfo {
    /// `"<url>#<commit>"`.
    pub resolved: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub reference: String,
    pub hash: String,
    pub registry: Option<String>,
}

/// A resolved package manifest: the registry file's JSON (or a synthesized
/// stand-in when none was found), decorated with `_uid`/`_remote`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(rename = "_uid")]
    pub uid: String,
    #[serde(rename = "_remote")]
    pub remote: RemoteInfo,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Manifest {
    pub fn from_registry_file(
        mut fields: Map<String, Value>,
        uid: String,
        remote: RemoteInfo,
    ) -> Self {
        fields.remove("_uid");
        fields.remove("_remote");
        Self { uid, remote, fields }
    }

    /// Synthesizes a minimal manifest when no registry file was found at
    /// the resolved commit: `name` guessed from the URL, `version:
    /// "0.0.0"`.
    pub fn synthesize(name: String, uid: String, remote: RemoteInfo) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(name));
        fields.insert("version".to_string(), Value::String("0.0.0".to_string()));
        Self { uid, remote, fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_manifest_has_placeholder_version() {
        let manifest = Manifest::synthesize(
            "repo".to_string(),
            "a".repeat(40),
            RemoteInfo {
                resolved: "https://example.com/user/repo.git#".to_string() + &"a".repeat(40),
                kind: "git".to_string(),
                reference: "https://example.com/user/repo.git".to_string(),
                hash: "a".repeat(40),
                registry: None,
            },
        );
        assert_eq!(manifest.fields["version"], Value::String("0.0.0".to_string()));
        assert_eq!(manifest.fields["name"], Value::String("repo".to_string()));
    }
}
