use std::collections::BTreeMap;

use crate::oid::GitOid;

/// A mapping from full ref name (e.g. `refs/tags/v1.0`, `refs/heads/main`)
/// to the 40-hex commit it points at.
///
/// A `BTreeMap` rather than a `HashMap` so that re-serializing a parsed ref
/// table is deterministic, which lets repeated resolves of the same
/// specifier stay idempotent.
pub type Refs = BTreeMap<String, GitOid>;

/// The result of resolving a user-supplied version token against a [`Refs`]
/// table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSha {
    pub sha: GitOid,
    /// The ref this commit was found under, if any. `None` means the
    /// version resolved to a raw commit not known to belong to any listed
    /// ref (C5 strategy 2's `session.resolveCommit` fallback).
    pub reference: Option<String>,
}

/// The tagged outcome of the version-resolution pipeline (C5), dispatched at
/// the session-init boundary. A plain enum avoids the sentinel-value
/// ambiguity of overloading `Option`/`bool` for "not found" vs. "resolve
/// HEAD lazily".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionResolution {
    Resolved(ResolvedSha),
    /// Resolve HEAD's symbolic target lazily via the live remote.
    DefaultBranch,
    NotFound,
}
