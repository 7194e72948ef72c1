//! Shared data model for the `gitpin` git-source package resolver.
//!
//! This crate holds only types with no process-spawning or I/O behavior,
//! the parts of the resolver's data model that every other `gitpin` crate
//! needs to agree on. Shaped like the `uv-git-types` crate in the
//! `astral-sh/uv` workspace.

mod canonical;
mod oid;
mod reference;
mod url;

pub use canonical::{CanonicalUrl, RepositoryUrl};
pub use oid::{looks_like_commit_hash, GitOid, GitOidParseError};
pub use reference::{Refs, ResolvedSha, VersionResolution};
pub use url::{ExplodedFragment, GitUrl, HostedGit, HostedProvider, Protocol};
