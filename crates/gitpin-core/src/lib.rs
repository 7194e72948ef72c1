//! The git-source package resolver: specifier recognition, version
//! resolution, and fetch orchestration. Shaped like `uv-git`, paired with a
//! small `cache-key`/`once-map`-flavored internal layer for canonicalization
//! and concurrency control.

pub mod capability;
pub mod config;
pub mod error;
pub mod facade;
pub mod lockqueue;
pub mod manifest;
pub mod process;
pub mod recognize;
pub mod refs;
pub mod secure;
pub mod session;
pub mod sink;
pub mod version;

pub use config::Config;
pub use error::{GitProcessError, GitpinError, NotFoundError, SecurityError};
pub use facade::{resolve, LockfileEntry, NoLockfile};
pub use manifest::{Manifest, RemoteInfo};
pub use session::Session;
