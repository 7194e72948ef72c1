//! Ambient configuration for a resolver run: where working directories
//! live, how to reach `ssh`, and whether network access is permitted at
//! all. Analogous to the small `Config`/`Options` structs the outer system
//! would otherwise thread through every call; kept here so C7/C8 don't each
//! invent their own.

use std::path::{Path, PathBuf};

/// Resolver-wide settings, constructed once by the outer system and passed
/// by reference into [`crate::facade::resolve`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory under which per-repository working copies are kept.
    /// Defaults to the system temp directory.
    temp_root: PathBuf,
    /// Overrides `GIT_SSH_COMMAND` when set.
    ssh_command: Option<String>,
    /// When `true`, no subprocess is allowed to touch the network; only
    /// already-populated working directories can be used. Intended for
    /// tests and air-gapped CI.
    pub offline: bool,
    /// Hostnames for which the C4 security policy is not enforced (e.g. a
    /// trusted internal mirror reachable only over `http://`).
    insecure_allowed_hosts: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir().join("gitpin"),
            ssh_command: None,
            offline: false,
            insecure_allowed_hosts: Vec::new(),
        }
    }
}

impl Config {
    pub fn new(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
            ..Self::default()
        }
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    pub fn with_ssh_command(mut self, command: impl Into<String>) -> Self {
        self.ssh_command = Some(command.into());
        self
    }

    pub fn ssh_command(&self) -> Option<&str> {
        self.ssh_command.as_deref()
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn allow_insecure_host(mut self, host: impl Into<String>) -> Self {
        self.insecure_allowed_hosts.push(host.into());
        self
    }

    pub fn is_insecure_host_allowed(&self, host: &str) -> bool {
        self.insecure_allowed_hosts.iter().any(|h| h == host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_temp_root_is_under_system_temp() {
        let config = Config::default();
        assert!(config.temp_root().starts_with(std::env::temp_dir()));
    }

    #[test]
    fn insecure_host_allowlist_is_exact_match() {
        let config = Config::default().allow_insecure_host("mirror.internal");
        assert!(config.is_insecure_host_allowed("mirror.internal"));
        assert!(!config.is_insecure_host_allowed("other.internal"));
    }
}
