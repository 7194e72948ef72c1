//! C1: invoke the `git` binary with a sanitized environment and stream its
//! stdout.
//!
//! Grounded on `pixi_git::git`'s `static GIT: LazyLock<Result<PathBuf, ..>>`
//! (locate the binary once via `which`) and on `uv-git`'s resolver, which
//! runs the actual git work inside `tokio::task::spawn_blocking` rather than
//! shelling out through an async process handle. The `git` CLI and the
//! `tar` crate are both synchronous, so bridging them through async I/O
//! buys nothing but complexity. Buffered and streamed invocation are kept
//! as separate entry points: [`GitRunner::run_buffered`] returns captured stdout
//! text, [`GitRunner::run_with_stdout`] hands the caller a synchronous
//! [`std::io::Read`] over the child's stdout so it can drive a `tar`
//! extractor or a hashing writer directly, without an intermediate copy.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::GitProcessError;

static GIT_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| which::which("git").ok());

/// Returns the path to the `git` executable, or `None` if it isn't on PATH.
pub fn git_path() -> Option<&'static Path> {
    GIT_PATH.as_deref()
}

fn base_command(cwd: Option<&Path>, ssh_command: Option<&str>) -> Result<Command, GitProcessError> {
    let git = git_path().ok_or_else(|| GitProcessError {
        args: "(locate)".to_string(),
        stderr: "git executable not found on PATH".to_string(),
    })?;
    let mut cmd = Command::new(git);
    // Credential prompts must never block a batch resolve.
    cmd.env("GIT_ASKPASS", "");
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd.env("GIT_SSH_COMMAND", ssh_command.unwrap_or("ssh -oBatchMode=yes"));
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    Ok(cmd)
}

fn render_args(args: &[&str]) -> String {
    args.join(" ")
}

/// A handle to the `git` executable. Carries an optional `GIT_SSH_COMMAND`
/// override so a caller-supplied SSH command (e.g. a custom key path) reaches
/// every invocation without threading it through each call site.
#[derive(Debug, Default, Clone)]
pub struct GitRunner {
    ssh_command: Option<String>,
}

impl GitRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ssh_command(ssh_command: impl Into<String>) -> Self {
        Self {
            ssh_command: Some(ssh_command.into()),
        }
    }

    /// Runs `git <args>`, awaiting process exit, and returns captured
    /// stdout as text. On nonzero exit, returns a [`GitProcessError`]
    /// carrying stderr.
    pub async fn run_buffered(
        &self,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<String, GitProcessError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let cwd = cwd.map(Path::to_path_buf);
        let ssh_command = self.ssh_command.clone();
        let rendered = render_args(&args.iter().map(String::as_str).collect::<Vec<_>>());
        debug!(args = %rendered, "running git");

        tokio::task::spawn_blocking(move || {
            let mut cmd = base_command(cwd.as_deref(), ssh_command.as_deref())?;
            cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());
            let output = cmd.output().map_err(|e| GitProcessError {
                args: args.join(" "),
                stderr: e.to_string(),
            })?;
            if !output.status.success() {
                return Err(GitProcessError {
                    args: args.join(" "),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        })
        .await
        .map_err(|e| GitProcessError {
            args: rendered.clone(),
            stderr: format!("task join error: {e}"),
        })?
    }

    /// Runs `git <args>`, and once the process is spawned, hands `consume`
    /// a synchronous reader over its stdout. `consume` must fully drain the
    /// reader; the runner then waits for process exit and checks the exit
    /// status, returning stderr on failure.
    pub async fn run_with_stdout<T, F>(
        &self,
        args: &[&str],
        cwd: Option<&Path>,
        consume: F,
    ) -> Result<T, GitProcessError>
    where
        F: FnOnce(&mut dyn Read) -> std::io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let cwd = cwd.map(Path::to_path_buf);
        let ssh_command = self.ssh_command.clone();
        let rendered = args.join(" ");
        debug!(args = %rendered, "running git (streamed)");

        tokio::task::spawn_blocking(move || {
            let mut cmd = base_command(cwd.as_deref(), ssh_command.as_deref())?;
            cmd.args(&args)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            let mut child = cmd.spawn().map_err(|e| GitProcessError {
                args: args.join(" "),
                stderr: e.to_string(),
            })?;
            let mut stdout = child.stdout.take().expect("stdout was piped");

            let result = consume(&mut stdout);
            drop(stdout);

            let output = child.wait_with_output().map_err(|e| GitProcessError {
                args: args.join(" "),
                stderr: e.to_string(),
            })?;

            if !output.status.success() {
                return Err(GitProcessError {
                    args: args.join(" "),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }

            result.map_err(|e| GitProcessError {
                args: args.join(" "),
                stderr: e.to_string(),
            })
        })
        .await
        .map_err(|e| GitProcessError {
            args: rendered.clone(),
            stderr: format!("task join error: {e}"),
        })?
    }

    /// Like [`Self::run_buffered`], but returns the raw stderr alongside a
    /// boolean success flag instead of failing. Used by C4/C6 probes that
    /// treat a nonzero exit as meaningful signal rather than an error.
    pub async fn probe(&self, args: &[&str], cwd: Option<&Path>) -> ProbeResult {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let cwd = cwd.map(Path::to_path_buf);
        let ssh_command = self.ssh_command.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let mut cmd = match base_command(cwd.as_deref(), ssh_command.as_deref()) {
                Ok(cmd) => cmd,
                Err(e) => {
                    return ProbeResult {
                        success: false,
                        stderr: e.stderr,
                    }
                }
            };
            cmd.args(&args).stdout(Stdio::null()).stderr(Stdio::piped());
            match cmd.output() {
                Ok(output) => ProbeResult {
                    success: output.status.success(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                },
                Err(e) => ProbeResult {
                    success: false,
                    stderr: e.to_string(),
                },
            }
        })
        .await;

        outcome.unwrap_or(ProbeResult {
            success: false,
            stderr: "task join error".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub success: bool,
    pub stderr: String,
}
