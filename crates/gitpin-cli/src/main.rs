use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gitpin_core::{resolve, Config, NoLockfile};

/// Resolve a git-hosted package specifier to a pinned commit and manifest.
#[derive(Parser)]
#[command(name = "gitpin", version)]
struct Args {
    /// The dependency specifier, e.g. `user/repo`, `git@host:user/repo.git`,
    /// or a full `git+https://` URL.
    specifier: String,

    /// Registry manifest filenames to try, in order, at the resolved commit.
    #[arg(short, long, default_value = "package.json")]
    registry_file: Vec<String>,

    /// Root directory for cached working copies.
    #[arg(long)]
    temp_root: Option<std::path::PathBuf>,

    /// Override the SSH command used for `ssh://` and scp-like remotes.
    #[arg(long)]
    ssh_command: Option<String>,

    /// Resolve only from already-populated working copies; never touch the
    /// network.
    #[arg(long)]
    offline: bool,

    /// Hostname that may be fetched over `git://`/`http://` without the
    /// HTTPS upgrade-or-fail policy. Repeatable.
    #[arg(long = "allow-insecure-host")]
    insecure_hosts: Vec<String>,
}

async fn run(args: Args) -> Result<()> {
    let mut config = match args.temp_root {
        Some(root) => Config::new(root),
        None => Config::default(),
    };
    if let Some(command) = args.ssh_command {
        config = config.with_ssh_command(command);
    }
    config = config.with_offline(args.offline);
    for host in args.insecure_hosts {
        config = config.allow_insecure_host(host);
    }

    let filenames: Vec<&str> = args.registry_file.iter().map(String::as_str).collect();
    let manifest = resolve(&args.specifier, &filenames, &config, &NoLockfile)
        .await
        .with_context(|| format!("failed to resolve `{}`", args.specifier))?;

    let json = serde_json::to_string_pretty(&manifest)?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("GITPIN_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    debug!(specifier = %args.specifier, "starting resolve");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
