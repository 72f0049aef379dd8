use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "beambot")]
#[command(about = "Discord bot that relays prompts to Beam image generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Connect to Discord and relay prompts until interrupted (the default when no command is given).
    Run {
        /// Config file path (default: BEAMBOT_CONFIG_PATH or ~/.beambot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Load the configuration and environment, report problems, and list mapped channels.
    Check {
        /// Config file path (default: BEAMBOT_CONFIG_PATH or ~/.beambot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // .env first so RUST_LOG and tokens from it are visible below.
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match dotenv {
        Ok(path) => log::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("ignoring .env: {}", e),
    }

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("beambot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Check { config }) => {
            if let Err(e) = run_check(config) {
                log::error!("check failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config }) => {
            if let Err(e) = run_bot(config).await {
                log::error!("bot failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = run_bot(None).await {
                log::error!("bot failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_check(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    println!("config: {}", path.display());
    lib::config::resolve_discord_token(&config)?;
    lib::config::resolve_job_token(&config)?;
    println!("tokens: ok");
    println!("artifacts: {}", lib::config::resolve_artifact_dir(&config).display());
    let mut mapped: Vec<_> = config.channels.iter().collect();
    mapped.sort();
    println!("channels: {}", mapped.len());
    for (conversation, endpoint) in mapped {
        println!("  {} -> {}", conversation, endpoint);
    }
    Ok(())
}

async fn run_bot(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, path) = lib::config::load_config(config_path)?;
    log::info!(
        "loaded config ({}), {} mapped channel(s)",
        path.display(),
        config.channels.len()
    );
    if config.channels.is_empty() {
        log::warn!("no channels mapped; every request will be answered as unsupported");
    }
    let discord_token = lib::config::resolve_discord_token(&config)?;
    let shutdown = CancellationToken::new();
    let relay = Arc::new(lib::relay::Relay::from_config(
        Arc::new(config),
        shutdown.clone(),
    )?);

    tokio::spawn(shutdown_signal(shutdown.clone()));
    discord_channel::run(&discord_token, relay, shutdown).await
}

/// Cancel `shutdown` on SIGINT or SIGTERM. In-flight polls stop at their next wait.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, cancelling in-flight requests");
    shutdown.cancel();
}
