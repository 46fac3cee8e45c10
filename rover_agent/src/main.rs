use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rover_agent::{Agent, AgentConfig};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "rover")]
#[command(about = "ROVER - on-board remote-control agent")]
#[command(version)]
struct Cli {
    /// Config file (default: ./rover.toml, then ~/.rover/rover.toml)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Broker WebSocket URL, overrides the config file
    #[arg(short = 'b', long = "broker")]
    broker: Option<String>,

    /// Use simulated serial and camera drivers
    #[arg(short = 's', long = "simulate")]
    simulate: bool,

    /// Log filter, e.g. "debug" or "rover_agent=trace" (RUST_LOG wins if set)
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    match run(cli) {
        // The agent only returns once the broker connection is gone
        Ok(()) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let (mut config, source) =
        AgentConfig::discover(cli.config.as_deref()).context("loading configuration")?;
    match source {
        Some(path) => info!("configuration from {}", path.display()),
        None => info!("no configuration file, using defaults"),
    }
    if let Some(url) = cli.broker {
        config.broker.url = url;
    }
    config.simulate |= cli.simulate;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    let agent = Agent::new(config).context("initializing agent")?;
    let end = runtime.block_on(agent.run())?;
    error!("broker connection {}, exiting", end);
    Ok(())
}
