use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stationwatch::{Agent, Settings};

#[derive(Parser, Debug)]
#[command(name = "stationwatch")]
#[command(about = "Telemetry aggregation and health alerting agent for off-grid stations")]
struct Args {
    /// Path to a settings file (overrides built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Telemetry base directory (overrides settings)
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// Seconds between scheduler ticks (overrides settings)
    #[arg(long)]
    tick_secs: Option<u64>,

    /// Webhook endpoint for status cards (overrides settings)
    #[arg(long)]
    webhook_url: Option<String>,

    /// Run a single tick and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(base_dir) = args.base_dir {
        settings.base_dir = base_dir;
    }
    if let Some(tick_secs) = args.tick_secs {
        settings.tick_secs = tick_secs;
    }
    if let Some(webhook_url) = args.webhook_url {
        settings.webhook_url = webhook_url;
    }

    let mut agent = Agent::new(settings)?;
    if args.once {
        agent.tick();
        return Ok(());
    }
    agent.run();
    Ok(())
}
