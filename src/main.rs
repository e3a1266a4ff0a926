mod config;
mod relay;
mod sync;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::relay::{SourceClient, TargetClient};
use crate::sync::{Scheduler, SyncEngine};

/// Flashbots boost relay. Credentials embedded in the URL are passed through
/// unmodified.
const DEFAULT_SOURCE_RELAY: &str = "https://0xafa4c6985aa049fb79dd37010438cfebeb0f2bd42b115b89dd678dab0670c1de38da0c4e9138c9290a398ecd9a0b3110@boost-relay.flashbots.net";

/// Keep a target relay's validator registrations in sync with a source relay.
#[derive(Debug, Parser)]
#[command(name = "validator-registration-sync", version)]
struct Args {
    /// URL of the target relay to forward registrations to
    #[arg(short, long)]
    target_relay: String,

    /// URL of the source relay to pull registrations from
    #[arg(short, long, default_value = DEFAULT_SOURCE_RELAY)]
    source_relay: String,

    /// Polling interval in seconds
    #[arg(short, long, default_value_t = 6)]
    interval: u64,

    /// Enable detailed debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::time())
        .init();

    // Startup configuration validation is the only fatal error path;
    // steady-state cycle failures never terminate the process.
    let config = Config::new(&args.source_relay, &args.target_relay, args.interval)
        .context("invalid configuration")?;

    info!(
        source = %config.source_url,
        target = %config.target_url,
        interval = ?config.interval,
        "starting registration sync daemon"
    );

    let source = SourceClient::new(config.source_url.clone(), config.request_timeout());
    let target = TargetClient::new(config.target_url.clone(), config.request_timeout());
    let mut scheduler = Scheduler::new(SyncEngine::new(source, target), config.interval);

    let probe = scheduler.liveness_probe();
    let interval = config.interval;
    tokio::spawn(async move {
        // Surface a stuck control loop in the logs for the external
        // process-state check.
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if !probe.is_healthy() {
                warn!(
                    cycles = probe.cycles_completed(),
                    "liveness: no cycle completed within the grace window"
                );
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("failed to listen for shutdown signal: {e}"),
        }
    });

    scheduler.run(shutdown_rx).await;
    Ok(())
}
