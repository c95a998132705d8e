//! relay-replay binary
//!
//! Replays a JSON-lines host transcript through the bridge with the chat
//! relay attached, logging every relayed message.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Flag / env                              | Default | Description                          |
//! |-----------------------------------------|---------|--------------------------------------|
//! | `--config` / `RELAY_CONFIG`             | *(none)*| TOML file with `RelayConfig` keys    |
//! | `--script` / `RELAY_SCRIPT`             | —       | Transcript to replay                 |
//! | `--world-announce` / `RELAY_WORLD_ANNOUNCE` | `true` | Rule for worlds the script never defines |
//!
//! `RELAY_*` variables also override individual `RelayConfig` keys.

use anyhow::{Context, Result};
use clap::Parser;
use relay_bridge::{
    relay::{self, LogSink, RelayWorker},
    replay::ScriptedHost,
    Bridge, EventBus, RelayConfig, WorldRules,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "relay-replay",
    about = "Replay host lifecycle transcripts through the relay bridge",
    version
)]
struct Args {
    /// Relay configuration file (TOML)
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// JSON-lines transcript of host transitions
    #[arg(long, env = "RELAY_SCRIPT")]
    script: PathBuf,

    /// Announce achievements in worlds without an explicit rule
    #[arg(
        long,
        env = "RELAY_WORLD_ANNOUNCE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    world_announce: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relay_bridge=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = RelayConfig::load(args.config.as_deref()).context("Failed to load relay config")?;
    log::info!(
        "Starting relay-replay (script='{}', queue={}, world_announce={})",
        args.script.display(),
        config.queue_capacity,
        args.world_announce,
    );

    // Bus + relay subscriber + worker
    let bus = Arc::new(EventBus::new());
    let (subscriber, rx) = relay::channel(config);
    let subscriber = Arc::new(subscriber);
    subscriber.attach(&bus);
    let worker = RelayWorker::spawn(rx, Arc::new(LogSink));

    if let Err(e) = subscriber.server_started() {
        log::warn!("Failed to queue server started message: {}", e);
    }

    // Replay the transcript
    let file = File::open(&args.script)
        .with_context(|| format!("Failed to open script {}", args.script.display()))?;
    let mut host = ScriptedHost::new(
        Arc::new(Bridge::new(bus.clone())),
        WorldRules {
            announce_achievements: args.world_announce,
        },
    );
    let replay = host.run_script(BufReader::new(file));

    if let Err(e) = subscriber.server_stopped() {
        log::warn!("Failed to queue server stopped message: {}", e);
    }

    // Dropping the host, bus and subscriber releases the last queue sender,
    // which lets the worker drain and exit.
    drop(host);
    drop(bus);
    drop(subscriber);

    let stats = tokio::select! {
        joined = worker => joined.context("Relay worker panicked")?,
        _ = tokio::signal::ctrl_c() => {
            log::info!("relay-replay interrupted (SIGINT)");
            return Ok(());
        }
    };

    let replay = replay.context("Replay aborted")?;
    log::info!(
        "Replayed {} transitions ({} completions); relayed {} messages, {} failed",
        replay.transitions,
        replay.completions,
        stats.delivered,
        stats.failed,
    );
    Ok(())
}
