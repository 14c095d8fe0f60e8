//! Command-line scorex player.
//!
//! Wires the pieces together: loads configuration, loads the score, starts
//! the scan engine task, and feeds it keyboard commands until the operator
//! quits.

mod keys;

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::Parser;
use scorex_core::{
    EngineConfig, FastDetector, OscTransmitter, PageSource, ScanEngine,
    ScoreSet,
};
use scorex_model::{ControlCommand, EngineEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(
    name = "scorex",
    version,
    about = "Scan graphic scores and stream their statistics as OSC parameters"
)]
struct Cli {
    /// Score pages in playback order; overrides the pages listed in the
    /// config file.
    #[arg(value_name = "PAGE")]
    pages: Vec<PathBuf>,

    /// Configuration file (TOML or JSON).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start scanning immediately and carry the scan onto the next page
    /// instead of stopping at the edge.
    #[arg(long)]
    autoplay: bool,

    /// Override the scan tick interval, e.g. "50ms".
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    tick_interval: Option<Duration>,

    /// Override the default page traversal time, e.g. "12s".
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    duration: Option<Duration>,

    /// Override the OSC destination host.
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Override the OSC destination port.
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "scorex=info,scorex_core=info,scorex_config=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn resolve_destination(endpoint: &str) -> anyhow::Result<SocketAddr> {
    endpoint
        .to_socket_addrs()
        .with_context(|| format!("invalid OSC destination {endpoint}"))?
        .next()
        .ok_or_else(|| anyhow!("OSC destination {endpoint} did not resolve"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (config, source) = scorex_config::load(cli.config.as_deref())?;
    config.validate()?;
    info!(?source, "configuration loaded");

    let sources: Vec<PageSource> = if cli.pages.is_empty() {
        config
            .score
            .pages
            .iter()
            .map(|entry| {
                let source = PageSource::new(&entry.path);
                match entry.duration() {
                    Some(duration) => source.with_duration(duration),
                    None => source,
                }
            })
            .collect()
    } else {
        cli.pages.iter().map(PageSource::new).collect()
    };
    if sources.is_empty() {
        bail!(
            "no score pages: pass image paths on the command line or list \
             them under [score] in the config file"
        );
    }

    let endpoint = format!(
        "{}:{}",
        cli.host.as_deref().unwrap_or(&config.osc.host),
        cli.port.unwrap_or(config.osc.port)
    );
    let destination = resolve_destination(&endpoint)?;
    info!(%destination, "streaming parameters over OSC");

    let engine_config = EngineConfig {
        tick_interval: cli
            .tick_interval
            .unwrap_or_else(|| config.scan.tick_interval()),
        window_width: config.scan.window_width,
        auto_advance: config.scan.auto_advance || cli.autoplay,
    };

    let default_duration = cli
        .duration
        .unwrap_or_else(|| config.score.default_duration());
    let score = ScoreSet::load(&sources, default_duration)?;
    info!(pages = score.page_count(), "score loaded");

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let engine = ScanEngine::new(
        engine_config,
        score,
        Box::new(FastDetector::new()),
        Box::new(OscTransmitter::new(destination)),
        event_tx,
    );
    let engine_task = tokio::spawn(engine.run(command_rx));

    if cli.autoplay {
        info!("autoplay: starting the scan");
        let _ = command_tx.send(ControlCommand::Scan);
    }

    let key_thread = std::thread::spawn(move || keys::run_key_loop(command_tx));

    while let Some(event) = event_rx.recv().await {
        report(&event);
        if matches!(event, EngineEvent::Stopped) {
            break;
        }
    }

    engine_task.await.context("engine task failed")??;
    if key_thread.join().is_err() {
        warn!("keyboard thread panicked");
    }

    Ok(())
}

/// Operator feedback for events the engine does not already narrate.
fn report(event: &EngineEvent) {
    match event {
        EngineEvent::StaticAnalyzed(analysis) => info!(
            objects = analysis.object_count,
            contrast = format_args!("{:.2}", analysis.contrast),
            proximity = format_args!("{:.2}", analysis.proximity),
            "page analyzed"
        ),
        EngineEvent::StaticFailed => warn!("page analysis failed"),
        EngineEvent::DetectorStalled { failures } => warn!(
            failures,
            "detector stalled, scan stopped; press 'b' to retry"
        ),
        EngineEvent::Stopped => info!("goodbye"),
        other => debug!(?other, "engine event"),
    }
}
