//! Run command - start the ingestion engine against a scene.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use floortrack::config::SceneConfig;
use floortrack::engine::{Engine, EngineConfig, LocationUpdate};
use floortrack::hub::{HubConfig, LocationHub};
use floortrack::transition::FenceEventKind;

use crate::error::CliError;

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Scene document (georeference, fences, seed entities)
    #[arg(short, long, value_name = "FILE")]
    pub scene: PathBuf,

    /// JSONL update stream; reads stdin when omitted
    #[arg(short, long, value_name = "FILE")]
    pub updates: Option<PathBuf>,

    /// Echo broadcast frames to stdout
    #[arg(long)]
    pub echo: bool,

    /// Subscriber keep-alive interval in seconds
    #[arg(long, default_value_t = 15, value_name = "SECS")]
    pub heartbeat: u64,

    /// Write logs to a daily-rolling file in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Run the ingestion engine.
pub fn run(args: RunArgs, verbosity: u8) -> Result<(), CliError> {
    let _log_guard = floortrack::log::init_tracing(verbosity, args.log_dir.as_deref())?;

    // A broken scene is fatal here, before anything starts.
    let scene = SceneConfig::from_file(&args.scene)?;

    println!("FloorTrack v{}", floortrack::VERSION);
    println!("==============");
    println!();
    println!("Scene:      {}", args.scene.display());
    if let Some(zone) = scene.georeference.zone() {
        println!("Zone:       {}", zone);
    }
    println!("Fences:     {}", scene.fences.len());
    println!(
        "Seed:       {} providers, {} trackables",
        scene.providers.len(),
        scene.trackables.len()
    );
    match &args.updates {
        Some(path) => println!("Updates:    {}", path.display()),
        None => println!("Updates:    stdin"),
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let engine_config = EngineConfig::default();
    let engine = Engine::from_scene(scene, &engine_config)?;
    let metrics = engine.metrics();
    let event_log = engine.event_log();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            println!();
            println!("Received shutdown signal, stopping...");
            cancel.cancel();
        })
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Config(format!("Failed to create Tokio runtime: {}", e)))?;

    runtime.block_on(async {
        let hub = LocationHub::new(
            HubConfig {
                heartbeat_interval: Duration::from_secs(args.heartbeat),
            },
            metrics.clone(),
        );

        // The CLI is its own subscriber, standing in for the UI layer.
        let mut subscription = hub.subscribe().await;
        let echo = args.echo;
        tokio::spawn(async move {
            while let Some(frame) = subscription.receiver.recv().await {
                if echo {
                    println!("{}", frame);
                }
            }
        });

        let (tx, rx) = Engine::update_channel(&engine_config);
        let engine_task = tokio::spawn(engine.run(rx, Arc::clone(&hub), cancel.clone()));

        // Feed updates off the runtime; dropping the sender lets the
        // engine drain and stop once the stream ends.
        let updates_path = args.updates.clone();
        let feeder_cancel = cancel.clone();
        let mut feeder =
            tokio::task::spawn_blocking(move || feed_updates(updates_path.as_deref(), tx, &feeder_cancel));

        // A feeder blocked on stdin cannot observe cancellation, so the
        // shutdown path must not wait for it.
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = &mut feeder => {
                if let Err(e) = result {
                    warn!(error = %e, "Update feeder task failed");
                }
            }
        }
        if let Err(e) = engine_task.await {
            warn!(error = %e, "Engine task failed");
        }
    });

    let snapshot = metrics.snapshot();
    println!();
    println!("Session Summary");
    println!("───────────────");
    println!(
        "  Updates:    {} received ({} georeferenced, {} failed open)",
        snapshot.updates_received, snapshot.updates_normalized, snapshot.transform_failures
    );
    println!("  Events:     {} fence transitions", snapshot.events_emitted);
    println!(
        "  Broadcasts: {} delivered to {} subscriber(s)",
        snapshot.broadcasts_sent, snapshot.subscribers_connected
    );
    println!("  Uptime:     {}", snapshot.uptime_human());

    let recent = event_log.read().latest(10);
    if !recent.is_empty() {
        println!();
        println!("Recent events (newest first):");
        for event in recent {
            let kind = match event.event_type {
                FenceEventKind::RegionEntry => "entry",
                FenceEventKind::RegionExit => "exit",
            };
            let at = event
                .entry_time
                .or(event.exit_time)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            println!(
                "  #{:<4} {:<6} {:<16} {} [{}]",
                event.id, kind, event.fence_id, event.entity, at
            );
        }
    }

    Ok(())
}

/// Read JSONL updates from a file or stdin and queue them for the engine.
///
/// Malformed lines are logged and skipped; ingestion keeps going.
fn feed_updates(
    path: Option<&Path>,
    tx: mpsc::Sender<LocationUpdate>,
    cancel: &CancellationToken,
) -> u64 {
    let reader: Box<dyn BufRead> = match path {
        Some(path) => match std::fs::File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot open update stream");
                return 0;
            }
        },
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let mut fed = 0u64;
    for line in reader.lines() {
        if cancel.is_cancelled() {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read update line");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LocationUpdate>(&line) {
            Ok(update) => {
                // blocking_send applies queue backpressure; an error means
                // the engine is gone and there is nothing left to feed.
                if tx.blocking_send(update).is_err() {
                    break;
                }
                fed += 1;
            }
            Err(e) => {
                warn!(error = %e, "Skipping malformed update line");
            }
        }
    }
    fed
}
