//! Oculus Sonar Client
//!
//! Finds a sonar through its status broadcast, or replays a recording of the
//! data channel through the decoder.

mod settings;

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use oculus_protocol::AssemblerConfig;
use oculus_rx::{discover, FramePlayer, FrameRecorder, PingDispatcher, StatusListener};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::Settings;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sonar IP address, or "auto" to use the first sonar that announces itself
    #[arg(default_value = "auto")]
    ip: String,

    /// Replay a recorded data stream instead of listening
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write every accepted ping to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after this many pings or status messages (0 = unlimited)
    #[arg(short = 'n', long, default_value = "0")]
    frames: u64,

    /// Settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the effective settings to the settings file and exit
    #[arg(long)]
    write_config: bool,

    /// Print final statistics as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("oculus_client={level},oculus_protocol={level},oculus_rx={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut settings = Settings::load(args.config.as_deref())?;
    if args.verbose > 0 {
        settings.dump_frames = true;
    }

    if args.write_config {
        let path = args
            .config
            .clone()
            .or_else(Settings::settings_path)
            .context("Could not determine settings path")?;
        settings.save(&path)?;
        info!("Settings written to {}", path.display());
        return Ok(());
    }

    info!("Starting Oculus client");

    match &args.input {
        Some(input) => play(&args, &settings, input.clone()),
        None => listen(&args, &settings).await,
    }
}

/// Decode a recording, optionally re-recording the accepted pings
fn play(args: &Args, settings: &Settings, input: PathBuf) -> anyhow::Result<()> {
    let config = AssemblerConfig {
        max_frame_len: settings.max_frame_len,
    };
    let mut player = FramePlayer::open_with_config(&input, config)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let mut recorder = args
        .output
        .as_ref()
        .map(FrameRecorder::create)
        .transpose()?;

    let dump = settings.dump_frames;
    let mut dispatcher = PingDispatcher::new();
    dispatcher.on_legacy(move |ping| {
        info!("{}", ping);
        if dump {
            ping.dump();
        }
    });
    dispatcher.on_current(move |ping| {
        info!(
            "{} (heading {:.1}, pitch {:.1}, roll {:.1})",
            ping,
            ping.heading().unwrap_or_default(),
            ping.pitch().unwrap_or_default(),
            ping.roll().unwrap_or_default(),
        );
        if dump {
            ping.dump();
        }
    });

    let mut accepted = 0u64;
    while let Some(frame) = player.next_frame()? {
        // Rejections are logged and counted by the dispatcher
        if dispatcher.supply(&frame).is_err() {
            continue;
        }
        accepted += 1;
        if let Some(recorder) = recorder.as_mut() {
            recorder.record(frame.as_bytes())?;
        }
        if args.frames > 0 && accepted >= args.frames {
            break;
        }
    }

    if let Some(recorder) = recorder {
        let frames = recorder.frames();
        recorder.into_inner()?;
        info!("Recorded {} frames", frames);
    }

    let stats = dispatcher.stats();
    info!(
        "{} frames: {} legacy, {} current, {} rejected, {} bytes skipped",
        player.frames(),
        stats.legacy,
        stats.current,
        stats.rejected.total(),
        player.discarded()
    );
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}

/// Report status broadcasts from the selected sonar
async fn listen(args: &Args, settings: &Settings) -> anyhow::Result<()> {
    let target = match args.ip.as_str() {
        "auto" => {
            let timeout = Duration::from_secs(settings.discovery_timeout_secs);
            let record = discover(settings.listener.clone(), timeout).await?;
            record.status.ip_addr
        }
        ip => ip
            .parse::<Ipv4Addr>()
            .with_context(|| format!("Invalid sonar address {:?}", ip))?,
    };
    info!("Listening for status from {}", target);

    let mut listener = StatusListener::bind(settings.listener.clone()).await?;
    let (record_tx, mut record_rx) = mpsc::unbounded_channel();
    listener.on_status(move |record, valid| {
        if record.status.ip_addr == target {
            let _ = record_tx.send((record.clone(), valid));
        }
    });
    let handle = listener.spawn();

    let mut seen = 0u64;
    loop {
        tokio::select! {
            received = record_rx.recv() => {
                let Some((record, valid)) = received else {
                    bail!("Status listener stopped");
                };
                if !valid {
                    warn!("Invalid status from {}", record.source);
                    continue;
                }
                let status = &record.status;
                info!(
                    "Sonar {} part {} fw {:#010x} mac {} connected to {}",
                    status.device_id,
                    status.part_number,
                    record.firmware_version(),
                    status.mac_string(),
                    status.connected_ip
                );
                if args.json {
                    println!("{}", serde_json::to_string(&record)?);
                }
                seen += 1;
                if args.frames > 0 && seen >= args.frames {
                    break;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    let counters = handle.shutdown().await?;
    info!(
        "Status messages: {} valid, {} invalid",
        counters.valid, counters.invalid
    );
    Ok(())
}
