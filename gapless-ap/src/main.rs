//! Gapless Audio Player (gapless-ap) - Main entry point
//!
//! Plays a list of audio files as one continuous stream: every file becomes a
//! chunk, decoded concurrently and scheduled back to back with no gap.
//!
//! Subcommands:
//! - `play`: render to an audio device until the stream ends or Ctrl+C
//! - `render`: render offline to a WAV file
//! - `probe`: decode only, print the stream timeline
//! - `devices`: list output devices

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use gapless_ap::audio::{AudioOutput, Mixer, MixerBackend, SymphoniaDecoder, WavRenderer};
use gapless_ap::config::PlayerConfig;
use gapless_ap::StreamScheduler;
use gapless_common::events::{EventBus, SchedulerEvent};
use gapless_common::timing::{ticks_to_ms, ticks_to_samples, ticks_to_seconds};
use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for gapless-ap
#[derive(Parser, Debug)]
#[command(name = "gapless-ap")]
#[command(about = "Gapless sequential audio player")]
#[command(version)]
struct Args {
    /// Configuration file (overrides GAPLESS_CONFIG and the default location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter directive (overrides the configuration file)
    #[arg(short, long, env = "GAPLESS_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play files gaplessly on an audio device
    Play {
        /// Audio files, played in the order given
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Start at this percentage of the stream (0-100)
        #[arg(short, long)]
        seek: Option<f64>,

        /// Output device name
        #[arg(short, long, env = "GAPLESS_DEVICE")]
        device: Option<String>,

        /// Print scheduler events as JSON lines on stdout
        #[arg(long)]
        print_events: bool,
    },

    /// Render files gaplessly into a WAV file
    Render {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Start at this percentage of the stream (0-100)
        #[arg(short, long)]
        seek: Option<f64>,

        /// Output sample rate in Hz
        #[arg(long, default_value = "44100")]
        sample_rate: u32,

        /// Output channel count
        #[arg(long, default_value = "2")]
        channels: u16,
    },

    /// Decode files and print the resulting timeline
    Probe {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List audio output devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) = PlayerConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    let device_override = match &args.command {
        Command::Play { device, .. } => device.clone(),
        _ => None,
    };
    let config = config.with_overrides(device_override, args.log_level.clone());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(log_directive(&config.logging.level)))
                .unwrap_or_else(|_| EnvFilter::new("gapless_ap=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting gapless-ap v{}", env!("CARGO_PKG_VERSION"));
    match source.path() {
        Some(path) if path.exists() => info!("Configuration: {}", path.display()),
        _ => info!("Configuration: built-in defaults"),
    }

    match args.command {
        Command::Play {
            files,
            seek,
            print_events,
            ..
        } => play(&config, &files, seek, print_events).await,
        Command::Render {
            files,
            output,
            seek,
            sample_rate,
            channels,
        } => render(&config, &files, &output, seek, sample_rate, channels).await,
        Command::Probe { files } => probe(&config, &files).await,
        Command::Devices => {
            for name in AudioOutput::list_devices()? {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

/// Expand a bare level into a filter for this workspace's crates
fn log_directive(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("gapless_ap={level},gapless_common={level}")
    }
}

async fn play(
    config: &PlayerConfig,
    files: &[PathBuf],
    seek: Option<f64>,
    print_events: bool,
) -> Result<()> {
    let mut output = AudioOutput::open(config.audio.device.as_deref(), config.audio.buffer_size)
        .context("Failed to open audio output")?;
    output.start().context("Failed to start audio output")?;

    let scheduler = StreamScheduler::new(
        Arc::new(MixerBackend::new(output.mixer())),
        Arc::new(SymphoniaDecoder::new()),
        EventBus::new(config.events.capacity),
    );
    let mut events = scheduler.subscribe();

    load_chunks(&scheduler, files).await?;
    begin(&scheduler, seek)?;
    info!(
        "Playing {} chunks ({:.1}s) on '{}'",
        scheduler.chunk_count(),
        ticks_to_seconds(scheduler.total_duration()),
        output.device_name()
    );

    let mut health_check = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if print_events {
                        println!("{}", serde_json::to_string(&event)?);
                    }
                    if matches!(event, SchedulerEvent::StreamEnded { .. }) {
                        info!("Playback complete");
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Event subscriber lagged, {} events missed", missed);
                    if !scheduler.is_playing() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping");
                scheduler.stop();
                break;
            }
            _ = health_check.tick() => {}
        }

        if output.has_error() {
            scheduler.stop();
            bail!("Audio device reported a stream error");
        }
    }

    output.stop();
    Ok(())
}

async fn render(
    config: &PlayerConfig,
    files: &[PathBuf],
    output: &Path,
    seek: Option<f64>,
    sample_rate: u32,
    channels: u16,
) -> Result<()> {
    if sample_rate == 0 || channels == 0 {
        bail!("Sample rate and channel count must be positive");
    }

    let mixer = Arc::new(Mutex::new(Mixer::new(sample_rate, channels)));
    let scheduler = Arc::new(StreamScheduler::new(
        Arc::new(MixerBackend::new(Arc::clone(&mixer))),
        Arc::new(SymphoniaDecoder::new()),
        EventBus::new(config.events.capacity),
    ));

    load_chunks(&scheduler, files).await?;
    begin(&scheduler, seek)?;

    // One second of slack past the nominal end
    let max_frames =
        ticks_to_samples(scheduler.total_duration(), sample_rate) as u64 + sample_rate as u64;

    let renderer = WavRenderer::new(mixer);
    let watched = Arc::clone(&scheduler);
    let path = output.to_path_buf();
    let stats = tokio::task::spawn_blocking(move || {
        renderer.render_to_file(&path, || !watched.is_playing(), max_frames)
    })
    .await
    .context("Render task panicked")?
    .with_context(|| format!("Failed to render {}", output.display()))?;

    if scheduler.is_playing() {
        warn!("Render stopped at the frame limit before the stream ended");
        scheduler.stop();
    }

    println!(
        "Wrote {} ({} frames, {:.2}s, {} chunks)",
        output.display(),
        stats.frames,
        stats.frames as f64 / sample_rate as f64,
        stats.completions
    );
    Ok(())
}

async fn probe(config: &PlayerConfig, files: &[PathBuf]) -> Result<()> {
    // Never rendered; only the timeline is of interest
    let mixer = Arc::new(Mutex::new(Mixer::new(44100, 2)));
    let scheduler = StreamScheduler::new(
        Arc::new(MixerBackend::new(mixer)),
        Arc::new(SymphoniaDecoder::new()),
        EventBus::new(config.events.capacity),
    );

    let loaded = load_chunks(&scheduler, files).await?;

    for ((path, span), index) in loaded.iter().zip(scheduler.spans()).zip(0..) {
        println!(
            "{:>3}  {:>10.3}s .. {:>10.3}s  ({:>8}ms)  {}",
            index,
            ticks_to_seconds(span.begin_ticks),
            ticks_to_seconds(span.end_ticks),
            ticks_to_ms(span.duration_ticks()),
            path.display()
        );
    }
    println!(
        "total {:.3}s ({} ticks)",
        ticks_to_seconds(scheduler.total_duration()),
        scheduler.total_duration()
    );
    Ok(())
}

/// Read every file, then issue all `add_chunk` calls in order
///
/// Files that fail to decode are skipped. Returns the files that were
/// appended, in stream order.
async fn load_chunks<'a>(
    scheduler: &StreamScheduler,
    files: &'a [PathBuf],
) -> Result<Vec<&'a PathBuf>> {
    let mut contents = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        contents.push(bytes);
    }

    let pending: Vec<_> = contents
        .into_iter()
        .map(|bytes| scheduler.add_chunk(bytes))
        .collect();

    let mut loaded = Vec::with_capacity(files.len());
    for (path, result) in files.iter().zip(join_all(pending).await) {
        match result {
            Ok(total) => {
                debug!("Loaded {} (stream now {}ms)", path.display(), ticks_to_ms(total));
                loaded.push(path);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    if loaded.is_empty() {
        bail!("None of the {} files could be decoded", files.len());
    }
    Ok(loaded)
}

fn begin(scheduler: &StreamScheduler, seek: Option<f64>) -> Result<()> {
    match seek {
        Some(percent) => scheduler
            .seek(percent)
            .with_context(|| format!("Cannot seek to {}%", percent))?,
        None => scheduler.start(),
    }
    Ok(())
}
