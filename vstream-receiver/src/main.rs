//! vstream receiver — entry point.
//!
//! ```text
//! vstream-receiver                       Listen on 0.0.0.0:9999
//! vstream-receiver --port 7000 --fps 24  Forced playback rate
//! vstream-receiver --display file        Keep the latest frame on disk
//! vstream-receiver --config <path>       Load a custom config TOML
//! vstream-receiver --gen-config          Write default config to stdout
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vstream_core::{
    DecodedFrame, DisplaySink, FileSink, FrameBuffer, Metrics, NullSink, OverflowPolicy,
    PlaybackPump, ReceivePump, web,
};

use crate::config::ReceiverConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "vstream-receiver",
    about = "vstream receiver — JPEG-over-TCP video playback"
)]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "vstream-receiver.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Interface to bind.
    #[arg(short, long)]
    address: Option<String>,

    /// TCP port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Playback FPS override (0 = use the sender's value).
    #[arg(long)]
    fps: Option<f64>,

    /// Playback buffer capacity in frames.
    #[arg(long)]
    buffer: Option<usize>,

    /// Smaller pre-fill before playback starts.
    #[arg(long)]
    low_latency: bool,

    /// Display mode: "none" or "file".
    #[arg(long)]
    display: Option<String>,

    /// HTTP port for the metrics endpoint.
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Disable the metrics endpoint.
    #[arg(long)]
    no_metrics: bool,
}

fn apply_cli(config: &mut ReceiverConfig, cli: &Cli) {
    if let Some(address) = &cli.address {
        config.network.address = address.clone();
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(fps) = cli.fps {
        config.playback.fps = fps;
    }
    if let Some(buffer) = cli.buffer {
        config.playback.buffer_capacity = buffer;
    }
    if cli.low_latency {
        config.playback.low_latency = true;
    }
    if let Some(display) = &cli.display {
        config.display.mode = display.clone();
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if cli.no_metrics {
        config.metrics.enabled = false;
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ReceiverConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ReceiverConfig::load(&cli.config);
    apply_cli(&mut config, &cli);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("vstream-receiver v{}", env!("CARGO_PKG_VERSION"));
    info!("listen: {}:{}", config.network.address, config.network.port);
    match config.fps_override() {
        Some(fps) => info!("playback: forced {fps} fps"),
        None => info!("playback: sender-negotiated fps"),
    }

    let running = Arc::new(AtomicBool::new(true));
    let stop = Arc::clone(&running);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received — shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    let metrics = Arc::new(Metrics::new());
    let buffer: Arc<FrameBuffer<DecodedFrame>> = Arc::new(FrameBuffer::new(
        config.playback.buffer_capacity,
        OverflowPolicy::DropOldest,
    ));

    let listen: SocketAddr =
        format!("{}:{}", config.network.address, config.network.port).parse()?;
    let mut receive = ReceivePump::bind(
        listen,
        Arc::clone(&buffer),
        Arc::clone(&metrics),
        Arc::clone(&running),
    )
    .await?;
    let session_rx = receive.session_watch();

    let sink: Box<dyn DisplaySink> = match config.display.mode.as_str() {
        "file" => Box::new(FileSink::new(
            config.display.path.clone().into(),
            config.display.quality,
        )),
        _ => Box::new(NullSink),
    };
    let mut playback = PlaybackPump::new(
        Arc::clone(&buffer),
        sink,
        Arc::clone(&metrics),
        Arc::clone(&running),
        session_rx,
        config.fps_override(),
    )
    .with_low_latency(config.playback.low_latency);

    if config.metrics.enabled {
        let addr: SocketAddr = format!("0.0.0.0:{}", config.metrics.port).parse()?;
        let metrics = Arc::clone(&metrics);
        let running = Arc::clone(&running);
        tokio::spawn(async move {
            if let Err(e) = web::serve(addr, metrics, running).await {
                tracing::error!("metrics endpoint failed: {e}");
            }
        });
    }

    let status = spawn_status_log(Arc::clone(&metrics), Arc::clone(&running));
    let playback_handle = tokio::spawn(async move { playback.run().await });
    let receive_result = receive.run().await;

    // A fatal receive error (exhausted handshake retries) must stop
    // the rest of the process, not leave it half-running.
    running.store(false, Ordering::SeqCst);
    playback_handle.await??;
    status.await?;
    receive_result?;
    Ok(())
}

/// 1 Hz one-line summary of the stream.
fn spawn_status_log(metrics: Arc<Metrics>, running: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while running.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let s = metrics.snapshot();
            info!(
                "{:.2} MB/s | {:.1} fps | frame {:.1} KB | buffer {:.0}% | shown {} | drop {:.1}%",
                s.bandwidth_usage,
                s.actual_fps,
                s.frame_size,
                s.buffer_fullness,
                s.frames_displayed,
                s.frame_drop_rate,
            );
        }
    })
}

// ── Tests ────────────────────────────────────────────────────────
