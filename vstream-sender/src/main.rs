//! vstream sender — entry point.
//!
//! ```text
//! vstream-sender                         Stream the synthetic test pattern
//! vstream-sender --source images --source-path ./frames
//! vstream-sender --address 10.0.0.2 --port 9999 --fps 24 --quality 70
//! vstream-sender --config <path>         Load a custom config TOML
//! vstream-sender --gen-config            Write default config to stdout
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
    CapturePump, EncodedFrame, FileSink, FrameBuffer, FrameSource, ImageDirSource, Metrics,
    OverflowPolicy, PatternSource, TransmitPump, web,
};

use crate::config::SenderConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "vstream-sender", about = "vstream sender — JPEG-over-TCP video streaming")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "vstream-sender.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Receiver host.
    #[arg(short, long)]
    address: Option<String>,

    /// Receiver port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Target frames per second.
    #[arg(long)]
    fps: Option<f64>,

    /// JPEG quality (1-100).
    #[arg(short, long)]
    quality: Option<u8>,

    /// Uniform resolution scale applied at capture.
    #[arg(long)]
    scale: Option<f64>,

    /// Send buffer capacity in frames.
    #[arg(long)]
    buffer: Option<usize>,

    /// Frame source: "pattern" or "images".
    #[arg(long)]
    source: Option<String>,

    /// Directory of JPEG frames for the "images" source.
    #[arg(long)]
    source_path: Option<PathBuf>,

    /// Preview mode: "none" or "file".
    #[arg(long)]
    display: Option<String>,

    /// HTTP port for the metrics endpoint.
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Disable the metrics endpoint.
    #[arg(long)]
    no_metrics: bool,
}

fn apply_cli(config: &mut SenderConfig, cli: &Cli) {
    if let Some(address) = &cli.address {
        config.network.address = address.clone();
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(fps) = cli.fps {
        config.stream.fps = fps;
    }
    if let Some(quality) = cli.quality {
        config.stream.quality = quality;
    }
    if let Some(scale) = cli.scale {
        config.stream.scale = scale;
    }
    if let Some(buffer) = cli.buffer {
        config.stream.buffer_capacity = buffer;
    }
    if let Some(source) = &cli.source {
        config.source.kind = source.clone();
    }
    if let Some(path) = &cli.source_path {
        config.source.path = path.display().to_string();
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
        let text = toml::to_string_pretty(&SenderConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = SenderConfig::load(&cli.config);
    apply_cli(&mut config, &cli);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("vstream-sender v{}", env!("CARGO_PKG_VERSION"));
    info!("target: {}:{}", config.network.address, config.network.port);
    info!(
        "stream: {} fps, quality {}, scale {}",
        config.stream.fps, config.stream.quality, config.stream.scale
    );

    let peer: SocketAddr =
        format!("{}:{}", config.network.address, config.network.port).parse()?;

    let running = Arc::new(AtomicBool::new(true));
    let stop = Arc::clone(&running);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received — shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    match config.source.kind.as_str() {
        "pattern" => {
            let source = PatternSource::new(
                config.source.width,
                config.source.height,
                config.source.fps,
            );
            run_pipeline(source, config, peer, running).await
        }
        "images" => {
            let source =
                ImageDirSource::open(config.source.path.as_ref(), config.source.fps).await?;
            info!("source: {} frames from {}", source.frame_count(), config.source.path);
            run_pipeline(source, config, peer, running).await
        }
        other => Err(format!("unknown source kind {other:?} (expected pattern|images)").into()),
    }
}

// ── Pipeline ─────────────────────────────────────────────────────

async fn run_pipeline<S>(
    source: S,
    config: SenderConfig,
    peer: SocketAddr,
    running: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: FrameSource + 'static,
{
    let metrics = Arc::new(Metrics::new());
    let buffer: Arc<FrameBuffer<EncodedFrame>> = Arc::new(FrameBuffer::new(
        config.stream.buffer_capacity,
        OverflowPolicy::RejectNewest,
    ));

    let mut capture = CapturePump::new(
        source,
        Arc::clone(&buffer),
        Arc::clone(&metrics),
        Arc::clone(&running),
        config.stream.fps,
        config.stream.scale,
        config.stream.quality,
    );
    if config.display.mode == "file" {
        capture = capture.with_preview(Box::new(FileSink::new(
            config.display.path.clone().into(),
            config.display.quality,
        )));
    }

    let session = capture.session_info();
    session.validate()?;
    metrics.set_session(session.clone());
    info!(
        "session: {}x{} @ {:.1} fps, quality {}",
        session.width, session.height, session.target_fps, session.quality
    );

    let mut transmit = TransmitPump::new(
        peer,
        session,
        Arc::clone(&buffer),
        Arc::clone(&metrics),
        Arc::clone(&running),
    );

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
    let capture_handle = tokio::spawn(async move { capture.run().await });
    let transmit_handle = tokio::spawn(async move { transmit.run().await });

    capture_handle.await??;
    transmit_handle.await??;
    status.await?;
    Ok(())
}

/// 1 Hz one-line summary of the stream.
fn spawn_status_log(metrics: Arc<Metrics>, running: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while running.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let s = metrics.snapshot();
            info!(
                "{:.2} MB/s | {:.1} fps | frame {:.1} KB | buffer {:.0}% | sent {} | dropped {}",
                s.bandwidth_usage,
                s.actual_fps,
                s.frame_size,
                s.buffer_fullness,
                s.frames_sent,
                s.frames_dropped,
            );
        }
    })
}

// ── Tests ────────────────────────────────────────────────────────
