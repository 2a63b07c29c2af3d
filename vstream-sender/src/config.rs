//! Configuration for the sender binary.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Where to send the stream.
    pub network: NetworkConfig,
    /// Encoding and pacing parameters.
    pub stream: StreamConfig,
    /// Frame source selection.
    pub source: SourceConfig,
    /// Local preview of outgoing frames.
    pub display: DisplayConfig,
    /// Metrics endpoint settings.
    pub metrics: MetricsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Receiver host.
    pub address: String,
    /// Receiver port.
    pub port: u16,
}

/// Encoding and pacing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Target frames per second.
    pub fps: f64,
    /// JPEG quality (1-100).
    pub quality: u8,
    /// Uniform resolution scale applied at capture.
    pub scale: f64,
    /// Send buffer capacity in frames.
    pub buffer_capacity: usize,
}

/// Frame source selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// "pattern" for the synthetic gradient, "images" for a directory
    /// of JPEG frames played in sorted order.
    pub kind: String,
    /// Directory path for the "images" source.
    pub path: String,
    /// Pattern source width.
    pub width: u32,
    /// Pattern source height.
    pub height: u32,
    /// Nominal source frame rate.
    pub fps: f64,
}

/// Local preview of outgoing frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// "none" or "file" (keep the latest frame on disk).
    pub mode: String,
    /// Output path for the "file" mode.
    pub path: String,
    /// JPEG quality for the preview file.
    pub quality: u8,
}

/// Metrics endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve `GET /metrics` on `port`.
    pub enabled: bool,
    /// HTTP port for the metrics endpoint.
    pub port: u16,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            stream: StreamConfig::default(),
            source: SourceConfig::default(),
            display: DisplayConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: 9999,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            quality: 80,
            scale: 1.0,
            buffer_capacity: 5,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: "pattern".into(),
            path: String::new(),
            width: 640,
            height: 480,
            fps: 30.0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: "none".into(),
            path: "latest-frame.jpg".into(),
            quality: 85,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl SenderConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
