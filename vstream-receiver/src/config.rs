//! Configuration for the receiver binary.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Where to listen for the sender.
    pub network: NetworkConfig,
    /// Buffering and pacing parameters.
    pub playback: PlaybackConfig,
    /// Where decoded frames go.
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
    /// Interface to bind.
    pub address: String,
    /// TCP port to listen on.
    pub port: u16,
}

/// Buffering and pacing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Playback FPS override; 0 uses the sender's negotiated value.
    pub fps: f64,
    /// Playback buffer capacity in frames.
    pub buffer_capacity: usize,
    /// Smaller pre-fill before playback starts.
    pub low_latency: bool,
}

/// Where decoded frames go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// "none" or "file" (keep the latest frame on disk).
    pub mode: String,
    /// Output path for the "file" mode.
    pub path: String,
    /// JPEG quality for the file sink.
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

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            playback: PlaybackConfig::default(),
            display: DisplayConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 9999,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: 0.0,
            buffer_capacity: 5,
            low_latency: false,
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
            port: 8001,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ReceiverConfig {
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

    /// The FPS override, `None` meaning "use the sender's value".
    pub fn fps_override(&self) -> Option<f64> {
        (self.playback.fps > 0.0).then_some(self.playback.fps)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ReceiverConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("buffer_capacity"));
        assert!(text.contains("low_latency"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ReceiverConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ReceiverConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.port, 9999);
        assert_eq!(parsed.playback.buffer_capacity, 5);
    }

    #[test]
    fn zero_fps_means_negotiated() {
        let cfg = ReceiverConfig::default();
        assert_eq!(cfg.fps_override(), None);

        let mut forced = cfg.clone();
        forced.playback.fps = 24.0;
        assert_eq!(forced.fps_override(), Some(24.0));
    }
}
