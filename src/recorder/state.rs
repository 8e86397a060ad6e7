//! Recorder configuration and results

use crate::capture::session::CaptureState;
use crate::recorder::error::{RecordingError, RecordingResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional config file inside the data directory
pub const CONFIG_FILE_NAME: &str = "recorder.json";

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Directory receiving the gaze log and the video
    pub data_dir: PathBuf,
    /// Gaze sampling rate (ticks per second)
    pub frame_rate: f64,
    /// Record a video alongside the gaze log
    pub capture_video: bool,
    pub simulation: SimulationConfig,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            frame_rate: 60.0,
            capture_video: true,
            simulation: SimulationConfig::default(),
        }
    }
}

/// Settings for the simulated gaze provider and capture service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    pub sweep_period_ms: u64,
    pub blink_interval_ms: u64,
    pub blink_duration_ms: u64,
    pub capture_latency_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sweep_period_ms: 4000,
            blink_interval_ms: 3000,
            blink_duration_ms: 150,
            capture_latency_ms: 20,
        }
    }
}

/// Per-user application data directory, falling back to the working directory
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "Crafter Station", "Gaze Recorder")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("gaze-recorder-data"))
}

impl RecorderConfig {
    /// Parse a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> RecordingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            RecordingError::ConfigurationError(format!("Invalid config {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `recorder.json` from the default data directory if it exists.
    pub fn load_or_default() -> RecordingResult<Self> {
        let path = default_data_dir().join(CONFIG_FILE_NAME);
        if path.exists() {
            tracing::info!("Loading config from {:?}", path);
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> RecordingResult<()> {
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 || self.frame_rate > 1000.0 {
            return Err(RecordingError::ConfigurationError(format!(
                "frameRate must be in (0, 1000], got {}",
                self.frame_rate
            )));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(RecordingError::ConfigurationError(
                "dataDir must not be empty".to_string(),
            ));
        }
        if self.simulation.blink_duration_ms > self.simulation.blink_interval_ms {
            return Err(RecordingError::ConfigurationError(
                "blinkDurationMs must not exceed blinkIntervalMs".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a recording run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub frames: u64,
    pub rows_written: u64,
    pub log_path: String,
    pub video_path: Option<String>,
    pub capture_state: Option<CaptureState>,
    /// First capture error, if the video side failed
    pub capture_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "frameRate": 30, "captureVideo": false }"#).unwrap();

        let config = RecorderConfig::load(&path).unwrap();
        assert_eq!(config.frame_rate, 30.0);
        assert!(!config.capture_video);
        assert_eq!(config.simulation.blink_interval_ms, 3000);
    }

    #[test]
    fn test_invalid_frame_rate_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "frameRate": 0 }"#).unwrap();

        assert!(matches!(
            RecorderConfig::load(&path),
            Err(RecordingError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ frameRate: ").unwrap();

        assert!(matches!(
            RecorderConfig::load(&path),
            Err(RecordingError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        RecorderConfig::default().validate().unwrap();
    }
}
