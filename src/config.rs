//! Configuration for the WiFi vitals agent.

use crate::core::detection::DetectionParameters;
use crate::core::engine::EngineConfig;
use crate::source::SyntheticConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pipeline structure (sample rate, ring and window sizes, decimation)
    #[serde(default)]
    pub engine: EngineConfig,

    /// Detection controls applied at startup and pushed to a running agent
    #[serde(default)]
    pub detection: DetectionParameters,

    /// Test signal used when no radio hardware is attached
    #[serde(default)]
    pub synthetic: SyntheticConfig,

    /// Bumped by `calibrate`; a running agent recalibrates when it changes
    #[serde(default)]
    pub calibration_epoch: u64,

    /// Path for exporting session reports
    pub export_path: PathBuf,

    /// Path for storing stats
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wifi-vitals-agent");

        Self {
            engine: EngineConfig::default(),
            detection: DetectionParameters::default(),
            synthetic: SyntheticConfig::default(),
            calibration_epoch: 0,
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Load, modify and save the configuration at the default location.
    pub fn update(change: impl FnOnce(&mut Config)) -> Result<Config, ConfigError> {
        Self::update_at(&Self::config_path(), change)
    }

    /// Load, modify and save the configuration at `path`.
    ///
    /// A file that fails to load is left untouched and its error returned.
    /// A missing file starts from defaults.
    pub fn update_at(
        path: &std::path::Path,
        change: impl FnOnce(&mut Config),
    ) -> Result<Config, ConfigError> {
        let mut config = Self::load_from(path)?;
        change(&mut config);
        config.save_to(path)?;
        Ok(config)
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wifi-vitals-agent")
            .join("config.json")
    }

    /// Check the engine and detection sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.detection
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Synthetic source settings, sampled at the engine rate.
    pub fn synthetic_source(&self) -> SyntheticConfig {
        SyntheticConfig {
            sample_rate_hz: self.engine.sample_rate_hz,
            ..self.synthetic
        }
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detection::DetectionMode;

    fn temp_config_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("wifi-vitals-config-{}", uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.sample_rate_hz, 10.0);
        assert_eq!(config.engine.ring_capacity, 512);
        assert_eq!(config.engine.window_size, 256);
        assert_eq!(config.engine.decimation, 10);
        assert_eq!(config.detection.sensitivity, 50);
        assert_eq!(config.detection.mode, DetectionMode::Normal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_config_path();
        let mut config = Config::default();
        config.detection.mode = DetectionMode::Precision;
        config.calibration_epoch = 3;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.detection.mode, DetectionMode::Precision);
        assert_eq!(loaded.calibration_epoch, 3);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(&temp_config_path()).unwrap();
        assert_eq!(config.calibration_epoch, 0);
    }

    #[test]
    fn test_invalid_engine_rejected() {
        let mut config = Config::default();
        config.engine.window_size = 4096;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(config.save_to(&temp_config_path()).is_err());
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let path = temp_config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"export_path": "/tmp/x", "data_path": "/tmp/y", "detection": {"sensitivity": 80, "mode": "long-range", "noise_floor": 2.0, "threshold_base": 10.0, "noise_filter_enabled": true}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.detection.sensitivity, 80);
        assert_eq!(config.detection.mode, DetectionMode::LongRange);
        assert_eq!(config.engine, EngineConfig::default());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_update_leaves_invalid_file_untouched() {
        let path = temp_config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let original = r#"{"export_path": "/srv/my-exports", "data_path": "/srv/data", "calibration_epoch": 7, "engine": {"sample_rate_hz": 20.0, "ring_capacity": 512, "window_size": 256, "decimation": 0, "warmup_samples": 100}}"#;
        std::fs::write(&path, original).unwrap();

        let result = Config::update_at(&path, |c| c.detection.mode = DetectionMode::LongRange);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);

        std::fs::write(&path, "{ not json").unwrap();
        let result = Config::update_at(&path, |c| c.calibration_epoch += 1);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_update_applies_change() {
        let path = temp_config_path();
        let updated = Config::update_at(&path, |c| c.calibration_epoch += 1).unwrap();
        assert_eq!(updated.calibration_epoch, 1);

        let updated = Config::update_at(&path, |c| c.detection.sensitivity = 90).unwrap();
        assert_eq!(updated.calibration_epoch, 1);
        assert_eq!(Config::load_from(&path).unwrap().detection.sensitivity, 90);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_synthetic_follows_engine_rate() {
        let mut config = Config::default();
        config.engine.sample_rate_hz = 20.0;
        assert_eq!(config.synthetic_source().sample_rate_hz, 20.0);
    }
}
