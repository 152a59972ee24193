use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Defines what the config file should contain.
pub struct Config {
    /// The motion model settings.
    pub estimator: EstimatorConfig,
    /// The adaptive reliability gate settings.
    pub quality_gate: QualityGateConfig,
    /// The mask recovery memory settings.
    pub memory: MemoryConfig,
    /// Radius in pixels of the disk emitted when nothing else can be recovered.
    pub fallback_radius: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Diagonal magnitude of the initial estimation error covariance.
    pub initial_covariance: f64,
    /// Diagonal magnitude of the process noise covariance.
    pub process_noise: f64,
    /// Diagonal magnitude of the measurement noise covariance.
    pub measurement_noise: f64,
    /// Take the first measurement as the position instead of fusing it.
    pub seed_with_first_measurement: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityGateConfig {
    /// Use the adaptive threshold. When off, a fixed 0.5 threshold is used.
    pub enabled: bool,
    /// Number of recent frames kept in the rolling windows.
    pub window_size: usize,
    /// Samples required before the adaptive threshold kicks in.
    pub min_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Recover masks from memory during occlusion.
    pub enabled: bool,
    /// Maximum number of stored masks.
    pub capacity: usize,
    /// Score penalty per pixel of distance from the predicted point.
    pub distance_penalty: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            quality_gate: QualityGateConfig::default(),
            memory: MemoryConfig::default(),
            fallback_radius: 20,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            initial_covariance: 0.0,
            process_noise: 0.03,
            measurement_noise: 1.0,
            seed_with_first_measurement: false,
        }
    }
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_size: 15,
            min_samples: 5,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 25,
            distance_penalty: 0.002,
        }
    }
}

impl Config {
    /// Parse and validate a TOML document. Missing keys keep their defaults.
    ///
    /// ```rust
    /// use mask_tracking::config::Config;
    ///
    /// let config = Config::from_toml_str(
    ///     r#"
    ///     fallback_radius = 12
    ///
    ///     [memory]
    ///     enabled = false
    ///     "#,
    /// )
    /// .unwrap();
    /// assert_eq!(config.fallback_radius, 12);
    /// assert!(!config.memory.enabled);
    /// assert_eq!(config.memory.capacity, 25);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let Self {
            estimator,
            quality_gate,
            memory,
            fallback_radius,
        } = self;

        let non_negative = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )))
            }
        };
        non_negative("estimator.initial_covariance", estimator.initial_covariance)?;
        non_negative("estimator.process_noise", estimator.process_noise)?;
        non_negative("estimator.measurement_noise", estimator.measurement_noise)?;
        non_negative("memory.distance_penalty", memory.distance_penalty)?;
        if estimator.measurement_noise == 0.0 {
            return Err(Error::InvalidConfig(
                "estimator.measurement_noise must be positive".into(),
            ));
        }

        if quality_gate.window_size == 0 {
            return Err(Error::InvalidConfig(
                "quality_gate.window_size must be at least 1".into(),
            ));
        }
        if quality_gate.min_samples == 0 || quality_gate.min_samples > quality_gate.window_size {
            return Err(Error::InvalidConfig(format!(
                "quality_gate.min_samples must be in 1..={}, got {}",
                quality_gate.window_size, quality_gate.min_samples
            )));
        }
        if memory.capacity == 0 {
            return Err(Error::InvalidConfig(
                "memory.capacity must be at least 1".into(),
            ));
        }
        if *fallback_radius == 0 {
            return Err(Error::InvalidConfig(
                "fallback_radius must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.memory.capacity, 25);
        assert_eq!(config.quality_gate.window_size, 15);
        assert_eq!(config.quality_gate.min_samples, 5);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_section_overrides_only_named_keys() {
        let config = Config::from_toml_str(
            r#"
            [quality_gate]
            enabled = false
            "#,
        )
        .unwrap();
        assert!(!config.quality_gate.enabled);
        assert_eq!(config.quality_gate.window_size, 15);
        assert!(config.memory.enabled);
    }

    #[test]
    fn rejects_min_samples_above_window() {
        let err = Config::from_toml_str(
            r#"
            [quality_gate]
            window_size = 3
            min_samples = 4
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn estimator_section_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [estimator]
            initial_covariance = 10.0
            seed_with_first_measurement = true
            "#,
        )
        .unwrap();
        assert_eq!(config.estimator.initial_covariance, 10.0);
        assert!(config.estimator.seed_with_first_measurement);
        assert_eq!(config.estimator.process_noise, 0.03);
        assert!(!Config::default().estimator.seed_with_first_measurement);
    }

    #[test]
    fn rejects_zero_capacity() {
        let mut config = Config::default();
        config.memory.capacity = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = Config::from_toml_str("fallback_radius = \"wide\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::from_path("/nonexistent/tracker.toml").unwrap_err();
        match err {
            Error::Io { path, .. } => assert!(path.ends_with("tracker.toml")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
