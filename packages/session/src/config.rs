//! Session settings, loadable from TOML.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```toml
//! default_radius = 25.0
//! default_unit = "kilometers"
//! debounce_ms = 0
//!
//! [schema]
//! category_property = "crop"
//! ```

use std::path::Path;
use std::time::Duration;

use cal_bioscape_geometry::MIN_BUFFER_STEPS;
use cal_bioscape_siting_models::DistanceUnit;
use cal_bioscape_spatial::FeatureSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a [`SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML is malformed or has wrongly typed fields.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A field holds an unusable value.
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Settings for a [`SitingSession`](crate::SitingSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Radius a new session starts with.
    pub default_radius: f64,
    /// Unit a new session starts with.
    pub default_unit: DistanceUnit,
    /// Quiet time after a radius or unit change before recomputing.
    /// `0` recomputes synchronously.
    pub debounce_ms: u64,
    /// Vertices in the buffer ring.
    pub buffer_steps: u32,
    /// Layer holding the cropland features.
    pub feature_layer_id: String,
    /// Geometry source receiving the buffer polygon.
    pub buffer_source_id: String,
    /// Fill layer drawing the buffer.
    pub buffer_fill_layer_id: String,
    /// Outline layer drawing the buffer.
    pub buffer_outline_layer_id: String,
    /// Layer showing the placement crosshair.
    pub crosshair_layer_id: String,
    /// Feature property names.
    pub schema: FeatureSchema,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_radius: 10.0,
            default_unit: DistanceUnit::Miles,
            debounce_ms: 50,
            buffer_steps: cal_bioscape_geometry::DEFAULT_BUFFER_STEPS,
            feature_layer_id: "feedstock-vector-layer".to_string(),
            buffer_source_id: "siting-buffer-source".to_string(),
            buffer_fill_layer_id: "siting-buffer-fill".to_string(),
            buffer_outline_layer_id: "siting-buffer-outline".to_string(),
            crosshair_layer_id: "siting-crosshair".to_string(),
            schema: FeatureSchema::default(),
        }
    }
}

impl SessionConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML fails to parse or a value is unusable.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, fails to parse, or
    /// holds an unusable value.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&data)?;
        log::debug!("Loaded session config from {}", path.display());
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_radius.is_finite() || self.default_radius <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "default_radius",
                reason: format!("{} is not a positive, finite number", self.default_radius),
            });
        }
        if self.buffer_steps < MIN_BUFFER_STEPS {
            return Err(ConfigError::Invalid {
                field: "buffer_steps",
                reason: format!("{} is below the minimum of {MIN_BUFFER_STEPS}", self.buffer_steps),
            });
        }
        if self.feature_layer_id.is_empty() {
            return Err(ConfigError::Invalid {
                field: "feature_layer_id",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The debounce as a [`Duration`].
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
