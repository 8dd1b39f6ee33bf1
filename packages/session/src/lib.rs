#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Siting session state machine.
//!
//! A session walks through `Idle` → `Placing` → `Placed`. Placing a marker
//! builds a buffer around it, queries the cropland features from the map
//! renderer, aggregates and formats them, and commits marker, buffer and
//! inventory together. Radius and unit changes while placed schedule a
//! debounced recompute against the same marker.
//!
//! The map itself is reached only through the [`MapRenderer`] capability,
//! so the session runs the same under a browser map, a CLI, or a test
//! double.

pub mod config;
pub mod recompute;
pub mod session;

pub use config::{ConfigError, SessionConfig};
pub use recompute::{RecomputeJob, RecomputeResult};
pub use session::{ConsistencyReport, SitingSession};

use cal_bioscape_geometry::GeometryError;
use cal_bioscape_siting_models::InvalidCoordinateError;
use cal_bioscape_spatial::Feature;
use geojson::FeatureCollection;
use thiserror::Error;

/// What the session needs from the map.
pub trait MapRenderer {
    /// Features currently rendered in `layer_id`.
    fn query_features(&self, layer_id: &str) -> Vec<Feature>;

    /// Replaces the data of a geometry source.
    fn set_layer_geometry(&mut self, source_id: &str, geometry: FeatureCollection);

    /// Shows or hides a layer.
    fn set_layer_visibility(&mut self, layer_id: &str, visible: bool);
}

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SitingError {
    /// The marker position is out of range or non-finite.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(#[from] InvalidCoordinateError),

    /// The radius is not a positive, finite number.
    #[error("Invalid radius: {value} (expected a positive, finite number)")]
    InvalidRadius {
        /// The rejected value.
        value: f64,
    },

    /// No buffer could be built around the marker.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}
