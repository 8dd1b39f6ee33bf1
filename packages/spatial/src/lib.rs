#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Buffer acreage aggregation over cropland features.
//!
//! Given a buffer polygon and the cropland features rendered by the map,
//! sums the acreage of each crop that falls inside the buffer. Features
//! fully inside contribute their nominal acreage; features straddling the
//! edge contribute their intersection area. A bounding-box pre-filter keeps
//! exact topology tests to the handful of features near the buffer, and
//! [`FeatureIndex`] replaces that linear pre-filter with an R-tree envelope
//! query for large layers.
//!
//! One malformed feature never aborts an aggregation: it is skipped or
//! falls back to its nominal acreage, and the decision is counted in
//! [`AggregationStats`].

pub mod aggregate;
pub mod feature;
pub mod index;

pub use aggregate::{Aggregation, AggregationStats, Contribution, SkipReason, aggregate, evaluate};
pub use feature::{Feature, FeatureSchema, UNKNOWN_CROP, features_from_geojson};
pub use index::FeatureIndex;

use thiserror::Error;

/// Errors raised while loading features.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The document is a bare geometry rather than features.
    #[error("Expected a GeoJSON Feature or FeatureCollection, found a bare geometry")]
    NotFeatures,
}
