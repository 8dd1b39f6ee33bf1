#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry engine for siting analysis.
//!
//! Wraps the `geo` crate with the handful of operations the siting workflow
//! needs: converting a radius to meters, building a geodesic circle around
//! a site, cheap bounding-box pre-filtering, topology predicates between a
//! feature and the buffer, and spherical intersection areas in acres.
//!
//! Every polygon handled here is a [`MultiPolygon`] in longitude/latitude
//! degrees. Single polygons are promoted with [`to_multipolygon`].

pub mod buffer;
pub mod ops;

pub use buffer::{build_buffer, build_buffer_around, build_default_buffer, to_meters};
pub use geo::MultiPolygon;
pub use ops::{
    BoundingBox, Relation, area_acres, bounding_box, check_polygon, dissolve, intersection_area,
    intersects, is_within, overlaps, relation, to_multipolygon, try_intersection_area,
};

use cal_bioscape_siting_models::InvalidCoordinateError;
use thiserror::Error;

/// Meters in one statute mile.
pub const METERS_PER_MILE: f64 = 1609.34;

/// Meters in one kilometer.
pub const METERS_PER_KILOMETER: f64 = 1000.0;

/// Square meters to acres.
pub const ACRES_PER_SQUARE_METER: f64 = 0.000_247_105;

/// Vertices used to approximate a buffer circle unless configured otherwise.
pub const DEFAULT_BUFFER_STEPS: u32 = 64;

/// Fewest vertices that still describe an area.
pub const MIN_BUFFER_STEPS: u32 = 3;

/// Errors raised by geometry operations.
///
/// None of these reach the user as a fault: the aggregator treats them as
/// per-feature skips or fallbacks, and the session logs them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A distance was negative or non-finite.
    #[error("Invalid distance {value}: expected a finite, non-negative number")]
    InvalidDistance {
        /// The rejected value.
        value: f64,
    },

    /// A buffer radius was zero, negative or non-finite.
    #[error("Invalid buffer radius {meters} m: expected a finite, positive number")]
    InvalidRadius {
        /// The rejected radius in meters.
        meters: f64,
    },

    /// Too few vertices were requested for a buffer ring.
    #[error("Buffer needs at least {MIN_BUFFER_STEPS} steps, got {steps}")]
    TooFewSteps {
        /// The rejected step count.
        steps: u32,
    },

    /// The buffer center is not a valid coordinate.
    #[error("Invalid buffer center: {0}")]
    InvalidCenter(#[from] InvalidCoordinateError),

    /// The buffer would wrap across the antimeridian or a pole.
    #[error("Buffer of {meters} m around the site wraps across the antimeridian")]
    WrapsAntimeridian {
        /// Radius that produced the wrap.
        meters: f64,
    },

    /// The geometry has no polygons.
    #[error("Geometry is empty")]
    Empty,

    /// A ring has too few coordinates to enclose an area.
    #[error("Geometry has a ring with {coords} coordinates; at least 4 are required")]
    DegenerateRing {
        /// Coordinates found in the ring.
        coords: usize,
    },

    /// A polygon part encloses no area (repeated or collinear vertices).
    #[error("Geometry has a polygon that encloses no area")]
    ZeroArea,

    /// The geometry contains `NaN` or infinite coordinates.
    #[error("Geometry contains non-finite coordinates")]
    NonFinite,

    /// An area computation produced an unusable number.
    #[error("Computed area {acres} acres is not a finite, non-negative number")]
    InvalidArea {
        /// The rejected area.
        acres: f64,
    },
}
