#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crop residue factor tables.
//!
//! Residue yields (wet and dry tons per acre) are keyed by a canonical
//! residue name. The cropland layer reports its own crop names, so lookups
//! go through an alias table first; many raw names share one canonical
//! record (e.g. "Plums" and "Prunes" both map to "Plums & Prunes").
//!
//! The factor, alias and color tables are TOML files embedded at compile
//! time, following the same registry pattern as the other data tables in
//! this workspace. Replacement tables can be parsed at runtime with
//! [`ResidueTable::from_toml_str`] and [`CropPalette::from_toml_str`].

pub mod factors;
pub mod palette;

pub use factors::{ResidueEstimate, ResidueFactor, ResidueTable};
pub use palette::{CropPalette, DEFAULT_CROP_COLOR};

use thiserror::Error;

/// Errors raised while loading residue or palette tables.
#[derive(Debug, Error)]
pub enum ResidueError {
    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Two factor records share a canonical name.
    #[error("Duplicate residue factor: {name}")]
    DuplicateFactor {
        /// The repeated canonical name.
        name: String,
    },

    /// An alias points at a canonical name with no factor record.
    #[error("Alias '{alias}' maps to unknown residue factor '{target}'")]
    UnknownAliasTarget {
        /// Raw crop name.
        alias: String,
        /// Missing canonical name.
        target: String,
    },

    /// A factor record holds an unusable number.
    #[error("Residue factor '{name}' has invalid {field}: {value}")]
    InvalidFactor {
        /// Canonical name of the record.
        name: String,
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A palette color is not a `#RRGGBB` string.
    #[error("Invalid color '{color}' for crop '{crop}'")]
    InvalidColor {
        /// Crop the color belongs to.
        crop: String,
        /// The rejected color.
        color: String,
    },
}
