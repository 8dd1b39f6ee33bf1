#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the siting analysis workflow.
//!
//! These types describe a candidate facility site (a validated
//! longitude/latitude pair), the buffer radius unit, the lifecycle state of
//! a siting session, and the rows of the resulting residue inventory. They
//! carry no geometry so that every layer of the workspace can depend on
//! them.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A validated geographic coordinate.
///
/// Longitude is in `[-180, 180]`, latitude in `[-90, 90]`, and both are
/// finite. The only way to obtain a value is through [`LngLat::new`], so a
/// `LngLat` never needs re-validation downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LngLat {
    lng: f64,
    lat: f64,
}

impl LngLat {
    /// Creates a coordinate after validating its range.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinateError`] if either component is non-finite
    /// or outside its valid range.
    pub fn new(lng: f64, lat: f64) -> Result<Self, InvalidCoordinateError> {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(InvalidCoordinateError { lng, lat });
        }
        if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidCoordinateError { lng, lat });
        }
        Ok(Self { lng, lat })
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }
}

impl<'de> Deserialize<'de> for LngLat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            lng: f64,
            lat: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.lng, raw.lat).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for LngLat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lng, self.lat)
    }
}

/// Error returned when a coordinate is non-finite or out of range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinateError {
    /// The rejected longitude.
    pub lng: f64,
    /// The rejected latitude.
    pub lat: f64,
}

impl std::fmt::Display for InvalidCoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid coordinate ({}, {}): expected finite lng in [-180, 180] and lat in [-90, 90]",
            self.lng, self.lat
        )
    }
}

impl std::error::Error for InvalidCoordinateError {}

/// Unit in which the buffer radius is entered.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DistanceUnit {
    /// Statute miles.
    #[default]
    Miles,
    /// Kilometers.
    Kilometers,
}

impl DistanceUnit {
    /// Upper bound of the radius slider for this unit (~80 km = ~50 mi).
    #[must_use]
    pub const fn slider_max(self) -> u32 {
        match self {
            Self::Miles => 50,
            Self::Kilometers => 80,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Miles, Self::Kilometers]
    }
}

/// Lifecycle state of a siting session.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No analysis in progress.
    #[default]
    Idle,
    /// Crosshair armed, waiting for the user to pick a site.
    Placing,
    /// Marker and buffer exist; radius and unit are adjustable.
    Placed,
}

/// Residue family a crop belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum ResidueCategory {
    /// Orchard and vineyard prunings.
    #[strum(serialize = "Orchard and Vineyard")]
    OrchardVineyard,
    /// Vegetable and row crop residues.
    #[strum(serialize = "Row Crop")]
    RowCrop,
    /// Grain, fiber and forage crop residues.
    #[strum(serialize = "Field Crop")]
    FieldCrop,
}

/// Which inventory rows to present.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InventoryMode {
    /// Every crop found in the buffer, mapped to residue factors or not.
    #[default]
    AllCrops,
    /// Only crops with known residue factors.
    ResidueOnly,
}

/// The residue factor record a crop was matched against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidueMatch {
    /// Canonical residue factor name (e.g. "Plums & Prunes").
    pub residue_name: String,
    /// Residue family.
    pub category: ResidueCategory,
    /// Residue form (e.g. "Prunings", "Straw & Stubble"), empty if unknown.
    pub residue_type: String,
}

/// One crop row of a siting inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    /// Crop name as reported by the feature layer.
    pub name: String,
    /// Acres of this crop inside the buffer.
    pub acres: f64,
    /// Share of the inventory total, `0.0` when the total is zero.
    pub percent: f64,
    /// Display color (`#RRGGBB`).
    pub color: String,
    /// Residue factor record, `None` when the crop has no mapping.
    pub residue: Option<ResidueMatch>,
    /// Estimated dry residue tons, `None` when the crop has no mapping.
    pub dry_tons: Option<u64>,
    /// Estimated wet residue tons, `None` when the crop has no mapping.
    pub wet_tons: Option<u64>,
}

impl InventoryEntry {
    /// Whether residue factors were found for this crop.
    #[must_use]
    pub const fn has_residue(&self) -> bool {
        self.residue.is_some()
    }
}

/// Flat tabular projection of an inventory row, ready for CSV output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    /// Crop name.
    #[serde(rename = "Crop")]
    pub crop: String,
    /// Acres inside the buffer, rounded to two decimals.
    #[serde(rename = "Acres")]
    pub acres: f64,
    /// Percentage of the total, rounded to one decimal.
    #[serde(rename = "Percent of Total")]
    pub percent: f64,
    /// Residue family, empty when unmapped.
    #[serde(rename = "Residue Category")]
    pub residue_category: String,
    /// Estimated dry residue tons.
    #[serde(rename = "Dry Tons")]
    pub dry_tons: Option<u64>,
    /// Estimated wet residue tons.
    #[serde(rename = "Wet Tons")]
    pub wet_tons: Option<u64>,
}

impl ExportRow {
    /// Column headers in serialization order.
    pub const HEADERS: &[&str] = &[
        "Crop",
        "Acres",
        "Percent of Total",
        "Residue Category",
        "Dry Tons",
        "Wet Tons",
    ];
}
