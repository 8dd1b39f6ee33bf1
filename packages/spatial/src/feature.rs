//! Cropland features and their `GeoJSON` loading.
//!
//! Features come from the map's cropland layer: a polygon plus a property
//! bag. Only the crop name and nominal acreage matter here; the property
//! names are configurable through [`FeatureSchema`].

use std::borrow::Cow;

use cal_bioscape_geometry::{check_polygon, dissolve};
use geo::MultiPolygon;
use geojson::GeoJson;
use serde::{Deserialize, Serialize};

use crate::LoadError;
use crate::aggregate::SkipReason;

/// Crop name used when a feature has no crop attribute.
pub const UNKNOWN_CROP: &str = "Unknown";

/// Property names used to read crop features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSchema {
    /// Property holding the crop name.
    pub category_property: String,
    /// Property holding the nominal acreage (number or numeric string).
    pub acres_property: String,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            category_property: "main_crop_name".to_string(),
            acres_property: "acres".to_string(),
        }
    }
}

/// A cropland feature as reported by the map renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature identifier, if the layer provides one.
    pub id: Option<String>,
    /// Feature geometry. Only polygons and multipolygons are analyzable.
    pub geometry: Option<geo::Geometry<f64>>,
    /// Crop name.
    pub category: String,
    /// Nominal acreage from the layer attributes.
    pub acres: f64,
}

impl Feature {
    /// Creates a feature, replacing an empty crop name with
    /// [`UNKNOWN_CROP`] and unusable acreage with `0`.
    #[must_use]
    pub fn new(geometry: impl Into<geo::Geometry<f64>>, category: &str, acres: f64) -> Self {
        Self {
            id: None,
            geometry: Some(geometry.into()),
            category: normalize_category(Some(category)),
            acres: sanitize_acres(acres),
        }
    }

    /// Sets the feature identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Nominal acreage, `0` if the stored value is negative or non-finite.
    #[must_use]
    pub fn nominal_acres(&self) -> f64 {
        sanitize_acres(self.acres)
    }

    /// The feature's polygon, if it is an analyzable, well-formed one.
    ///
    /// Overlapping parts of a multipolygon are merged first.
    ///
    /// # Errors
    ///
    /// Returns the [`SkipReason`] when the geometry is missing, of an
    /// unsupported type, or degenerate.
    pub fn shape(&self) -> Result<Cow<'_, MultiPolygon<f64>>, SkipReason> {
        let shape = match &self.geometry {
            None => return Err(SkipReason::MissingGeometry),
            Some(geo::Geometry::MultiPolygon(mp)) => Cow::Borrowed(mp),
            Some(geo::Geometry::Polygon(p)) => Cow::Owned(MultiPolygon::new(vec![p.clone()])),
            Some(_) => return Err(SkipReason::UnsupportedGeometry),
        };

        check_polygon(&shape).map_err(SkipReason::Degenerate)?;
        if shape.0.len() > 1 {
            return Ok(Cow::Owned(dissolve(&shape)));
        }
        Ok(shape)
    }

    /// Builds a feature from a `GeoJSON` feature using `schema`.
    ///
    /// Missing geometry is kept as `None` so the aggregator can count it;
    /// geometry that fails to convert is treated the same way.
    #[must_use]
    pub fn from_geojson(feature: geojson::Feature, schema: &FeatureSchema) -> Self {
        let category = normalize_category(
            feature
                .property(&schema.category_property)
                .and_then(serde_json::Value::as_str),
        );
        let acres = feature
            .property(&schema.acres_property)
            .map_or(0.0, parse_acres);
        let id = feature.id.as_ref().map(|id| match id {
            geojson::feature::Id::String(s) => s.clone(),
            geojson::feature::Id::Number(n) => n.to_string(),
        });

        let geometry = feature.geometry.and_then(|geometry| {
            geo::Geometry::<f64>::try_from(geometry)
                .map_err(|e| log::debug!("Dropping unconvertible feature geometry: {e}"))
                .ok()
        });

        Self {
            id,
            geometry,
            category,
            acres,
        }
    }
}

/// Parses a `GeoJSON` `FeatureCollection` (or single `Feature`) into
/// features.
///
/// # Errors
///
/// Returns an error if the text is not valid `GeoJSON` or is a bare
/// geometry.
pub fn features_from_geojson(
    geojson_str: &str,
    schema: &FeatureSchema,
) -> Result<Vec<Feature>, LoadError> {
    let geojson: GeoJson = geojson_str.parse()?;
    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .map(|f| Feature::from_geojson(f, schema))
            .collect(),
        GeoJson::Feature(feature) => vec![Feature::from_geojson(feature, schema)],
        GeoJson::Geometry(_) => return Err(LoadError::NotFeatures),
    };
    Ok(features)
}

fn normalize_category(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_CROP)
        .to_string()
}

/// Reads acreage from a number or a numeric string; anything else is `0`.
fn parse_acres(value: &serde_json::Value) -> f64 {
    let acres = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    sanitize_acres(acres)
}

fn sanitize_acres(acres: f64) -> f64 {
    if acres.is_finite() && acres >= 0.0 {
        acres
    } else {
        0.0
    }
}
