//! Per-crop acreage inside a buffer.

use std::collections::BTreeMap;

use cal_bioscape_geometry::{
    BoundingBox, GeometryError, Relation, bounding_box, check_polygon, relation,
    try_intersection_area,
};
use geo::MultiPolygon;

use crate::feature::Feature;

/// Why a feature was left out of an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The feature carries no geometry.
    MissingGeometry,
    /// The geometry is not a polygon or multipolygon.
    UnsupportedGeometry,
    /// The polygon is empty, has short rings or non-finite coordinates.
    Degenerate(GeometryError),
}

/// The outcome of testing one feature against the buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Contribution {
    /// Not analyzable.
    Skipped(SkipReason),
    /// Rejected by the bounding-box pre-filter.
    OutsideBounds,
    /// Bounding boxes meet but the polygons share no point.
    Disjoint,
    /// Entirely inside the buffer: the full nominal acreage.
    Within {
        /// Nominal acreage.
        acres: f64,
    },
    /// Straddles the buffer edge, or contains the whole buffer.
    Partial {
        /// Intersection acreage, clamped to the nominal acreage.
        acres: f64,
    },
    /// The intersection could not be computed, so the full nominal
    /// acreage is counted.
    Fallback {
        /// Nominal acreage.
        acres: f64,
        /// Why the intersection failed.
        error: GeometryError,
    },
}

impl Contribution {
    /// Acres this outcome adds to its category.
    #[must_use]
    pub const fn acres(&self) -> f64 {
        match self {
            Self::Within { acres } | Self::Partial { acres } | Self::Fallback { acres, .. } => {
                *acres
            }
            Self::Skipped(_) | Self::OutsideBounds | Self::Disjoint => 0.0,
        }
    }
}

/// Counters describing how each feature was handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Features offered to the aggregation.
    pub seen: usize,
    /// Features that reached the exact topology test.
    pub analyzed: usize,
    /// Features skipped for missing or degenerate geometry.
    pub skipped_geometry: usize,
    /// Features skipped for a non-polygon geometry type.
    pub skipped_unsupported: usize,
    /// Features rejected by the bounding-box pre-filter.
    pub outside_bounds: usize,
    /// Analyzed features sharing no point with the buffer.
    pub disjoint: usize,
    /// Features entirely inside the buffer.
    pub within: usize,
    /// Features measured by intersection area.
    pub partial: usize,
    /// Features counted at nominal acreage after a failed intersection.
    pub fallbacks: usize,
}

/// Acreage per crop category inside a buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// Acres per raw crop name. Only positive totals appear.
    pub per_category: BTreeMap<String, f64>,
    /// Sum of all category acreages.
    pub total: f64,
    /// How the features were handled.
    pub stats: AggregationStats,
}

impl Aggregation {
    /// Folds one feature outcome into the aggregation.
    pub fn record(&mut self, category: &str, contribution: &Contribution) {
        self.stats.seen += 1;

        match contribution {
            Contribution::Skipped(SkipReason::UnsupportedGeometry) => {
                self.stats.skipped_unsupported += 1;
            }
            Contribution::Skipped(_) => self.stats.skipped_geometry += 1,
            Contribution::OutsideBounds => self.stats.outside_bounds += 1,
            Contribution::Disjoint => {
                self.stats.analyzed += 1;
                self.stats.disjoint += 1;
            }
            Contribution::Within { .. } => {
                self.stats.analyzed += 1;
                self.stats.within += 1;
            }
            Contribution::Partial { .. } => {
                self.stats.analyzed += 1;
                self.stats.partial += 1;
            }
            Contribution::Fallback { .. } => {
                self.stats.analyzed += 1;
                self.stats.fallbacks += 1;
            }
        }

        let acres = contribution.acres();
        if acres > 0.0 {
            *self.per_category.entry(category.to_string()).or_insert(0.0) += acres;
            self.total += acres;
        }
    }

    /// Acres recorded for `category`, `0` if absent.
    #[must_use]
    pub fn acres_for(&self, category: &str) -> f64 {
        self.per_category.get(category).copied().unwrap_or(0.0)
    }

    /// Whether no category received any acreage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.per_category.is_empty()
    }

    pub(crate) fn unusable_buffer(seen: usize, error: &GeometryError) -> Self {
        log::warn!("Buffer polygon is unusable, aggregating nothing: {error}");
        Self {
            stats: AggregationStats {
                seen,
                ..AggregationStats::default()
            },
            ..Self::default()
        }
    }
}

/// Sums the acreage of each crop category inside `buffer`.
///
/// Malformed features are skipped and counted, never fatal. An unusable
/// buffer yields an empty aggregation.
#[must_use]
pub fn aggregate(buffer: &MultiPolygon<f64>, features: &[Feature]) -> Aggregation {
    let buffer_bounds = match buffer_bounds(buffer) {
        Ok(bounds) => bounds,
        Err(e) => return Aggregation::unusable_buffer(features.len(), &e),
    };

    let mut aggregation = Aggregation::default();
    for feature in features {
        let contribution = evaluate(buffer, &buffer_bounds, feature);
        log::debug!(
            "Feature {:?} ({}): {contribution:?}",
            feature.id,
            feature.category
        );
        aggregation.record(&feature.category, &contribution);
    }

    log::debug!(
        "Aggregated {} features into {} categories ({:.2} acres)",
        aggregation.stats.seen,
        aggregation.per_category.len(),
        aggregation.total
    );
    aggregation
}

/// Tests one feature against the buffer, bounding box first.
#[must_use]
pub fn evaluate(
    buffer: &MultiPolygon<f64>,
    buffer_bounds: &BoundingBox,
    feature: &Feature,
) -> Contribution {
    let shape = match feature.shape() {
        Ok(shape) => shape,
        Err(reason) => return Contribution::Skipped(reason),
    };

    let bounds = match bounding_box(&shape) {
        Ok(bounds) => bounds,
        Err(e) => return Contribution::Skipped(SkipReason::Degenerate(e)),
    };
    if !bounds.intersects(buffer_bounds) {
        return Contribution::OutsideBounds;
    }

    classify(buffer, &shape, feature.nominal_acres())
}

pub(crate) fn buffer_bounds(buffer: &MultiPolygon<f64>) -> Result<BoundingBox, GeometryError> {
    check_polygon(buffer)?;
    bounding_box(buffer)
}

/// Exact topology test for a feature whose bounds meet the buffer's.
///
/// Both shapes have passed [`check_polygon`], so non-finite input never
/// reaches the fallback arm. It only catches intersection areas that come
/// out negative or non-finite.
pub(crate) fn classify(
    buffer: &MultiPolygon<f64>,
    shape: &MultiPolygon<f64>,
    nominal: f64,
) -> Contribution {
    match relation(shape, buffer) {
        Relation::Disjoint => Contribution::Disjoint,
        Relation::Within => Contribution::Within { acres: nominal },
        Relation::Overlaps | Relation::Contains => match try_intersection_area(shape, buffer) {
            Ok(area) => Contribution::Partial {
                acres: area.min(nominal),
            },
            Err(error) => {
                log::warn!("Intersection failed, counting full {nominal:.2} nominal acres: {error}");
                Contribution::Fallback {
                    acres: nominal,
                    error,
                }
            }
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use cal_bioscape_geometry::{METERS_PER_MILE, area_acres, build_default_buffer};
    use cal_bioscape_siting_models::LngLat;
    use geo::{Destination, Haversine, LineString, Point, Polygon, polygon};

    use super::*;

    /// Axis-aligned square centered on a point, `half_side` meters from
    /// center to each edge.
    pub fn square_around(center: Point<f64>, half_side: f64) -> Polygon<f64> {
        let north = Haversine.destination(center, 0.0, half_side).y();
        let south = Haversine.destination(center, 180.0, half_side).y();
        let east = Haversine.destination(center, 90.0, half_side).x();
        let west = Haversine.destination(center, 270.0, half_side).x();
        polygon![
            (x: west, y: south),
            (x: east, y: south),
            (x: east, y: north),
            (x: west, y: north),
            (x: west, y: south),
        ]
    }

    /// Half side in meters of a square of `acres`.
    pub fn half_side_for(acres: f64) -> f64 {
        (acres / cal_bioscape_geometry::ACRES_PER_SQUARE_METER).sqrt() / 2.0
    }

    pub fn site() -> Point<f64> {
        Point::new(-121.0, 37.5)
    }

    /// The two parcels of the reference layout: a 100-acre almond block
    /// 3 km north of the site and a 50-acre rice field centered on the
    /// eastern edge of a 10-mile buffer.
    pub fn reference_features() -> Vec<Feature> {
        let almonds = square_around(
            Haversine.destination(site(), 0.0, 3_000.0),
            half_side_for(100.0),
        );
        let rice = square_around(
            Haversine.destination(site(), 90.0, 10.0 * METERS_PER_MILE),
            half_side_for(50.0),
        );
        vec![
            Feature::new(almonds, "Almonds", 100.0).with_id("almonds"),
            Feature::new(rice, "Rice", 50.0).with_id("rice"),
        ]
    }

    pub fn ten_mile_buffer() -> MultiPolygon<f64> {
        let center = LngLat::new(site().x(), site().y()).unwrap();
        build_default_buffer(center, 10.0 * METERS_PER_MILE).unwrap()
    }

    fn degree_square(min_x: f64, min_y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: min_x, y: min_y),
            (x: min_x + size, y: min_y),
            (x: min_x + size, y: min_y + size),
            (x: min_x, y: min_y + size),
            (x: min_x, y: min_y),
        ]])
    }

    #[test]
    fn reference_layout_acreage() {
        let aggregation = aggregate(&ten_mile_buffer(), &reference_features());

        assert!(
            (aggregation.acres_for("Almonds") - 100.0).abs() < 1e-9,
            "almonds are fully inside"
        );
        let rice = aggregation.acres_for("Rice");
        assert!(
            (23.0..=26.0).contains(&rice),
            "about half the rice field is inside, got {rice}"
        );
        assert!((aggregation.total - 100.0 - rice).abs() < 1e-6);
        assert_eq!(aggregation.stats.within, 1);
        assert_eq!(aggregation.stats.partial, 1);
    }

    #[test]
    fn total_is_sum_of_categories() {
        let mut features = reference_features();
        features.push(features[0].clone().with_id("almonds-2"));
        let aggregation = aggregate(&ten_mile_buffer(), &features);

        let sum: f64 = aggregation.per_category.values().sum();
        assert!((aggregation.total - sum).abs() < 1e-6);
        assert!((aggregation.acres_for("Almonds") - 200.0).abs() < 1e-9);
    }

    #[test]
    fn partial_contribution_never_exceeds_nominal() {
        // Half of a large square overlaps, but the layer claims 1 acre.
        let buffer = degree_square(0.0, 0.0, 1.0);
        let parcel = degree_square(0.5, 0.0, 1.0);
        let features = vec![Feature::new(parcel.0[0].clone(), "Corn", 1.0)];

        let aggregation = aggregate(&buffer, &features);
        assert!((aggregation.acres_for("Corn") - 1.0).abs() < 1e-9);
        assert_eq!(aggregation.stats.partial, 1);
    }

    #[test]
    fn buffer_inside_large_parcel_counts_buffer_area() {
        let center = LngLat::new(-121.0, 37.5).unwrap();
        let buffer = build_default_buffer(center, 100.0).unwrap();
        let parcel = square_around(site(), 2_000.0);
        let features = vec![Feature::new(parcel, "Wheat", 1_000.0)];

        let aggregation = aggregate(&buffer, &features);
        let expected = area_acres(&buffer);
        assert!((aggregation.acres_for("Wheat") - expected).abs() < 1e-3);
        assert!(aggregation.acres_for("Wheat") < 1_000.0);
    }

    #[test]
    fn empty_feature_set() {
        let aggregation = aggregate(&ten_mile_buffer(), &[]);
        assert!(aggregation.is_empty());
        assert!(aggregation.total.abs() < f64::EPSILON);
        assert_eq!(aggregation.stats, AggregationStats::default());
    }

    #[test]
    fn far_features_are_rejected_by_bounds() {
        let far = square_around(Point::new(-100.0, 40.0), 500.0);
        let features = vec![Feature::new(far, "Almonds", 60.0)];

        let aggregation = aggregate(&ten_mile_buffer(), &features);
        assert!(aggregation.is_empty());
        assert_eq!(aggregation.stats.outside_bounds, 1);
        assert_eq!(aggregation.stats.analyzed, 0);
    }

    #[test]
    fn unsupported_and_degenerate_features_are_skipped() {
        let features = vec![
            Feature::new(site(), "Almonds", 10.0),
            Feature::new(
                polygon![(x: f64::NAN, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: f64::NAN, y: 0.0)],
                "Rice",
                10.0,
            ),
        ];

        let aggregation = aggregate(&ten_mile_buffer(), &features);
        assert!(aggregation.is_empty());
        assert_eq!(aggregation.stats.seen, 2);
        assert_eq!(aggregation.stats.skipped_unsupported, 1);
        assert_eq!(aggregation.stats.skipped_geometry, 1);
    }

    #[test]
    fn edge_contact_creates_no_category() {
        let buffer = degree_square(0.0, 0.0, 1.0);
        let neighbor = degree_square(1.0, 0.0, 1.0);
        let features = vec![Feature::new(neighbor.0[0].clone(), "Grapes", 5.0)];

        let aggregation = aggregate(&buffer, &features);
        assert!(aggregation.is_empty(), "{aggregation:?}");
        assert_eq!(aggregation.stats.analyzed, 1);
    }

    #[test]
    fn multipolygon_parts_all_count() {
        let buffer = degree_square(0.0, 0.0, 1.0);
        let parts = MultiPolygon::new(vec![
            degree_square(0.1, 0.1, 0.1).0.remove(0),
            degree_square(5.0, 5.0, 0.1).0.remove(0),
        ]);
        let first_only = area_acres(&degree_square(0.1, 0.1, 0.1));
        let features = vec![Feature::new(parts, "Olives", 1.0e9)];

        let aggregation = aggregate(&buffer, &features);
        assert_eq!(aggregation.stats.partial, 1, "the far part keeps it partial");
        assert!((aggregation.acres_for("Olives") - first_only).abs() / first_only < 1e-6);
    }

    #[test]
    fn fallback_counts_nominal_acres() {
        let mut aggregation = Aggregation::default();
        aggregation.record(
            "Rice",
            &Contribution::Fallback {
                acres: 12.0,
                error: GeometryError::NonFinite,
            },
        );

        assert!((aggregation.acres_for("Rice") - 12.0).abs() < f64::EPSILON);
        assert_eq!(aggregation.stats.fallbacks, 1);
        assert_eq!(aggregation.stats.analyzed, 1);
    }

    #[test]
    fn zero_area_feature_contributes_nothing() {
        let point_ring = Polygon::new(LineString::from(vec![(site().x(), site().y()); 4]), vec![]);
        let features = vec![Feature::new(point_ring, "Rice", 50.0)];

        let aggregation = aggregate(&ten_mile_buffer(), &features);
        assert!(aggregation.is_empty());
        assert_eq!(aggregation.stats.skipped_geometry, 1);
        assert_eq!(aggregation.stats.within, 0);
    }

    #[test]
    fn non_finite_features_are_skipped_before_classification() {
        let bad = polygon![(x: -121.0, y: 37.5), (x: f64::INFINITY, y: 37.5), (x: -121.0, y: 37.6), (x: -121.0, y: 37.5)];
        let feature = Feature::new(bad, "Rice", 12.0);
        let buffer = ten_mile_buffer();
        let bounds = buffer_bounds(&buffer).unwrap();

        assert_eq!(
            evaluate(&buffer, &bounds, &feature),
            Contribution::Skipped(SkipReason::Degenerate(GeometryError::NonFinite))
        );
    }

    #[test]
    fn unusable_buffer_aggregates_nothing() {
        let empty = MultiPolygon::<f64>::new(vec![]);
        let aggregation = aggregate(&empty, &reference_features());
        assert!(aggregation.is_empty());
        assert_eq!(aggregation.stats.seen, 2);
    }
}
