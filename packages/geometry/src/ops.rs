//! Bounding boxes, topology predicates and areas.

use geo::{
    Area, BooleanOps, BoundingRect, ChamberlainDuquetteArea, CoordsIter, MultiPolygon, Polygon,
    Relate,
};
use rstar::AABB;

use crate::{ACRES_PER_SQUARE_METER, GeometryError};

/// Axis-aligned bounds in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western edge (minimum longitude).
    pub min_x: f64,
    /// Southern edge (minimum latitude).
    pub min_y: f64,
    /// Eastern edge (maximum longitude).
    pub max_x: f64,
    /// Northern edge (maximum latitude).
    pub max_y: f64,
}

impl BoundingBox {
    /// Whether the two boxes share at least one point. Touching edges count.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.min_x > other.max_x
            || self.max_x < other.min_x
            || self.min_y > other.max_y
            || self.max_y < other.min_y)
    }

    /// Converts to an R-tree envelope.
    #[must_use]
    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// Computes the bounding box of a polygon.
///
/// # Errors
///
/// Returns [`GeometryError::Empty`] if the polygon has no coordinates.
pub fn bounding_box(polygon: &MultiPolygon<f64>) -> Result<BoundingBox, GeometryError> {
    let rect = polygon.bounding_rect().ok_or(GeometryError::Empty)?;
    Ok(BoundingBox {
        min_x: rect.min().x,
        min_y: rect.min().y,
        max_x: rect.max().x,
        max_y: rect.max().y,
    })
}

/// Promotes a single polygon to a one-member [`MultiPolygon`].
#[must_use]
pub fn to_multipolygon(polygon: Polygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon])
}

/// Rejects geometry that the topology and area operations cannot handle.
///
/// # Errors
///
/// * [`GeometryError::Empty`] if there are no polygons
/// * [`GeometryError::DegenerateRing`] if any ring has fewer than 4 coordinates
/// * [`GeometryError::NonFinite`] if any coordinate is `NaN` or infinite
/// * [`GeometryError::ZeroArea`] if any part encloses no area
pub fn check_polygon(polygon: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    if polygon.0.is_empty() {
        return Err(GeometryError::Empty);
    }

    for part in &polygon.0 {
        for ring in std::iter::once(part.exterior()).chain(part.interiors()) {
            if ring.0.len() < 4 {
                return Err(GeometryError::DegenerateRing {
                    coords: ring.0.len(),
                });
            }
        }
    }

    if polygon
        .coords_iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(GeometryError::NonFinite);
    }

    if polygon.0.iter().any(|part| part.unsigned_area() <= 0.0) {
        return Err(GeometryError::ZeroArea);
    }

    Ok(())
}

/// Merges overlapping parts of a multipolygon so shared ground is counted
/// once. Single-part input is returned unchanged.
#[must_use]
pub fn dissolve(polygon: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if polygon.0.len() < 2 {
        return polygon.clone();
    }

    polygon
        .0
        .iter()
        .fold(MultiPolygon::new(vec![]), |merged, part| {
            merged.union(&to_multipolygon(part.clone()))
        })
}

/// How polygon `a` sits relative to polygon `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// No shared points.
    Disjoint,
    /// `a` lies entirely inside `b`.
    Within,
    /// `b` lies entirely inside `a`.
    Contains,
    /// The two share points but neither contains the other. Boundary-only
    /// contact lands here too and yields a zero intersection area.
    Overlaps,
}

/// Classifies `a` against `b` with a single DE-9IM evaluation.
#[must_use]
pub fn relation(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Relation {
    let matrix = a.relate(b);
    if !matrix.is_intersects() {
        Relation::Disjoint
    } else if matrix.is_within() {
        Relation::Within
    } else if matrix.is_contains() {
        Relation::Contains
    } else {
        Relation::Overlaps
    }
}

/// Whether `a` and `b` partially overlap (neither contains the other).
#[must_use]
pub fn overlaps(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    relation(a, b) == Relation::Overlaps
}

/// Whether `a` lies entirely inside `b`.
#[must_use]
pub fn is_within(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    relation(a, b) == Relation::Within
}

/// Whether `a` and `b` share any point.
#[must_use]
pub fn intersects(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    relation(a, b) != Relation::Disjoint
}

/// Spherical area of a polygon in acres.
#[must_use]
pub fn area_acres(polygon: &MultiPolygon<f64>) -> f64 {
    polygon.chamberlain_duquette_unsigned_area() * ACRES_PER_SQUARE_METER
}

/// Area of the intersection of `a` and `b` in acres.
///
/// # Errors
///
/// * [`GeometryError::NonFinite`] if either input has non-finite coordinates
/// * [`GeometryError::InvalidArea`] if the computed area is not a finite,
///   non-negative number
pub fn try_intersection_area(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<f64, GeometryError> {
    for polygon in [a, b] {
        if polygon
            .coords_iter()
            .any(|c| !c.x.is_finite() || !c.y.is_finite())
        {
            return Err(GeometryError::NonFinite);
        }
    }

    let shared = a.intersection(b);
    let acres = area_acres(&shared);

    if !acres.is_finite() || acres < 0.0 {
        return Err(GeometryError::InvalidArea { acres });
    }

    Ok(acres)
}

/// Area of the intersection of `a` and `b` in acres, or `0.0` when the
/// computation fails on degenerate input.
#[must_use]
pub fn intersection_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    try_intersection_area(a, b).unwrap_or_else(|e| {
        log::debug!("Intersection area failed, counting 0 acres: {e}");
        0.0
    })
}

#[cfg(test)]
mod tests {
    use geo::{LineString, polygon};

    use super::*;

    /// Axis-aligned square in degrees.
    fn square(min_x: f64, min_y: f64, size: f64) -> MultiPolygon<f64> {
        to_multipolygon(polygon![
            (x: min_x, y: min_y),
            (x: min_x + size, y: min_y),
            (x: min_x + size, y: min_y + size),
            (x: min_x, y: min_y + size),
            (x: min_x, y: min_y),
        ])
    }

    #[test]
    fn bounding_box_of_square() {
        let bbox = bounding_box(&square(-121.0, 37.0, 0.5)).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                min_x: -121.0,
                min_y: 37.0,
                max_x: -120.5,
                max_y: 37.5,
            }
        );
    }

    #[test]
    fn bounding_box_of_empty_geometry_fails() {
        let empty: MultiPolygon<f64> = MultiPolygon::new(vec![]);
        assert_eq!(bounding_box(&empty), Err(GeometryError::Empty));
    }

    #[test]
    fn bounding_boxes_intersect_when_touching() {
        let a = bounding_box(&square(0.0, 0.0, 1.0)).unwrap();
        let b = bounding_box(&square(1.0, 0.0, 1.0)).unwrap();
        let c = bounding_box(&square(2.5, 0.0, 1.0)).unwrap();
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(!c.intersects(&a));
    }

    #[test]
    fn bounding_box_converts_to_envelope() {
        let aabb = bounding_box(&square(1.0, 2.0, 3.0)).unwrap().to_aabb();
        assert_eq!(aabb.lower(), [1.0, 2.0]);
        assert_eq!(aabb.upper(), [4.0, 5.0]);
    }

    #[test]
    fn classifies_relations() {
        let outer = square(0.0, 0.0, 10.0);
        let inner = square(2.0, 2.0, 1.0);
        let straddling = square(9.0, 9.0, 2.0);
        let far = square(20.0, 20.0, 1.0);

        assert_eq!(relation(&inner, &outer), Relation::Within);
        assert_eq!(relation(&outer, &inner), Relation::Contains);
        assert_eq!(relation(&straddling, &outer), Relation::Overlaps);
        assert_eq!(relation(&far, &outer), Relation::Disjoint);

        assert!(is_within(&inner, &outer));
        assert!(!is_within(&outer, &inner));
        assert!(overlaps(&straddling, &outer));
        assert!(!overlaps(&inner, &outer));
        assert!(intersects(&outer, &inner));
        assert!(!intersects(&far, &outer));
    }

    #[test]
    fn within_implies_full_containment() {
        let outer = square(0.0, 0.0, 10.0);
        let inner = square(2.0, 2.0, 1.0);
        assert!(is_within(&inner, &outer));
        let shared = intersection_area(&inner, &outer);
        let full = area_acres(&inner);
        assert!((shared - full).abs() / full < 1e-6);
    }

    #[test]
    fn half_overlap_has_half_area() {
        // Small squares keep spherical distortion negligible.
        let a = square(-121.0, 37.0, 0.01);
        let b = square(-120.995, 37.0, 0.01);
        let full = area_acres(&a);
        let shared = try_intersection_area(&a, &b).unwrap();
        assert!(
            (shared / full - 0.5).abs() < 0.01,
            "expected half of {full}, got {shared}"
        );
    }

    #[test]
    fn disjoint_intersection_is_zero() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(5.0, 5.0, 1.0);
        assert!(intersection_area(&a, &b).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_input_fails_and_counts_zero() {
        let bad = to_multipolygon(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (f64::NAN, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            vec![],
        ));
        let good = square(0.0, 0.0, 1.0);
        assert_eq!(
            try_intersection_area(&bad, &good),
            Err(GeometryError::NonFinite)
        );
        assert!(intersection_area(&bad, &good).abs() < f64::EPSILON);
    }

    #[test]
    fn check_polygon_rejects_degenerate_input() {
        assert_eq!(
            check_polygon(&MultiPolygon::new(vec![])),
            Err(GeometryError::Empty)
        );

        let sliver = to_multipolygon(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]),
            vec![],
        ));
        assert!(matches!(
            check_polygon(&sliver),
            Err(GeometryError::DegenerateRing { .. })
        ));

        assert!(check_polygon(&square(0.0, 0.0, 1.0)).is_ok());
    }

    #[test]
    fn check_polygon_rejects_zero_area_rings() {
        let point_ring = to_multipolygon(Polygon::new(
            LineString::from(vec![(-121.0, 37.5); 4]),
            vec![],
        ));
        assert_eq!(check_polygon(&point_ring), Err(GeometryError::ZeroArea));

        let collinear = to_multipolygon(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.0, 0.0)]),
            vec![],
        ));
        assert_eq!(check_polygon(&collinear), Err(GeometryError::ZeroArea));
    }

    #[test]
    fn dissolve_counts_overlapping_parts_once() {
        let a = square(-121.0, 37.0, 0.02);
        let b = square(-120.99, 37.0, 0.02);
        let parts = MultiPolygon::new(vec![a.0[0].clone(), b.0[0].clone()]);
        let union = a.union(&b);

        let dissolved = dissolve(&parts);
        let expected = area_acres(&union);
        assert!((area_acres(&dissolved) - expected).abs() / expected < 1e-9);

        let clip = square(-121.0, 37.0, 0.03);
        let shared = try_intersection_area(&dissolved, &clip).unwrap();
        assert!((shared - expected).abs() / expected < 1e-6);
    }

    #[test]
    fn dissolve_keeps_single_part() {
        let single = square(0.0, 0.0, 1.0);
        assert_eq!(dissolve(&single), single);
    }

    #[test]
    fn acre_area_of_known_square() {
        // ~1 km square near the equator.
        let side = 1_000.0 / 111_319.49;
        let acres = area_acres(&square(0.0, 0.0, side));
        assert!((acres - 247.105).abs() < 2.0, "got {acres}");
    }
}
