//! Radius conversion and geodesic buffer construction.
//!
//! A buffer is a ring of points at a fixed great-circle distance from the
//! site, one per bearing step. Larger radii around the same center produce
//! nested rings because every step uses the same bearings.

use cal_bioscape_siting_models::{DistanceUnit, LngLat};
use geo::{Destination, Haversine, LineString, MultiPolygon, Point, Polygon};

use crate::{
    DEFAULT_BUFFER_STEPS, GeometryError, METERS_PER_KILOMETER, METERS_PER_MILE, MIN_BUFFER_STEPS,
};

/// Converts a radius in `unit` to meters.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidDistance`] if `value` is negative or
/// non-finite.
pub fn to_meters(value: f64, unit: DistanceUnit) -> Result<f64, GeometryError> {
    if !value.is_finite() || value < 0.0 {
        return Err(GeometryError::InvalidDistance { value });
    }

    Ok(match unit {
        DistanceUnit::Miles => value * METERS_PER_MILE,
        DistanceUnit::Kilometers => value * METERS_PER_KILOMETER,
    })
}

/// Builds a circular buffer of `radius_meters` around `center`.
///
/// The ring has `steps` distinct vertices (plus the closing vertex) and
/// winds counter-clockwise.
///
/// # Errors
///
/// * [`GeometryError::InvalidRadius`] if the radius is not finite and positive
/// * [`GeometryError::TooFewSteps`] if `steps` is below [`MIN_BUFFER_STEPS`]
/// * [`GeometryError::WrapsAntimeridian`] if the ring would cross ±180°
pub fn build_buffer(
    center: LngLat,
    radius_meters: f64,
    steps: u32,
) -> Result<MultiPolygon<f64>, GeometryError> {
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(GeometryError::InvalidRadius {
            meters: radius_meters,
        });
    }
    if steps < MIN_BUFFER_STEPS {
        return Err(GeometryError::TooFewSteps { steps });
    }

    let origin = Point::new(center.lng(), center.lat());
    let step_degrees = 360.0 / f64::from(steps);

    // Bearings are clockwise from north, so walk them backwards.
    let ring: Vec<Point<f64>> = (0..steps)
        .map(|i| Haversine.destination(origin, 360.0 - step_degrees * f64::from(i), radius_meters))
        .collect();

    if ring.iter().any(|p| !p.x().is_finite() || !p.y().is_finite()) {
        return Err(GeometryError::NonFinite);
    }

    let (min_lng, max_lng) = ring
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.x()), hi.max(p.x()))
        });
    if min_lng < -180.0 || max_lng > 180.0 || max_lng - min_lng > 180.0 {
        return Err(GeometryError::WrapsAntimeridian {
            meters: radius_meters,
        });
    }

    // `Polygon::new` closes the ring.
    let polygon = Polygon::new(LineString::from(ring), vec![]);
    Ok(MultiPolygon::new(vec![polygon]))
}

/// Builds a buffer with [`DEFAULT_BUFFER_STEPS`] vertices.
///
/// # Errors
///
/// See [`build_buffer`].
pub fn build_default_buffer(
    center: LngLat,
    radius_meters: f64,
) -> Result<MultiPolygon<f64>, GeometryError> {
    build_buffer(center, radius_meters, DEFAULT_BUFFER_STEPS)
}

/// Builds a buffer around raw coordinates, validating them first.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidCenter`] for an out-of-range or
/// non-finite center, otherwise see [`build_buffer`].
pub fn build_buffer_around(
    lng: f64,
    lat: f64,
    radius_meters: f64,
    steps: u32,
) -> Result<MultiPolygon<f64>, GeometryError> {
    let center = LngLat::new(lng, lat)?;
    build_buffer(center, radius_meters, steps)
}

#[cfg(test)]
mod tests {
    use geo::{Contains, Distance};

    use super::*;
    use crate::area_acres;

    fn site() -> LngLat {
        LngLat::new(-121.0, 37.5).unwrap()
    }

    #[test]
    fn converts_miles() {
        let meters = to_meters(10.0, DistanceUnit::Miles).unwrap();
        assert!((meters - 16_093.4).abs() <= 0.1, "got {meters}");
    }

    #[test]
    fn converts_kilometers() {
        let meters = to_meters(10.0, DistanceUnit::Kilometers).unwrap();
        assert!((meters - 10_000.0).abs() < f64::EPSILON, "got {meters}");
    }

    #[test]
    fn zero_distance_converts_to_zero() {
        assert!(to_meters(0.0, DistanceUnit::Miles).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_negative_and_non_finite_distances() {
        assert!(to_meters(-1.0, DistanceUnit::Miles).is_err());
        assert!(to_meters(f64::NAN, DistanceUnit::Kilometers).is_err());
        assert!(to_meters(f64::INFINITY, DistanceUnit::Miles).is_err());
    }

    #[test]
    fn buffer_ring_has_requested_vertices() {
        let buffer = build_buffer(site(), 1_000.0, 32).unwrap();
        assert_eq!(buffer.0.len(), 1);
        let ring = buffer.0[0].exterior();
        assert_eq!(ring.0.len(), 33, "32 vertices plus the closing vertex");
        assert!(ring.is_closed());
    }

    #[test]
    fn buffer_vertices_sit_on_the_radius() {
        let center = site();
        let origin = Point::new(center.lng(), center.lat());
        let buffer = build_default_buffer(center, 5_000.0).unwrap();

        for coord in buffer.0[0].exterior().coords() {
            let d = Haversine.distance(origin, Point::from(*coord));
            assert!((d - 5_000.0).abs() < 0.5, "vertex at {d} m");
        }
    }

    #[test]
    fn buffer_contains_its_center() {
        let center = site();
        let buffer = build_default_buffer(center, 500.0).unwrap();
        assert!(buffer.contains(&Point::new(center.lng(), center.lat())));
    }

    #[test]
    fn buffer_area_approximates_circle() {
        let radius = 16_093.4;
        let buffer = build_default_buffer(site(), radius).unwrap();
        let expected = std::f64::consts::PI * radius * radius * crate::ACRES_PER_SQUARE_METER;
        let actual = area_acres(&buffer);
        let error = (actual - expected).abs() / expected;
        assert!(
            error < 0.01,
            "Circle area error {:.2}% (expected {expected:.1}, got {actual:.1})",
            error * 100.0
        );
    }

    #[test]
    fn larger_radius_produces_larger_area() {
        let small = build_default_buffer(site(), 1_000.0).unwrap();
        let big = build_default_buffer(site(), 5_000.0).unwrap();
        assert!(area_acres(&big) > area_acres(&small));
    }

    #[test]
    fn rejects_bad_radius() {
        assert_eq!(
            build_buffer(site(), 0.0, 64),
            Err(GeometryError::InvalidRadius { meters: 0.0 })
        );
        assert!(build_buffer(site(), -5.0, 64).is_err());
        assert!(build_buffer(site(), f64::NAN, 64).is_err());
    }

    #[test]
    fn rejects_too_few_steps() {
        assert_eq!(
            build_buffer(site(), 100.0, 2),
            Err(GeometryError::TooFewSteps { steps: 2 })
        );
    }

    #[test]
    fn rejects_invalid_center() {
        assert!(matches!(
            build_buffer_around(-121.0, 95.0, 100.0, 64),
            Err(GeometryError::InvalidCenter(_))
        ));
    }

    #[test]
    fn rejects_buffer_across_antimeridian() {
        let center = LngLat::new(179.99, 0.0).unwrap();
        assert!(matches!(
            build_default_buffer(center, 10_000.0),
            Err(GeometryError::WrapsAntimeridian { .. })
        ));
    }
}
