//! Buffer and inventory recomputation, detached from the session.
//!
//! A [`RecomputeJob`] snapshots everything a recompute needs, so it can run
//! away from the session (for example while the map gathers features) and
//! be handed back through [`SitingSession::commit`](crate::SitingSession::commit).
//! Jobs carry the session generation they were prepared in; results from
//! superseded generations are discarded on commit.

use cal_bioscape_geometry::{GeometryError, build_buffer, to_meters};
use cal_bioscape_inventory::{Inventory, format};
use cal_bioscape_residue::{CropPalette, ResidueTable};
use cal_bioscape_siting_models::{DistanceUnit, LngLat};
use cal_bioscape_spatial::{AggregationStats, Feature, aggregate};
use geo::MultiPolygon;

/// Inputs of one recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeJob {
    pub(crate) generation: u64,
    pub(crate) center: LngLat,
    pub(crate) radius: f64,
    pub(crate) unit: DistanceUnit,
    pub(crate) steps: u32,
}

/// Output of a [`RecomputeJob`], ready to commit.
#[derive(Debug, Clone)]
pub struct RecomputeResult {
    pub(crate) generation: u64,
    pub(crate) center: LngLat,
    /// The buffer, or why it could not be built.
    pub buffer: Result<MultiPolygon<f64>, GeometryError>,
    /// The formatted inventory, empty when the buffer failed.
    pub inventory: Inventory,
    /// Aggregation counters, default when the buffer failed.
    pub stats: AggregationStats,
}

impl RecomputeJob {
    /// Session generation this job belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Marker position.
    #[must_use]
    pub const fn center(&self) -> LngLat {
        self.center
    }

    /// Radius in [`Self::unit`].
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Radius unit.
    #[must_use]
    pub const fn unit(&self) -> DistanceUnit {
        self.unit
    }

    /// Builds the buffer and the inventory of `features` inside it.
    ///
    /// Geometry failures are absorbed into the result: the inventory is
    /// empty and [`RecomputeResult::buffer`] carries the error.
    #[must_use]
    pub fn run(
        &self,
        features: &[Feature],
        table: &ResidueTable,
        palette: &CropPalette,
    ) -> RecomputeResult {
        let buffer = to_meters(self.radius, self.unit)
            .and_then(|meters| build_buffer(self.center, meters, self.steps));

        let (inventory, stats) = match &buffer {
            Ok(buffer) => {
                let aggregation = aggregate(buffer, features);
                (format(&aggregation, table, palette), aggregation.stats)
            }
            Err(e) => {
                log::warn!(
                    "Could not build a {} {} buffer at {}: {e}",
                    self.radius,
                    self.unit,
                    self.center
                );
                (Inventory::empty(), AggregationStats::default())
            }
        };

        RecomputeResult {
            generation: self.generation,
            center: self.center,
            buffer,
            inventory,
            stats,
        }
    }
}

impl RecomputeResult {
    /// Session generation the result was computed for.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(radius: f64) -> RecomputeJob {
        RecomputeJob {
            generation: 3,
            center: LngLat::new(-121.0, 37.5).unwrap(),
            radius,
            unit: DistanceUnit::Miles,
            steps: 64,
        }
    }

    #[test]
    fn builds_buffer_and_empty_inventory_without_features() {
        let result = job(10.0).run(&[], ResidueTable::builtin(), CropPalette::builtin());
        assert_eq!(result.generation(), 3);
        assert!(result.buffer.is_ok());
        assert!(result.inventory.is_empty());
    }

    #[test]
    fn buffer_failure_is_absorbed() {
        let wraps = RecomputeJob {
            center: LngLat::new(179.99, 0.0).unwrap(),
            ..job(10.0)
        };
        let result = wraps.run(&[], ResidueTable::builtin(), CropPalette::builtin());
        assert!(matches!(
            result.buffer,
            Err(GeometryError::WrapsAntimeridian { .. })
        ));
        assert!(result.inventory.is_empty());
    }
}
