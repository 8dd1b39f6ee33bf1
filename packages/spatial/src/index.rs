//! R-tree envelope index over cropland features.
//!
//! Large cropland layers hold tens of thousands of parcels while a buffer
//! touches a few hundred. The index answers the bounding-box pre-filter
//! with an envelope query instead of a linear scan.

use cal_bioscape_geometry::bounding_box;
use geo::MultiPolygon;
use rstar::{AABB, RTree, RTreeObject};

use crate::aggregate::{Aggregation, Contribution, SkipReason, buffer_bounds, classify};
use crate::feature::Feature;

/// An analyzable feature polygon stored in the R-tree.
struct FeatureEntry {
    position: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for FeatureEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Features bulk-loaded into an R-tree, aggregated against any buffer.
///
/// Produces exactly the same [`Aggregation`] as
/// [`aggregate`](crate::aggregate::aggregate) over the same features.
pub struct FeatureIndex {
    features: Vec<Feature>,
    tree: RTree<FeatureEntry>,
    skipped: Vec<(usize, SkipReason)>,
}

impl FeatureIndex {
    /// Indexes `features`. Unanalyzable features are remembered so they
    /// are still counted by every aggregation.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        let mut entries = Vec::with_capacity(features.len());
        let mut skipped = Vec::new();

        for (position, feature) in features.iter().enumerate() {
            let polygon = match feature.shape() {
                Ok(shape) => shape.into_owned(),
                Err(reason) => {
                    skipped.push((position, reason));
                    continue;
                }
            };
            let envelope = match bounding_box(&polygon) {
                Ok(bounds) => bounds.to_aabb(),
                Err(e) => {
                    skipped.push((position, SkipReason::Degenerate(e)));
                    continue;
                }
            };

            entries.push(FeatureEntry {
                position,
                envelope,
                polygon,
            });
        }

        let tree = RTree::bulk_load(entries);
        log::info!(
            "Indexed {} of {} features ({} skipped)",
            tree.size(),
            features.len(),
            skipped.len()
        );

        Self {
            features,
            tree,
            skipped,
        }
    }

    /// All features, in load order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Number of features, indexed or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the index holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of analyzable features in the tree.
    #[must_use]
    pub fn indexed(&self) -> usize {
        self.tree.size()
    }

    /// Sums the acreage of each crop category inside `buffer`.
    #[must_use]
    pub fn aggregate(&self, buffer: &MultiPolygon<f64>) -> Aggregation {
        let bounds = match buffer_bounds(buffer) {
            Ok(bounds) => bounds,
            Err(e) => return Aggregation::unusable_buffer(self.features.len(), &e),
        };

        let mut aggregation = Aggregation::default();
        for (position, reason) in &self.skipped {
            aggregation.record(
                &self.features[*position].category,
                &Contribution::Skipped(reason.clone()),
            );
        }

        // Visit candidates in load order so sums match the linear path.
        let mut candidates: Vec<&FeatureEntry> = self
            .tree
            .locate_in_envelope_intersecting(&bounds.to_aabb())
            .collect();
        candidates.sort_unstable_by_key(|entry| entry.position);

        for _ in candidates.len()..self.tree.size() {
            aggregation.record("", &Contribution::OutsideBounds);
        }

        for entry in candidates {
            let feature = &self.features[entry.position];
            let contribution = classify(buffer, &entry.polygon, feature.nominal_acres());
            log::debug!(
                "Feature {:?} ({}): {contribution:?}",
                feature.id,
                feature.category
            );
            aggregation.record(&feature.category, &contribution);
        }

        aggregation
    }
}
