//! In-memory stand-in for the map: one feature layer loaded from a file,
//! plus whatever geometry sources and layer visibility the session sets.

use std::collections::{BTreeMap, BTreeSet};

use cal_bioscape_session::MapRenderer;
use cal_bioscape_spatial::Feature;
use geojson::FeatureCollection;

pub struct LayerRenderer {
    layer_id: String,
    features: Vec<Feature>,
    sources: BTreeMap<String, FeatureCollection>,
    visible: BTreeSet<String>,
}

impl LayerRenderer {
    pub fn new(layer_id: &str, features: Vec<Feature>) -> Self {
        Self {
            layer_id: layer_id.to_string(),
            features,
            sources: BTreeMap::new(),
            visible: BTreeSet::new(),
        }
    }

    /// Last geometry pushed to `source_id`.
    pub fn source(&self, source_id: &str) -> Option<&FeatureCollection> {
        self.sources.get(source_id)
    }

    pub fn is_visible(&self, layer_id: &str) -> bool {
        self.visible.contains(layer_id)
    }
}

impl MapRenderer for LayerRenderer {
    fn query_features(&self, layer_id: &str) -> Vec<Feature> {
        if layer_id == self.layer_id {
            self.features.clone()
        } else {
            log::warn!("Unknown feature layer '{layer_id}'");
            Vec::new()
        }
    }

    fn set_layer_geometry(&mut self, source_id: &str, geometry: FeatureCollection) {
        log::trace!(
            "Source {source_id} now holds {} features",
            geometry.features.len()
        );
        self.sources.insert(source_id.to_string(), geometry);
    }

    fn set_layer_visibility(&mut self, layer_id: &str, visible: bool) {
        if visible {
            self.visible.insert(layer_id.to_string());
        } else {
            self.visible.remove(layer_id);
        }
    }
}
