//! The siting session.

use std::time::{Duration, Instant};

use cal_bioscape_inventory::Inventory;
use cal_bioscape_residue::{CropPalette, ResidueTable};
use cal_bioscape_siting_models::{DistanceUnit, LngLat, SessionState};
use cal_bioscape_spatial::AggregationStats;
use geo::MultiPolygon;
use geojson::{FeatureCollection, Geometry, Value};

use crate::recompute::{RecomputeJob, RecomputeResult};
use crate::{MapRenderer, SessionConfig, SitingError};

/// What [`SitingSession::check_consistency`] repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// A placed marker had no buffer and was recomputed.
    pub recomputed: bool,
    /// A buffer, inventory or pending recompute without a marker was cleared.
    pub cleared: bool,
    /// A `Placed` session without a marker fell back to `Placing`.
    pub state_reset: bool,
}

impl ConsistencyReport {
    /// Whether anything needed repair.
    #[must_use]
    pub const fn repaired(&self) -> bool {
        self.recomputed || self.cleared || self.state_reset
    }
}

/// A single-site siting analysis driving a map renderer.
///
/// Marker, buffer and inventory are only ever replaced together. Every
/// change that invalidates an in-flight recompute bumps the session
/// generation, and results from older generations are dropped on commit.
pub struct SitingSession<R: MapRenderer> {
    renderer: R,
    config: SessionConfig,
    table: ResidueTable,
    palette: CropPalette,
    state: SessionState,
    radius: f64,
    unit: DistanceUnit,
    marker: Option<LngLat>,
    buffer: Option<MultiPolygon<f64>>,
    inventory: Inventory,
    stats: AggregationStats,
    generation: u64,
    deadline: Option<Instant>,
}

impl<R: MapRenderer> SitingSession<R> {
    /// Creates an idle session using the embedded residue and color tables.
    #[must_use]
    pub fn new(renderer: R, config: SessionConfig) -> Self {
        Self::with_tables(
            renderer,
            config,
            ResidueTable::builtin().clone(),
            CropPalette::builtin().clone(),
        )
    }

    /// Creates an idle session with custom residue and color tables.
    #[must_use]
    pub fn with_tables(
        renderer: R,
        config: SessionConfig,
        table: ResidueTable,
        palette: CropPalette,
    ) -> Self {
        Self {
            radius: config.default_radius,
            unit: config.default_unit,
            renderer,
            config,
            table,
            palette,
            state: SessionState::Idle,
            marker: None,
            buffer: None,
            inventory: Inventory::empty(),
            stats: AggregationStats::default(),
            generation: 0,
            deadline: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    #[must_use]
    pub const fn unit(&self) -> DistanceUnit {
        self.unit
    }

    #[must_use]
    pub const fn marker(&self) -> Option<LngLat> {
        self.marker
    }

    #[must_use]
    pub const fn buffer(&self) -> Option<&MultiPolygon<f64>> {
        self.buffer.as_ref()
    }

    #[must_use]
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    #[must_use]
    pub const fn total_acres(&self) -> f64 {
        self.inventory.total_acres()
    }

    /// Counters from the last committed aggregation.
    #[must_use]
    pub const fn stats(&self) -> AggregationStats {
        self.stats
    }

    /// Whether a debounced recompute is waiting.
    #[must_use]
    pub const fn has_pending_recompute(&self) -> bool {
        self.deadline.is_some()
    }

    /// Current session generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn table(&self) -> &ResidueTable {
        &self.table
    }

    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    pub const fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Arms the crosshair. Only valid from `Idle`.
    pub fn enter_siting(&mut self) {
        if self.state != SessionState::Idle {
            log::debug!("enter_siting ignored in state {}", self.state);
            return;
        }

        self.state = SessionState::Placing;
        self.set_crosshair(true);
        log::debug!("Siting mode armed");
    }

    /// Places the marker and computes the first inventory.
    ///
    /// Ignored (with a log line) outside `Placing`.
    ///
    /// # Errors
    ///
    /// * [`SitingError::InvalidCoordinate`] if the position is out of range
    /// * [`SitingError::Geometry`] if no buffer can be built around it
    ///
    /// The session stays in `Placing` on error.
    pub fn place_marker(&mut self, lng: f64, lat: f64) -> Result<(), SitingError> {
        if self.state != SessionState::Placing {
            log::warn!("place_marker ignored in state {}", self.state);
            return Ok(());
        }

        let center = LngLat::new(lng, lat).inspect_err(|e| {
            log::warn!("Rejected marker placement: {e}");
        })?;

        self.generation += 1;
        self.deadline = None;
        let job = self.job_for(center);
        let features = self
            .renderer
            .query_features(&self.config.feature_layer_id);
        let result = job.run(&features, &self.table, &self.palette);

        if let Err(e) = &result.buffer {
            log::warn!("Rejected marker placement at {center}: {e}");
            return Err(e.clone().into());
        }

        self.marker = Some(center);
        self.state = SessionState::Placed;
        self.set_crosshair(false);
        self.commit(result);
        Ok(())
    }

    /// Sets the buffer radius; see [`Self::set_radius_at`].
    ///
    /// # Errors
    ///
    /// Returns [`SitingError::InvalidRadius`] for a non-positive or
    /// non-finite value.
    pub fn set_radius(&mut self, value: f64) -> Result<(), SitingError> {
        self.set_radius_at(value, Instant::now())
    }

    /// Sets the buffer radius at time `now`.
    ///
    /// The value is stored in every state. While `Placed`, a changed value
    /// schedules a recompute; an unchanged value does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SitingError::InvalidRadius`] for a non-positive or
    /// non-finite value.
    #[allow(clippy::float_cmp)]
    pub fn set_radius_at(&mut self, value: f64, now: Instant) -> Result<(), SitingError> {
        if !value.is_finite() || value <= 0.0 {
            log::warn!("Rejected radius {value}");
            return Err(SitingError::InvalidRadius { value });
        }
        if value == self.radius {
            return Ok(());
        }

        self.radius = value;
        self.schedule(now);
        Ok(())
    }

    /// Sets the radius unit; see [`Self::set_unit_at`].
    pub fn set_unit(&mut self, unit: DistanceUnit) {
        self.set_unit_at(unit, Instant::now());
    }

    /// Sets the radius unit at time `now`. The numeric radius is kept.
    pub fn set_unit_at(&mut self, unit: DistanceUnit, now: Instant) {
        if unit == self.unit {
            return;
        }

        self.unit = unit;
        self.schedule(now);
    }

    /// Removes the marker and re-arms placement. Only valid from `Placed`.
    pub fn remove_site(&mut self) {
        if self.state != SessionState::Placed {
            log::debug!("remove_site ignored in state {}", self.state);
            return;
        }

        self.clear_site();
        self.state = SessionState::Placing;
        self.set_crosshair(true);
        log::debug!("Site removed");
    }

    /// Leaves siting mode from any state, clearing everything.
    pub fn close_siting(&mut self) {
        self.clear_site();
        self.state = SessionState::Idle;
        self.set_crosshair(false);
        log::debug!("Siting mode closed");
    }

    /// Runs the pending recompute if its deadline has passed.
    ///
    /// Returns whether a recompute ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => self.recompute_now(),
            _ => false,
        }
    }

    /// Runs the pending recompute immediately.
    ///
    /// Returns whether a recompute ran.
    pub fn flush(&mut self) -> bool {
        if self.deadline.is_some() {
            self.recompute_now()
        } else {
            false
        }
    }

    /// Time left until the pending recompute is due.
    #[must_use]
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Snapshots a recompute of the current marker, radius and unit,
    /// consuming any pending deadline.
    ///
    /// Returns `None` unless a marker is placed.
    pub fn prepare_recompute(&mut self) -> Option<RecomputeJob> {
        let center = match (self.state, self.marker) {
            (SessionState::Placed, Some(center)) => center,
            _ => return None,
        };

        self.deadline = None;
        Some(self.job_for(center))
    }

    /// Applies a recompute result.
    ///
    /// Results from a superseded generation, or for a marker that is no
    /// longer placed, are discarded. If the buffer failed, the previous
    /// buffer stays and the inventory is emptied.
    ///
    /// Returns whether the result was applied.
    pub fn commit(&mut self, result: RecomputeResult) -> bool {
        if result.generation != self.generation
            || self.state != SessionState::Placed
            || self.marker != Some(result.center)
        {
            log::debug!(
                "Discarding stale recompute (generation {}, current {})",
                result.generation,
                self.generation
            );
            return false;
        }

        match result.buffer {
            Ok(buffer) => {
                self.renderer
                    .set_layer_geometry(&self.config.buffer_source_id, buffer_collection(&buffer));
                self.set_buffer_layers(true);
                self.buffer = Some(buffer);
            }
            Err(e) => {
                log::warn!("Keeping previous buffer after failed recompute: {e}");
            }
        }
        self.inventory = result.inventory;
        self.stats = result.stats;

        log::info!(
            "Committed siting inventory: {} crops, {:.2} acres within {} {} of {}",
            self.inventory.len(),
            self.inventory.total_acres(),
            self.radius,
            self.unit,
            result.center
        );
        true
    }

    /// Repairs marker/buffer/inventory combinations that should not exist.
    pub fn check_consistency(&mut self) -> ConsistencyReport {
        let mut report = ConsistencyReport::default();

        if self.marker.is_none() {
            if self.buffer.is_some() || !self.inventory.is_empty() || self.deadline.is_some() {
                log::warn!("Clearing buffer, inventory and pending recompute left without a marker");
                self.clear_site();
                report.cleared = true;
            }
            if self.state == SessionState::Placed {
                log::warn!("Placed session has no marker, re-arming placement");
                self.state = SessionState::Placing;
                self.set_crosshair(true);
                report.state_reset = true;
            }
        } else if self.state == SessionState::Placed && self.buffer.is_none() {
            log::warn!("Placed marker has no buffer, recomputing");
            self.generation += 1;
            report.recomputed = self.recompute_now();
        }

        report
    }

    fn job_for(&self, center: LngLat) -> RecomputeJob {
        RecomputeJob {
            generation: self.generation,
            center,
            radius: self.radius,
            unit: self.unit,
            steps: self.config.buffer_steps,
        }
    }

    fn schedule(&mut self, now: Instant) {
        if self.state != SessionState::Placed {
            return;
        }

        self.generation += 1;
        let debounce = self.config.debounce();
        if debounce.is_zero() {
            self.recompute_now();
        } else {
            self.deadline = Some(now + debounce);
        }
    }

    fn recompute_now(&mut self) -> bool {
        let Some(job) = self.prepare_recompute() else {
            return false;
        };

        let features = self
            .renderer
            .query_features(&self.config.feature_layer_id);
        let result = job.run(&features, &self.table, &self.palette);
        self.commit(result)
    }

    fn clear_site(&mut self) {
        self.generation += 1;
        self.deadline = None;
        self.marker = None;
        self.buffer = None;
        self.inventory = Inventory::empty();
        self.stats = AggregationStats::default();
        self.renderer
            .set_layer_geometry(&self.config.buffer_source_id, empty_collection());
        self.set_buffer_layers(false);
    }

    fn set_buffer_layers(&mut self, visible: bool) {
        self.renderer
            .set_layer_visibility(&self.config.buffer_fill_layer_id, visible);
        self.renderer
            .set_layer_visibility(&self.config.buffer_outline_layer_id, visible);
    }

    fn set_crosshair(&mut self, visible: bool) {
        self.renderer
            .set_layer_visibility(&self.config.crosshair_layer_id, visible);
    }
}

fn buffer_collection(buffer: &MultiPolygon<f64>) -> FeatureCollection {
    let geometry = Geometry::new(Value::from(buffer));
    FeatureCollection {
        bbox: None,
        features: vec![geojson::Feature::from(geometry)],
        foreign_members: None,
    }
}

const fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}
