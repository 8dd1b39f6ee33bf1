#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Residue inventory for a siting buffer.
//!
//! Turns per-crop acreage from the spatial aggregator into display rows:
//! each crop is matched against the residue factor table (through the raw
//! name alias table), given a display color, a share of the total, and
//! estimated dry and wet residue tonnage when a factor exists.

pub mod export;

pub use export::{ExportError, ExportMetadata, write_csv};

use cal_bioscape_residue::{CropPalette, ResidueTable};
use cal_bioscape_siting_models::{ExportRow, InventoryEntry, InventoryMode, ResidueMatch};
use cal_bioscape_spatial::Aggregation;

/// Summed residue tonnage over the mapped crops of an inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResidueTotals {
    /// Acres of crops with residue factors.
    pub acres: f64,
    /// Estimated dry tons.
    pub dry_tons: u64,
    /// Estimated wet tons.
    pub wet_tons: u64,
}

/// Inventory rows sorted by descending acreage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
    total_acres: f64,
}

impl Inventory {
    /// An inventory with no rows.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
            total_acres: 0.0,
        }
    }

    /// Every row, mapped or not.
    #[must_use]
    pub fn all_entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    /// Rows presented under `mode`.
    pub fn entries(&self, mode: InventoryMode) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.iter().filter(move |entry| match mode {
            InventoryMode::AllCrops => true,
            InventoryMode::ResidueOnly => entry.has_residue(),
        })
    }

    /// Total acres of all crops inside the buffer.
    #[must_use]
    pub const fn total_acres(&self) -> f64 {
        self.total_acres
    }

    /// Number of crop rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer held no crops.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row for a raw crop name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&InventoryEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Residue tonnage summed over mapped crops only.
    #[must_use]
    pub fn residue_totals(&self) -> ResidueTotals {
        self.entries(InventoryMode::ResidueOnly)
            .fold(ResidueTotals::default(), |totals, entry| ResidueTotals {
                acres: totals.acres + entry.acres,
                dry_tons: totals.dry_tons + entry.dry_tons.unwrap_or(0),
                wet_tons: totals.wet_tons + entry.wet_tons.unwrap_or(0),
            })
    }

    /// Flat rows for export. Acres are rounded to two decimals and
    /// percentages to one, as displayed.
    #[must_use]
    pub fn export_rows(&self, mode: InventoryMode) -> Vec<ExportRow> {
        self.entries(mode)
            .map(|entry| ExportRow {
                crop: entry.name.clone(),
                acres: round_to(entry.acres, 2),
                percent: round_to(entry.percent, 1),
                residue_category: entry
                    .residue
                    .as_ref()
                    .map(|residue| residue.category.to_string())
                    .unwrap_or_default(),
                dry_tons: entry.dry_tons,
                wet_tons: entry.wet_tons,
            })
            .collect()
    }
}

/// Builds the inventory for an aggregation.
///
/// Crops are matched to residue factors by exact raw name through the
/// alias table; unmatched crops keep their acreage but carry no tonnage.
#[must_use]
pub fn format(aggregation: &Aggregation, table: &ResidueTable, palette: &CropPalette) -> Inventory {
    let total_acres = aggregation.total;

    let mut entries: Vec<InventoryEntry> = aggregation
        .per_category
        .iter()
        .map(|(name, &acres)| {
            let factor = table.lookup(name);
            if factor.is_none() {
                log::debug!("No residue factor for crop '{name}'");
            }
            let estimate = factor.map(|factor| factor.estimate(acres));

            InventoryEntry {
                name: name.clone(),
                acres,
                percent: percent_of(acres, total_acres),
                color: palette.color_for(name).to_string(),
                residue: factor.map(|factor| ResidueMatch {
                    residue_name: factor.name.clone(),
                    category: factor.category,
                    residue_type: factor.residue_type.clone(),
                }),
                dry_tons: estimate.map(|e| e.dry_tons),
                wet_tons: estimate.map(|e| e.wet_tons),
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.acres
            .total_cmp(&a.acres)
            .then_with(|| a.name.cmp(&b.name))
    });

    Inventory {
        entries,
        total_acres,
    }
}

fn percent_of(acres: f64, total: f64) -> f64 {
    if total > 0.0 {
        acres / total * 100.0
    } else {
        0.0
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}
