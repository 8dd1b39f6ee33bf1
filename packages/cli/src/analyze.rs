//! Batch analysis: one site, one radius, or a sweep over several radii.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use cal_bioscape_cli_utils::MultiProgress;
use cal_bioscape_geometry::{build_buffer, to_meters};
use cal_bioscape_inventory::{ExportMetadata, format, write_csv};
use cal_bioscape_residue::{CropPalette, ResidueTable};
use cal_bioscape_session::{SessionConfig, SitingSession};
use cal_bioscape_siting_models::{DistanceUnit, InventoryMode, LngLat};
use cal_bioscape_spatial::{Feature, FeatureIndex};
use console::style;

use crate::renderer::LayerRenderer;
use crate::report;

pub struct AnalyzeRequest {
    pub lng: f64,
    pub lat: f64,
    pub radius: f64,
    pub unit: DistanceUnit,
    pub mode: InventoryMode,
    pub csv: Option<PathBuf>,
    pub buffer_out: Option<PathBuf>,
    pub json: bool,
}

/// Places a site in a fresh session and reports its inventory.
///
/// # Errors
///
/// Returns an error if the site or radius is invalid, no buffer can be
/// built, or an output file cannot be written.
pub fn run(
    features: Vec<Feature>,
    config: SessionConfig,
    request: &AnalyzeRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let renderer = LayerRenderer::new(&config.feature_layer_id, features);
    let mut session = SitingSession::new(renderer, config);

    session.set_radius(request.radius)?;
    session.set_unit(request.unit);
    session.enter_siting();
    session.place_marker(request.lng, request.lat)?;

    let Some(site) = session.marker() else {
        return Err("Marker was not placed".into());
    };
    let inventory = session.inventory();

    let stats = session.stats();
    log::info!(
        "{} features: {} within, {} partial, {} fallbacks, {} skipped",
        stats.seen,
        stats.within,
        stats.partial,
        stats.fallbacks,
        stats.skipped_geometry + stats.skipped_unsupported
    );

    if request.json {
        let entries: Vec<_> = inventory.entries(request.mode).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        report::print_inventory(inventory, request.mode, site, session.radius(), session.unit());
    }

    if let Some(path) = &request.csv {
        let metadata = ExportMetadata {
            site,
            radius: session.radius(),
            unit: session.unit(),
            mode: request.mode,
            total_acres: inventory.total_acres(),
            generated_at: chrono::Utc::now(),
        };
        let writer = BufWriter::new(File::create(path)?);
        write_csv(writer, &inventory.export_rows(request.mode), &metadata.lines())?;
        println!("Wrote {}", style(path.display()).green());
    }

    if let Some(path) = &request.buffer_out {
        let source_id = &session.config().buffer_source_id;
        let Some(collection) = session.renderer().source(source_id) else {
            return Err("No buffer geometry was rendered".into());
        };
        std::fs::write(path, serde_json::to_string_pretty(collection)?)?;
        println!("Wrote {}", style(path.display()).green());
    }

    Ok(())
}

/// Aggregates the same site at several radii through one feature index.
///
/// # Errors
///
/// Returns an error if the site is invalid or a radius cannot be turned
/// into a buffer.
pub fn sweep(
    multi: &MultiProgress,
    features: Vec<Feature>,
    config: &SessionConfig,
    lng: f64,
    lat: f64,
    radii: &[f64],
    unit: DistanceUnit,
) -> Result<(), Box<dyn std::error::Error>> {
    let site = LngLat::new(lng, lat)?;

    let spinner = cal_bioscape_cli_utils::spinner(multi, "Indexing features");
    let index = FeatureIndex::new(features);
    spinner.finish_and_clear();

    let table = ResidueTable::builtin();
    let palette = CropPalette::builtin();
    let bar = cal_bioscape_cli_utils::steps_bar(multi, "Radii", radii.len() as u64);
    let mut rows = Vec::with_capacity(radii.len());

    for &radius in radii {
        let meters = to_meters(radius, unit)?;
        let buffer = build_buffer(site, meters, config.buffer_steps)?;
        let inventory = format(&index.aggregate(&buffer), table, palette);
        rows.push((radius, inventory));
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!(
        "{} at {site} ({} of {} features indexed)",
        style("Radius sweep").bold(),
        index.indexed(),
        index.len()
    );
    println!(
        "{:>10} {:>14} {:>14} {:>12} {:>12} {:>7}",
        format!("Radius ({unit})"),
        "Total acres",
        "Residue acres",
        "Dry tons",
        "Wet tons",
        "Crops"
    );
    for (radius, inventory) in &rows {
        let totals = inventory.residue_totals();
        println!(
            "{radius:>10} {:>14.2} {:>14.2} {:>12} {:>12} {:>7}",
            inventory.total_acres(),
            totals.acres,
            totals.dry_tons,
            totals.wet_tons,
            inventory.len()
        );
    }

    Ok(())
}
