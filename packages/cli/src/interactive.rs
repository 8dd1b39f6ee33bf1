//! Menu-driven siting session over a cropland layer.
//!
//! Mirrors the map workflow: arm siting, drop a marker, adjust radius and
//! unit, inspect or export the inventory, remove the site, close.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use cal_bioscape_cli_utils::{MultiProgress, prompt_positive};
use cal_bioscape_inventory::{ExportMetadata, write_csv};
use cal_bioscape_session::{SessionConfig, SitingSession};
use cal_bioscape_siting_models::{DistanceUnit, InventoryMode, SessionState};
use cal_bioscape_spatial::Feature;
use console::style;
use dialoguer::{Input, Select};

use crate::renderer::LayerRenderer;
use crate::report;

/// Actions offered by the menu, filtered by session state.
#[derive(Clone, Copy)]
enum Action {
    EnterSiting,
    PlaceMarker,
    ChangeRadius,
    ChangeUnit,
    ToggleView,
    ShowInventory,
    ExportCsv,
    RemoveSite,
    CloseSiting,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::EnterSiting,
        Self::PlaceMarker,
        Self::ChangeRadius,
        Self::ChangeUnit,
        Self::ToggleView,
        Self::ShowInventory,
        Self::ExportCsv,
        Self::RemoveSite,
        Self::CloseSiting,
        Self::Quit,
    ];

    #[must_use]
    const fn label(self) -> &'static str {
        match self {
            Self::EnterSiting => "Start siting analysis",
            Self::PlaceMarker => "Place facility marker",
            Self::ChangeRadius => "Change buffer radius",
            Self::ChangeUnit => "Change distance unit",
            Self::ToggleView => "Toggle all crops / residue only",
            Self::ShowInventory => "Show inventory",
            Self::ExportCsv => "Export inventory to CSV",
            Self::RemoveSite => "Remove site",
            Self::CloseSiting => "Close siting analysis",
            Self::Quit => "Quit",
        }
    }

    const fn available(self, state: SessionState) -> bool {
        match self {
            Self::EnterSiting => matches!(state, SessionState::Idle),
            Self::PlaceMarker => matches!(state, SessionState::Placing),
            Self::ChangeRadius | Self::ChangeUnit | Self::ToggleView => {
                !matches!(state, SessionState::Idle)
            }
            Self::ShowInventory | Self::ExportCsv | Self::RemoveSite => {
                matches!(state, SessionState::Placed)
            }
            Self::CloseSiting => !matches!(state, SessionState::Idle),
            Self::Quit => true,
        }
    }
}

/// Runs the interactive menu loop.
///
/// Prompts for a cropland file first when `features` is `None`.
///
/// # Errors
///
/// Returns an error if terminal interaction fails or the cropland file
/// cannot be loaded.
pub fn run(
    multi: &MultiProgress,
    config: SessionConfig,
    features: Option<Vec<Feature>>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", style("Cal BioScape Siting Analysis").bold());
    println!();

    let features = match features {
        Some(features) => features,
        None => {
            let path: String = Input::new()
                .with_prompt("Cropland GeoJSON file")
                .interact_text()?;
            crate::load_features(multi, &PathBuf::from(path), &config)?
        }
    };

    let renderer = LayerRenderer::new(&config.feature_layer_id, features);
    let mut session = SitingSession::new(renderer, config);
    let mut mode = InventoryMode::AllCrops;

    loop {
        print_status(&session, mode);

        let actions: Vec<Action> = Action::ALL
            .iter()
            .copied()
            .filter(|action| action.available(session.state()))
            .collect();
        let labels: Vec<&str> = actions.iter().map(|action| action.label()).collect();

        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        match actions[idx] {
            Action::EnterSiting => session.enter_siting(),
            Action::PlaceMarker => {
                let lng: f64 = Input::new().with_prompt("Longitude").interact_text()?;
                let lat: f64 = Input::new().with_prompt("Latitude").interact_text()?;
                match session.place_marker(lng, lat) {
                    Ok(()) => show_inventory(&session, mode),
                    Err(e) => println!("{}", style(e).red()),
                }
            }
            Action::ChangeRadius => {
                let max = session.unit().slider_max();
                let radius = prompt_positive(
                    &format!("Radius in {} (up to {max})", session.unit()),
                    session.radius(),
                )?;
                if let Err(e) = session.set_radius(radius) {
                    println!("{}", style(e).red());
                }
            }
            Action::ChangeUnit => {
                let units = DistanceUnit::all();
                let labels: Vec<String> = units.iter().map(ToString::to_string).collect();
                let current = units.iter().position(|u| *u == session.unit()).unwrap_or(0);
                let idx = Select::new()
                    .with_prompt("Distance unit")
                    .items(&labels)
                    .default(current)
                    .interact()?;
                session.set_unit(units[idx]);
            }
            Action::ToggleView => {
                mode = match mode {
                    InventoryMode::AllCrops => InventoryMode::ResidueOnly,
                    InventoryMode::ResidueOnly => InventoryMode::AllCrops,
                };
            }
            Action::ShowInventory => show_inventory(&session, mode),
            Action::ExportCsv => export_csv(&session, mode)?,
            Action::RemoveSite => session.remove_site(),
            Action::CloseSiting => session.close_siting(),
            Action::Quit => break,
        }

        // No timer drives the terminal, so pending recomputes run right away.
        if session.flush() && session.state() == SessionState::Placed {
            show_inventory(&session, mode);
        }

        let report = session.check_consistency();
        if report.repaired() {
            log::warn!("Session state repaired: {report:?}");
        }
    }

    Ok(())
}

fn print_status(session: &SitingSession<LayerRenderer>, mode: InventoryMode) {
    println!();
    let crosshair = session
        .renderer()
        .is_visible(&session.config().crosshair_layer_id);
    let site = session
        .marker()
        .map_or_else(|| "none".to_string(), |m| m.to_string());
    println!(
        "[{}] radius {} {} | site {site} | {mode}{}",
        session.state(),
        session.radius(),
        session.unit(),
        if crosshair { " | crosshair armed" } else { "" }
    );
}

fn show_inventory(session: &SitingSession<LayerRenderer>, mode: InventoryMode) {
    if let Some(site) = session.marker() {
        report::print_inventory(
            session.inventory(),
            mode,
            site,
            session.radius(),
            session.unit(),
        );
    }
}

fn export_csv(
    session: &SitingSession<LayerRenderer>,
    mode: InventoryMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(site) = session.marker() else {
        return Ok(());
    };

    let path: String = Input::new()
        .with_prompt("CSV file")
        .default(format!(
            "siting-inventory-{}.csv",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ))
        .interact_text()?;

    let inventory = session.inventory();
    let metadata = ExportMetadata {
        site,
        radius: session.radius(),
        unit: session.unit(),
        mode,
        total_acres: inventory.total_acres(),
        generated_at: chrono::Utc::now(),
    };

    match File::create(&path) {
        Ok(file) => {
            write_csv(BufWriter::new(file), &inventory.export_rows(mode), &metadata.lines())?;
            println!("Wrote {}", style(&path).green());
        }
        Err(e) => println!("{}", style(format!("Could not create {path}: {e}")).red()),
    }

    Ok(())
}
