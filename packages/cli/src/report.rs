//! Terminal tables for inventories and residue factors.

use cal_bioscape_inventory::Inventory;
use cal_bioscape_residue::ResidueTable;
use cal_bioscape_siting_models::{DistanceUnit, InventoryMode, LngLat};
use console::style;

pub fn print_inventory(
    inventory: &Inventory,
    mode: InventoryMode,
    site: LngLat,
    radius: f64,
    unit: DistanceUnit,
) {
    println!();
    println!(
        "{} within {radius} {unit} of {site}",
        style("Siting inventory").bold()
    );
    println!(
        "Total Area: {} acres",
        style(format!("{:.2}", inventory.total_acres())).cyan()
    );
    println!();

    if inventory.is_empty() {
        println!("{}", style("No crops found within the buffer.").dim());
        return;
    }

    println!(
        "{:<32} {:>12} {:>7}  {:<22} {:>10} {:>10}",
        "Crop", "Acres", "%", "Residue", "Dry Tons", "Wet Tons"
    );
    for entry in inventory.entries(mode) {
        let residue = entry
            .residue
            .as_ref()
            .map_or_else(|| "-".to_string(), |r| r.category.to_string());
        let line = format!(
            "{:<32} {:>12.2} {:>6.1}%  {:<22} {:>10} {:>10}",
            entry.name,
            entry.acres,
            entry.percent,
            residue,
            entry.dry_tons.map_or_else(|| "-".to_string(), |t| t.to_string()),
            entry.wet_tons.map_or_else(|| "-".to_string(), |t| t.to_string()),
        );
        if entry.has_residue() {
            println!("{line}");
        } else {
            println!("{}", style(line).dim());
        }
    }

    let totals = inventory.residue_totals();
    println!();
    println!(
        "Residue: {} dry tons, {} wet tons from {:.2} mapped acres",
        style(totals.dry_tons).green(),
        style(totals.wet_tons).green(),
        totals.acres
    );
}

pub fn print_factors(table: &ResidueTable, with_aliases: bool) {
    println!(
        "{:<28} {:<22} {:<18} {:>8} {:>9} {:>8}",
        "Residue", "Category", "Type", "Wet t/ac", "Moisture", "Dry t/ac"
    );
    for factor in table.factors() {
        println!(
            "{:<28} {:<22} {:<18} {:>8.2} {:>8.0}% {:>8.2}",
            factor.name,
            factor.category.to_string(),
            factor.residue_type,
            factor.wet_tons_per_acre,
            factor.moisture_content * 100.0,
            factor.dry_tons_per_acre
        );
    }
    println!();
    println!("{} residue factors", style(table.len()).bold());

    if with_aliases {
        println!();
        println!("{:<36} Residue", "Crop name");
        for (alias, canonical) in table.aliases() {
            println!("{alias:<36} {canonical}");
        }
    }
}
