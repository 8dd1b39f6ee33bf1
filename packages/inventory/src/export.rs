//! CSV output of inventory rows.

use std::io::Write;

use cal_bioscape_siting_models::{DistanceUnit, ExportRow, InventoryMode, LngLat};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing to the sink failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Context written above the rows of an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMetadata {
    /// Facility site.
    pub site: LngLat,
    /// Buffer radius in `unit`.
    pub radius: f64,
    /// Radius unit.
    pub unit: DistanceUnit,
    /// Rows included.
    pub mode: InventoryMode,
    /// Total crop acreage inside the buffer.
    pub total_acres: f64,
    /// When the export was produced.
    pub generated_at: DateTime<Utc>,
}

impl ExportMetadata {
    /// Human-readable header lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        vec![
            "Cal BioScape Siting Inventory".to_string(),
            format!(
                "Site: {:.5}, {:.5}",
                self.site.lng(),
                self.site.lat()
            ),
            format!("Radius: {} {}", self.radius, self.unit),
            format!("Rows: {}", self.mode),
            format!("Total Area: {:.2} acres", self.total_acres),
            format!("Generated: {}", self.generated_at.to_rfc3339()),
        ]
    }
}

/// Writes `metadata` lines followed by a blank line, then a header row and
/// `rows`.
///
/// Each metadata line is one quoted cell padded with empty cells to the
/// column count, so spreadsheets keep the table columns aligned.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_csv<W: Write>(
    mut writer: W,
    rows: &[ExportRow],
    metadata: &[String],
) -> Result<(), ExportError> {
    if !metadata.is_empty() {
        // `csv` has no quote style that quotes the first cell but leaves the padding bare.
        let padding = ",".repeat(ExportRow::HEADERS.len() - 1);
        for line in metadata {
            writeln!(writer, "\"{}\"{padding}", line.replace('"', "\"\""))?;
        }
        writeln!(writer)?;
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(&mut writer);
    csv_writer.write_record(ExportRow::HEADERS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    drop(csv_writer);

    log::debug!("Wrote {} inventory rows", rows.len());
    Ok(())
}
