use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::models::SeriesPoint;

const HEADER: [&str; 4] = ["Reorçamento", "Venda acumulada", "Custo acumulado", "Margem %"];

/// Writes the cumulative table as CSV, one row per point. Returns the number
/// of data rows written.
pub(crate) fn write_series<W: Write>(writer: W, points: &[SeriesPoint]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)
        .context("Failed to write CSV header")?;
    for point in points {
        wtr.write_record([
            point.label.clone(),
            format!("{:.2}", point.accumulated_sale),
            format!("{:.2}", point.accumulated_cost),
            format!("{:.2}", point.margin_display()),
        ])
        .with_context(|| format!("Failed to write CSV row for '{}'", point.label))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(points.len())
}

pub(crate) fn export_series_to_path(path: &Path, points: &[SeriesPoint]) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_series(file, points)
}

#[cfg(test)]
#[path = "csv_export_tests.rs"]
mod tests;
