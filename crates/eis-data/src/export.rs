//! CSV persistence for measurement tables and combined batch tables.
//!
//! Numbers are written with [`format_float`] so that a value reads back as
//! the same `f64` and matches the text used in wide labels.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use eis_core::error::{EisError, Result};
use eis_core::formatting::format_float;
use eis_core::models::{CombinedTable, Field, Measurement, MeasurementTable, FILE_COLUMN};
use tracing::info;

// ── Measurement tables ────────────────────────────────────────────────────────

/// Write `table` to `path` under the five fixed column headers.
pub fn write_measurement_csv(table: &MeasurementTable, path: &Path) -> Result<()> {
    let file = create_with_parents(path)?;
    write_measurements(table, file)?;
    info!("Wrote {} measurement rows to {}", table.len(), path.display());
    Ok(())
}

pub fn write_measurements<W: Write>(table: &MeasurementTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(Field::ALL.iter().map(|f| f.column_name()))?;
    for row in &table.rows {
        wtr.write_record(row.values().iter().map(|v| format_float(*v)))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a table written by [`write_measurement_csv`].
///
/// The header row must match the fixed schema exactly, otherwise
/// [`EisError::Schema`] is returned.
pub fn read_measurement_csv(path: &Path) -> Result<MeasurementTable> {
    let file = File::open(path).map_err(|source| EisError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    read_measurements(path, file)
}

/// Like [`read_measurement_csv`] over any reader; `path` is only used in errors.
pub fn read_measurements<R: Read>(path: &Path, reader: R) -> Result<MeasurementTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let expected = Field::column_names();
    let found: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if found != expected {
        return Err(EisError::Schema {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        if record.len() != Field::ALL.len() {
            return Err(EisError::FieldCount {
                path: path.to_path_buf(),
                line,
                found: record.len(),
            });
        }

        let mut values = [0.0_f64; 5];
        for (idx, (raw, field)) in record.iter().zip(Field::ALL).enumerate() {
            values[idx] = raw.parse::<f64>().map_err(|_| EisError::NonNumeric {
                path: path.to_path_buf(),
                line,
                field: idx + 1,
                column: field.column_name().to_string(),
                value: raw.to_string(),
            })?;
        }
        rows.push(Measurement::from_values(values));
    }

    Ok(MeasurementTable::new(rows))
}

// ── Combined tables ───────────────────────────────────────────────────────────

/// Write a batch table to `path`, creating parent directories as needed.
///
/// Layout: an unnamed ordinal index column, the value columns in table
/// order, then `file`. Missing cells are left empty.
pub fn write_combined_csv(table: &CombinedTable, path: &Path) -> Result<()> {
    let file = create_with_parents(path)?;
    write_combined(table, file)?;
    info!(
        "Wrote {} rows x {} columns to {}",
        table.row_count(),
        table.column_count(),
        path.display()
    );
    Ok(())
}

pub fn write_combined<W: Write>(table: &CombinedTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = Vec::with_capacity(table.column_count() + 2);
    header.push("");
    header.extend(table.columns.iter().map(String::as_str));
    header.push(FILE_COLUMN);
    wtr.write_record(&header)?;

    for (idx, row) in table.rows.iter().enumerate() {
        let mut cells: Vec<String> = Vec::with_capacity(header.len());
        cells.push(idx.to_string());
        cells.extend(
            row.values
                .iter()
                .map(|v| v.map(format_float).unwrap_or_default()),
        );
        cells.push(row.file.clone());
        wtr.write_record(&cells)?;
    }

    wtr.flush()?;
    Ok(())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn create_with_parents(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
