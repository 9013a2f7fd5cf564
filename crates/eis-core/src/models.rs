use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The literal line separating the header preamble from the data section.
pub const MARKER_LINE: &str = "Freq/Hz, Z'/ohm, Z\"/ohm, Z/ohm, Phase/deg";

/// Separator between the five fields of a data line.
pub const FIELD_SEPARATOR: &str = ", ";

/// Number of header lines kept for the display summary.
pub const HEADER_SUMMARY_LINES: usize = 11;

/// Name of the column holding the source path in wide and combined tables.
pub const FILE_COLUMN: &str = "file";

/// One of the five fixed measurement columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Sweep frequency in hertz.
    Frequency,
    /// Real impedance component Z' in ohms.
    ZReal,
    /// Imaginary impedance component Z" in ohms.
    ZImag,
    /// Impedance magnitude |Z| in ohms.
    ZMod,
    /// Phase angle in degrees.
    Phase,
}

impl Field {
    /// All five columns in file order.
    pub const ALL: [Field; 5] = [
        Field::Frequency,
        Field::ZReal,
        Field::ZImag,
        Field::ZMod,
        Field::Phase,
    ];

    /// The four columns keyed by frequency when reshaping.
    pub const MEASURED: [Field; 4] = [Field::ZReal, Field::ZImag, Field::ZMod, Field::Phase];

    /// Column header as written by the instrument.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::Frequency => "Freq/Hz",
            Field::ZReal => "Z'/ohm",
            Field::ZImag => "Z\"/ohm",
            Field::ZMod => "Z/ohm",
            Field::Phase => "Phase/deg",
        }
    }

    /// Owned copies of all five column names, for schema comparisons.
    pub fn column_names() -> Vec<String> {
        Field::ALL
            .iter()
            .map(|f| f.column_name().to_string())
            .collect()
    }
}

/// A single row of an impedance sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub frequency: f64,
    pub z_real: f64,
    pub z_imag: f64,
    pub z_mod: f64,
    pub phase: f64,
}

impl Measurement {
    /// Build a row from values in [`Field::ALL`] order.
    pub fn from_values(values: [f64; 5]) -> Self {
        Self {
            frequency: values[0],
            z_real: values[1],
            z_imag: values[2],
            z_mod: values[3],
            phase: values[4],
        }
    }

    /// Value of the given column.
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Frequency => self.frequency,
            Field::ZReal => self.z_real,
            Field::ZImag => self.z_imag,
            Field::ZMod => self.z_mod,
            Field::Phase => self.phase,
        }
    }

    /// All five values in [`Field::ALL`] order.
    pub fn values(&self) -> [f64; 5] {
        [
            self.frequency,
            self.z_real,
            self.z_imag,
            self.z_mod,
            self.phase,
        ]
    }
}

/// Parsed measurement rows of one export file, in sweep order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementTable {
    pub rows: Vec<Measurement>,
}

impl MeasurementTable {
    pub fn new(rows: Vec<Measurement>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every value of one column, in row order.
    pub fn column(&self, field: Field) -> Vec<f64> {
        self.rows.iter().map(|r| r.get(field)).collect()
    }

    /// Points for a Nyquist plot: `(Z', -Z")`.
    pub fn nyquist_points(&self) -> Vec<(f64, f64)> {
        self.rows.iter().map(|r| (r.z_real, -r.z_imag)).collect()
    }

    /// Points for the magnitude half of a Bode plot: `(log10 f, |Z|)`.
    ///
    /// Rows with a non-positive frequency have no logarithm and are skipped.
    pub fn bode_magnitude_points(&self) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter(|r| r.frequency > 0.0)
            .map(|r| (r.frequency.log10(), r.z_mod))
            .collect()
    }

    /// Points for the phase half of a Bode plot: `(log10 f, phase)`.
    pub fn bode_phase_points(&self) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter(|r| r.frequency > 0.0)
            .map(|r| (r.frequency.log10(), r.phase))
            .collect()
    }
}

/// Preamble lines preceding the data section, the marker line included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderBlock {
    pub lines: Vec<String>,
}

impl HeaderBlock {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// The first [`HEADER_SUMMARY_LINES`] lines joined with newlines.
    pub fn summary(&self) -> String {
        self.lines
            .iter()
            .take(HEADER_SUMMARY_LINES)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A numeric `Name (unit) = value` line from the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderParameter {
    pub name: String,
    pub unit: Option<String>,
    pub value: f64,
}

/// Typed, best-effort view of a [`HeaderBlock`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    /// Acquisition date and time from the first header line.
    pub acquired_at: Option<NaiveDateTime>,
    /// Measurement technique, e.g. `"A.C. Impedance"`.
    pub technique: Option<String>,
    /// `Key: value` lines such as `File` or `Instrument Model`.
    pub fields: BTreeMap<String, String>,
    /// Numeric acquisition parameters in header order.
    pub parameters: Vec<HeaderParameter>,
}

impl HeaderInfo {
    /// Look up a numeric parameter by name, ignoring ASCII case.
    pub fn parameter(&self, name: &str) -> Option<&HeaderParameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Look up a `Key: value` field by key, ignoring ASCII case.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// One labelled value of a [`WideRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideColumn {
    pub label: String,
    pub value: f64,
}

/// A measurement table flattened into a single labelled row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WideRecord {
    /// Columns in field-major, then sweep order.
    pub columns: Vec<WideColumn>,
    /// Source path, attached by the caller after reshaping.
    pub file: Option<String>,
}

impl WideRecord {
    /// Attach the source path as the `file` column.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Column labels in order.
    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    /// Value of the column named `label`, if present.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One row of a [`CombinedTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRow {
    pub file: String,
    /// One slot per table column; `None` marks a missing value.
    pub values: Vec<Option<f64>>,
}

/// Wide records of a whole batch, aligned on a shared column list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedTable {
    /// Value column labels; the `file` column is kept separately on each row.
    pub columns: Vec<String>,
    pub rows: Vec<CombinedRow>,
}

impl CombinedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of value columns, not counting `file`.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Value at `(row, label)`; `None` when the column is absent or the cell is missing.
    pub fn value(&self, row: usize, label: &str) -> Option<f64> {
        let idx = self.column_index(label)?;
        self.rows.get(row).and_then(|r| r.values.get(idx).copied().flatten())
    }

    /// Source paths in row order.
    pub fn files(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.file.as_str()).collect()
    }
}

/// A parsed file ready for charting: its path, header, and measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExport {
    pub path: PathBuf,
    pub header: HeaderBlock,
    pub info: HeaderInfo,
    pub table: MeasurementTable,
}

impl ParsedExport {
    /// File name for titles, falling back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(f: f64, re: f64, im: f64) -> Measurement {
        Measurement::from_values([f, re, im, (re * re + im * im).sqrt(), -10.0])
    }

    #[test]
    fn test_marker_line_matches_column_names() {
        assert_eq!(Field::column_names().join(FIELD_SEPARATOR), MARKER_LINE);
    }

    #[test]
    fn test_measured_fields_exclude_frequency() {
        assert!(!Field::MEASURED.contains(&Field::Frequency));
        assert_eq!(Field::MEASURED.len(), 4);
    }

    #[test]
    fn test_measurement_get_matches_values_order() {
        let m = Measurement::from_values([1.0, 2.0, 3.0, 4.0, 5.0]);
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(m.get(*field), m.values()[i]);
        }
    }

    #[test]
    fn test_nyquist_points_negate_imaginary() {
        let table = MeasurementTable::new(vec![row(1000.0, 10.0, -5.0)]);
        assert_eq!(table.nyquist_points(), vec![(10.0, 5.0)]);
    }

    #[test]
    fn test_bode_points_skip_non_positive_frequency() {
        let table = MeasurementTable::new(vec![row(0.0, 1.0, 1.0), row(100.0, 3.0, 4.0)]);
        let mag = table.bode_magnitude_points();
        assert_eq!(mag.len(), 1);
        assert!((mag[0].0 - 2.0).abs() < 1e-12);
        assert!((mag[0].1 - 5.0).abs() < 1e-12);
        let phase = table.bode_phase_points();
        assert_eq!(phase.len(), 1);
        assert_eq!(phase[0].1, -10.0);
    }

    #[test]
    fn test_header_summary_keeps_eleven_lines() {
        let lines: Vec<String> = (0..15).map(|i| format!("line {i}")).collect();
        let header = HeaderBlock::new(lines);
        let summary = header.summary();
        assert_eq!(summary.lines().count(), HEADER_SUMMARY_LINES);
        assert!(summary.starts_with("line 0\n"));
        assert!(summary.ends_with("line 10"));
    }

    #[test]
    fn test_header_summary_short_block() {
        let header = HeaderBlock::new(vec!["a".into(), "b".into()]);
        assert_eq!(header.summary(), "a\nb");
    }

    #[test]
    fn test_wide_record_with_file_and_lookup() {
        let record = WideRecord {
            columns: vec![WideColumn {
                label: "Z'/ohm_100.0".into(),
                value: 3.5,
            }],
            file: None,
        }
        .with_file("data/11/a.txt");
        assert_eq!(record.file.as_deref(), Some("data/11/a.txt"));
        assert_eq!(record.get("Z'/ohm_100.0"), Some(3.5));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.labels(), vec!["Z'/ohm_100.0"]);
    }

    #[test]
    fn test_combined_table_value_lookup() {
        let table = CombinedTable {
            columns: vec!["a".into(), "b".into()],
            rows: vec![CombinedRow {
                file: "x.txt".into(),
                values: vec![Some(1.0), None],
            }],
        };
        assert_eq!(table.value(0, "a"), Some(1.0));
        assert_eq!(table.value(0, "b"), None);
        assert_eq!(table.value(0, "c"), None);
        assert_eq!(table.value(3, "a"), None);
        assert_eq!(table.files(), vec!["x.txt"]);
    }

    #[test]
    fn test_header_info_case_insensitive_lookups() {
        let mut info = HeaderInfo::default();
        info.fields
            .insert("Instrument Model".into(), "CHI660E".into());
        info.parameters.push(HeaderParameter {
            name: "High Frequency".into(),
            unit: Some("Hz".into()),
            value: 1e5,
        });
        assert_eq!(info.field("instrument model"), Some("CHI660E"));
        assert_eq!(info.parameter("high frequency").map(|p| p.value), Some(1e5));
    }
}
