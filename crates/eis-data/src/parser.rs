//! Instrument export parsing.
//!
//! An export is a free-form preamble, the fixed column marker line, one
//! disposable units/echo row and then comma-space separated numeric rows.
//! Lines are classified by a small state machine folded over the file:
//!
//! ```text
//! Preamble --marker--> Echo --any line--> Data
//! ```

use std::path::{Path, PathBuf};

use eis_core::error::{EisError, Result};
use eis_core::models::{
    Field, HeaderBlock, Measurement, MeasurementTable, ParsedExport, FIELD_SEPARATOR, MARKER_LINE,
};
use tracing::{debug, trace};

use crate::header::parse_header_info;

// ── Public API ────────────────────────────────────────────────────────────────

/// Read and parse one export file.
///
/// The file is read once, fully into memory. Bytes that are not valid UTF-8
/// are replaced rather than rejected, since preambles written by older
/// instrument software are not always UTF-8 clean.
pub fn parse_file(path: &Path) -> Result<(MeasurementTable, HeaderBlock)> {
    let bytes = std::fs::read(path).map_err(|source| EisError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    parse_lines(path, text.lines())
}

/// Parse already-loaded lines. `path` is only used in error messages.
pub fn parse_lines<'a, I>(path: &Path, lines: I) -> Result<(MeasurementTable, HeaderBlock)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut state = ParseState::new(path);
    for (idx, raw) in lines.into_iter().enumerate() {
        state.step(idx + 1, raw.trim())?;
    }
    state.finish()
}

/// Parse a file and derive its typed header metadata, for chart consumers.
pub fn load_export(path: &Path) -> Result<ParsedExport> {
    let (table, header) = parse_file(path)?;
    let info = parse_header_info(&header);
    Ok(ParsedExport {
        path: path.to_path_buf(),
        header,
        info,
        table,
    })
}

// ── State machine ─────────────────────────────────────────────────────────────

/// Where the parser currently is within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Before the marker line; lines are header metadata.
    Preamble,
    /// Directly after the marker; the next line is the units echo row.
    Echo,
    /// Measurement rows.
    Data,
}

struct ParseState {
    path: PathBuf,
    section: Section,
    header: Vec<String>,
    rows: Vec<Measurement>,
    /// First blank line seen in the data section. Only trailing blanks are
    /// allowed, so a data row after it is a field-count error.
    pending_blank: Option<usize>,
}

impl ParseState {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            section: Section::Preamble,
            header: Vec::new(),
            rows: Vec::new(),
            pending_blank: None,
        }
    }

    /// Classify one trimmed line. `line_no` is 1-based.
    fn step(&mut self, line_no: usize, line: &str) -> Result<()> {
        // The marker always lands in the header, wherever it appears.
        if line == MARKER_LINE {
            self.header.push(line.to_string());
            if self.section == Section::Preamble {
                self.section = Section::Echo;
            }
            return Ok(());
        }

        match self.section {
            Section::Preamble => self.header.push(line.to_string()),
            Section::Echo => {
                trace!(line = line_no, "dropping units echo row");
                self.section = Section::Data;
            }
            Section::Data if line.is_empty() => {
                self.pending_blank.get_or_insert(line_no);
            }
            Section::Data => {
                if let Some(blank) = self.pending_blank {
                    return Err(EisError::FieldCount {
                        path: self.path.clone(),
                        line: blank,
                        found: 1,
                    });
                }
                let row = parse_data_line(&self.path, line_no, line)?;
                self.rows.push(row);
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<(MeasurementTable, HeaderBlock)> {
        if self.section == Section::Preamble {
            return Err(EisError::MarkerNotFound { path: self.path });
        }
        if self.rows.is_empty() {
            return Err(EisError::EmptyTable { path: self.path });
        }

        debug!(
            "Parsed {}: {} header lines, {} rows",
            self.path.display(),
            self.header.len(),
            self.rows.len()
        );

        Ok((
            MeasurementTable::new(self.rows),
            HeaderBlock::new(self.header),
        ))
    }
}

/// Split a data line into the five fixed fields and parse each as `f64`.
fn parse_data_line(path: &Path, line_no: usize, line: &str) -> Result<Measurement> {
    let tokens: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if tokens.len() != Field::ALL.len() {
        return Err(EisError::FieldCount {
            path: path.to_path_buf(),
            line: line_no,
            found: tokens.len(),
        });
    }

    let mut values = [0.0_f64; 5];
    for (i, (token, field)) in tokens.iter().zip(Field::ALL).enumerate() {
        let token = token.trim();
        values[i] = token.parse::<f64>().map_err(|_| EisError::NonNumeric {
            path: path.to_path_buf(),
            line: line_no,
            field: i + 1,
            column: field.column_name().to_string(),
            value: token.to_string(),
        })?;
    }

    Ok(Measurement::from_values(values))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use eis_core::models::HEADER_SUMMARY_LINES;
    use std::io::Write;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const PREAMBLE: &[&str] = &[
        "Nov. 8, 2023   16:05:41",
        "A.C. Impedance",
        "File: C:\\data\\cell_11.bin",
        "Data Source: Experiment",
        "Instrument Model:  CHI660E",
        "Header:",
        "Note:",
        "",
        "Init E (V) = 0",
        "High Frequency (Hz) = 1e+5",
        "Low Frequency (Hz) = 1000",
        "Amplitude (V) = 0.005",
        "Quiet Time (sec) = 2",
        "",
    ];

    const ROWS: &[&str] = &[
        "1.000e+5, 2.093e+2, -1.186e+1, 2.096e+2, -3.24",
        "1.000e+4, 2.150e+2, -4.012e+1, 2.187e+2, -10.57",
        "1.000e+3, 2.871e+2, -1.623e+2, 3.298e+2, -29.48",
    ];

    /// Scenario-A style export: preamble, marker, echo row, `rows`.
    fn export_text(rows: &[&str]) -> String {
        let mut lines: Vec<&str> = PREAMBLE.to_vec();
        lines.push(MARKER_LINE);
        lines.push("");
        lines.extend_from_slice(rows);
        lines.join("\n") + "\n"
    }

    fn write_export(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path
    }

    fn parse_text(text: &str) -> Result<(MeasurementTable, HeaderBlock)> {
        parse_lines(Path::new("test.txt"), text.lines())
    }

    // ── Happy path ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_three_rows_after_echo() {
        let (table, _) = parse_text(&export_text(ROWS)).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0].frequency, 100000.0);
        assert_eq!(table.rows[0].z_real, 209.3);
        assert_eq!(table.rows[0].z_imag, -11.86);
        assert_eq!(table.rows[0].phase, -3.24);
        assert_eq!(
            table.column(Field::Frequency),
            vec![100000.0, 10000.0, 1000.0]
        );
    }

    #[test]
    fn test_echo_row_dropped_even_when_numeric() {
        // The first line after the marker is discarded whatever it holds.
        let mut rows = vec!["9.9, 9.9, 9.9, 9.9, 9.9"];
        rows.extend_from_slice(ROWS);
        let text = [MARKER_LINE].join("\n") + "\n" + &rows.join("\n");

        let (table, _) = parse_text(&text).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0].frequency, 100000.0);
    }

    #[test]
    fn test_echo_row_may_be_units_text() {
        let text = format!(
            "{}\nHz, ohm, ohm, ohm, deg\n{}",
            MARKER_LINE,
            ROWS.join("\n")
        );
        let (table, _) = parse_text(&text).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_row_count_is_data_lines_minus_one() {
        let text = format!("{}\n{}", MARKER_LINE, ROWS.join("\n"));
        let (table, _) = parse_text(&text).unwrap();
        // The first of the three lines acts as the echo row.
        assert_eq!(table.len(), ROWS.len() - 1);
        assert_eq!(table.rows[0].frequency, 10000.0);
    }

    #[test]
    fn test_header_collects_preamble_and_marker() {
        let (_, header) = parse_text(&export_text(ROWS)).unwrap();
        assert_eq!(header.lines.len(), PREAMBLE.len() + 1);
        assert_eq!(header.lines.last().map(String::as_str), Some(MARKER_LINE));
        assert_eq!(header.lines[0], "Nov. 8, 2023   16:05:41");
    }

    #[test]
    fn test_header_summary_is_first_eleven_lines() {
        let (_, header) = parse_text(&export_text(ROWS)).unwrap();
        let expected = PREAMBLE[..HEADER_SUMMARY_LINES].join("\n");
        assert_eq!(header.summary(), expected);
    }

    #[test]
    fn test_lines_are_trimmed() {
        let text = format!(
            "   preamble   \n  {}  \n\n  {}  \n",
            MARKER_LINE, ROWS[0]
        );
        let (table, header) = parse_text(&text).unwrap();
        assert_eq!(header.lines[0], "preamble");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_trailing_blank_lines_at_eof_allowed() {
        let text = export_text(ROWS) + "\n\n";
        let (table, _) = parse_text(&text).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_repeated_marker_goes_to_header() {
        let text = format!(
            "{m}\n\n{r0}\n{m}\n{r1}",
            m = MARKER_LINE,
            r0 = ROWS[0],
            r1 = ROWS[1]
        );
        let (table, header) = parse_text(&text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(header.lines, vec![MARKER_LINE, MARKER_LINE]);
    }

    #[test]
    fn test_windows_line_endings() {
        let text = export_text(ROWS).replace('\n', "\r\n");
        let (table, _) = parse_text(&text).unwrap();
        assert_eq!(table.len(), 3);
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    #[test]
    fn test_missing_marker_is_error_not_empty_table() {
        let text = PREAMBLE.join("\n") + "\n" + &ROWS.join("\n");
        let err = parse_text(&text).unwrap_err();
        assert!(matches!(err, EisError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_marker_without_rows_is_empty_table_error() {
        let text = format!("{}\n\n", MARKER_LINE);
        let err = parse_text(&text).unwrap_err();
        assert!(matches!(err, EisError::EmptyTable { .. }));
    }

    #[test]
    fn test_marker_with_only_echo_row_is_empty_table_error() {
        let text = format!("{}\n{}", MARKER_LINE, ROWS[0]);
        assert!(matches!(
            parse_text(&text),
            Err(EisError::EmptyTable { .. })
        ));
    }

    #[test]
    fn test_field_count_mismatch_names_line() {
        let text = format!("{}\n\n{}\n1.0, 2.0, 3.0", MARKER_LINE, ROWS[0]);
        match parse_text(&text) {
            Err(EisError::FieldCount { line, found, .. }) => {
                assert_eq!(line, 4);
                assert_eq!(found, 3);
            }
            other => panic!("expected FieldCount, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_line_between_data_rows_is_field_count_error() {
        let text = format!(
            "{}\n\n1.0, 2.0, 3.0, 4.0, 5.0\n\n2.0, 2.0, 3.0, 4.0, 5.0",
            MARKER_LINE
        );
        match parse_text(&text) {
            Err(EisError::FieldCount { line, found, .. }) => {
                assert_eq!(line, 4);
                assert_eq!(found, 1);
            }
            other => panic!("expected FieldCount, got {:?}", other),
        }
    }

    #[test]
    fn test_comma_without_space_is_field_count_error() {
        let text = format!("{}\n\n1.0,2.0,3.0,4.0,5.0", MARKER_LINE);
        assert!(matches!(
            parse_text(&text),
            Err(EisError::FieldCount { found: 1, .. })
        ));
    }

    #[test]
    fn test_non_numeric_field_names_field_and_column() {
        let text = format!("{}\n\n1.0, 2.0, abc, 4.0, 5.0", MARKER_LINE);
        match parse_text(&text) {
            Err(EisError::NonNumeric {
                line,
                field,
                column,
                value,
                ..
            }) => {
                assert_eq!(line, 3);
                assert_eq!(field, 3);
                assert_eq!(column, "Z\"/ohm");
                assert_eq!(value, "abc");
            }
            other => panic!("expected NonNumeric, got {:?}", other),
        }
    }

    // ── Files ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_file_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_export(dir.path(), "cell.txt", &export_text(ROWS));

        let first = parse_file(&path).unwrap();
        let second = parse_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.0.len(), second.0.len());
    }

    #[test]
    fn test_parse_file_units_echo_row_with_preamble() {
        let mut lines: Vec<&str> = PREAMBLE.to_vec();
        lines.push(MARKER_LINE);
        lines.push("Hz, ohm, ohm, ohm, deg");
        lines.extend_from_slice(ROWS);

        let dir = TempDir::new().unwrap();
        let path = write_export(dir.path(), "cell_11.txt", &(lines.join("\n") + "\n"));
        let (table, header) = parse_file(&path).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0].frequency, 100000.0);
        assert_eq!(table.rows[0].z_mod, 209.6);
        assert_eq!(table.rows[2].frequency, 1000.0);
        assert_eq!(table.rows[2].phase, -29.48);
        assert_eq!(header.lines.len(), PREAMBLE.len() + 1);
        assert!(!header.lines.iter().any(|l| l.starts_with("Hz")));
    }

    #[test]
    fn test_parse_file_missing_is_file_read_error() {
        let err = parse_file(Path::new("/tmp/does-not-exist-eis-parse.txt")).unwrap_err();
        assert!(matches!(err, EisError::FileRead { .. }));
    }

    #[test]
    fn test_parse_file_tolerates_invalid_utf8_in_preamble() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.txt");
        let mut bytes = b"Temp \xb0C\n".to_vec();
        bytes.extend_from_slice(export_text(ROWS).as_bytes());
        std::fs::write(&path, bytes).unwrap();

        let (table, _) = parse_file(&path).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_load_export_attaches_header_info() {
        let dir = TempDir::new().unwrap();
        let path = write_export(dir.path(), "cell.txt", &export_text(ROWS));

        let export = load_export(&path).unwrap();
        assert_eq!(export.display_name(), "cell.txt");
        assert_eq!(export.table.len(), 3);
        assert_eq!(export.info.technique.as_deref(), Some("A.C. Impedance"));
        assert_eq!(
            export.info.parameter("Low Frequency").map(|p| p.value),
            Some(1000.0)
        );
    }
}
