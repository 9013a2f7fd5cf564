//! Wide-label reshaping of measurement tables.
//!
//! A table is melted into `(frequency, field, value)` triples with frequency
//! as the key, each triple is labelled `<field>_<frequency>`, and the labels
//! become the columns of a single row.

use std::collections::HashMap;
use std::path::Path;

use eis_core::error::{EisError, Result};
use eis_core::formatting::format_float;
use eis_core::models::{Field, MeasurementTable, WideColumn, WideRecord};

/// One cell of a melted table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeltedValue {
    pub frequency: f64,
    pub field: Field,
    pub value: f64,
}

/// Long form of `table`: field-major in [`Field::MEASURED`] order, then row order.
pub fn melt(table: &MeasurementTable) -> Vec<MeltedValue> {
    Field::MEASURED
        .iter()
        .flat_map(|&field| {
            table.rows.iter().map(move |row| MeltedValue {
                frequency: row.frequency,
                field,
                value: row.get(field),
            })
        })
        .collect()
}

/// Column label for one field at one frequency, e.g. `Z'/ohm_100000.0`.
pub fn wide_label(field: Field, frequency: f64) -> String {
    format!("{}_{}", field.column_name(), format_float(frequency))
}

/// Flatten `table` into a single-row [`WideRecord`] without a `file` value.
/// `path` names the source file in errors.
///
/// Fails with [`EisError::DuplicateFrequency`] when two rows would produce the
/// same label; frequencies must be unique within a file.
pub fn reshape(path: &Path, table: &MeasurementTable) -> Result<WideRecord> {
    ensure_unique_frequencies(path, table)?;

    let columns = melt(table)
        .into_iter()
        .map(|m| WideColumn {
            label: wide_label(m.field, m.frequency),
            value: m.value,
        })
        .collect();

    Ok(WideRecord {
        columns,
        file: None,
    })
}

/// Labels collide for every field at once, so checking the rendered frequency
/// text of the first measured field is enough.
fn ensure_unique_frequencies(path: &Path, table: &MeasurementTable) -> Result<()> {
    let first_field = Field::MEASURED[0];
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(table.len());

    for (idx, row) in table.rows.iter().enumerate() {
        let label = wide_label(first_field, row.frequency);
        if let Some(&first_row) = seen.get(&label) {
            return Err(EisError::DuplicateFrequency {
                path: path.to_path_buf(),
                label,
                first_row,
                second_row: idx,
            });
        }
        seen.insert(label, idx);
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use eis_core::models::Measurement;

    const SOURCE: &str = "data/11/a.txt";

    fn flatten(table: &MeasurementTable) -> Result<WideRecord> {
        reshape(Path::new(SOURCE), table)
    }

    fn table(freqs: &[f64]) -> MeasurementTable {
        MeasurementTable::new(
            freqs
                .iter()
                .enumerate()
                .map(|(i, &f)| {
                    let i = i as f64;
                    Measurement::from_values([f, 100.0 + i, -10.0 - i, 101.0 + i, -5.0 - i])
                })
                .collect(),
        )
    }

    #[test]
    fn test_wide_label_format() {
        assert_eq!(wide_label(Field::ZReal, 100000.0), "Z'/ohm_100000.0");
        assert_eq!(wide_label(Field::ZImag, 0.1), "Z\"/ohm_0.1");
        assert_eq!(wide_label(Field::Phase, 0.00001), "Phase/deg_1e-05");
    }

    #[test]
    fn test_melt_is_field_major() {
        let melted = melt(&table(&[100.0, 10.0]));
        assert_eq!(melted.len(), 8);
        let fields: Vec<Field> = melted.iter().map(|m| m.field).collect();
        assert_eq!(
            fields,
            vec![
                Field::ZReal,
                Field::ZReal,
                Field::ZImag,
                Field::ZImag,
                Field::ZMod,
                Field::ZMod,
                Field::Phase,
                Field::Phase
            ]
        );
        assert_eq!(melted[1].frequency, 10.0);
    }

    #[test]
    fn test_reshape_column_order() {
        let record = flatten(&table(&[1000.0, 100.0])).unwrap();
        assert_eq!(
            record.labels(),
            vec![
                "Z'/ohm_1000.0",
                "Z'/ohm_100.0",
                "Z\"/ohm_1000.0",
                "Z\"/ohm_100.0",
                "Z/ohm_1000.0",
                "Z/ohm_100.0",
                "Phase/deg_1000.0",
                "Phase/deg_100.0",
            ]
        );
        assert!(record.file.is_none());
    }

    #[test]
    fn test_reshape_is_bijective_on_content() {
        let source = table(&[100000.0, 10000.0, 1000.0]);
        let record = flatten(&source).unwrap();

        assert_eq!(record.len(), source.len() * Field::MEASURED.len());
        for row in &source.rows {
            for field in Field::MEASURED {
                let label = wide_label(field, row.frequency);
                let matches = record.columns.iter().filter(|c| c.label == label).count();
                assert_eq!(matches, 1, "{label}");
                assert_eq!(record.get(&label), Some(row.get(field)));
            }
        }
    }

    #[test]
    fn test_reshape_duplicate_frequency_fails() {
        let err = flatten(&table(&[1000.0, 100.0, 1000.0])).unwrap_err();
        assert!(err.to_string().starts_with("data/11/a.txt: "), "{err}");
        match err {
            EisError::DuplicateFrequency {
                path,
                label,
                first_row,
                second_row,
            } => {
                assert_eq!(path, Path::new(SOURCE));
                assert_eq!(label, "Z'/ohm_1000.0");
                assert_eq!(first_row, 0);
                assert_eq!(second_row, 2);
            }
            other => panic!("expected DuplicateFrequency, got {other:?}"),
        }
    }

    #[test]
    fn test_reshape_empty_table_gives_empty_record() {
        let record = flatten(&MeasurementTable::default()).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_reshape_with_file() {
        let record = flatten(&table(&[1.0])).unwrap().with_file(SOURCE);
        assert_eq!(record.file.as_deref(), Some(SOURCE));
    }
}
