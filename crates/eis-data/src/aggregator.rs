//! Folding wide records into one combined batch table.
//!
//! Records arrive one per file, in scan order. Their column sets differ
//! whenever the frequency sweeps differ, so every push has to reconcile the
//! incoming labels with the columns accumulated so far.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use eis_core::error::EisError;
use eis_core::models::{CombinedRow, CombinedTable, WideRecord};
use tracing::{debug, warn};

// ── AggregationPolicy ─────────────────────────────────────────────────────────

/// How columns missing from some records are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationPolicy {
    /// After every push, drop each column with a missing (or NaN) value in
    /// any row so far. Order-dependent: a column absent from record 2 stays
    /// gone even if record 3 carries it again.
    Intersect,
    /// Keep the full outer union of columns in first-appearance order and
    /// leave absent cells empty.
    #[default]
    Union,
}

impl AggregationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationPolicy::Intersect => "intersect",
            AggregationPolicy::Union => "union",
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = EisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intersect" => Ok(AggregationPolicy::Intersect),
            "union" => Ok(AggregationPolicy::Union),
            other => Err(EisError::Config(format!(
                "unknown aggregation policy: {other}"
            ))),
        }
    }
}

// ── PushOutcome ───────────────────────────────────────────────────────────────

/// What a single [`BatchAggregator::push`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// Columns introduced by the pushed record.
    pub added: usize,
    /// Columns removed by the intersect policy, in their former order.
    pub dropped: Vec<String>,
}

// ── BatchAggregator ───────────────────────────────────────────────────────────

/// Running combined table for one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchAggregator {
    policy: AggregationPolicy,
    table: CombinedTable,
    dropped_total: usize,
}

impl BatchAggregator {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self {
            policy,
            table: CombinedTable::new(),
            dropped_total: 0,
        }
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// The table accumulated so far.
    pub fn table(&self) -> &CombinedTable {
        &self.table
    }

    /// Columns dropped across all pushes.
    pub fn dropped_total(&self) -> usize {
        self.dropped_total
    }

    /// Append `record` as a new row and reconcile columns per the policy.
    pub fn push(&mut self, record: WideRecord) -> PushOutcome {
        let file = record.file.clone().unwrap_or_default();
        let incoming: HashMap<&str, f64> = record
            .columns
            .iter()
            .map(|c| (c.label.as_str(), c.value))
            .collect();

        // Align the new row with the existing columns.
        let mut values: Vec<Option<f64>> = self
            .table
            .columns
            .iter()
            .map(|label| incoming.get(label.as_str()).copied())
            .collect();

        // New labels extend every earlier row with a missing cell.
        let mut known: HashSet<String> = self.table.columns.iter().cloned().collect();
        let mut added = 0;
        for column in &record.columns {
            if known.insert(column.label.clone()) {
                self.table.columns.push(column.label.clone());
                for row in &mut self.table.rows {
                    row.values.push(None);
                }
                values.push(Some(column.value));
                added += 1;
            }
        }

        self.table.rows.push(CombinedRow { file, values });

        let dropped = match self.policy {
            AggregationPolicy::Intersect => self.drop_incomplete_columns(),
            AggregationPolicy::Union => Vec::new(),
        };
        self.dropped_total += dropped.len();

        let file = &self.table.rows[self.table.rows.len() - 1].file;
        if dropped.is_empty() {
            debug!(
                "Aggregated {}: +{} columns, {} total",
                file,
                added,
                self.table.column_count()
            );
        } else {
            warn!(
                "Aggregating {} dropped {} columns not shared by every file ({} remain)",
                file,
                dropped.len(),
                self.table.column_count()
            );
        }

        PushOutcome { added, dropped }
    }

    /// Finalise the batch.
    pub fn finish(self) -> CombinedTable {
        self.table
    }

    /// Remove every column holding a missing or NaN value in any row.
    fn drop_incomplete_columns(&mut self) -> Vec<String> {
        let keep: Vec<bool> = (0..self.table.columns.len())
            .map(|idx| {
                self.table.rows.iter().all(|row| {
                    matches!(row.values.get(idx), Some(Some(v)) if !v.is_nan())
                })
            })
            .collect();

        if keep.iter().all(|&k| k) {
            return Vec::new();
        }

        let mut dropped = Vec::new();
        let mut columns = Vec::with_capacity(self.table.columns.len());
        for (label, &k) in self.table.columns.drain(..).zip(&keep) {
            if k {
                columns.push(label);
            } else {
                dropped.push(label);
            }
        }
        self.table.columns = columns;

        for row in &mut self.table.rows {
            row.values = row
                .values
                .iter()
                .zip(&keep)
                .filter(|(_, &k)| k)
                .map(|(v, _)| *v)
                .collect();
        }

        dropped
    }
}

/// Fold a whole batch of records, in order, into one table.
pub fn fold_records<I>(records: I, policy: AggregationPolicy) -> CombinedTable
where
    I: IntoIterator<Item = WideRecord>,
{
    let mut aggregator = BatchAggregator::new(policy);
    for record in records {
        aggregator.push(record);
    }
    aggregator.finish()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
