//! Instrument master index.
//!
//! Turns an arbitrary tabular reference dataset (rows keyed by a-priori-unknown
//! column names) into uniform [`MasterRecord`]s. Column roles are detected from
//! the header; only the security-id column is mandatory.

pub mod columns;

use crate::models::MasterRecord;
use crate::segments;
use columns::{detect_columns, ColumnRole};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MasterIndexError {
    /// No column could be identified for a mandatory role.
    #[error("no {role} column found among [{}]", .available.join(", "))]
    ColumnDetection {
        role: ColumnRole,
        available: Vec<String>,
    },

    #[error("reference table has no columns")]
    EmptyTable,
}

/// Raw reference data: a header plus positional rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReferenceTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Build from `(column, value)` mappings. The header is the union of keys in
    /// first-seen order; missing cells become empty strings.
    pub fn from_mappings<K, V>(mappings: &[Vec<(K, V)>]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut columns: Vec<String> = Vec::new();
        for row in mappings {
            for (k, _) in row {
                if !columns.iter().any(|c| c == k.as_ref()) {
                    columns.push(k.as_ref().to_string());
                }
            }
        }

        let rows = mappings
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|col| {
                        row.iter()
                            .find(|(k, _)| k.as_ref() == col)
                            .map(|(_, v)| v.as_ref().to_string())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parsed, ordered instrument master.
#[derive(Debug, Clone, Default)]
pub struct MasterIndex {
    records: Vec<MasterRecord>,
}

impl MasterIndex {
    /// Parse `table` into records.
    ///
    /// Fails with [`MasterIndexError::ColumnDetection`] when no identifier column
    /// exists. Missing symbol/name/segment columns only degrade matching.
    pub fn build(table: &ReferenceTable) -> Result<Self, MasterIndexError> {
        if table.columns.is_empty() {
            return Err(MasterIndexError::EmptyTable);
        }

        let columns = detect_columns(&table.columns);
        let id_col = columns
            .security_id
            .ok_or_else(|| MasterIndexError::ColumnDetection {
                role: ColumnRole::SecurityId,
                available: table.columns.clone(),
            })?;

        info!(
            "Detected columns: id={} symbol={} name={} segment={} exchange={}",
            describe(&table.columns, Some(id_col)),
            describe(&table.columns, columns.symbol),
            describe(&table.columns, columns.name),
            describe(&table.columns, columns.segment),
            describe(&table.columns, columns.exchange),
        );

        let cell = |row: &[String], col: Option<usize>| -> String {
            col.and_then(|idx| row.get(idx))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let mut records = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let row = row.as_slice();
            let segment = cell(row, columns.segment);
            let exchange = cell(row, columns.exchange);
            let segment_raw = match (columns.segment, columns.exchange) {
                (None, None) => segments::DEFAULT_SEGMENT.to_string(),
                _ => segments::composite(&exchange, &segment),
            };

            records.push(MasterRecord::new(
                &cell(row, columns.symbol),
                &cell(row, columns.name),
                &cell(row, Some(id_col)),
                &segment_raw,
            ));
        }

        let unmatchable = records.iter().filter(|r| !r.is_matchable()).count();
        if unmatchable > 0 {
            debug!("{} reference rows have an empty security id", unmatchable);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[MasterRecord] {
        &self.records
    }

    /// Records that carry a security id, in index order.
    pub fn matchable(&self) -> impl Iterator<Item = &MasterRecord> {
        self.records.iter().filter(|r| r.is_matchable())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn describe(columns: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| columns.get(i))
        .map(|s| s.as_str())
        .unwrap_or("-")
}
