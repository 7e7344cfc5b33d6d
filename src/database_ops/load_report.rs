use serde::Serialize;
use tracing::warn;

use crate::error::{IngestError, Phase};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertedRow {
    /// Position of the row in the input batch.
    pub index: usize,
    /// Generated key, when the target table has one.
    pub id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub index: usize,
    /// Something a human can find the row by (company name, first CSV field).
    pub label: Option<String>,
    pub reason: String,
}

/// Per-row outcome of a row-at-a-time load. A failed row never stops the
/// rows after it; every failure ends up here and in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub inserted: Vec<InsertedRow>,
    pub failures: Vec<RowFailure>,
}

impl LoadReport {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }

    pub fn record(
        &mut self,
        index: usize,
        label: Option<&str>,
        outcome: Result<Option<i32>, sqlx::Error>,
    ) {
        match outcome {
            Ok(id) => self.inserted.push(InsertedRow { index, id }),
            Err(source) => {
                let err = IngestError::store(Phase::Load)(source);
                self.fail(index, label, err.to_string());
            }
        }
    }

    pub fn fail(&mut self, index: usize, label: Option<&str>, reason: String) {
        warn!(
            table = %self.table,
            index,
            label = label.unwrap_or("<none>"),
            error = %reason,
            "row not loaded"
        );
        self.failures.push(RowFailure {
            index,
            label: label.map(str::to_string),
            reason,
        });
    }

    pub fn attempted(&self) -> usize {
        self.inserted.len() + self.failures.len()
    }

    /// Generated ids in insertion order.
    pub fn ids(&self) -> Vec<i32> {
        self.inserted.iter().filter_map(|r| r.id).collect()
    }
}
