//! Drives one supplier ingestion run:
//! decompose → reset `suppliers` → load → link `products`.
//!
//! The run moves through [`PipelineState`] in order and never retries. When a
//! step fails, the error carries the last state reached; re-running the whole
//! pipeline is the recovery path (provisioning is a destructive reset).
use std::fmt;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::database_ops::backfill::{link_products_to_suppliers, BackfillSummary, PRODUCTS_TABLE};
use crate::database_ops::db::Db;
use crate::database_ops::load_report::LoadReport;
use crate::database_ops::schema::reset_suppliers_table;
use crate::database_ops::suppliers::insert_suppliers;
use crate::error::{IngestError, Phase};
use crate::normalization::supplier::{
    decompose_all, decompose_values, read_supplier_file, Decomposed, RawSupplierRecord,
    SkippedRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Unprovisioned,
    Provisioned,
    Loaded,
    /// Terminal.
    Linked,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Unprovisioned => "unprovisioned",
            PipelineState::Provisioned => "provisioned",
            PipelineState::Loaded => "loaded",
            PipelineState::Linked => "linked",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Run the products backfill after loading.
    pub backfill: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { backfill: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackfillOutcome {
    Linked(BackfillSummary),
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: PipelineState,
    /// Input records the decomposer rejected.
    pub skipped: Vec<SkippedRecord>,
    pub load: LoadReport,
    pub backfill: BackfillOutcome,
}

#[derive(Debug, Error)]
#[error("supplier pipeline stopped after reaching `{state}`: {source}")]
pub struct PipelineError {
    /// Last state the run reached before failing.
    pub state: PipelineState,
    #[source]
    pub source: IngestError,
}

impl PipelineError {
    fn at(state: PipelineState) -> impl FnOnce(IngestError) -> Self {
        move |source| {
            error!(state = %state, error = %source, "supplier pipeline failed");
            PipelineError { state, source }
        }
    }
}

/// Read the supplier export at `path` and run the pipeline over it.
pub async fn run_supplier_file(
    db: &mut Db,
    path: &Path,
    opts: PipelineOptions,
) -> Result<RunReport, PipelineError> {
    let values = read_supplier_file(path).map_err(PipelineError::at(PipelineState::Unprovisioned))?;
    info!(file = %path.display(), records = values.len(), "supplier file read");
    run_decomposed(db, decompose_values(&values), opts).await
}

pub async fn run_supplier_pipeline(
    db: &mut Db,
    records: &[RawSupplierRecord],
    opts: PipelineOptions,
) -> Result<RunReport, PipelineError> {
    run_decomposed(db, decompose_all(records), opts).await
}

async fn run_decomposed(
    db: &mut Db,
    decomposed: Decomposed,
    opts: PipelineOptions,
) -> Result<RunReport, PipelineError> {
    info!(
        suppliers = decomposed.suppliers.len(),
        skipped = decomposed.skipped.len(),
        "supplier records decomposed"
    );

    let mut state = PipelineState::Unprovisioned;

    reset_suppliers_table(db)
        .await
        .map_err(PipelineError::at(state))?;
    state = PipelineState::Provisioned;
    info!(state = %state, "suppliers table provisioned");

    let load = insert_suppliers(db, &decomposed.suppliers).await;
    state = PipelineState::Loaded;

    let backfill = if !opts.backfill {
        BackfillOutcome::Skipped {
            reason: "backfill disabled".to_string(),
        }
    } else if !db
        .table_exists(PRODUCTS_TABLE)
        .await
        .map_err(|e| PipelineError::at(state)(IngestError::store(Phase::Backfill)(e)))?
    {
        warn!(
            table = PRODUCTS_TABLE,
            "products table not provisioned; leaving suppliers unlinked"
        );
        BackfillOutcome::Skipped {
            reason: format!("table `{PRODUCTS_TABLE}` does not exist"),
        }
    } else {
        let summary = link_products_to_suppliers(db)
            .await
            .map_err(PipelineError::at(state))?;
        state = PipelineState::Linked;
        BackfillOutcome::Linked(summary)
    };

    info!(state = %state, "supplier pipeline finished");
    Ok(RunReport {
        state,
        skipped: decomposed.skipped,
        load,
        backfill,
    })
}
