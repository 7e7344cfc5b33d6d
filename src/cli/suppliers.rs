use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::database_ops::db::Db;
use crate::orchestrator::{run_supplier_file, PipelineOptions};
use crate::util::env as env_util;

#[derive(Debug, Clone, Default)]
pub struct SupplierIngestConfig {
    /// Optional override for the Postgres connection string.
    pub database_url: Option<String>,
    pub schema: Option<String>,
    /// JSON array of supplier records.
    pub file: PathBuf,
    pub skip_backfill: bool,
}

pub async fn run(cfg: SupplierIngestConfig) -> Result<()> {
    env_util::init_env();
    let params = super::connection_params(cfg.database_url.clone(), cfg.schema.clone());
    let mut db = Db::connect(&params)
        .await
        .context("failed to connect to database")?;

    let opts = PipelineOptions {
        backfill: !cfg.skip_backfill,
    };
    let outcome = run_supplier_file(&mut db, &cfg.file, opts).await;
    db.close().await;
    let report = outcome.with_context(|| format!("ingesting {}", cfg.file.display()))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(
        state = %report.state,
        skipped = report.skipped.len(),
        load_failures = report.load.failures.len(),
        "suppliers done"
    );
    Ok(())
}
