use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::database_ops::csv_tables::{load_csv_dir, DEFAULT_CSV_TABLES};
use crate::database_ops::db::Db;
use crate::util::env as env_util;

#[derive(Debug, Clone, Default)]
pub struct CsvImportConfig {
    pub database_url: Option<String>,
    pub schema: Option<String>,
    /// Directory holding `<table>_data.csv` files.
    pub dir: PathBuf,
    /// Tables to load, in order. Defaults to employees, customers, orders.
    pub tables: Option<Vec<String>>,
}

pub async fn run(cfg: CsvImportConfig) -> Result<()> {
    env_util::init_env();
    let tables = cfg
        .tables
        .clone()
        .unwrap_or_else(|| DEFAULT_CSV_TABLES.iter().map(|t| t.to_string()).collect());

    let params = super::connection_params(cfg.database_url.clone(), cfg.schema.clone());
    let mut db = Db::connect(&params)
        .await
        .context("failed to connect to database")?;
    let outcome = load_csv_dir(&mut db, &cfg.dir, &tables).await;
    db.close().await;
    let reports = outcome.with_context(|| format!("loading csv files from {}", cfg.dir.display()))?;

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
