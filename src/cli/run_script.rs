use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::database_ops::db::Db;
use crate::database_ops::script::run_sql_script;
use crate::util::env as env_util;

#[derive(Debug, Clone, Default)]
pub struct RunScriptConfig {
    pub database_url: Option<String>,
    pub schema: Option<String>,
    pub scripts: Vec<PathBuf>,
}

/// Run each script in order; the first failure stops the rest.
pub async fn run(cfg: RunScriptConfig) -> Result<()> {
    env_util::init_env();
    let params = super::connection_params(cfg.database_url.clone(), cfg.schema.clone());
    let mut db = Db::connect(&params)
        .await
        .context("failed to connect to database")?;

    let mut outcome = Ok(());
    for script in &cfg.scripts {
        outcome = run_sql_script(&mut db, script)
            .await
            .with_context(|| format!("running {}", script.display()));
        if outcome.is_err() {
            break;
        }
    }
    db.close().await;
    outcome
}
