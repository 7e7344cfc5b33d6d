use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::database_ops::db::Db;
use crate::database_ops::script::run_sql_script;
use crate::util::env as env_util;

#[derive(Debug, Clone, Default)]
pub struct ResetDbConfig {
    /// Connection used to issue DROP/CREATE DATABASE; must not point at `database`.
    pub database_url: Option<String>,
    /// Database to drop and create.
    pub database: String,
    /// Seed scripts run against the fresh database, in order.
    pub scripts: Vec<PathBuf>,
    /// Must be set; the reset destroys every object in `database`.
    pub confirm: bool,
}

pub async fn run(cfg: ResetDbConfig) -> Result<()> {
    env_util::init_env();
    if !cfg.confirm {
        bail!(
            "refusing to drop database {}; pass --yes to proceed",
            cfg.database
        );
    }

    let params = super::connection_params(cfg.database_url.clone(), None);
    let admin = Db::connect(&params)
        .await
        .context("failed to connect to maintenance database")?;
    if admin.database() == Some(cfg.database.as_str()) {
        admin.close().await;
        bail!(
            "connected to {} itself; point --db-url at another database (e.g. postgres)",
            cfg.database
        );
    }

    let mut db = admin
        .recreate_database(&cfg.database)
        .await
        .with_context(|| format!("recreating database {}", cfg.database))?;

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
    outcome?;
    info!(database = %cfg.database, scripts = cfg.scripts.len(), "database reset done");
    Ok(())
}
