use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, instrument};

use crate::database_ops::db::Db;
use crate::error::{IngestError, Phase, Result};

/// Execute every statement of an SQL file as one simple-query batch.
///
/// A missing file is [`IngestError::ScriptNotFound`]; anything the server
/// rejects is a store failure. The server runs the batch as one implicit
/// transaction, so a failing statement rolls back the whole script.
#[instrument(skip(db))]
pub async fn run_sql_script(db: &mut Db, path: &Path) -> Result<()> {
    let script = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => IngestError::ScriptNotFound {
            path: path.to_path_buf(),
        },
        _ => IngestError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    if script.trim().is_empty() {
        info!(script = %path.display(), "script is empty; nothing to run");
        return Ok(());
    }

    sqlx::raw_sql(&script)
        .execute(db.conn())
        .await
        .map_err(IngestError::store(Phase::Script))?;
    info!(script = %path.display(), "script executed");
    Ok(())
}
