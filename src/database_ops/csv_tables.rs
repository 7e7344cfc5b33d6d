//! Plain CSV exports copied one-to-one into existing tables.
//!
//! Header names are the column names. Values travel as a JSON object through
//! `jsonb_populate_record`, so PostgreSQL does the text → column type coercion.
use std::io;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::database_ops::db::{quote_ident, Db};
use crate::database_ops::load_report::LoadReport;
use crate::error::{IngestError, Result};

/// Tables loaded by `load_csv_dir` when none are named, in dependency order.
pub const DEFAULT_CSV_TABLES: [&str; 3] = ["employees", "customers", "orders"];

/// File `<dir>/<table>_data.csv` holds the rows for `table`.
pub fn csv_path_for(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}_data.csv"))
}

/// Insert every CSV record of `path` into `table`, row by row.
///
/// Unreadable files fail the call. Unparseable records and rows the store
/// rejects are recorded in the report and skipped.
#[instrument(skip(db))]
pub async fn load_csv_table(db: &mut Db, table: &str, path: &Path) -> Result<LoadReport> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::Config(format!(
            "{} has no header row",
            path.display()
        )));
    }

    let stmt = insert_statement(table, &headers);
    let mut report = LoadReport::new(table);
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                report.fail(index, None, format!("unreadable csv record: {e}"));
                continue;
            }
        };
        let outcome = sqlx::query(&stmt)
            .bind(row_object(&headers, &record))
            .persistent(false)
            .execute(db.conn())
            .await
            .map(|_| None);
        report.record(index, record.get(0), outcome);
    }
    info!(
        table,
        inserted = report.inserted.len(),
        failed = report.failures.len(),
        "csv table loaded"
    );
    Ok(report)
}

/// Load `<dir>/<table>_data.csv` into each of `tables`, in the given order.
pub async fn load_csv_dir(db: &mut Db, dir: &Path, tables: &[String]) -> Result<Vec<LoadReport>> {
    let mut reports = Vec::with_capacity(tables.len());
    for table in tables {
        reports.push(load_csv_table(db, table, &csv_path_for(dir, table)).await?);
    }
    Ok(reports)
}

fn insert_statement(table: &str, headers: &[String]) -> String {
    let table = quote_ident(table);
    let columns = headers.iter().map(|h| quote_ident(h)).join(", ");
    format!(
        "INSERT INTO {table} ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1)"
    )
}

// Empty fields become NULL; an empty string can't be coerced into numeric or date columns.
fn row_object(headers: &[String], record: &csv::StringRecord) -> Value {
    let map: Map<String, Value> = headers
        .iter()
        .zip(record.iter())
        .map(|(h, v)| {
            let value = if v.is_empty() {
                Value::Null
            } else {
                Value::String(v.to_string())
            };
            (h.clone(), value)
        })
        .collect();
    Value::Object(map)
}

fn csv_error(path: &Path, err: csv::Error) -> IngestError {
    let source = match err.into_kind() {
        csv::ErrorKind::Io(source) => source,
        other => io::Error::new(io::ErrorKind::InvalidData, format!("{other:?}")),
    };
    IngestError::Io {
        path: path.to_path_buf(),
        source,
    }
}
