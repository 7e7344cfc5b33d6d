use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use tracing::{info, instrument, warn};

use crate::error::{IngestError, Phase, Result};
use crate::util::env::{env_flag, ConnectionParams};

/// One database session shared by every step of a run.
///
/// Statements run in auto-commit mode: each one is durable on its own and a
/// later failure never rolls back earlier work. Hand the handle around by
/// `&mut` and call [`Db::close`] when done; dropping it also closes the socket.
pub struct Db {
    conn: PgConnection,
    options: PgConnectOptions,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(params))]
    pub async fn connect(params: &ConnectionParams) -> Result<Self> {
        let mut db = Self::connect_with(params.connect_options()?).await?;
        if let Some(schema) = &params.schema {
            db.set_search_path(schema).await?;
        }
        Ok(db)
    }

    async fn connect_with(options: PgConnectOptions) -> Result<Self> {
        let mut options = options.application_name("northwind-loader");
        if !env_flag("USE_PREPARED", false) {
            // PgBouncer txn mode safe
            options = options.statement_cache_capacity(0);
        }
        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(IngestError::store(Phase::Connect))?;
        info!(
            host = options.get_host(),
            database = options.get_database().unwrap_or("<default>"),
            "connected to db"
        );
        Ok(Self { conn, options })
    }

    /// The underlying session, for statements outside the pipeline steps.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.conn
    }

    pub fn database(&self) -> Option<&str> {
        self.options.get_database()
    }

    pub async fn set_search_path(&mut self, schema: &str) -> Result<()> {
        let stmt = format!("SET search_path TO {}", quote_ident(schema));
        sqlx::raw_sql(&stmt)
            .execute(&mut self.conn)
            .await
            .map_err(IngestError::store(Phase::Connect))?;
        Ok(())
    }

    /// Whether `table` resolves through the current `search_path`.
    pub async fn table_exists(&mut self, table: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .persistent(false)
            .bind(table)
            .fetch_one(&mut self.conn)
            .await
    }

    /// Drop and re-create database `name`, then reconnect to it with the same
    /// parameters. Destroys every object in `name`.
    ///
    /// PostgreSQL refuses to drop the database a session is connected to, so
    /// the current handle must point at another one (usually `postgres`).
    #[instrument(skip(self))]
    pub async fn recreate_database(self, name: &str) -> Result<Db> {
        let mut admin = self;
        let quoted = quote_ident(name);
        for stmt in [
            format!("DROP DATABASE IF EXISTS {quoted}"),
            format!("CREATE DATABASE {quoted}"),
        ] {
            sqlx::raw_sql(&stmt)
                .execute(&mut admin.conn)
                .await
                .map_err(IngestError::store(Phase::ResetDatabase))?;
        }
        info!(database = name, "database recreated");

        let options = admin.options.clone().database(name);
        admin.close().await;
        Self::connect_with(options).await
    }

    pub async fn close(self) {
        if let Err(e) = self.conn.close().await {
            warn!(error = %e, "error while closing db session");
        }
    }
}

/// Quote an SQL identifier (table, column, schema or database name).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
