//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use sqlx::postgres::PgConnectOptions;
use tracing::info;

use crate::error::{IngestError, Result};

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        if dotenv::dotenv().is_err() {
            // Fallback to the crate root so `cargo run` from a subdirectory still works.
            let candidate = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
            let _ = dotenv::from_filename(candidate);
        }
    });
}

/// Keys whose (redacted) values are logged at CLI startup.
const CONNECTION_KEYS: [&str; 7] = [
    "DATABASE_URL",
    "PGHOST",
    "PGPORT",
    "PGUSER",
    "PGPASSWORD",
    "PGDATABASE",
    "PGSCHEMA",
];

/// Common bootstrap for CLI binaries: load the environment and log a redacted
/// snapshot of the connection settings that will be used.
pub fn bootstrap_cli(bin_name: &str) {
    init_env();
    let source = if env_opt("DATABASE_URL").is_some() {
        "DATABASE_URL"
    } else {
        "PG*/DB_* parameters"
    };
    info!(target = "bootstrap", bin = bin_name, source, "environment loaded");
    // Nothing is required here: every key has a libpq default or a CLI override.
    log_config_snapshot(bin_name, &CONNECTION_KEYS);
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true.
pub fn env_flag(key: &str, default: bool) -> bool {
    match env_opt(key) {
        Some(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        }
        None => default,
    }
}

fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| env_opt(k))
}

/// Connection parameters for the target database.
///
/// Either a full `url` or individual parts. Parts left unset fall through to
/// libpq-style defaults (`PGHOST`, `PGPORT`, ... and finally localhost:5432).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionParams {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub dbname: Option<String>,
    /// Applied as `search_path` on the session after connecting.
    pub schema: Option<String>,
}

impl ConnectionParams {
    /// Read parameters from the environment. `DATABASE_URL` wins over the
    /// individual `PG*` variables; the Laravel-style `DB_*` names are accepted
    /// as aliases.
    pub fn from_env() -> Self {
        Self {
            url: env_opt("DATABASE_URL"),
            host: first_env(&["PGHOST", "DB_HOST"]),
            port: first_env(&["PGPORT", "DB_PORT"]).and_then(|p| p.trim().parse().ok()),
            user: first_env(&["PGUSER", "DB_USERNAME"]),
            password: first_env(&["PGPASSWORD", "DB_PASSWORD"]),
            dbname: first_env(&["PGDATABASE", "DB_DATABASE"]),
            schema: env_opt("PGSCHEMA"),
        }
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let mut opts = match &self.url {
            Some(url) => PgConnectOptions::from_str(url).map_err(|e| {
                IngestError::Config(format!("invalid database url {}: {e}", redact_url(url)))
            })?,
            None => PgConnectOptions::new(),
        };
        if let Some(host) = &self.host {
            opts = opts.host(host);
        }
        if let Some(port) = self.port {
            opts = opts.port(port);
        }
        if let Some(user) = &self.user {
            opts = opts.username(user);
        }
        if let Some(password) = &self.password {
            opts = opts.password(password);
        }
        if let Some(dbname) = &self.dbname {
            opts = opts.database(dbname);
        }
        Ok(opts)
    }
}

// SECURITY: keep the password out of logs and panic messages.
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("url", &self.url.as_deref().map(redact_url))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("dbname", &self.dbname)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Mask the credentials of a postgres DSN so it can be logged.
pub fn redact_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(mut u) = url::Url::parse(trimmed) {
        let scheme = u.scheme().to_ascii_lowercase();
        if scheme == "postgres" || scheme == "postgresql" {
            if !u.username().is_empty() {
                let _ = u.set_username("***");
            }
            if u.password().is_some() {
                let _ = u.set_password(Some("***"));
            }
            return u.to_string();
        }
    }
    if trimmed.starts_with("postgres://") || trimmed.starts_with("postgresql://") {
        return "postgres://***".to_string();
    }
    trimmed.to_string()
}

fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD") || k.contains("SECRET") || k.contains("TOKEN") {
        return "***".to_string();
    }
    redact_url(val)
}

/// Redacted `(key, value)` pairs for `keys`; unset keys map to an empty value.
pub fn config_snapshot(keys: &[&str]) -> Vec<(String, String)> {
    keys.iter()
        .map(|&k| {
            let v = env_opt(k).unwrap_or_default();
            (k.to_string(), redact_value(k, &v))
        })
        .collect()
}

/// Log a consolidated, redacted snapshot of configuration.
pub fn log_config_snapshot(title: &str, keys: &[&str]) {
    let snapshot = config_snapshot(keys);
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
}
