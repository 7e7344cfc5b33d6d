use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline step a store failure happened in. Carried by
/// [`IngestError::StoreOperationFailed`] so the log line names the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    ResetDatabase,
    Script,
    Provision,
    Load,
    Backfill,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Connect => "connect",
            Phase::ResetDatabase => "reset-database",
            Phase::Script => "script",
            Phase::Provision => "provision",
            Phase::Load => "load",
            Phase::Backfill => "backfill",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// A supplier record could not be decomposed into its required columns.
    #[error("malformed supplier record: {reason}")]
    MalformedRecord { reason: String },

    #[error("store operation failed during {phase}: {source}")]
    StoreOperationFailed {
        phase: Phase,
        #[source]
        source: sqlx::Error,
    },

    #[error("sql script not found: {}", path.display())]
    ScriptNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid supplier json in {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("required table `{table}` does not exist")]
    MissingTable { table: String },

    /// Product names listed by more than one supplier.
    #[error("product names match more than one supplier: {}", products.join(", "))]
    AmbiguousProductMatch { products: Vec<String> },

    /// Products left without a supplier after the backfill update.
    #[error("products matched no supplier: {}", products.join(", "))]
    UnmatchedProducts { products: Vec<String> },

    #[error("configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        IngestError::MalformedRecord {
            reason: reason.into(),
        }
    }

    /// Returns a closure mapping a sqlx error into a store failure for `phase`,
    /// meant for `.map_err(IngestError::store(Phase::Load))`.
    pub fn store(phase: Phase) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| IngestError::StoreOperationFailed { phase, source }
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
