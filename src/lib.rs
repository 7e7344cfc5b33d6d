//! Loads Northwind-style exports into PostgreSQL.
//!
//! The supplier pipeline ([`orchestrator`]) splits the packed `contact` and
//! `address` fields of the supplier JSON export, resets the `suppliers` table,
//! loads the rows and links the existing `products` table to them. The
//! remaining pieces (database reset, SQL seed scripts, CSV table copies) are
//! thin helpers driven by the `northwind` binary.
pub mod cli;
pub mod database_ops;
pub mod error;
pub mod normalization;
pub mod orchestrator;

pub mod util {
    pub mod env;
    pub mod logging;
}

pub use database_ops::db::Db;
pub use error::{IngestError, Phase};
