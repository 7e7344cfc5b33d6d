pub mod backfill;
pub mod csv_tables;
pub mod db;
pub mod load_report;
pub mod schema;
pub mod script;
pub mod suppliers;
