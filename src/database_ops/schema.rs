//! Provisioning of the `suppliers` table.
//!
//! This is a reset, not a migration: every call throws away the previous
//! table and all of its rows.
use tracing::{info, instrument};

use crate::database_ops::db::Db;
use crate::error::{IngestError, Phase, Result};

pub const SUPPLIERS_TABLE: &str = "suppliers";

// CASCADE also drops `fk_products_suppliers` left behind by an earlier run;
// `products.supplier_id` itself survives and is re-linked by the backfill.
const DROP_SUPPLIERS: &str = "DROP TABLE IF EXISTS suppliers CASCADE";

const CREATE_SUPPLIERS: &str = r#"
CREATE TABLE suppliers (
    supplier_id SERIAL PRIMARY KEY,
    company_name varchar(100) NOT NULL,
    contact_name varchar(30) NOT NULL,
    contact_title varchar(30) NOT NULL,
    address varchar(60),
    city varchar(60) NOT NULL,
    region varchar(30),
    postal_code varchar(30),
    country varchar(30) NOT NULL,
    phone varchar(30) NOT NULL,
    fax varchar(30),
    homepage varchar(100),
    products text[]
)
"#;

/// Drop `suppliers` if present and create it empty.
///
/// Destructive and non-reversible. Only run it while nothing in the table is
/// considered durable. No foreign keys are created here; the backfill adds
/// them once the referenced rows exist.
#[instrument(skip(db))]
pub async fn reset_suppliers_table(db: &mut Db) -> Result<()> {
    for stmt in [DROP_SUPPLIERS, CREATE_SUPPLIERS] {
        sqlx::raw_sql(stmt)
            .execute(db.conn())
            .await
            .map_err(IngestError::store(Phase::Provision))?;
    }
    info!(table = SUPPLIERS_TABLE, "table reset");
    Ok(())
}
