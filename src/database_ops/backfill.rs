//! Links `products` to `suppliers` after the supplier load.
//!
//! Suppliers arrive carrying the names of the products they sell in the
//! transient `suppliers.products` array. The backfill copies each supplier's
//! key onto the matching `products` rows, adds the foreign key, and drops the
//! array column. Every statement auto-commits; validation runs before the
//! constraint so an incomplete match never gets a foreign key over it.
use serde::Serialize;
use tracing::{info, instrument};

use crate::database_ops::db::Db;
use crate::error::{IngestError, Phase, Result};

pub const PRODUCTS_TABLE: &str = "products";
pub const PRODUCTS_SUPPLIER_FK: &str = "fk_products_suppliers";

// Names that would be linked to more than one supplier.
const AMBIGUOUS_PRODUCTS: &str = r#"
SELECT p.product_name::text
FROM products p
JOIN suppliers s ON p.product_name = ANY(s.products)
GROUP BY p.product_name
HAVING COUNT(DISTINCT s.supplier_id) > 1
ORDER BY p.product_name
"#;

const PREPARE_PRODUCTS: [&str; 3] = [
    "ALTER TABLE products ADD COLUMN IF NOT EXISTS supplier_id INTEGER",
    "ALTER TABLE products DROP CONSTRAINT IF EXISTS fk_products_suppliers",
    "UPDATE products SET supplier_id = NULL WHERE supplier_id IS NOT NULL",
];

const LINK_PRODUCTS: &str = r#"
UPDATE products
SET supplier_id = s.supplier_id
FROM suppliers s
WHERE products.product_name = ANY(s.products)
"#;

const UNMATCHED_PRODUCTS: &str = r#"
SELECT COALESCE(product_name::text, '<null>')
FROM products
WHERE supplier_id IS NULL
ORDER BY product_name
"#;

const ADD_FOREIGN_KEY: &str = r#"
ALTER TABLE products
ADD CONSTRAINT fk_products_suppliers FOREIGN KEY (supplier_id)
REFERENCES suppliers (supplier_id)
"#;

const DROP_PRODUCTS_COLUMN: &str = "ALTER TABLE suppliers DROP COLUMN products";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    pub linked_products: u64,
}

/// Set `products.supplier_id` from the supplier whose `products` array lists
/// the product name (exact match), add `fk_products_suppliers`, and drop
/// `suppliers.products`.
///
/// Fails without linking anything when a product name is listed by more than
/// one supplier. Fails before the constraint is added when any product is left
/// without a supplier. Store errors propagate.
#[instrument(skip(db))]
pub async fn link_products_to_suppliers(db: &mut Db) -> Result<BackfillSummary> {
    let products_exist = db
        .table_exists(PRODUCTS_TABLE)
        .await
        .map_err(IngestError::store(Phase::Backfill))?;
    if !products_exist {
        return Err(IngestError::MissingTable {
            table: PRODUCTS_TABLE.to_string(),
        });
    }

    let ambiguous: Vec<String> = sqlx::query_scalar(AMBIGUOUS_PRODUCTS)
        .persistent(false)
        .fetch_all(db.conn())
        .await
        .map_err(IngestError::store(Phase::Backfill))?;
    if !ambiguous.is_empty() {
        return Err(IngestError::AmbiguousProductMatch {
            products: ambiguous,
        });
    }

    for stmt in PREPARE_PRODUCTS {
        sqlx::raw_sql(stmt)
            .execute(db.conn())
            .await
            .map_err(IngestError::store(Phase::Backfill))?;
    }

    let linked_products = sqlx::query(LINK_PRODUCTS)
        .persistent(false)
        .execute(db.conn())
        .await
        .map_err(IngestError::store(Phase::Backfill))?
        .rows_affected();

    let unmatched: Vec<String> = sqlx::query_scalar(UNMATCHED_PRODUCTS)
        .persistent(false)
        .fetch_all(db.conn())
        .await
        .map_err(IngestError::store(Phase::Backfill))?;
    if !unmatched.is_empty() {
        return Err(IngestError::UnmatchedProducts {
            products: unmatched,
        });
    }

    for stmt in [ADD_FOREIGN_KEY, DROP_PRODUCTS_COLUMN] {
        sqlx::raw_sql(stmt)
            .execute(db.conn())
            .await
            .map_err(IngestError::store(Phase::Backfill))?;
    }

    info!(
        linked_products,
        constraint = PRODUCTS_SUPPLIER_FK,
        "products linked to suppliers"
    );
    Ok(BackfillSummary { linked_products })
}
