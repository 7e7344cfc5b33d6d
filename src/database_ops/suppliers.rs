use tracing::{info, instrument};

use crate::database_ops::db::Db;
use crate::database_ops::load_report::LoadReport;
use crate::database_ops::schema::SUPPLIERS_TABLE;
use crate::normalization::supplier::NormalizedSupplier;

const INSERT_SUPPLIER: &str = r#"
INSERT INTO suppliers (company_name, contact_name, contact_title, address,
                       city,         region,       postal_code,   country,
                       phone,        fax,          homepage,      products)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
RETURNING supplier_id
"#;

/// Insert one `suppliers` row per record, in input order, so generated
/// `supplier_id`s increase with the input position.
///
/// Each statement commits on its own. A row the store rejects is logged and
/// recorded in the report; loading continues with the next record.
#[instrument(skip(db, suppliers), fields(rows = suppliers.len()))]
pub async fn insert_suppliers(db: &mut Db, suppliers: &[NormalizedSupplier]) -> LoadReport {
    let mut report = LoadReport::new(SUPPLIERS_TABLE);
    for (index, s) in suppliers.iter().enumerate() {
        let outcome = sqlx::query_scalar::<_, i32>(INSERT_SUPPLIER)
            .bind(&s.company_name)
            .bind(&s.contact_name)
            .bind(&s.contact_title)
            .bind(s.address.as_deref())
            .bind(&s.city)
            .bind(s.region.as_deref())
            .bind(s.postal_code.as_deref())
            .bind(&s.country)
            .bind(&s.phone)
            .bind(s.fax.as_deref())
            .bind(s.homepage.as_deref())
            .bind(s.products.as_slice())
            .persistent(false)
            .fetch_one(db.conn())
            .await;
        report.record(index, Some(s.company_name.as_str()), outcome.map(Some));
    }
    info!(
        inserted = report.inserted.len(),
        failed = report.failures.len(),
        "suppliers loaded"
    );
    report
}
