//! Shared helpers for store-backed integration tests.
//!
//! Tests only run when `TEST_DATABASE_URL` points at a PostgreSQL server the
//! tests may create schemas in. Each test gets its own schema, selected via
//! `search_path`, so tests can run in parallel against one database.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use northwind_loader::database_ops::db::{quote_ident, Db};
use northwind_loader::normalization::supplier::NormalizedSupplier;
use northwind_loader::util::env::ConnectionParams;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub struct TestDb {
    pub db: Db,
    schema: String,
}

impl TestDb {
    /// Connect and switch to a fresh schema, or `None` when no test database
    /// is configured.
    pub async fn connect() -> Option<Self> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping store-backed test");
            return None;
        };
        let mut db = Db::connect(&ConnectionParams::with_url(url))
            .await
            .expect("connect to TEST_DATABASE_URL");
        let schema = unique_name("nw_test");
        sqlx::raw_sql(&format!("CREATE SCHEMA {}", quote_ident(&schema)))
            .execute(db.conn())
            .await
            .expect("create test schema");
        db.set_search_path(&schema).await.expect("set search_path");
        Some(Self { db, schema })
    }

    pub async fn exec(&mut self, sql: &str) {
        sqlx::raw_sql(sql)
            .execute(self.db.conn())
            .await
            .unwrap_or_else(|e| panic!("{sql}: {e}"));
    }

    /// Create a minimal `products` table holding `names`.
    pub async fn create_products(&mut self, names: &[&str]) {
        self.exec(
            "CREATE TABLE products (
                product_id SERIAL PRIMARY KEY,
                product_name varchar(100) NOT NULL
            )",
        )
        .await;
        for name in names {
            sqlx::query("INSERT INTO products (product_name) VALUES ($1)")
                .bind(*name)
                .execute(self.db.conn())
                .await
                .expect("insert product");
        }
    }

    pub async fn count(&mut self, sql: &str) -> i64 {
        sqlx::query_scalar(sql)
            .fetch_one(self.db.conn())
            .await
            .unwrap_or_else(|e| panic!("{sql}: {e}"))
    }

    pub async fn column_exists(&mut self, table: &str, column: &str) -> bool {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2",
        )
        .bind(table)
        .bind(column)
        .fetch_one(self.db.conn())
        .await
        .expect("query information_schema");
        n > 0
    }

    pub async fn constraint_exists(&mut self, name: &str) -> bool {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.table_constraints
             WHERE constraint_schema = current_schema() AND constraint_name = $1",
        )
        .bind(name)
        .fetch_one(self.db.conn())
        .await
        .expect("query information_schema");
        n > 0
    }

    /// `product_name → supplier_id` for every product.
    pub async fn product_links(&mut self) -> Vec<(String, Option<i32>)> {
        sqlx::query_as("SELECT product_name::text, supplier_id FROM products ORDER BY product_id")
            .fetch_all(self.db.conn())
            .await
            .expect("read product links")
    }

    pub async fn teardown(mut self) {
        let stmt = format!("DROP SCHEMA IF EXISTS {} CASCADE", quote_ident(&self.schema));
        let _ = sqlx::raw_sql(&stmt).execute(self.db.conn()).await;
        self.db.close().await;
    }
}

pub fn unique_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{}_{n}_{nanos}", std::process::id())
}

/// Write `contents` to a file in the system temp dir and return its path.
pub fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{}_{name}", unique_name("northwind")));
    std::fs::write(&path, contents).expect("write temp file");
    path
}

pub fn supplier(company: &str, products: &[&str]) -> NormalizedSupplier {
    NormalizedSupplier {
        company_name: company.to_string(),
        contact_name: "Jane Doe".to_string(),
        contact_title: "Manager".to_string(),
        address: Some("123 Main St".to_string()),
        city: "SF".to_string(),
        region: None,
        postal_code: Some("94105".to_string()),
        country: "USA".to_string(),
        phone: "555-1234".to_string(),
        fax: None,
        homepage: None,
        products: products.iter().map(|p| p.to_string()).collect(),
    }
}
