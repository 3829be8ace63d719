//! # Inventory Repository
//!
//! Stock listing and the additive upsert. The only other writer of the
//! `inventory` table is the Sale Recorder in [`super::sale`].
//!
//! ## Additive Upsert
//! ```text
//! add(branch 1, product 7, +10)
//!        │
//!        ▼
//! INSERT INTO inventory (...) VALUES (1, 7, 10, now)
//! ON CONFLICT (branch_id, product_id)
//!     DO UPDATE SET quantity = quantity + 10      ← one row per pair, always
//!        │
//!        ▼
//! RETURNING id
//! ```

use std::time::Duration;

use branchline_core::schema::{InventoryAddition, InventoryFilter};
use branchline_core::types::{InventoryEntry, InventoryRecord};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::bounded;

/// Repository for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        InventoryRepository { pool, timeout }
    }

    /// Adds stock, creating the record if the pair has none. Returns the
    /// record id.
    ///
    /// ## Errors
    /// - `NotFound` if the branch or product doesn't exist
    pub async fn add(&self, addition: &InventoryAddition) -> DbResult<i64> {
        bounded(self.timeout, async {
            let branch: Option<i64> = sqlx::query_scalar("SELECT id FROM branches WHERE id = ?1")
                .bind(addition.branch_id)
                .fetch_optional(&self.pool)
                .await?;
            if branch.is_none() {
                return Err(DbError::not_found("Branch", addition.branch_id));
            }

            let product: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
                .bind(addition.product_id)
                .fetch_optional(&self.pool)
                .await?;
            if product.is_none() {
                return Err(DbError::not_found("Product", addition.product_id));
            }

            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO inventory (branch_id, product_id, quantity, last_updated)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (branch_id, product_id) DO UPDATE SET
                    quantity = quantity + excluded.quantity,
                    last_updated = excluded.last_updated
                RETURNING id
                "#,
            )
            .bind(addition.branch_id)
            .bind(addition.product_id)
            .bind(addition.quantity)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

            info!(
                inventory_id = id,
                branch_id = addition.branch_id,
                product_id = addition.product_id,
                quantity = addition.quantity,
                "Inventory added"
            );

            Ok(id)
        })
        .await
    }

    /// The record for one pair, if any.
    pub async fn get(&self, branch_id: i64, product_id: i64) -> DbResult<Option<InventoryRecord>> {
        bounded(self.timeout, async {
            let record = sqlx::query_as::<_, InventoryRecord>(
                r#"
                SELECT id, branch_id, product_id, quantity, last_updated
                FROM inventory
                WHERE branch_id = ?1 AND product_id = ?2
                "#,
            )
            .bind(branch_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(record)
        })
        .await
    }

    /// Lists stock joined with product and branch names.
    ///
    /// The filter is applied as given; branch scoping is the caller's job.
    pub async fn list(&self, filter: &InventoryFilter) -> DbResult<Vec<InventoryEntry>> {
        bounded(self.timeout, async {
            debug!(branch_id = ?filter.branch_id, product_id = ?filter.product_id, "Listing inventory");

            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                r#"
                SELECT i.id, i.branch_id, b.name AS branch_name,
                       i.product_id, p.name AS product_name, p.category, p.price,
                       i.quantity, i.last_updated
                FROM inventory i
                JOIN products p ON p.id = i.product_id
                JOIN branches b ON b.id = i.branch_id
                WHERE 1 = 1
                "#,
            );

            if let Some(branch_id) = filter.branch_id {
                query.push(" AND i.branch_id = ").push_bind(branch_id);
            }
            if let Some(product_id) = filter.product_id {
                query.push(" AND i.product_id = ").push_bind(product_id);
            }
            query.push(" ORDER BY b.name, p.name, i.id");

            let entries = query
                .build_query_as::<InventoryEntry>()
                .fetch_all(&self.pool)
                .await?;

            Ok(entries)
        })
        .await
    }
}
