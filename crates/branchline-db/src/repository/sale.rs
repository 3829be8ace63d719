//! # Sale Repository
//!
//! The Sale Recorder and sale queries.
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              SINGLE TRANSACTION (record, BEGIN IMMEDIATE)               │
//! │                                                                         │
//! │  1. GUARD     for each product (aggregated):                            │
//! │               SELECT quantity FROM inventory  ──► check_line()          │
//! │               not stocked / short ──► ROLLBACK, nothing written         │
//! │                                                                         │
//! │  2. HEADER    INSERT INTO sales (...) RETURNING id                      │
//! │                                                                         │
//! │  3. ITEMS     INSERT INTO sale_items  (submitted order, submitted price)│
//! │                                                                         │
//! │  4. DECREMENT UPDATE inventory SET quantity = quantity - n              │
//! │               WHERE ... AND quantity >= n                               │
//! │               0 rows ──► re-read ──► InsufficientStock, ROLLBACK        │
//! │                                                                         │
//! │  5. AUDIT     INSERT INTO audit_events ('sale_created', ...)            │
//! │                                                                         │
//! │  6. COMMIT    ← all of the above, or none of it                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `BEGIN IMMEDIATE` takes the SQLite write lock before the guard reads, so
//! concurrent sales queue on `busy_timeout` and run one after another. The
//! conditional decrement (and the `CHECK (quantity >= 0)` behind it)
//! keeps the stock from going below zero regardless.

use std::collections::HashMap;
use std::time::Duration;

use branchline_core::access::Actor;
use branchline_core::error::CoreError;
use branchline_core::inventory::{aggregate_demand, check_line, LineDemand, StockLevel};
use branchline_core::schema::{NewSale, SalesFilter};
use branchline_core::types::{AuditEventType, Sale, SaleItem, SaleStatus};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::bounded;
use crate::repository::audit::AuditRepository;

const SALE_HEADER_SELECT: &str = r#"
    SELECT s.id, s.branch_id, b.name AS branch_name, s.sale_date, s.total_amount,
           s.created_by, u.username AS created_by_username, s.status, s.created_at
    FROM sales s
    JOIN branches b ON b.id = s.branch_id
    LEFT JOIN users u ON u.id = s.created_by
"#;

const SALE_ITEM_SELECT: &str = r#"
    SELECT si.id, si.sale_id, si.product_id, p.name AS product_name, p.category,
           si.quantity, si.price
    FROM sale_items si
    JOIN products p ON p.id = si.product_id
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        SaleRepository { pool, timeout }
    }

    // =========================================================================
    // Sale Recorder
    // =========================================================================

    /// Records a validated sale for `actor` and returns the new sale id.
    ///
    /// Authorization happens before this call; validation of the payload
    /// shape happens at the boundary. What remains here is stock.
    ///
    /// ## Errors
    /// - `DbError::Domain(ProductNotStocked | InsufficientStock)` - rejected,
    ///   nothing written
    /// - `DbError::Timeout` - deadline passed, transaction rolled back
    /// - anything else - storage failure, transaction rolled back
    pub async fn record(&self, sale: &NewSale, actor: &Actor) -> DbResult<i64> {
        let demand = aggregate_demand(&sale.items)?;

        bounded(self.timeout, async {
            debug!(
                branch_id = sale.branch_id,
                lines = sale.items.len(),
                products = demand.len(),
                "Recording sale"
            );

            let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

            // 1. Guard
            for line in &demand {
                let stock = read_stock(&mut *tx, sale.branch_id, line.product_id).await?;
                if let Err(err) = check_line(line, stock.as_ref(), sale.branch_id) {
                    warn!(
                        branch_id = sale.branch_id,
                        product_id = line.product_id,
                        user = %actor.username,
                        error = %err,
                        "Sale rejected by inventory guard"
                    );
                    return Err(err.into());
                }
            }

            // 2. Header
            let sale_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO sales (branch_id, sale_date, total_amount, created_by, status, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                RETURNING id
                "#,
            )
            .bind(sale.branch_id)
            .bind(sale.sale_date)
            .bind(sale.total_amount)
            .bind(actor.user_id)
            .bind(SaleStatus::Completed)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

            // 3. Items
            for item in &sale.items {
                sqlx::query(
                    r#"
                    INSERT INTO sale_items (sale_id, product_id, quantity, price)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                )
                .bind(sale_id)
                .bind(item.product_id)
                .bind(item.quantity)
                .bind(item.price)
                .execute(&mut *tx)
                .await?;
            }

            // 4. Decrement
            let now = Utc::now();
            for line in &demand {
                decrement(&mut *tx, sale.branch_id, line, now).await?;
            }

            // 5. Audit
            AuditRepository::record_in(
                &mut *tx,
                AuditEventType::SaleCreated,
                Some(&actor.username),
                Some(sale_id),
                serde_json::json!({
                    "branch_id": sale.branch_id,
                    "items": sale.items.len(),
                    "total_amount": sale.total_amount,
                }),
            )
            .await?;

            // 6. Commit
            tx.commit().await?;

            info!(
                sale_id,
                branch_id = sale.branch_id,
                total = %sale.total_amount,
                user = %actor.username,
                "Sale recorded"
            );

            Ok(sale_id)
        })
        .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets a sale with its items.
    pub async fn get(&self, id: i64) -> DbResult<Sale> {
        bounded(self.timeout, async {
            let mut sale = sqlx::query_as::<_, Sale>(&format!("{} WHERE s.id = ?1", SALE_HEADER_SELECT))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DbError::not_found("Sale", id))?;

            sale.items = sqlx::query_as::<_, SaleItem>(&format!(
                "{} WHERE si.sale_id = ?1 ORDER BY si.id",
                SALE_ITEM_SELECT
            ))
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

            Ok(sale)
        })
        .await
    }

    /// Lists sales matching the filter, newest first, each with its items.
    ///
    /// The branch filter is applied as given; scoping is the caller's job.
    pub async fn list(&self, filter: &SalesFilter) -> DbResult<Vec<Sale>> {
        bounded(self.timeout, async {
            let mut headers: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("{} WHERE 1 = 1", SALE_HEADER_SELECT));
            push_filter(&mut headers, filter);
            headers.push(" ORDER BY s.sale_date DESC, s.id DESC");

            let mut sales = headers.build_query_as::<Sale>().fetch_all(&self.pool).await?;
            if sales.is_empty() {
                return Ok(sales);
            }

            let mut items: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "{} WHERE si.sale_id IN (SELECT s.id FROM sales s WHERE 1 = 1",
                SALE_ITEM_SELECT
            ));
            push_filter(&mut items, filter);
            items.push(") ORDER BY si.sale_id, si.id");

            let rows = items.build_query_as::<SaleItem>().fetch_all(&self.pool).await?;

            let mut by_sale: HashMap<i64, Vec<SaleItem>> = HashMap::new();
            for item in rows {
                by_sale.entry(item.sale_id).or_default().push(item);
            }
            for sale in &mut sales {
                sale.items = by_sale.remove(&sale.id).unwrap_or_default();
            }

            Ok(sales)
        })
        .await
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

async fn read_stock(
    conn: &mut SqliteConnection,
    branch_id: i64,
    product_id: i64,
) -> DbResult<Option<StockLevel>> {
    let stock = sqlx::query_as::<_, StockLevel>(
        r#"
        SELECT i.product_id, p.name AS product_name, i.quantity
        FROM inventory i
        JOIN products p ON p.id = i.product_id
        WHERE i.branch_id = ?1 AND i.product_id = ?2
        "#,
    )
    .bind(branch_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(stock)
}

async fn decrement(
    conn: &mut SqliteConnection,
    branch_id: i64,
    line: &LineDemand,
    now: chrono::DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE inventory
        SET quantity = quantity - ?1, last_updated = ?4
        WHERE branch_id = ?2 AND product_id = ?3 AND quantity >= ?1
        "#,
    )
    .bind(line.quantity)
    .bind(branch_id)
    .bind(line.product_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(());
    }

    // Stock changed after the guard read.
    let stock = read_stock(&mut *conn, branch_id, line.product_id).await?;
    check_line(line, stock.as_ref(), branch_id)?;

    Err(CoreError::InsufficientStock {
        product_name: stock.as_ref().map(|s| s.product_name.clone()).unwrap_or_default(),
        available: stock.map(|s| s.quantity).unwrap_or(0),
        requested: line.quantity,
    }
    .into())
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &SalesFilter) {
    if let Some(branch_id) = filter.branch_id {
        query.push(" AND s.branch_id = ").push_bind(branch_id);
    }
    if let Some(from) = filter.date_from {
        query.push(" AND s.sale_date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        query.push(" AND s.sale_date <= ").push_bind(to);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use crate::{Database, DbConfig};
    use branchline_core::money::Money;
    use branchline_core::schema::NewSaleItem;
    use branchline_core::types::Role;
    use chrono::NaiveDate;

    struct Shop {
        db: Database,
        branch: i64,
        cola: i64,
        chips: i64,
        clerk: Actor,
    }

    async fn shop(cola_stock: i64, chips_stock: i64) -> Shop {
        let db = fixtures::db().await;
        let branch = fixtures::branch(&db, "Central").await;
        let cola = fixtures::product(&db, "Cola", 199, Some("Drinks")).await;
        let chips = fixtures::product(&db, "Chips", 150, Some("Snacks")).await;
        fixtures::stock(&db, branch, cola, cola_stock).await;
        fixtures::stock(&db, branch, chips, chips_stock).await;
        let clerk_id = fixtures::user(&db, "clerk", Role::Employee, Some(branch)).await;

        Shop {
            db,
            branch,
            cola,
            chips,
            clerk: Actor::new(clerk_id, "clerk", Role::Employee, Some(branch)),
        }
    }

    fn sale(branch_id: i64, lines: &[(i64, i64, i64)]) -> NewSale {
        let items: Vec<NewSaleItem> = lines
            .iter()
            .map(|&(product_id, quantity, cents)| NewSaleItem {
                product_id,
                quantity,
                price: Money::from_cents(cents),
            })
            .collect();
        let total = items.iter().map(|i| i.price.multiply_quantity(i.quantity)).sum();

        NewSale {
            branch_id,
            sale_date: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            total_amount: total,
            items,
        }
    }

    async fn quantity(db: &Database, branch: i64, product: i64) -> i64 {
        db.inventory().get(branch, product).await.unwrap().unwrap().quantity
    }

    async fn sale_rows(db: &Database) -> (i64, i64) {
        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        (sales, items)
    }

    #[tokio::test]
    async fn test_over_request_rejected_then_exact_accepted() {
        let s = shop(3, 10).await;

        let err = s
            .db
            .sales()
            .record(&sale(s.branch, &[(s.cola, 5, 199)]), &s.clerk)
            .await
            .unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product_name,
                available,
                requested,
            }) => {
                assert_eq!(product_name, "Cola");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(quantity(&s.db, s.branch, s.cola).await, 3);
        assert_eq!(sale_rows(&s.db).await, (0, 0));

        s.db
            .sales()
            .record(&sale(s.branch, &[(s.cola, 3, 199)]), &s.clerk)
            .await
            .unwrap();
        assert_eq!(quantity(&s.db, s.branch, s.cola).await, 0);
    }

    #[tokio::test]
    async fn test_failing_second_line_leaves_everything_untouched() {
        let s = shop(10, 2).await;

        let result = s
            .db
            .sales()
            .record(&sale(s.branch, &[(s.cola, 4, 199), (s.chips, 3, 150)]), &s.clerk)
            .await;

        assert!(matches!(
            result,
            Err(DbError::Domain(CoreError::InsufficientStock { .. }))
        ));
        assert_eq!(quantity(&s.db, s.branch, s.cola).await, 10);
        assert_eq!(quantity(&s.db, s.branch, s.chips).await, 2);
        assert_eq!(sale_rows(&s.db).await, (0, 0));
        assert!(s.db.audit().recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_success_persists_submitted_values() {
        let s = shop(10, 10).await;
        let new = sale(s.branch, &[(s.chips, 2, 175), (s.cola, 1, 0)]);

        let id = s.db.sales().record(&new, &s.clerk).await.unwrap();
        let stored = s.db.sales().get(id).await.unwrap();

        assert_eq!(stored.branch_id, s.branch);
        assert_eq!(stored.branch_name, "Central");
        assert_eq!(stored.sale_date, new.sale_date);
        assert_eq!(stored.total_amount.cents(), 350);
        assert_eq!(stored.created_by, s.clerk.user_id);
        assert_eq!(stored.created_by_username.as_deref(), Some("clerk"));
        assert_eq!(stored.status, SaleStatus::Completed);

        // submitted order and prices, not catalog prices
        let lines: Vec<(i64, i64, i64)> = stored
            .items
            .iter()
            .map(|i| (i.product_id, i.quantity, i.price.cents()))
            .collect();
        assert_eq!(lines, vec![(s.chips, 2, 175), (s.cola, 1, 0)]);

        assert_eq!(quantity(&s.db, s.branch, s.chips).await, 8);
        assert_eq!(quantity(&s.db, s.branch, s.cola).await, 9);

        let audit = s.db.audit().by_type(AuditEventType::SaleCreated, 5).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].entity_id, Some(id));
        assert_eq!(audit[0].actor.as_deref(), Some("clerk"));
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_checked_together() {
        let s = shop(3, 0).await;

        let result = s
            .db
            .sales()
            .record(&sale(s.branch, &[(s.cola, 2, 199), (s.cola, 2, 199)]), &s.clerk)
            .await;
        assert!(matches!(
            result,
            Err(DbError::Domain(CoreError::InsufficientStock { requested: 4, .. }))
        ));

        s.db
            .sales()
            .record(&sale(s.branch, &[(s.cola, 1, 199), (s.cola, 2, 199)]), &s.clerk)
            .await
            .unwrap();
        assert_eq!(quantity(&s.db, s.branch, s.cola).await, 0);
    }

    #[tokio::test]
    async fn test_unstocked_product_rejected() {
        let s = shop(3, 3).await;
        let other = fixtures::branch(&s.db, "Elsewhere").await;

        let result = s
            .db
            .sales()
            .record(&sale(other, &[(s.cola, 1, 199)]), &s.clerk)
            .await;
        assert!(matches!(
            result,
            Err(DbError::Domain(CoreError::ProductNotStocked { .. }))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_sales_never_oversell() {
        let s = shop(5, 0).await;

        let mut handles = Vec::new();
        for _ in 0..12 {
            let db = s.db.clone();
            let clerk = s.clerk.clone();
            let new = sale(s.branch, &[(s.cola, 1, 199)]);
            handles.push(tokio::spawn(async move { db.sales().record(&new, &clerk).await }));
        }

        let mut sold = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => sold += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { .. })) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(sold, 5);
        assert_eq!(quantity(&s.db, s.branch, s.cola).await, 0);
    }

    async fn file_shop(dir: &tempfile::TempDir, cola_stock: i64) -> Shop {
        let config = DbConfig::new(dir.path().join("branchline.db")).max_connections(8);
        let db = Database::new(config).await.unwrap();
        let branch = fixtures::branch(&db, "Central").await;
        let cola = fixtures::product(&db, "Cola", 199, Some("Drinks")).await;
        let chips = fixtures::product(&db, "Chips", 150, Some("Snacks")).await;
        fixtures::stock(&db, branch, cola, cola_stock).await;
        let clerk_id = fixtures::user(&db, "clerk", Role::Employee, Some(branch)).await;

        Shop {
            db,
            branch,
            cola,
            chips,
            clerk: Actor::new(clerk_id, "clerk", Role::Employee, Some(branch)),
        }
    }

    async fn sell_concurrently(s: &Shop, count: usize) -> (i64, usize) {
        let mut handles = Vec::new();
        for _ in 0..count {
            let db = s.db.clone();
            let clerk = s.clerk.clone();
            let new = sale(s.branch, &[(s.cola, 1, 199)]);
            handles.push(tokio::spawn(async move { db.sales().record(&new, &clerk).await }));
        }

        let (mut sold, mut short) = (0, 0);
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => sold += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { .. })) => short += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        (sold, short)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_on_shared_file_all_succeed() {
        let dir = tempfile::TempDir::new().unwrap();
        let s = file_shop(&dir, 1000).await;

        let (sold, short) = sell_concurrently(&s, 40).await;

        assert_eq!((sold, short), (40, 0));
        assert_eq!(quantity(&s.db, s.branch, s.cola).await, 960);
        assert_eq!(sale_rows(&s.db).await, (40, 40));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_on_shared_file_stop_at_zero() {
        let dir = tempfile::TempDir::new().unwrap();
        let s = file_shop(&dir, 7).await;

        let (sold, short) = sell_concurrently(&s, 20).await;

        assert_eq!((sold, short), (7, 13));
        assert_eq!(quantity(&s.db, s.branch, s.cola).await, 0);
        assert_eq!(sale_rows(&s.db).await, (7, 7));
    }

    #[tokio::test]
    async fn test_overflowing_duplicate_lines_rejected() {
        let s = shop(3, 0).await;
        let line = |quantity| NewSaleItem {
            product_id: s.cola,
            quantity,
            price: Money::from_cents(1),
        };
        let new = NewSale {
            branch_id: s.branch,
            sale_date: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            total_amount: Money::zero(),
            items: vec![line(i64::MAX), line(2)],
        };

        let result = s.db.sales().record(&new, &s.clerk).await;

        assert!(matches!(
            result,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert_eq!(quantity(&s.db, s.branch, s.cola).await, 3);
        assert_eq!(sale_rows(&s.db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_list_filters_by_branch_and_date() {
        let s = shop(20, 20).await;
        let south = fixtures::branch(&s.db, "South").await;
        fixtures::stock(&s.db, south, s.cola, 5).await;
        let admin = Actor::new(s.clerk.user_id, "clerk", Role::Admin, None);

        let mut early = sale(s.branch, &[(s.cola, 1, 199)]);
        early.sale_date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        s.db.sales().record(&early, &admin).await.unwrap();
        s.db.sales().record(&sale(s.branch, &[(s.chips, 2, 150)]), &admin).await.unwrap();
        s.db.sales().record(&sale(south, &[(s.cola, 1, 199)]), &admin).await.unwrap();

        let all = s.db.sales().list(&SalesFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|sale| !sale.items.is_empty()));

        let central = s
            .db
            .sales()
            .list(&SalesFilter {
                branch_id: Some(s.branch),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(central.len(), 2);
        assert!(central.iter().all(|sale| sale.branch_id == s.branch));

        let spring = s
            .db
            .sales()
            .list(&SalesFilter {
                branch_id: Some(s.branch),
                date_from: NaiveDate::from_ymd_opt(2024, 3, 1),
                date_to: None,
            })
            .await
            .unwrap();
        assert_eq!(spring.len(), 1);
        assert_eq!(spring[0].items[0].product_id, s.chips);
        assert_eq!(spring[0].items[0].product_name, "Chips");
    }

    #[tokio::test]
    async fn test_get_missing_sale() {
        let s = shop(1, 1).await;
        assert!(matches!(s.db.sales().get(99).await, Err(DbError::NotFound { .. })));
    }
}
