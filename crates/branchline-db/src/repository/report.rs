//! # Report Repository
//!
//! Read-only rollups behind the three metrics endpoints.
//!
//! ## Counting Without Double Counting
//! ```text
//! sales ──┬── sale_items        A naive JOIN repeats total_amount once per
//!         │                     line. Totals come from `sales` alone; units
//!         └── (SUM(quantity)    come from a per-sale subquery joined back,
//!              GROUP BY sale)   so every sale contributes exactly one row.
//! ```
//!
//! Dates are bound as `YYYY-MM-DD` text and compared lexically, which for
//! ISO dates is chronological.

use std::time::Duration;

use branchline_core::money::Money;
use branchline_core::report::{
    performance_window_start, BranchActivity, BranchPerformance, CategoryRollup, InventoryMetrics,
    LowStockItem, Period, PeriodSales, SalesMetrics, TopProduct, LOW_STOCK_THRESHOLD,
    TOP_PRODUCTS_LIMIT, UNCATEGORIZED,
};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::bounded;

const SALES_WINDOW: &str =
    "s.sale_date >= ?1 AND s.sale_date <= ?2 AND (?3 IS NULL OR s.branch_id = ?3)";

const UNITS_PER_SALE: &str =
    "LEFT JOIN (SELECT sale_id, SUM(quantity) AS units FROM sale_items GROUP BY sale_id) q ON q.sale_id = s.id";

/// SQL for a period's bucket label and bucket start date.
fn bucket_sql(period: Period) -> (&'static str, &'static str) {
    match period {
        Period::Daily => ("s.sale_date", "s.sale_date"),
        Period::Weekly => (
            "date(s.sale_date, '-6 days', 'weekday 1')",
            "date(s.sale_date, '-6 days', 'weekday 1')",
        ),
        Period::Monthly => ("strftime('%Y-%m', s.sale_date)", "date(s.sale_date, 'start of month')"),
        Period::Yearly => ("strftime('%Y', s.sale_date)", "date(s.sale_date, 'start of year')"),
    }
}

/// Repository for metrics queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        ReportRepository { pool, timeout }
    }

    // =========================================================================
    // Sales Metrics
    // =========================================================================

    /// Totals, a bucketed series and the top products for the period window
    /// ending `today`.
    pub async fn sales_metrics(
        &self,
        period: Period,
        branch_id: Option<i64>,
        today: NaiveDate,
    ) -> DbResult<SalesMetrics> {
        let date_from = period.window_start(today);

        bounded(self.timeout, async {
            debug!(period = period.as_str(), ?branch_id, %date_from, %today, "Computing sales metrics");

            let (total_sales, total_transactions, total_products): (Money, i64, i64) =
                sqlx::query_as(&format!(
                    r#"
                    SELECT COALESCE(SUM(s.total_amount), 0),
                           COUNT(s.id),
                           COALESCE(SUM(q.units), 0)
                    FROM sales s
                    {}
                    WHERE {}
                    "#,
                    UNITS_PER_SALE, SALES_WINDOW
                ))
                .bind(date_from)
                .bind(today)
                .bind(branch_id)
                .fetch_one(&self.pool)
                .await?;

            let (label, start) = bucket_sql(period);
            let period_sales = sqlx::query_as::<_, PeriodSales>(&format!(
                r#"
                SELECT {label} AS period,
                       MIN({start}) AS period_date,
                       COALESCE(SUM(s.total_amount), 0) AS amount,
                       COUNT(s.id) AS transactions,
                       COALESCE(SUM(q.units), 0) AS products
                FROM sales s
                {units}
                WHERE {window}
                GROUP BY {label}
                ORDER BY period_date
                "#,
                label = label,
                start = start,
                units = UNITS_PER_SALE,
                window = SALES_WINDOW
            ))
            .bind(date_from)
            .bind(today)
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await?;

            let top_products = sqlx::query_as::<_, TopProduct>(&format!(
                r#"
                SELECT p.id, p.name, p.category,
                       SUM(si.quantity) AS total_quantity,
                       SUM(si.quantity * si.price) AS total_amount
                FROM sale_items si
                JOIN sales s ON s.id = si.sale_id
                JOIN products p ON p.id = si.product_id
                WHERE {}
                GROUP BY p.id, p.name, p.category
                ORDER BY total_amount DESC, p.id
                LIMIT ?4
                "#,
                SALES_WINDOW
            ))
            .bind(date_from)
            .bind(today)
            .bind(branch_id)
            .bind(TOP_PRODUCTS_LIMIT)
            .fetch_all(&self.pool)
            .await?;

            Ok(SalesMetrics {
                total_sales,
                total_transactions,
                total_products,
                period_sales,
                top_products,
                period,
                date_from,
                date_to: today,
                branch_id,
            })
        })
        .await
    }

    // =========================================================================
    // Branch Performance
    // =========================================================================

    /// Per-branch activity over the last 30 days plus current stock.
    pub async fn branch_performance(
        &self,
        branch_id: Option<i64>,
        today: NaiveDate,
    ) -> DbResult<BranchPerformance> {
        let date_from = performance_window_start(today);

        bounded(self.timeout, async {
            debug!(?branch_id, %date_from, %today, "Computing branch performance");

            let activity = sqlx::query_as::<_, BranchActivity>(
                r#"
                SELECT b.id, b.name, b.manager,
                       (SELECT COUNT(*) FROM sales s
                         WHERE s.branch_id = b.id AND s.sale_date >= ?1 AND s.sale_date <= ?2)
                           AS total_sales,
                       COALESCE((SELECT SUM(s.total_amount) FROM sales s
                         WHERE s.branch_id = b.id AND s.sale_date >= ?1 AND s.sale_date <= ?2), 0)
                           AS total_amount,
                       (SELECT COUNT(DISTINCT si.product_id) FROM sale_items si
                         JOIN sales s ON s.id = si.sale_id
                         WHERE s.branch_id = b.id AND s.sale_date >= ?1 AND s.sale_date <= ?2)
                           AS unique_products,
                       COALESCE((SELECT SUM(si.quantity) FROM sale_items si
                         JOIN sales s ON s.id = si.sale_id
                         WHERE s.branch_id = b.id AND s.sale_date >= ?1 AND s.sale_date <= ?2), 0)
                           AS total_products,
                       COALESCE((SELECT SUM(i.quantity) FROM inventory i
                         WHERE i.branch_id = b.id), 0)
                           AS total_inventory,
                       COALESCE((SELECT SUM(i.quantity * p.price) FROM inventory i
                         JOIN products p ON p.id = i.product_id
                         WHERE i.branch_id = b.id), 0)
                           AS inventory_value
                FROM branches b
                WHERE ?3 IS NULL OR b.id = ?3
                ORDER BY b.id
                "#,
            )
            .bind(date_from)
            .bind(today)
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await?;

            Ok(BranchPerformance::from_activity(activity, date_from, today))
        })
        .await
    }

    // =========================================================================
    // Inventory Metrics
    // =========================================================================

    /// Stock totals, per-category rollup and the low-stock list.
    pub async fn inventory_metrics(&self, branch_id: Option<i64>) -> DbResult<InventoryMetrics> {
        bounded(self.timeout, async {
            debug!(?branch_id, "Computing inventory metrics");

            let category = format!("COALESCE(NULLIF(p.category, ''), '{}')", UNCATEGORIZED);

            let (total_items, total_value, unique_products, unique_categories): (i64, Money, i64, i64) =
                sqlx::query_as(&format!(
                    r#"
                    SELECT COALESCE(SUM(i.quantity), 0),
                           COALESCE(SUM(i.quantity * p.price), 0),
                           COUNT(DISTINCT i.product_id),
                           COUNT(DISTINCT {})
                    FROM inventory i
                    JOIN products p ON p.id = i.product_id
                    WHERE ?1 IS NULL OR i.branch_id = ?1
                    "#,
                    category
                ))
                .bind(branch_id)
                .fetch_one(&self.pool)
                .await?;

            let categories = sqlx::query_as::<_, CategoryRollup>(&format!(
                r#"
                SELECT {category} AS category,
                       SUM(i.quantity) AS total_items,
                       SUM(i.quantity * p.price) AS total_value,
                       COUNT(DISTINCT i.product_id) AS unique_products
                FROM inventory i
                JOIN products p ON p.id = i.product_id
                WHERE ?1 IS NULL OR i.branch_id = ?1
                GROUP BY {category}
                ORDER BY total_value DESC, category
                "#,
                category = category
            ))
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await?;

            let low_stock = sqlx::query_as::<_, LowStockItem>(
                r#"
                SELECT p.id, p.name, p.category, i.quantity, p.price,
                       i.quantity * p.price AS value,
                       b.id AS branch_id, b.name AS branch_name
                FROM inventory i
                JOIN products p ON p.id = i.product_id
                JOIN branches b ON b.id = i.branch_id
                WHERE (?1 IS NULL OR i.branch_id = ?1) AND i.quantity <= ?2
                ORDER BY i.quantity, p.name, b.id
                "#,
            )
            .bind(branch_id)
            .bind(LOW_STOCK_THRESHOLD)
            .fetch_all(&self.pool)
            .await?;

            Ok(InventoryMetrics {
                total_items,
                total_value,
                unique_products,
                unique_categories,
                categories,
                low_stock,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use crate::Database;
    use branchline_core::access::Actor;
    use branchline_core::schema::{NewSale, NewSaleItem};
    use branchline_core::types::Role;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn sell(db: &Database, branch: i64, on: NaiveDate, lines: &[(i64, i64, i64)]) {
        let items: Vec<NewSaleItem> = lines
            .iter()
            .map(|&(product_id, quantity, cents)| NewSaleItem {
                product_id,
                quantity,
                price: Money::from_cents(cents),
            })
            .collect();
        let total_amount = items.iter().map(|i| i.price.multiply_quantity(i.quantity)).sum();
        let admin = Actor::new(1, "admin", Role::Admin, None);

        db.sales()
            .record(
                &NewSale {
                    branch_id: branch,
                    sale_date: on,
                    total_amount,
                    items,
                },
                &admin,
            )
            .await
            .unwrap();
    }

    struct Fixture {
        db: Database,
        north: i64,
        south: i64,
        cola: i64,
        chips: i64,
    }

    async fn fixture() -> Fixture {
        let db = fixtures::db().await;
        fixtures::user(&db, "admin", Role::Admin, None).await;
        let north = fixtures::branch(&db, "North").await;
        let south = fixtures::branch(&db, "South").await;
        let cola = fixtures::product(&db, "Cola", 200, Some("Drinks")).await;
        let chips = fixtures::product(&db, "Chips", 100, None).await;
        fixtures::stock(&db, north, cola, 50).await;
        fixtures::stock(&db, north, chips, 50).await;
        fixtures::stock(&db, south, cola, 50).await;

        Fixture {
            db,
            north,
            south,
            cola,
            chips,
        }
    }

    #[tokio::test]
    async fn test_sales_metrics_totals_and_buckets() {
        let f = fixture().await;
        let today = date(2024, 3, 20);

        // two lines in one sale must count the sale once
        sell(&f.db, f.north, date(2024, 3, 18), &[(f.cola, 2, 200), (f.chips, 3, 100)]).await;
        sell(&f.db, f.north, date(2024, 2, 10), &[(f.cola, 1, 200)]).await;
        sell(&f.db, f.south, date(2024, 3, 19), &[(f.cola, 5, 200)]).await;
        // outside the monthly window
        sell(&f.db, f.north, date(2022, 1, 1), &[(f.cola, 1, 200)]).await;

        let all = f.db.reports().sales_metrics(Period::Monthly, None, today).await.unwrap();
        assert_eq!(all.total_transactions, 3);
        assert_eq!(all.total_sales.cents(), 700 + 200 + 1000);
        assert_eq!(all.total_products, 5 + 1 + 5);
        assert_eq!(all.date_from, date(2023, 3, 20));

        let labels: Vec<&str> = all.period_sales.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(labels, vec!["2024-02", "2024-03"]);
        assert_eq!(all.period_sales[1].period_date, date(2024, 3, 1));
        assert_eq!(all.period_sales[1].transactions, 2);
        assert_eq!(all.period_sales[1].amount.cents(), 1700);

        assert_eq!(all.top_products[0].id, f.cola);
        assert_eq!(all.top_products[0].total_quantity, 8);
        assert_eq!(all.top_products[0].total_amount.cents(), 1600);

        let north = f
            .db
            .reports()
            .sales_metrics(Period::Monthly, Some(f.north), today)
            .await
            .unwrap();
        assert_eq!(north.total_transactions, 2);
        assert_eq!(north.branch_id, Some(f.north));
    }

    #[tokio::test]
    async fn test_weekly_buckets_start_on_monday() {
        let f = fixture().await;
        // 2024-03-13 is a Wednesday, 2024-03-17 a Sunday
        sell(&f.db, f.north, date(2024, 3, 13), &[(f.cola, 1, 200)]).await;
        sell(&f.db, f.north, date(2024, 3, 17), &[(f.cola, 1, 200)]).await;
        sell(&f.db, f.north, date(2024, 3, 18), &[(f.cola, 1, 200)]).await;

        let weekly = f
            .db
            .reports()
            .sales_metrics(Period::Weekly, None, date(2024, 3, 20))
            .await
            .unwrap();

        let buckets: Vec<(&str, i64)> = weekly
            .period_sales
            .iter()
            .map(|p| (p.period.as_str(), p.transactions))
            .collect();
        assert_eq!(buckets, vec![("2024-03-11", 2), ("2024-03-18", 1)]);
    }

    #[tokio::test]
    async fn test_branch_performance() {
        let f = fixture().await;
        let today = date(2024, 3, 20);
        sell(&f.db, f.north, date(2024, 3, 1), &[(f.cola, 2, 200), (f.chips, 1, 100)]).await;
        sell(&f.db, f.north, date(2024, 3, 2), &[(f.cola, 1, 200)]).await;
        // older than 30 days
        sell(&f.db, f.south, date(2024, 1, 2), &[(f.cola, 1, 200)]).await;

        let report = f.db.reports().branch_performance(None, today).await.unwrap();
        assert_eq!(report.total_branches, 2);
        assert_eq!(report.active_branches, 1);

        let north = &report.branch_data[0];
        assert_eq!(north.id, f.north);
        assert_eq!(north.total_sales, 2);
        assert_eq!(north.total_amount.cents(), 700);
        assert_eq!(north.avg_sale.cents(), 350);
        assert_eq!(north.unique_products, 2);
        assert_eq!(north.total_products, 4);
        assert_eq!(north.total_inventory, 47 + 49);
        assert_eq!(north.inventory_value.cents(), 47 * 200 + 49 * 100);

        let south_only = f
            .db
            .reports()
            .branch_performance(Some(f.south), today)
            .await
            .unwrap();
        assert_eq!(south_only.total_branches, 1);
        assert_eq!(south_only.branch_data[0].total_sales, 0);
    }

    #[tokio::test]
    async fn test_inventory_metrics() {
        let f = fixture().await;
        sell(&f.db, f.south, date(2024, 3, 1), &[(f.cola, 47, 200)]).await;

        let all = f.db.reports().inventory_metrics(None).await.unwrap();
        assert_eq!(all.total_items, 50 + 50 + 3);
        assert_eq!(all.total_value.cents(), 53 * 200 + 50 * 100);
        assert_eq!(all.unique_products, 2);
        assert_eq!(all.unique_categories, 2);

        let names: Vec<&str> = all.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Drinks", UNCATEGORIZED]);

        assert_eq!(all.low_stock.len(), 1);
        assert_eq!(all.low_stock[0].branch_id, f.south);
        assert_eq!(all.low_stock[0].quantity, 3);
        assert_eq!(all.low_stock[0].value.cents(), 600);

        let north = f.db.reports().inventory_metrics(Some(f.north)).await.unwrap();
        assert_eq!(north.total_items, 100);
        assert!(north.low_stock.is_empty());
    }
}
