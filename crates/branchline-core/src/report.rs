//! # Report Math
//!
//! Period windows and the response shapes of the three metrics reports. The
//! SQL lives in `branchline-db::repository::report`; this module owns what
//! the numbers mean.
//!
//! ## Periods
//! ```text
//! ┌──────────┬────────────────────┬───────────────────────────────┐
//! │ period   │ window             │ bucket label                  │
//! ├──────────┼────────────────────┼───────────────────────────────┤
//! │ daily    │ last 30 days       │ YYYY-MM-DD                    │
//! │ weekly   │ last 12 weeks      │ YYYY-MM-DD (Monday of week)   │
//! │ monthly  │ last 12 months     │ YYYY-MM                       │
//! │ yearly   │ last 5 years       │ YYYY                          │
//! └──────────┴────────────────────┴───────────────────────────────┘
//! Anything else is treated as monthly.
//! ```

use chrono::{Duration, Months, NaiveDate};
use serde::Serialize;

use crate::money::Money;

/// Inventory at or below this quantity is reported as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Number of products in the top-products ranking.
pub const TOP_PRODUCTS_LIMIT: i64 = 10;

/// Branch performance looks back this many days.
pub const PERFORMANCE_WINDOW_DAYS: i64 = 30;

/// Category label for products without one.
pub const UNCATEGORIZED: &str = "Uncategorized";

// =============================================================================
// Period
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    /// Parses a period name, falling back to monthly.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("daily") => Period::Daily,
            Some("weekly") => Period::Weekly,
            Some("yearly") => Period::Yearly,
            _ => Period::Monthly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }

    /// First day included in the report, given today's date.
    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        let start = match self {
            Period::Daily => today.checked_sub_signed(Duration::days(30)),
            Period::Weekly => today.checked_sub_signed(Duration::weeks(12)),
            Period::Monthly => today.checked_sub_months(Months::new(12)),
            Period::Yearly => today.checked_sub_months(Months::new(12 * 5)),
        };
        start.unwrap_or(NaiveDate::MIN)
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Monthly
    }
}

/// First day of the branch performance window.
pub fn performance_window_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_signed(Duration::days(PERFORMANCE_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN)
}

// =============================================================================
// Sales Metrics
// =============================================================================

/// One bucket of the sales time series.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PeriodSales {
    pub period: String,
    pub period_date: NaiveDate,
    pub amount: Money,
    pub transactions: i64,
    pub products: i64,
}

/// A product ranked by revenue within the window.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TopProduct {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub total_quantity: i64,
    pub total_amount: Money,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesMetrics {
    pub total_sales: Money,
    pub total_transactions: i64,
    pub total_products: i64,
    pub period_sales: Vec<PeriodSales>,
    pub top_products: Vec<TopProduct>,
    pub period: Period,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    #[serde(rename = "branch_id")]
    pub branch_id: Option<i64>,
}

// =============================================================================
// Branch Performance
// =============================================================================

/// Raw per-branch activity as aggregated by the store.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BranchActivity {
    pub id: i64,
    pub name: String,
    pub manager: Option<String>,
    pub total_sales: i64,
    pub total_amount: Money,
    pub unique_products: i64,
    pub total_products: i64,
    pub total_inventory: i64,
    pub inventory_value: Money,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchPerformanceRow {
    pub id: i64,
    pub name: String,
    pub manager: Option<String>,
    pub total_sales: i64,
    pub total_amount: Money,
    pub avg_sale: Money,
    pub sales_per_day: f64,
    pub unique_products: i64,
    pub total_products: i64,
    /// Revenue in the window for branches with any sales, else zero.
    pub performance: Money,
    pub total_inventory: i64,
    pub inventory_value: Money,
}

impl From<BranchActivity> for BranchPerformanceRow {
    fn from(a: BranchActivity) -> Self {
        let avg_sale = if a.total_sales > 0 {
            Money::from_cents((a.total_amount.cents() as f64 / a.total_sales as f64).round() as i64)
        } else {
            Money::zero()
        };

        let performance = if a.total_sales > 0 {
            a.total_amount
        } else {
            Money::zero()
        };

        Self {
            id: a.id,
            name: a.name,
            manager: a.manager,
            total_sales: a.total_sales,
            total_amount: a.total_amount,
            avg_sale,
            sales_per_day: a.total_sales as f64 / PERFORMANCE_WINDOW_DAYS as f64,
            unique_products: a.unique_products,
            total_products: a.total_products,
            performance,
            total_inventory: a.total_inventory,
            inventory_value: a.inventory_value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchPerformance {
    pub active_branches: i64,
    pub total_branches: i64,
    pub branch_data: Vec<BranchPerformanceRow>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl BranchPerformance {
    /// Builds the report, ordering branches by revenue (highest first).
    pub fn from_activity(activity: Vec<BranchActivity>, date_from: NaiveDate, date_to: NaiveDate) -> Self {
        let mut branch_data: Vec<BranchPerformanceRow> =
            activity.into_iter().map(BranchPerformanceRow::from).collect();
        branch_data.sort_by(|a, b| b.total_amount.cmp(&a.total_amount).then(a.id.cmp(&b.id)));

        let active_branches = branch_data.iter().filter(|b| b.total_sales > 0).count() as i64;

        Self {
            active_branches,
            total_branches: branch_data.len() as i64,
            branch_data,
            date_from,
            date_to,
        }
    }
}

// =============================================================================
// Inventory Metrics
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CategoryRollup {
    pub category: String,
    pub total_items: i64,
    pub total_value: Money,
    pub unique_products: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LowStockItem {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub price: Money,
    pub value: Money,
    pub branch_id: i64,
    pub branch_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMetrics {
    pub total_items: i64,
    pub total_value: Money,
    pub unique_products: i64,
    pub unique_categories: i64,
    pub categories: Vec<CategoryRollup>,
    pub low_stock: Vec<LowStockItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_parse_falls_back_to_monthly() {
        assert_eq!(Period::parse(Some("daily")), Period::Daily);
        assert_eq!(Period::parse(Some("Weekly")), Period::Weekly);
        assert_eq!(Period::parse(Some("yearly")), Period::Yearly);
        assert_eq!(Period::parse(Some("fortnightly")), Period::Monthly);
        assert_eq!(Period::parse(None), Period::Monthly);
    }

    #[test]
    fn test_window_start() {
        let today = date(2024, 3, 31);
        assert_eq!(Period::Daily.window_start(today), date(2024, 3, 1));
        assert_eq!(Period::Weekly.window_start(today), date(2024, 1, 7));
        assert_eq!(Period::Monthly.window_start(today), date(2023, 3, 31));
        assert_eq!(Period::Yearly.window_start(today), date(2019, 3, 31));
        assert_eq!(performance_window_start(today), date(2024, 3, 1));
    }

    fn activity(id: i64, sales: i64, amount_cents: i64) -> BranchActivity {
        BranchActivity {
            id,
            name: format!("Branch {}", id),
            manager: None,
            total_sales: sales,
            total_amount: Money::from_cents(amount_cents),
            unique_products: 0,
            total_products: 0,
            total_inventory: 0,
            inventory_value: Money::zero(),
        }
    }

    #[test]
    fn test_branch_performance_derivations() {
        let report = BranchPerformance::from_activity(
            vec![activity(1, 0, 0), activity(2, 3, 1000)],
            date(2024, 3, 1),
            date(2024, 3, 31),
        );

        assert_eq!(report.total_branches, 2);
        assert_eq!(report.active_branches, 1);

        let top = &report.branch_data[0];
        assert_eq!(top.id, 2);
        assert_eq!(top.avg_sale.cents(), 333);
        assert_eq!(top.performance.cents(), 1000);
        assert!((top.sales_per_day - 0.1).abs() < 1e-9);

        let idle = &report.branch_data[1];
        assert!(idle.avg_sale.is_zero());
        assert!(idle.performance.is_zero());
    }

    #[test]
    fn test_sales_metrics_wire_keys() {
        let metrics = SalesMetrics {
            total_sales: Money::from_cents(1500),
            total_transactions: 2,
            total_products: 4,
            period_sales: vec![],
            top_products: vec![],
            period: Period::Monthly,
            date_from: date(2023, 3, 31),
            date_to: date(2024, 3, 31),
            branch_id: Some(2),
        };
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["totalSales"], 15.0);
        assert_eq!(json["totalTransactions"], 2);
        assert_eq!(json["period"], "monthly");
        assert_eq!(json["dateFrom"], "2023-03-31");
        assert_eq!(json["branch_id"], 2);
    }
}
