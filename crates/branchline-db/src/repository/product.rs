//! # Product Repository
//!
//! Database operations for the shared product catalog.
//!
//! ## Key Operations
//! - CRUD (admin writes, everyone reads)
//! - Filtering by category and name fragment
//! - Distinct category listing
//!
//! ## Filtering
//! ```text
//! GET /api/products?category=Drinks&name=co
//!        │
//!        ▼
//! WHERE category = 'Drinks' AND LOWER(name) LIKE '%co%'
//!        │
//!        ▼
//! [Cola 330ml, Coconut Water]   (ordered by name)
//! ```
//!
//! Prices are stored as integer cents; sale lines keep their own price
//! snapshot, so editing a price here never rewrites history.

use std::time::Duration;

use branchline_core::schema::{NewProduct, ProductFilter, ProductUpdate};
use branchline_core::types::Product;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::bounded;

const PRODUCT_COLUMNS: &str = "id, name, description, category, price, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let drinks = db.products().list(&ProductFilter {
///     category: Some("Drinks".into()),
///     name: None,
/// }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        ProductRepository { pool, timeout }
    }

    /// Inserts a product and returns its id.
    pub async fn create(&self, product: &NewProduct) -> DbResult<i64> {
        bounded(self.timeout, async {
            debug!(name = %product.name, price = %product.price, "Creating product");
            let now = Utc::now();

            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO products (name, description, category, price, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                RETURNING id
                "#,
            )
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.category)
            .bind(product.price)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

            Ok(id)
        })
        .await
    }

    pub async fn get(&self, id: i64) -> DbResult<Product> {
        bounded(self.timeout, async {
            sqlx::query_as::<_, Product>(&format!(
                "SELECT {} FROM products WHERE id = ?1",
                PRODUCT_COLUMNS
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
        })
        .await
    }

    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        bounded(self.timeout, async {
            let found: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(found.is_some())
        })
        .await
    }

    /// Lists products matching the filter, ordered by name.
    ///
    /// `category` must match exactly; `name` is a case-insensitive substring.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        bounded(self.timeout, async {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "SELECT {} FROM products WHERE 1 = 1",
                PRODUCT_COLUMNS
            ));

            if let Some(category) = &filter.category {
                query.push(" AND category = ").push_bind(category.clone());
            }
            if let Some(name) = filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                query
                    .push(" AND LOWER(name) LIKE ")
                    .push_bind(format!("%{}%", name.to_lowercase()));
            }
            query.push(" ORDER BY name, id");

            let products = query.build_query_as::<Product>().fetch_all(&self.pool).await?;
            Ok(products)
        })
        .await
    }

    /// Distinct non-empty categories, alphabetically.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        bounded(self.timeout, async {
            let categories: Vec<String> = sqlx::query_scalar(
                r#"
                SELECT DISTINCT category FROM products
                WHERE category IS NOT NULL AND category <> ''
                ORDER BY category
                "#,
            )
            .fetch_all(&self.pool)
            .await?;

            Ok(categories)
        })
        .await
    }

    /// Applies the present fields of `update` and bumps `updated_at`.
    pub async fn update(&self, id: i64, update: &ProductUpdate) -> DbResult<Product> {
        bounded(self.timeout, async {
            debug!(product_id = id, "Updating product");

            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE products SET ");
            let mut fields = query.separated(", ");
            if let Some(name) = &update.name {
                fields.push("name = ").push_bind_unseparated(name.clone());
            }
            if let Some(description) = &update.description {
                fields.push("description = ").push_bind_unseparated(description.clone());
            }
            if let Some(category) = &update.category {
                fields.push("category = ").push_bind_unseparated(category.clone());
            }
            if let Some(price) = update.price {
                fields.push("price = ").push_bind_unseparated(price);
            }
            fields.push("updated_at = ").push_bind_unseparated(Utc::now());
            query.push(" WHERE id = ").push_bind(id);

            let result = query.build().execute(&self.pool).await?;
            if result.rows_affected() == 0 {
                return Err(DbError::not_found("Product", id));
            }
            Ok(())
        })
        .await?;

        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use branchline_core::money::Money;

    #[tokio::test]
    async fn test_create_then_get_returns_submitted_values() {
        let db = fixtures::db().await;
        let id = db
            .products()
            .create(&NewProduct {
                name: "Cola 330ml".to_string(),
                description: Some("Can".to_string()),
                category: Some("Drinks".to_string()),
                price: Money::from_cents(199),
            })
            .await
            .unwrap();

        let product = db.products().get(id).await.unwrap();
        assert_eq!(product.name, "Cola 330ml");
        assert_eq!(product.description.as_deref(), Some("Can"));
        assert_eq!(product.category.as_deref(), Some("Drinks"));
        assert_eq!(product.price.cents(), 199);
    }

    #[tokio::test]
    async fn test_filters_and_categories() {
        let db = fixtures::db().await;
        fixtures::product(&db, "Cola", 199, Some("Drinks")).await;
        fixtures::product(&db, "Coconut Water", 250, Some("Drinks")).await;
        fixtures::product(&db, "Corn Chips", 150, Some("Snacks")).await;
        fixtures::product(&db, "Mystery Box", 999, None).await;

        let drinks = db
            .products()
            .list(&ProductFilter {
                category: Some("Drinks".to_string()),
                name: None,
            })
            .await
            .unwrap();
        assert_eq!(drinks.len(), 2);

        let co = db
            .products()
            .list(&ProductFilter {
                category: None,
                name: Some("CO".to_string()),
            })
            .await
            .unwrap();
        let names: Vec<&str> = co.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Coconut Water", "Cola", "Corn Chips"]);

        assert_eq!(db.products().list(&ProductFilter::default()).await.unwrap().len(), 4);
        assert_eq!(db.products().categories().await.unwrap(), vec!["Drinks", "Snacks"]);
    }

    #[tokio::test]
    async fn test_update_price() {
        let db = fixtures::db().await;
        let id = fixtures::product(&db, "Cola", 199, Some("Drinks")).await;

        let update = ProductUpdate {
            price: Some(Money::from_cents(249)),
            ..Default::default()
        };
        let product = db.products().update(id, &update).await.unwrap();

        assert_eq!(product.price.cents(), 249);
        assert_eq!(product.name, "Cola");
        assert!(product.updated_at >= product.created_at);
        assert!(matches!(
            db.products().update(id + 10, &update).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
