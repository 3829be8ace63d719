//! # Branch Repository
//!
//! Branch CRUD. Branches are never deleted: sales and inventory hang off them.

use std::time::Duration;

use branchline_core::schema::{BranchUpdate, NewBranch};
use branchline_core::types::Branch;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::bounded;

/// Repository for branch database operations.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        BranchRepository { pool, timeout }
    }

    /// Inserts a branch and returns its id.
    pub async fn create(&self, branch: &NewBranch) -> DbResult<i64> {
        bounded(self.timeout, async {
            debug!(name = %branch.name, "Creating branch");

            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO branches (name, address, phone, manager, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                RETURNING id
                "#,
            )
            .bind(&branch.name)
            .bind(&branch.address)
            .bind(&branch.phone)
            .bind(&branch.manager)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

            Ok(id)
        })
        .await
    }

    pub async fn get(&self, id: i64) -> DbResult<Branch> {
        bounded(self.timeout, async {
            sqlx::query_as::<_, Branch>(
                "SELECT id, name, address, phone, manager, created_at FROM branches WHERE id = ?1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Branch", id))
        })
        .await
    }

    /// All branches ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Branch>> {
        bounded(self.timeout, async {
            let branches = sqlx::query_as::<_, Branch>(
                "SELECT id, name, address, phone, manager, created_at FROM branches ORDER BY name, id",
            )
            .fetch_all(&self.pool)
            .await?;

            Ok(branches)
        })
        .await
    }

    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        bounded(self.timeout, async {
            let found: Option<i64> = sqlx::query_scalar("SELECT id FROM branches WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(found.is_some())
        })
        .await
    }

    /// Applies the present fields of `update`. Absent fields are untouched.
    pub async fn update(&self, id: i64, update: &BranchUpdate) -> DbResult<Branch> {
        if update.is_empty() {
            return self.get(id).await;
        }

        bounded(self.timeout, async {
            debug!(branch_id = id, "Updating branch");

            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE branches SET ");
            let mut fields = query.separated(", ");
            if let Some(name) = &update.name {
                fields.push("name = ").push_bind_unseparated(name.clone());
            }
            if let Some(address) = &update.address {
                fields.push("address = ").push_bind_unseparated(address.clone());
            }
            if let Some(phone) = &update.phone {
                fields.push("phone = ").push_bind_unseparated(phone.clone());
            }
            if let Some(manager) = &update.manager {
                fields.push("manager = ").push_bind_unseparated(manager.clone());
            }
            query.push(" WHERE id = ").push_bind(id);

            let result = query.build().execute(&self.pool).await?;
            if result.rows_affected() == 0 {
                return Err(DbError::not_found("Branch", id));
            }
            Ok(())
        })
        .await?;

        self.get(id).await
    }
}
