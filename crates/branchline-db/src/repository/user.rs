//! # User Repository
//!
//! Accounts: creation, lookup for login, admin listing and updates.
//! Password hashing happens before this layer; only PHC strings arrive here.

use std::time::Duration;

use branchline_core::schema::{NewUser, UserUpdate};
use branchline_core::types::User;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::bounded;

const USER_COLUMNS: &str =
    "id, username, password_hash, full_name, email, role, branch_id, created_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl UserRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        UserRepository { pool, timeout }
    }

    /// Creates a user and returns its id.
    ///
    /// ## Errors
    /// - `UniqueViolation` if the username is taken
    /// - `ForeignKeyViolation` if `branch_id` names no branch
    pub async fn create(&self, user: &NewUser, password_hash: &str) -> DbResult<i64> {
        bounded(self.timeout, async {
            debug!(username = %user.username, role = %user.role, "Creating user");

            let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?1")
                .bind(&user.username)
                .fetch_optional(&self.pool)
                .await?;
            if taken.is_some() {
                return Err(DbError::duplicate("username", user.username.clone()));
            }

            if let Some(branch_id) = user.branch_id {
                self.require_branch(branch_id).await?;
            }

            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO users (username, password_hash, full_name, email, role, branch_id, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                RETURNING id
                "#,
            )
            .bind(&user.username)
            .bind(password_hash)
            .bind(&user.full_name)
            .bind(&user.email)
            .bind(user.role)
            .bind(user.branch_id)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

            Ok(id)
        })
        .await
    }

    /// Looks a user up for login.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        bounded(self.timeout, async {
            let user = sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE username = ?1",
                USER_COLUMNS
            ))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

            Ok(user)
        })
        .await
    }

    /// Gets a user by id.
    pub async fn get(&self, id: i64) -> DbResult<User> {
        bounded(self.timeout, async {
            sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DbError::not_found("User", id))
        })
        .await
    }

    /// All users ordered by username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        bounded(self.timeout, async {
            let users = sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users ORDER BY username",
                USER_COLUMNS
            ))
            .fetch_all(&self.pool)
            .await?;

            Ok(users)
        })
        .await
    }

    /// Number of users holding a role.
    pub async fn count_with_role(&self, role: branchline_core::types::Role) -> DbResult<i64> {
        bounded(self.timeout, async {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?1")
                .bind(role)
                .fetch_one(&self.pool)
                .await?;
            Ok(count)
        })
        .await
    }

    /// Applies the present fields of `update` and returns the new row.
    ///
    /// `password_hash` replaces the stored hash when given; the caller hashes
    /// `update.password`.
    pub async fn update(&self, id: i64, update: &UserUpdate, password_hash: Option<&str>) -> DbResult<User> {
        bounded(self.timeout, async {
            debug!(user_id = id, "Updating user");

            if let Some(branch_id) = update.branch_id {
                self.require_branch(branch_id).await?;
            }

            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
            let mut fields = query.separated(", ");
            if let Some(full_name) = &update.full_name {
                fields.push("full_name = ").push_bind_unseparated(full_name.clone());
            }
            if let Some(email) = &update.email {
                fields.push("email = ").push_bind_unseparated(email.clone());
            }
            if let Some(role) = update.role {
                fields.push("role = ").push_bind_unseparated(role);
            }
            if let Some(branch_id) = update.branch_id {
                fields.push("branch_id = ").push_bind_unseparated(branch_id);
            }
            if let Some(hash) = password_hash {
                fields.push("password_hash = ").push_bind_unseparated(hash.to_string());
            }
            // keeps the statement valid when only an unhashed field was sent
            fields.push("id = id");
            query.push(" WHERE id = ").push_bind(id);

            let result = query.build().execute(&self.pool).await?;
            if result.rows_affected() == 0 {
                return Err(DbError::not_found("User", id));
            }

            Ok(())
        })
        .await?;

        self.get(id).await
    }

    async fn require_branch(&self, branch_id: i64) -> DbResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM branches WHERE id = ?1")
            .bind(branch_id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Ok(()),
            None => Err(DbError::ForeignKeyViolation {
                message: format!("branch {} does not exist", branch_id),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use branchline_core::types::Role;

    #[tokio::test]
    async fn test_create_and_find() {
        let db = fixtures::db().await;
        let branch = fixtures::branch(&db, "Central").await;
        let id = fixtures::user(&db, "clerk", Role::Employee, Some(branch)).await;

        let user = db.users().find_by_username("clerk").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.branch_id, Some(branch));
        assert!(user.password_hash.starts_with("$argon2"));

        assert!(db.users().find_by_username("nobody").await.unwrap().is_none());
        assert_eq!(db.users().count_with_role(Role::Employee).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let db = fixtures::db().await;
        fixtures::user(&db, "clerk", Role::Employee, None).await;

        let again = NewUser {
            username: "clerk".to_string(),
            password: "secret1".to_string(),
            full_name: "Second Clerk".to_string(),
            email: None,
            role: Role::Employee,
            branch_id: None,
        };
        let err = db.users().create(&again, "$argon2id$x").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_branch_rejected() {
        let db = fixtures::db().await;
        let user = NewUser {
            username: "ghost".to_string(),
            password: "secret1".to_string(),
            full_name: "Ghost Writer".to_string(),
            email: None,
            role: Role::Manager,
            branch_id: Some(99),
        };
        let err = db.users().create(&user, "$argon2id$x").await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_fields() {
        let db = fixtures::db().await;
        let branch = fixtures::branch(&db, "Central").await;
        let id = fixtures::user(&db, "clerk", Role::Employee, None).await;

        let update = UserUpdate {
            role: Some(Role::Manager),
            branch_id: Some(branch),
            ..Default::default()
        };
        let user = db.users().update(id, &update, Some("$argon2id$new")).await.unwrap();

        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.branch_id, Some(branch));
        assert_eq!(user.password_hash, "$argon2id$new");
        assert_eq!(user.full_name, "clerk Tester");

        let missing = db.users().update(404, &update, None).await.unwrap_err();
        assert!(matches!(missing, DbError::NotFound { .. }));
    }
}
