//! # Audit Repository
//!
//! Append-only log of state-changing operations.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Sale creation                         Everything else                  │
//! │  ─────────────                         ───────────────                  │
//! │  ┌───────────────────────────────┐     operation commits                │
//! │  │       SINGLE TRANSACTION      │          │                           │
//! │  │  INSERT sales / sale_items    │          ▼                           │
//! │  │  UPDATE inventory             │     AuditRepository::record()        │
//! │  │  AuditRepository::record_in() │     (own statement)                  │
//! │  └───────────────────────────────┘                                      │
//! │  COMMIT ← sale and its audit row                                        │
//! │           exist together or not at all                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every event is also emitted as a `tracing` event on the `audit` target.

use std::time::Duration;

use branchline_core::types::{AuditEvent, AuditEventType};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::pool::bounded;

/// Repository for audit log operations.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        AuditRepository { pool, timeout }
    }

    /// Appends an event as its own statement.
    pub async fn record(
        &self,
        event_type: AuditEventType,
        actor: Option<&str>,
        entity_id: Option<i64>,
        details: serde_json::Value,
    ) -> DbResult<i64> {
        bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await?;
            Self::record_in(&mut *conn, event_type, actor, entity_id, details).await
        })
        .await
    }

    /// Appends an event on an existing connection, typically inside a
    /// transaction owned by the caller.
    pub async fn record_in(
        conn: &mut SqliteConnection,
        event_type: AuditEventType,
        actor: Option<&str>,
        entity_id: Option<i64>,
        details: serde_json::Value,
    ) -> DbResult<i64> {
        let details = details.to_string();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO audit_events (event_type, actor, entity_id, details, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(event_type.as_str())
        .bind(actor)
        .bind(entity_id)
        .bind(&details)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        info!(
            target: "audit",
            event = %event_type,
            actor = actor.unwrap_or("-"),
            entity_id = ?entity_id,
            details = %details,
            "Audit event recorded"
        );

        Ok(id)
    }

    /// Most recent events first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<AuditEvent>> {
        bounded(self.timeout, async {
            let events = sqlx::query_as::<_, AuditEvent>(
                r#"
                SELECT id, event_type, actor, entity_id, details, created_at
                FROM audit_events
                ORDER BY id DESC
                LIMIT ?1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

            Ok(events)
        })
        .await
    }

    /// Most recent events of one type first.
    pub async fn by_type(&self, event_type: AuditEventType, limit: i64) -> DbResult<Vec<AuditEvent>> {
        bounded(self.timeout, async {
            let events = sqlx::query_as::<_, AuditEvent>(
                r#"
                SELECT id, event_type, actor, entity_id, details, created_at
                FROM audit_events
                WHERE event_type = ?1
                ORDER BY id DESC
                LIMIT ?2
                "#,
            )
            .bind(event_type.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

            Ok(events)
        })
        .await
    }
}
