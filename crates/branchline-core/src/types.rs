//! # Domain Types
//!
//! Core domain types used throughout Branchline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │     Branch      │   │    Product      │   │      User       │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  id             │   │  id             │   │  id             │        │
//! │  │  name, address  │   │  name, category │   │  username       │        │
//! │  │  phone, manager │   │  price (Money)  │   │  role, branch?  │        │
//! │  └────────┬────────┘   └────────┬────────┘   └─────────────────┘        │
//! │           │                     │                                       │
//! │           └──────────┬──────────┘                                       │
//! │                      ▼                                                  │
//! │        ┌──────────────────────────┐     ┌──────────────────────────┐    │
//! │        │     InventoryRecord      │     │          Sale            │    │
//! │        │  (branch, product) → qty │     │  header + Vec<SaleItem>  │    │
//! │        │  UNIQUE pair, qty >= 0   │     │  price snapshot per line │    │
//! │        └──────────────────────────┘     └──────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity uses an integer primary key assigned by the store. Sales and
//! their items are immutable once written; everything else is edited in place.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// The role a user holds. Drives the Access Policy in [`crate::access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unrestricted: every branch, every administrative write.
    Admin,
    /// Branch-scoped, may also add inventory.
    Manager,
    /// Branch-scoped, may record sales.
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }

    /// Whether this role sees every branch.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Whether this role may add stock to a branch.
    pub fn can_add_inventory(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// User
// =============================================================================

/// A person who can log in.
///
/// `password_hash` is an argon2 PHC string and never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Role,
    /// Branch the user works at. `None` for admins and unassigned staff.
    pub branch_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Branch
// =============================================================================

/// A physical location. Identity boundary for inventory and access scoping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    /// Manager's display name (free text, not a user reference).
    pub manager: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the shared catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Current list price. Sales snapshot their own price per line.
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Stock of one product at one branch.
///
/// ## Invariants
/// - At most one record per `(branch_id, product_id)`
/// - `quantity >= 0` at all times
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryRecord {
    pub id: i64,
    pub branch_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub last_updated: DateTime<Utc>,
}

/// An inventory record joined with its product and branch, as listed to
/// clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryEntry {
    pub id: i64,
    pub branch_id: i64,
    pub branch_name: String,
    pub product_id: i64,
    pub product_name: String,
    pub category: Option<String>,
    pub price: Money,
    pub quantity: i64,
    pub last_updated: DateTime<Utc>,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale. Sales are recorded whole, so every stored sale is
/// `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale with its line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: i64,
    pub branch_id: i64,
    pub branch_name: String,
    pub sale_date: NaiveDate,
    /// Total as submitted by the client.
    pub total_amount: Money,
    pub created_by: i64,
    pub created_by_username: Option<String>,
    pub status: SaleStatus,
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern: `price` is the price submitted with the sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub price: Money,
}

impl SaleItem {
    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Audit Events
// =============================================================================

/// Kind of state change recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    LoginSuccess,
    LoginFailed,
    UserCreated,
    UserUpdated,
    SaleCreated,
    BranchCreated,
    BranchUpdated,
    InventoryAdded,
    ProductCreated,
    ProductUpdated,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::LoginSuccess => "login_success",
            AuditEventType::LoginFailed => "login_failed",
            AuditEventType::UserCreated => "user_created",
            AuditEventType::UserUpdated => "user_updated",
            AuditEventType::SaleCreated => "sale_created",
            AuditEventType::BranchCreated => "branch_created",
            AuditEventType::BranchUpdated => "branch_updated",
            AuditEventType::InventoryAdded => "inventory_added",
            AuditEventType::ProductCreated => "product_created",
            AuditEventType::ProductUpdated => "product_updated",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted audit log entry. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditEvent {
    pub id: i64,
    pub event_type: String,
    /// Username of whoever triggered the event (attempted username for
    /// failed logins).
    pub actor: Option<String>,
    pub entity_id: Option<i64>,
    /// JSON object with event-specific detail.
    pub details: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Admin.is_unrestricted());
        assert!(!Role::Manager.is_unrestricted());
        assert!(Role::Manager.can_add_inventory());
        assert!(!Role::Employee.can_add_inventory());
    }

    #[test]
    fn test_user_serialization_hides_password() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            full_name: "Alice Doe".to_string(),
            email: None,
            role: Role::Manager,
            branch_id: Some(2),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "manager");
        assert_eq!(json["branch_id"], 2);
    }

    #[test]
    fn test_sale_item_line_total() {
        let item = SaleItem {
            id: 1,
            sale_id: 1,
            product_id: 1,
            product_name: "Cola".to_string(),
            category: None,
            quantity: 3,
            price: Money::from_cents(250),
        };
        assert_eq!(item.line_total().cents(), 750);
    }
}
