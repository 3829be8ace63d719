//! # Request Schemas
//!
//! Every inbound payload and query string, declared once with its
//! constraints. Handlers deserialize into these types and call
//! [`validator::Validate::validate`] exactly once at the boundary; nothing
//! downstream re-checks shape.
//!
//! ## Constraint Summary
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────────────┐
//! │ Schema           │ Rules                                                │
//! ├──────────────────┼──────────────────────────────────────────────────────┤
//! │ NewSale          │ ≥1 item, total ≥ 0, sale_date YYYY-MM-DD             │
//! │ NewSaleItem      │ 1 ≤ quantity ≤ 1,000,000, price ≥ 0                  │
//! │ NewBranch        │ name ≥3, address ≥5, phone format, manager ≥3        │
//! │ BranchUpdate     │ same per field, at least one field                   │
//! │ NewProduct       │ name ≥2, price ≥ 0                                   │
//! │ InventoryAddition│ 1 ≤ quantity ≤ 1,000,000                             │
//! │ NewUser          │ username ≥3, password ≥6, full_name ≥3, email format │
//! └──────────────────┴──────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::money::Money;
use crate::types::Role;
use crate::validation::{non_negative_money, validate_phone};

/// Largest quantity a single sale line or stock addition may carry.
pub const MAX_QUANTITY: i64 = 1_000_000;

fn nothing_to_update() -> validator::ValidationError {
    let mut err = validator::ValidationError::new("empty_update");
    err.message = Some("No fields to update".into());
    err
}

// =============================================================================
// Authentication
// =============================================================================

/// Login payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

// =============================================================================
// Sales
// =============================================================================

/// One submitted sale line.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSaleItem {
    pub product_id: i64,
    #[validate(range(min = 1, max = 1000000, message = "quantity must be between 1 and 1000000"))]
    pub quantity: i64,
    /// Unit price charged on this sale. Stored as-is.
    #[validate(custom = "non_negative_money")]
    pub price: Money,
}

/// Create-sale payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSale {
    pub branch_id: i64,
    pub sale_date: NaiveDate,
    #[validate(custom = "non_negative_money")]
    pub total_amount: Money,
    #[validate(length(min = 1, message = "a sale needs at least one item"))]
    #[validate]
    pub items: Vec<NewSaleItem>,
}

// =============================================================================
// Branches
// =============================================================================

/// Create-branch payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewBranch {
    #[validate(length(min = 3))]
    pub name: String,
    #[validate(length(min = 5))]
    pub address: String,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    #[validate(length(min = 3))]
    pub manager: Option<String>,
}

/// Partial branch update. Only present fields change.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "require_branch_field"))]
pub struct BranchUpdate {
    #[validate(length(min = 3))]
    pub name: Option<String>,
    #[validate(length(min = 5))]
    pub address: Option<String>,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    #[validate(length(min = 3))]
    pub manager: Option<String>,
}

impl BranchUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.phone.is_none() && self.manager.is_none()
    }
}

fn require_branch_field(update: &BranchUpdate) -> Result<(), validator::ValidationError> {
    if update.is_empty() {
        return Err(nothing_to_update());
    }
    Ok(())
}

// =============================================================================
// Products
// =============================================================================

/// Create-product payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 2))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(custom = "non_negative_money")]
    pub price: Money,
}

/// Partial product update.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "require_product_field"))]
pub struct ProductUpdate {
    #[validate(length(min = 2))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(custom = "non_negative_money")]
    pub price: Option<Money>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
    }
}

fn require_product_field(update: &ProductUpdate) -> Result<(), validator::ValidationError> {
    if update.is_empty() {
        return Err(nothing_to_update());
    }
    Ok(())
}

// =============================================================================
// Inventory
// =============================================================================

/// Add-stock payload. Adds to the existing quantity or creates the record.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InventoryAddition {
    pub branch_id: i64,
    pub product_id: i64,
    #[validate(range(min = 1, max = 1000000, message = "quantity must be between 1 and 1000000"))]
    pub quantity: i64,
}

// =============================================================================
// Users
// =============================================================================

/// Register-user payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 3))]
    pub username: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 3))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Role,
    pub branch_id: Option<i64>,
}

/// Partial user update (admin only).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "require_user_field"))]
pub struct UserUpdate {
    #[validate(length(min = 3))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub branch_id: Option<i64>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.branch_id.is_none()
            && self.password.is_none()
    }
}

fn require_user_field(update: &UserUpdate) -> Result<(), validator::ValidationError> {
    if update.is_empty() {
        return Err(nothing_to_update());
    }
    Ok(())
}

// =============================================================================
// Query Filters
// =============================================================================

/// `GET /api/sales` filters. Dates are inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalesFilter {
    pub branch_id: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// `GET /api/inventory` filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryFilter {
    pub branch_id: Option<i64>,
    pub product_id: Option<i64>,
}

/// `GET /api/products` filters. `name` is a case-insensitive substring.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub name: Option<String>,
}

/// `GET /api/metrics/*` parameters. Unknown periods fall back to monthly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsFilter {
    pub period: Option<String>,
    pub branch_id: Option<i64>,
}

// =============================================================================
// Unit Tests
// =============================================================================
