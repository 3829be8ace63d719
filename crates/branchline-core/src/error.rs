//! # Error Types
//!
//! Domain-specific error types for branchline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  branchline-core errors (this file + access.rs)                         │
//! │  ├── CoreError        - Business rule violations                        │
//! │  ├── ValidationError  - Input validation failures                       │
//! │  └── AccessError      - Role / branch scope violations                  │
//! │                                                                         │
//! │  branchline-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  HTTP errors (in apps/api)                                              │
//! │  └── ApiError         - What clients see (serialized)                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, ids)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::access::AccessError;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are detected before
/// any mutation is committed, so the caller can always report them verbatim.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The branch holds no inventory record for the product.
    #[error("Product {product_id} is not stocked at branch {branch_id}")]
    ProductNotStocked { product_id: i64, branch_id: i64 },

    /// Insufficient stock to complete sale.
    ///
    /// ## User Workflow
    /// ```text
    /// POST /api/sales (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_name: "Cola", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// 400: "Insufficient stock for 'Cola': available 3, requested 5"
    /// ```
    #[error("Insufficient stock for '{product_name}': available {available}, requested {requested}")]
    InsufficientStock {
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// Caller's role or branch does not permit the operation.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Most request validation is declarative (`validator` derives in
/// [`crate::schema`]); these variants cover the rules that cannot be
/// expressed as annotations, plus a flattened form of schema failures.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Summed sale lines for one product exceed what a quantity can hold.
    #[error("Requested quantity for product {product_id} is too large")]
    QuantityOverflow { product_id: i64 },

    /// One or more schema constraints failed.
    #[error("{0}")]
    Schema(String),
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ValidationError::Schema(crate::validation::describe(&errors))
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_name: "Cola".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for 'Cola': available 3, requested 5"
        );

        let err = CoreError::ProductNotStocked {
            product_id: 7,
            branch_id: 2,
        };
        assert_eq!(err.to_string(), "Product 7 is not stocked at branch 2");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::QuantityOverflow { product_id: 4 };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(
            core_err.to_string(),
            "Validation error: Requested quantity for product 4 is too large"
        );
    }
}
