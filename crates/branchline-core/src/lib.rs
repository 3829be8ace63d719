//! # branchline-core: Pure Business Logic for Branchline
//!
//! This crate holds the rules of the business: who may touch which branch,
//! whether a branch can fill a sale, what a valid request looks like, and how
//! report windows are computed. It performs no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Branchline Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    apps/api (axum)                              │    │
//! │  │    extract Actor ──► validate schema ──► call repository        │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │             ★ branchline-core (THIS CRATE) ★                    │    │
//! │  │                                                                 │    │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐   │    │
//! │  │   │ schema  │ │ access  │ │inventory │ │ report  │ │ money  │   │    │
//! │  │   │requests │ │ Actor   │ │  guard   │ │ periods │ │ cents  │   │    │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘   │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                 branchline-db (Database Layer)                  │    │
//! │  │          SQLite, migrations, repositories, sale transaction     │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Branch, Product, Sale, User, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`schema`] - Request payloads with declarative validation
//! - [`validation`] - Custom validators and error flattening
//! - [`access`] - Access Policy (role and branch scoping)
//! - [`inventory`] - Inventory Guard
//! - [`report`] - Report periods and response shapes
//!
//! ## Example Usage
//!
//! ```rust
//! use branchline_core::access::Actor;
//! use branchline_core::inventory::{aggregate_demand, check_line, StockLevel};
//! use branchline_core::money::Money;
//! use branchline_core::schema::NewSaleItem;
//! use branchline_core::types::Role;
//!
//! let clerk = Actor::new(3, "clerk", Role::Employee, Some(1));
//! clerk.authorize_branch(1).unwrap();
//!
//! let items = [NewSaleItem { product_id: 1, quantity: 5, price: Money::from_cents(199) }];
//! let stock = StockLevel { product_id: 1, product_name: "Cola".into(), quantity: 3 };
//!
//! let demand = aggregate_demand(&items).unwrap();
//! assert!(check_line(&demand[0], Some(&stock), 1).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod error;
pub mod inventory;
pub mod money;
pub mod report;
pub mod schema;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{AccessError, Actor};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
