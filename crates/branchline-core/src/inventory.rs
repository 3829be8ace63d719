//! # Inventory Guard
//!
//! Decides whether a branch can fill a proposed sale. Pure: the caller reads
//! stock (inside its transaction) and hands the rows in.
//!
//! ## Flow
//! ```text
//! NewSale.items ──► aggregate_demand() ──► [LineDemand] (one per product)
//!                                               │
//!                           stock row per product (read in the sale tx)
//!                                               │
//!                                               ▼
//!                                         check_line()
//!                                               │
//!                     ┌─────────────────────────┼─────────────────────────┐
//!                     ▼                         ▼                         ▼
//!              no record              available < requested              ok
//!        ProductNotStocked           InsufficientStock             next line
//! ```
//!
//! Two lines for the same product are summed first, so lines of 2 + 2 against
//! stock 3 are rejected even though each line alone fits. A sum that does
//! not fit in an `i64` is a validation error, never a wrapped quantity.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::schema::NewSaleItem;

/// Current stock for one product at one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockLevel {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
}

/// Total units of one product requested by a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDemand {
    pub product_id: i64,
    pub quantity: i64,
}

/// Sums requested quantities per product, keeping first-occurrence order.
///
/// ```rust
/// use branchline_core::inventory::aggregate_demand;
/// use branchline_core::money::Money;
/// use branchline_core::schema::NewSaleItem;
///
/// let line = |product_id, quantity| NewSaleItem { product_id, quantity, price: Money::zero() };
/// let demand = aggregate_demand(&[line(4, 2), line(9, 1), line(4, 2)]).unwrap();
///
/// assert_eq!(demand.len(), 2);
/// assert_eq!((demand[0].product_id, demand[0].quantity), (4, 4));
/// ```
pub fn aggregate_demand(items: &[NewSaleItem]) -> CoreResult<Vec<LineDemand>> {
    let mut demand: Vec<LineDemand> = Vec::with_capacity(items.len());

    for item in items {
        match demand.iter_mut().find(|d| d.product_id == item.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(item.quantity).ok_or(
                    ValidationError::QuantityOverflow {
                        product_id: item.product_id,
                    },
                )?;
            }
            None => demand.push(LineDemand {
                product_id: item.product_id,
                quantity: item.quantity,
            }),
        }
    }

    Ok(demand)
}

/// Checks one aggregated line against the stock row read for it.
pub fn check_line(demand: &LineDemand, stock: Option<&StockLevel>, branch_id: i64) -> CoreResult<()> {
    let Some(stock) = stock else {
        return Err(CoreError::ProductNotStocked {
            product_id: demand.product_id,
            branch_id,
        });
    };

    if stock.quantity < demand.quantity {
        return Err(CoreError::InsufficientStock {
            product_name: stock.product_name.clone(),
            available: stock.quantity,
            requested: demand.quantity,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
