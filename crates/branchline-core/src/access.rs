//! # Access Policy
//!
//! Role and branch scoping rules, applied the same way by every handler.
//!
//! ## Rules
//! ```text
//! ┌──────────────┬──────────────────────────┬──────────────────────────────┐
//! │ Role         │ Branch-scoped reads      │ Writes                       │
//! ├──────────────┼──────────────────────────┼──────────────────────────────┤
//! │ admin        │ any branch, as requested │ everything                   │
//! │ manager      │ narrowed to own branch   │ sales + inventory, own branch│
//! │ employee     │ narrowed to own branch   │ sales, own branch            │
//! └──────────────┴──────────────────────────┴──────────────────────────────┘
//!
//!   Reads:  requested branch_id ──► scope_branch() ──► own branch (silently)
//!   Writes: target branch_id    ──► authorize_branch() ──► 403 on mismatch
//! ```
//!
//! Staff with no assigned branch are not narrowed; they see what they ask for.
//!
//! ## Example
//! ```rust
//! use branchline_core::access::Actor;
//! use branchline_core::types::Role;
//!
//! let clerk = Actor::new(7, "clerk", Role::Employee, Some(2));
//! assert_eq!(clerk.scope_branch(Some(1)), Some(2));
//! assert!(clerk.authorize_branch(1).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Role;

// =============================================================================
// Access Error
// =============================================================================

/// Authorization failures. Always surfaced as 403, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Administrator permissions required")]
    AdminRequired,

    #[error("Administrator or manager permissions required")]
    ManagerRequired,

    #[error("Not authorized for branch {requested}")]
    BranchMismatch { requested: i64, assigned: i64 },

    #[error("Not authorized to view this user")]
    NotSelf,
}

pub type AccessResult<T> = Result<T, AccessError>;

// =============================================================================
// Actor
// =============================================================================

/// The authenticated caller of one request.
///
/// Built from a verified token and passed explicitly into every operation
/// that needs identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub branch_id: Option<i64>,
}

impl Actor {
    pub fn new(user_id: i64, username: impl Into<String>, role: Role, branch_id: Option<i64>) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            branch_id,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role.is_unrestricted()
    }

    /// The branch a caller is pinned to, if any.
    fn pinned_branch(&self) -> Option<i64> {
        if self.role.is_unrestricted() {
            None
        } else {
            self.branch_id
        }
    }

    /// Resolves the branch filter for a branch-scoped read.
    ///
    /// Admins and unassigned staff get what they requested; assigned staff
    /// always get their own branch.
    pub fn scope_branch(&self, requested: Option<i64>) -> Option<i64> {
        self.pinned_branch().or(requested)
    }

    /// Checks a branch-scoped write or single-record read.
    pub fn authorize_branch(&self, branch_id: i64) -> AccessResult<()> {
        match self.pinned_branch() {
            Some(assigned) if assigned != branch_id => Err(AccessError::BranchMismatch {
                requested: branch_id,
                assigned,
            }),
            _ => Ok(()),
        }
    }

    pub fn require_admin(&self) -> AccessResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AccessError::AdminRequired)
        }
    }

    /// Inventory additions need admin or manager, then branch authorization.
    pub fn require_inventory_writer(&self, branch_id: i64) -> AccessResult<()> {
        if !self.role.can_add_inventory() {
            return Err(AccessError::ManagerRequired);
        }
        self.authorize_branch(branch_id)
    }

    /// Admins may read any user; everyone else only themselves.
    pub fn authorize_user_read(&self, user_id: i64) -> AccessResult<()> {
        if self.is_admin() || self.user_id == user_id {
            Ok(())
        } else {
            Err(AccessError::NotSelf)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
