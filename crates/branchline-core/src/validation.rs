//! # Validation Module
//!
//! Custom field validators plugged into the `validator` derives in
//! [`crate::schema`], plus the flattening of schema failures into one
//! readable message.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                       │
//! │  ├── Types, required fields, date format, role names                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Schema (validator derives)                                    │
//! │  ├── Lengths, ranges, email                                             │
//! │  └── THIS MODULE: phone format, non-negative money                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (quantity >= 0)                                              │
//! │  ├── UNIQUE constraints                                                 │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::borrow::Cow;

use validator::{ValidationErrors, ValidationErrorsKind};

use crate::money::Money;

/// Allowed length of a phone number (after the optional leading `+`).
const PHONE_MIN_LEN: usize = 7;
const PHONE_MAX_LEN: usize = 20;

fn invalid(code: &'static str, message: &'static str) -> validator::ValidationError {
    let mut err = validator::ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a phone number.
///
/// ## Rules
/// - Optional leading `+`
/// - Then 7 to 20 characters drawn from digits, spaces, `-`, `(` and `)`
///
/// ## Example
/// ```rust
/// use branchline_core::validation::validate_phone;
///
/// assert!(validate_phone("+1 (555) 010-2000").is_ok());
/// assert!(validate_phone("call me").is_err());
/// ```
pub fn validate_phone(phone: &str) -> Result<(), validator::ValidationError> {
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let len = body.chars().count();

    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));

    if !allowed || !(PHONE_MIN_LEN..=PHONE_MAX_LEN).contains(&len) {
        return Err(invalid(
            "phone",
            "phone must be 7-20 digits, spaces, dashes or parentheses",
        ));
    }

    Ok(())
}

/// Validates that a monetary amount is not below zero.
pub fn non_negative_money(amount: &Money) -> Result<(), validator::ValidationError> {
    if amount.is_negative() {
        return Err(invalid("non_negative", "amount must be non-negative"));
    }
    Ok(())
}

// =============================================================================
// Error Flattening
// =============================================================================

/// Flattens `validator` errors into `"field: message; field: message"`.
///
/// Nested paths are dotted (`items[1].quantity`). Output is sorted so the
/// same payload always produces the same message.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut parts = Vec::new();
    collect(errors, "", &mut parts);
    parts.sort();
    parts.join("; ")
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        // struct-level checks land under "__all__"
        let path = if *field == "__all__" {
            prefix.to_string()
        } else if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = match &err.message {
                        Some(message) => message.to_string(),
                        None => default_message(err),
                    };
                    if path.is_empty() {
                        out.push(message);
                    } else {
                        out.push(format!("{}: {}", path, message));
                    }
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

fn default_message(err: &validator::ValidationError) -> String {
    match err.code.as_ref() {
        "length" => match (err.params.get("min"), err.params.get("max")) {
            (Some(min), None) => format!("must be at least {} characters", min),
            (None, Some(max)) => format!("must be at most {} characters", max),
            (Some(min), Some(max)) => format!("must be {} to {} items long", min, max),
            (None, None) => "has invalid length".to_string(),
        },
        "range" => match err.params.get("min") {
            Some(min) => format!("must be at least {}", min),
            None => "is out of range".to_string(),
        },
        "email" => "must be a valid email address".to_string(),
        code => format!("failed '{}' check", code),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
