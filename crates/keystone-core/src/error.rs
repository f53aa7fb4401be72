//! # Error Types
//!
//! Domain-specific error types for keystone-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  keystone-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule rejections                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  keystone-db errors (separate crate)                                   │
//! │  └── DbError          - Persistence failures                           │
//! │                                                                         │
//! │  keystone-admin errors                                                 │
//! │  └── ApiError         - What the dashboard sees (serialized)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Dashboard              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rejections Are Not Failures
//! `InsufficientStock`, `InvalidPayment` and `Unauthorized` are expected
//! outcomes of a single user action. The operation that returns them leaves
//! its input untouched, so the caller can show a notification and carry on.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Item is not in the catalog.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Item exists but is not offered for sale.
    #[error("Item {0} is not available for sale")]
    ItemInactive(String),

    /// Cart mutation would exceed available stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 1, already 3 in cart)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "MOUSE-01", available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 MOUSE-01 in stock"
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Checkout attempted with a missing payment method or short cash.
    #[error("Invalid payment: {reason}")]
    InvalidPayment { reason: String },

    /// Actor lacks the permission required for an action.
    #[error("Not authorized: missing permission {permission}")]
    Unauthorized { permission: String },

    /// Transaction is not in a state that accepts the operation.
    ///
    /// ## When This Occurs
    /// - Adding lines after checkout was requested
    /// - Confirming payment on a cancelled transaction
    /// - Cancelling a completed transaction
    #[error("Transaction is {status}, cannot {action}")]
    InvalidTransition { status: String, action: String },

    /// Checkout requested on an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Role table document is inconsistent.
    #[error("Invalid role table: {0}")]
    InvalidRoleTable(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidPayment error.
    pub fn invalid_payment(reason: impl Into<String>) -> Self {
        CoreError::InvalidPayment {
            reason: reason.into(),
        }
    }

    /// Creates an InvalidTransition error.
    pub fn invalid_transition(status: impl ToString, action: impl Into<String>) -> Self {
        CoreError::InvalidTransition {
            status: status.to_string(),
            action: action.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate role id).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
