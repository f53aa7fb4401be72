//! # keystone-core: Pure Business Logic for the Keystone Back Office
//!
//! This crate holds the two rule engines behind the admin dashboard, plus the
//! supporting value types. Everything here is a pure function over in-memory
//! data.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Keystone Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Admin Dashboard (TypeScript)                 │   │
//! │  │  Inventory ─ POS ─ Newsletter ─ Tournaments ─ Players ─ Users  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               keystone-admin (service layer)                    │   │
//! │  │        sessions, CheckoutService, config, logging               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ keystone-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────────────┐    │   │
//! │  │   │   rbac   │ │   cart   │ │ checkout │ │   standings   │    │   │
//! │  │   │ RoleTable│ │ CartLine │ │  Effect  │ │ rank/stable   │    │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └───────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │ Effect intents                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            keystone-db (ItemRepository, CustomerRepository)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`rbac`] - Roles, permissions and the authorization evaluator
//! - [`cart`] - Cart lines, stock checks and totals
//! - [`checkout`] - Transaction state machine and effect intents
//! - [`standings`] - Tournament ranking
//! - [`types`] - Domain records (Item, Customer, Player, Tournament, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use keystone_core::money::Money;
//! use keystone_core::types::TaxRate;
//!
//! let subtotal = Money::from_cents(20000); // $200.00
//! let tax = subtotal.calculate_tax(TaxRate::from_bps(800)); // 8%
//! assert_eq!(tax.cents(), 1600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod rbac;
pub mod standings;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{compute_change, Cart, CartLine, CartTotals};
pub use checkout::{CheckoutOutcome, Effect, PaymentSelection, Transaction, TransactionStatus};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use rbac::{AccessPolicy, Actor, Authorizer, Permission, Role, RoleTable};
pub use standings::{apply_stable_ranks, rank_standings, Standing};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default sales tax rate in basis points (8%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 800;

/// Maximum distinct lines allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps receipts printable.
pub const MAX_CART_LINES: usize = 100;
