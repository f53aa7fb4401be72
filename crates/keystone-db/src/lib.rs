//! # keystone-db: Storage for the Keystone Back Office
//!
//! Repository ports for the point of sale and their two adapters: an
//! in-memory one for tests and demos, and SQLite via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Keystone Data Flow                               │
//! │                                                                         │
//! │  CheckoutService::confirm_payment (keystone-admin)                     │
//! │       │  Effect::DecrementStock, Effect::IncrementCustomerTotal        │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     keystone-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐ │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │ │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │ │   │
//! │  │   │               │    │ ItemRepository     │  │            │ │   │
//! │  │   │ SqlitePool    │◄───│ CustomerRepository │  │ 001_init   │ │   │
//! │  │   │               │    │ memory / sqlite    │  │            │ │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (path from AdminConfig)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Opening the store and handing out adapters
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository traits and adapters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keystone_db::{Database, DbConfig, ItemRepository};
//!
//! let db = Database::new(DbConfig::new("path/to/keystone.db")).await?;
//! let item = db.items().get("uuid-here").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    CustomerRepository, InMemoryCustomerRepository, InMemoryItemRepository, ItemRepository,
    SqliteCustomerRepository, SqliteItemRepository,
};
