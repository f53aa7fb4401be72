//! # Repository Module
//!
//! Storage ports for the point of sale, and their adapters.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Ports and Adapters                                   │
//! │                                                                         │
//! │  CheckoutService (keystone-admin)                                      │
//! │       │                                                                 │
//! │       │  Arc<dyn ItemRepository>, Arc<dyn CustomerRepository>          │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────┐      ┌──────────────────────────┐        │
//! │  │  memory (tests, demos)   │      │  item / customer (SQLite)│        │
//! │  │  Mutex<HashMap<..>>      │      │  sqlx::SqlitePool        │        │
//! │  └──────────────────────────┘      └──────────────────────────┘        │
//! │                                                                         │
//! │  Both adapters obey the same contract: decrement_stock never takes    │
//! │  stock below zero, record_purchase adds to the lifetime total.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ItemRepository`] - Catalog lookup and stock movements
//! - [`CustomerRepository`] - Customer lookup and purchase totals

use async_trait::async_trait;

use keystone_core::validation::{
    validate_email, validate_name, validate_price_cents, validate_sku, validate_stock,
    validate_uuid,
};
use keystone_core::{Customer, Item, Money, ValidationError};

use crate::error::{DbError, DbResult};

pub mod customer;
pub mod item;
pub mod memory;

pub use customer::SqliteCustomerRepository;
pub use item::SqliteItemRepository;
pub use memory::{InMemoryCustomerRepository, InMemoryItemRepository};

/// Catalog items and their stock.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Gets an item by id.
    async fn get(&self, id: &str) -> DbResult<Option<Item>>;

    /// Gets an item by SKU.
    async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Item>>;

    /// Active items ordered by name.
    async fn list_active(&self, limit: u32) -> DbResult<Vec<Item>>;

    /// Inserts a new item.
    ///
    /// ## Errors
    /// - `InvalidArgument` for a malformed id, SKU or name, or a negative
    ///   price or stock
    /// - `UniqueViolation` when the id or SKU is taken
    async fn insert(&self, item: &Item) -> DbResult<()>;

    /// Replaces an item's fields; `updated_at` is set to now.
    ///
    /// Validated like [`ItemRepository::insert`].
    async fn update(&self, item: &Item) -> DbResult<()>;

    /// Takes `quantity` units out of stock and returns the remaining stock.
    ///
    /// ## Errors
    /// - `InsufficientStock` if the stock would go negative (nothing changes)
    /// - `NotFound` for an unknown id
    /// - `InvalidArgument` for a non-positive quantity
    async fn decrement_stock(&self, id: &str, quantity: i64) -> DbResult<i64>;

    /// Adds `quantity` units to stock and returns the new stock.
    async fn restock(&self, id: &str, quantity: i64) -> DbResult<i64>;
}

/// Customers and their purchase history.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn get(&self, id: &str) -> DbResult<Option<Customer>>;

    /// Inserts a new customer.
    ///
    /// ## Errors
    /// - `InvalidArgument` for a malformed id, name or email
    /// - `UniqueViolation` when the id or email is taken
    async fn insert(&self, customer: &Customer) -> DbResult<()>;

    /// Adds `amount` to the lifetime total, bumps the purchase count and
    /// returns the updated customer.
    async fn record_purchase(&self, id: &str, amount: Money) -> DbResult<Customer>;
}

pub(crate) fn ensure_positive(field: &str, quantity: i64) -> DbResult<()> {
    if quantity <= 0 {
        return Err(DbError::InvalidArgument(format!(
            "{} must be positive, got {}",
            field, quantity
        )));
    }
    Ok(())
}

/// Field checks shared by both item adapters, run before any write.
pub(crate) fn validate_item(item: &Item) -> DbResult<()> {
    validate_uuid(&item.id)
        .and_then(|_| validate_sku(&item.sku))
        .and_then(|_| validate_name("name", &item.name))
        .and_then(|_| validate_price_cents(item.price_cents))
        .and_then(|_| validate_stock(item.stock))
        .map_err(invalid)
}

pub(crate) fn validate_customer(customer: &Customer) -> DbResult<()> {
    validate_uuid(&customer.id)
        .and_then(|_| validate_name("name", &customer.name))
        .and_then(|_| validate_email(&customer.email))
        .map_err(invalid)
}

fn invalid(err: ValidationError) -> DbError {
    DbError::InvalidArgument(err.to_string())
}
