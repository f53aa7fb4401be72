//! # In-Memory Repositories
//!
//! `HashMap`-backed adapters for tests and local demos. Each call takes the
//! lock once and releases it before returning, so every operation is
//! atomic with respect to the others.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use keystone_core::{Customer, Item, Money};

use super::{
    ensure_positive, validate_customer, validate_item, CustomerRepository, ItemRepository,
};
use crate::error::{DbError, DbResult};

fn lock<T>(mutex: &Mutex<T>) -> DbResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| DbError::Internal("in-memory store lock poisoned".to_string()))
}

// =============================================================================
// Items
// =============================================================================

/// In-memory [`ItemRepository`].
#[derive(Debug, Default)]
pub struct InMemoryItemRepository {
    items: Mutex<HashMap<String, Item>>,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository seeded with `items`.
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let items = items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        InMemoryItemRepository {
            items: Mutex::new(items),
        }
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn get(&self, id: &str) -> DbResult<Option<Item>> {
        Ok(lock(&self.items)?.get(id).cloned())
    }

    async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Item>> {
        Ok(lock(&self.items)?
            .values()
            .find(|item| item.sku == sku)
            .cloned())
    }

    async fn list_active(&self, limit: u32) -> DbResult<Vec<Item>> {
        let mut items: Vec<Item> = lock(&self.items)?
            .values()
            .filter(|item| item.is_active)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn insert(&self, item: &Item) -> DbResult<()> {
        validate_item(item)?;
        let mut items = lock(&self.items)?;
        if items.contains_key(&item.id) {
            return Err(DbError::duplicate("id", &item.id));
        }
        if items.values().any(|existing| existing.sku == item.sku) {
            return Err(DbError::duplicate("sku", &item.sku));
        }
        items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn update(&self, item: &Item) -> DbResult<()> {
        validate_item(item)?;
        let mut items = lock(&self.items)?;
        if items
            .values()
            .any(|existing| existing.sku == item.sku && existing.id != item.id)
        {
            return Err(DbError::duplicate("sku", &item.sku));
        }
        let existing = items
            .get_mut(&item.id)
            .ok_or_else(|| DbError::not_found("Item", &item.id))?;
        *existing = Item {
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..item.clone()
        };
        Ok(())
    }

    async fn decrement_stock(&self, id: &str, quantity: i64) -> DbResult<i64> {
        ensure_positive("quantity", quantity)?;
        let mut items = lock(&self.items)?;
        let item = items
            .get_mut(id)
            .ok_or_else(|| DbError::not_found("Item", id))?;

        if item.stock < quantity {
            return Err(DbError::InsufficientStock {
                id: id.to_string(),
                available: item.stock,
                requested: quantity,
            });
        }

        item.stock -= quantity;
        item.updated_at = Utc::now();
        debug!(id = %id, quantity, remaining = item.stock, "Stock decremented");
        Ok(item.stock)
    }

    async fn restock(&self, id: &str, quantity: i64) -> DbResult<i64> {
        ensure_positive("quantity", quantity)?;
        let mut items = lock(&self.items)?;
        let item = items
            .get_mut(id)
            .ok_or_else(|| DbError::not_found("Item", id))?;
        item.stock += quantity;
        item.updated_at = Utc::now();
        Ok(item.stock)
    }
}

// =============================================================================
// Customers
// =============================================================================

/// In-memory [`CustomerRepository`].
#[derive(Debug, Default)]
pub struct InMemoryCustomerRepository {
    customers: Mutex<HashMap<String, Customer>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customers(customers: impl IntoIterator<Item = Customer>) -> Self {
        let customers = customers
            .into_iter()
            .map(|customer| (customer.id.clone(), customer))
            .collect();
        InMemoryCustomerRepository {
            customers: Mutex::new(customers),
        }
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn get(&self, id: &str) -> DbResult<Option<Customer>> {
        Ok(lock(&self.customers)?.get(id).cloned())
    }

    async fn insert(&self, customer: &Customer) -> DbResult<()> {
        validate_customer(customer)?;
        let mut customers = lock(&self.customers)?;
        if customers.contains_key(&customer.id) {
            return Err(DbError::duplicate("id", &customer.id));
        }
        if customers.values().any(|c| c.email == customer.email) {
            return Err(DbError::duplicate("email", &customer.email));
        }
        customers.insert(customer.id.clone(), customer.clone());
        Ok(())
    }

    async fn record_purchase(&self, id: &str, amount: Money) -> DbResult<Customer> {
        if amount.is_negative() {
            return Err(DbError::InvalidArgument(format!(
                "purchase amount must not be negative, got {}",
                amount
            )));
        }
        let mut customers = lock(&self.customers)?;
        let customer = customers
            .get_mut(id)
            .ok_or_else(|| DbError::not_found("Customer", id))?;
        customer.purchase_total_cents += amount.cents();
        customer.purchase_count += 1;
        customer.updated_at = Utc::now();
        Ok(customer.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cable(stock: i64) -> Item {
        Item::new("CABLE-01", "USB Cable", "Accessories", Money::from_cents(999), stock)
    }

    #[tokio::test]
    async fn test_decrement_stock_never_goes_negative() {
        let item = cable(3);
        let repo = InMemoryItemRepository::with_items([item.clone()]);

        assert_eq!(repo.decrement_stock(&item.id, 2).await.unwrap(), 1);

        let err = repo.decrement_stock(&item.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            }
        ));
        assert_eq!(repo.get(&item.id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_decrement_rejects_bad_input() {
        let item = cable(3);
        let repo = InMemoryItemRepository::with_items([item.clone()]);

        assert!(matches!(
            repo.decrement_stock(&item.id, 0).await,
            Err(DbError::InvalidArgument(_))
        ));
        assert!(matches!(
            repo.decrement_stock("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_sku() {
        let repo = InMemoryItemRepository::new();
        repo.insert(&cable(1)).await.unwrap();

        assert!(matches!(
            repo.insert(&cable(5)).await,
            Err(DbError::UniqueViolation { .. })
        ));
        assert!(repo.get_by_sku("CABLE-01").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_and_update_reject_invalid_fields() {
        let repo = InMemoryItemRepository::new();

        let mut priced_below_zero = cable(1);
        priced_below_zero.price_cents = -1;
        assert!(matches!(
            repo.insert(&priced_below_zero).await,
            Err(DbError::InvalidArgument(_))
        ));
        assert!(repo.get(&priced_below_zero.id).await.unwrap().is_none());

        let mut item = cable(1);
        repo.insert(&item).await.unwrap();
        item.stock = -4;
        assert!(matches!(repo.update(&item).await, Err(DbError::InvalidArgument(_))));
        item.stock = 1;
        item.sku = "has spaces".to_string();
        assert!(matches!(repo.update(&item).await, Err(DbError::InvalidArgument(_))));
        assert_eq!(repo.get(&item.id).await.unwrap().unwrap().sku, "CABLE-01");

        let customers = InMemoryCustomerRepository::new();
        assert!(matches!(
            customers.insert(&Customer::new("Ana", "not-an-email")).await,
            Err(DbError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_list_active_sorted_and_limited() {
        let mut hidden = Item::new("OLD-01", "Aardvark", "Misc", Money::from_cents(1), 1);
        hidden.is_active = false;
        let repo = InMemoryItemRepository::with_items([
            Item::new("B-01", "Banana", "Food", Money::from_cents(50), 9),
            Item::new("A-01", "Apple", "Food", Money::from_cents(40), 9),
            Item::new("C-01", "Cherry", "Food", Money::from_cents(90), 9),
            hidden,
        ]);

        let names: Vec<String> = repo
            .list_active(2)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Apple", "Banana"]);
    }

    #[tokio::test]
    async fn test_update_and_restock() {
        let mut item = cable(1);
        let repo = InMemoryItemRepository::with_items([item.clone()]);

        item.price_cents = 1299;
        repo.update(&item).await.unwrap();
        assert_eq!(repo.restock(&item.id, 4).await.unwrap(), 5);

        let stored = repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.price_cents, 1299);
        assert_eq!(stored.stock, 5);
    }

    #[tokio::test]
    async fn test_record_purchase() {
        let customer = Customer::new("Ana", "ana@example.com");
        let repo = InMemoryCustomerRepository::with_customers([customer.clone()]);

        repo.record_purchase(&customer.id, Money::from_cents(21600))
            .await
            .unwrap();
        let updated = repo
            .record_purchase(&customer.id, Money::from_cents(400))
            .await
            .unwrap();

        assert_eq!(updated.purchase_total_cents, 22000);
        assert_eq!(updated.purchase_count, 2);
        assert!(matches!(
            repo.record_purchase("missing", Money::from_cents(1)).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_customer_email_is_unique() {
        let repo = InMemoryCustomerRepository::new();
        repo.insert(&Customer::new("Ana", "ana@example.com"))
            .await
            .unwrap();
        assert!(repo
            .insert(&Customer::new("Ana B", "ana@example.com"))
            .await
            .is_err());
    }
}
