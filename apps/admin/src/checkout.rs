//! # Checkout Service
//!
//! Point-of-sale operations for the dashboard: every call is gated by the
//! authorizer, catalog data comes from the [`ItemRepository`], and the
//! effects of a completed sale are applied to the repositories here.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Service                                     │
//! │                                                                         │
//! │  start ──► add_item / update_quantity / remove_item / attach_customer  │
//! │                         │            (Building)                         │
//! │                         ▼                                               │
//! │                     checkout ──► totals frozen (AwaitingPayment)        │
//! │                         │                                               │
//! │                         ▼                                               │
//! │                     complete(method, cash)                              │
//! │                       1. select payment on a copy, mark it settling     │
//! │                       2. re-check stock in the repository               │
//! │                       3. confirm the copy                               │
//! │                       4. apply effects (decrement stock, credit buyer) │
//! │                       5. drop the transaction from the registry         │
//! │                                                                         │
//! │  A failure in 1-4 leaves the stored transaction exactly as it was and  │
//! │  undoes any stock already taken.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry lock is only held while reading or writing the map, never
//! across a repository call. A settling transaction is read-only until its
//! payment resolves. Completed and cancelled transactions are handed back to
//! the caller and forgotten.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use keystone_core::{
    Actor, Authorizer, CheckoutOutcome, Effect, Item, Money, PaymentMethod, TaxRate, Transaction,
};
use keystone_db::{CustomerRepository, ItemRepository};

use crate::error::{ApiError, ApiResult, ErrorCode};

/// Opens the point of sale (read-only access).
pub const PERM_POS_VIEW: &str = "pos.view";

/// Rings up transactions.
pub const PERM_POS_CREATE: &str = "pos.create";

/// A completed sale as returned to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSale {
    pub transaction: Transaction,
    pub outcome: CheckoutOutcome,
}

impl CompletedSale {
    pub fn change(&self) -> Money {
        self.outcome.change()
    }
}

/// Transactions that have not finished yet.
#[derive(Debug, Default)]
struct Registry {
    open: HashMap<String, Transaction>,
    /// Ids whose payment is being applied right now.
    settling: HashSet<String>,
}

impl Registry {
    fn get(&self, transaction_id: &str) -> ApiResult<&Transaction> {
        self.open
            .get(transaction_id)
            .ok_or_else(|| ApiError::not_found("Transaction", transaction_id))
    }

    fn editable(&mut self, transaction_id: &str) -> ApiResult<&mut Transaction> {
        if self.settling.contains(transaction_id) {
            return Err(ApiError::new(
                ErrorCode::BusinessLogic,
                format!("Transaction {} is being completed", transaction_id),
            ));
        }
        self.open
            .get_mut(transaction_id)
            .ok_or_else(|| ApiError::not_found("Transaction", transaction_id))
    }
}

/// Point-of-sale service over injected repositories.
pub struct CheckoutService {
    authorizer: Authorizer,
    items: Arc<dyn ItemRepository>,
    customers: Arc<dyn CustomerRepository>,
    tax_rate: TaxRate,
    registry: Mutex<Registry>,
}

impl CheckoutService {
    pub fn new(
        authorizer: Authorizer,
        items: Arc<dyn ItemRepository>,
        customers: Arc<dyn CustomerRepository>,
        tax_rate: TaxRate,
    ) -> Self {
        CheckoutService {
            authorizer,
            items,
            customers,
            tax_rate,
            registry: Mutex::new(Registry::default()),
        }
    }

    fn authorize(&self, actor: &Actor, permission: &str) -> ApiResult<()> {
        self.authorizer.ensure_permission(actor, permission).map_err(|e| {
            warn!(actor = %actor.id, permission, "Permission denied");
            ApiError::from(e)
        })
    }

    async fn load_item(&self, item_id: &str) -> ApiResult<Item> {
        self.items
            .get(item_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Item", item_id))
    }

    /// Runs `f` against the stored transaction and returns a snapshot.
    async fn with_transaction<F>(&self, transaction_id: &str, f: F) -> ApiResult<Transaction>
    where
        F: FnOnce(&mut Transaction) -> ApiResult<()>,
    {
        let mut registry = self.registry.lock().await;
        let transaction = registry.editable(transaction_id)?;
        f(transaction)?;
        Ok(transaction.clone())
    }

    /// Number of transactions still open, settling ones included.
    pub async fn open_count(&self) -> usize {
        self.registry.lock().await.open.len()
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Opens a new transaction.
    pub async fn start(&self, actor: &Actor) -> ApiResult<Transaction> {
        self.authorize(actor, PERM_POS_CREATE)?;

        let transaction = Transaction::new(self.tax_rate);
        info!(transaction_id = %transaction.id(), actor = %actor.id, "Transaction started");

        self.registry
            .lock()
            .await
            .open
            .insert(transaction.id().to_string(), transaction.clone());
        Ok(transaction)
    }

    /// Snapshot of an open transaction. Finished transactions are gone.
    pub async fn get(&self, actor: &Actor, transaction_id: &str) -> ApiResult<Transaction> {
        self.authorize(actor, PERM_POS_VIEW)?;
        self.registry.lock().await.get(transaction_id).cloned()
    }

    /// Adds `quantity` of an item, checking against current stock.
    pub async fn add_item(
        &self,
        actor: &Actor,
        transaction_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> ApiResult<Transaction> {
        self.authorize(actor, PERM_POS_CREATE)?;
        debug!(transaction_id, item_id, quantity, "add_item");

        let item = self.load_item(item_id).await?;
        self.with_transaction(transaction_id, |transaction| {
            let cart = transaction.cart_mut()?;
            cart.refresh_stock(&item);
            cart.add_line(&item, quantity)?;
            Ok(())
        })
        .await
    }

    /// Sets a line's quantity; zero or less removes the line.
    pub async fn update_quantity(
        &self,
        actor: &Actor,
        transaction_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> ApiResult<Transaction> {
        self.authorize(actor, PERM_POS_CREATE)?;
        debug!(transaction_id, item_id, quantity, "update_quantity");

        let item = if quantity > 0 {
            Some(self.load_item(item_id).await?)
        } else {
            None
        };

        self.with_transaction(transaction_id, |transaction| {
            let cart = transaction.cart_mut()?;
            if let Some(item) = &item {
                cart.refresh_stock(item);
            }
            cart.update_line_quantity(item_id, quantity)?;
            Ok(())
        })
        .await
    }

    pub async fn remove_item(
        &self,
        actor: &Actor,
        transaction_id: &str,
        item_id: &str,
    ) -> ApiResult<Transaction> {
        self.authorize(actor, PERM_POS_CREATE)?;
        debug!(transaction_id, item_id, "remove_item");

        self.with_transaction(transaction_id, |transaction| {
            transaction.remove_line(item_id)?;
            Ok(())
        })
        .await
    }

    /// Applies a whole-percent discount to a line (0 clears it).
    pub async fn set_discount(
        &self,
        actor: &Actor,
        transaction_id: &str,
        item_id: &str,
        percent: i64,
    ) -> ApiResult<Transaction> {
        self.authorize(actor, PERM_POS_CREATE)?;
        debug!(transaction_id, item_id, percent, "set_discount");

        self.with_transaction(transaction_id, |transaction| {
            transaction.set_line_discount(item_id, percent)?;
            Ok(())
        })
        .await
    }

    /// Attaches a known customer, or detaches with `None`.
    pub async fn attach_customer(
        &self,
        actor: &Actor,
        transaction_id: &str,
        customer_id: Option<&str>,
    ) -> ApiResult<Transaction> {
        self.authorize(actor, PERM_POS_CREATE)?;

        if let Some(id) = customer_id {
            if self.customers.get(id).await?.is_none() {
                return Err(ApiError::not_found("Customer", id));
            }
        }

        self.with_transaction(transaction_id, |transaction| {
            transaction.set_customer(customer_id.map(str::to_string))?;
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Freezes the totals and waits for payment.
    pub async fn checkout(&self, actor: &Actor, transaction_id: &str) -> ApiResult<Transaction> {
        self.authorize(actor, PERM_POS_CREATE)?;

        let transaction = self
            .with_transaction(transaction_id, |transaction| {
                transaction.checkout()?;
                Ok(())
            })
            .await?;

        info!(
            transaction_id,
            total_cents = transaction.totals().total_cents,
            "Awaiting payment"
        );
        Ok(transaction)
    }

    /// Returns an awaiting transaction to editing.
    pub async fn resume_editing(
        &self,
        actor: &Actor,
        transaction_id: &str,
    ) -> ApiResult<Transaction> {
        self.authorize(actor, PERM_POS_CREATE)?;
        self.with_transaction(transaction_id, |transaction| {
            transaction.resume_editing()?;
            Ok(())
        })
        .await
    }

    /// Takes payment and completes the sale.
    ///
    /// `cash_received` is the decimal amount typed by the cashier and is
    /// only read for cash payments. On success the transaction leaves the
    /// registry; on failure it is left untouched.
    ///
    /// ## Errors
    /// - `PaymentError` when no amount is given or it does not cover the total
    /// - `InsufficientStock` when the catalog no longer holds a line's quantity
    /// - `BusinessLogic` when the transaction is not awaiting payment or is
    ///   already being completed
    pub async fn complete(
        &self,
        actor: &Actor,
        transaction_id: &str,
        method: PaymentMethod,
        cash_received: Option<&str>,
    ) -> ApiResult<CompletedSale> {
        self.authorize(actor, PERM_POS_CREATE)?;
        debug!(transaction_id, %method, "complete");

        let mut pending = {
            let mut registry = self.registry.lock().await;
            let mut pending = registry.editable(transaction_id)?.clone();
            pending.select_payment(method, cash_received)?;
            registry.settling.insert(transaction_id.to_string());
            pending
        };

        let result = self.settle(transaction_id, &mut pending).await;

        let mut registry = self.registry.lock().await;
        registry.settling.remove(transaction_id);
        let outcome = result?;
        registry.open.remove(transaction_id);
        drop(registry);

        info!(
            transaction_id,
            total_cents = pending.totals().total_cents,
            change_cents = outcome.change_cents,
            "Sale completed"
        );

        Ok(CompletedSale {
            transaction: pending,
            outcome,
        })
    }

    /// Re-checks stock, confirms `pending` and applies its effects.
    async fn settle(
        &self,
        transaction_id: &str,
        pending: &mut Transaction,
    ) -> ApiResult<CheckoutOutcome> {
        for line in pending.cart().lines() {
            let item = self.load_item(&line.item_id).await?;
            if !item.can_fulfil(line.quantity) {
                warn!(
                    transaction_id,
                    sku = %line.sku,
                    available = item.stock,
                    requested = line.quantity,
                    "Stock changed since checkout"
                );
                return Err(ApiError::new(
                    ErrorCode::InsufficientStock,
                    format!(
                        "Insufficient stock for {}: {} available, {} requested",
                        line.sku, item.stock, line.quantity
                    ),
                ));
            }
        }

        let outcome = pending.confirm_payment()?;
        self.apply_effects(transaction_id, &outcome.effects).await?;
        Ok(outcome)
    }

    /// Applies effects in order. On failure, stock already taken is put back.
    async fn apply_effects(&self, transaction_id: &str, effects: &[Effect]) -> ApiResult<()> {
        let mut taken: Vec<(&str, i64)> = Vec::new();

        for effect in effects {
            let result = match effect {
                Effect::DecrementStock { item_id, quantity } => self
                    .items
                    .decrement_stock(item_id, *quantity)
                    .await
                    .map(|remaining| {
                        debug!(item_id = %item_id, remaining, "Stock taken");
                        taken.push((item_id.as_str(), *quantity));
                    }),
                Effect::IncrementCustomerTotal {
                    customer_id,
                    amount_cents,
                } => self
                    .customers
                    .record_purchase(customer_id, Money::from_cents(*amount_cents))
                    .await
                    .map(|customer| {
                        debug!(
                            customer_id = %customer_id,
                            purchase_total_cents = customer.purchase_total_cents,
                            "Purchase recorded"
                        );
                    }),
            };

            if let Err(e) = result {
                warn!(transaction_id, error = %e, "Effect failed, restoring stock");
                for (item_id, quantity) in taken {
                    if let Err(restore) = self.items.restock(item_id, quantity).await {
                        error!(item_id, quantity, error = %restore, "Failed to restore stock");
                    }
                }
                return Err(e.into());
            }
        }

        Ok(())
    }

    /// Abandons a transaction that is not yet completed and forgets it.
    pub async fn cancel(&self, actor: &Actor, transaction_id: &str) -> ApiResult<Transaction> {
        self.authorize(actor, PERM_POS_CREATE)?;

        let mut registry = self.registry.lock().await;
        let cancelled = {
            let transaction = registry.editable(transaction_id)?;
            transaction.cancel()?;
            transaction.clone()
        };
        registry.open.remove(transaction_id);
        drop(registry);

        info!(transaction_id, "Transaction cancelled");
        Ok(cancelled)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
