//! # Checkout
//!
//! Transaction state machine for the point of sale.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Transaction Lifecycle                              │
//! │                                                                         │
//! │   ┌──────────┐   checkout()    ┌─────────────────┐  confirm_payment()   │
//! │   │ Building │ ──────────────► │ AwaitingPayment │ ─────────────────┐   │
//! │   └────┬─────┘ ◄────────────── └────────┬────────┘                  │   │
//! │        │       resume_editing()         │                           ▼   │
//! │        │                                │ cancel()          ┌───────────┐
//! │        │ cancel()                       ▼                   │ Completed │
//! │        │                         ┌───────────┐              └───────────┘
//! │        └───────────────────────► │ Cancelled │                          │
//! │                                  └───────────┘                          │
//! │                                                                         │
//! │  Completed and Cancelled are terminal. Any operation the current state │
//! │  does not accept returns InvalidTransition and changes nothing.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Effects
//! A completed transaction does not touch stock or customers itself. It
//! returns [`Effect`] values; the service layer applies them through the
//! repositories.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::{compute_change, Cart, CartTotals};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Item, PaymentMethod, TaxRate};

// =============================================================================
// Status
// =============================================================================

/// Lifecycle state of a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Building,
    AwaitingPayment,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    /// Completed and Cancelled accept no further operations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Cancelled)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Building => write!(f, "building"),
            TransactionStatus::AwaitingPayment => write!(f, "awaiting payment"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// =============================================================================
// Payment & Effects
// =============================================================================

/// Payment chosen while awaiting payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentSelection {
    pub method: PaymentMethod,
    /// Cash handed over by the customer, only kept for cash payments.
    pub cash_received_cents: Option<i64>,
}

impl PaymentSelection {
    pub fn cash_received(&self) -> Option<Money> {
        self.cash_received_cents.map(Money::from_cents)
    }
}

/// A side effect requested by a completed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Take `quantity` units of an item out of stock.
    DecrementStock { item_id: String, quantity: i64 },
    /// Add `amount_cents` to a customer's lifetime spend.
    IncrementCustomerTotal {
        customer_id: String,
        amount_cents: i64,
    },
}

/// Result of a successful [`Transaction::confirm_payment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutOutcome {
    pub effects: Vec<Effect>,
    pub change_cents: i64,
}

impl CheckoutOutcome {
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A point-of-sale transaction.
///
/// ## Invariants
/// - The cart can only change while `Building`
/// - `totals` is frozen at checkout and cleared on `resume_editing`
/// - A completed transaction never changes again
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    id: String,
    cart: Cart,
    status: TransactionStatus,
    tax_rate: TaxRate,
    customer_id: Option<String>,
    payment: Option<PaymentSelection>,
    totals: Option<CartTotals>,
    #[ts(as = "String")]
    created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Starts an empty transaction taxed at `tax_rate`.
    pub fn new(tax_rate: TaxRate) -> Self {
        Transaction {
            id: Uuid::new_v4().to_string(),
            cart: Cart::new(),
            status: TransactionStatus::Building,
            tax_rate,
            customer_id: None,
            payment: None,
            totals: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn payment(&self) -> Option<&PaymentSelection> {
        self.payment.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Frozen totals after checkout, live totals while building.
    pub fn totals(&self) -> CartTotals {
        self.totals
            .unwrap_or_else(|| self.cart.totals(self.tax_rate))
    }

    fn require(&self, expected: TransactionStatus, action: &str) -> CoreResult<()> {
        if self.status != expected {
            return Err(CoreError::invalid_transition(self.status, action));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Building
    // -------------------------------------------------------------------------

    /// Mutable cart access, only while building.
    pub fn cart_mut(&mut self) -> CoreResult<&mut Cart> {
        self.require(TransactionStatus::Building, "edit the cart")?;
        Ok(&mut self.cart)
    }

    pub fn add_line(&mut self, item: &Item, quantity: i64) -> CoreResult<()> {
        self.cart_mut()?.add_line(item, quantity)
    }

    pub fn update_line_quantity(&mut self, item_id: &str, quantity: i64) -> CoreResult<()> {
        self.cart_mut()?.update_line_quantity(item_id, quantity)
    }

    pub fn remove_line(&mut self, item_id: &str) -> CoreResult<()> {
        self.cart_mut()?.remove_line(item_id);
        Ok(())
    }

    pub fn set_line_discount(&mut self, item_id: &str, percent: i64) -> CoreResult<()> {
        self.cart_mut()?.set_line_discount(item_id, percent)
    }

    /// Attaches (or detaches, with `None`) the customer to credit.
    pub fn set_customer(&mut self, customer_id: Option<String>) -> CoreResult<()> {
        self.require(TransactionStatus::Building, "change the customer")?;
        self.customer_id = customer_id;
        Ok(())
    }

    /// Freezes the totals and waits for payment.
    ///
    /// ## Errors
    /// - `EmptyCart` if there is nothing to sell
    /// - `InvalidTransition` outside `Building`
    pub fn checkout(&mut self) -> CoreResult<()> {
        self.require(TransactionStatus::Building, "check out")?;
        if self.cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        self.totals = Some(self.cart.totals(self.tax_rate));
        self.status = TransactionStatus::AwaitingPayment;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Awaiting Payment
    // -------------------------------------------------------------------------

    /// Records the payment method and, for cash, the amount received.
    ///
    /// `cash_received` is the decimal string typed by the cashier
    /// (`"250.00"`). It is ignored for card and digital payments.
    ///
    /// ## Errors
    /// - `InvalidPayment` if the cash amount does not parse
    /// - `InvalidTransition` outside `AwaitingPayment`
    pub fn select_payment(
        &mut self,
        method: PaymentMethod,
        cash_received: Option<&str>,
    ) -> CoreResult<()> {
        self.require(TransactionStatus::AwaitingPayment, "select a payment")?;

        let cash_received_cents = match (method, cash_received) {
            (PaymentMethod::Cash, Some(raw)) => Some(
                Money::parse_decimal(raw)
                    .map_err(|e| CoreError::invalid_payment(e.to_string()))?
                    .cents(),
            ),
            _ => None,
        };

        self.payment = Some(PaymentSelection {
            method,
            cash_received_cents,
        });
        Ok(())
    }

    /// Goes back to editing the cart; the payment selection is dropped.
    pub fn resume_editing(&mut self) -> CoreResult<()> {
        self.require(TransactionStatus::AwaitingPayment, "resume editing")?;
        self.status = TransactionStatus::Building;
        self.payment = None;
        self.totals = None;
        Ok(())
    }

    /// Completes the sale.
    ///
    /// ## Validation
    /// - A payment method must be selected
    /// - Cash payments need `cash_received >= total`
    ///
    /// On success the transaction is `Completed` and the outcome carries
    /// the change due plus one `DecrementStock` per line and, when a
    /// customer is attached, one `IncrementCustomerTotal` for the total.
    /// On error nothing changes and payment can be selected again.
    pub fn confirm_payment(&mut self) -> CoreResult<CheckoutOutcome> {
        self.require(TransactionStatus::AwaitingPayment, "confirm payment")?;

        let payment = self
            .payment
            .ok_or_else(|| CoreError::invalid_payment("no payment method selected"))?;
        let total = self.totals().total();

        let change = match payment.method {
            PaymentMethod::Cash => {
                let received = payment
                    .cash_received()
                    .ok_or_else(|| CoreError::invalid_payment("cash amount required"))?;
                if received < total {
                    return Err(CoreError::invalid_payment(format!(
                        "cash received {} is less than total {}",
                        received, total
                    )));
                }
                compute_change(received, total)
            }
            PaymentMethod::Card | PaymentMethod::Digital => Money::zero(),
        };

        let mut effects: Vec<Effect> = self
            .cart
            .lines()
            .iter()
            .map(|line| Effect::DecrementStock {
                item_id: line.item_id.clone(),
                quantity: line.quantity,
            })
            .collect();
        if let Some(customer_id) = &self.customer_id {
            effects.push(Effect::IncrementCustomerTotal {
                customer_id: customer_id.clone(),
                amount_cents: total.cents(),
            });
        }

        self.status = TransactionStatus::Completed;
        self.completed_at = Some(Utc::now());

        Ok(CheckoutOutcome {
            effects,
            change_cents: change.cents(),
        })
    }

    /// Abandons the transaction. No effects are produced.
    pub fn cancel(&mut self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::invalid_transition(self.status, "cancel"));
        }
        self.status = TransactionStatus::Cancelled;
        self.payment = None;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> Item {
        Item::new("MON-01", "Monitor", "Electronics", Money::from_cents(10000), 5)
    }

    fn awaiting_payment() -> (Transaction, Item) {
        let item = monitor();
        let mut tx = Transaction::new(TaxRate::from_bps(800));
        tx.add_line(&item, 2).unwrap();
        tx.checkout().unwrap();
        (tx, item)
    }

    #[test]
    fn test_cash_payment_scenario() {
        let (mut tx, item) = awaiting_payment();
        assert_eq!(tx.totals().total_cents, 21600);

        tx.select_payment(PaymentMethod::Cash, Some("200.00")).unwrap();
        assert!(matches!(
            tx.confirm_payment(),
            Err(CoreError::InvalidPayment { .. })
        ));
        assert_eq!(tx.status(), TransactionStatus::AwaitingPayment);

        tx.select_payment(PaymentMethod::Cash, Some("250.00")).unwrap();
        let outcome = tx.confirm_payment().unwrap();

        assert_eq!(outcome.change().cents(), 3400);
        assert_eq!(
            outcome.effects,
            vec![Effect::DecrementStock {
                item_id: item.id.clone(),
                quantity: 2
            }]
        );
        assert_eq!(tx.status(), TransactionStatus::Completed);
        assert!(tx.completed_at().is_some());
    }

    #[test]
    fn test_confirm_requires_method() {
        let (mut tx, _) = awaiting_payment();
        assert_eq!(
            tx.confirm_payment().unwrap_err(),
            CoreError::invalid_payment("no payment method selected")
        );

        tx.select_payment(PaymentMethod::Cash, None).unwrap();
        assert!(matches!(
            tx.confirm_payment(),
            Err(CoreError::InvalidPayment { .. })
        ));
    }

    #[test]
    fn test_unparsable_cash_is_invalid_payment() {
        let (mut tx, _) = awaiting_payment();
        assert!(matches!(
            tx.select_payment(PaymentMethod::Cash, Some("lots")),
            Err(CoreError::InvalidPayment { .. })
        ));
        assert!(tx.payment().is_none());
    }

    #[test]
    fn test_card_payment_with_customer() {
        let (mut tx, _) = awaiting_payment();
        tx.resume_editing().unwrap();
        tx.set_customer(Some("cust-1".to_string())).unwrap();
        tx.checkout().unwrap();

        tx.select_payment(PaymentMethod::Card, Some("999.00")).unwrap();
        assert_eq!(tx.payment().unwrap().cash_received_cents, None);

        let outcome = tx.confirm_payment().unwrap();
        assert_eq!(outcome.change_cents, 0);
        assert_eq!(outcome.effects.len(), 2);
        assert_eq!(
            outcome.effects[1],
            Effect::IncrementCustomerTotal {
                customer_id: "cust-1".to_string(),
                amount_cents: 21600
            }
        );
    }

    #[test]
    fn test_empty_cart_cannot_check_out() {
        let mut tx = Transaction::new(TaxRate::default());
        assert_eq!(tx.checkout(), Err(CoreError::EmptyCart));
        assert_eq!(tx.status(), TransactionStatus::Building);
    }

    #[test]
    fn test_cart_is_locked_after_checkout() {
        let (mut tx, item) = awaiting_payment();

        assert!(matches!(
            tx.add_line(&item, 1),
            Err(CoreError::InvalidTransition { .. })
        ));
        assert!(tx.remove_line(&item.id).is_err());
        assert_eq!(tx.cart().total_quantity(), 2);

        tx.resume_editing().unwrap();
        tx.add_line(&item, 1).unwrap();
        tx.checkout().unwrap();
        assert_eq!(tx.totals().subtotal_cents, 30000);
    }

    #[test]
    fn test_resume_editing_clears_payment() {
        let (mut tx, _) = awaiting_payment();
        tx.select_payment(PaymentMethod::Digital, None).unwrap();

        tx.resume_editing().unwrap();

        assert_eq!(tx.status(), TransactionStatus::Building);
        assert!(tx.payment().is_none());
        assert!(tx.resume_editing().is_err());
    }

    #[test]
    fn test_cancel() {
        let mut building = Transaction::new(TaxRate::default());
        building.cancel().unwrap();
        assert_eq!(building.status(), TransactionStatus::Cancelled);

        let (mut tx, _) = awaiting_payment();
        tx.cancel().unwrap();
        assert_eq!(tx.status(), TransactionStatus::Cancelled);
        assert!(tx.confirm_payment().is_err());
        assert!(tx.cancel().is_err());
    }

    #[test]
    fn test_completed_is_terminal() {
        let (mut tx, _) = awaiting_payment();
        tx.select_payment(PaymentMethod::Card, None).unwrap();
        tx.confirm_payment().unwrap();
        let done = tx.clone();

        assert_eq!(
            tx.cancel().unwrap_err().to_string(),
            "Transaction is completed, cannot cancel"
        );
        assert!(tx.select_payment(PaymentMethod::Cash, Some("1")).is_err());
        assert!(tx.confirm_payment().is_err());
        assert_eq!(tx, done);
    }

    #[test]
    fn test_effect_serializes_with_tag() {
        let effect = Effect::DecrementStock {
            item_id: "i1".to_string(),
            quantity: 3,
        };
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json["type"], "decrement_stock");
        assert_eq!(json["quantity"], 3);
    }
}
