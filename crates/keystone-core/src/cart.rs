//! # Cart
//!
//! Point-of-sale cart lines, stock checks and monetary totals.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Cashier Action          Cart Method                Stock Rule          │
//! │  ──────────────          ───────────                ──────────          │
//! │                                                                         │
//! │  Click item ────────────► add_line(item, qty) ────► line.qty+qty ≤ stock│
//! │                                                                         │
//! │  Change quantity ───────► update_line_quantity() ─► qty ≤ stock         │
//! │                           (qty ≤ 0 removes)                             │
//! │                                                                         │
//! │  Click remove ──────────► remove_line() ──────────► none (no-op if absent)
//! │                                                                         │
//! │  Totals panel ──────────► compute_subtotal / compute_tax / compute_total│
//! │                                                                         │
//! │  NOTE: Every mutation validates before it writes. A rejected mutation   │
//! │        returns an error and leaves the cart exactly as it was.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pricing
//! ```text
//! line total = unit price × quantity − round(unit price × quantity × discount%)
//! subtotal   = Σ line totals
//! tax        = round(subtotal × rate)
//! total      = subtotal + tax
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Item, TaxRate};
use crate::validation::{validate_cart_size, validate_discount_percent, validate_quantity};

// =============================================================================
// Cart Line
// =============================================================================

/// One catalog item in the cart.
///
/// ## Snapshot Fields
/// `sku`, `name` and `unit_price_cents` are frozen when the item is first
/// added, so a price edit in the catalog does not change a cart in
/// progress. `available_stock` is refreshed on every add and on
/// [`Cart::refresh_stock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub item_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    /// Stock of the referenced item when last seen.
    pub available_stock: i64,
    pub quantity: i64,
    /// Whole-percent discount on this line (0-100).
    pub discount_percent: Option<u8>,
}

impl CartLine {
    fn from_item(item: &Item, quantity: i64) -> Self {
        CartLine {
            item_id: item.id.clone(),
            sku: item.sku.clone(),
            name: item.name.clone(),
            unit_price_cents: item.price_cents,
            available_stock: item.stock,
            quantity,
            discount_percent: None,
        }
    }

    /// Unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Price × quantity, before discount.
    pub fn gross_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// Line total after the line discount.
    pub fn line_total(&self) -> Money {
        match self.discount_percent {
            Some(percent) => self.gross_total().apply_percentage_discount(percent),
            None => self.gross_total(),
        }
    }

    /// Amount taken off by the line discount.
    pub fn discount_amount(&self) -> Money {
        self.gross_total() - self.line_total()
    }

    fn insufficient(&self, available: i64, requested: i64) -> CoreError {
        CoreError::InsufficientStock {
            sku: self.sku.clone(),
            available,
            requested,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The lines of a transaction being built.
///
/// ## Invariants
/// - Lines are unique by `item_id` (adding the same item increases quantity)
/// - Every line has `0 < quantity ≤ available_stock` as of its last mutation
/// - At most [`crate::MAX_CART_LINES`] lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Looks up the line for an item.
    pub fn line(&self, item_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.item_id == item_id)
    }

    fn line_mut(&mut self, item_id: &str) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.item_id == item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Adds `quantity` units of `item`.
    ///
    /// ## Behavior
    /// - Item already in cart: quantity increases, if the new quantity fits
    ///   in stock
    /// - Item not in cart: a new line is appended, if `quantity` fits in stock
    ///
    /// ## Errors
    /// - `InsufficientStock` when the resulting quantity exceeds `item.stock`
    /// - `ItemInactive` for items not offered for sale
    /// - `Validation` for non-positive quantities
    /// - `CartTooLarge` when a new line would exceed the line limit
    ///
    /// The cart is unchanged on every error.
    pub fn add_line(&mut self, item: &Item, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if !item.is_active {
            return Err(CoreError::ItemInactive(item.id.clone()));
        }

        if let Some(line) = self.line_mut(&item.id) {
            let new_quantity = line.quantity + quantity;
            if new_quantity > item.stock {
                return Err(line.insufficient(item.stock, new_quantity));
            }
            line.quantity = new_quantity;
            line.available_stock = item.stock;
            return Ok(());
        }

        validate_cart_size(self.lines.len()).map_err(|_| CoreError::CartTooLarge {
            max: crate::MAX_CART_LINES,
        })?;

        let line = CartLine::from_item(item, quantity);
        if quantity > item.stock {
            return Err(line.insufficient(item.stock, quantity));
        }
        self.lines.push(line);
        Ok(())
    }

    /// Sets the quantity of an existing line.
    ///
    /// ## Behavior
    /// - `quantity <= 0`: removes the line
    /// - `quantity <= available stock`: sets the quantity
    /// - otherwise: `InsufficientStock`, cart unchanged
    /// - item not in cart: no-op
    pub fn update_line_quantity(&mut self, item_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            self.remove_line(item_id);
            return Ok(());
        }

        let Some(line) = self.line_mut(item_id) else {
            return Ok(());
        };

        if quantity > line.available_stock {
            return Err(line.insufficient(line.available_stock, quantity));
        }

        line.quantity = quantity;
        Ok(())
    }

    /// Removes the line for an item; no-op if absent.
    pub fn remove_line(&mut self, item_id: &str) {
        self.lines.retain(|l| l.item_id != item_id);
    }

    /// Sets (or clears, with 0) the discount percentage of a line.
    ///
    /// Absent lines are a no-op, like [`Self::update_line_quantity`].
    pub fn set_line_discount(&mut self, item_id: &str, percent: i64) -> CoreResult<()> {
        let percent = validate_discount_percent(percent)?;
        if let Some(line) = self.line_mut(item_id) {
            line.discount_percent = (percent > 0).then_some(percent);
        }
        Ok(())
    }

    /// Re-reads the available stock of a line from a fresh catalog record.
    ///
    /// The price snapshot is kept. Quantities already above the new stock
    /// are left alone; the next mutation or checkout will see the new limit.
    pub fn refresh_stock(&mut self, item: &Item) {
        if let Some(line) = self.line_mut(&item.id) {
            line.available_stock = item.stock;
        }
    }

    /// Lines whose quantity exceeds their last known stock.
    pub fn oversold_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|l| l.quantity > l.available_stock)
    }

    /// Clears all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    /// Σ line totals after per-line discounts.
    pub fn compute_subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Σ per-line discount amounts.
    pub fn compute_discount(&self) -> Money {
        self.lines.iter().map(CartLine::discount_amount).sum()
    }

    /// Tax on the subtotal at `rate`.
    pub fn compute_tax(&self, rate: TaxRate) -> Money {
        self.compute_subtotal().calculate_tax(rate)
    }

    /// Subtotal plus tax.
    pub fn compute_total(&self, rate: TaxRate) -> Money {
        self.compute_subtotal() + self.compute_tax(rate)
    }

    /// Summary for the totals panel.
    pub fn totals(&self, rate: TaxRate) -> CartTotals {
        let subtotal = self.compute_subtotal();
        let tax = subtotal.calculate_tax(rate);
        CartTotals {
            line_count: self.line_count(),
            total_quantity: self.total_quantity(),
            subtotal_cents: subtotal.cents(),
            discount_cents: self.compute_discount().cents(),
            tax_cents: tax.cents(),
            total_cents: (subtotal + tax).cents(),
        }
    }
}

/// Cart totals summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl CartTotals {
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Change owed to the customer: `max(0, cash_received - total)`.
///
/// ## Example
/// ```rust
/// use keystone_core::cart::compute_change;
/// use keystone_core::money::Money;
///
/// let total = Money::from_cents(21600);
/// assert_eq!(compute_change(Money::from_cents(25000), total).cents(), 3400);
/// assert_eq!(compute_change(Money::from_cents(20000), total).cents(), 0);
/// ```
pub fn compute_change(cash_received: Money, total: Money) -> Money {
    (cash_received - total).max(Money::zero())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sku: &str, price_cents: i64, stock: i64) -> Item {
        Item::new(sku, format!("Item {}", sku), "General", Money::from_cents(price_cents), stock)
    }

    #[test]
    fn test_add_line_and_merge() {
        let mut cart = Cart::new();
        let mouse = item("MOUSE-01", 2500, 10);

        cart.add_line(&mouse, 2).unwrap();
        cart.add_line(&mouse, 3).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.compute_subtotal().cents(), 12500);
    }

    #[test]
    fn test_stock_limit_scenario() {
        let mut cart = Cart::new();
        let cable = item("CABLE-01", 999, 3);

        for _ in 0..3 {
            cart.add_line(&cable, 1).unwrap();
        }
        let before = cart.clone();

        let err = cart.add_line(&cable, 1).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                sku: "CABLE-01".to_string(),
                available: 3,
                requested: 4,
            }
        );
        assert_eq!(cart, before);
        assert_eq!(cart.line(&cable.id).unwrap().quantity, 3);
    }

    #[test]
    fn test_add_new_line_over_stock_is_rejected() {
        let mut cart = Cart::new();
        let rare = item("RARE-01", 100, 1);

        assert!(matches!(
            cart.add_line(&rare, 2),
            Err(CoreError::InsufficientStock { .. })
        ));
        assert!(cart.is_empty());

        let sold_out = item("GONE-01", 100, 0);
        assert!(cart.add_line(&sold_out, 1).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_line_rejects_bad_input() {
        let mut cart = Cart::new();
        let mut mouse = item("MOUSE-01", 2500, 10);

        assert!(matches!(cart.add_line(&mouse, 0), Err(CoreError::Validation(_))));
        assert!(matches!(cart.add_line(&mouse, -2), Err(CoreError::Validation(_))));

        mouse.is_active = false;
        assert!(matches!(cart.add_line(&mouse, 1), Err(CoreError::ItemInactive(_))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new();
        for i in 0..crate::MAX_CART_LINES {
            cart.add_line(&item(&format!("SKU-{}", i), 100, 5), 1).unwrap();
        }
        assert_eq!(
            cart.add_line(&item("ONE-MORE", 100, 5), 1),
            Err(CoreError::CartTooLarge {
                max: crate::MAX_CART_LINES
            })
        );
    }

    #[test]
    fn test_update_line_quantity() {
        let mut cart = Cart::new();
        let mouse = item("MOUSE-01", 2500, 4);
        cart.add_line(&mouse, 1).unwrap();

        cart.update_line_quantity(&mouse.id, 4).unwrap();
        assert_eq!(cart.line(&mouse.id).unwrap().quantity, 4);

        let before = cart.clone();
        assert!(matches!(
            cart.update_line_quantity(&mouse.id, 5),
            Err(CoreError::InsufficientStock { available: 4, requested: 5, .. })
        ));
        assert_eq!(cart, before);

        cart.update_line_quantity(&mouse.id, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_bulk_quantities_limited_only_by_stock() {
        let mut cart = Cart::new();
        let screws = item("SCREW-M4", 5, 5000);

        cart.add_line(&screws, 1000).unwrap();
        assert_eq!(cart.line(&screws.id).unwrap().quantity, 1000);

        cart.update_line_quantity(&screws.id, 1500).unwrap();
        assert_eq!(cart.line(&screws.id).unwrap().quantity, 1500);
        assert_eq!(cart.compute_subtotal().cents(), 7500);

        assert!(matches!(
            cart.update_line_quantity(&screws.id, 5001),
            Err(CoreError::InsufficientStock { available: 5000, requested: 5001, .. })
        ));
    }

    #[test]
    fn test_update_negative_removes_and_absent_is_noop() {
        let mut cart = Cart::new();
        let mouse = item("MOUSE-01", 2500, 4);
        cart.add_line(&mouse, 2).unwrap();

        cart.update_line_quantity("missing", 3).unwrap();
        assert_eq!(cart.total_quantity(), 2);

        cart.update_line_quantity(&mouse.id, -1).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new();
        let a = item("A", 100, 5);
        let b = item("B", 200, 5);
        cart.add_line(&a, 1).unwrap();
        cart.add_line(&b, 1).unwrap();

        cart.remove_line(&a.id);
        cart.remove_line("missing");

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines()[0].sku, "B");
    }

    #[test]
    fn test_totals_scenario() {
        let mut cart = Cart::new();
        let monitor = item("MON-01", 10000, 5);
        cart.add_line(&monitor, 2).unwrap();

        let rate = TaxRate::from_bps(800);
        assert_eq!(cart.compute_subtotal().cents(), 20000);
        assert_eq!(cart.compute_tax(rate).cents(), 1600);
        assert_eq!(cart.compute_total(rate).cents(), 21600);
        assert_eq!(
            cart.compute_total(rate),
            cart.compute_subtotal() + cart.compute_tax(rate)
        );
    }

    #[test]
    fn test_line_discount() {
        let mut cart = Cart::new();
        let monitor = item("MON-01", 10000, 5);
        let mouse = item("MOUSE-01", 2500, 5);
        cart.add_line(&monitor, 2).unwrap();
        cart.add_line(&mouse, 1).unwrap();

        cart.set_line_discount(&monitor.id, 10).unwrap();
        assert_eq!(cart.compute_subtotal().cents(), 18000 + 2500);
        assert_eq!(cart.compute_discount().cents(), 2000);

        assert!(cart.set_line_discount(&monitor.id, 101).is_err());
        assert_eq!(cart.line(&monitor.id).unwrap().discount_percent, Some(10));

        cart.set_line_discount(&monitor.id, 0).unwrap();
        assert_eq!(cart.line(&monitor.id).unwrap().discount_percent, None);
    }

    #[test]
    fn test_totals_summary() {
        let mut cart = Cart::new();
        cart.add_line(&item("A", 1099, 9), 3).unwrap();

        let totals = cart.totals(TaxRate::from_bps(800));
        assert_eq!(totals.line_count, 1);
        assert_eq!(totals.total_quantity, 3);
        assert_eq!(totals.subtotal_cents, 3297);
        // 3297 × 8% = 263.76 → 264
        assert_eq!(totals.tax_cents, 264);
        assert_eq!(totals.total(), totals.subtotal() + totals.tax());
    }

    #[test]
    fn test_absurd_price_totals_do_not_panic() {
        let mut cart = Cart::new();
        cart.add_line(&item("YACHT-01", i64::MAX / 2, 5), 3).unwrap();

        let totals = cart.totals(TaxRate::from_bps(800));
        assert_eq!(totals.subtotal_cents, i64::MAX);
        assert_eq!(totals.total_cents, i64::MAX);
    }

    #[test]
    fn test_refresh_stock_updates_stock_not_price() {
        let mut cart = Cart::new();
        let mut mouse = item("MOUSE-01", 2500, 5);
        cart.add_line(&mouse, 3).unwrap();

        mouse.stock = 2;
        mouse.price_cents = 9999;
        cart.refresh_stock(&mouse);

        let line = cart.line(&mouse.id).unwrap();
        assert_eq!(line.available_stock, 2);
        assert_eq!(line.unit_price_cents, 2500);
        assert_eq!(cart.oversold_lines().count(), 1);
    }

    #[test]
    fn test_compute_change() {
        let total = Money::from_cents(21600);
        assert_eq!(compute_change(Money::from_cents(25000), total).cents(), 3400);
        assert_eq!(compute_change(total, total), Money::zero());
        assert_eq!(compute_change(Money::from_cents(100), total), Money::zero());
    }
}
