//! # Domain Types
//!
//! Core domain records used throughout the Keystone back office.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │    Customer     │   │  PaymentMethod  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  Cash           │       │
//! │  │  sku (business) │   │  email          │   │  Card           │       │
//! │  │  price_cents    │   │  purchase_total │   │  Digital        │       │
//! │  │  stock          │   │  purchase_count │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Player      │   │   Tournament    │   │    TaxRate      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  wins / losses  │   │  status         │   │  bps (u32)      │       │
//! │  │  rank (opt)     │   │  prize_pool     │   │  800 = 8%       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every record has explicit required and optional fields; forms on the
//! dashboard build these records instead of mutating loose objects.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 800 bps = 8%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for configuration input).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::from_bps(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Item
// =============================================================================

/// A catalog item that can be sold at the point of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown in the catalog and on receipts.
    pub name: String,

    /// Catalog category ("Electronics", "Accessories", ...).
    pub category: String,

    /// Optional long description.
    pub description: Option<String>,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Units available for sale.
    pub stock: i64,

    /// Whether the item is offered for sale (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Creates a new active item with a fresh id.
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: Money,
        stock: i64,
    ) -> Self {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4().to_string(),
            sku: sku.into(),
            name: name.into(),
            category: category.into(),
            description: None,
            price_cents: price.cents(),
            stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.is_active && quantity <= self.stock
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer whose purchases are tracked by the point of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Lifetime spend in cents.
    pub purchase_total_cents: i64,
    /// Number of completed transactions.
    pub purchase_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a customer with no purchase history.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Customer {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
            purchase_total_cents: 0,
            purchase_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the lifetime spend as Money.
    #[inline]
    pub fn purchase_total(&self) -> Money {
        Money::from_cents(self.purchase_total_cents)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a transaction is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; requires an amount covering the total.
    Cash,
    /// Card on an external terminal.
    Card,
    /// Wallets, transfers and other digital payments.
    Digital,
}

impl PaymentMethod {
    /// Whether the cashier must enter the amount received.
    pub fn requires_tendered_amount(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Digital => write!(f, "digital"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "digital" | "wallet" => Ok(PaymentMethod::Digital),
            other => Err(crate::error::ValidationError::InvalidFormat {
                field: "payment method".to_string(),
                reason: format!("unknown method '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Players & Tournaments
// =============================================================================

/// A player on the tournament roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub team: Option<String>,
    pub wins: u32,
    pub losses: u32,
    /// Standing number, assigned by [`crate::standings`].
    pub rank: Option<u32>,
}

impl Player {
    /// Creates an unranked player with the given record.
    pub fn new(name: impl Into<String>, wins: u32, losses: u32) -> Self {
        Player {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            team: None,
            wins,
            losses,
            rank: None,
        }
    }

    /// Games played.
    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    /// Win rate in `[0, 1]`; zero when no games were played.
    pub fn win_rate(&self) -> f64 {
        match self.games() {
            0 => 0.0,
            games => self.wins as f64 / games as f64,
        }
    }
}

/// Lifecycle of a tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
}

/// A tournament listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub game: String,
    pub status: TournamentStatus,
    pub max_players: u32,
    pub prize_pool_cents: i64,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    /// Registered player ids.
    pub player_ids: Vec<String>,
}

impl Tournament {
    /// Whether another player can register.
    pub fn has_open_slots(&self) -> bool {
        self.status == TournamentStatus::Upcoming
            && (self.player_ids.len() as u32) < self.max_players
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
