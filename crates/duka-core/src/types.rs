//! # Domain Types
//!
//! Core domain types for the Duka sales & debt ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ InventoryItem   │   │   DailyEntry    │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  business_id    │   │  entry_date     │   │  daily_entry_id │       │
//! │  │  retail/cost    │   │  five totals    │   │  merge key      │       │
//! │  │  stock          │   │  closed flag    │   │  amount/profit  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Debt       │   │ PaymentMethod   │   │  Notification   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  one pending    │   │  Cash           │   │  write-once     │       │
//! │  │  per customer   │   │  Mpesa          │   │  observational  │       │
//! │  │  + DebtItems    │   │  Debt           │   │  record         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Merge Key
//! A Sale row is unique per `(daily_entry_id, inventory_id, payment_method)`.
//! Repeated sales of the same item via the same channel on the same day merge
//! into the existing row by summation instead of inserting a new row.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid for.
///
/// Modeled as a closed sum type: every ledger mutation branches exhaustively
/// on this enum, so a new channel cannot be added without the compiler
/// pointing at every site that must handle it.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Mobile money (M-Pesa) payment.
    Mpesa,
    /// Buy-now-pay-later: amount accrues to the customer's pending debt.
    Debt,
}

impl PaymentMethod {
    /// True for the credit channel.
    #[inline]
    pub const fn is_debt(&self) -> bool {
        matches!(self, PaymentMethod::Debt)
    }

    /// Lowercase name as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Debt => "debt",
        }
    }
}

// =============================================================================
// Debt Status
// =============================================================================

/// Lifecycle state of a customer debt.
///
/// At most one `Pending` debt exists per (business, customer); settlement is
/// handled by a separate payments path sharing the same balance fields.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    /// Open balance, still accumulating debt sales.
    Pending,
    /// Fully paid off.
    Settled,
}

// =============================================================================
// Business
// =============================================================================

/// A shop. Every ledger row is scoped to exactly one business, and every
/// operation verifies ownership before mutating.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub owner_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory Item
// =============================================================================

/// A sellable item in a business's catalog.
///
/// `name` is stored trimmed and lowercased; it is unique per business.
/// `quantity_available` never goes negative after any committed mutation
/// (guarded both in the ledger and by a CHECK constraint).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub business_id: String,
    pub name: String,
    /// What the shop paid per unit, in cents.
    pub cost_price_cents: i64,
    /// What the customer pays per unit, in cents.
    pub retail_price_cents: i64,
    pub quantity_available: i64,
    pub unit: String,
    pub category: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Retail price as Money.
    #[inline]
    pub fn retail_price(&self) -> Money {
        Money::from_cents(self.retail_price_cents)
    }

    /// Cost price as Money.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Per-unit profit margin.
    #[inline]
    pub fn unit_profit(&self) -> Money {
        self.retail_price() - self.cost_price()
    }

    /// Checks whether `quantity` units can be sold from current stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity > 0 && quantity <= self.quantity_available
    }
}

// =============================================================================
// Daily Entry
// =============================================================================

/// The per-business-per-day aggregate ledger row.
///
/// Keyed by `(business_id, entry_date)`, created lazily on the first sale of
/// the day or explicitly via start-new-day, never physically deleted.
/// Running totals are maintained incrementally by each sale and re-derived
/// from the sale rows at close (the reconciliation sweep).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyEntry {
    pub id: String,
    pub business_id: String,
    /// Day key: the calendar date this entry aggregates.
    pub entry_date: NaiveDate,
    pub closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub cash_total_cents: i64,
    pub mpesa_total_cents: i64,
    /// Paid revenue only: always equals cash + mpesa. Debt sales are
    /// recognized as revenue when settled, not when recorded.
    pub sales_total_cents: i64,
    pub debts_total_cents: i64,
    pub profit_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl DailyEntry {
    /// Snapshot of the five running totals.
    pub fn totals(&self) -> DayTotals {
        DayTotals {
            cash: Money::from_cents(self.cash_total_cents),
            mpesa: Money::from_cents(self.mpesa_total_cents),
            sales: Money::from_cents(self.sales_total_cents),
            debts: Money::from_cents(self.debts_total_cents),
            profit: Money::from_cents(self.profit_total_cents),
        }
    }
}

// =============================================================================
// Day Totals
// =============================================================================

/// The five aggregate totals of a business day.
///
/// Also the result type of the close-day reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotals {
    pub cash: Money,
    pub mpesa: Money,
    pub sales: Money,
    pub debts: Money,
    pub profit: Money,
}

impl DayTotals {
    /// Re-derives totals from the authoritative sale rows of one entry.
    ///
    /// Cash and M-Pesa feed `sales` and `profit`; debt feeds `debts` only.
    /// This is the reconciliation sweep run at day close, overwriting
    /// whatever the incremental update path produced.
    pub fn from_sales<'a, I>(sales: I) -> Self
    where
        I: IntoIterator<Item = &'a Sale>,
    {
        let mut totals = DayTotals::default();
        for sale in sales {
            let amount = sale.total_amount();
            let profit = sale.total_profit();
            match sale.payment_method {
                PaymentMethod::Cash => {
                    totals.cash += amount;
                    totals.sales += amount;
                    totals.profit += profit;
                }
                PaymentMethod::Mpesa => {
                    totals.mpesa += amount;
                    totals.sales += amount;
                    totals.profit += profit;
                }
                PaymentMethod::Debt => {
                    totals.debts += amount;
                }
            }
        }
        totals
    }

    /// The totals identity: paid revenue equals the sum of its channels.
    pub fn is_consistent(&self) -> bool {
        self.sales == self.cash + self.mpesa
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A (possibly merged) record of units sold of one item via one payment
/// method on one day.
///
/// `item_name` is a snapshot frozen at sale time, so history survives item
/// deletion (`inventory_id` then becomes NULL).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub business_id: String,
    pub daily_entry_id: String,
    pub inventory_id: Option<String>,
    pub item_name: String,
    pub quantity_sold: i64,
    pub payment_method: PaymentMethod,
    pub total_amount_cents: i64,
    pub total_profit_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Total amount as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    /// Total profit as Money.
    #[inline]
    pub fn total_profit(&self) -> Money {
        Money::from_cents(self.total_profit_cents)
    }

    /// The share of `total_amount` carried by `quantity` units.
    ///
    /// Used when reversing part of a sale after the inventory item is gone:
    /// the sale's own stored average is the only price witness left.
    /// Exact (no rounding loss) when `quantity == quantity_sold`.
    pub fn prorated_amount(&self, quantity: i64) -> Money {
        debug_assert!(quantity <= self.quantity_sold);
        if self.quantity_sold == 0 {
            return Money::zero();
        }
        Money::from_cents(self.total_amount_cents * quantity / self.quantity_sold)
    }

    /// The share of `total_profit` carried by `quantity` units.
    pub fn prorated_profit(&self, quantity: i64) -> Money {
        debug_assert!(quantity <= self.quantity_sold);
        if self.quantity_sold == 0 {
            return Money::zero();
        }
        Money::from_cents(self.total_profit_cents * quantity / self.quantity_sold)
    }
}

// =============================================================================
// Debt & Debt Items
// =============================================================================

/// An outstanding customer balance accumulated from debt-funded sales.
///
/// The three balance fields move in lockstep on the accumulation path:
/// this core only ever increases (or reverses) `amount_owed`,
/// `remaining_balance` and `balance` together. `amount_paid` belongs to
/// the settlement path and is never touched here.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: String,
    pub business_id: String,
    pub customer_id: String,
    /// The sale that triggered this debt's creation.
    pub sale_id: String,
    pub amount_owed_cents: i64,
    pub amount_paid_cents: i64,
    pub remaining_balance_cents: i64,
    pub balance_cents: i64,
    pub status: DebtStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Debt {
    /// Amount owed as Money.
    #[inline]
    pub fn amount_owed(&self) -> Money {
        Money::from_cents(self.amount_owed_cents)
    }

    /// Invariant once settlements apply: remaining == owed - paid.
    pub fn balances_consistent(&self) -> bool {
        self.remaining_balance_cents == self.amount_owed_cents - self.amount_paid_cents
    }
}

/// Append-only line item under a Debt, one per debt-contributing sale event.
///
/// Never merged and never deleted independently of its parent.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtItem {
    pub id: String,
    pub debt_id: String,
    /// The sale row this contribution came from; reversal attribution key.
    pub sale_id: String,
    pub inventory_id: Option<String>,
    /// Item name snapshot at the time the debt line was taken.
    pub name: String,
    pub quantity_taken: i64,
    /// Retail price per unit at the time, in cents.
    pub price_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customers
// =============================================================================

/// A customer, shared across businesses.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub full_name: String,
    pub phone_number: String,
    pub email_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Link entity between a business and a customer.
///
/// `balance_cents` is a cached mirror of the customer's outstanding debt for
/// that business, incremented in lockstep with Debt updates.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessCustomer {
    pub id: String,
    pub business_id: String,
    pub customer_id: String,
    pub balance_cents: i64,
    pub joined_at: DateTime<Utc>,
}

/// Customer joined with their per-business balance, as shown in lists.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerWithBalance {
    pub id: String,
    pub full_name: String,
    pub phone_number: String,
    pub email_address: Option<String>,
    pub balance_cents: i64,
    pub joined_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

/// Category of an observational notification.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Lifecycle events: day started, entry reopened.
    System,
    /// A cash or M-Pesa sale was recorded or updated.
    PaymentAlert,
    /// A customer debt was created or increased.
    DebtReminder,
    /// Inventory changes: item added, restocked.
    StockAlert,
    /// End-of-day close summary.
    DailySummary,
}

/// Kind of entity a notification points at.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Sale,
    Debt,
    Inventory,
    DailyEntry,
}

/// A stored, write-once notification record.
///
/// Purely observational: never part of ledger correctness.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub business_id: String,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub entity_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    /// Arbitrary JSON payload (totals, quantities, ...), stored as text.
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Description payload handed to the notification collaborator after a
/// ledger mutation commits. Delivery is at-most-once-attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub business_id: String,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub entity_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub metadata: Option<serde_json::Value>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sale(method: PaymentMethod, amount: i64, profit: i64) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s".into(),
            business_id: "b".into(),
            daily_entry_id: "e".into(),
            inventory_id: Some("i".into()),
            item_name: "soap".into(),
            quantity_sold: 1,
            payment_method: method,
            total_amount_cents: amount,
            total_profit_cents: profit,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reconciliation_excludes_debt_from_sales_total() {
        let rows = vec![
            sale(PaymentMethod::Cash, 300, 120),
            sale(PaymentMethod::Mpesa, 200, 80),
            sale(PaymentMethod::Debt, 100, 40),
        ];
        let totals = DayTotals::from_sales(&rows);

        assert_eq!(totals.cash.cents(), 300);
        assert_eq!(totals.mpesa.cents(), 200);
        assert_eq!(totals.sales.cents(), 500);
        assert_eq!(totals.debts.cents(), 100);
        // Profit only over the paid rows
        assert_eq!(totals.profit.cents(), 200);
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_prorated_reversal_is_exact_for_full_quantity() {
        let mut s = sale(PaymentMethod::Cash, 1000, 400);
        s.quantity_sold = 3;
        assert_eq!(s.prorated_amount(3).cents(), 1000);
        assert_eq!(s.prorated_profit(3).cents(), 400);
        // Partial shares round down, never over-reverse
        assert!(s.prorated_amount(1).cents() <= 334);
    }

    #[test]
    fn test_can_sell_respects_stock() {
        let now = Utc::now();
        let item = InventoryItem {
            id: "i".into(),
            business_id: "b".into(),
            name: "soap".into(),
            cost_price_cents: 6_000,
            retail_price_cents: 10_000,
            quantity_available: 5,
            unit: "pcs".into(),
            category: "Uncategorized".into(),
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        assert!(item.can_sell(5));
        assert!(!item.can_sell(6));
        assert!(!item.can_sell(0));
        assert_eq!(item.unit_profit().cents(), 4_000);
    }

    #[test]
    fn test_payment_method_names() {
        assert_eq!(PaymentMethod::Cash.as_str(), "cash");
        assert_eq!(PaymentMethod::Mpesa.as_str(), "mpesa");
        assert_eq!(PaymentMethod::Debt.as_str(), "debt");
        assert!(PaymentMethod::Debt.is_debt());
        assert!(!PaymentMethod::Cash.is_debt());
    }
}
