//! # Ledger Engine
//!
//! The sales & debt ledger: every operation that mutates inventory stock,
//! per-day aggregate totals, and per-customer debt balances.
//!
//! ## Control Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        record_sale                                      │
//! │                                                                         │
//! │  validate ──► resolve item ──► find-or-create today's entry            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  merge-or-insert sale row  (key: entry × item × payment method)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  decrement stock (guarded: quantity_available >= qty)                  │
//! │       │                                                                 │
//! │       ├── cash/mpesa ──► entry cash|mpesa += Δ, sales += Δ,            │
//! │       │                  profit += Δp                                   │
//! │       │                                                                 │
//! │       └── debt ──► accumulate pending debt + append debt item          │
//! │                    entry debts += Δ, customer link balance += Δ        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ──► emit notification (fire-and-forget)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactionality
//! Each operation is ONE SQLite transaction: all-or-nothing, no partial
//! visibility. The engine takes no locks of its own - SQLite's single-writer
//! transactions serialize conflicting mutations, which is what preserves the
//! merge invariant for concurrent same-key sales.
//!
//! ## Debt Policy
//! Debt sales accrue to `debts_total` only. They never touch `sales_total`
//! or `profit_total`: debt is recognized as revenue when settled, not when
//! recorded. The close-day reconciliation applies the same rule, so the
//! incremental and swept totals agree.

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::notify::Notifier;
use crate::repository::new_id;
use duka_core::validation::validate_quantity;
use duka_core::{
    CoreError, DailyEntry, DayTotals, DebtItem, EntityType, InventoryItem, Money,
    NotificationDraft, NotificationType, PaymentMethod, Sale,
};

// =============================================================================
// Result Types
// =============================================================================

/// What a committed `record_sale` did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleOutcome {
    pub sale_id: String,
    pub daily_entry_id: String,
    /// Amount added by this call (not the merged row's running total).
    pub amount: Money,
    pub profit: Money,
    /// True if the call merged into an existing sale row.
    pub merged: bool,
}

// =============================================================================
// Ledger
// =============================================================================

/// The ledger engine. Cheap to clone; one per Database handle.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
    notifier: Notifier,
}

impl Ledger {
    /// Creates a new Ledger.
    pub fn new(pool: SqlitePool, notifier: Notifier) -> Self {
        Ledger { pool, notifier }
    }

    /// Today's day key in the shop's local timezone.
    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    // =========================================================================
    // record_sale
    // =========================================================================

    /// Records a sale of `quantity` units of one item via one payment method.
    ///
    /// Merge semantics: repeated calls with the same (item, payment method)
    /// on the same day fold into one sale row whose totals equal the sum.
    ///
    /// ## Errors
    /// All checked before any mutation; an error means nothing changed.
    /// - `InsufficientStock` - quantity exceeds available stock
    /// - `MissingCustomer` - debt sale without a customer
    /// - `ItemNotFound` / `Unauthorized` / `CustomerNotFound`
    /// - `DayClosed` - today's entry is closed; reopen it first
    pub async fn record_sale(
        &self,
        business_id: &str,
        inventory_id: &str,
        quantity: i64,
        payment_method: PaymentMethod,
        customer_id: Option<&str>,
    ) -> LedgerResult<SaleOutcome> {
        validate_quantity(quantity)?;

        // Debt sales must name a customer before anything else happens.
        let customer_id = match (payment_method, customer_id) {
            (PaymentMethod::Debt, None) => return Err(CoreError::MissingCustomer.into()),
            (PaymentMethod::Debt, Some(id)) => Some(id),
            _ => None,
        };

        let mut tx = self.pool.begin().await?;

        let item = fetch_item(&mut tx, inventory_id).await?;
        let item = match item {
            None => return Err(CoreError::ItemNotFound(inventory_id.to_string()).into()),
            Some(item) if item.business_id != business_id => {
                return Err(CoreError::unauthorized("Inventory item", inventory_id).into())
            }
            Some(item) => item,
        };

        if !item.can_sell(quantity) {
            return Err(CoreError::InsufficientStock {
                name: item.name.clone(),
                available: item.quantity_available,
                requested: quantity,
            }
            .into());
        }

        if let Some(customer_id) = customer_id {
            let linked: Option<(String,)> = sqlx::query_as(
                "SELECT id FROM business_customers WHERE business_id = ?1 AND customer_id = ?2",
            )
            .bind(business_id)
            .bind(customer_id)
            .fetch_optional(&mut *tx)
            .await?;

            if linked.is_none() {
                return Err(CoreError::CustomerNotFound(customer_id.to_string()).into());
            }
        }

        let entry = self
            .find_or_create_entry(&mut tx, business_id, Self::today())
            .await?;

        let amount = item.retail_price().times(quantity);
        let profit = item.unit_profit().times(quantity);
        let now = Utc::now();

        // Merge-or-insert against the (entry, item, payment method) key.
        let existing: Option<Sale> = sqlx::query_as(
            r#"
            SELECT id, business_id, daily_entry_id, inventory_id, item_name,
                   quantity_sold, payment_method,
                   total_amount_cents, total_profit_cents,
                   created_at, updated_at
            FROM sales
            WHERE daily_entry_id = ?1 AND inventory_id = ?2 AND payment_method = ?3
            "#,
        )
        .bind(&entry.id)
        .bind(inventory_id)
        .bind(payment_method)
        .fetch_optional(&mut *tx)
        .await?;

        let merged = existing.is_some();
        let sale_id = match existing {
            Some(sale) => {
                sqlx::query(
                    r#"
                    UPDATE sales
                    SET quantity_sold = quantity_sold + ?2,
                        total_amount_cents = total_amount_cents + ?3,
                        total_profit_cents = total_profit_cents + ?4,
                        updated_at = ?5
                    WHERE id = ?1
                    "#,
                )
                .bind(&sale.id)
                .bind(quantity)
                .bind(amount.cents())
                .bind(profit.cents())
                .bind(now)
                .execute(&mut *tx)
                .await?;
                sale.id
            }
            None => {
                let id = new_id();
                sqlx::query(
                    r#"
                    INSERT INTO sales (
                        id, business_id, daily_entry_id, inventory_id, item_name,
                        quantity_sold, payment_method,
                        total_amount_cents, total_profit_cents,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                    "#,
                )
                .bind(&id)
                .bind(business_id)
                .bind(&entry.id)
                .bind(inventory_id)
                .bind(&item.name)
                .bind(quantity)
                .bind(payment_method)
                .bind(amount.cents())
                .bind(profit.cents())
                .bind(now)
                .execute(&mut *tx)
                .await?;
                id
            }
        };

        // Guarded delta decrement: the WHERE clause re-checks stock so a
        // racing sale that got in first cannot drive the count negative.
        let decremented = sqlx::query(
            r#"
            UPDATE inventory_items
            SET quantity_available = quantity_available - ?2, updated_at = ?3
            WHERE id = ?1 AND quantity_available >= ?2
            "#,
        )
        .bind(inventory_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            return Err(CoreError::InsufficientStock {
                name: item.name.clone(),
                available: item.quantity_available,
                requested: quantity,
            }
            .into());
        }

        let mut debt_created = false;
        match payment_method {
            PaymentMethod::Cash | PaymentMethod::Mpesa => {
                apply_entry_delta(&mut tx, &entry.id, payment_method, amount, profit).await?;
            }
            PaymentMethod::Debt => {
                let customer_id = customer_id.ok_or(CoreError::MissingCustomer)?;
                debt_created = self
                    .accumulate_debt(&mut tx, business_id, customer_id, &sale_id, &item, quantity, amount)
                    .await?;
                apply_entry_delta(&mut tx, &entry.id, payment_method, amount, profit).await?;
            }
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            business_id = %business_id,
            item = %item.name,
            quantity,
            method = payment_method.as_str(),
            amount = amount.cents(),
            merged,
            "Sale recorded"
        );

        let draft = if payment_method.is_debt() {
            NotificationDraft {
                business_id: business_id.to_string(),
                kind: NotificationType::DebtReminder,
                title: if debt_created {
                    "New Customer Debt Created".to_string()
                } else {
                    "Existing Customer Debt Updated".to_string()
                },
                message: format!(
                    "{} ({}x) recorded as debt for customer.",
                    item.name, quantity
                ),
                entity_id: Some(sale_id.clone()),
                entity_type: Some(EntityType::Debt),
                metadata: Some(serde_json::json!({
                    "inventoryId": inventory_id,
                    "quantity": quantity,
                    "amount": amount.cents(),
                })),
            }
        } else {
            NotificationDraft {
                business_id: business_id.to_string(),
                kind: NotificationType::PaymentAlert,
                title: "Sale Updated".to_string(),
                message: format!(
                    "{} x {} sold for {} ({})",
                    quantity,
                    item.name,
                    amount,
                    payment_method.as_str()
                ),
                entity_id: Some(sale_id.clone()),
                entity_type: Some(EntityType::Sale),
                metadata: Some(serde_json::json!({
                    "inventoryId": inventory_id,
                    "quantity": quantity,
                    "amount": amount.cents(),
                    "paymentMethod": payment_method.as_str(),
                })),
            }
        };
        self.notifier.emit(draft).await;

        Ok(SaleOutcome {
            sale_id,
            daily_entry_id: entry.id,
            amount,
            profit,
            merged,
        })
    }

    /// Accumulates a debt sale into the customer's pending debt
    /// (creating it if absent), appends the debt line item, and bumps the
    /// cached business-customer balance. Returns true if a debt was created.
    #[allow(clippy::too_many_arguments)]
    async fn accumulate_debt(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        business_id: &str,
        customer_id: &str,
        sale_id: &str,
        item: &InventoryItem,
        quantity: i64,
        amount: Money,
    ) -> LedgerResult<bool> {
        let now = Utc::now();

        let pending: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM debts
            WHERE business_id = ?1 AND customer_id = ?2 AND status = 'pending'
            "#,
        )
        .bind(business_id)
        .bind(customer_id)
        .fetch_optional(&mut **tx)
        .await?;

        let (debt_id, created) = match pending {
            Some((id,)) => {
                sqlx::query(
                    r#"
                    UPDATE debts
                    SET amount_owed_cents = amount_owed_cents + ?2,
                        remaining_balance_cents = remaining_balance_cents + ?2,
                        balance_cents = balance_cents + ?2,
                        updated_at = ?3
                    WHERE id = ?1
                    "#,
                )
                .bind(&id)
                .bind(amount.cents())
                .bind(now)
                .execute(&mut **tx)
                .await?;
                (id, false)
            }
            None => {
                let id = new_id();
                sqlx::query(
                    r#"
                    INSERT INTO debts (
                        id, business_id, customer_id, sale_id,
                        amount_owed_cents, amount_paid_cents,
                        remaining_balance_cents, balance_cents,
                        status, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?5, ?5, 'pending', ?6, ?6)
                    "#,
                )
                .bind(&id)
                .bind(business_id)
                .bind(customer_id)
                .bind(sale_id)
                .bind(amount.cents())
                .bind(now)
                .execute(&mut **tx)
                .await?;
                (id, true)
            }
        };

        sqlx::query(
            r#"
            INSERT INTO debt_items (
                id, debt_id, sale_id, inventory_id, name,
                quantity_taken, price_cents, total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(new_id())
        .bind(&debt_id)
        .bind(sale_id)
        .bind(&item.id)
        .bind(&item.name)
        .bind(quantity)
        .bind(item.retail_price_cents)
        .bind(amount.cents())
        .bind(now)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE business_customers
            SET balance_cents = balance_cents + ?3
            WHERE business_id = ?1 AND customer_id = ?2
            "#,
        )
        .bind(business_id)
        .bind(customer_id)
        .bind(amount.cents())
        .execute(&mut **tx)
        .await?;

        debug!(debt_id = %debt_id, created, amount = amount.cents(), "Debt accumulated");
        Ok(created)
    }

    // =========================================================================
    // Daily entry state machine
    // =========================================================================

    /// Starts a new business day. Idempotent: if today's entry already
    /// exists it is returned unchanged.
    pub async fn start_new_day(&self, business_id: &str) -> LedgerResult<DailyEntry> {
        let today = Self::today();
        let mut tx = self.pool.begin().await?;

        if let Some(entry) = fetch_entry_by_date(&mut tx, business_id, today).await? {
            tx.commit().await?;
            return Ok(entry);
        }

        let entry = insert_zeroed_entry(&mut tx, business_id, today).await?;
        tx.commit().await?;

        info!(entry_id = %entry.id, business_id = %business_id, date = %today, "New day started");

        self.notifier
            .emit(NotificationDraft {
                business_id: business_id.to_string(),
                kind: NotificationType::System,
                title: "New Business Day Started".to_string(),
                message: format!("A new business day has been initialized on {}.", today),
                entity_id: Some(entry.id.clone()),
                entity_type: Some(EntityType::DailyEntry),
                metadata: None,
            })
            .await;

        Ok(entry)
    }

    /// Closes a daily entry, reconciling its totals from the sale rows.
    ///
    /// The sweep re-derives all five totals from the authoritative sale
    /// rows, overwriting whatever the incremental path produced - any drift
    /// from out-of-order or partially-failed updates ends here.
    ///
    /// ## Errors
    /// - `EntryNotFound` / `Unauthorized`
    /// - `AlreadyClosed` - repeated closes are rejected, not repeated
    pub async fn close_entry(&self, business_id: &str, entry_id: &str) -> LedgerResult<DayTotals> {
        let mut tx = self.pool.begin().await?;

        let entry = load_owned_entry(&mut tx, business_id, entry_id).await?;
        if entry.closed {
            return Err(CoreError::AlreadyClosed(entry_id.to_string()).into());
        }

        let sales = fetch_sales_for_entry(&mut tx, entry_id).await?;
        let totals = DayTotals::from_sales(&sales);

        sqlx::query(
            r#"
            UPDATE daily_entries
            SET closed = 1,
                closed_at = ?2,
                cash_total_cents = ?3,
                mpesa_total_cents = ?4,
                sales_total_cents = ?5,
                debts_total_cents = ?6,
                profit_total_cents = ?7
            WHERE id = ?1
            "#,
        )
        .bind(entry_id)
        .bind(Utc::now())
        .bind(totals.cash.cents())
        .bind(totals.mpesa.cents())
        .bind(totals.sales.cents())
        .bind(totals.debts.cents())
        .bind(totals.profit.cents())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            entry_id = %entry_id,
            sales = totals.sales.cents(),
            debts = totals.debts.cents(),
            "Daily entry closed"
        );

        self.notifier
            .emit(NotificationDraft {
                business_id: business_id.to_string(),
                kind: NotificationType::DailySummary,
                title: "Day Closed Successfully".to_string(),
                message: format!("Business day closed on {}.", entry.entry_date),
                entity_id: Some(entry_id.to_string()),
                entity_type: Some(EntityType::DailyEntry),
                metadata: Some(serde_json::json!({
                    "totals": {
                        "cashTotal": totals.cash.cents(),
                        "mpesaTotal": totals.mpesa.cents(),
                        "salesTotal": totals.sales.cents(),
                        "profitTotal": totals.profit.cents(),
                        "debtsTotal": totals.debts.cents(),
                    }
                })),
            })
            .await;

        Ok(totals)
    }

    /// Reopens a closed entry. Totals are left as the close reconciled
    /// them; only the closed flag and timestamp change.
    ///
    /// ## Errors
    /// - `EntryNotFound` / `Unauthorized`
    /// - `NotClosed` - the entry is already open
    pub async fn reopen_entry(&self, business_id: &str, entry_id: &str) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await?;

        let entry = load_owned_entry(&mut tx, business_id, entry_id).await?;
        if !entry.closed {
            return Err(CoreError::NotClosed(entry_id.to_string()).into());
        }

        sqlx::query("UPDATE daily_entries SET closed = 0, closed_at = NULL WHERE id = ?1")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(entry_id = %entry_id, "Daily entry reopened");

        self.notifier
            .emit(NotificationDraft {
                business_id: business_id.to_string(),
                kind: NotificationType::System,
                title: "Daily Entry Reopened".to_string(),
                message: format!(
                    "The daily entry for {} has been reopened.",
                    entry.entry_date
                ),
                entity_id: Some(entry_id.to_string()),
                entity_type: Some(EntityType::DailyEntry),
                metadata: None,
            })
            .await;

        Ok(())
    }

    // =========================================================================
    // Sale reversal
    // =========================================================================

    /// Deletes a sale entirely, reversing its effects.
    ///
    /// Restores stock, subtracts the sale's full totals from the entry,
    /// and - for debt sales - reverses the attributed debt contributions
    /// and the cached customer balance before removing the row.
    pub async fn delete_sale(&self, business_id: &str, sale_id: &str) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await?;

        let sale = load_owned_sale(&mut tx, business_id, sale_id).await?;
        let entry = load_owned_entry(&mut tx, business_id, &sale.daily_entry_id).await?;
        if entry.closed {
            return Err(CoreError::DayClosed {
                date: entry.entry_date.to_string(),
            }
            .into());
        }

        restore_stock(&mut tx, sale.inventory_id.as_deref(), sale.quantity_sold).await?;

        apply_entry_delta(
            &mut tx,
            &entry.id,
            sale.payment_method,
            -sale.total_amount(),
            -sale.total_profit(),
        )
        .await?;

        if sale.payment_method.is_debt() {
            self.reverse_debt_contributions(&mut tx, business_id, sale_id, sale.quantity_sold)
                .await?;
        }

        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(sale_id = %sale_id, item = %sale.item_name, "Sale deleted");

        self.notifier
            .emit(NotificationDraft {
                business_id: business_id.to_string(),
                kind: NotificationType::System,
                title: "Sale Deleted".to_string(),
                message: format!(
                    "Deleted sale of {} x {} ({}).",
                    sale.quantity_sold,
                    sale.item_name,
                    sale.payment_method.as_str()
                ),
                entity_id: Some(sale_id.to_string()),
                entity_type: Some(EntityType::Sale),
                metadata: None,
            })
            .await;

        Ok(())
    }

    /// Removes `quantity` units from a sale, reversing the proportional
    /// share of its effects.
    ///
    /// Per-unit price/profit come from the live inventory item; if the item
    /// was deleted, the sale's own stored averages are the fallback witness.
    /// Decrementing the full quantity removes the sale row.
    pub async fn decrement_sale(
        &self,
        business_id: &str,
        sale_id: &str,
        quantity: i64,
    ) -> LedgerResult<()> {
        validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;

        let sale = load_owned_sale(&mut tx, business_id, sale_id).await?;
        let entry = load_owned_entry(&mut tx, business_id, &sale.daily_entry_id).await?;
        if entry.closed {
            return Err(CoreError::DayClosed {
                date: entry.entry_date.to_string(),
            }
            .into());
        }

        if quantity > sale.quantity_sold {
            return Err(CoreError::DecrementTooLarge {
                requested: quantity,
                sold: sale.quantity_sold,
            }
            .into());
        }

        let live_item = match sale.inventory_id.as_deref() {
            Some(id) => fetch_item(&mut tx, id).await?,
            None => None,
        };

        // Full removal reverses the exact totals; otherwise price each unit
        // from the live item, falling back to the sale's stored average.
        // Never reverse more than the row still carries.
        let (amount_delta, profit_delta) = if quantity == sale.quantity_sold {
            (sale.total_amount(), sale.total_profit())
        } else {
            let (amount, profit) = match &live_item {
                Some(item) => (
                    item.retail_price().times(quantity),
                    item.unit_profit().times(quantity),
                ),
                None => (
                    sale.prorated_amount(quantity),
                    sale.prorated_profit(quantity),
                ),
            };
            (
                amount.min(sale.total_amount()),
                profit.min(sale.total_profit()),
            )
        };

        // For debt sales, the authoritative reversal amount is whatever the
        // trimmed debt lines carried, and profit comes from the row's own
        // prorated share, so amount and profit shrink in step even after a
        // price change.
        let (amount_delta, profit_delta) = if sale.payment_method.is_debt() {
            let trimmed = self
                .reverse_debt_contributions(&mut tx, business_id, sale_id, quantity)
                .await?;
            (
                trimmed.min(sale.total_amount()),
                sale.prorated_profit(quantity),
            )
        } else {
            (amount_delta, profit_delta)
        };

        if quantity == sale.quantity_sold {
            sqlx::query("DELETE FROM sales WHERE id = ?1")
                .bind(sale_id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE sales
                SET quantity_sold = quantity_sold - ?2,
                    total_amount_cents = total_amount_cents - ?3,
                    total_profit_cents = total_profit_cents - ?4,
                    updated_at = ?5
                WHERE id = ?1
                "#,
            )
            .bind(sale_id)
            .bind(quantity)
            .bind(amount_delta.cents())
            .bind(profit_delta.cents())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        apply_entry_delta(
            &mut tx,
            &entry.id,
            sale.payment_method,
            -amount_delta,
            -profit_delta,
        )
        .await?;

        restore_stock(&mut tx, sale.inventory_id.as_deref(), quantity).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            item = %sale.item_name,
            quantity,
            reversed = amount_delta.cents(),
            "Sale decremented"
        );

        self.notifier
            .emit(NotificationDraft {
                business_id: business_id.to_string(),
                kind: NotificationType::System,
                title: "Sale Reduced".to_string(),
                message: format!(
                    "Removed {} x {} from today's sales.",
                    quantity, sale.item_name
                ),
                entity_id: Some(sale_id.to_string()),
                entity_type: Some(EntityType::Sale),
                metadata: None,
            })
            .await;

        Ok(())
    }

    /// Reverses up to `quantity` units of the debt contributions attributed
    /// to one sale, newest line first. Returns the total amount reversed.
    ///
    /// Each trimmed line reduces its parent debt's owed/remaining/balance
    /// and the cached business-customer balance by the line's recorded
    /// prices - exact reversal, immune to later price changes.
    async fn reverse_debt_contributions(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        business_id: &str,
        sale_id: &str,
        quantity: i64,
    ) -> LedgerResult<Money> {
        let lines: Vec<DebtItem> = sqlx::query_as(
            r#"
            SELECT id, debt_id, sale_id, inventory_id, name,
                   quantity_taken, price_cents, total_cents, created_at
            FROM debt_items
            WHERE sale_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(sale_id)
        .fetch_all(&mut **tx)
        .await?;

        let mut remaining = quantity;
        let mut reversed = Money::zero();

        for line in lines {
            if remaining == 0 {
                break;
            }

            let take = remaining.min(line.quantity_taken);
            let line_delta = if take == line.quantity_taken {
                Money::from_cents(line.total_cents)
            } else {
                Money::from_cents(line.price_cents).times(take)
            };

            let customer_id: String =
                sqlx::query_scalar("SELECT customer_id FROM debts WHERE id = ?1")
                    .bind(&line.debt_id)
                    .fetch_one(&mut **tx)
                    .await?;

            sqlx::query(
                r#"
                UPDATE debts
                SET amount_owed_cents = amount_owed_cents - ?2,
                    remaining_balance_cents = remaining_balance_cents - ?2,
                    balance_cents = balance_cents - ?2,
                    updated_at = ?3
                WHERE id = ?1
                "#,
            )
            .bind(&line.debt_id)
            .bind(line_delta.cents())
            .bind(Utc::now())
            .execute(&mut **tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE business_customers
                SET balance_cents = balance_cents - ?3
                WHERE business_id = ?1 AND customer_id = ?2
                "#,
            )
            .bind(business_id)
            .bind(&customer_id)
            .bind(line_delta.cents())
            .execute(&mut **tx)
            .await?;

            if take == line.quantity_taken {
                sqlx::query("DELETE FROM debt_items WHERE id = ?1")
                    .bind(&line.id)
                    .execute(&mut **tx)
                    .await?;
            } else {
                sqlx::query(
                    r#"
                    UPDATE debt_items
                    SET quantity_taken = quantity_taken - ?2,
                        total_cents = total_cents - ?3
                    WHERE id = ?1
                    "#,
                )
                .bind(&line.id)
                .bind(take)
                .bind(line_delta.cents())
                .execute(&mut **tx)
                .await?;
            }

            debug!(
                debt_id = %line.debt_id,
                take,
                reversed = line_delta.cents(),
                "Debt contribution reversed"
            );

            remaining -= take;
            reversed += line_delta;
        }

        Ok(reversed)
    }

    /// Finds today's entry or lazily creates a zeroed, open one.
    async fn find_or_create_entry(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        business_id: &str,
        date: NaiveDate,
    ) -> LedgerResult<DailyEntry> {
        if let Some(entry) = fetch_entry_by_date(tx, business_id, date).await? {
            if entry.closed {
                return Err(CoreError::DayClosed {
                    date: date.to_string(),
                }
                .into());
            }
            return Ok(entry);
        }

        insert_zeroed_entry(tx, business_id, date).await
    }
}

// =============================================================================
// Transaction-Scoped Queries
// =============================================================================
// Free helpers over &mut Transaction so the per-operation SQL stays inside
// the single transaction the Ledger opened.

async fn fetch_item(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> LedgerResult<Option<InventoryItem>> {
    let item = sqlx::query_as::<_, InventoryItem>(
        r#"
        SELECT id, business_id, name,
               cost_price_cents, retail_price_cents, quantity_available,
               unit, category, image_url,
               created_at, updated_at
        FROM inventory_items
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(item)
}

async fn fetch_entry_by_date(
    tx: &mut Transaction<'_, Sqlite>,
    business_id: &str,
    date: NaiveDate,
) -> LedgerResult<Option<DailyEntry>> {
    let entry = sqlx::query_as::<_, DailyEntry>(
        r#"
        SELECT id, business_id, entry_date, closed, closed_at,
               cash_total_cents, mpesa_total_cents, sales_total_cents,
               debts_total_cents, profit_total_cents, created_at
        FROM daily_entries
        WHERE business_id = ?1 AND entry_date = ?2
        "#,
    )
    .bind(business_id)
    .bind(date)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(entry)
}

/// Loads an entry by id, mapping absence and foreign ownership to errors.
async fn load_owned_entry(
    tx: &mut Transaction<'_, Sqlite>,
    business_id: &str,
    entry_id: &str,
) -> LedgerResult<DailyEntry> {
    let entry = sqlx::query_as::<_, DailyEntry>(
        r#"
        SELECT id, business_id, entry_date, closed, closed_at,
               cash_total_cents, mpesa_total_cents, sales_total_cents,
               debts_total_cents, profit_total_cents, created_at
        FROM daily_entries
        WHERE id = ?1
        "#,
    )
    .bind(entry_id)
    .fetch_optional(&mut **tx)
    .await?;

    match entry {
        None => Err(CoreError::EntryNotFound(entry_id.to_string()).into()),
        Some(entry) if entry.business_id != business_id => {
            Err(CoreError::unauthorized("Daily entry", entry_id).into())
        }
        Some(entry) => Ok(entry),
    }
}

/// Loads a sale by id, mapping absence and foreign ownership to errors.
async fn load_owned_sale(
    tx: &mut Transaction<'_, Sqlite>,
    business_id: &str,
    sale_id: &str,
) -> LedgerResult<Sale> {
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, business_id, daily_entry_id, inventory_id, item_name,
               quantity_sold, payment_method,
               total_amount_cents, total_profit_cents,
               created_at, updated_at
        FROM sales
        WHERE id = ?1
        "#,
    )
    .bind(sale_id)
    .fetch_optional(&mut **tx)
    .await?;

    match sale {
        None => Err(CoreError::SaleNotFound(sale_id.to_string()).into()),
        Some(sale) if sale.business_id != business_id => {
            Err(CoreError::unauthorized("Sale", sale_id).into())
        }
        Some(sale) => Ok(sale),
    }
}

async fn fetch_sales_for_entry(
    tx: &mut Transaction<'_, Sqlite>,
    entry_id: &str,
) -> LedgerResult<Vec<Sale>> {
    let sales = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, business_id, daily_entry_id, inventory_id, item_name,
               quantity_sold, payment_method,
               total_amount_cents, total_profit_cents,
               created_at, updated_at
        FROM sales
        WHERE daily_entry_id = ?1
        "#,
    )
    .bind(entry_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(sales)
}

async fn insert_zeroed_entry(
    tx: &mut Transaction<'_, Sqlite>,
    business_id: &str,
    date: NaiveDate,
) -> LedgerResult<DailyEntry> {
    let now = Utc::now();
    let entry = DailyEntry {
        id: new_id(),
        business_id: business_id.to_string(),
        entry_date: date,
        closed: false,
        closed_at: None,
        cash_total_cents: 0,
        mpesa_total_cents: 0,
        sales_total_cents: 0,
        debts_total_cents: 0,
        profit_total_cents: 0,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO daily_entries (
            id, business_id, entry_date, closed, closed_at,
            cash_total_cents, mpesa_total_cents, sales_total_cents,
            debts_total_cents, profit_total_cents, created_at
        ) VALUES (?1, ?2, ?3, 0, NULL, 0, 0, 0, 0, 0, ?4)
        "#,
    )
    .bind(&entry.id)
    .bind(business_id)
    .bind(date)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    debug!(entry_id = %entry.id, date = %date, "Daily entry created");
    Ok(entry)
}

/// Applies a signed delta to one entry's running totals.
///
/// Cash and M-Pesa feed their channel plus `sales_total`/`profit_total`;
/// debt feeds `debts_total` only. Negative deltas reverse.
async fn apply_entry_delta(
    tx: &mut Transaction<'_, Sqlite>,
    entry_id: &str,
    method: PaymentMethod,
    amount: Money,
    profit: Money,
) -> Result<(), LedgerError> {
    let sql = match method {
        PaymentMethod::Cash => {
            r#"
            UPDATE daily_entries
            SET cash_total_cents = cash_total_cents + ?2,
                sales_total_cents = sales_total_cents + ?2,
                profit_total_cents = profit_total_cents + ?3
            WHERE id = ?1
            "#
        }
        PaymentMethod::Mpesa => {
            r#"
            UPDATE daily_entries
            SET mpesa_total_cents = mpesa_total_cents + ?2,
                sales_total_cents = sales_total_cents + ?2,
                profit_total_cents = profit_total_cents + ?3
            WHERE id = ?1
            "#
        }
        PaymentMethod::Debt => {
            r#"
            UPDATE daily_entries
            SET debts_total_cents = debts_total_cents + ?2
            WHERE id = ?1
            "#
        }
    };

    sqlx::query(sql)
        .bind(entry_id)
        .bind(amount.cents())
        .bind(profit.cents())
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Returns units to stock after a reversal. A missing item (deleted since
/// the sale) is not an error; the restoration is simply skipped.
async fn restore_stock(
    tx: &mut Transaction<'_, Sqlite>,
    inventory_id: Option<&str>,
    quantity: i64,
) -> LedgerResult<()> {
    let Some(inventory_id) = inventory_id else {
        return Ok(());
    };

    sqlx::query(
        r#"
        UPDATE inventory_items
        SET quantity_available = quantity_available + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(inventory_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::inventory::NewInventoryItem;
    use duka_core::NotificationType;

    /// A freshly migrated in-memory shop: two stocked items, one customer.
    struct Shop {
        db: Database,
        business_id: String,
        /// retail 100.00, cost 70.00, stock 50
        bread: String,
        /// retail 55.00, cost 45.00, stock 10
        milk: String,
        customer_id: String,
    }

    async fn shop() -> Shop {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let business = db.businesses().create("Test Duka", None).await.unwrap();

        let bread = db
            .inventory()
            .add_item(
                &business.id,
                NewInventoryItem {
                    name: "bread".to_string(),
                    cost_price_cents: 7_000,
                    retail_price_cents: 10_000,
                    quantity_available: 50,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let milk = db
            .inventory()
            .add_item(
                &business.id,
                NewInventoryItem {
                    name: "milk 500ml".to_string(),
                    cost_price_cents: 4_500,
                    retail_price_cents: 5_500,
                    quantity_available: 10,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let customer = db
            .customers()
            .add_customer(&business.id, "Wanjiku Kamau", "+254712345678", None)
            .await
            .unwrap();

        Shop {
            db,
            business_id: business.id,
            bread: bread.id,
            milk: milk.id,
            customer_id: customer.id,
        }
    }

    async fn stock_of(shop: &Shop, item_id: &str) -> i64 {
        shop.db
            .inventory()
            .get_by_id(&shop.business_id, item_id)
            .await
            .unwrap()
            .unwrap()
            .quantity_available
    }

    async fn entry(shop: &Shop, entry_id: &str) -> DailyEntry {
        shop.db
            .daily_entries()
            .get_by_id(&shop.business_id, entry_id)
            .await
            .unwrap()
            .unwrap()
    }

    // -------------------------------------------------------------------------
    // record_sale
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn cash_sale_updates_entry_totals_and_stock() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(&shop.business_id, &shop.bread, 2, PaymentMethod::Cash, None)
            .await
            .unwrap();

        assert!(!outcome.merged);
        assert_eq!(outcome.amount, Money::from_cents(20_000));
        assert_eq!(outcome.profit, Money::from_cents(6_000));

        let entry = entry(&shop, &outcome.daily_entry_id).await;
        assert_eq!(entry.cash_total_cents, 20_000);
        assert_eq!(entry.mpesa_total_cents, 0);
        assert_eq!(entry.sales_total_cents, 20_000);
        assert_eq!(entry.profit_total_cents, 6_000);
        assert_eq!(entry.debts_total_cents, 0);
        assert!(!entry.closed);

        assert_eq!(stock_of(&shop, &shop.bread).await, 48);
    }

    #[tokio::test]
    async fn same_key_sales_merge_into_one_row() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let first = ledger
            .record_sale(&shop.business_id, &shop.bread, 2, PaymentMethod::Cash, None)
            .await
            .unwrap();
        let second = ledger
            .record_sale(&shop.business_id, &shop.bread, 3, PaymentMethod::Cash, None)
            .await
            .unwrap();

        assert!(second.merged);
        assert_eq!(first.sale_id, second.sale_id);

        let sales = shop
            .db
            .daily_entries()
            .sales_for_entry(&shop.business_id, &first.daily_entry_id)
            .await
            .unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].quantity_sold, 5);
        assert_eq!(sales[0].total_amount_cents, 50_000);
        assert_eq!(sales[0].total_profit_cents, 15_000);

        let entry = entry(&shop, &first.daily_entry_id).await;
        assert_eq!(entry.cash_total_cents, 50_000);
        assert_eq!(stock_of(&shop, &shop.bread).await, 45);
    }

    #[tokio::test]
    async fn different_payment_methods_stay_separate_rows() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let cash = ledger
            .record_sale(&shop.business_id, &shop.bread, 1, PaymentMethod::Cash, None)
            .await
            .unwrap();
        let mpesa = ledger
            .record_sale(&shop.business_id, &shop.bread, 1, PaymentMethod::Mpesa, None)
            .await
            .unwrap();

        assert_ne!(cash.sale_id, mpesa.sale_id);
        assert!(!mpesa.merged);

        let entry = entry(&shop, &cash.daily_entry_id).await;
        assert_eq!(entry.cash_total_cents, 10_000);
        assert_eq!(entry.mpesa_total_cents, 10_000);
        assert_eq!(entry.sales_total_cents, 20_000);
    }

    #[tokio::test]
    async fn insufficient_stock_rejected_with_nothing_written() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let err = ledger
            .record_sale(&shop.business_id, &shop.milk, 11, PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::InsufficientStock { available: 10, requested: 11, .. })
        ));

        assert_eq!(stock_of(&shop, &shop.milk).await, 10);
        let today = shop
            .db
            .daily_entries()
            .get_by_date(&shop.business_id, Local::now().date_naive())
            .await
            .unwrap();
        assert!(today.is_none());
    }

    #[tokio::test]
    async fn foreign_item_is_rejected() {
        let shop = shop().await;
        let other = shop.db.businesses().create("Other Duka", None).await.unwrap();

        let err = shop
            .db
            .ledger()
            .record_sale(&other.id, &shop.bread, 1, PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::Unauthorized { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // Debt sales
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn debt_sale_requires_customer() {
        let shop = shop().await;

        let err = shop
            .db
            .ledger()
            .record_sale(&shop.business_id, &shop.bread, 1, PaymentMethod::Debt, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::MissingCustomer)));
    }

    #[tokio::test]
    async fn debt_sales_accumulate_into_one_pending_debt() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let first = ledger
            .record_sale(
                &shop.business_id,
                &shop.bread,
                5,
                PaymentMethod::Debt,
                Some(&shop.customer_id),
            )
            .await
            .unwrap();
        let second = ledger
            .record_sale(
                &shop.business_id,
                &shop.bread,
                3,
                PaymentMethod::Debt,
                Some(&shop.customer_id),
            )
            .await
            .unwrap();
        assert!(second.merged);

        let debt = shop
            .db
            .customers()
            .get_pending_debt(&shop.business_id, &shop.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(debt.amount_owed_cents, 80_000);
        assert_eq!(debt.remaining_balance_cents, 80_000);
        assert_eq!(debt.amount_paid_cents, 0);

        let items = shop.db.customers().list_debt_items(&debt.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items.iter().map(|i| i.quantity_taken).sum::<i64>(), 8);

        let link = shop
            .db
            .customers()
            .get_link(&shop.business_id, &shop.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.balance_cents, 80_000);

        // Debt never touches sales or profit totals
        let entry = entry(&shop, &first.daily_entry_id).await;
        assert_eq!(entry.debts_total_cents, 80_000);
        assert_eq!(entry.sales_total_cents, 0);
        assert_eq!(entry.profit_total_cents, 0);
        assert_eq!(entry.cash_total_cents, 0);

        assert_eq!(stock_of(&shop, &shop.bread).await, 42);
    }

    #[tokio::test]
    async fn debt_sale_for_unknown_customer_is_rejected() {
        let shop = shop().await;

        let err = shop
            .db
            .ledger()
            .record_sale(
                &shop.business_id,
                &shop.bread,
                1,
                PaymentMethod::Debt,
                Some("missing-customer"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::CustomerNotFound(_))
        ));
        assert_eq!(stock_of(&shop, &shop.bread).await, 50);
    }

    // -------------------------------------------------------------------------
    // Day close / reopen
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn close_reconciles_totals_from_sale_rows() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(&shop.business_id, &shop.bread, 2, PaymentMethod::Cash, None)
            .await
            .unwrap();
        ledger
            .record_sale(&shop.business_id, &shop.milk, 1, PaymentMethod::Mpesa, None)
            .await
            .unwrap();
        ledger
            .record_sale(
                &shop.business_id,
                &shop.bread,
                4,
                PaymentMethod::Debt,
                Some(&shop.customer_id),
            )
            .await
            .unwrap();

        let totals = ledger
            .close_entry(&shop.business_id, &outcome.daily_entry_id)
            .await
            .unwrap();

        assert_eq!(totals.cash, Money::from_cents(20_000));
        assert_eq!(totals.mpesa, Money::from_cents(5_500));
        assert_eq!(totals.sales, Money::from_cents(25_500));
        assert_eq!(totals.debts, Money::from_cents(40_000));
        assert_eq!(totals.profit, Money::from_cents(7_000));
        assert!(totals.is_consistent());

        let entry = entry(&shop, &outcome.daily_entry_id).await;
        assert!(entry.closed);
        assert!(entry.closed_at.is_some());
        assert_eq!(entry.sales_total_cents, 25_500);
        assert_eq!(entry.debts_total_cents, 40_000);
    }

    #[tokio::test]
    async fn close_is_not_idempotent_and_reopen_reverses_it() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let day = ledger.start_new_day(&shop.business_id).await.unwrap();
        ledger.close_entry(&shop.business_id, &day.id).await.unwrap();

        let err = ledger
            .close_entry(&shop.business_id, &day.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::AlreadyClosed(_))));

        ledger.reopen_entry(&shop.business_id, &day.id).await.unwrap();
        let reopened = entry(&shop, &day.id).await;
        assert!(!reopened.closed);
        assert!(reopened.closed_at.is_none());

        let err = ledger
            .reopen_entry(&shop.business_id, &day.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::NotClosed(_))));
    }

    #[tokio::test]
    async fn sales_against_a_closed_day_are_rejected() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let day = ledger.start_new_day(&shop.business_id).await.unwrap();
        ledger.close_entry(&shop.business_id, &day.id).await.unwrap();

        let err = ledger
            .record_sale(&shop.business_id, &shop.bread, 1, PaymentMethod::Cash, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::DayClosed { .. })));
        assert_eq!(stock_of(&shop, &shop.bread).await, 50);
    }

    #[tokio::test]
    async fn start_new_day_is_idempotent() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let a = ledger.start_new_day(&shop.business_id).await.unwrap();
        let b = ledger.start_new_day(&shop.business_id).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.entry_date, Local::now().date_naive());
    }

    // -------------------------------------------------------------------------
    // delete_sale
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn delete_sale_restores_stock_and_totals() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(&shop.business_id, &shop.bread, 3, PaymentMethod::Cash, None)
            .await
            .unwrap();
        ledger
            .delete_sale(&shop.business_id, &outcome.sale_id)
            .await
            .unwrap();

        assert_eq!(stock_of(&shop, &shop.bread).await, 50);
        let entry = entry(&shop, &outcome.daily_entry_id).await;
        assert_eq!(entry.cash_total_cents, 0);
        assert_eq!(entry.sales_total_cents, 0);
        assert_eq!(entry.profit_total_cents, 0);

        let sales = shop
            .db
            .daily_entries()
            .sales_for_entry(&shop.business_id, &outcome.daily_entry_id)
            .await
            .unwrap();
        assert!(sales.is_empty());
    }

    #[tokio::test]
    async fn delete_debt_sale_reverses_debt_and_customer_balance() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(
                &shop.business_id,
                &shop.bread,
                5,
                PaymentMethod::Debt,
                Some(&shop.customer_id),
            )
            .await
            .unwrap();
        ledger
            .delete_sale(&shop.business_id, &outcome.sale_id)
            .await
            .unwrap();

        let debt = shop
            .db
            .customers()
            .get_pending_debt(&shop.business_id, &shop.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(debt.amount_owed_cents, 0);
        assert_eq!(debt.remaining_balance_cents, 0);
        assert!(shop.db.customers().list_debt_items(&debt.id).await.unwrap().is_empty());

        let link = shop
            .db
            .customers()
            .get_link(&shop.business_id, &shop.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.balance_cents, 0);

        let entry = entry(&shop, &outcome.daily_entry_id).await;
        assert_eq!(entry.debts_total_cents, 0);
        assert_eq!(stock_of(&shop, &shop.bread).await, 50);
    }

    #[tokio::test]
    async fn delete_sale_on_closed_day_is_rejected() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(&shop.business_id, &shop.bread, 1, PaymentMethod::Cash, None)
            .await
            .unwrap();
        ledger
            .close_entry(&shop.business_id, &outcome.daily_entry_id)
            .await
            .unwrap();

        let err = ledger
            .delete_sale(&shop.business_id, &outcome.sale_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::DayClosed { .. })));
    }

    #[tokio::test]
    async fn delete_foreign_sale_is_rejected() {
        let shop = shop().await;
        let other = shop.db.businesses().create("Other Duka", None).await.unwrap();

        let outcome = shop
            .db
            .ledger()
            .record_sale(&shop.business_id, &shop.bread, 1, PaymentMethod::Cash, None)
            .await
            .unwrap();

        let err = shop
            .db
            .ledger()
            .delete_sale(&other.id, &outcome.sale_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::Unauthorized { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // decrement_sale
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn decrement_reverses_a_proportional_share() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(&shop.business_id, &shop.bread, 5, PaymentMethod::Cash, None)
            .await
            .unwrap();
        ledger
            .decrement_sale(&shop.business_id, &outcome.sale_id, 2)
            .await
            .unwrap();

        let sales = shop
            .db
            .daily_entries()
            .sales_for_entry(&shop.business_id, &outcome.daily_entry_id)
            .await
            .unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].quantity_sold, 3);
        assert_eq!(sales[0].total_amount_cents, 30_000);
        assert_eq!(sales[0].total_profit_cents, 9_000);

        let entry = entry(&shop, &outcome.daily_entry_id).await;
        assert_eq!(entry.cash_total_cents, 30_000);
        assert_eq!(entry.sales_total_cents, 30_000);
        assert_eq!(entry.profit_total_cents, 9_000);
        assert_eq!(stock_of(&shop, &shop.bread).await, 47);
    }

    #[tokio::test]
    async fn decrement_of_full_quantity_removes_the_row() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(&shop.business_id, &shop.milk, 4, PaymentMethod::Mpesa, None)
            .await
            .unwrap();
        ledger
            .decrement_sale(&shop.business_id, &outcome.sale_id, 4)
            .await
            .unwrap();

        let sales = shop
            .db
            .daily_entries()
            .sales_for_entry(&shop.business_id, &outcome.daily_entry_id)
            .await
            .unwrap();
        assert!(sales.is_empty());

        let entry = entry(&shop, &outcome.daily_entry_id).await;
        assert_eq!(entry.mpesa_total_cents, 0);
        assert_eq!(entry.sales_total_cents, 0);
        assert_eq!(stock_of(&shop, &shop.milk).await, 10);
    }

    #[tokio::test]
    async fn decrement_beyond_quantity_sold_is_rejected() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(&shop.business_id, &shop.bread, 2, PaymentMethod::Cash, None)
            .await
            .unwrap();

        let err = ledger
            .decrement_sale(&shop.business_id, &outcome.sale_id, 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Core(CoreError::DecrementTooLarge { requested: 3, sold: 2 })
        ));
    }

    #[tokio::test]
    async fn decrement_debt_sale_trims_debt_lines() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        // Two debt sales merge into one row (qty 8) with two debt lines
        ledger
            .record_sale(
                &shop.business_id,
                &shop.bread,
                5,
                PaymentMethod::Debt,
                Some(&shop.customer_id),
            )
            .await
            .unwrap();
        let outcome = ledger
            .record_sale(
                &shop.business_id,
                &shop.bread,
                3,
                PaymentMethod::Debt,
                Some(&shop.customer_id),
            )
            .await
            .unwrap();

        ledger
            .decrement_sale(&shop.business_id, &outcome.sale_id, 4)
            .await
            .unwrap();

        let debt = shop
            .db
            .customers()
            .get_pending_debt(&shop.business_id, &shop.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(debt.amount_owed_cents, 40_000);
        assert_eq!(debt.remaining_balance_cents, 40_000);

        let items = shop.db.customers().list_debt_items(&debt.id).await.unwrap();
        assert_eq!(items.iter().map(|i| i.quantity_taken).sum::<i64>(), 4);
        assert_eq!(items.iter().map(|i| i.total_cents).sum::<i64>(), 40_000);

        let link = shop
            .db
            .customers()
            .get_link(&shop.business_id, &shop.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.balance_cents, 40_000);

        let entry = entry(&shop, &outcome.daily_entry_id).await;
        assert_eq!(entry.debts_total_cents, 40_000);

        let sales = shop
            .db
            .daily_entries()
            .sales_for_entry(&shop.business_id, &outcome.daily_entry_id)
            .await
            .unwrap();
        assert_eq!(sales[0].quantity_sold, 4);
        assert_eq!(stock_of(&shop, &shop.bread).await, 46);
    }

    #[tokio::test]
    async fn decrement_after_item_deletion_falls_back_to_stored_averages() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(&shop.business_id, &shop.bread, 5, PaymentMethod::Cash, None)
            .await
            .unwrap();
        shop.db
            .inventory()
            .delete_item(&shop.business_id, &shop.bread)
            .await
            .unwrap();

        ledger
            .decrement_sale(&shop.business_id, &outcome.sale_id, 2)
            .await
            .unwrap();

        // With no live item, the sale row's own averages price the reversal
        let sales = shop
            .db
            .daily_entries()
            .sales_for_entry(&shop.business_id, &outcome.daily_entry_id)
            .await
            .unwrap();
        assert_eq!(sales.len(), 1);
        assert!(sales[0].inventory_id.is_none());
        assert_eq!(sales[0].quantity_sold, 3);
        assert_eq!(sales[0].total_amount_cents, 30_000);
        assert_eq!(sales[0].total_profit_cents, 9_000);

        let entry = entry(&shop, &outcome.daily_entry_id).await;
        assert_eq!(entry.cash_total_cents, 30_000);
        assert_eq!(entry.sales_total_cents, 30_000);
        assert_eq!(entry.profit_total_cents, 9_000);
    }

    #[tokio::test]
    async fn delete_debt_sale_after_item_deletion_still_reverses_balances() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(
                &shop.business_id,
                &shop.bread,
                5,
                PaymentMethod::Debt,
                Some(&shop.customer_id),
            )
            .await
            .unwrap();
        shop.db
            .inventory()
            .delete_item(&shop.business_id, &shop.bread)
            .await
            .unwrap();

        ledger
            .delete_sale(&shop.business_id, &outcome.sale_id)
            .await
            .unwrap();

        let debt = shop
            .db
            .customers()
            .get_pending_debt(&shop.business_id, &shop.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(debt.amount_owed_cents, 0);
        assert!(shop.db.customers().list_debt_items(&debt.id).await.unwrap().is_empty());

        let link = shop
            .db
            .customers()
            .get_link(&shop.business_id, &shop.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.balance_cents, 0);

        let entry = entry(&shop, &outcome.daily_entry_id).await;
        assert_eq!(entry.debts_total_cents, 0);
        let sales = shop
            .db
            .daily_entries()
            .sales_for_entry(&shop.business_id, &outcome.daily_entry_id)
            .await
            .unwrap();
        assert!(sales.is_empty());
    }

    #[tokio::test]
    async fn debt_decrement_after_price_change_keeps_row_proportional() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(
                &shop.business_id,
                &shop.bread,
                5,
                PaymentMethod::Debt,
                Some(&shop.customer_id),
            )
            .await
            .unwrap();

        // Double the retail price after the debt was taken
        sqlx::query("UPDATE inventory_items SET retail_price_cents = 20000 WHERE id = ?1")
            .bind(&shop.bread)
            .execute(shop.db.pool())
            .await
            .unwrap();

        ledger
            .decrement_sale(&shop.business_id, &outcome.sale_id, 2)
            .await
            .unwrap();

        // Reversal uses the recorded debt-line price and the row's own
        // profit share, not the new live price
        let debt = shop
            .db
            .customers()
            .get_pending_debt(&shop.business_id, &shop.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(debt.amount_owed_cents, 30_000);

        let sales = shop
            .db
            .daily_entries()
            .sales_for_entry(&shop.business_id, &outcome.daily_entry_id)
            .await
            .unwrap();
        assert_eq!(sales[0].quantity_sold, 3);
        assert_eq!(sales[0].total_amount_cents, 30_000);
        assert_eq!(sales[0].total_profit_cents, 9_000);

        let entry = entry(&shop, &outcome.daily_entry_id).await;
        assert_eq!(entry.debts_total_cents, 30_000);
    }

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn operations_leave_notification_records() {
        let shop = shop().await;
        let ledger = shop.db.ledger();

        let outcome = ledger
            .record_sale(&shop.business_id, &shop.bread, 1, PaymentMethod::Cash, None)
            .await
            .unwrap();
        ledger
            .record_sale(
                &shop.business_id,
                &shop.milk,
                1,
                PaymentMethod::Debt,
                Some(&shop.customer_id),
            )
            .await
            .unwrap();
        ledger
            .close_entry(&shop.business_id, &outcome.daily_entry_id)
            .await
            .unwrap();

        let records = shop.db.notifications().list(&shop.business_id, 50).await.unwrap();
        // Item additions also notify, so just check the ledger kinds exist
        assert!(records.iter().any(|n| n.kind == NotificationType::PaymentAlert));
        assert!(records.iter().any(|n| n.kind == NotificationType::DebtReminder));
        assert!(records.iter().any(|n| n.kind == NotificationType::DailySummary));
    }
}
