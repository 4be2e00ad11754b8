//! # Daily Entry Repository
//!
//! Read surface for daily entries and their sale rows.
//!
//! All daily entry MUTATIONS (start day, record sale, close, reopen,
//! delete/decrement sale) go through the Ledger engine; this repository
//! only answers queries.

use chrono::{Local, NaiveDate};
use sqlx::SqlitePool;

use crate::error::DbResult;
use duka_core::{DailyEntry, Sale};

const ENTRY_COLUMNS: &str = r#"
    id, business_id, entry_date, closed, closed_at,
    cash_total_cents, mpesa_total_cents, sales_total_cents,
    debts_total_cents, profit_total_cents, created_at
"#;

/// Repository for daily entry queries.
#[derive(Debug, Clone)]
pub struct DailyEntryRepository {
    pool: SqlitePool,
}

impl DailyEntryRepository {
    /// Creates a new DailyEntryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DailyEntryRepository { pool }
    }

    /// Gets an entry by ID, scoped to the owning business.
    pub async fn get_by_id(&self, business_id: &str, id: &str) -> DbResult<Option<DailyEntry>> {
        let entry = sqlx::query_as::<_, DailyEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM daily_entries WHERE id = ?1 AND business_id = ?2"
        ))
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets today's entry (local calendar day), if one exists.
    pub async fn get_today(&self, business_id: &str) -> DbResult<Option<DailyEntry>> {
        self.get_by_date(business_id, Local::now().date_naive()).await
    }

    /// Gets the entry for a specific calendar day, if one exists.
    pub async fn get_by_date(
        &self,
        business_id: &str,
        date: NaiveDate,
    ) -> DbResult<Option<DailyEntry>> {
        let entry = sqlx::query_as::<_, DailyEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM daily_entries WHERE business_id = ?1 AND entry_date = ?2"
        ))
        .bind(business_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Lists the most recent entries, newest first.
    pub async fn list_recent(&self, business_id: &str, limit: u32) -> DbResult<Vec<DailyEntry>> {
        let entries = sqlx::query_as::<_, DailyEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM daily_entries
            WHERE business_id = ?1
            ORDER BY entry_date DESC
            LIMIT ?2
            "#
        ))
        .bind(business_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists the sale rows linked to an entry, newest first.
    pub async fn sales_for_entry(
        &self,
        business_id: &str,
        daily_entry_id: &str,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, business_id, daily_entry_id, inventory_id, item_name,
                   quantity_sold, payment_method,
                   total_amount_cents, total_profit_cents,
                   created_at, updated_at
            FROM sales
            WHERE daily_entry_id = ?1 AND business_id = ?2
            ORDER BY created_at DESC
            "#,
        )
        .bind(daily_entry_id)
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}
