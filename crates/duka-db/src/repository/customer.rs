//! # Customer Repository
//!
//! Customers, business-customer links, and the debt read surface.
//!
//! ## Balance Mirror
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  debts.balance_cents          ← per-debt outstanding amount            │
//! │  business_customers.balance   ← cached mirror per (business, customer) │
//! │                                                                         │
//! │  The ledger increments both in lockstep inside one transaction;        │
//! │  this repository only reads them.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbResult, LedgerResult};
use crate::repository::new_id;
use duka_core::validation::validate_phone_number;
use duka_core::{
    BusinessCustomer, Customer, CustomerWithBalance, Debt, DebtItem, ValidationError,
};

/// Repository for customer and debt read operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Adds a customer and links them to the business with a zero balance.
    pub async fn add_customer(
        &self,
        business_id: &str,
        full_name: &str,
        phone_number: &str,
        email_address: Option<&str>,
    ) -> LedgerResult<Customer> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationError::Required {
                field: "full_name".to_string(),
            }
            .into());
        }
        validate_phone_number(phone_number)?;

        let now = Utc::now();
        let customer = Customer {
            id: new_id(),
            full_name: full_name.to_string(),
            phone_number: phone_number.trim().to_string(),
            email_address: email_address.map(|e| e.trim().to_string()),
            created_at: now,
        };

        debug!(id = %customer.id, business_id = %business_id, "Adding customer");

        let mut tx = self.pool.begin().await.map_err(crate::error::DbError::from)?;

        sqlx::query(
            r#"
            INSERT INTO customers (id, full_name, phone_number, email_address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.full_name)
        .bind(&customer.phone_number)
        .bind(&customer.email_address)
        .bind(customer.created_at)
        .execute(&mut *tx)
        .await
        .map_err(crate::error::DbError::from)?;

        sqlx::query(
            r#"
            INSERT INTO business_customers (id, business_id, customer_id, balance_cents, joined_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
        )
        .bind(new_id())
        .bind(business_id)
        .bind(&customer.id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(crate::error::DbError::from)?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        Ok(customer)
    }

    /// Lists a business's customers joined with their cached balances.
    pub async fn list_customers(&self, business_id: &str) -> DbResult<Vec<CustomerWithBalance>> {
        let customers = sqlx::query_as::<_, CustomerWithBalance>(
            r#"
            SELECT c.id, c.full_name, c.phone_number, c.email_address,
                   bc.balance_cents, bc.joined_at
            FROM business_customers bc
            INNER JOIN customers c ON c.id = bc.customer_id
            WHERE bc.business_id = ?1
            ORDER BY c.full_name
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Gets the business-customer link (with the cached balance mirror).
    pub async fn get_link(
        &self,
        business_id: &str,
        customer_id: &str,
    ) -> DbResult<Option<BusinessCustomer>> {
        let link = sqlx::query_as::<_, BusinessCustomer>(
            r#"
            SELECT id, business_id, customer_id, balance_cents, joined_at
            FROM business_customers
            WHERE business_id = ?1 AND customer_id = ?2
            "#,
        )
        .bind(business_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    /// Gets the customer's pending debt for this business, if any.
    ///
    /// At most one exists (enforced by a partial unique index).
    pub async fn get_pending_debt(
        &self,
        business_id: &str,
        customer_id: &str,
    ) -> DbResult<Option<Debt>> {
        let debt = sqlx::query_as::<_, Debt>(
            r#"
            SELECT id, business_id, customer_id, sale_id,
                   amount_owed_cents, amount_paid_cents,
                   remaining_balance_cents, balance_cents,
                   status, created_at, updated_at
            FROM debts
            WHERE business_id = ?1 AND customer_id = ?2 AND status = 'pending'
            "#,
        )
        .bind(business_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(debt)
    }

    /// Lists a debt's line items, oldest first.
    pub async fn list_debt_items(&self, debt_id: &str) -> DbResult<Vec<DebtItem>> {
        let items = sqlx::query_as::<_, DebtItem>(
            r#"
            SELECT id, debt_id, sale_id, inventory_id, name,
                   quantity_taken, price_cents, total_cents, created_at
            FROM debt_items
            WHERE debt_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(debt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
