//! # Business Repository
//!
//! Minimal surface for the business records every ledger row is scoped to.
//! Identity/auth resolution is out of scope; callers arrive with a
//! `business_id` they are already authorized for.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::new_id;
use duka_core::Business;

/// Repository for business records.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    pool: SqlitePool,
}

impl BusinessRepository {
    /// Creates a new BusinessRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BusinessRepository { pool }
    }

    /// Creates a business.
    pub async fn create(&self, name: &str, owner_name: Option<&str>) -> DbResult<Business> {
        let business = Business {
            id: new_id(),
            name: name.trim().to_string(),
            owner_name: owner_name.map(|o| o.trim().to_string()),
            created_at: Utc::now(),
        };

        debug!(id = %business.id, name = %business.name, "Creating business");

        sqlx::query(
            r#"
            INSERT INTO businesses (id, name, owner_name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.owner_name)
        .bind(business.created_at)
        .execute(&self.pool)
        .await?;

        Ok(business)
    }

    /// Counts all businesses.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM businesses")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Gets a business by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Business>> {
        let business = sqlx::query_as::<_, Business>(
            r#"
            SELECT id, name, owner_name, created_at
            FROM businesses
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(business)
    }
}
