//! # Notification Repository
//!
//! Storage for write-once notification records.
//!
//! Notifications are observational: they are written after a ledger
//! mutation commits and are never part of ledger correctness. The read
//! surface (lists, unread counts, mark-read) backs an in-app inbox.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::new_id;
use duka_core::{Notification, NotificationDraft};

/// Repository for notification records.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

const NOTIFICATION_COLUMNS: &str = r#"
    id, business_id, kind, title, message,
    entity_id, entity_type, is_read, read_at, metadata, created_at
"#;

impl NotificationRepository {
    /// Creates a new NotificationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Persists a draft as a write-once record, returning the stored row.
    pub async fn insert(&self, draft: &NotificationDraft) -> DbResult<Notification> {
        let notification = Notification {
            id: new_id(),
            business_id: draft.business_id.clone(),
            kind: draft.kind,
            title: draft.title.clone(),
            message: draft.message.clone(),
            entity_id: draft.entity_id.clone(),
            entity_type: draft.entity_type,
            is_read: false,
            read_at: None,
            metadata: draft.metadata.as_ref().map(|m| m.to_string()),
            created_at: Utc::now(),
        };

        debug!(
            id = %notification.id,
            kind = ?notification.kind,
            "Inserting notification"
        );

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, business_id, kind, title, message,
                entity_id, entity_type, is_read, read_at, metadata, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.business_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.entity_id)
        .bind(notification.entity_type)
        .bind(notification.is_read)
        .bind(notification.read_at)
        .bind(&notification.metadata)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(notification)
    }

    /// Lists a business's notifications, newest first.
    pub async fn list(&self, business_id: &str, limit: u32) -> DbResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE business_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#
        ))
        .bind(business_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    /// Counts unread notifications for a business.
    pub async fn unread_count(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE business_id = ?1 AND is_read = 0",
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marks one notification as read.
    pub async fn mark_read(&self, business_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = 1, read_at = ?3
            WHERE id = ?1 AND business_id = ?2 AND is_read = 0
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::DbError::not_found("Notification", id));
        }

        Ok(())
    }

    /// Marks all of a business's notifications as read, returning how many.
    pub async fn mark_all_read(&self, business_id: &str) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = 1, read_at = ?2
            WHERE business_id = ?1 AND is_read = 0
            "#,
        )
        .bind(business_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a notification.
    pub async fn delete(&self, business_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?1 AND business_id = ?2")
            .bind(id)
            .bind(business_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::DbError::not_found("Notification", id));
        }

        Ok(())
    }
}
