//! # Inventory Repository
//!
//! Catalog operations for sellable items.
//!
//! ## Stock Mutations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Touches quantity_available                       │
//! │                                                                         │
//! │  THIS REPOSITORY            THE LEDGER ENGINE                          │
//! │  ├── add_item (initial)     ├── record_sale   (decrement, guarded)     │
//! │  └── restock  (delta +)     ├── delete_sale   (restore)                │
//! │                             └── decrement_sale (restore)               │
//! │                                                                         │
//! │  Stock updates are DELTA updates (quantity_available + ?), never       │
//! │  absolute writes, so concurrent mutations compose instead of           │
//! │  clobbering each other.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbResult, LedgerResult};
use crate::notify::Notifier;
use crate::repository::new_id;
use duka_core::validation::{normalize_item_name, validate_price, validate_quantity};
use duka_core::{
    CoreError, EntityType, InventoryItem, NotificationDraft, NotificationType, ValidationError,
    DEFAULT_CATEGORY, DEFAULT_UNIT,
};

/// Parameters for adding a new inventory item.
#[derive(Debug, Clone, Default)]
pub struct NewInventoryItem {
    pub name: String,
    pub cost_price_cents: i64,
    pub retail_price_cents: i64,
    pub quantity_available: i64,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Repository for inventory item operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
    notifier: Notifier,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool, notifier: Notifier) -> Self {
        InventoryRepository { pool, notifier }
    }

    /// Adds a new item to a business's catalog.
    ///
    /// ## Rules
    /// - Name is normalized (trimmed, lowercased) and unique per business
    /// - Prices must not be negative; initial stock must not be negative
    ///
    /// ## Errors
    /// - `CoreError::DuplicateItem` - an item with this name already exists
    pub async fn add_item(
        &self,
        business_id: &str,
        new: NewInventoryItem,
    ) -> LedgerResult<InventoryItem> {
        let name = normalize_item_name(&new.name)?;
        validate_price("cost_price", new.cost_price_cents)?;
        validate_price("retail_price", new.retail_price_cents)?;
        if new.quantity_available < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "quantity_available".to_string(),
            }
            .into());
        }

        debug!(business_id = %business_id, name = %name, "Adding inventory item");

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM inventory_items WHERE business_id = ?1 AND name = ?2")
                .bind(business_id)
                .bind(&name)
                .fetch_optional(&self.pool)
                .await
                .map_err(crate::error::DbError::from)?;

        if existing.is_some() {
            return Err(CoreError::DuplicateItem { name }.into());
        }

        let now = Utc::now();
        let item = InventoryItem {
            id: new_id(),
            business_id: business_id.to_string(),
            name,
            cost_price_cents: new.cost_price_cents,
            retail_price_cents: new.retail_price_cents,
            quantity_available: new.quantity_available,
            unit: new.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            category: new.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            image_url: new.image_url,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, business_id, name,
                cost_price_cents, retail_price_cents, quantity_available,
                unit, category, image_url,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&item.id)
        .bind(&item.business_id)
        .bind(&item.name)
        .bind(item.cost_price_cents)
        .bind(item.retail_price_cents)
        .bind(item.quantity_available)
        .bind(&item.unit)
        .bind(&item.category)
        .bind(&item.image_url)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::from)?;

        self.notifier
            .emit(NotificationDraft {
                business_id: business_id.to_string(),
                kind: NotificationType::StockAlert,
                title: "New Inventory Item Added".to_string(),
                message: format!(
                    "Added {} units of \"{}\" to inventory.",
                    item.quantity_available, item.name
                ),
                entity_id: Some(item.id.clone()),
                entity_type: Some(EntityType::Inventory),
                metadata: Some(serde_json::json!({
                    "name": item.name,
                    "costPrice": item.cost_price_cents,
                    "retailPrice": item.retail_price_cents,
                    "quantityAvailable": item.quantity_available,
                    "category": item.category,
                })),
            })
            .await;

        Ok(item)
    }

    /// Gets an item by ID, scoped to the owning business.
    pub async fn get_by_id(&self, business_id: &str, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, business_id, name,
                   cost_price_cents, retail_price_cents, quantity_available,
                   unit, category, image_url,
                   created_at, updated_at
            FROM inventory_items
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists a business's catalog, ordered by name.
    pub async fn list(&self, business_id: &str) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, business_id, name,
                   cost_price_cents, retail_price_cents, quantity_available,
                   unit, category, image_url,
                   created_at, updated_at
            FROM inventory_items
            WHERE business_id = ?1
            ORDER BY name
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Adds `quantity` units to an item's stock (explicit restock).
    ///
    /// Delta update: composes with concurrent sales instead of overwriting.
    pub async fn restock(&self, business_id: &str, id: &str, quantity: i64) -> LedgerResult<()> {
        validate_quantity(quantity)?;

        debug!(id = %id, quantity = %quantity, "Restocking item");

        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET quantity_available = quantity_available + ?3,
                updated_at = ?4
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(id)
        .bind(business_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ItemNotFound(id.to_string()).into());
        }

        Ok(())
    }

    /// Removes an item from the catalog.
    ///
    /// Sale and debt history keep their name snapshots; their
    /// `inventory_id` references become NULL.
    pub async fn delete_item(&self, business_id: &str, id: &str) -> LedgerResult<()> {
        debug!(id = %id, "Deleting inventory item");

        let result = sqlx::query("DELETE FROM inventory_items WHERE id = ?1 AND business_id = ?2")
            .bind(id)
            .bind(business_id)
            .execute(&self.pool)
            .await
            .map_err(crate::error::DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ItemNotFound(id.to_string()).into());
        }

        Ok(())
    }

    /// Counts a business's items (for diagnostics).
    pub async fn count(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items WHERE business_id = ?1")
                .bind(business_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
