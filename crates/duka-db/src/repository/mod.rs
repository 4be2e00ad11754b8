//! # Repository Module
//!
//! Database repository implementations for the Duka ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │                                                                 │
//! │       │  db.inventory().list(&business_id)                             │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                   │
//! │  ├── add_item(&self, ...)                                              │
//! │  ├── get_by_id(&self, business_id, id)                                 │
//! │  ├── restock(&self, business_id, id, qty)                              │
//! │  └── list(&self, business_id)                                          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  The multi-table ledger mutations do NOT live here: they belong to     │
//! │  the Ledger engine, which runs them inside a single transaction.       │
//! │  Repositories cover the single-table CRUD and read surface.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`business::BusinessRepository`] - Business records
//! - [`inventory::InventoryRepository`] - Catalog CRUD and restocking
//! - [`customer::CustomerRepository`] - Customers, links, debts
//! - [`daily_entry::DailyEntryRepository`] - Daily entry read surface
//! - [`notification::NotificationRepository`] - Notification records

pub mod business;
pub mod customer;
pub mod daily_entry;
pub mod inventory;
pub mod notification;

use uuid::Uuid;

/// Generates a new entity ID (UUID v4, offline-safe).
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}
