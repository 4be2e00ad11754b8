//! # duka-db: Database & Ledger Layer for Duka Ledger
//!
//! This crate provides persistence and the ledger engine for the Duka Ledger
//! system. It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Duka Ledger Data Flow                             │
//! │                                                                         │
//! │  Caller (record_sale, close_entry, ...)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      duka-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Ledger     │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (ledger.rs)  │    │ (inventory,   │    │  (embedded)  │  │   │
//! │  │   │               │    │  customer,    │    │              │  │   │
//! │  │   │ record_sale   │◄───│  daily_entry, │    │ 001_initial  │  │   │
//! │  │   │ close_entry   │    │  ...)         │    │  _schema.sql │  │   │
//! │  │   │ delete_sale   │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │            duka.db (WAL mode, single writer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and combined ledger error types
//! - [`ledger`] - The sales & debt ledger engine
//! - [`notify`] - Notification records and push delivery
//! - [`repository`] - Repository implementations (inventory, customer, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use duka_db::{Database, DbConfig};
//! use duka_core::PaymentMethod;
//!
//! // Create database with default config (migrations run automatically)
//! let config = DbConfig::new("path/to/duka.db");
//! let db = Database::new(config).await?;
//!
//! // Record a cash sale through the ledger engine
//! let ledger = db.ledger();
//! let outcome = ledger
//!     .record_sale(&business_id, &item_id, 2, PaymentMethod::Cash, None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod notify;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, LedgerError};
pub use ledger::{Ledger, SaleOutcome};
pub use notify::{ExpoPush, NoopPush, Notifier, PushSender};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::business::BusinessRepository;
pub use repository::customer::CustomerRepository;
pub use repository::daily_entry::DailyEntryRepository;
pub use repository::inventory::{InventoryRepository, NewInventoryItem};
pub use repository::notification::NotificationRepository;
