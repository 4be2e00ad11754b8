//! # Notification Side-Effect Emitter
//!
//! Fire-and-forget notifications emitted after ledger mutations commit.
//!
//! ## Decoupling Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Ledger vs. Notification Boundary                       │
//! │                                                                         │
//! │  Ledger transaction ──commit──► Notifier.emit(draft)                   │
//! │                                      │                                  │
//! │                                      ├── insert notifications row      │
//! │                                      │      (write-once record)        │
//! │                                      │                                  │
//! │                                      └── PushSender.send(draft)        │
//! │                                             (spawned, one attempt)     │
//! │                                                                         │
//! │  Either step may fail: failures are logged and swallowed, NEVER        │
//! │  propagated as a ledger failure, and the committed mutation is         │
//! │  never rolled back. Retry/backoff belongs to the push collaborator.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};

use crate::repository::notification::NotificationRepository;
use duka_core::NotificationDraft;

// =============================================================================
// Push Gateway
// =============================================================================

/// Push delivery errors. Observational only; callers log and move on.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push endpoint returned status {status}")]
    Status { status: u16 },
}

/// External push-delivery collaborator.
///
/// Implementations must be cheap to call and must not block the ledger:
/// one attempt per draft, no internal retry queue.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, draft: &NotificationDraft) -> Result<(), PushError>;
}

/// Push gateway that drops every message. Default for tests and for
/// deployments without registered devices.
#[derive(Debug, Clone, Default)]
pub struct NoopPush;

#[async_trait]
impl PushSender for NoopPush {
    async fn send(&self, _draft: &NotificationDraft) -> Result<(), PushError> {
        Ok(())
    }
}

/// Expo push gateway: posts one message per registered device token.
///
/// ## Example
/// ```rust,ignore
/// let push = Arc::new(ExpoPush::new(vec!["ExponentPushToken[...]".into()]));
/// let db = Database::new(config).await?.with_push_sender(push);
/// ```
#[derive(Debug, Clone)]
pub struct ExpoPush {
    client: reqwest::Client,
    endpoint: String,
    tokens: Vec<String>,
}

/// Expo's public push-send endpoint.
pub const EXPO_PUSH_ENDPOINT: &str = "https://exp.host/--/api/v2/push/send";

/// Hard ceiling on one push request; a hung endpoint must not hold the
/// delivery task open indefinitely.
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

impl ExpoPush {
    /// Creates a gateway targeting the public Expo endpoint.
    pub fn new(tokens: Vec<String>) -> Self {
        Self::with_endpoint(EXPO_PUSH_ENDPOINT, tokens)
    }

    /// Creates a gateway with a custom endpoint (tests, proxies).
    pub fn with_endpoint(endpoint: impl Into<String>, tokens: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Falling back to default push client");
                reqwest::Client::new()
            });

        ExpoPush {
            client,
            endpoint: endpoint.into(),
            tokens,
        }
    }
}

#[async_trait]
impl PushSender for ExpoPush {
    async fn send(&self, draft: &NotificationDraft) -> Result<(), PushError> {
        if self.tokens.is_empty() {
            return Ok(());
        }

        let messages: Vec<serde_json::Value> = self
            .tokens
            .iter()
            .map(|token| {
                serde_json::json!({
                    "to": token,
                    "sound": "default",
                    "title": draft.title,
                    "body": draft.message,
                    "data": {
                        "type": draft.kind,
                        "entityId": draft.entity_id,
                        "entityType": draft.entity_type,
                        "metadata": draft.metadata,
                    },
                    "priority": "high",
                    "channelId": "default",
                })
            })
            .collect();

        let response = self
            .client
            .post(&self.endpoint)
            .json(&messages)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PushError::Status {
                status: response.status().as_u16(),
            });
        }

        debug!(devices = self.tokens.len(), "Push notification sent");
        Ok(())
    }
}

// =============================================================================
// Notifier
// =============================================================================

/// The notification collaborator invoked after state changes.
///
/// Emitting never fails from the caller's point of view.
#[derive(Clone)]
pub struct Notifier {
    records: NotificationRepository,
    push: Arc<dyn PushSender>,
}

impl Notifier {
    /// Creates a new Notifier.
    pub fn new(pool: SqlitePool, push: Arc<dyn PushSender>) -> Self {
        Notifier {
            records: NotificationRepository::new(pool),
            push,
        }
    }

    /// Records the draft and attempts delivery once.
    ///
    /// Both steps are independent of the ledger transaction that produced
    /// the draft; failures are logged, not surfaced. The push attempt runs
    /// on a spawned task so a slow gateway cannot stall the caller.
    pub async fn emit(&self, draft: NotificationDraft) {
        match self.records.insert(&draft).await {
            Ok(notification) => {
                debug!(id = %notification.id, title = %draft.title, "Notification recorded");
            }
            Err(err) => {
                warn!(error = %err, title = %draft.title, "Failed to record notification");
            }
        }

        let push = Arc::clone(&self.push);
        tokio::spawn(async move {
            if let Err(err) = push.send(&draft).await {
                warn!(error = %err, title = %draft.title, "Push delivery failed");
            }
        });
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use duka_core::NotificationType;

    /// A push gateway whose send future never resolves.
    struct StalledPush;

    #[async_trait]
    impl PushSender for StalledPush {
        async fn send(&self, _draft: &NotificationDraft) -> Result<(), PushError> {
            std::future::pending().await
        }
    }

    fn draft(business_id: &str) -> NotificationDraft {
        NotificationDraft {
            business_id: business_id.to_string(),
            kind: NotificationType::System,
            title: "Test".to_string(),
            message: "Test message".to_string(),
            entity_id: None,
            entity_type: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn emit_returns_even_when_push_never_resolves() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let business = db.businesses().create("Test Duka", None).await.unwrap();
        let notifier = Notifier::new(db.pool().clone(), Arc::new(StalledPush));

        tokio::time::timeout(Duration::from_secs(2), notifier.emit(draft(&business.id)))
            .await
            .expect("emit must not wait on push delivery");

        // The record is still written inline
        let unread = db.notifications().unread_count(&business.id).await.unwrap();
        assert_eq!(unread, 1);
    }
}
