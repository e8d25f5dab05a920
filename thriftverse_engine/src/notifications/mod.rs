//! Best-effort fan-out after an order is materialized.
//!
//! The dispatcher subscribes to [`crate::events::OrderCreatedEvent`] and performs four independent deliveries:
//! buyer confirmation email, seller "item sold" email, seller push message, and the in-app notification record.
//! Every failure is caught and logged on its own; none can roll back the order or surface to the buyer.

mod dispatcher;

use thiserror::Error;

pub use dispatcher::NotificationDispatcher;

#[derive(Debug, Clone, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// An outbound email channel. Implementations live with the server (HTTP mail API client); the engine only needs
/// fire-and-forget semantics.
#[allow(async_fn_in_trait)]
pub trait EmailSender: Clone + Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError>;
}

/// An outbound push channel, addressed by the seller's device token.
#[allow(async_fn_in_trait)]
pub trait PushSender: Clone + Send + Sync {
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), NotificationError>;
}
