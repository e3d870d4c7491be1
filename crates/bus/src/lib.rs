//! Message-bus abstraction for the taskgate gateway.
//!
//! The gateway consumes the bus through the narrow [`Bus`] trait: publish,
//! request/reply, and (queue-group) subscriptions. [`MemoryBus`] is a
//! complete in-process implementation used by tests and embedded
//! deployments; production deployments plug in an adapter over their real
//! messaging substrate.

pub mod memory;

use std::time::Duration;

use tokio::sync::mpsc;

pub use memory::MemoryBus;

/// Identifier handed out by [`Bus::subscribe`] / [`Bus::queue_subscribe`],
/// used to cancel the subscription later.
pub type SubscriptionId = u64;

/// A raw message delivered by the bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Subject the message was published on.
    pub subject: String,
    /// Per-message reply address for request/reply exchanges.
    pub reply: Option<String>,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

/// An active subscription: the id used to unsubscribe plus the receiving
/// end of the delivery channel.
///
/// Once the subscription is cancelled, the receiver yields any messages the
/// bus had already buffered and then reports end-of-stream.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub receiver: mpsc::Receiver<BusMessage>,
}

/// Error raised by bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus refused or failed to deliver.
    #[error("publish to {subject} failed: {reason}")]
    Publish { subject: String, reason: String },

    /// No reply arrived within the request timeout.
    #[error("request to {subject} timed out after {timeout:?}")]
    RequestTimeout { subject: String, timeout: Duration },

    /// The bus connection is gone.
    #[error("bus connection closed")]
    ConnectionClosed,
}

/// Publish/subscribe/request-reply messaging substrate.
///
/// Implementations must deliver each message published on a subject to
/// every plain subscriber of that subject and to exactly one member of
/// each queue group subscribed to it.
#[async_trait::async_trait]
pub trait Bus: Send + Sync {
    /// Publish a message, optionally carrying a reply address.
    async fn publish_msg(&self, msg: BusMessage) -> Result<(), BusError>;

    /// Perform a request/reply exchange: publish `payload` on `subject`
    /// with a fresh reply address and await a single reply.
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, BusError>;

    /// Subscribe to every message published on `subject`.
    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError>;

    /// Join `queue` on `subject`; each message goes to exactly one member
    /// of the group.
    async fn queue_subscribe(&self, subject: &str, queue: &str) -> Result<Subscription, BusError>;

    /// Cancel a subscription. Messages already buffered for it remain
    /// readable; the receiver then observes end-of-stream.
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BusError>;
}

/// Convenience wrapper over [`Bus::publish_msg`] for messages without a
/// reply address.
pub async fn publish(bus: &dyn Bus, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
    bus.publish_msg(BusMessage {
        subject: subject.to_string(),
        reply: None,
        payload,
    })
    .await
}
