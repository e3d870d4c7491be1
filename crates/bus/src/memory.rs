//! In-process bus implementation.
//!
//! [`MemoryBus`] implements the full [`Bus`] contract over bounded tokio
//! channels: plain subscribers each receive a copy of every message on
//! their subject, queue groups receive each message on exactly one member
//! (round-robin), and request/reply rides on unique `_inbox.*` subjects.
//!
//! Delivery applies backpressure: publishing awaits while a subscriber's
//! channel is full, so slow consumers throttle publishers instead of
//! growing an unbounded in-process buffer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::{Bus, BusError, BusMessage, Subscription, SubscriptionId};

/// Buffer capacity of each subscription's delivery channel.
const SUBSCRIPTION_CAPACITY: usize = 256;

struct SubEntry {
    id: SubscriptionId,
    queue: Option<String>,
    sender: mpsc::Sender<BusMessage>,
}

#[derive(Default)]
struct Registry {
    /// Subject → subscribers (plain and queue-grouped).
    subjects: HashMap<String, Vec<SubEntry>>,
    /// Round-robin cursors, keyed by (subject, queue group).
    cursors: HashMap<(String, String), usize>,
    /// Subscription id → subject, for unsubscribe.
    owners: HashMap<SubscriptionId, String>,
}

/// In-process [`Bus`] over tokio channels.
#[derive(Default)]
pub struct MemoryBus {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_subscription(&self, subject: &str, queue: Option<&str>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);

        let mut reg = self.registry.lock().expect("bus registry poisoned");
        reg.subjects.entry(subject.to_string()).or_default().push(SubEntry {
            id,
            queue: queue.map(str::to_string),
            sender,
        });
        reg.owners.insert(id, subject.to_string());

        Subscription { id, receiver }
    }

    /// Pick the delivery targets for one message. Plain subscribers all
    /// receive it; each queue group contributes exactly one member.
    fn delivery_targets(&self, subject: &str) -> Vec<(SubscriptionId, mpsc::Sender<BusMessage>)> {
        let mut reg = self.registry.lock().expect("bus registry poisoned");
        let Some(entries) = reg.subjects.get(subject) else {
            return Vec::new();
        };

        let mut targets = Vec::new();
        let mut groups: HashMap<&str, Vec<(SubscriptionId, &mpsc::Sender<BusMessage>)>> =
            HashMap::new();

        for entry in entries {
            match &entry.queue {
                None => targets.push((entry.id, entry.sender.clone())),
                Some(queue) => groups
                    .entry(queue.as_str())
                    .or_default()
                    .push((entry.id, &entry.sender)),
            }
        }

        let mut picks = Vec::new();
        for (queue, members) in groups {
            let key = (subject.to_string(), queue.to_string());
            let cursor = reg.cursors.get(&key).copied().unwrap_or(0);
            let (id, sender) = members[cursor % members.len()];
            picks.push((key, cursor.wrapping_add(1), id, mpsc::Sender::clone(sender)));
        }
        for (key, next, id, sender) in picks {
            reg.cursors.insert(key, next);
            targets.push((id, sender));
        }

        targets
    }

    fn remove_subscription(&self, id: SubscriptionId) {
        let mut reg = self.registry.lock().expect("bus registry poisoned");
        if let Some(subject) = reg.owners.remove(&id) {
            if let Some(entries) = reg.subjects.get_mut(&subject) {
                entries.retain(|e| e.id != id);
                if entries.is_empty() {
                    reg.subjects.remove(&subject);
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Bus for MemoryBus {
    async fn publish_msg(&self, msg: BusMessage) -> Result<(), BusError> {
        let targets = self.delivery_targets(&msg.subject);
        if targets.is_empty() {
            tracing::trace!(subject = %msg.subject, "no subscribers, message dropped");
            return Ok(());
        }

        for (id, sender) in targets {
            // Awaiting here is the backpressure point.
            if sender.send(msg.clone()).await.is_err() {
                // Receiver dropped without unsubscribing; forget it.
                self.remove_subscription(id);
            }
        }
        Ok(())
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, BusError> {
        let inbox = format!("_inbox.{}", uuid::Uuid::new_v4());
        let mut sub = self.subscribe(&inbox).await?;

        self.publish_msg(BusMessage {
            subject: subject.to_string(),
            reply: Some(inbox),
            payload,
        })
        .await?;

        let outcome = tokio::time::timeout(timeout, sub.receiver.recv()).await;
        self.remove_subscription(sub.id);

        match outcome {
            Ok(Some(reply)) => Ok(reply.payload),
            Ok(None) => Err(BusError::ConnectionClosed),
            Err(_) => Err(BusError::RequestTimeout {
                subject: subject.to_string(),
                timeout,
            }),
        }
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError> {
        Ok(self.add_subscription(subject, None))
    }

    async fn queue_subscribe(&self, subject: &str, queue: &str) -> Result<Subscription, BusError> {
        Ok(self.add_subscription(subject, Some(queue)))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BusError> {
        self.remove_subscription(id);
        Ok(())
    }
}
