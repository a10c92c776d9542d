use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::events::messages::QueueMessage;
use crate::events::queue::{Delivery, MessageQueue, QueueError};

#[derive(Debug)]
struct Entry {
    body: String,
    visible_at: Instant,
    delivery_count: u32,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    entries: BTreeMap<u64, Entry>,
}

/// Process-local queue with visibility timeouts
///
/// Behaves like the Postgres queue: received messages are hidden rather
/// than removed, and only a delete with the latest receipt acknowledges them.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    state: Mutex<State>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a raw body as-is, bypassing encoding
    pub async fn push_raw(&self, body: impl Into<String>) {
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;
        state.entries.insert(
            id,
            Entry {
                body: body.into(),
                visible_at: Instant::now(),
                delivery_count: 0,
            },
        );
    }

    /// Messages not yet deleted, visible or not
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn publish(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let body = message.to_json()?;
        self.push_raw(body).await;
        Ok(())
    }

    async fn receive(&self, max: usize, visibility: Duration) -> Result<Vec<Delivery>, QueueError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        let deliveries = state
            .entries
            .iter_mut()
            .filter(|(_, entry)| entry.visible_at <= now)
            .take(max)
            .map(|(id, entry)| {
                entry.delivery_count += 1;
                entry.visible_at = now + visibility;
                Delivery {
                    receipt: format!("{}:{}", id, entry.delivery_count),
                    body: entry.body.clone(),
                    delivery_count: entry.delivery_count,
                }
            })
            .collect();

        Ok(deliveries)
    }

    async fn delete(&self, receipt: &str) -> Result<(), QueueError> {
        let (id, count) = super::parse_receipt(receipt)?;
        let mut state = self.state.lock().await;

        let current = state.entries.get(&id).map(|entry| entry.delivery_count);
        if current != Some(count) {
            return Err(QueueError::UnknownReceipt(receipt.to_string()));
        }
        state.entries.remove(&id);
        Ok(())
    }
}
