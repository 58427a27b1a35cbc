use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use super::event::Envelope;

/// The messaging backbone events are handed to.
#[async_trait]
pub trait EventBackbone: Send + Sync {
    /// Deliver one envelope to `topic`, resolving once the backbone accepted it.
    async fn send(&self, topic: &str, envelope: &Envelope) -> Result<()>;
}

/// Backbone that keeps every envelope in memory.
///
/// Used by tests and by dry runs without a broker.
#[derive(Debug, Default)]
pub struct InMemoryBackbone {
    sent: Mutex<Vec<(String, Envelope)>>,
    fail: bool,
}

impl InMemoryBackbone {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backbone that rejects every envelope.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Every `(topic, envelope)` delivered so far, in delivery order.
    pub fn sent(&self) -> Vec<(String, Envelope)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn sent_to(&self, topic: &str) -> Vec<Envelope> {
        self.sent()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, envelope)| envelope)
            .collect()
    }

    /// Wait until at least `count` envelopes were delivered or `timeout` passed.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<(String, Envelope)> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let sent = self.sent();
            if sent.len() >= count || tokio::time::Instant::now() >= deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl EventBackbone for InMemoryBackbone {
    async fn send(&self, topic: &str, envelope: &Envelope) -> Result<()> {
        if self.fail {
            anyhow::bail!("In-memory backbone rejected message for {}", topic);
        }

        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("In-memory backbone lock poisoned"))?
            .push((topic.to_string(), envelope.clone()));
        Ok(())
    }
}
