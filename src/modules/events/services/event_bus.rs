use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::core::Result;
use crate::modules::events::models::DomainEvent;

/// Outbound publish port
///
/// Delivery is at-most-once; implementations never retry.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<()>;
}

/// Single-process bus fanning events out to every subscriber
///
/// Publishing with no live subscribers is not an error.
pub struct InProcessEventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl InProcessEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventBus for InProcessEventBus {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                debug!(topic = %event.topic, event_id = %event.event_id, receivers, "Event published");
            }
            Err(_) => {
                debug!(topic = %event.topic, event_id = %event.event_id, "Event published without subscribers");
            }
        }
        Ok(())
    }
}
