use async_trait::async_trait;
use bastion_core::TradingEvent;

/// Publisher for outbound trading events
///
/// Events are published to subscribers (UI, notification delivery, etc.)
/// This decouples the core from the delivery mechanism.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to all subscribers
    async fn publish(&self, event: TradingEvent);

    /// Get the number of active subscribers
    fn subscriber_count(&self) -> usize;
}
