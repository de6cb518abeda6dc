//! Broadcast-based event publisher

use async_trait::async_trait;
use bastion_core::TradingEvent;
use bastion_ports::EventPublisher;
use dashmap::DashMap;
use log::trace;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast-based event publisher
///
/// Uses tokio broadcast channels to publish events to multiple subscribers.
/// Supports both global subscriptions and per-symbol subscriptions.
/// Slow subscribers lag and lose the oldest events; publishing never blocks.
#[derive(Clone)]
pub struct BroadcastEventPublisher {
    /// Global broadcast channel for all events
    global_tx: broadcast::Sender<TradingEvent>,
    /// Per-symbol broadcast channels
    symbol_channels: Arc<DashMap<String, broadcast::Sender<TradingEvent>>>,
    /// Channel capacity
    capacity: usize,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (global_tx, _) = broadcast::channel(capacity);

        BroadcastEventPublisher {
            global_tx,
            symbol_channels: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> broadcast::Receiver<TradingEvent> {
        self.global_tx.subscribe()
    }

    /// Subscribe to events for a specific symbol
    pub fn subscribe_symbol(&self, symbol: &str) -> broadcast::Receiver<TradingEvent> {
        self.symbol_channels
            .entry(symbol.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: TradingEvent) {
        trace!("[EVENTS] {}", event.name());

        // Send errors only mean nobody is listening
        if let Some(symbol) = event.symbol() {
            if let Some(tx) = self.symbol_channels.get(symbol) {
                let _ = tx.send(event.clone());
            }
        }
        let _ = self.global_tx.send(event);
    }

    fn subscriber_count(&self) -> usize {
        self.global_tx.receiver_count()
            + self
                .symbol_channels
                .iter()
                .map(|tx| tx.receiver_count())
                .sum::<usize>()
    }
}
