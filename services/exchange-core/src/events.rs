//! Outbound event stream
//!
//! The core publishes one event per order acceptance, executed trade, and
//! cancellation, in sequence order. Transport and formatting belong to the
//! consumers (tickers, candle builders, publish/subscribe fan-out); the
//! core only promises ordered delivery into a sink.

use matching_engine::events::MarketEvent;
use std::sync::RwLock;

/// Consumer of the core's outbound events
pub trait EventSink: Send + Sync {
    fn publish(&self, event: MarketEvent);
}

/// In-process sink collecting events in publication order
///
/// The default wiring for tests and embedded use; a transport-facing
/// implementation replaces it at the integration boundary.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: RwLock<Vec<MarketEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }

    /// Copy of all published events, in publication order
    pub fn events(&self) -> Vec<MarketEvent> {
        self.events.read().expect("event sink poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().expect("event sink poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemoryEventSink {
    fn publish(&self, event: MarketEvent) {
        self.events.write().expect("event sink poisoned").push(event);
    }
}
