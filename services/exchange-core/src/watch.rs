//! Armed watch conditions
//!
//! Holds the stop/OCO conditions produced by intent normalization and
//! scans them against executed-trade prices. Triggered watches are removed
//! and handed back to the core, which cancels any OCO sibling and re-enters
//! the watch's order through normal admission.

use std::sync::RwLock;

use types::ids::{OrderId, Symbol, WatchId};
use types::intent::WatchCondition;
use types::numeric::Price;

/// Armed watch conditions across all symbols
#[derive(Debug, Default)]
pub struct WatchList {
    watches: RwLock<Vec<WatchCondition>>,
}

impl WatchList {
    pub fn new() -> Self {
        Self {
            watches: RwLock::new(Vec::new()),
        }
    }

    /// Arm a watch
    pub fn add(&self, watch: WatchCondition) {
        self.watches.write().expect("watch list poisoned").push(watch);
    }

    /// Remove and return every watch of `symbol` triggered by `last_price`
    pub fn take_triggered(&self, symbol: &Symbol, last_price: Price) -> Vec<WatchCondition> {
        let mut watches = self.watches.write().expect("watch list poisoned");
        let mut triggered = Vec::new();
        watches.retain(|watch| {
            if watch.symbol == *symbol && watch.should_trigger(last_price) {
                triggered.push(watch.clone());
                false
            } else {
                true
            }
        });
        triggered
    }

    /// Drop watches linked to a completed or cancelled sibling order
    ///
    /// Returns the number of watches removed.
    pub fn drop_for_sibling(&self, order_id: OrderId) -> usize {
        let mut watches = self.watches.write().expect("watch list poisoned");
        let before = watches.len();
        watches.retain(|watch| watch.oco_sibling != Some(order_id));
        before - watches.len()
    }

    /// Remove one watch by id (user-requested cancellation)
    pub fn remove(&self, watch_id: WatchId) -> Option<WatchCondition> {
        let mut watches = self.watches.write().expect("watch list poisoned");
        let position = watches.iter().position(|watch| watch.watch_id == watch_id)?;
        Some(watches.remove(position))
    }

    /// Copy of all armed watches
    pub fn snapshot(&self) -> Vec<WatchCondition> {
        self.watches.read().expect("watch list poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.watches.read().expect("watch list poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
