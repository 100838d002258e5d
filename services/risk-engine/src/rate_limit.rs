//! Per-user sliding-window rate limiter
//!
//! Tracks the timestamps of recently accepted submissions per user and
//! rejects a submission once the rolling window is full. Only accepted
//! submissions are recorded, so rejected attempts do not extend the window.

use dashmap::DashMap;
use std::collections::VecDeque;
use types::ids::UserId;

/// Keyed sliding-window limiter
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    windows: DashMap<UserId, VecDeque<i64>>,
    limit: usize,
    window_nanos: i64,
}

impl SlidingWindowLimiter {
    /// Allow up to `limit` recorded events per rolling `window_nanos`
    pub fn new(limit: usize, window_nanos: i64) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window_nanos,
        }
    }

    /// Check whether a submission at `now` would be within the limit
    pub fn check(&self, user_id: UserId, now: i64) -> bool {
        match self.windows.get_mut(&user_id) {
            Some(mut window) => {
                Self::prune(&mut window, now - self.window_nanos);
                window.len() < self.limit
            }
            None => self.limit > 0,
        }
    }

    /// Record an accepted submission at `now`
    pub fn record(&self, user_id: UserId, now: i64) {
        let mut window = self.windows.entry(user_id).or_default();
        Self::prune(&mut window, now - self.window_nanos);
        window.push_back(now);
    }

    fn prune(window: &mut VecDeque<i64>, cutoff: i64) {
        while window.front().is_some_and(|ts| *ts <= cutoff) {
            window.pop_front();
        }
    }
}
