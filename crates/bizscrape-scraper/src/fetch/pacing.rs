//! Per-host request spacing.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Hands out send slots so that two requests to the same host start at
/// least `min_interval` apart. Hosts are independent of each other.
#[derive(Debug)]
pub(crate) struct HostPacer {
    min_interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostPacer {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves the next slot for `host` and sleeps until it opens.
    pub(crate) async fn wait_turn(&self, host: &str) {
        if self.min_interval.is_zero() {
            return;
        }
        let slot = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            // A slot already in the past no longer constrains its host.
            slots.retain(|_, next| *next > now);
            let slot = slots
                .get(host)
                .copied()
                .filter(|next| *next > now)
                .unwrap_or(now);
            slots.insert(host.to_owned(), slot + self.min_interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }

    #[cfg(test)]
    async fn tracked_hosts(&self) -> usize {
        self.next_slot.lock().await.len()
    }
}
