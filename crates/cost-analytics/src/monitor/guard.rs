use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;

/// Per-key cooldown that keeps repeated checks from re-sending the same alert
#[derive(Debug)]
pub struct AlertGuard {
    cooldown: Duration,
    last_fired: DashMap<String, DateTime<Utc>>,
}

impl AlertGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: DashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns `true` and records `now` if `key` has not fired within the cooldown.
    /// The check and the update happen under one entry lock.
    pub fn should_fire(&self, key: &str, now: DateTime<Utc>) -> bool {
        match self.last_fired.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let elapsed = (now - *entry.get()).to_std();
                if elapsed.map_or(false, |elapsed| elapsed >= self.cooldown) {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    pub fn last_fired(&self, key: &str) -> Option<DateTime<Utc>> {
        self.last_fired.get(key).map(|t| *t)
    }

    /// Forgets `key` so that its next alert fires immediately
    pub fn reset(&self, key: &str) {
        self.last_fired.remove(key);
    }

    /// Drops keys whose cooldown has run out and returns how many were removed
    ///
    /// An expired key fires on its next check either way, so forgetting it
    /// changes nothing except the size of the map.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.last_fired.len();
        self.last_fired.retain(|_, fired| {
            (now - *fired)
                .to_std()
                .map_or(true, |elapsed| elapsed < self.cooldown)
        });
        before.saturating_sub(self.last_fired.len())
    }

    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}
