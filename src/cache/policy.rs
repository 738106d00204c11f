//! Keyed memo table with optional size and idle-time bounds.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Bounds for a memo table. The default keeps everything forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Keep at most this many entries, dropping the least recently used.
    pub max_entries: Option<usize>,
    /// Drop entries not accessed for this long.
    pub idle_ttl: Option<Duration>,
}

impl EvictionPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_entries.is_none() && self.idle_ttl.is_none()
    }
}

struct Slot<V> {
    value: V,
    last_access: Instant,
}

/// String-keyed table of shared values with LRU / idle eviction.
///
/// Entries for which the pin predicate holds are never evicted.
pub struct MemoTable<V> {
    policy: EvictionPolicy,
    pinned: fn(&V) -> bool,
    entries: HashMap<String, Slot<V>>,
}

impl<V: Clone> MemoTable<V> {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            pinned: |_| false,
            entries: HashMap::new(),
        }
    }

    /// Protect entries matching `pinned` from eviction.
    pub fn with_pin(mut self, pinned: fn(&V) -> bool) -> Self {
        self.pinned = pinned;
        self
    }

    /// Return the value for `key`, inserting `create()` if absent.
    pub fn get_or_insert_with(&mut self, key: &str, create: impl FnOnce() -> V) -> V {
        let now = Instant::now();
        self.evict_expired(now, Some(key));

        let value = match self.entries.get_mut(key) {
            Some(slot) => {
                slot.last_access = now;
                slot.value.clone()
            }
            None => {
                let value = create();
                self.entries.insert(
                    key.to_string(),
                    Slot {
                        value: value.clone(),
                        last_access: now,
                    },
                );
                value
            }
        };

        self.evict_over_capacity(key);
        value
    }

    /// Value for `key` without refreshing its access time.
    pub fn peek(&self, key: &str) -> Option<&V> {
        let slot = self.entries.get(key)?;
        if self.is_expired(slot, Instant::now()) {
            return None;
        }
        Some(&slot.value)
    }

    /// Remove `key` if `predicate` holds for its value.
    pub fn remove_if(&mut self, key: &str, predicate: impl FnOnce(&V) -> bool) -> bool {
        match self.entries.get(key) {
            Some(slot) if predicate(&slot.value) => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, slot: &Slot<V>, now: Instant) -> bool {
        match self.policy.idle_ttl {
            Some(ttl) => now.duration_since(slot.last_access) > ttl && !(self.pinned)(&slot.value),
            None => false,
        }
    }

    fn evict_expired(&mut self, now: Instant, keep: Option<&str>) {
        let Some(ttl) = self.policy.idle_ttl else {
            return;
        };
        let pinned = self.pinned;
        self.entries.retain(|key, slot| {
            Some(key.as_str()) == keep || pinned(&slot.value) || now.duration_since(slot.last_access) <= ttl
        });
    }

    fn evict_over_capacity(&mut self, keep: &str) {
        let Some(max) = self.policy.max_entries else {
            return;
        };

        while self.entries.len() > max {
            let victim = self
                .entries
                .iter()
                .filter(|(key, slot)| key.as_str() != keep && !(self.pinned)(&slot.value))
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(key, _)| key.clone());

            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}
