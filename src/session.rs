//! Short-lived key-value store for front ends that hand out short ids instead of full URLs
//! (e.g. callback payloads with a size limit) and for prompts awaiting a reply.
//!
//! Entries expire a fixed time after insertion. Expired entries are invisible to `get` and
//! are dropped by `purge_expired`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Lifetime of a stored novel URL.
pub const URL_TTL: Duration = Duration::from_secs(60 * 60);
/// Lifetime of a pending "how many chapters?" prompt.
pub const PENDING_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
struct Entry<V> {
    inserted: Instant,
    value: V,
}

/// Expiring map from session ids to values.
#[derive(Debug)]
pub struct SessionStore<V> {
    ttl: Duration,
    next_id: u64,
    entries: HashMap<String, Entry<V>>,
}

impl<V> SessionStore<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 0,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `value` under a fresh id (`s_1`, `s_2`, ...) and return the id.
    pub fn insert(&mut self, value: V) -> String {
        self.insert_at(value, Instant::now())
    }

    /// Store `value` under a caller-chosen key, replacing any previous value.
    pub fn insert_with_key(&mut self, key: impl Into<String>, value: V) {
        self.insert_with_key_at(key, value, Instant::now());
    }

    /// The live value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.get_at(key, Instant::now())
    }

    /// Take the value out. An expired entry is dropped and yields None.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.remove_at(key, Instant::now())
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_live(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted) < self.ttl
    }

    pub(crate) fn insert_at(&mut self, value: V, now: Instant) -> String {
        self.next_id += 1;
        let id = format!("s_{}", self.next_id);
        self.insert_with_key_at(id.clone(), value, now);
        id
    }

    pub(crate) fn insert_with_key_at(&mut self, key: impl Into<String>, value: V, now: Instant) {
        self.entries.insert(
            key.into(),
            Entry {
                inserted: now,
                value,
            },
        );
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|e| self.is_live(e, now))
            .map(|e| &e.value)
    }

    pub(crate) fn remove_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.is_live(&entry, now).then_some(entry.value)
    }

    pub(crate) fn purge_expired_at(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.inserted) < ttl);
        let purged = before - self.entries.len();
        if purged > 0 {
            tracing::debug!(purged, remaining = self.entries.len(), "expired sessions purged");
        }
        purged
    }
}
