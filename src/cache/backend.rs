//! Storage backends for cached response envelopes.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use super::key::CacheKey;
use crate::Result;

/// Byte store keyed by request fingerprint. Values are opaque to the backend.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>>;
    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
    /// Live (unexpired) entries.
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
}

struct Slot {
    value: Bytes,
    stored_at: Instant,
    ttl: Duration,
    touched: Instant,
}

impl Slot {
    fn live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Process-local backend bounded by entry count. When full, expired slots go first, then
/// the least recently read or written one.
pub struct MemoryCache {
    slots: RwLock<HashMap<String, Slot>>,
    capacity: usize,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Slot>> {
        self.slots.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Slot>> {
        self.slots.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn make_room(&self, slots: &mut HashMap<String, Slot>, now: Instant) {
        slots.retain(|_, s| s.live(now));
        while slots.len() >= self.capacity {
            let Some(stalest) = slots
                .iter()
                .min_by_key(|(_, s)| s.touched)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            slots.remove(&stalest);
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        let now = Instant::now();
        let mut slots = self.write();
        let hit = match slots.get_mut(key.as_str()) {
            Some(slot) if slot.live(now) => {
                slot.touched = now;
                Some(slot.value.clone())
            }
            Some(_) => None,
            None => return Ok(None),
        };
        if hit.is_none() {
            slots.remove(key.as_str());
        }
        Ok(hit)
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut slots = self.write();
        if !slots.contains_key(key.as_str()) {
            self.make_room(&mut slots, now);
        }
        slots.insert(
            key.as_str().to_string(),
            Slot {
                value,
                stored_at: now,
                ttl,
                touched: now,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.write().remove(key.as_str()).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.write().clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let now = Instant::now();
        Ok(self.read().values().filter(|s| s.live(now)).count())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Backend that never stores anything; every lookup misses.
#[derive(Debug, Default)]
pub struct NullCache;

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<Bytes>> {
        Ok(None)
    }

    async fn set(&self, _: &CacheKey, _: Bytes, _: Duration) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(0)
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
