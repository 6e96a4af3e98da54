//! Small time-based read-through cache.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::debug;

/// Single-slot cache with a fixed TTL.
///
/// Advisory only: a miss or stale read causes at most a redundant reload, so
/// no invalidation protocol exists. Time-based expiry suffices.
#[derive(Debug)]
pub struct TimedCache<T> {
    ttl: Duration,
    slot: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone> TimedCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached value if fresh, otherwise load, store and return it.
    pub fn get_or_load<E>(&self, load: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let mut slot = self.slot.lock().unwrap();

        if let Some((cached_at, value)) = slot.as_ref() {
            if cached_at.elapsed() < self.ttl {
                return Ok(value.clone());
            }
            debug!("Cache entry expired after {:?}", self.ttl);
        }

        let value = load()?;
        *slot = Some((Instant::now(), value.clone()));
        Ok(value)
    }
}
