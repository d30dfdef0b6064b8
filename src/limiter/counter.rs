use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use lru::LruCache;

use super::{Bucket, DEFAULT_MAX_KEYS, Info, bucket_size};

/// Per-key leaky-bucket limiter over calls per [`WINDOW`](super::WINDOW).
///
/// One lock guards the whole map and is held for a single [`Counter::add`],
/// so concurrent calls for the same key cannot lose each other's updates.
/// At most `max_keys` buckets are kept. A new key arriving at a full map
/// first displaces drained buckets; only when none have drained is the least
/// recently admitted key forgotten.
#[derive(Debug)]
pub struct Counter {
    buckets: Mutex<LruCache<String, Bucket>>,
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_MAX_KEYS).unwrap_or(NonZeroUsize::MIN))
    }
}

impl Counter {
    #[must_use]
    pub fn new(max_keys: NonZeroUsize) -> Self {
        Self {
            buckets: Mutex::new(LruCache::new(max_keys)),
        }
    }

    /// Tries to add `amount` tokens to the bucket for `key`.
    ///
    /// A call is admitted when the bucket, drained to `now` and topped up with
    /// `amount`, does not exceed [`bucket_size`]. Admitted calls replace the
    /// stored bucket; rejected calls leave it untouched. A zero
    /// `limit_per_window` means unlimited and is always admitted without
    /// touching state.
    pub fn add(&self, key: &str, limit_per_window: u64, amount: u64, now: DateTime<Utc>) -> Info {
        if limit_per_window == 0 {
            return Info::unlimited(key, now);
        }

        let mut buckets = self.lock();
        let existing = buckets.peek(key).copied().unwrap_or_default();

        let candidate = existing.plus(now, limit_per_window, amount);
        let projected = candidate.display_count(now);
        let size = bucket_size(limit_per_window);

        if projected > size {
            return Info {
                bucket: key.to_string(),
                reset_at: existing.will_reach(signed(size).saturating_sub(signed(amount)), now),
                bucket_size: size,
                remaining: size.saturating_sub(existing.display_count(now)),
                allowed: false,
            };
        }

        if !buckets.contains(key) && buckets.len() == buckets.cap().get() {
            evict_drained(&mut buckets, now);
        }
        buckets.put(key.to_string(), candidate);

        Info {
            bucket: key.to_string(),
            reset_at: candidate.will_reach(signed(size) - 1, now),
            bucket_size: size,
            remaining: size - projected,
            allowed: true,
        }
    }

    /// Forgets every bucket that has fully drained by `now`, returning how
    /// many were removed. A drained bucket behaves exactly like a missing one.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        evict_drained(&mut self.lock(), now)
    }

    /// Stored bucket for `key`, without refreshing its recency.
    #[must_use]
    pub fn bucket(&self, key: &str) -> Option<Bucket> {
        self.lock().peek(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Buckets are plain values, so a panic mid-call cannot leave the map
    // half-updated.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn evict_drained(buckets: &mut LruCache<String, Bucket>, now: DateTime<Utc>) -> usize {
    let drained: Vec<String> = buckets
        .iter()
        .filter(|(_, bucket)| bucket.display_count(now) == 0)
        .map(|(key, _)| key.clone())
        .collect();
    for key in &drained {
        buckets.pop(key);
    }
    drained.len()
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
