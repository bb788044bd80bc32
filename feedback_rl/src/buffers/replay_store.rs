//! Experience replay with replicated insertion.
//!
//! `push(transition, count)` stores the same transition `count` times, so a
//! step with strong feedback is sampled proportionally more often. Copies
//! share one allocation through `Arc`.
//!
//! ```text
//! push(t, 3):   [.. a b c t t t]      uniform sampling over every slot
//! full:         oldest slot overwritten first
//! ```
//!
//! Owned and mutated by the training loop only; there are no locks.

use std::sync::Arc;

use crate::core::transition::Transition;

/// Ring buffer storage, oldest-first eviction.
struct RingStorage<T> {
    data: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> RingStorage<T> {
    fn new(capacity: usize) -> Self {
        Self {
            data: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
        }
    }

    fn push(&mut self, item: T) {
        let capacity = self.data.len();
        let idx = (self.head + self.len) % capacity;
        self.data[idx] = Some(item);
        if self.len < capacity {
            self.len += 1;
        } else {
            self.head = (self.head + 1) % capacity;
        }
    }

    /// Item at logical position `idx` (0 = oldest).
    fn get(&self, idx: usize) -> Option<&T> {
        if idx >= self.len {
            return None;
        }
        self.data[(self.head + idx) % self.data.len()].as_ref()
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Replay buffer configuration.
#[derive(Debug, Clone)]
pub struct ReplayStoreConfig {
    /// Maximum number of stored entries (copies count individually).
    pub capacity: usize,
    /// Seed for the sampling RNG; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for ReplayStoreConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            seed: None,
        }
    }
}

impl ReplayStoreConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Capacity-bounded replay store with replicated pushes.
pub struct ReplayStore {
    storage: RingStorage<Arc<Transition>>,
    rng: fastrand::Rng,
    /// Distinct transitions pushed
    pushes: usize,
    /// Entries written including copies
    inserted: usize,
}

impl ReplayStore {
    /// Create a store. A capacity of 0 is treated as 1.
    pub fn new(config: ReplayStoreConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            storage: RingStorage::new(config.capacity.max(1)),
            rng,
            pushes: 0,
            inserted: 0,
        }
    }

    /// Insert `transition` exactly `count` times. A count of 0 is stored once.
    ///
    /// Returns the number of copies written.
    pub fn push(&mut self, transition: Transition, count: usize) -> usize {
        let copies = count.max(1);
        let shared = Arc::new(transition);
        for _ in 0..copies {
            self.storage.push(Arc::clone(&shared));
        }
        self.pushes += 1;
        self.inserted += copies;
        copies
    }

    /// Sample `n` entries uniformly with replacement.
    ///
    /// Returns `None` when the store is empty or `n` is 0.
    pub fn sample(&mut self, n: usize) -> Option<Vec<Arc<Transition>>> {
        let len = self.storage.len();
        if len == 0 || n == 0 {
            return None;
        }
        let batch: Vec<Arc<Transition>> = (0..n)
            .filter_map(|_| {
                let idx = self.rng.usize(0..len);
                self.storage.get(idx).cloned()
            })
            .collect();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }

    /// Whether at least `batch_size` entries are stored.
    pub fn can_sample(&self, batch_size: usize) -> bool {
        batch_size > 0 && self.storage.len() >= batch_size
    }

    /// Stored entries, copies included.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.storage.data.len()
    }

    /// Distinct transitions pushed since creation.
    pub fn pushes(&self) -> usize {
        self.pushes
    }

    /// Entries written since creation, copies included.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Transition>> + '_ {
        (0..self.storage.len()).filter_map(move |i| self.storage.get(i))
    }
}
