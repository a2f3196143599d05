//! ## parkgate-core::queue
//! **Hand-off buffer between network ingest and the processing pipeline**
//!
//! A FIFO guarded by one mutex and a "not empty" condition. Any number of
//! ingest connections may enqueue concurrently; the pipeline thread blocks
//! in [`ArrivalQueue::dequeue`] until an arrival exists.
//!
//! Unbounded by default. A bounded queue applies its [`OverflowPolicy`]
//! when full.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::vehicle::Arrival;

/// What a bounded queue does with a new arrival when it is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse the new arrival.
    #[default]
    RejectNew,
    /// Evict the head to make room.
    DropOldest,
}

#[derive(Debug)]
struct Inner {
    items: VecDeque<Arrival>,
    closed: bool,
}

#[derive(Debug)]
pub struct ArrivalQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    capacity: Option<usize>,
    policy: OverflowPolicy,
}

impl ArrivalQueue {
    pub fn unbounded() -> Self {
        Self::build(None, OverflowPolicy::default())
    }

    pub fn bounded(capacity: usize, policy: OverflowPolicy) -> Self {
        Self::build(Some(capacity.max(1)), policy)
    }

    fn build(capacity: Option<usize>, policy: OverflowPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            capacity,
            policy,
        }
    }

    /// Appends `arrival` and wakes one consumer.
    ///
    /// Returns the evicted head when a full queue drops its oldest entry.
    pub fn enqueue(&self, arrival: Arrival) -> Result<Option<Arrival>, QueueError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }

        let mut evicted = None;
        if let Some(capacity) = self.capacity {
            if inner.items.len() >= capacity {
                match self.policy {
                    OverflowPolicy::RejectNew => return Err(QueueError::Full(capacity)),
                    OverflowPolicy::DropOldest => evicted = inner.items.pop_front(),
                }
            }
        }

        inner.items.push_back(arrival);
        drop(inner);
        self.not_empty.notify_one();
        Ok(evicted)
    }

    /// Removes the head, blocking while the queue is empty.
    ///
    /// Returns `None` only once the queue is closed and drained.
    pub fn dequeue(&self) -> Option<Arrival> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(arrival) = inner.items.pop_front() {
                return Some(arrival);
            }
            if inner.closed {
                return None;
            }
            self.not_empty.wait(&mut inner);
        }
    }

    pub fn try_dequeue(&self) -> Option<Arrival> {
        self.inner.lock().items.pop_front()
    }

    /// Stops accepting arrivals and wakes every blocked consumer.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.not_empty.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ArrivalQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}
