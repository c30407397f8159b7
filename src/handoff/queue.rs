use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::semaphore::Semaphore;
use crate::error::{Error, Result};
use crate::graph::PortId;

/// Order in which queued ports are handed to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOrder {
    /// Most recent rejection first
    #[default]
    Lifo,
    /// Arrival order
    Fifo,
}

/// Fixed ring storage. Never grows after construction.
#[derive(Debug)]
struct Slots {
    buf: Box<[PortId]>,
    head: usize,
    len: usize,
}

impl Slots {
    fn push(&mut self, id: PortId) -> bool {
        let cap = self.buf.len();
        if self.len >= cap {
            return false;
        }
        self.buf[(self.head + self.len) % cap] = id;
        self.len += 1;
        true
    }

    fn pop(&mut self, order: QueueOrder) -> Option<PortId> {
        if self.len == 0 {
            return None;
        }
        let cap = self.buf.len();
        let id = match order {
            QueueOrder::Lifo => self.buf[(self.head + self.len - 1) % cap],
            QueueOrder::Fifo => {
                let id = self.buf[self.head];
                self.head = (self.head + 1) % cap;
                id
            }
        };
        self.len -= 1;
        Some(id)
    }
}

/// Bounded single-producer/single-consumer queue of rejected port ids.
///
/// `items` counts ids ready for the consumer, `free` counts empty slots.
/// The producer path takes a short uncontended lock and never allocates.
#[derive(Debug)]
pub struct HandoffQueue {
    slots: Mutex<Slots>,
    items: Semaphore,
    free: Semaphore,
    order: QueueOrder,
    dropped: AtomicU64,
}

impl HandoffQueue {
    pub fn new(capacity: usize, order: QueueOrder) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Mutex::new(Slots {
                buf: vec![0; capacity].into_boxed_slice(),
                head: 0,
                len: 0,
            }),
            items: Semaphore::new(0),
            free: Semaphore::new(capacity),
            order,
            dropped: AtomicU64::new(0),
        }
    }

    /// Block until a slot frees up, then queue `id`.
    pub fn enqueue(&self, id: PortId) -> Result<()> {
        if !self.free.acquire() {
            return Err(Error::QueueClosed);
        }
        self.commit(id)
    }

    /// Queue `id` only if a slot is free right now. A full queue counts the
    /// id as dropped.
    pub fn try_enqueue(&self, id: PortId) -> Result<()> {
        if !self.free.try_acquire() {
            return self.reject(id);
        }
        self.commit(id)
    }

    /// Wait at most `timeout` for a slot. Expiry counts the id as dropped.
    pub fn enqueue_timeout(&self, id: PortId, timeout: Duration) -> Result<()> {
        if !self.free.acquire_timeout(timeout) {
            return self.reject(id);
        }
        self.commit(id)
    }

    /// Take the next id without blocking.
    pub fn try_dequeue(&self) -> Option<PortId> {
        if !self.items.try_acquire() {
            return None;
        }
        let id = self.slots.lock().pop(self.order);
        // An item permit always has a backing slot.
        debug_assert!(id.is_some());
        self.free.release();
        id
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().buf.len()
    }

    pub fn order(&self) -> QueueOrder {
        self.order
    }

    /// Ids rejected because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Release any blocked producer or consumer and refuse further
    /// enqueues. Items already queued can still be drained.
    pub fn close(&self) {
        self.free.close();
        self.items.close();
    }

    pub fn is_closed(&self) -> bool {
        self.free.is_closed()
    }

    fn commit(&self, id: PortId) -> Result<()> {
        if self.free.is_closed() {
            self.free.release();
            return Err(Error::QueueClosed);
        }
        if !self.slots.lock().push(id) {
            // Unreachable while the slot permit pairing holds.
            self.free.release();
            return self.reject(id);
        }
        self.items.release();
        Ok(())
    }

    fn reject(&self, id: PortId) -> Result<()> {
        if self.free.is_closed() {
            return Err(Error::QueueClosed);
        }
        self.dropped.fetch_add(1, Ordering::Relaxed);
        Err(Error::QueueFull(id))
    }
}
