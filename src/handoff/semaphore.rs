use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct State {
    permits: usize,
    closed: bool,
}

/// Counting semaphore.
///
/// Closing wakes every blocked waiter. Permits released before the close can
/// still be taken; once they run out acquisition fails instead of waiting.
#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<State>,
    cond: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(State {
                permits,
                closed: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Block until a permit is available. Returns false once closed and empty.
    pub fn acquire(&self) -> bool {
        let mut state = self.state.lock();
        while state.permits == 0 && !state.closed {
            self.cond.wait(&mut state);
        }
        Self::take(&mut state)
    }

    /// Take a permit if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        Self::take(&mut state)
    }

    /// Block for at most `timeout` waiting for a permit.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.permits == 0 && !state.closed {
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        Self::take(&mut state)
    }

    pub fn release(&self) {
        let mut state = self.state.lock();
        state.permits += 1;
        drop(state);
        self.cond.notify_one();
    }

    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.state.lock().permits
    }

    /// Stop waiting for permits.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.cond.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn take(state: &mut State) -> bool {
        if state.permits == 0 {
            return false;
        }
        state.permits -= 1;
        true
    }
}
