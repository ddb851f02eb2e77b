//! Fair admission control between the producer and the worker pool.
//!
//! [`FairSemaphore`] is a counting semaphore that grants permits strictly in
//! the order they were requested (ticket order), so under sustained
//! backpressure an earlier line is never overtaken by a later one.
//!
//! [`AdmissionPermit`] is an owned guard: it travels with a job into the pool
//! and returns its unit when dropped, on every exit path of the job.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct State {
    permits: usize,
    /// Ticket handed to the next caller of `acquire`.
    next_ticket: u64,
    /// Ticket allowed to take the next free permit.
    now_serving: u64,
}

/// A FIFO-fair counting semaphore.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use factpipe_lib::admission::FairSemaphore;
///
/// let slots = Arc::new(FairSemaphore::new(1));
/// let permit = slots.acquire_owned();
/// assert_eq!(slots.available_permits(), 0);
/// assert!(slots.try_acquire_owned().is_none());
/// drop(permit);
/// assert_eq!(slots.available_permits(), 1);
/// ```
#[derive(Debug)]
pub struct FairSemaphore {
    state: Mutex<State>,
    released: Condvar,
}

impl FairSemaphore {
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(State { permits, next_ticket: 0, now_serving: 0 }),
            released: Condvar::new(),
        }
    }

    /// Blocks until a permit is available and every earlier caller has been
    /// served, then returns a guard that releases the permit on drop.
    #[must_use]
    pub fn acquire_owned(self: &Arc<Self>) -> AdmissionPermit {
        let mut state = self.state.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        while state.now_serving != ticket || state.permits == 0 {
            self.released.wait(&mut state);
        }
        state.permits -= 1;
        state.now_serving += 1;
        drop(state);
        // The next ticket holder may be able to proceed too.
        self.released.notify_all();
        AdmissionPermit { semaphore: Arc::clone(self) }
    }

    /// Takes a permit without blocking. Fails when no permit is free or when
    /// other callers are already queued.
    #[must_use]
    pub fn try_acquire_owned(self: &Arc<Self>) -> Option<AdmissionPermit> {
        let mut state = self.state.lock();
        if state.permits == 0 || state.now_serving != state.next_ticket {
            return None;
        }
        state.permits -= 1;
        state.next_ticket += 1;
        state.now_serving += 1;
        Some(AdmissionPermit { semaphore: Arc::clone(self) })
    }

    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.state.lock().permits
    }

    fn release(&self) {
        self.state.lock().permits += 1;
        self.released.notify_all();
    }
}

/// One unit of admission. Released back to its semaphore when dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    semaphore: Arc<FairSemaphore>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
