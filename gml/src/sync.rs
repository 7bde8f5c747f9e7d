//! The handshake that lets a producer wait for the result of a call.
//!
//! The producer appends a value-returning record, publishes its buffer, and
//! calls [`Rendezvous::request`] followed by [`Rendezvous::wait`]. The server
//! notices the request in [`Rendezvous::take_request`], executes the queue
//! right away, and the value-returning record ends up in
//! [`Rendezvous::post`], which wakes the producer.
//!
//! The server may also run into the record during a normal pass before it
//! sees the request. Then the result is posted before the request is made,
//! and the producer's request sees RESULT_READY and goes straight to reading
//! the result.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

use crate::{queue::SyncUnsafeCell, GmlError};

/// No call is waiting for a result.
const RUN: u8 = 0;
/// The producer is waiting, and wants the server to execute its queue.
const SYNC_REQUESTED: u8 = 1;
/// The result is in the mailbox.
const RESULT_READY: u8 = 2;

pub(crate) struct Rendezvous {
    state: CachePadded<AtomicU8>,
    /// Written by the server before RESULT_READY is stored, read by the
    /// producer after it's loaded.
    mailbox: SyncUnsafeCell<Vec<u8>>,
}

impl Rendezvous {
    pub fn new() -> Rendezvous {
        Rendezvous {
            state: CachePadded::new(AtomicU8::new(RUN)),
            mailbox: SyncUnsafeCell::new(Vec::new()),
        }
    }

    /// Asks the server to execute this queue now. Producer side, after the
    /// value-returning record has been published.
    pub fn request(&self) {
        // A failure means the result is already there.
        let _ = self.state.compare_exchange(
            RUN,
            SYNC_REQUESTED,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
    }

    /// Waits for the server to post the result, and returns it. Producer
    /// side. Returns [`GmlError::Aborted`] if `shutdown` is set first.
    pub fn wait(&self, shutdown: &AtomicBool) -> Result<Vec<u8>, GmlError> {
        let backoff = Backoff::new();
        loop {
            if shutdown.load(Ordering::Acquire) {
                return Err(GmlError::Aborted);
            }
            // Acquire: pairs with the Release in `post`.
            if self.state.load(Ordering::Acquire) == RESULT_READY {
                // Safety: the server wrote the mailbox before storing
                // RESULT_READY, and won't write it again until this producer
                // publishes another value-returning record, which can only
                // happen after this function returns.
                let result = unsafe { core::mem::take(&mut *self.mailbox.get()) };
                self.state.store(RUN, Ordering::Release);
                return Ok(result);
            }
            backoff.snooze();
        }
    }

    /// Returns true if the producer is waiting for the server to execute its
    /// queue, and acknowledges the request. Server side.
    pub fn take_request(&self) -> bool {
        self.state
            .compare_exchange(SYNC_REQUESTED, RUN, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Hands the result of a value-returning record to the waiting producer.
    /// Server side.
    pub fn post(&self, result: &[u8]) {
        // Safety: the producer only reads the mailbox after seeing
        // RESULT_READY, which is stored below, and it has at most one
        // value-returning call in flight, whose result this is.
        let mailbox = unsafe { &mut *self.mailbox.get() };
        mailbox.clear();
        mailbox.extend_from_slice(result);
        self.state.store(RESULT_READY, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use crate::GmlError;

    use super::Rendezvous;

    #[test]
    fn result_posted_before_the_request_is_kept() {
        let sync = Rendezvous::new();
        let shutdown = AtomicBool::new(false);
        sync.post(&[7, 0, 0, 0]);
        sync.request();
        assert!(!sync.take_request());
        assert_eq!(Ok(vec![7, 0, 0, 0]), sync.wait(&shutdown));
    }

    #[test]
    fn request_is_acknowledged_once() {
        let sync = Rendezvous::new();
        sync.request();
        assert!(sync.take_request());
        assert!(!sync.take_request());
    }

    #[test]
    fn waiting_is_aborted_by_shutdown() {
        let sync = Rendezvous::new();
        let shutdown = AtomicBool::new(false);
        thread::scope(|s| {
            s.spawn(|| shutdown.store(true, Ordering::Release));
            sync.request();
            assert_eq!(Err(GmlError::Aborted), sync.wait(&shutdown));
        });
    }

    #[test]
    fn results_reach_the_right_caller() {
        let sync = Rendezvous::new();
        let shutdown = AtomicBool::new(false);
        let done = AtomicBool::new(false);
        thread::scope(|s| {
            s.spawn(|| {
                let mut next = 0u32;
                while !done.load(Ordering::Acquire) {
                    if sync.take_request() {
                        sync.post(&next.to_ne_bytes());
                        next += 1;
                    }
                    thread::yield_now();
                }
            });
            for i in 0..100u32 {
                sync.request();
                let result = sync.wait(&shutdown).unwrap();
                assert_eq!(i.to_ne_bytes().to_vec(), result);
            }
            done.store(true, Ordering::Release);
        });
    }
}
