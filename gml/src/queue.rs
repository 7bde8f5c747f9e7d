// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Double-buffered single-producer single-consumer queue of encoded calls.
//!
//! Each [`CommandQueue`] has two byte buffers. The producer appends records to
//! the one it holds while the consumer executes the other one. Ownership of a
//! buffer is handed between the two threads with its `state`, so neither side
//! ever touches a buffer the other one is using, and the producer can grow
//! its buffer without any coordination.
//!
//! Published buffers get consecutive generation numbers, and the consumer
//! only executes the buffer whose generation is one past the last executed
//! one. This keeps the calls of one queue in the order they were made, even
//! though the two buffers alternate.

use core::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

pub(crate) use sync_unsafe_cell::SyncUnsafeCell;

use crate::sync::Rendezvous;

/// Drained, and can be acquired by the producer.
const EMPTY: u8 = 0;
/// Owned by the producer.
const WRITING: u8 = 1;
/// Published, waiting for the consumer.
const FILLED: u8 = 2;
/// Owned by the consumer.
const READING: u8 = 3;

struct CommandBuffer {
    state: AtomicU8,
    /// The generation this buffer was published as. Written by the producer
    /// before the buffer is published.
    generation: AtomicU64,
    /// Only accessed by the thread that moved `state` to WRITING or READING.
    bytes: SyncUnsafeCell<Vec<u8>>,
}

/// Proof that the holder owns a buffer for writing. Only created by
/// [`CommandQueue::acquire_write`] and consumed by
/// [`CommandQueue::release_write`].
#[derive(Debug)]
pub struct WriteToken {
    queue: *const CommandQueue,
    index: usize,
}

// Safety: the pointer is only compared against, never dereferenced.
unsafe impl Send for WriteToken {}

/// Proof that the holder owns a published buffer for executing. Only created
/// by [`CommandQueue::acquire_read`] and consumed by
/// [`CommandQueue::release_read`].
#[derive(Debug)]
pub struct ReadToken {
    queue: *const CommandQueue,
    index: usize,
    generation: u64,
}

/// One thread's queue. See the [module documentation](crate::queue).
pub struct CommandQueue {
    buffers: [CachePadded<CommandBuffer>; 2],
    /// The generation of the latest published buffer. Only written by the
    /// producer.
    published: CachePadded<AtomicU64>,
    /// The generation of the latest executed buffer. Only written by the
    /// consumer.
    executed: CachePadded<AtomicU64>,
    /// The value-returning call handshake of this queue.
    pub(crate) sync: Rendezvous,
    /// Set while a producer exists for this queue.
    pub(crate) claimed: AtomicBool,
}

impl CommandQueue {
    /// Creates a queue with both buffers preallocated to `initial_bytes`.
    pub fn new(initial_bytes: usize) -> CommandQueue {
        let buffer = || {
            CachePadded::new(CommandBuffer {
                state: AtomicU8::new(EMPTY),
                generation: AtomicU64::new(0),
                bytes: SyncUnsafeCell::new(Vec::with_capacity(initial_bytes)),
            })
        };
        CommandQueue {
            buffers: [buffer(), buffer()],
            published: CachePadded::new(AtomicU64::new(0)),
            executed: CachePadded::new(AtomicU64::new(0)),
            sync: Rendezvous::new(),
            claimed: AtomicBool::new(false),
        }
    }

    /// Takes ownership of an empty buffer for writing. If `blocking`, waits
    /// until one is available, otherwise tries once. Returns None if no
    /// buffer was available, or if `shutdown` was set while waiting.
    pub fn acquire_write(&self, blocking: bool, shutdown: &AtomicBool) -> Option<WriteToken> {
        let backoff = Backoff::new();
        loop {
            for (index, buffer) in self.buffers.iter().enumerate() {
                // Acquire: the consumer's clearing of the buffer happens
                // before we start writing into it.
                if buffer
                    .state
                    .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    return Some(WriteToken {
                        queue: self,
                        index,
                    });
                }
            }
            if !blocking || shutdown.load(Ordering::Relaxed) {
                return None;
            }
            backoff.snooze();
        }
    }

    /// The buffer owned by `token`.
    pub fn write_bytes<'a>(&'a self, token: &'a mut WriteToken) -> &'a mut Vec<u8> {
        assert!(core::ptr::eq(token.queue, self), "write token of another queue");
        let bytes = self.buffers[token.index].bytes.get();
        // Safety: the buffer's state is WRITING, which only the holder of the
        // token could have set. While the state is WRITING, the consumer
        // doesn't touch the buffer, and the token is not Clone, so there's at
        // most one token for this buffer. The exclusive borrow of the token
        // makes this the only live borrow of the bytes.
        unsafe { &mut *bytes }
    }

    /// Hands the buffer over to the consumer. Returns the generation it was
    /// published as, or None if the buffer was empty and was simply returned
    /// to the pool.
    ///
    /// If `wait_for_earlier`, this waits until every previously published
    /// buffer of this queue has been executed before publishing. This gives
    /// the consumer a single buffer to execute, which the rendezvous relies
    /// on. The wait is cut short if `shutdown` is set.
    pub fn release_write(
        &self,
        token: WriteToken,
        wait_for_earlier: bool,
        shutdown: &AtomicBool,
    ) -> Option<u64> {
        assert!(core::ptr::eq(token.queue, self), "write token of another queue");
        let buffer = &self.buffers[token.index];

        // Safety: see write_bytes, the token is still held here.
        let is_empty = unsafe { (*buffer.bytes.get()).is_empty() };
        if is_empty {
            buffer.state.store(EMPTY, Ordering::Release);
            return None;
        }

        // Relaxed: only this thread writes `published`.
        let generation = self.published.load(Ordering::Relaxed) + 1;
        if wait_for_earlier {
            let backoff = Backoff::new();
            while self.executed.load(Ordering::Acquire) + 1 < generation
                && !shutdown.load(Ordering::Relaxed)
            {
                backoff.snooze();
            }
        }

        // 1. The generation is written before the state, so a consumer that
        //    sees FILLED also sees the right generation.
        buffer.generation.store(generation, Ordering::Relaxed);
        // 2. Release: the record writes happen before the consumer's Acquire
        //    of the state. After this, the bytes belong to the consumer.
        buffer.state.store(FILLED, Ordering::Release);
        // 3. Announce the new generation. The consumer uses this to find out
        //    there's work without scanning the buffers.
        self.published.store(generation, Ordering::Release);
        tracing::trace!("published queue buffer generation {generation}");
        Some(generation)
    }

    /// Returns true if a published buffer is waiting to be executed.
    pub fn has_pending(&self) -> bool {
        self.published.load(Ordering::Acquire) > self.executed.load(Ordering::Relaxed)
    }

    /// Takes ownership of the next published buffer, in generation order.
    /// Must only be called from the consumer thread.
    pub fn acquire_read(&self) -> Option<ReadToken> {
        // Relaxed: only the consumer writes `executed`.
        let executed = self.executed.load(Ordering::Relaxed);
        // Acquire: pairs with the Release in step 3 of release_write, which
        // makes the generation of the buffer visible.
        let published = self.published.load(Ordering::Acquire);
        if published == executed {
            return None;
        }
        let next = executed + 1;
        for (index, buffer) in self.buffers.iter().enumerate() {
            if buffer.generation.load(Ordering::Relaxed) == next
                && buffer
                    .state
                    .compare_exchange(FILLED, READING, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return Some(ReadToken {
                    queue: self,
                    index,
                    generation: next,
                });
            }
        }
        tracing::error!("queue generation {next} was published but no buffer holds it");
        panic!("queue generation {next} was published but no buffer holds it");
    }

    /// The buffer owned by `token`.
    pub fn read_bytes<'a>(&'a self, token: &'a ReadToken) -> &'a [u8] {
        assert!(core::ptr::eq(token.queue, self), "read token of another queue");
        let bytes = self.buffers[token.index].bytes.get();
        // Safety: the buffer's state is READING, set by the consumer when it
        // created the token. The producer doesn't touch buffers that aren't
        // EMPTY or its own WRITING buffer, and there's only one consumer.
        unsafe { &*bytes }
    }

    /// Clears the executed buffer and hands it back to the producer.
    pub fn release_read(&self, token: ReadToken) {
        assert!(core::ptr::eq(token.queue, self), "read token of another queue");
        let buffer = &self.buffers[token.index];
        // Safety: see read_bytes. The token is consumed by this function, so
        // no shared borrows from read_bytes can be alive anymore.
        unsafe { (*buffer.bytes.get()).clear() };
        // Release: pairs with the Acquire in release_write's wait.
        self.executed.store(token.generation, Ordering::Release);
        // Release: pairs with the Acquire in acquire_write, the clear above
        // happens before the producer writes into the buffer again.
        buffer.state.store(EMPTY, Ordering::Release);
    }

    /// The generation of the latest executed buffer.
    pub fn executed_generation(&self) -> u64 {
        self.executed.load(Ordering::Acquire)
    }
}

/// FIXME: Use core::cell::SyncUnsafeCell instead when it's stabilized. Tracked
/// in the rust-lang issue
/// [#95439](https://github.com/rust-lang/rust/issues/95439).
mod sync_unsafe_cell {
    #[repr(transparent)]
    pub struct SyncUnsafeCell<T: ?Sized>(core::cell::UnsafeCell<T>);
    unsafe impl<T: ?Sized + Sync> Sync for SyncUnsafeCell<T> {}
    impl<T> SyncUnsafeCell<T> {
        #[inline]
        pub const fn new(value: T) -> Self {
            SyncUnsafeCell(core::cell::UnsafeCell::new(value))
        }
        #[inline]
        pub const fn get(&self) -> *mut T {
            self.0.get()
        }
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use super::CommandQueue;

    #[test]
    fn executes_in_publication_order() {
        let queue = CommandQueue::new(16);
        let shutdown = AtomicBool::new(false);

        let mut first = queue.acquire_write(false, &shutdown).unwrap();
        queue.write_bytes(&mut first).push(1);
        let mut second = queue.acquire_write(false, &shutdown).unwrap();
        queue.write_bytes(&mut second).push(2);
        assert!(queue.acquire_write(false, &shutdown).is_none());

        // Publication order decides execution order, not acquisition order.
        assert_eq!(Some(1), queue.release_write(second, false, &shutdown));
        let mut third = queue.acquire_write(false, &shutdown);
        assert!(third.is_none());
        assert_eq!(Some(2), queue.release_write(first, false, &shutdown));

        let token = queue.acquire_read().unwrap();
        assert_eq!(&[2], queue.read_bytes(&token));
        queue.release_read(token);
        third = queue.acquire_write(false, &shutdown);
        assert!(third.is_some());
        let token = queue.acquire_read().unwrap();
        assert_eq!(&[1], queue.read_bytes(&token));
        queue.release_read(token);
        assert_eq!(2, queue.executed_generation());
    }

    #[test]
    fn empty_buffers_are_not_published() {
        let queue = CommandQueue::new(16);
        let shutdown = AtomicBool::new(false);
        let token = queue.acquire_write(true, &shutdown).unwrap();
        assert_eq!(None, queue.release_write(token, false, &shutdown));
        assert!(!queue.has_pending());
        assert!(queue.acquire_read().is_none());
    }

    #[test]
    fn draining_twice_is_a_no_op() {
        let queue = CommandQueue::new(16);
        let shutdown = AtomicBool::new(false);
        let mut token = queue.acquire_write(true, &shutdown).unwrap();
        queue.write_bytes(&mut token).extend_from_slice(&[1, 2, 3]);
        queue.release_write(token, false, &shutdown);

        let token = queue.acquire_read().unwrap();
        queue.release_read(token);
        assert!(queue.acquire_read().is_none());
        assert!(!queue.has_pending());
        assert_eq!(1, queue.executed_generation());

        let mut token = queue.acquire_write(false, &shutdown).unwrap();
        assert!(queue.write_bytes(&mut token).is_empty());
    }

    #[test]
    fn blocking_acquire_gives_up_on_shutdown() {
        let queue = CommandQueue::new(16);
        let shutdown = AtomicBool::new(false);
        let mut held = Vec::new();
        for _ in 0..2 {
            let mut token = queue.acquire_write(true, &shutdown).unwrap();
            queue.write_bytes(&mut token).push(0);
            held.push(token);
        }
        thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(std::time::Duration::from_millis(10));
                shutdown.store(true, Ordering::Relaxed);
            });
            assert!(queue.acquire_write(true, &shutdown).is_none());
        });
    }

    #[test]
    fn producer_and_consumer_threads_keep_order() {
        const BUFFERS: u32 = 500;
        let queue = CommandQueue::new(4);
        let shutdown = AtomicBool::new(false);
        let producer_done = AtomicBool::new(false);
        thread::scope(|s| {
            s.spawn(|| {
                for i in 0..BUFFERS {
                    let mut token = queue.acquire_write(true, &shutdown).unwrap();
                    // Grow every buffer a bit, the consumer must not notice.
                    let bytes = queue.write_bytes(&mut token);
                    bytes.extend_from_slice(&i.to_ne_bytes());
                    bytes.extend(core::iter::repeat(0xAB).take(i as usize % 64));
                    queue.release_write(token, false, &shutdown);
                }
                producer_done.store(true, Ordering::Release);
            });

            let mut expected = 0;
            while expected < BUFFERS {
                if let Some(token) = queue.acquire_read() {
                    let bytes = queue.read_bytes(&token);
                    let value = u32::from_ne_bytes(bytes[..4].try_into().unwrap());
                    assert_eq!(expected, value);
                    assert!(bytes[4..].iter().all(|&b| b == 0xAB));
                    queue.release_read(token);
                    expected += 1;
                } else {
                    assert!(!producer_done.load(Ordering::Acquire) || queue.has_pending());
                    thread::yield_now();
                }
            }
        });
    }
}
