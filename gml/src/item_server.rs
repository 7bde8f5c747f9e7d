//! Prefetching of object names.
//!
//! Generating a name (`gen_textures`, `create_program`, ...) returns a value,
//! so deferring it would mean a rendezvous for every new object. Instead the
//! server generates names ahead of time into a ring of slots, and producers
//! take them from the ring without waiting, unless they run faster than the
//! server refills it.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crossbeam_utils::{Backoff, CachePadded};
use gl_backend::{GLsizei, GLuint};

use crate::{config::ItemServerConfig, GmlError};

const FILLED: u64 = 1 << 63;
const SIZE_SHIFT: u32 = 32;
const SIZE_MASK: u64 = (1 << 31) - 1;

/// A generated name and the size of the range it starts, which is 1 for
/// everything but display lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Item {
    #[allow(missing_docs)]
    pub name: GLuint,
    #[allow(missing_docs)]
    pub size: u32,
}

impl Item {
    fn pack(self) -> u64 {
        FILLED | ((u64::from(self.size) & SIZE_MASK) << SIZE_SHIFT) | u64::from(self.name)
    }

    fn unpack(slot: u64) -> Item {
        Item {
            name: slot as u32,
            size: ((slot >> SIZE_SHIFT) & SIZE_MASK) as u32,
        }
    }
}

/// A ring of pre-generated names, handed out in the order they were
/// generated. Any amount of threads can request, one thread generates.
pub struct ItemServer {
    slots: Box<[AtomicU64]>,
    /// Amount of items requested so far.
    requested: CachePadded<AtomicU64>,
    /// Amount of items generated so far. Only written by the generating
    /// thread.
    available: CachePadded<AtomicU64>,
    pregenerate: u64,
}

impl ItemServer {
    pub fn new(config: ItemServerConfig) -> ItemServer {
        ItemServer {
            slots: (0..config.capacity.max(2)).map(|_| AtomicU64::new(0)).collect(),
            requested: CachePadded::new(AtomicU64::new(0)),
            available: CachePadded::new(AtomicU64::new(0)),
            pregenerate: config.pregenerate as u64,
        }
    }

    /// Takes the next item, waiting for the generating thread if it hasn't
    /// been generated yet. A failed generation is handed out as a 0 name.
    pub fn request(&self, shutdown: &AtomicBool) -> Result<Item, GmlError> {
        // The number of this request, counting from 1. Request n takes the
        // nth generated item, which is in slot (n - 1) % len.
        let number = self.requested.fetch_add(1, Ordering::AcqRel) + 1;
        let backoff = Backoff::new();
        // Acquire: pairs with the Release in generate, making the slot write
        // visible.
        while self.available.load(Ordering::Acquire) < number {
            if shutdown.load(Ordering::Relaxed) {
                return Err(GmlError::Aborted);
            }
            backoff.snooze();
        }
        let slot = &self.slots[((number - 1) % self.slots.len() as u64) as usize];
        let value = slot.swap(0, Ordering::AcqRel);
        debug_assert!(value & FILLED != 0, "item slot taken twice");
        Ok(Item::unpack(value))
    }

    /// Fills in `items.len()` names.
    pub fn request_many(&self, items: &mut [GLuint], shutdown: &AtomicBool) -> Result<(), GmlError> {
        for item in items {
            *item = self.request(shutdown)?.name;
        }
        Ok(())
    }

    /// Generates items until `pregenerate` items are waiting beyond the
    /// outstanding requests, or the ring is full. Must only be called from
    /// one thread. Returns the amount of items generated.
    pub fn generate(&self, mut generate: impl FnMut() -> Item) -> usize {
        let requested = self.requested.load(Ordering::Acquire);
        // Relaxed: only this thread writes `available`.
        let mut available = self.available.load(Ordering::Relaxed);
        let mut generated = 0;
        while available < requested + self.pregenerate {
            let slot = &self.slots[(available % self.slots.len() as u64) as usize];
            // Acquire: the requester's swap has to be done before the slot is
            // reused.
            if slot.load(Ordering::Acquire) != 0 {
                break;
            }
            slot.store(generate().pack(), Ordering::Release);
            available += 1;
            generated += 1;
            self.available.store(available, Ordering::Release);
        }
        generated
    }

    /// Amount of generated items nobody has requested yet.
    pub fn stock(&self) -> u64 {
        let available = self.available.load(Ordering::Acquire);
        available.saturating_sub(self.requested.load(Ordering::Acquire))
    }
}

/// Hands out ranges of consecutive names, as `gen_lists` does.
///
/// Single names come from their own pool. Ranges come from a pool of ranges
/// that are at least as long as the longest one requested so far: the excess
/// of a longer range is released, and a range that's too short is released
/// whole before trying again.
pub struct SequenceServer {
    single: ItemServer,
    ranges: ItemServer,
    range_size: CachePadded<AtomicU32>,
}

impl SequenceServer {
    pub fn new(single: ItemServerConfig, ranges: ItemServerConfig) -> SequenceServer {
        SequenceServer {
            single: ItemServer::new(single),
            ranges: ItemServer::new(ranges),
            range_size: CachePadded::new(AtomicU32::new(1)),
        }
    }

    /// Returns the first name of `count` consecutive names, or 0 if they
    /// couldn't be generated. Unused names are passed to `release`.
    pub fn request(
        &self,
        count: GLsizei,
        mut release: impl FnMut(GLuint, GLsizei),
        shutdown: &AtomicBool,
    ) -> Result<GLuint, GmlError> {
        let Ok(count) = u32::try_from(count) else {
            return Ok(0);
        };
        match count {
            0 => return Ok(0),
            1 => return Ok(self.single.request(shutdown)?.name),
            _ => {}
        }
        loop {
            self.range_size.fetch_max(count, Ordering::AcqRel);
            let item = self.ranges.request(shutdown)?;
            if item.name == 0 {
                return Ok(0);
            }
            if item.size >= count {
                if item.size > count {
                    release(item.name + count, (item.size - count) as GLsizei);
                }
                return Ok(item.name);
            }
            tracing::debug!(
                "display list range of {} is too short for {count}, retrying",
                item.size
            );
            release(item.name, item.size as GLsizei);
        }
    }

    /// Refills both pools. `generate` is called with the length of the range
    /// to generate.
    pub fn generate(&self, mut generate: impl FnMut(GLsizei) -> GLuint) -> usize {
        let single = self.single.generate(|| Item {
            name: generate(1),
            size: 1,
        });
        let ranges = self.ranges.generate(|| {
            let size = self.range_size.load(Ordering::Acquire);
            Item {
                name: generate(size as GLsizei),
                size,
            }
        });
        single + ranges
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicBool, Ordering};
    use std::{collections::BTreeSet, sync::Mutex, thread};

    use crate::{config::ItemServerConfig, GmlError};

    use super::{Item, ItemServer, SequenceServer};

    fn counter() -> impl FnMut() -> Item {
        let mut next = 0;
        move || {
            next += 1;
            Item { name: next, size: 1 }
        }
    }

    #[test]
    fn pregenerates_up_to_the_limit() {
        let server = ItemServer::new(ItemServerConfig::new(8, 5));
        let mut generate = counter();
        assert_eq!(5, server.generate(&mut generate));
        assert_eq!(0, server.generate(&mut generate));
        let shutdown = AtomicBool::new(false);
        assert_eq!(1, server.request(&shutdown).unwrap().name);
        assert_eq!(1, server.generate(&mut generate));
        assert_eq!(5, server.stock());
    }

    #[test]
    fn failed_generation_hands_out_zero() {
        let server = ItemServer::new(ItemServerConfig::new(4, 1));
        server.generate(|| Item { name: 0, size: 1 });
        let shutdown = AtomicBool::new(false);
        assert_eq!(0, server.request(&shutdown).unwrap().name);
    }

    #[test]
    fn requests_wait_for_generation_and_abort_on_shutdown() {
        let server = ItemServer::new(ItemServerConfig::new(2, 0));
        let shutdown = AtomicBool::new(false);
        thread::scope(|s| {
            s.spawn(|| shutdown.store(true, Ordering::Relaxed));
            assert_eq!(Err(GmlError::Aborted), server.request(&shutdown));
        });
    }

    #[test]
    fn concurrent_requests_get_unique_names() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 200;
        let server = ItemServer::new(ItemServerConfig::new(4, 2));
        let shutdown = AtomicBool::new(false);
        let names = Mutex::new(Vec::new());
        let finished = AtomicBool::new(false);
        thread::scope(|s| {
            let mut requesters = Vec::new();
            for _ in 0..THREADS {
                requesters.push(s.spawn(|| {
                    let mut mine = [0; PER_THREAD];
                    server.request_many(&mut mine, &shutdown).unwrap();
                    names.lock().unwrap().extend_from_slice(&mine);
                }));
            }
            s.spawn(|| {
                let mut generate = counter();
                while !finished.load(Ordering::Acquire) {
                    server.generate(&mut generate);
                    thread::yield_now();
                }
            });
            for requester in requesters {
                requester.join().unwrap();
            }
            finished.store(true, Ordering::Release);
        });
        let names = names.into_inner().unwrap();
        let unique = names.iter().copied().collect::<BTreeSet<_>>();
        assert_eq!(THREADS * PER_THREAD, unique.len());
        assert!(!unique.contains(&0));
    }

    #[test]
    fn ranges_grow_and_release_their_excess() {
        let server = SequenceServer::new(ItemServerConfig::new(4, 1), ItemServerConfig::new(4, 1));
        let shutdown = AtomicBool::new(false);
        let mut next = 1;
        let mut generate = |size: i32| {
            let first = next;
            next += size as u32;
            first
        };
        server.generate(&mut generate);

        let mut released = Vec::new();
        let single = server.request(1, |_, _| unreachable!(), &shutdown).unwrap();
        assert_ne!(0, single);

        // The pregenerated range only has one name, so it gets thrown away,
        // and the request waits for a range of 3.
        let (server_ref, shutdown_ref) = (&server, &shutdown);
        thread::scope(|s| {
            let waiting = s.spawn(move || {
                let mut released = Vec::new();
                let first = server_ref
                    .request(3, |name, count| released.push((name, count)), shutdown_ref)
                    .unwrap();
                (first, released)
            });
            while !waiting.is_finished() {
                server.generate(&mut generate);
                thread::yield_now();
            }
            let (first, mut from_thread) = waiting.join().unwrap();
            assert_ne!(0, first);
            assert_eq!(1, from_thread.len());
            assert_eq!(1, from_thread[0].1);
            released.append(&mut from_thread);
        });

        // Now ranges are 3 long, a request for 2 releases one name.
        server.generate(&mut generate);
        let first = server
            .request(2, |name, count| released.push((name, count)), &shutdown)
            .unwrap();
        assert_eq!((first + 2, 1), *released.last().unwrap());
    }

    #[test]
    fn invalid_range_sizes_give_zero() {
        let server = SequenceServer::new(ItemServerConfig::new(2, 0), ItemServerConfig::new(2, 0));
        let shutdown = AtomicBool::new(false);
        assert_eq!(Ok(0), server.request(0, |_, _| {}, &shutdown));
        assert_eq!(Ok(0), server.request(-4, |_, _| {}, &shutdown));
    }
}
