// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use gl_backend::GlBackend;

use crate::{
    allocator::GraphicsObjectAllocator, cache::StateCache, config::GmlConfig,
    queue::CommandQueue, GmlError, Producer, Server,
};

/// The part a thread plays in a [`Gml`] context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Owns the real backend and executes everyone's calls. Thread number 0.
    Server,
    /// A rendering worker, with thread numbers from 1 to
    /// [`GmlConfig::max_workers`].
    Worker(usize),
    /// The simulation thread, numbered right after the last worker. It
    /// shouldn't make graphics calls at all, see [`GmlConfig::call_debug`].
    Aux,
}

impl Role {
    /// The index of this role's queue, as used in logs.
    pub fn thread_number(self, max_workers: usize) -> usize {
        match self {
            Role::Server => 0,
            Role::Worker(number) => number,
            Role::Aux => max_workers + 1,
        }
    }
}

/// The shared state of one deferring context: a queue per producer thread,
/// the object name pools, and the shutdown flag every waiting loop checks.
///
/// Producers and the server each hold an [`Arc`] of this.
pub struct Gml {
    config: GmlConfig,
    /// The queues of thread numbers 1 through `max_workers + 1`, the last one
    /// being the auxiliary queue.
    queues: Box<[CommandQueue]>,
    allocator: GraphicsObjectAllocator,
    cache: OnceLock<StateCache>,
    server_claimed: AtomicBool,
    shutdown: AtomicBool,
}

impl Gml {
    /// Validates `config` and allocates the queues.
    pub fn new(config: GmlConfig) -> Result<Arc<Gml>, GmlError> {
        config.validate()?;
        let queues = (1..=config.max_workers + 1)
            .map(|number| {
                if number > config.max_workers {
                    CommandQueue::new(config.aux_queue_bytes)
                } else {
                    CommandQueue::new(config.initial_queue_bytes)
                }
            })
            .collect();
        Ok(Arc::new(Gml {
            allocator: GraphicsObjectAllocator::new(&config),
            config,
            queues,
            cache: OnceLock::new(),
            server_claimed: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        }))
    }

    /// The validated configuration the context was created with.
    pub fn config(&self) -> &GmlConfig {
        &self.config
    }

    /// Claims the queue of worker `number`, which must be between 1 and
    /// `max_workers`. The slot is free again once the producer is dropped.
    pub fn producer(self: &Arc<Self>, number: usize) -> Result<Producer, GmlError> {
        if number == 0 || number > self.config.max_workers {
            return Err(GmlError::SlotOutOfRange {
                number,
                max_workers: self.config.max_workers,
            });
        }
        self.claim(Role::Worker(number))
    }

    /// Claims the auxiliary queue, meant for the simulation thread.
    pub fn aux_producer(self: &Arc<Self>) -> Result<Producer, GmlError> {
        self.claim(Role::Aux)
    }

    fn claim(self: &Arc<Self>, role: Role) -> Result<Producer, GmlError> {
        let thread_number = role.thread_number(self.config.max_workers);
        if self.queue(thread_number).claimed.swap(true, Ordering::AcqRel) {
            return Err(GmlError::SlotTaken(thread_number));
        }
        tracing::debug!("claimed queue {thread_number} for {role:?}");
        Ok(Producer::new(Arc::clone(self), role, thread_number))
    }

    /// Creates the one server of this context. The state cache is filled and
    /// the name pools are stocked with `backend` before this returns.
    pub fn server<B: GlBackend>(self: &Arc<Self>, mut backend: B) -> Result<Server<B>, GmlError> {
        if self.server_claimed.swap(true, Ordering::AcqRel) {
            return Err(GmlError::ServerSlot);
        }
        let _ = self.cache.set(StateCache::fill(&mut backend, &self.config));
        self.allocator.refill(&mut backend);
        tracing::debug!("created the server for {} worker queues", self.config.max_workers);
        Ok(Server::new(Arc::clone(self), backend))
    }

    /// Makes every waiting producer give up. Calls made after this are
    /// dropped.
    pub fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            tracing::debug!("shutting down");
        }
    }

    /// Returns true once the server has been dropped or
    /// [`Gml::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// The object name pools shared by every producer.
    pub fn allocator(&self) -> &GraphicsObjectAllocator {
        &self.allocator
    }

    pub(crate) fn shutdown_flag(&self) -> &AtomicBool {
        &self.shutdown
    }

    /// The cached parameters, once the server has been created.
    pub(crate) fn cache(&self) -> Option<&StateCache> {
        self.cache.get()
    }

    /// The queue of the given thread number, 1 through `max_workers + 1`.
    pub(crate) fn queue(&self, thread_number: usize) -> &CommandQueue {
        &self.queues[thread_number - 1]
    }

    /// All queues with their thread numbers, workers first.
    pub(crate) fn queues(&self) -> impl Iterator<Item = (usize, &CommandQueue)> {
        self.queues.iter().enumerate().map(|(i, queue)| (i + 1, queue))
    }

    pub(crate) fn is_aux(&self, thread_number: usize) -> bool {
        thread_number == self.config.max_workers + 1
    }
}

#[cfg(test)]
mod tests {
    use gl_backend::RecordingBackend;

    use crate::{config::GmlConfig, GmlError};

    use super::{Gml, Role};

    fn context(max_workers: usize) -> std::sync::Arc<Gml> {
        Gml::new(GmlConfig {
            max_workers,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn worker_slots_are_claimed_once() {
        let gml = context(2);
        let first = gml.producer(1).unwrap();
        assert_eq!(Role::Worker(1), first.role());
        assert!(matches!(gml.producer(1), Err(GmlError::SlotTaken(1))));
        drop(first);
        assert!(gml.producer(1).is_ok());
    }

    #[test]
    fn slots_outside_the_workers_are_rejected() {
        let gml = context(2);
        assert!(matches!(
            gml.producer(0),
            Err(GmlError::SlotOutOfRange { number: 0, max_workers: 2 })
        ));
        assert!(matches!(gml.producer(3), Err(GmlError::SlotOutOfRange { .. })));
    }

    #[test]
    fn aux_queue_follows_the_workers() {
        let gml = context(4);
        let aux = gml.aux_producer().unwrap();
        assert_eq!(Role::Aux, aux.role());
        assert_eq!(5, aux.thread_number());
        assert!(matches!(gml.aux_producer(), Err(GmlError::SlotTaken(5))));
    }

    #[test]
    fn there_is_one_server() {
        let gml = context(1);
        let server = gml.server(RecordingBackend::new()).unwrap();
        assert!(matches!(
            gml.server(RecordingBackend::new()),
            Err(GmlError::ServerSlot)
        ));
        assert!(gml.cache().is_some());
        drop(server);
        assert!(gml.is_shut_down());
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let result = Gml::new(GmlConfig {
            max_workers: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(GmlError::Config(_))));
    }
}
