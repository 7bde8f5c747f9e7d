// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The thread that owns the real backend.
//!
//! The [`Server`] executes the queues of every producer with the backend it
//! was created with. Queues whose producer is waiting for a result are
//! executed first, then every queue in thread number order. The records
//! carry copies of all the client memory they need, so nothing a producer
//! has since changed or freed is read here.

use std::{sync::Arc, thread};

use crossbeam_utils::Backoff;
use gl_backend::GlBackend;

use crate::{
    containers::CircularQueue,
    dispatch::execute_record,
    opcode::Opcode,
    queue::CommandQueue,
    record::RecordReader,
    registry::Gml,
};

/// The amount of executed calls remembered for crash reports.
const RECENT_CALLS: usize = 16;

/// Executes the deferred calls of a [`Gml`] context. Created with
/// [`Gml::server`], and meant to live on the thread that owns `backend`.
///
/// Dropping the server shuts the context down, which makes every producer
/// still waiting on it give up.
pub struct Server<B: GlBackend> {
    gml: Arc<Gml>,
    backend: B,
    iterations: usize,
    recent: CircularQueue<Opcode>,
}

impl<B: GlBackend> Server<B> {
    pub(crate) fn new(gml: Arc<Gml>, backend: B) -> Server<B> {
        Server {
            gml,
            backend,
            iterations: 0,
            recent: CircularQueue::new(RECENT_CALLS),
        }
    }

    /// The real backend, for inspecting it between executions.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, for making calls directly from the server thread. These
    /// are ordered before every call executed by the next
    /// [`Server::execute`].
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The context this server executes.
    pub fn gml(&self) -> &Arc<Gml> {
        &self.gml
    }

    /// Executes every published queue buffer once. Returns the amount of
    /// calls executed.
    pub fn execute(&mut self) -> usize {
        profiling::function_scope!();
        let Server {
            gml,
            backend,
            iterations,
            recent,
        } = self;
        let call_debug = gml.config().call_debug;
        let mut executed = 0;

        for (number, queue) in gml.queues() {
            if queue.sync.take_request() {
                executed += drain(backend, recent, queue, call_debug && gml.is_aux(number));
            }
        }
        for (number, queue) in gml.queues() {
            executed += drain(backend, recent, queue, call_debug && gml.is_aux(number));
        }

        *iterations += 1;
        let interval = gml.config().update_servers_interval;
        let allocator = gml.allocator();
        if *iterations % interval == 0 || allocator.consumed() >= interval {
            allocator.refill(backend);
        }
        executed
    }

    /// Keeps executing until `done` returns true and every queue has been
    /// drained. `done` is checked before each pass, so calls published
    /// before it returned true are always executed.
    pub fn execute_synced(&mut self, mut done: impl FnMut() -> bool) -> usize {
        let backoff = Backoff::new();
        let mut executed = 0;
        loop {
            let finished = done();
            let count = self.execute();
            executed += count;
            if finished && !self.has_pending() {
                break;
            }
            if count == 0 {
                backoff.snooze();
            } else {
                backoff.reset();
            }
        }
        tracing::debug!("executed {executed} calls in {} iterations", self.iterations);
        executed
    }

    /// Returns true if some queue has a published buffer waiting.
    pub fn has_pending(&self) -> bool {
        self.gml.queues().any(|(_, queue)| queue.has_pending())
    }
}

fn drain<B: GlBackend>(
    backend: &mut B,
    recent: &mut CircularQueue<Opcode>,
    queue: &CommandQueue,
    call_debug: bool,
) -> usize {
    profiling::scope!("drain");
    let mut executed = 0;
    while let Some(token) = queue.acquire_read() {
        for record in RecordReader::new(queue.read_bytes(&token)) {
            if call_debug {
                tracing::error!("{} called from the simulation thread", record.opcode.name());
            }
            recent.push_back(record.opcode);
            execute_record(backend, record, &queue.sync);
            executed += 1;
        }
        queue.release_read(token);
    }
    if executed > 0 {
        tracing::trace!(
            "executed {executed} calls, up to generation {}",
            queue.executed_generation()
        );
    }
    executed
}

impl<B: GlBackend> Drop for Server<B> {
    fn drop(&mut self) {
        if thread::panicking() {
            let recent = self
                .recent
                .iter()
                .map(|opcode| opcode.name())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::error!("the server panicked, latest calls: {recent}");
        }
        self.gml.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, sync::Arc, thread};

    use bytemuck::cast_slice;
    use gl_backend::{
        enums::*,
        recording::{Arg, CapturedArray},
        ClientArray, GlBackend, RecordingBackend,
    };

    use crate::{config::GmlConfig, registry::Gml};

    fn context(config: GmlConfig) -> Arc<Gml> {
        Gml::new(config).unwrap()
    }

    fn small_context() -> Arc<Gml> {
        context(GmlConfig {
            max_workers: 2,
            ..Default::default()
        })
    }

    #[test]
    fn calls_run_in_the_order_they_were_made() {
        let gml = small_context();
        let mut server = gml.server(RecordingBackend::new()).unwrap();
        server.backend_mut().calls.clear();
        let mut gl = gml.producer(1).unwrap();
        gl.enable(BLEND);
        gl.blend_func(SRC_ALPHA, ONE_MINUS_SRC_ALPHA);
        gl.line_width(2.0);
        gl.disable(BLEND);
        assert!(server.backend().calls.is_empty());

        gl.submit();
        assert_eq!(4, server.execute());
        let backend = server.backend();
        assert_eq!(vec!["enable", "blend_func", "line_width", "disable"], backend.call_names());
        assert_eq!(vec![Arg::Float(2.0)], backend.calls[2].args);
    }

    #[test]
    fn queries_see_the_calls_made_before_them() {
        let gml = small_context();
        let mut server = gml.server(RecordingBackend::new()).unwrap();
        let gml = &gml;
        thread::scope(|s| {
            let worker = s.spawn(move || {
                let mut gl = gml.producer(1).unwrap();
                gl.enable(DEPTH_TEST);
                let enabled = gl.is_enabled(DEPTH_TEST);
                gl.line_width(3.0);
                let mut width = [0.0];
                gl.get_float_v(LINE_WIDTH, &mut width);
                gl.disable(DEPTH_TEST);
                (enabled, width[0], gl.is_enabled(DEPTH_TEST))
            });
            server.execute_synced(|| worker.is_finished());
            assert_eq!((TRUE, 3.0, FALSE), worker.join().unwrap());
        });
    }

    #[test]
    fn draws_see_memory_as_it_was_when_they_were_made() {
        let gml = small_context();
        let mut server = gml.server(RecordingBackend::new()).unwrap();
        let mut gl = gml.producer(1).unwrap();
        let mut positions = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        gl.enable_client_state(VERTEX_ARRAY);
        gl.vertex_pointer(2, FLOAT, 0, positions.as_ptr().cast());
        // Safety: positions holds the three vertices drawn.
        unsafe { gl.draw_arrays(TRIANGLES, 0, 3) };
        positions.fill(0.0);
        drop(positions);
        gl.submit();
        server.execute();

        let draw = &server.backend().draws[0];
        let expected = cast_slice::<f32, u8>(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(
            Some(&CapturedArray::Client(expected.to_vec())),
            draw.array(ClientArray::Vertex)
        );
    }

    #[test]
    fn full_queues_wait_for_the_server() {
        const CALLS: u32 = 2000;
        let gml = context(GmlConfig {
            max_workers: 1,
            initial_queue_bytes: 64,
            aux_queue_bytes: 64,
            max_queue_bytes: 256,
            ..Default::default()
        });
        let mut server = gml.server(RecordingBackend::new()).unwrap();
        server.backend_mut().calls.clear();
        let gml = &gml;
        thread::scope(|s| {
            let worker = s.spawn(move || {
                let mut gl = gml.producer(1).unwrap();
                for i in 0..CALLS {
                    gl.call_list(i);
                }
            });
            server.execute_synced(|| worker.is_finished());
        });
        let lists = server
            .backend()
            .calls_named("call_list")
            .map(|call| call.args.clone())
            .collect::<Vec<_>>();
        let expected = (0..CALLS).map(|i| vec![Arg::from(i)]).collect::<Vec<_>>();
        assert_eq!(expected, lists);
    }

    #[test]
    fn sync_returns_after_earlier_calls_ran() {
        let gml = small_context();
        let mut server = gml.server(RecordingBackend::new()).unwrap();
        server.backend_mut().calls.clear();
        let gml = &gml;
        thread::scope(|s| {
            let worker = s.spawn(move || {
                let mut gl = gml.producer(1).unwrap();
                gl.clear(COLOR_BUFFER_BIT);
                gl.sync()
            });
            server.execute_synced(|| worker.is_finished());
            assert!(worker.join().unwrap().is_ok());
        });
        assert_eq!(vec!["clear"], server.backend().call_names());
    }

    #[test]
    fn names_are_refilled_on_interval_or_demand() {
        let gml = small_context();
        let interval = gml.config().update_servers_interval;
        let mut server = gml.server(RecordingBackend::new()).unwrap();
        let textures = |server: &super::Server<RecordingBackend>| {
            server.backend().calls_named("gen_textures").count()
        };
        let before = textures(&server);
        let mut gl = gml.producer(1).unwrap();

        gl.gen_textures(&mut [0; 5]);
        for _ in 1..interval {
            server.execute();
        }
        assert_eq!(before, textures(&server));
        server.execute();
        assert_eq!(before + 5, textures(&server));

        gl.gen_textures(&mut vec![0; interval]);
        server.execute();
        assert_eq!(before + 5 + interval, textures(&server));
    }

    #[test]
    fn every_thread_gets_its_own_names() {
        let gml = small_context();
        let mut server = gml.server(RecordingBackend::new()).unwrap();
        let gml = &gml;
        thread::scope(|s| {
            let workers = (1..=2)
                .map(|number| {
                    s.spawn(move || {
                        let mut gl = gml.producer(number).unwrap();
                        let mut names = vec![0; 40];
                        for name in &mut names {
                            gl.gen_textures(core::slice::from_mut(name));
                        }
                        names
                    })
                })
                .collect::<Vec<_>>();
            server.execute_synced(|| workers.iter().all(|worker| worker.is_finished()));
            let names = workers
                .into_iter()
                .flat_map(|worker| worker.join().unwrap())
                .collect::<Vec<_>>();
            assert!(names.iter().all(|&name| name != 0));
            assert_eq!(80, names.iter().collect::<BTreeSet<_>>().len());
        });
        let generated = &server.backend().generated;
        assert!(generated.len() >= 80);
    }

    #[test]
    fn display_lists_too_short_for_a_range_are_deleted() {
        let gml = small_context();
        let pregenerated = gml.config().display_lists_large.pregenerate;
        let mut server = gml.server(RecordingBackend::new()).unwrap();
        server.backend_mut().calls.clear();
        let gml = &gml;
        let first = thread::scope(|s| {
            let worker = s.spawn(move || gml.producer(1).unwrap().gen_lists(3));
            server.execute_synced(|| worker.is_finished());
            worker.join().unwrap()
        });
        let backend = server.backend();
        assert_ne!(0, first);
        assert!((first..first + 3).all(|name| backend.generated.contains(&name)));
        // The ranges generated before the request were one list long.
        let deleted = backend.calls_named("delete_lists").collect::<Vec<_>>();
        assert_eq!(pregenerated, deleted.len());
        assert!(deleted.iter().all(|call| call.args[1] == Arg::from(1i32)));
    }

    #[test]
    fn simulation_thread_calls_still_run() {
        let gml = context(GmlConfig {
            max_workers: 1,
            call_debug: true,
            ..Default::default()
        });
        let mut server = gml.server(RecordingBackend::new()).unwrap();
        server.backend_mut().calls.clear();
        let mut worker = gml.producer(1).unwrap();
        let mut aux = gml.aux_producer().unwrap();
        aux.clear(COLOR_BUFFER_BIT);
        worker.flush();
        aux.submit();
        worker.submit();
        assert_eq!(2, server.execute());
        assert_eq!(vec!["flush", "clear"], server.backend().call_names());
    }

    #[test]
    fn dropping_the_server_aborts_waiting_producers() {
        let gml = small_context();
        let server = gml.server(RecordingBackend::new()).unwrap();
        let gml = &gml;
        thread::scope(|s| {
            let worker = s.spawn(move || {
                let mut gl = gml.producer(1).unwrap();
                let status = gl.get_shader_iv(1, INFO_LOG_LENGTH);
                (status, gl.sync())
            });
            // Wait for the producer to publish its query.
            while !gml.queue(1).has_pending() {
                thread::yield_now();
            }
            drop(server);
            let (status, sync) = worker.join().unwrap();
            assert_eq!(0, status);
            assert!(sync.is_err());
        });
    }
}
