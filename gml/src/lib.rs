// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Deferred graphics calls for multithreaded rendering.
//!
//! A graphics context can only be used from one thread. This crate lets other
//! threads use it anyway: each of them gets a [`Producer`], which implements
//! [`GlBackend`](gl_backend::GlBackend) by writing every call into a queue of
//! its own. The thread that owns the context runs the [`Server`], which
//! executes the queues with the real backend.
//!
//! ```ignore
//! let gml = Gml::new(GmlConfig::default())?;
//! let mut server = gml.server(backend)?;
//! std::thread::scope(|s| {
//!     let worker = s.spawn(|| {
//!         let mut gl = gml.producer(1)?;
//!         gl.clear(COLOR_BUFFER_BIT);
//!         Ok::<_, GmlError>(())
//!     });
//!     server.execute_synced(|| worker.is_finished());
//! });
//! ```
//!
//! Calls that return nothing are deferred and return right away. Calls that
//! return something wait for the server to get to them, except where the
//! answer can be given without asking: see [`GmlConfig::use_cache`],
//! [`GmlConfig::optimistic_status`] and [`GraphicsObjectAllocator`].

#![warn(missing_docs)]

mod allocator;
mod cache;
mod client_state;
mod config;
pub mod containers;
mod dispatch;
mod error;
mod item_server;
pub mod opcode;
mod producer;
mod queue;
mod record;
mod registry;
mod server;
mod snapshot;
mod sync;

pub use allocator::{GraphicsObjectAllocator, ObjectKind};
pub use config::{cpu_worker_count, GmlConfig, ItemServerConfig, MAX_WORKERS};
pub use error::GmlError;
pub use gl_backend;
pub use producer::Producer;
pub use registry::{Gml, Role};
pub use server::Server;
