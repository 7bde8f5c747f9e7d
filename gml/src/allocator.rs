// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use enum_map::{Enum, EnumMap};
use gl_backend::{enums::*, GLsizei, GLuint, GlBackend};
use serde::{Deserialize, Serialize};

use crate::{
    config::GmlConfig,
    item_server::{Item, ItemServer, SequenceServer},
    GmlError,
};

/// The kinds of objects whose names are pre-generated by the server. Display
/// lists are handed out separately, see
/// [`GraphicsObjectAllocator::request_lists`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ObjectKind {
    Texture,
    Buffer,
    Framebuffer,
    Renderbuffer,
    Query,
    Program,
    VertexShader,
    FragmentShader,
    GeometryShader,
    Quadric,
}

/// The item servers of every object kind.
pub struct GraphicsObjectAllocator {
    servers: EnumMap<ObjectKind, ItemServer>,
    lists: SequenceServer,
    /// Items requested since the last refresh.
    consumed: CachePadded<AtomicUsize>,
}

impl GraphicsObjectAllocator {
    /// Creates empty item servers sized by `config`. Nothing is generated
    /// until the first [`GraphicsObjectAllocator::refill`].
    pub fn new(config: &GmlConfig) -> GraphicsObjectAllocator {
        GraphicsObjectAllocator {
            servers: EnumMap::from_fn(|kind| ItemServer::new(config.item_servers[kind])),
            lists: SequenceServer::new(config.display_lists, config.display_lists_large),
            consumed: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Takes a pre-generated name of the given kind, waiting for the server
    /// if there are none left. 0 if generation failed.
    pub fn request(&self, kind: ObjectKind, shutdown: &AtomicBool) -> Result<GLuint, GmlError> {
        self.consumed.fetch_add(1, Ordering::Relaxed);
        Ok(self.servers[kind].request(shutdown)?.name)
    }

    /// Fills `names` with pre-generated names of the given kind.
    pub fn request_many(
        &self,
        kind: ObjectKind,
        names: &mut [GLuint],
        shutdown: &AtomicBool,
    ) -> Result<(), GmlError> {
        self.consumed.fetch_add(names.len(), Ordering::Relaxed);
        self.servers[kind].request_many(names, shutdown)
    }

    /// Takes `range` consecutive display list names. Names generated in excess
    /// are passed to `release`, to be deleted.
    pub fn request_lists(
        &self,
        range: GLsizei,
        release: impl FnMut(GLuint, GLsizei),
        shutdown: &AtomicBool,
    ) -> Result<GLuint, GmlError> {
        self.consumed.fetch_add(1, Ordering::Relaxed);
        self.lists.request(range, release, shutdown)
    }

    /// Names of the given kind generated but not yet requested.
    pub fn stock(&self, kind: ObjectKind) -> u64 {
        self.servers[kind].stock()
    }

    /// Items requested since the last [`GraphicsObjectAllocator::refill`].
    pub fn consumed(&self) -> usize {
        self.consumed.load(Ordering::Relaxed)
    }

    /// Tops up every item server. Must only be called from the thread owning
    /// `backend`. Returns the amount of names generated.
    pub fn refill<B: GlBackend + ?Sized>(&self, backend: &mut B) -> usize {
        self.consumed.store(0, Ordering::Relaxed);
        let mut generated = 0;
        for (kind, server) in &self.servers {
            generated += server.generate(|| Item {
                name: generate_name(backend, kind),
                size: 1,
            });
        }
        generated += self.lists.generate(|range| backend.gen_lists(range));
        if generated > 0 {
            tracing::trace!("generated {generated} object names");
        }
        generated
    }
}

/// Generates one name of the given kind with the real backend.
pub fn generate_name<B: GlBackend + ?Sized>(backend: &mut B, kind: ObjectKind) -> GLuint {
    let mut name = [0];
    match kind {
        ObjectKind::Texture => backend.gen_textures(&mut name),
        ObjectKind::Buffer => backend.gen_buffers(&mut name),
        ObjectKind::Framebuffer => backend.gen_framebuffers(&mut name),
        ObjectKind::Renderbuffer => backend.gen_renderbuffers(&mut name),
        ObjectKind::Query => backend.gen_queries(&mut name),
        ObjectKind::Program => return backend.create_program(),
        ObjectKind::VertexShader => return backend.create_shader(VERTEX_SHADER),
        ObjectKind::FragmentShader => return backend.create_shader(FRAGMENT_SHADER),
        ObjectKind::GeometryShader => return backend.create_shader(GEOMETRY_SHADER),
        ObjectKind::Quadric => return backend.new_quadric(),
    }
    name[0]
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::AtomicBool;

    use gl_backend::RecordingBackend;

    use crate::config::{GmlConfig, ItemServerConfig};

    use super::{GraphicsObjectAllocator, ObjectKind};

    #[test]
    fn refill_pregenerates_each_kind() {
        let config = GmlConfig::default();
        let allocator = GraphicsObjectAllocator::new(&config);
        let mut gl = RecordingBackend::new();
        let generated = allocator.refill(&mut gl);
        // Textures and quadrics 25 each, single and ranged lists 25 and 5.
        assert_eq!(25 + 25 + 25 + 5, generated);
        assert_eq!(25, gl.calls_named("gen_textures").count());
        assert_eq!(25, gl.calls_named("new_quadric").count());
        assert_eq!(0, gl.calls_named("create_program").count());
    }

    #[test]
    fn requests_are_counted_until_refill() {
        let mut config = GmlConfig::default();
        config.item_servers[ObjectKind::Buffer] = ItemServerConfig::new(8, 4);
        let allocator = GraphicsObjectAllocator::new(&config);
        let mut gl = RecordingBackend::new();
        allocator.refill(&mut gl);

        let shutdown = AtomicBool::new(false);
        let mut buffers = [0; 3];
        allocator.request_many(ObjectKind::Buffer, &mut buffers, &shutdown).unwrap();
        let texture = allocator.request(ObjectKind::Texture, &shutdown).unwrap();
        assert_eq!(4, allocator.consumed());
        assert!(gl.generated.contains(&texture));
        for buffer in buffers {
            assert!(gl.generated.contains(&buffer));
        }
        allocator.refill(&mut gl);
        assert_eq!(0, allocator.consumed());
    }
}
