// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! A smoke particle workload: every frame, the particles are split between
//! the worker threads, which advance and draw their share through their own
//! [`Producer`] while this thread serves their calls.

use std::{
    collections::BTreeSet,
    panic,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use gl_backend::{enums::*, GLint, GlBackend, RecordingBackend};
use gml::{
    containers::{ClassVec, SharedVec, SimRenderList},
    Gml, GmlError, ObjectKind, Producer,
};

/// Frames a particle is drawn before it's respawned.
const LIFETIME: u32 = 90;
const QUAD_CORNERS: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
const SMOKE_TEXELS: [u8; 4 * 4 * 4] = [0xB0; 4 * 4 * 4];

/// Xorshift, so that runs with the same arguments draw the same things.
struct Rng(u32);

impl Rng {
    fn next_f32(&mut self) -> f32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        (self.0 >> 8) as f32 / (1 << 24) as f32
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct SmokeParticle {
    id: u64,
    position: [f32; 3],
    velocity: [f32; 3],
    size: f32,
    age: u32,
}

impl SmokeParticle {
    fn spawn(rng: &mut Rng, id: u64) -> SmokeParticle {
        SmokeParticle {
            id,
            position: [rng.next_f32() * 2.0 - 1.0, -1.0, rng.next_f32()],
            velocity: [(rng.next_f32() - 0.5) * 0.01, 0.01 + rng.next_f32() * 0.01, 0.0],
            size: 0.01 + rng.next_f32() * 0.02,
            // Spread the ages so particles don't all expire on the same frame.
            age: (rng.next_f32() * LIFETIME as f32) as u32,
        }
    }

    /// Returns false once the particle has expired.
    fn advance(&mut self) -> bool {
        self.age += 1;
        for (position, velocity) in self.position.iter_mut().zip(self.velocity) {
            *position += velocity;
        }
        self.velocity[1] += 0.0002;
        self.size *= 1.01;
        self.age < LIFETIME
    }

    fn alpha(&self) -> f32 {
        1.0 - self.age as f32 / LIFETIME as f32
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerStats {
    pub particles_drawn: usize,
    pub queries: usize,
    pub frames: u32,
}

#[derive(Debug, Clone)]
pub struct Workload {
    pub frames: u32,
    pub particles: usize,
}

#[derive(Debug, Default)]
pub struct Report {
    pub elapsed: Duration,
    pub calls: usize,
    pub draws: usize,
    pub respawned: usize,
    /// Particles in the render view after the last frame.
    pub visible: usize,
    pub names_generated: usize,
    pub textures_in_stock: u64,
    pub workers: Vec<WorkerStats>,
}

/// Runs the workload with every worker slot of `gml`, with this thread as
/// the server.
pub fn run(gml: &Arc<Gml>, workload: &Workload) -> anyhow::Result<Report> {
    let mut server = gml.server(RecordingBackend::new())?;
    server.backend_mut().viewport(0, 0, 1280, 720);

    let workers = gml.config().max_workers;
    let mut rng = Rng(0x2545_F491);
    let mut particles = (0..workload.particles as u64)
        .map(|id| SmokeParticle::spawn(&mut rng, id))
        .collect::<Vec<_>>();
    let mut next_id = particles.len() as u64;
    let mut live = SimRenderList::new();
    for particle in &particles {
        live.push(particle.id);
    }
    live.delay_add();
    live.add_delayed();
    let chunk_len = particles.len().div_ceil(workers).max(1);
    let mut expired = SharedVec::new();
    let mut stats = ClassVec::<WorkerStats>::new();
    let mut report = Report::default();
    let started = Instant::now();

    for frame in 0..workload.frames {
        thread::scope(|s| -> anyhow::Result<()> {
            let handles = particles
                .chunks_mut(chunk_len)
                .enumerate()
                .map(|(i, chunk)| {
                    let (expired, stats) = (&expired, &stats);
                    s.spawn(move || -> Result<(), GmlError> {
                        let mut gl = gml.producer(i + 1)?;
                        let frame_stats = draw_smoke(&mut gl, chunk, i * chunk_len, expired);
                        let mut total = stats.acquire(i);
                        total.particles_drawn += frame_stats.particles_drawn;
                        total.queries += frame_stats.queries;
                        total.frames += 1;
                        Ok(())
                    })
                })
                .collect::<Vec<_>>();
            report.calls += server.execute_synced(|| handles.iter().all(|h| h.is_finished()));
            for handle in handles {
                match handle.join() {
                    Ok(result) => result?,
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            Ok(())
        })?;

        let indices = expired.items();
        indices.sort_unstable();
        let expired_ids = indices
            .iter()
            .map(|&index| particles[index].id)
            .collect::<BTreeSet<_>>();
        live.retain_synced(|id| !expired_ids.contains(id));
        for &index in indices.iter() {
            particles[index] = SmokeParticle::spawn(&mut rng, next_id);
            live.push(next_id);
            next_id += 1;
        }
        report.respawned += indices.len();
        tracing::debug!("frame {frame}: respawned {} particles", indices.len());
        expired.clear();

        live.delay_delete();
        live.delete_delayed();
        live.delay_add();
        live.add_delayed();
        report.visible = live.render_len();

        let backend = server.backend_mut();
        report.draws += backend.draws.len();
        backend.draws.clear();
        backend.calls.clear();
    }

    report.elapsed = started.elapsed();
    report.names_generated = server.backend().generated.len();
    report.textures_in_stock = gml.allocator().stock(ObjectKind::Texture);
    report.workers = stats.items().to_vec();
    Ok(report)
}

fn draw_smoke(
    gl: &mut Producer,
    particles: &mut [SmokeParticle],
    first_index: usize,
    expired: &SharedVec<usize>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    let mut texture = 0;
    gl.gen_textures(core::slice::from_mut(&mut texture));
    gl.bind_texture(TEXTURE_2D, texture);
    gl.tex_image_2d(
        TEXTURE_2D,
        0,
        RGBA as GLint,
        4,
        4,
        0,
        RGBA,
        UNSIGNED_BYTE,
        Some(&SMOKE_TEXELS[..]),
    );
    gl.enable(BLEND);
    gl.blend_func(SRC_ALPHA, ONE_MINUS_SRC_ALPHA);
    gl.enable_client_state(VERTEX_ARRAY);

    let mut viewport = [0; 4];
    gl.get_integer_v(VIEWPORT, &mut viewport);
    stats.queries += 1;
    let aspect = viewport[2] as f32 / viewport[3].max(1) as f32;

    let mut vertices = [0.0f32; 3 * QUAD_CORNERS.len()];
    for (offset, particle) in particles.iter_mut().enumerate() {
        if !particle.advance() {
            expired.push(first_index + offset);
            continue;
        }
        for (corner, vertex) in QUAD_CORNERS.iter().zip(vertices.chunks_exact_mut(3)) {
            vertex[0] = particle.position[0] + corner[0] * particle.size / aspect;
            vertex[1] = particle.position[1] + corner[1] * particle.size;
            vertex[2] = particle.position[2];
        }
        gl.color_4f(0.7, 0.7, 0.7, particle.alpha());
        gl.vertex_pointer(3, FLOAT, 0, vertices.as_ptr().cast());
        // Safety: the vertex pointer was just set to `vertices`, which holds
        // the four vertices drawn. The other client arrays are disabled.
        unsafe { gl.draw_arrays(QUADS, 0, 4) };
        stats.particles_drawn += 1;
    }

    gl.disable_client_state(VERTEX_ARRAY);
    gl.disable(BLEND);
    gl.delete_textures(&[texture]);
    stats
}

#[cfg(test)]
mod tests {
    use gml::{Gml, GmlConfig};

    use super::{run, Workload};

    #[test]
    fn every_particle_is_drawn_or_respawned_each_frame() {
        let gml = Gml::new(GmlConfig {
            max_workers: 3,
            ..Default::default()
        })
        .unwrap();
        let workload = Workload {
            frames: 5,
            particles: 100,
        };
        let report = run(&gml, &workload).unwrap();
        assert_eq!(500, report.draws + report.respawned);
        assert_eq!(100, report.visible);
        assert_eq!(report.draws, report.workers.iter().map(|w| w.particles_drawn).sum::<usize>());
        assert_eq!(3, report.workers.len());
        assert!(report.workers.iter().all(|w| w.frames == 5 && w.queries == 5));
        assert!(report.names_generated >= 15);
        assert!(report.calls > report.draws);
    }
}
