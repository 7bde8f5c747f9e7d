// SPDX-FileCopyrightText: 2024 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

mod cli;
mod particles;
mod settings;

use anyhow::Context;
use gml::Gml;

use crate::particles::Workload;

fn main() -> anyhow::Result<()> {
    let options = cli::options().run();
    tracing_subscriber::fmt()
        .with_max_level(options.verbosity_level)
        .init();

    #[cfg(feature = "profile")]
    profiling::tracy_client::Client::start();

    let mut config = settings::read(options.settings_path.as_deref())?.into_config();
    if let Some(workers) = options.workers {
        config.max_workers = workers;
    }
    tracing::info!("using {} worker threads", config.max_workers);
    let gml = Gml::new(config).context("Failed to create the deferred graphics context")?;

    let workload = Workload {
        frames: options.frames,
        particles: options.particles,
    };
    let report = particles::run(&gml, &workload).context("The particle workload failed")?;

    println!(
        "Drew {} frames of {} particles with {} workers in {:.2?}.",
        workload.frames,
        workload.particles,
        report.workers.len(),
        report.elapsed
    );
    println!(
        "The server executed {} deferred calls, {} of them draws, and generated {} object names.",
        report.calls, report.draws, report.names_generated
    );
    println!(
        "{} particles expired and were respawned, {} are visible, {} texture names are left in stock.",
        report.respawned, report.visible, report.textures_in_stock
    );
    for (i, worker) in report.workers.iter().enumerate() {
        println!(
            "  worker {}: {} particles drawn over {} frames, {} queries",
            i + 1,
            worker.particles_drawn,
            worker.frames,
            worker.queries
        );
    }
    Ok(())
}
