//! Headless dam-break run.
//!
//! Usage: `cargo run --features headless --bin pbf-headless -- [config.toml] [steps]`

use anyhow::Context;
use glam::Vec3;
use pbf_core::{FluidSystem, SolverConfig};

const DT: f32 = 0.01;
const SPACING: f32 = 0.05;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => SolverConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => SolverConfig::default(),
    };
    let steps: u32 = match args.get(2) {
        Some(s) => s.parse().with_context(|| format!("invalid step count {s:?}"))?,
        None => 200,
    };

    let mut system = FluidSystem::new(config)?;
    let created = system.fill_box(Vec3::new(0.05, 0.05, 0.05), Vec3::new(0.4, 0.6, 0.4), SPACING);
    log::info!("dam break with {created} particles, {steps} steps of {DT}s");

    for step in 0..steps {
        let stats = system
            .advance(DT)
            .with_context(|| format!("step {step} failed"))?;
        if step % 50 == 0 {
            log::info!(
                "step {step}: t = {:.2}, {} neighbor pairs, max density error {:.3}",
                stats.time,
                stats.neighbor_pairs,
                stats.max_density_error,
            );
        }
    }

    let particles = system.particles();
    let centroid = particles.position.iter().copied().sum::<Vec3>() / particles.count.max(1) as f32;
    println!("t = {:.2}, centroid = {centroid}", system.time());
    Ok(())
}
