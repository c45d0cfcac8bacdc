use std::thread;

use glam::Vec3;
use pbf_core::boundary::Aabb;
use pbf_core::forces::SpringForce;
use pbf_core::{FluidSystem, SharedFluidSystem, SolverConfig};

fn shared_block() -> SharedFluidSystem {
    let mut system = FluidSystem::new(SolverConfig::default()).unwrap();
    system.fill_box(Vec3::splat(0.2), Vec3::splat(0.4), 0.05);
    SharedFluidSystem::new(system)
}

#[test]
fn test_snapshots_during_concurrent_stepping() {
    let shared = shared_block();
    let count = shared.with(|s| s.particle_count());

    let stepper = {
        let shared = shared.clone();
        thread::spawn(move || {
            for _ in 0..20 {
                shared.advance(0.01).unwrap();
            }
        })
    };

    for _ in 0..20 {
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.len(), count);
        assert!(snapshot.iter().all(|p| Aabb::UNIT.contains(p.position)));
    }

    stepper.join().unwrap();
    assert!((shared.with(|s| s.time()) - 0.2).abs() < 1e-4);
}

#[test]
fn test_drag_interaction_through_shared_handle() {
    let shared = shared_block();
    let grabbed = shared.nearest_particle(Vec3::splat(0.4)).unwrap();
    shared.set_highlight(grabbed, true);

    let id = shared.register_force(Box::new(
        SpringForce::new(grabbed, Vec3::new(0.9, 0.9, 0.9), 200.0).with_damping(1.0),
    ));
    for _ in 0..10 {
        shared.advance(0.01).unwrap();
    }
    assert!(shared.unregister_force(id).is_some());

    let snapshot = shared.snapshot();
    assert!(snapshot[grabbed.index()].highlight);
    assert_eq!(snapshot.iter().filter(|p| p.highlight).count(), 1);

    shared.reset();
    assert!(shared.snapshot().iter().all(|p| !p.highlight));
}

#[test]
fn test_create_particles_from_several_threads() {
    let shared = SharedFluidSystem::new(FluidSystem::new(SolverConfig::default()).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let shared = shared.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|k| shared.create_particle(Vec3::new(0.1 + 0.2 * t as f32, 0.01 * k as f32, 0.5)))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut issued: Vec<usize> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .map(|h| h.index())
        .collect();
    issued.sort_unstable();

    assert_eq!(issued, (0..100).collect::<Vec<_>>(), "handles must be unique and dense");
}
