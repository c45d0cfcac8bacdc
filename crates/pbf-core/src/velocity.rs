use glam::Vec3;

use crate::config::VelocityUpdate;
use crate::particle::ParticleSet;

/// Derive velocities from the net position change of the step and damp them.
///
/// `delta_x = predicted - position`. With [`VelocityUpdate::Accumulate`] the
/// velocity already advanced under gravity is kept and `delta_x / dt` is added
/// to it; with [`VelocityUpdate::Replace`] it is overwritten. Either way the
/// result is scaled by `damping`.
pub fn reconstruct_velocities(particles: &mut ParticleSet, dt: f32, damping: f32, mode: VelocityUpdate) {
    let inv_dt = 1.0 / dt;
    for i in 0..particles.count {
        let delta_x = particles.predicted[i] - particles.position[i];
        particles.delta_x[i] = delta_x;

        let base = match mode {
            VelocityUpdate::Accumulate => particles.velocity[i],
            VelocityUpdate::Replace => Vec3::ZERO,
        };
        particles.velocity[i] = (base + delta_x * inv_dt) * damping;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved_particle() -> ParticleSet {
        let mut set = ParticleSet::new();
        set.push(Vec3::new(0.5, 0.5, 0.5), 1.0);
        set.velocity[0] = Vec3::new(0.0, -0.1, 0.0);
        set.predicted[0] = Vec3::new(0.5, 0.499, 0.5);
        set
    }

    #[test]
    fn test_accumulate_adds_to_existing_velocity() {
        let mut set = moved_particle();
        reconstruct_velocities(&mut set, 0.01, 1.0, VelocityUpdate::Accumulate);
        assert!((set.velocity[0].y + 0.2).abs() < 1e-4, "vy = {}", set.velocity[0].y);
    }

    #[test]
    fn test_replace_uses_delta_only() {
        let mut set = moved_particle();
        reconstruct_velocities(&mut set, 0.01, 1.0, VelocityUpdate::Replace);
        assert!((set.velocity[0].y + 0.1).abs() < 1e-4, "vy = {}", set.velocity[0].y);
    }

    #[test]
    fn test_damping_scales_result() {
        let mut set = moved_particle();
        reconstruct_velocities(&mut set, 0.01, 0.5, VelocityUpdate::Replace);
        assert!((set.velocity[0].y + 0.05).abs() < 1e-4);
        assert!((set.delta_x[0].y + 0.001).abs() < 1e-6);
    }
}
