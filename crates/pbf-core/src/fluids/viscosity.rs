use glam::Vec3;

use crate::kernels::poly6;
use crate::neighbors::NeighborList;
use crate::particle::ParticleSet;

/// Apply XSPH viscosity to particle velocities.
///
/// Formula: v_i' = v_i + c * sum_j { W(|x_i - x_j|, h) * (v_j - v_i) }
///
/// The sum includes `j == i`, whose term is zero. Every new velocity is
/// computed from the old velocities before any is written back.
pub fn apply_xsph_viscosity(
    particles: &mut ParticleSet,
    neighbors: &NeighborList,
    scratch: &mut Vec<Vec3>,
    coefficient: f32,
    h: f32,
) {
    let count = particles.count;
    scratch.clear();
    scratch.reserve(count);

    for i in 0..count {
        let pos_i = particles.predicted[i];
        let vel_i = particles.velocity[i];
        let mut vel_new = vel_i;

        for &j in neighbors.neighbors(i) {
            let j = j as usize;
            let w = poly6(pos_i.distance(particles.predicted[j]), h);
            vel_new += coefficient * w * (particles.velocity[j] - vel_i);
        }

        scratch.push(vel_new);
    }

    particles.velocity.copy_from_slice(scratch);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_velocities_move_toward_each_other() {
        let mut particles = ParticleSet::new();
        particles.push(Vec3::new(0.50, 0.5, 0.5), 1.0);
        particles.push(Vec3::new(0.53, 0.5, 0.5), 1.0);
        particles.velocity[0] = Vec3::new(1.0, 0.0, 0.0);
        particles.velocity[1] = Vec3::new(-1.0, 0.0, 0.0);

        let mut neighbors = NeighborList::new();
        neighbors.rebuild_brute_force(&particles.predicted, 0.2);
        let mut scratch = Vec::new();
        apply_xsph_viscosity(&mut particles, &neighbors, &mut scratch, 1e-4, 0.1);

        assert!(particles.velocity[0].x < 1.0 && particles.velocity[0].x > 0.0);
        assert!(particles.velocity[1].x > -1.0 && particles.velocity[1].x < 0.0);
        // Symmetric pair, so momentum is preserved
        let total = particles.velocity[0] + particles.velocity[1];
        assert!(total.length() < 1e-5, "total momentum {total}");
    }
}
