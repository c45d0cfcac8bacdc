use glam::Vec3;

use crate::kernels::{spiky_gradient_between, TINY};
use crate::neighbors::NeighborList;
use crate::particle::ParticleSet;

/// Vorticity confinement: re-inject rotation lost to numerical damping.
///
/// The curl estimate `omega_i = sum_j (v_j - v_i) x grad W(x_i - x_j)` is
/// stored in `particles.vorticity` for every particle first. Then each
/// particle is pushed along `N x omega_i`, with `N` the normalized
/// `eta_i = sum_j |omega_j| grad W(x_i - x_j)`.
///
/// Only neighbor sets are summed. They span `2h` and the gradient is zero
/// past `h`, so nothing is lost. A particle whose `eta` is shorter than
/// [`TINY`] is left alone.
pub fn apply_vorticity_confinement(
    particles: &mut ParticleSet,
    neighbors: &NeighborList,
    epsilon: f32,
    h: f32,
    dt: f32,
) {
    let ParticleSet {
        predicted,
        velocity,
        vorticity,
        count,
        ..
    } = particles;

    for i in 0..*count {
        vorticity[i] = neighbors.neighbors(i).iter().fold(Vec3::ZERO, |acc, &j| {
            let j = j as usize;
            let grad = spiky_gradient_between(predicted[i], predicted[j], h);
            acc + (velocity[j] - velocity[i]).cross(grad)
        });
    }

    for i in 0..*count {
        let eta = neighbors.neighbors(i).iter().fold(Vec3::ZERO, |acc, &j| {
            let j = j as usize;
            acc + spiky_gradient_between(predicted[i], predicted[j], h) * vorticity[j].length()
        });
        let eta_len = eta.length();
        if eta_len < TINY {
            continue;
        }
        velocity[i] += (eta / eta_len).cross(vorticity[i]) * (epsilon * dt);
    }
}
