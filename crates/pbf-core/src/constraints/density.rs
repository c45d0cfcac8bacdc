use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::boundary::Aabb;
use crate::config::SolverConfig;
use crate::kernels::{poly6, spiky_gradient, squared_gradient_norm};
use crate::neighbors::NeighborList;
use crate::particle::ParticleSet;

/// Tensile instability correction `s_corr = -k * (W(r) / W(deltaQ))^n`.
#[derive(Clone, Copy, Debug)]
pub struct TensileCorrection {
    pub k: f32,
    pub n: i32,
    /// `1 / W(deltaQ)`, evaluated once per step.
    pub inv_w_delta_q: f32,
}

impl TensileCorrection {
    #[inline]
    pub fn s_corr(&self, w: f32) -> f32 {
        -self.k * (w * self.inv_w_delta_q).powi(self.n)
    }
}

/// Constants of the density constraint for one step.
#[derive(Clone, Copy, Debug)]
pub struct DensityParams {
    pub h: f32,
    pub inv_rho0: f32,
    pub epsilon: f32,
    /// `None` when artificial pressure is disabled, i.e. `s_corr = 0`.
    pub tensile: Option<TensileCorrection>,
}

impl DensityParams {
    pub fn from_config(config: &SolverConfig) -> Self {
        let h = config.kernel_radius;
        let ap = &config.artificial_pressure;
        let tensile = ap.enabled.then(|| TensileCorrection {
            k: ap.k,
            n: ap.n,
            inv_w_delta_q: 1.0 / poly6(config.delta_q(), h),
        });
        Self {
            h,
            inv_rho0: 1.0 / config.rest_density,
            epsilon: config.relaxation_epsilon,
            tensile,
        }
    }

    /// Artificial pressure for a pair at distance `r`.
    #[inline]
    pub fn s_corr(&self, r: f32) -> f32 {
        match &self.tensile {
            Some(t) => t.s_corr(poly6(r, self.h)),
            None => 0.0,
        }
    }
}

/// Per-particle output of the lambda pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LambdaTerms {
    pub density: f32,
    pub constraint: f32,
    pub grad_norm_sq: f32,
    pub lambda: f32,
}

/// Density, constraint value and Lagrange multiplier of particle `i`.
///
/// Reference: "Position Based Fluids", Macklin & Muller, SIGGRAPH 2013, Eq. 9-11
pub fn lambda_terms(
    i: usize,
    mass: f32,
    predicted: &[Vec3],
    neighbors: &NeighborList,
    params: &DensityParams,
) -> LambdaTerms {
    let h = params.h;
    let pos_i = predicted[i];
    let neighbors_of_i = neighbors.neighbors(i);

    let mut kernel_sum = 0.0_f32;
    let mut grad_norm_sq = 0.0_f32;
    for &j in neighbors_of_i {
        let j = j as usize;
        kernel_sum += poly6(pos_i.distance(predicted[j]), h);
        grad_norm_sq +=
            squared_gradient_norm(i, j, predicted, neighbors_of_i, h, params.inv_rho0);
    }

    let density = mass * kernel_sum;
    let constraint = density * params.inv_rho0 - 1.0;
    LambdaTerms {
        density,
        constraint,
        grad_norm_sq,
        lambda: -constraint / (grad_norm_sq + params.epsilon),
    }
}

/// Position correction of particle `i` from the current multipliers.
pub fn position_correction(
    i: usize,
    predicted: &[Vec3],
    lambda: &[f32],
    neighbors: &NeighborList,
    params: &DensityParams,
) -> Vec3 {
    let pos_i = predicted[i];
    let lambda_i = lambda[i];
    let mut delta_p = Vec3::ZERO;

    for &j in neighbors.neighbors(i) {
        let j = j as usize;
        let r = pos_i - predicted[j];
        let r_len = r.length();
        let s_corr = params.s_corr(r_len);
        delta_p += (lambda_i + lambda[j] + s_corr) * params.inv_rho0 * spiky_gradient(r, r_len, params.h);
    }
    delta_p
}

/// Phase 1: density, constraint, gradient norm and lambda for every particle.
pub fn compute_lambdas(particles: &mut ParticleSet, neighbors: &NeighborList, params: &DensityParams) {
    let count = particles.count;

    #[cfg(feature = "parallel")]
    let terms: Vec<LambdaTerms> = (0..count)
        .into_par_iter()
        .map(|i| lambda_terms(i, particles.mass[i], &particles.predicted, neighbors, params))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let terms: Vec<LambdaTerms> = (0..count)
        .map(|i| lambda_terms(i, particles.mass[i], &particles.predicted, neighbors, params))
        .collect();

    for (i, t) in terms.into_iter().enumerate() {
        particles.density[i] = t.density;
        particles.constraint[i] = t.constraint;
        particles.grad_norm_sq[i] = t.grad_norm_sq;
        particles.lambda[i] = t.lambda;
    }
}

/// Phase 2: position corrections from the multipliers of phase 1.
pub fn compute_corrections(particles: &mut ParticleSet, neighbors: &NeighborList, params: &DensityParams) {
    let predicted = &particles.predicted;
    let lambda = &particles.lambda;

    #[cfg(feature = "parallel")]
    particles
        .corrections
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, dp)| *dp = position_correction(i, predicted, lambda, neighbors, params));

    #[cfg(not(feature = "parallel"))]
    for (i, dp) in particles.corrections.iter_mut().enumerate() {
        *dp = position_correction(i, predicted, lambda, neighbors, params);
    }
}

/// Phase 3: apply corrections and clamp into the container.
pub fn apply_corrections(particles: &mut ParticleSet, bounds: &Aabb) {
    for (p, dp) in particles.predicted.iter_mut().zip(&particles.corrections) {
        *p = bounds.clamp(*p + *dp);
    }
}

/// Solve PBF density constraints with a fixed iteration budget.
///
/// Each iteration is Jacobi-style: every lambda is computed from the same
/// predicted positions, every correction from the same lambdas, and only then
/// are the positions moved and clamped. Neighbor sets are not rebuilt between
/// iterations.
pub fn solve_density_constraints(
    particles: &mut ParticleSet,
    neighbors: &NeighborList,
    params: &DensityParams,
    iterations: u32,
    bounds: &Aabb,
) {
    for _iter in 0..iterations {
        compute_lambdas(particles, neighbors, params);
        compute_corrections(particles, neighbors, params);
        apply_corrections(particles, bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(tensile: bool) -> DensityParams {
        let mut config = SolverConfig::default();
        config.artificial_pressure.enabled = tensile;
        DensityParams::from_config(&config)
    }

    #[test]
    fn test_s_corr_zero_when_disabled() {
        let p = params(false);
        for r in [0.0, 0.01, 0.03, 0.05, 0.099, 0.1, 0.15] {
            assert_eq!(p.s_corr(r), 0.0, "s_corr({r}) should be 0 when disabled");
        }
    }

    #[test]
    fn test_s_corr_reference_value_at_delta_q() {
        let p = params(true);
        // W(deltaQ) / W(deltaQ) = 1, so s_corr = -k
        let s = p.s_corr(0.03);
        assert!((s + 0.0001).abs() < 1e-8, "s_corr(deltaQ) = {s}");
        assert!(p.s_corr(0.2) == 0.0);
    }

    #[test]
    fn test_isolated_particle_has_no_correction() {
        let mut particles = ParticleSet::new();
        particles.push(Vec3::new(0.5, 0.5, 0.5), 1.0);
        let mut neighbors = NeighborList::new();
        neighbors.rebuild_brute_force(&particles.predicted, 0.2);

        let p = params(true);
        compute_lambdas(&mut particles, &neighbors, &p);
        compute_corrections(&mut particles, &neighbors, &p);

        assert_eq!(particles.corrections[0], Vec3::ZERO);
        assert_eq!(particles.grad_norm_sq[0], 0.0);
        // Density is W(0) for a lone particle
        assert!((particles.density[0] - poly6(0.0, 0.1)).abs() < 1e-2);
        // Under-dense, so the multiplier pulls neighbors in
        assert!(particles.constraint[0] < 0.0);
        assert!(particles.lambda[0] > 0.0);
    }
}
