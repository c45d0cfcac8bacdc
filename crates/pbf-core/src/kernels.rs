use glam::Vec3;
use std::f32::consts::PI;

/// Separations shorter than this are treated as coincident particles.
pub const TINY: f32 = 1e-8;

/// Poly6 smoothing kernel for SPH density estimation.
///
/// Returns `W(r, h) = 315 / (64 * PI * h^9) * (h^2 - r^2)^3` when `r <= h`,
/// and `0.0` when `r > h`.
#[inline]
pub fn poly6(r: f32, h: f32) -> f32 {
    debug_assert!(!(r < 0.0), "poly6 called with negative distance {r}");
    if r > h {
        return 0.0;
    }
    let h2 = h * h;
    let diff = h2 - r * r;
    let h9 = h2 * h2 * h2 * h2 * h; // h^9
    let coeff = 315.0 / (64.0 * PI * h9);
    coeff * diff * diff * diff
}

/// Spiky kernel gradient with respect to `x_i`, where `r = x_i - x_j`.
///
/// Returns `(-45 / (PI * h^6)) * (h - r_len)^2 / r_len * r` when
/// `TINY <= r_len <= h`, and `Vec3::ZERO` otherwise.
#[inline]
pub fn spiky_gradient(r: Vec3, r_len: f32, h: f32) -> Vec3 {
    debug_assert!(!(r_len < 0.0), "spiky_gradient called with negative distance {r_len}");
    if r_len > h || r_len < TINY {
        return Vec3::ZERO;
    }
    let h6 = h * h * h * h * h * h;
    let diff = h - r_len;
    let coeff = -45.0 / (PI * h6) * diff * diff / r_len;
    r * coeff
}

/// Spiky gradient between two predicted positions.
#[inline]
pub fn spiky_gradient_between(x_i: Vec3, x_j: Vec3, h: f32) -> Vec3 {
    let r = x_i - x_j;
    spiky_gradient(r, r.length(), h)
}

/// One term of the lambda denominator `sum_k |grad_k C_i|^2`.
///
/// For `k == i` the gradient is the sum over all of `i`'s neighbors of
/// `grad W(x_i - x_j) / rho0`; for any other `k` it is
/// `-grad W(x_i - x_k) / rho0`. Returns the squared length.
pub fn squared_gradient_norm(
    i: usize,
    k: usize,
    predicted: &[Vec3],
    neighbors_of_i: &[u32],
    h: f32,
    inv_rho0: f32,
) -> f32 {
    let x_i = predicted[i];
    if k == i {
        let mut grad = Vec3::ZERO;
        for &j in neighbors_of_i {
            grad += spiky_gradient_between(x_i, predicted[j as usize], h) * inv_rho0;
        }
        grad.length_squared()
    } else {
        (-spiky_gradient_between(x_i, predicted[k], h) * inv_rho0).length_squared()
    }
}
