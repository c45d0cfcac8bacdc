use glam::Vec3;

/// Stable index of a particle. Particles are never removed, so a handle stays
/// valid for the lifetime of the set that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleHandle(pub usize);

impl ParticleHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// SoA particle storage plus the simulation clock.
///
/// Columns from `predicted` down are solver scratch: they hold meaningful
/// values only between the phase that writes them and the end of the step.
pub struct ParticleSet {
    pub count: usize,
    /// Current simulation time in seconds.
    pub time: f32,
    pub mass: Vec<f32>,
    /// Material (undeformed) position. Never changes after creation.
    pub rest_position: Vec<Vec3>,
    pub position: Vec<Vec3>,
    pub velocity: Vec<Vec3>,
    /// Force accumulator, rebuilt in the predict phase.
    pub force: Vec<Vec3>,
    /// Rendering hint only; the solver never reads it.
    pub highlight: Vec<bool>,
    // PBF solver buffers
    /// Predicted positions for constraint solving
    pub predicted: Vec<Vec3>,
    /// SPH density estimate
    pub density: Vec<f32>,
    /// Density constraint value `rho / rho0 - 1`
    pub constraint: Vec<f32>,
    /// PBF Lagrange multiplier
    pub lambda: Vec<f32>,
    /// Sum of squared constraint gradients (lambda denominator without epsilon)
    pub grad_norm_sq: Vec<f32>,
    /// Position correction of the current iteration
    pub corrections: Vec<Vec3>,
    /// Net position change over the step
    pub delta_x: Vec<Vec3>,
    /// Vorticity estimate for vorticity confinement
    pub vorticity: Vec<Vec3>,
}

impl ParticleSet {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            count: 0,
            time: 0.0,
            mass: Vec::with_capacity(capacity),
            rest_position: Vec::with_capacity(capacity),
            position: Vec::with_capacity(capacity),
            velocity: Vec::with_capacity(capacity),
            force: Vec::with_capacity(capacity),
            highlight: Vec::with_capacity(capacity),
            predicted: Vec::with_capacity(capacity),
            density: Vec::with_capacity(capacity),
            constraint: Vec::with_capacity(capacity),
            lambda: Vec::with_capacity(capacity),
            grad_norm_sq: Vec::with_capacity(capacity),
            corrections: Vec::with_capacity(capacity),
            delta_x: Vec::with_capacity(capacity),
            vorticity: Vec::with_capacity(capacity),
        }
    }

    /// Append a particle at rest at `rest_position`.
    pub fn push(&mut self, rest_position: Vec3, mass: f32) -> ParticleHandle {
        let handle = ParticleHandle(self.count);
        self.mass.push(mass);
        self.rest_position.push(rest_position);
        self.position.push(rest_position);
        self.velocity.push(Vec3::ZERO);
        self.force.push(Vec3::ZERO);
        self.highlight.push(false);
        self.predicted.push(rest_position);
        self.density.push(0.0);
        self.constraint.push(0.0);
        self.lambda.push(0.0);
        self.grad_norm_sq.push(0.0);
        self.corrections.push(Vec3::ZERO);
        self.delta_x.push(Vec3::ZERO);
        self.vorticity.push(Vec3::ZERO);
        self.count += 1;
        handle
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn contains(&self, handle: ParticleHandle) -> bool {
        handle.0 < self.count
    }

    /// Move every particle back to its material position at rest and rewind
    /// the clock. Idempotent.
    pub fn reset(&mut self) {
        self.position.copy_from_slice(&self.rest_position);
        self.velocity.fill(Vec3::ZERO);
        self.force.fill(Vec3::ZERO);
        self.highlight.fill(false);
        self.time = 0.0;
    }

    /// Particle whose *current* position is closest to `query`. Ties go to the
    /// lowest index. `None` only when the set is empty; if no distance
    /// compares (overflow to infinity, NaN query) the first particle wins.
    pub fn nearest(&self, query: Vec3) -> Option<ParticleHandle> {
        let first = self.position.first()?;
        let mut best = 0;
        let mut best_dist_sq = first.distance_squared(query);
        for (i, p) in self.position.iter().enumerate().skip(1) {
            let dist_sq = p.distance_squared(query);
            if dist_sq < best_dist_sq || (best_dist_sq.is_nan() && !dist_sq.is_nan()) {
                best_dist_sq = dist_sq;
                best = i;
            }
        }
        Some(ParticleHandle(best))
    }

    /// First particle with a NaN or infinite position or velocity.
    pub fn first_non_finite(&self) -> Option<usize> {
        (0..self.count).find(|&i| !self.position[i].is_finite() || !self.velocity[i].is_finite())
    }
}

impl Default for ParticleSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_initializes_at_rest() {
        let mut set = ParticleSet::new();
        let h = set.push(Vec3::new(0.1, 0.2, 0.3), 1.0);

        assert_eq!(h, ParticleHandle(0));
        assert_eq!(set.len(), 1);
        assert_eq!(set.position[0], set.rest_position[0]);
        assert_eq!(set.predicted[0], set.rest_position[0]);
        assert_eq!(set.velocity[0], Vec3::ZERO);
        assert!(!set.highlight[0]);
    }

    #[test]
    fn test_nearest_on_empty_set() {
        let set = ParticleSet::new();
        assert_eq!(set.nearest(Vec3::ZERO), None);
    }

    #[test]
    fn test_nearest_tie_goes_to_lowest_index() {
        let mut set = ParticleSet::new();
        set.push(Vec3::new(-1.0, 0.0, 0.0), 1.0);
        set.push(Vec3::new(1.0, 0.0, 0.0), 1.0);
        assert_eq!(set.nearest(Vec3::ZERO), Some(ParticleHandle(0)));
    }

    #[test]
    fn test_nearest_far_or_nan_query_on_non_empty_set() {
        let mut set = ParticleSet::new();
        set.push(Vec3::splat(0.5), 1.0);
        assert_eq!(set.nearest(Vec3::new(3e19, 0.0, 0.0)), Some(ParticleHandle(0)));
        assert_eq!(set.nearest(Vec3::splat(f32::NAN)), Some(ParticleHandle(0)));

        set.push(Vec3::splat(0.9), 1.0);
        assert_eq!(set.nearest(Vec3::splat(-3e19)), Some(ParticleHandle(0)));
    }

    #[test]
    fn test_nearest_skips_nan_particle() {
        let mut set = ParticleSet::new();
        set.push(Vec3::ZERO, 1.0);
        set.push(Vec3::splat(0.5), 1.0);
        set.position[0].x = f32::NAN;
        assert_eq!(set.nearest(Vec3::splat(0.4)), Some(ParticleHandle(1)));
    }

    #[test]
    fn test_first_non_finite() {
        let mut set = ParticleSet::new();
        set.push(Vec3::ZERO, 1.0);
        set.push(Vec3::ZERO, 1.0);
        assert_eq!(set.first_non_finite(), None);

        set.velocity[1].y = f32::NAN;
        assert_eq!(set.first_non_finite(), Some(1));
    }
}
