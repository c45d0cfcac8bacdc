use glam::Vec3;

use super::Force;
use crate::particle::{ParticleHandle, ParticleSet};

/// Zero-rest-length damped spring pulling one particle toward an anchor.
///
/// This is the interactive "drag a particle with the mouse" force: the UI
/// registers one while a particle is grabbed, moves the anchor with the
/// cursor, and unregisters it on release.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringForce {
    pub particle: ParticleHandle,
    pub anchor: Vec3,
    pub stiffness: f32,
    pub damping: f32,
}

impl SpringForce {
    pub fn new(particle: ParticleHandle, anchor: Vec3, stiffness: f32) -> Self {
        Self {
            particle,
            anchor,
            stiffness,
            damping: 0.0,
        }
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// Force on the particle at `position` moving with `velocity`.
    #[inline]
    pub fn force_at(&self, position: Vec3, velocity: Vec3) -> Vec3 {
        (self.anchor - position) * self.stiffness - velocity * self.damping
    }
}

impl Force for SpringForce {
    fn apply(&self, particles: &ParticleSet, forces: &mut [Vec3]) {
        if !particles.contains(self.particle) {
            return;
        }
        let i = self.particle.index();
        forces[i] += self.force_at(particles.position[i], particles.velocity[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spring_pulls_toward_anchor() {
        let spring = SpringForce::new(ParticleHandle(0), Vec3::new(1.0, 0.0, 0.0), 2.0);
        assert_eq!(spring.force_at(Vec3::ZERO, Vec3::ZERO), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_spring_damping_opposes_velocity() {
        let spring = SpringForce::new(ParticleHandle(0), Vec3::ZERO, 0.0).with_damping(0.5);
        assert_eq!(spring.force_at(Vec3::ZERO, Vec3::Y), Vec3::new(0.0, -0.5, 0.0));
    }

    #[test]
    fn test_stale_handle_is_ignored() {
        let mut set = ParticleSet::new();
        set.push(Vec3::ZERO, 1.0);
        let spring = SpringForce::new(ParticleHandle(5), Vec3::ONE, 1.0);
        let mut forces = vec![Vec3::ZERO; 1];
        spring.apply(&set, &mut forces);
        assert_eq!(forces[0], Vec3::ZERO);
    }
}
