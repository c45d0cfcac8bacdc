//! External force collaborators evaluated in the predict phase.

pub mod spring;

use glam::Vec3;

use crate::particle::ParticleSet;

pub use spring::SpringForce;

/// An external force contributing to the predict phase.
///
/// `apply` adds this force's per-particle contribution (in force units, not
/// acceleration) into `forces`, which already holds gravity. Implementations
/// must only add; they never overwrite other contributions. `particles` is
/// the state at the start of the step, so `particles.force` still holds the
/// previous step's totals.
pub trait Force: Send {
    fn apply(&self, particles: &ParticleSet, forces: &mut [Vec3]);
}

/// Identity of a registered force.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ForceId(u64);

/// Registered forces, evaluated in registration order.
#[derive(Default)]
pub struct ForceRegistry {
    forces: Vec<(ForceId, Box<dyn Force>)>,
    next_id: u64,
}

impl ForceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, force: Box<dyn Force>) -> ForceId {
        let id = ForceId(self.next_id);
        self.next_id += 1;
        self.forces.push((id, force));
        id
    }

    /// Remove a force by identity. Returns `None` if it was not registered.
    pub fn unregister(&mut self, id: ForceId) -> Option<Box<dyn Force>> {
        let pos = self.forces.iter().position(|(fid, _)| *fid == id)?;
        Some(self.forces.remove(pos).1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.forces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    /// Add every registered force's contribution into `forces`.
    pub fn accumulate(&self, particles: &ParticleSet, forces: &mut [Vec3]) {
        for (_, force) in &self.forces {
            force.apply(particles, forces);
        }
    }
}
