use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;

use crate::boundary::Aabb;
use crate::config::SolverConfig;
use crate::constraints::density::{solve_density_constraints, DensityParams};
use crate::error::{ConfigError, StepError};
use crate::fluids::{apply_vorticity_confinement, apply_xsph_viscosity};
use crate::forces::{Force, ForceId, ForceRegistry};
use crate::neighbors::NeighborList;
use crate::particle::{ParticleHandle, ParticleSet};
use crate::velocity::reconstruct_velocities;

/// Largest lattice a single [`FluidSystem::fill_box`] call will create.
pub const MAX_FILL_PARTICLES: usize = 1 << 22;

/// Phases of one `advance` call, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepPhase {
    Predict,
    FindNeighbors,
    SolveConstraints,
    ReconstructVelocity,
    Confine,
    Smooth,
    Commit,
}

/// Summary of a completed step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    /// Simulation time after the step.
    pub time: f32,
    /// Neighbor pairs found this step, self pairs included.
    pub neighbor_pairs: usize,
    /// Largest `|rho / rho0 - 1|` seen in the last solver iteration.
    pub max_density_error: f32,
}

/// What a renderer needs to draw one particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParticle {
    pub position: Vec3,
    pub highlight: bool,
}

/// Position Based Fluids solver owning its particles and external forces.
pub struct FluidSystem {
    particles: ParticleSet,
    config: SolverConfig,
    density: DensityParams,
    forces: ForceRegistry,
    neighbors: NeighborList,
    bounds: Aabb,
    /// Reused buffer for the XSPH velocity snapshot.
    velocity_scratch: Vec<Vec3>,
    /// Per-step force accumulator handed to registered forces.
    force_scratch: Vec<Vec3>,
}

impl FluidSystem {
    pub fn new(config: SolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "fluid system: h = {}, rho0 = {}, {} iterations, {:?} neighbor search",
            config.kernel_radius,
            config.rest_density,
            config.solver_iterations,
            config.neighbor_search,
        );
        Ok(Self {
            particles: ParticleSet::new(),
            density: DensityParams::from_config(&config),
            config,
            forces: ForceRegistry::new(),
            neighbors: NeighborList::new(),
            bounds: Aabb::UNIT,
            velocity_scratch: Vec::new(),
            force_scratch: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[inline]
    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    #[inline]
    pub fn neighbors(&self) -> &NeighborList {
        &self.neighbors
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.particles.time
    }

    #[inline]
    pub fn particle_count(&self) -> usize {
        self.particles.count
    }

    /// Append a particle at rest at its material position.
    pub fn create_particle(&mut self, material_position: Vec3) -> ParticleHandle {
        self.particles.push(material_position, self.config.particle_mass)
    }

    /// Fill the box `[min, max]` with particles on a regular lattice.
    /// Returns the number of particles created. Non-finite input, a
    /// non-positive spacing, an inverted box or a lattice larger than
    /// [`MAX_FILL_PARTICLES`] creates nothing.
    pub fn fill_box(&mut self, min: Vec3, max: Vec3, spacing: f32) -> usize {
        let valid = spacing.is_finite() && spacing > 0.0 && min.is_finite() && max.is_finite();
        if !valid || !min.cmple(max).all() {
            log::warn!("fill_box ignored: min = {min}, max = {max}, spacing = {spacing}");
            return 0;
        }
        // Tolerance so that an extent of exactly k * spacing yields k + 1 layers.
        let cells = ((max - min) / spacing + Vec3::splat(1e-4)).floor();
        let layers = |c: f32| (c as usize).checked_add(1);
        let lattice = layers(cells.x)
            .zip(layers(cells.y))
            .zip(layers(cells.z))
            .and_then(|((nx, ny), nz)| Some((nx, ny, nz, nx.checked_mul(ny)?.checked_mul(nz)?)));
        let (nx, ny, nz) = match lattice {
            Some((nx, ny, nz, total)) if total <= MAX_FILL_PARTICLES => (nx, ny, nz),
            _ => {
                log::warn!("fill_box ignored: spacing {spacing} gives more than {MAX_FILL_PARTICLES} particles");
                return 0;
            }
        };

        for iy in 0..ny {
            for iz in 0..nz {
                for ix in 0..nx {
                    let offset = Vec3::new(ix as f32, iy as f32, iz as f32) * spacing;
                    self.create_particle(min + offset);
                }
            }
        }
        log::debug!("fill_box created {}x{}x{} particles", nx, ny, nz);
        nx * ny * nz
    }

    /// Nearest particle by *current* position.
    pub fn nearest_particle(&self, query: Vec3) -> Option<ParticleHandle> {
        self.particles.nearest(query)
    }

    pub fn set_highlight(&mut self, handle: ParticleHandle, highlight: bool) {
        if self.particles.contains(handle) {
            self.particles.highlight[handle.index()] = highlight;
        }
    }

    pub fn register_force(&mut self, force: Box<dyn Force>) -> ForceId {
        self.forces.register(force)
    }

    pub fn unregister_force(&mut self, id: ForceId) -> Option<Box<dyn Force>> {
        self.forces.unregister(id)
    }

    /// Back to material positions at rest, highlights cleared, time zero.
    pub fn reset(&mut self) {
        self.particles.reset();
        log::debug!("reset {} particles", self.particles.count);
    }

    pub fn render_particles(&self) -> Vec<RenderParticle> {
        self.particles
            .position
            .iter()
            .zip(&self.particles.highlight)
            .map(|(&position, &highlight)| RenderParticle { position, highlight })
            .collect()
    }

    /// Run one full PBF step.
    ///
    /// The step always runs to completion. If it leaves any particle with a
    /// non-finite position or velocity, the state is still committed and
    /// [`StepError::NonFiniteState`] is returned.
    pub fn advance(&mut self, dt: f32) -> Result<StepStats, StepError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(StepError::InvalidTimestep(dt));
        }

        let h = self.config.kernel_radius;

        log::trace!("{:?}", StepPhase::Predict);
        self.predict(dt);

        log::trace!("{:?}", StepPhase::FindNeighbors);
        self.neighbors.rebuild(
            &self.particles.predicted,
            self.config.neighbor_radius(),
            self.config.neighbor_search,
        );

        log::trace!("{:?}", StepPhase::SolveConstraints);
        solve_density_constraints(
            &mut self.particles,
            &self.neighbors,
            &self.density,
            self.config.solver_iterations,
            &self.bounds,
        );

        log::trace!("{:?}", StepPhase::ReconstructVelocity);
        reconstruct_velocities(
            &mut self.particles,
            dt,
            self.config.velocity_damping,
            self.config.velocity_update,
        );

        if self.config.vorticity.enabled {
            log::trace!("{:?}", StepPhase::Confine);
            apply_vorticity_confinement(
                &mut self.particles,
                &self.neighbors,
                self.config.vorticity.epsilon,
                h,
                dt,
            );
        }

        if self.config.viscosity.enabled {
            log::trace!("{:?}", StepPhase::Smooth);
            apply_xsph_viscosity(
                &mut self.particles,
                &self.neighbors,
                &mut self.velocity_scratch,
                self.config.viscosity.coefficient,
                h,
            );
        }

        log::trace!("{:?}", StepPhase::Commit);
        self.particles.position.copy_from_slice(&self.particles.predicted);
        self.particles.time += dt;

        let stats = StepStats {
            time: self.particles.time,
            neighbor_pairs: self.neighbors.pair_count(),
            max_density_error: self
                .particles
                .constraint
                .iter()
                .fold(0.0_f32, |acc, c| acc.max(c.abs())),
        };
        log::debug!(
            "t = {:.4}: {} particles, {} neighbor pairs, max density error {:.4}",
            stats.time,
            self.particles.count,
            stats.neighbor_pairs,
            stats.max_density_error,
        );

        if let Some(particle) = self.particles.first_non_finite() {
            log::error!(
                "particle {} became non-finite at t = {}: x = {}, v = {}",
                particle,
                stats.time,
                self.particles.position[particle],
                self.particles.velocity[particle],
            );
            return Err(StepError::NonFiniteState {
                particle,
                time: stats.time,
            });
        }

        Ok(stats)
    }

    /// Gravity plus registered forces, symplectic Euler velocity update, then
    /// position prediction.
    fn predict(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        // Registered forces see last step's force column untouched.
        self.force_scratch.clear();
        self.force_scratch
            .extend(self.particles.mass.iter().map(|&m| gravity * m));
        self.forces.accumulate(&self.particles, &mut self.force_scratch);
        self.particles.force.copy_from_slice(&self.force_scratch);

        let p = &mut self.particles;
        for i in 0..p.count {
            p.velocity[i] += p.force[i] / p.mass[i] * dt;
            p.predicted[i] = p.position[i] + p.velocity[i] * dt;
        }
    }
}

/// Thread-shareable handle to a [`FluidSystem`].
///
/// Every operation holds one lock over the whole system for its full
/// duration, so readers never observe a partially advanced step.
#[derive(Clone)]
pub struct SharedFluidSystem {
    inner: Arc<Mutex<FluidSystem>>,
}

impl SharedFluidSystem {
    pub fn new(system: FluidSystem) -> Self {
        Self {
            inner: Arc::new(Mutex::new(system)),
        }
    }

    pub fn advance(&self, dt: f32) -> Result<StepStats, StepError> {
        self.inner.lock().advance(dt)
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn create_particle(&self, material_position: Vec3) -> ParticleHandle {
        self.inner.lock().create_particle(material_position)
    }

    pub fn nearest_particle(&self, query: Vec3) -> Option<ParticleHandle> {
        self.inner.lock().nearest_particle(query)
    }

    pub fn set_highlight(&self, handle: ParticleHandle, highlight: bool) {
        self.inner.lock().set_highlight(handle, highlight);
    }

    pub fn register_force(&self, force: Box<dyn Force>) -> ForceId {
        self.inner.lock().register_force(force)
    }

    pub fn unregister_force(&self, id: ForceId) -> Option<Box<dyn Force>> {
        self.inner.lock().unregister_force(id)
    }

    /// Consistent copy of everything a renderer reads.
    pub fn snapshot(&self) -> Vec<RenderParticle> {
        self.inner.lock().render_particles()
    }

    /// Run `f` with exclusive access to the system.
    pub fn with<R>(&self, f: impl FnOnce(&mut FluidSystem) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
