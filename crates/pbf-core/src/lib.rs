//! Position Based Fluids (Macklin & Muller 2013) on the CPU.
//!
//! [`FluidSystem`] owns a [`ParticleSet`] and advances it one fixed pipeline
//! per call: predict under gravity and external forces, rebuild neighbor sets,
//! project the density constraint for a fixed number of Jacobi iterations,
//! reconstruct velocities, then optional vorticity confinement and XSPH
//! viscosity.

pub mod boundary;
pub mod config;
pub mod constraints;
pub mod error;
pub mod fluids;
pub mod forces;
pub mod grid;
pub mod kernels;
pub mod neighbors;
pub mod particle;
pub mod system;
pub mod velocity;

pub use config::SolverConfig;
pub use error::{ConfigError, StepError};
pub use particle::{ParticleHandle, ParticleSet};
pub use system::{FluidSystem, RenderParticle, SharedFluidSystem, StepStats};
