use std::path::Path;

use glam::Vec3;
use serde::Deserialize;

use crate::error::ConfigError;

/// Strategy used to rebuild neighbor sets at the start of each step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborSearch {
    /// All-pairs scan. O(N^2), the reference behavior.
    BruteForce,
    /// Spatial hash grid with cell size 2h. Produces identical neighbor sets.
    HashGrid,
}

/// How the post-solve velocity is derived from the step's position delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityUpdate {
    /// `v = (v + dx / dt) * damping`. The gravity-integrated velocity is kept
    /// and the position delta is added on top.
    Accumulate,
    /// `v = (dx / dt) * damping`, the textbook PBF update.
    Replace,
}

/// Tensile instability correction (`s_corr`).
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArtificialPressure {
    pub enabled: bool,
    pub k: f32,
    pub n: i32,
    /// Reference distance `deltaQ` as a fraction of the kernel radius.
    pub delta_q_factor: f32,
}

impl Default for ArtificialPressure {
    fn default() -> Self {
        Self {
            enabled: true,
            k: 0.0001,
            n: 4,
            delta_q_factor: 0.3,
        }
    }
}

/// XSPH viscosity.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Viscosity {
    pub enabled: bool,
    pub coefficient: f32,
}

impl Default for Viscosity {
    fn default() -> Self {
        Self {
            enabled: true,
            coefficient: 0.00001,
        }
    }
}

/// Vorticity confinement.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Vorticity {
    pub enabled: bool,
    pub epsilon: f32,
}

impl Default for Vorticity {
    fn default() -> Self {
        Self {
            enabled: true,
            epsilon: 0.0005,
        }
    }
}

/// Process-wide solver parameters. Immutable for the lifetime of a
/// [`FluidSystem`](crate::system::FluidSystem).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub particle_mass: f32,
    pub gravity: Vec3,
    /// Target density `rho0`.
    pub rest_density: f32,
    /// CFM relaxation added to the lambda denominator.
    pub relaxation_epsilon: f32,
    /// Kernel support radius `h`.
    pub kernel_radius: f32,
    /// Fixed number of Jacobi iterations per step.
    pub solver_iterations: u32,
    pub artificial_pressure: ArtificialPressure,
    pub viscosity: Viscosity,
    /// Global velocity scale applied after reconstruction (1 = no effect).
    pub velocity_damping: f32,
    pub velocity_update: VelocityUpdate,
    pub vorticity: Vorticity,
    pub neighbor_search: NeighborSearch,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            particle_mass: 1.0,
            gravity: Vec3::new(0.0, -10.0, 0.0),
            rest_density: 6378.0,
            relaxation_epsilon: 600.0,
            kernel_radius: 0.1,
            solver_iterations: 10,
            artificial_pressure: ArtificialPressure::default(),
            viscosity: Viscosity::default(),
            velocity_damping: 0.49,
            velocity_update: VelocityUpdate::Accumulate,
            vorticity: Vorticity::default(),
            neighbor_search: NeighborSearch::BruteForce,
        }
    }
}

impl SolverConfig {
    /// Parse a TOML document and validate it. Missing keys take their
    /// default values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        log::info!("loaded solver config from {}", path.display());
        Ok(config)
    }

    /// Absolute artificial-pressure reference distance.
    #[inline]
    pub fn delta_q(&self) -> f32 {
        self.artificial_pressure.delta_q_factor * self.kernel_radius
    }

    /// Radius used by the neighbor search. Twice the kernel support, so that
    /// neighbor sets stay valid while predicted positions move during the
    /// solver iterations.
    #[inline]
    pub fn neighbor_radius(&self) -> f32 {
        2.0 * self.kernel_radius
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("particle_mass", self.particle_mass)?;
        positive("rest_density", self.rest_density)?;
        positive("relaxation_epsilon", self.relaxation_epsilon)?;
        positive("kernel_radius", self.kernel_radius)?;

        if !self.gravity.is_finite() {
            return Err(invalid("gravity", format!("must be finite, got {}", self.gravity)));
        }
        if self.solver_iterations == 0 {
            return Err(invalid("solver_iterations", "must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.velocity_damping) {
            return Err(invalid(
                "velocity_damping",
                format!("must lie in [0, 1], got {}", self.velocity_damping),
            ));
        }

        let ap = &self.artificial_pressure;
        positive("artificial_pressure.delta_q_factor", ap.delta_q_factor)?;
        // poly6(deltaQ) is the s_corr denominator and vanishes at deltaQ = h.
        if ap.delta_q_factor > 1.0 || (ap.enabled && ap.delta_q_factor >= 1.0) {
            return Err(invalid(
                "artificial_pressure.delta_q_factor",
                format!(
                    "deltaQ = {} exceeds the kernel radius {}",
                    self.delta_q(),
                    self.kernel_radius
                ),
            ));
        }
        if !(ap.k.is_finite() && ap.k >= 0.0) {
            return Err(invalid(
                "artificial_pressure.k",
                format!("must be finite and non-negative, got {}", ap.k),
            ));
        }
        // W(r) is zero for neighbors past h; a non-positive power of it blows up.
        if ap.n < 1 {
            return Err(invalid("artificial_pressure.n", format!("must be at least 1, got {}", ap.n)));
        }

        if !self.viscosity.coefficient.is_finite() {
            return Err(invalid(
                "viscosity.coefficient",
                format!("must be finite, got {}", self.viscosity.coefficient),
            ));
        }
        if !self.vorticity.epsilon.is_finite() {
            return Err(invalid(
                "vorticity.epsilon",
                format!("must be finite, got {}", self.vorticity.epsilon),
            ));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and > 0, got {value}")))
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
