//! Post-solve velocity passes: vorticity confinement and XSPH viscosity.

pub mod viscosity;
pub mod vorticity;

pub use viscosity::apply_xsph_viscosity;
pub use vorticity::apply_vorticity_confinement;
