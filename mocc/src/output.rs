//! Produced outputs: the final eigenvalue, the pin-homogenized group-major flux, and (optionally)
//! the homogenized cross sections, angular quadrature, and convergence history a solve used
//! (`spec.md` §6 "Produced outputs").
//!
//! HDF5 serialization of these is an out-of-scope external collaborator (`spec.md` §1); this
//! module only assembles the in-memory struct a serializer would consume.

use ndarray::Array2;

use crate::core_mesh::CoreMesh;
use crate::driver::{pin_average_flux, ConvergenceHistory};
use crate::quadrature::AngularQuadrature;
use crate::xs_mesh_homogenized::XSMeshHomogenized;

/// The final state of a converged (or iteration-capped) solve, in the shape an out-of-scope
/// output front end would serialize.
#[derive(Clone, Debug)]
pub struct SolverOutput {
    /// The multiplication eigenvalue. `1.0` for a fixed-source solve.
    pub k: f64,
    /// Pin-homogenized, group-major scalar flux: `(n_pin, n_group)`.
    pub pin_flux: Array2<f64>,
    /// The angular quadrature the solve used.
    pub quadrature: AngularQuadrature,
    /// Per-outer-iteration convergence diagnostics.
    pub history: ConvergenceHistory,
    /// The homogenized cross-section mesh the last CMFD acceleration used, if CMFD was enabled.
    pub homogenized_xs: Option<XSMeshHomogenized>,
}

impl SolverOutput {
    /// Builds a [`SolverOutput`] from a converged FSR-indexed flux, volume-averaging it onto each
    /// pin (`spec.md` §6 "pin-homogenized group-major flux").
    #[must_use]
    pub fn new(
        mesh: &CoreMesh,
        fsr_flux: &Array2<f64>,
        k: f64,
        quadrature: AngularQuadrature,
        history: ConvergenceHistory,
        homogenized_xs: Option<XSMeshHomogenized>,
    ) -> Self {
        let n_group = fsr_flux.ncols();
        let n_cell = mesh.mesh().n_pin();
        let mut pin_flux = Array2::<f64>::zeros((n_cell, n_group));
        pin_average_flux(mesh, fsr_flux, &mut pin_flux);
        Self {
            k,
            pin_flux,
            quadrature,
            history,
            homogenized_xs,
        }
    }
}
