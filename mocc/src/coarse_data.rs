//! Coarse-mesh data shared between a transport sweeper and the CMFD solver: surface currents and
//! fluxes, partial currents, and pin-average scalar flux (`spec.md` §3 "CoarseData";
//! `src/core/coarse_data.hpp`).
//!
//! A sweeper populates this after a sweep and flags which surfaces it actually touched via
//! [`CoarseData::set_has_radial_data`]/[`CoarseData::set_has_axial_data`], so that CMFD only
//! computes non-linear `D-hat` corrections where a sweeper has actually supplied currents (a 2D
//! MoC sweeper, for instance, never populates axial data).

use ndarray::Array2;

use crate::mesh::Mesh;

/// The partial-current convention used throughout: a surface's forward/backward partial currents
/// relate to its net current and scalar flux by `j_fw = phi/4 + J/2`, `j_bw = phi/4 - J/2`, the
/// standard diffusion-theory decomposition (`spec.md` Open Question: replicated as-is, this is
/// not a bug).
#[derive(Clone, Debug)]
pub struct CoarseData {
    n_cell: usize,
    n_surf: usize,
    n_group: usize,

    /// Net current through each coarse surface, per group.
    pub current: Array2<f64>,
    /// Scalar flux interpolated onto each coarse surface, per group.
    pub surface_flux: Array2<f64>,
    /// Forward (along the surface normal) partial current, per group.
    pub partial_current_fw: Array2<f64>,
    /// Backward (against the surface normal) partial current, per group.
    pub partial_current_bw: Array2<f64>,
    /// Forward partial current from the previous outer iteration.
    pub partial_current_fw_old: Array2<f64>,
    /// Backward partial current from the previous outer iteration.
    pub partial_current_bw_old: Array2<f64>,
    /// Pin-average scalar flux, per group.
    pub flux: Array2<f64>,
    /// Pin-average scalar flux from the previous outer iteration.
    pub old_flux: Array2<f64>,

    has_radial_data: bool,
    has_axial_data: bool,
    has_old_partial: bool,
}

impl CoarseData {
    /// Allocates zeroed storage for `n_cell` coarse cells, `n_surf` coarse surfaces, and
    /// `n_group` energy groups.
    #[must_use]
    pub fn new(n_cell: usize, n_surf: usize, n_group: usize) -> Self {
        Self {
            n_cell,
            n_surf,
            n_group,
            current: Array2::zeros((n_surf, n_group)),
            surface_flux: Array2::zeros((n_surf, n_group)),
            partial_current_fw: Array2::zeros((n_surf, n_group)),
            partial_current_bw: Array2::zeros((n_surf, n_group)),
            partial_current_fw_old: Array2::zeros((n_surf, n_group)),
            partial_current_bw_old: Array2::zeros((n_surf, n_group)),
            flux: Array2::zeros((n_cell, n_group)),
            old_flux: Array2::zeros((n_cell, n_group)),
            has_radial_data: false,
            has_axial_data: false,
            has_old_partial: false,
        }
    }

    /// Number of coarse cells.
    #[must_use]
    pub const fn n_cell(&self) -> usize {
        self.n_cell
    }

    /// Number of coarse surfaces.
    #[must_use]
    pub const fn n_surf(&self) -> usize {
        self.n_surf
    }

    /// Number of energy groups.
    #[must_use]
    pub const fn n_group(&self) -> usize {
        self.n_group
    }

    /// Flags whether radial (x/y-normal) surface data have been explicitly supplied by a sweeper.
    pub fn set_has_radial_data(&mut self, has: bool) {
        self.has_radial_data = has;
    }

    /// Flags whether axial (z-normal) surface data have been explicitly supplied by a sweeper.
    pub fn set_has_axial_data(&mut self, has: bool) {
        self.has_axial_data = has;
    }

    /// `true` if a sweeper has supplied radial current data this solve.
    #[must_use]
    pub const fn has_radial_data(&self) -> bool {
        self.has_radial_data
    }

    /// `true` if a sweeper has supplied axial current data this solve.
    #[must_use]
    pub const fn has_axial_data(&self) -> bool {
        self.has_axial_data
    }

    /// `true` once a previous outer iteration's partial currents are available.
    #[must_use]
    pub const fn has_old_partial(&self) -> bool {
        self.has_old_partial
    }

    /// Flags whether previous-iteration partial currents are available.
    pub fn set_has_old_partial(&mut self, has: bool) {
        self.has_old_partial = has;
    }

    /// Net current through `surf`'s coarse surface for `group`, from the currently-stored partial
    /// currents: `J = j_fw - j_bw`.
    #[must_use]
    pub fn current_from_partials(&self, surf: usize, group: usize) -> f64 {
        self.partial_current_fw[[surf, group]] - self.partial_current_bw[[surf, group]]
    }

    /// Surface scalar flux from the currently-stored partial currents: `phi = 2*(j_fw + j_bw)`.
    #[must_use]
    pub fn surface_flux_from_partials(&self, surf: usize, group: usize) -> f64 {
        2.0 * (self.partial_current_fw[[surf, group]] + self.partial_current_bw[[surf, group]])
    }

    /// Zeroes every surface and cell datum for `group`, over every surface orientation. Used
    /// before a 3D sweep recomputes coarse data from scratch.
    pub fn zero_data(&mut self, group: usize, zero_partial: bool) {
        for is in 0..self.n_surf {
            self.current[[is, group]] = 0.0;
            self.surface_flux[[is, group]] = 0.0;
            if zero_partial {
                self.partial_current_fw[[is, group]] = 0.0;
                self.partial_current_bw[[is, group]] = 0.0;
            }
        }
    }

    /// Zeroes only the radial (x/y-normal) surfaces for `group`, leaving axial surfaces
    /// untouched; the 2D-sweeper counterpart to [`CoarseData::zero_data`].
    pub fn zero_data_radial(&mut self, mesh: &Mesh, group: usize, zero_partial: bool) {
        for is in 0..self.n_surf {
            if mesh.surface_normal(is) == crate::quadrature::Normal::Z {
                continue;
            }
            self.current[[is, group]] = 0.0;
            self.surface_flux[[is, group]] = 0.0;
            if zero_partial {
                self.partial_current_fw[[is, group]] = 0.0;
                self.partial_current_bw[[is, group]] = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_currents_recover_net_current_and_surface_flux() {
        let mut data = CoarseData::new(4, 10, 2);
        data.partial_current_fw[[3, 0]] = 0.6;
        data.partial_current_bw[[3, 0]] = 0.25;
        assert!((data.current_from_partials(3, 0) - 0.35).abs() < 1e-12);
        assert!((data.surface_flux_from_partials(3, 0) - 1.7).abs() < 1e-12);
    }

    #[test]
    fn flags_start_false_and_are_settable() {
        let mut data = CoarseData::new(1, 1, 1);
        assert!(!data.has_radial_data());
        data.set_has_radial_data(true);
        assert!(data.has_radial_data());
        assert!(!data.has_old_partial());
        data.set_has_old_partial(true);
        assert!(data.has_old_partial());
    }
}
