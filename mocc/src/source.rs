//! One-group source assembly: multi-group fission, in-scattering from other groups, and
//! self-scatter (`spec.md` §3 "Source", §4.7, §9 "Source assembly state";
//! `src/mocc-core/source.{hpp,cpp}`).
//!
//! [`SourceBuilder`] enforces the assembly order the original always followed by hand
//! (`initialize_group`, then `fission`, then `in_scatter`, with an optional `scale`) at compile
//! time: each step consumes `self` and returns the builder in its next state, so calling them out
//! of order is a type error rather than a runtime assertion.

use std::f64::consts::PI;
use std::marker::PhantomData;

use ndarray::Array2;

use crate::xs_mesh::XSMesh;

/// Builder state: fission contribution not yet added.
pub struct NeedsFission;
/// Builder state: in-scatter contribution not yet added.
pub struct NeedsInScatter;
/// Builder state: source is fully assembled (fission + in-scatter), optionally scaled.
pub struct Ready;

/// Typestate builder for a single-group [`Source`]. See the module docs for the enforced order.
pub struct SourceBuilder<State> {
    values: Vec<f64>,
    group: usize,
    _state: PhantomData<State>,
}

impl SourceBuilder<NeedsFission> {
    /// Starts building the source for `group`, over `n_reg` flat source regions.
    #[must_use]
    pub fn initialize_group(n_reg: usize, group: usize) -> Self {
        Self {
            values: vec![0.0; n_reg],
            group,
            _state: PhantomData,
        }
    }

    /// Adds the group's share of the multi-group fission source: `chi[group] * fission_source`.
    #[must_use]
    pub fn fission(mut self, xs_mesh: &XSMesh, fission_source: &[f64]) -> SourceBuilder<NeedsInScatter> {
        for xsr in xs_mesh.iter() {
            let chi = xsr.xsmacch(self.group);
            for &ireg in xsr.reg() {
                self.values[ireg] += chi * fission_source[ireg];
            }
        }
        SourceBuilder {
            values: self.values,
            group: self.group,
            _state: PhantomData,
        }
    }
}

impl SourceBuilder<NeedsInScatter> {
    /// Adds the contribution from in-scattering out of every other group. `flux` is the full
    /// multi-group flux, shape `(n_group, n_reg)`. Self-scatter is deliberately excluded here; it
    /// is handled separately by [`self_scatter`], since it must be recomputed every inner
    /// iteration without re-walking the rest of the source.
    #[must_use]
    pub fn in_scatter(mut self, xs_mesh: &XSMesh, flux: &Array2<f64>) -> SourceBuilder<Ready> {
        for xsr in xs_mesh.iter() {
            let row = xsr.xsmacsc().to(self.group);
            for (from_g, sc) in row.iter() {
                if from_g == self.group {
                    continue;
                }
                for &ireg in xsr.reg() {
                    self.values[ireg] += sc * flux[[from_g, ireg]];
                }
            }
        }
        SourceBuilder {
            values: self.values,
            group: self.group,
            _state: PhantomData,
        }
    }
}

impl SourceBuilder<Ready> {
    /// Scales every region's source by a per-region factor (e.g. coarse-cell volume, for a CMFD
    /// right-hand side).
    #[must_use]
    pub fn scale(mut self, factor: &[f64]) -> Self {
        for (v, &f) in self.values.iter_mut().zip(factor) {
            *v *= f;
        }
        self
    }

    /// Finishes assembly.
    #[must_use]
    pub fn build(self) -> Source {
        Source {
            values: self.values,
            group: self.group,
        }
    }
}

/// A fully- (or partially-) assembled single-group source, excluding self-scatter.
#[derive(Clone, Debug)]
pub struct Source {
    values: Vec<f64>,
    group: usize,
}

impl Source {
    /// The group this source was assembled for.
    #[must_use]
    pub const fn group(&self) -> usize {
        self.group
    }

    /// Number of flat source regions.
    #[must_use]
    pub fn n_reg(&self) -> usize {
        self.values.len()
    }

    /// The source value for region `ireg`, excluding self-scatter.
    #[must_use]
    pub fn get(&self, ireg: usize) -> f64 {
        self.values[ireg]
    }

    /// All region values, excluding self-scatter.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Adds the current group's self-scatter contribution to `source`, normalizes by `4*pi*xstr`, and
/// writes the result into the caller-owned `qbar` buffer.
///
/// Takes `&Source` rather than consuming it because a sweeper calls this once per inner iteration
/// with the updated single-group flux, without re-deriving the rest of the source each time
/// (`src/mocc-core/source.cpp::Source::self_scatter`).
pub fn self_scatter(source: &Source, xs_mesh: &XSMesh, flux_1g: &[f64], qbar: &mut [f64]) {
    let group = source.group();
    for xsr in xs_mesh.iter() {
        let xssc = xsr.xsmacsc().self_scat(group);
        let xstr = xsr.xsmactr(group);
        let r_fpi_tr = 1.0 / (xstr * 4.0 * PI);
        for &ireg in xsr.reg() {
            qbar[ireg] = (source.get(ireg) + flux_1g[ireg] * xssc) * r_fpi_tr;
        }
    }
}

/// Clamps negative entries of `qbar` to zero, logging a warning the first time it fires. Used
/// when a sweeper is configured to tolerate (rather than reject) a negative source, which can
/// arise transiently from a negative axial transverse-leakage term.
pub fn fixup_negative_source(qbar: &mut [f64]) -> bool {
    let mut fixed = false;
    for v in qbar.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
            fixed = true;
        }
    }
    if fixed {
        crate::warn::push("negative source clamped to zero in at least one FSR");
    }
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Material, MaterialLib};
    use crate::scattering_matrix::ScatteringMatrix;

    fn two_group_xs_mesh() -> XSMesh {
        let mut mat_lib = MaterialLib::new();
        let scat = ScatteringMatrix::from_dense(&[vec![0.3, 0.1], vec![0.0, 0.5]]).unwrap();
        let mat = Material::new(vec![0.2, 0.3], vec![0.1, 0.2], vec![0.15, 0.3], vec![1.0, 0.0], scat).unwrap();
        mat_lib.add("fuel", mat).unwrap();
        mat_lib.assign_id(1, "fuel").unwrap();
        XSMesh::new(&[1, 1], &mat_lib, vec![1.0, 0.0]).unwrap()
    }

    #[test]
    fn fission_contributes_chi_weighted_source() {
        let xs_mesh = two_group_xs_mesh();
        let fission_source = vec![2.0, 3.0];
        let builder = SourceBuilder::initialize_group(2, 0)
            .fission(&xs_mesh, &fission_source)
            .in_scatter(&xs_mesh, &Array2::zeros((2, 2)));
        let source = builder.build();
        // group 0 has chi = 1.0
        assert!((source.get(0) - 2.0).abs() < 1e-12);
        assert!((source.get(1) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn in_scatter_excludes_self_scatter() {
        let xs_mesh = two_group_xs_mesh();
        let mut flux = Array2::zeros((2, 2));
        flux[[0, 0]] = 5.0;
        flux[[0, 1]] = 5.0;
        let source = SourceBuilder::initialize_group(2, 1)
            .fission(&xs_mesh, &[0.0, 0.0])
            .in_scatter(&xs_mesh, &flux)
            .build();
        // group 1 in-scatter comes only from group 0, scattering xs 0.1
        assert!((source.get(0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn self_scatter_adds_to_source_and_normalizes() {
        let xs_mesh = two_group_xs_mesh();
        let source = SourceBuilder::initialize_group(2, 0)
            .fission(&xs_mesh, &[1.0, 1.0])
            .in_scatter(&xs_mesh, &Array2::zeros((2, 2)))
            .build();
        let flux_1g = vec![2.0, 2.0];
        let mut qbar = vec![0.0; 2];
        self_scatter(&source, &xs_mesh, &flux_1g, &mut qbar);
        let xstr = xs_mesh.region(0).xsmactr(0);
        let expected = (1.0 + 2.0 * 0.3) / (xstr * 4.0 * PI);
        assert!((qbar[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn fixup_clamps_negative_values() {
        let mut qbar = vec![1.0, -0.5, 2.0];
        assert!(fixup_negative_source(&mut qbar));
        assert_eq!(qbar, vec![1.0, 0.0, 2.0]);
        assert!(!fixup_negative_source(&mut qbar));
    }
}
