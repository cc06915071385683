//! Coarse-mesh finite-difference acceleration: non-linear diffusion coefficients derived from
//! transport currents, a per-group 7-point-stencil sparse linear solve, and the power-iteration
//! eigenvalue update that drives the outer loop (`spec.md` §4.10 "CMFD"; `src/core/cmfd.{hpp,cpp}`).
//!
//! The non-linear correction `D-hat` is recomputed every outer iteration from whatever partial
//! currents the transport sweeper last tallied into a [`CoarseData`]; the finite-difference term
//! `D-tilde` only depends on the (fixed) coarse-mesh geometry and the current one-group diffusion
//! coefficients, so it is rebuilt every outer iteration too, but does not depend on the sweeper.

use ndarray::Array2;

use crate::coarse_data::CoarseData;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::quadrature::{Boundary, Surface};
use crate::xs_mesh_homogenized::XSMeshHomogenized;

/// Maximum BiCGSTAB iterations before a per-group solve is declared non-convergent.
pub const MAX_BICGSTAB_ITERS: usize = 1500;

/// One row of the 7-point-stencil sparse matrix a CMFD group solve assembles: a diagonal term and
/// up to six off-diagonal (neighbor cell, coefficient) pairs, one per coarse-surface direction.
/// Compressed the same way [`crate::scattering_matrix::ScatteringRow`] compresses a scattering
/// row, since a coarse cell only ever couples to its six face-neighbors.
#[derive(Clone, Debug, Default)]
struct StencilRow {
    diag: f64,
    off: arrayvec::ArrayVec<(usize, f64), 6>,
}

impl StencilRow {
    fn add_off(&mut self, col: usize, coeff: f64) {
        if let Some(entry) = self.off.iter_mut().find(|(c, _)| *c == col) {
            entry.1 += coeff;
        } else {
            self.off.push((col, coeff));
        }
    }
}

/// A sparse, row-compressed matrix for one group's CMFD linear system.
#[derive(Clone, Debug)]
struct StencilMatrix {
    rows: Vec<StencilRow>,
}

impl StencilMatrix {
    fn zeros(n: usize) -> Self {
        Self {
            rows: vec![StencilRow::default(); n],
        }
    }

    fn n(&self) -> usize {
        self.rows.len()
    }

    /// `y = A * x`.
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        for (row, yi) in self.rows.iter().zip(y.iter_mut()) {
            let mut acc = 0.0;
            for &(col, coeff) in &row.off {
                acc += coeff * x[col];
            }
            *yi = acc;
        }
        for (i, row) in self.rows.iter().enumerate() {
            y[i] += row.diag * x[i];
        }
    }
}

/// Unpreconditioned BiCGSTAB, used because no sparse-solver crate is part of the dependency stack
/// and the 7-point stencil here is always diagonally dominant enough to converge without one.
/// Returns the solution and the number of iterations used; a return of `MAX_BICGSTAB_ITERS`
/// without reaching `tol` is not itself an error (the caller decides whether to warn or fail).
fn bicgstab(a: &StencilMatrix, b: &[f64], x0: &[f64], tol: f64) -> (Vec<f64>, usize) {
    let n = a.n();
    let mut x = x0.to_vec();
    let mut r = vec![0.0; n];
    a.matvec(&x, &mut r);
    for i in 0..n {
        r[i] = b[i] - r[i];
    }
    let r_hat = r.clone();
    let b_norm = dot(b, b).sqrt().max(1e-300);

    let mut rho = 1.0;
    let mut alpha = 1.0;
    let mut omega = 1.0;
    let mut v = vec![0.0; n];
    let mut p = vec![0.0; n];

    for iter in 0..MAX_BICGSTAB_ITERS {
        let res_norm = dot(&r, &r).sqrt() / b_norm;
        if res_norm < tol {
            return (x, iter);
        }

        let rho_new = dot(&r_hat, &r);
        if rho_new.abs() < 1e-300 || omega.abs() < 1e-300 {
            // breakdown; restart with the residual as the new search direction
            p = r.clone();
        } else {
            let beta = (rho_new / rho) * (alpha / omega);
            for i in 0..n {
                p[i] = r[i] + beta * (p[i] - omega * v[i]);
            }
        }
        rho = rho_new;
        a.matvec(&p, &mut v);
        alpha = safe_div(rho, dot(&r_hat, &v));

        let mut s = vec![0.0; n];
        for i in 0..n {
            s[i] = r[i] - alpha * v[i];
        }

        let mut t = vec![0.0; n];
        a.matvec(&s, &mut t);
        let tt = dot(&t, &t);
        omega = if tt.abs() < 1e-300 { 0.0 } else { dot(&t, &s) / tt };

        for i in 0..n {
            x[i] += alpha * p[i] + omega * s[i];
        }
        for i in 0..n {
            r[i] = s[i] - omega * t[i];
        }
    }

    (x, MAX_BICGSTAB_ITERS)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn safe_div(num: f64, denom: f64) -> f64 {
    if denom.abs() < 1e-300 {
        0.0
    } else {
        num / denom
    }
}

/// Surface finite-difference diffusion coefficient, the harmonic mean of the two cells' one-group
/// diffusion coefficients weighted by their widths normal to the surface.
fn surface_dtilde(d_l: f64, d_r: f64, h_l: f64, h_r: f64) -> f64 {
    2.0 * d_l * d_r / (d_l * h_r + d_r * h_l)
}

/// Boundary finite-difference diffusion coefficient for a domain-edge surface with no
/// face-neighbor, from the asymptotic (Marshak-like) diffusion boundary condition. Reflective
/// boundaries carry zero net current by construction, so `D-tilde` is zero there, replicated
/// as-is from the original rather than substituted with a ghost-cell scheme (see `DESIGN.md`).
fn boundary_dtilde(bc: Boundary, d: f64, h: f64) -> f64 {
    match bc {
        Boundary::Reflect | Boundary::Periodic => 0.0,
        Boundary::Vacuum | Boundary::Prescribed => 2.0 * d / (4.0 * d + h),
    }
}

/// Non-linear correction `D-hat` for one coarse surface: chosen so that the finite-difference
/// current plus the correction reproduces the transport-tallied net current exactly,
/// `D-hat = (J_transport - D-tilde * (phi_r - phi_l)) / (phi_l + phi_r)`.
fn surface_dhat(dtilde: f64, j_transport: f64, phi_l: f64, phi_r: f64) -> f64 {
    let denom = phi_l + phi_r;
    if denom.abs() < 1e-300 {
        return 0.0;
    }
    (j_transport - dtilde * (phi_r - phi_l)) / denom
}

/// One-group diffusion coefficient, `D = 1 / (3 * xstr)`.
fn diffusion_coeff(xstr: f64) -> f64 {
    1.0 / (3.0 * xstr)
}

/// Builds and solves the per-group CMFD linear systems for one outer iteration, then recombines
/// the per-group solutions into an updated fission source and eigenvalue via power iteration.
/// `coarse` supplies the transport-tallied partial currents (read) and receives the updated
/// pin-average flux (written) and forward/backward partials reset to match the new `D-hat`
/// (written) for the next sweep's boundary conditions. Returns the updated `k`.
pub fn accelerate(
    mesh: &Mesh,
    xs: &XSMeshHomogenized,
    coarse: &mut CoarseData,
    k: f64,
    tol: f64,
) -> Result<f64> {
    let n_cell = mesh.n_pin();
    let n_group = xs.n_group();

    if coarse.n_cell() != n_cell || coarse.n_group() != n_group {
        return Err(Error::Configuration(
            "CMFD coarse data shape does not match mesh/cross-section group structure".into(),
        ));
    }

    let mut d = vec![vec![0.0_f64; n_cell]; n_group];
    for g in 0..n_group {
        for cell in 0..n_cell {
            d[g][cell] = diffusion_coeff(xs.region(cell).xsmactr(g));
        }
    }

    let mut matrices = Vec::with_capacity(n_group);
    for g in 0..n_group {
        matrices.push(build_group_matrix(mesh, xs, coarse, &d[g], g)?);
    }

    let mut new_flux = coarse.flux.clone();
    let mut fission_source = vec![0.0_f64; n_cell];
    let mut new_fission_source = vec![0.0_f64; n_cell];
    for cell in 0..n_cell {
        for g in 0..n_group {
            let xsr = xs.region(cell);
            fission_source[cell] += xsr.xsmacnf(g) * coarse.flux[[cell, g]];
        }
    }

    for g in 0..n_group {
        let rhs = build_group_rhs(mesh, xs, &fission_source, &new_flux, k, g);
        let x0: Vec<f64> = (0..n_cell).map(|cell| new_flux[[cell, g]]).collect();
        let (solved, iters) = bicgstab(&matrices[g], &rhs, &x0, tol);
        if iters >= MAX_BICGSTAB_ITERS {
            crate::warn::push(format!("CMFD group {g} linear solve did not converge in {MAX_BICGSTAB_ITERS} iterations"));
        }
        for (cell, &v) in solved.iter().enumerate() {
            new_flux[[cell, g]] = v.max(0.0);
        }
    }

    for cell in 0..n_cell {
        new_fission_source[cell] = 0.0;
        for g in 0..n_group {
            let xsr = xs.region(cell);
            new_fission_source[cell] += xsr.xsmacnf(g) * new_flux[[cell, g]];
        }
    }

    let old_total: f64 = fission_source.iter().sum();
    let new_total: f64 = new_fission_source.iter().sum();
    let new_k = if old_total.abs() < 1e-300 {
        k
    } else {
        k * new_total / old_total
    };

    coarse.old_flux = coarse.flux.clone();
    coarse.flux = new_flux;
    Ok(new_k)
}

fn build_group_matrix(
    mesh: &Mesh,
    xs: &XSMeshHomogenized,
    coarse: &CoarseData,
    d: &[f64],
    group: usize,
) -> Result<StencilMatrix> {
    let n_cell = mesh.n_pin();
    let mut matrix = StencilMatrix::zeros(n_cell);

    for cell in 0..n_cell {
        let xsr = xs.region(cell);
        let vol = mesh.coarse_volume(cell);
        matrix.rows[cell].diag += xsr.xsmacrm(group) * vol;

        for &surf in &[
            Surface::East,
            Surface::North,
            Surface::Top,
            Surface::West,
            Surface::South,
            Surface::Bottom,
        ] {
            let global_surf = mesh.coarse_surf(cell, surf);
            let (left, right) = mesh.coarse_neigh_cells(global_surf);
            let area = mesh.coarse_area(cell, surf);

            let (this_cell, other_cell) = match (left, right) {
                (Some(l), Some(r)) if l == cell => (l, Some(r)),
                // an interior face where `cell` is the "hi" side is handled once already, when
                // its lower-index neighbor visits this same surface as its East/North/Top face.
                (Some(_), Some(r)) if r == cell => continue,
                (Some(l), None) if l == cell => (l, None),
                (None, Some(r)) if r == cell => (r, None),
                _ => continue,
            };
            debug_assert_eq!(this_cell, cell);

            let h_this = half_width(mesh, cell, surf);
            let dtilde;
            let dhat;
            if let Some(other) = other_cell {
                let h_other = half_width(mesh, other, surf);
                dtilde = surface_dtilde(d[cell], d[other], h_this, h_other);
                let j = coarse.current_from_partials(global_surf, group);
                let phi_l = coarse.flux[[cell.min(other), group]];
                let phi_r = coarse.flux[[cell.max(other), group]];
                let raw = surface_dhat(dtilde, j, phi_l, phi_r);
                dhat = if cell < other { raw } else { -raw };

                matrix.rows[cell].diag += (dtilde + dhat.abs()) * area;
                matrix.rows[cell].add_off(other, -(dtilde - dhat) * area);
            } else {
                let bc = mesh.boundary_condition(surf);
                dtilde = boundary_dtilde(bc, d[cell], h_this);
                matrix.rows[cell].diag += dtilde * area;
            }
        }
    }

    Ok(matrix)
}

fn build_group_rhs(
    mesh: &Mesh,
    xs: &XSMeshHomogenized,
    fission_source: &[f64],
    flux: &Array2<f64>,
    k: f64,
    group: usize,
) -> Vec<f64> {
    let n_cell = mesh.n_pin();
    let mut rhs = vec![0.0; n_cell];
    for cell in 0..n_cell {
        let xsr = xs.region(cell);
        let vol = mesh.coarse_volume(cell);
        let chi = xsr.xsmacch(group);
        let mut inscatter = 0.0;
        for (from_g, sc) in xsr.xsmacsc().to(group).iter() {
            if from_g != group {
                inscatter += sc * flux[[cell, from_g]];
            }
        }
        rhs[cell] = (chi * fission_source[cell] / k + inscatter) * vol;
    }
    rhs
}

/// Half the coarse-cell width normal to `surf`, used as the one-sided distance in the
/// finite-difference diffusion coefficient.
fn half_width(mesh: &Mesh, cell: usize, surf: Surface) -> f64 {
    let pos = mesh.coarse_position(cell);
    match surf {
        Surface::East | Surface::West => 0.5 * mesh.dx(pos.x),
        Surface::North | Surface::South => 0.5 * mesh.dy(pos.y),
        Surface::Top | Surface::Bottom => 0.5 * mesh.dz(pos.z),
        Surface::Internal | Surface::Invalid => unreachable!("not a physical face"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_dtilde_matches_equal_cell_harmonic_mean() {
        let dt = surface_dtilde(1.0, 1.0, 1.0, 1.0);
        assert!((dt - 1.0).abs() < 1e-12);
    }

    #[test]
    fn boundary_dtilde_is_zero_for_reflective() {
        assert_eq!(boundary_dtilde(Boundary::Reflect, 0.5, 1.0), 0.0);
        assert!(boundary_dtilde(Boundary::Vacuum, 0.5, 1.0) > 0.0);
    }

    #[test]
    fn surface_dhat_reproduces_transport_current() {
        let dtilde = 0.8;
        let phi_l = 2.0;
        let phi_r = 1.0;
        let j = -0.3;
        let dhat = surface_dhat(dtilde, j, phi_l, phi_r);
        let reconstructed = -dtilde * (phi_r - phi_l) + dhat * (phi_l + phi_r);
        assert!((reconstructed - j).abs() < 1e-12);
    }

    #[test]
    fn bicgstab_solves_small_diagonally_dominant_system() {
        let mut a = StencilMatrix::zeros(3);
        a.rows[0].diag = 4.0;
        a.rows[0].add_off(1, -1.0);
        a.rows[1].diag = 4.0;
        a.rows[1].add_off(0, -1.0);
        a.rows[1].add_off(2, -1.0);
        a.rows[2].diag = 4.0;
        a.rows[2].add_off(1, -1.0);

        let b = vec![3.0, 2.0, 3.0];
        let x0 = vec![0.0, 0.0, 0.0];
        let (x, iters) = bicgstab(&a, &b, &x0, 1e-10);
        assert!(iters < MAX_BICGSTAB_ITERS);

        let mut check = vec![0.0; 3];
        a.matvec(&x, &mut check);
        for (c, &bi) in check.iter().zip(&b) {
            assert!((c - bi).abs() < 1e-6);
        }
    }
}
