//! The outer solvers that tie a transport sweep, a one-group source, and (optionally) CMFD
//! acceleration into a converged fixed-source or eigenvalue solution (`spec.md` §2 "Data flow",
//! §4.11 "Outer driver"; `src/core/plane_solver.cpp`, `src/core/source_iteration.cpp`).
//!
//! Radial (x/y) boundary angular flux is carried persistently across outer iterations, one
//! [`BoundaryCondition`] per fine axial plane covering every group, and updated in place each
//! sweep via [`BoundaryCondition::update`] — the usual Gauss-Seidel-across-outers boundary
//! treatment rather than re-converging the boundary to self-consistency every outer iteration.
//! Axial planes are swept independently (no axial/NEM coupling is modeled, matching
//! [`crate::coarse_data::CoarseData`]'s radial-only current tallying for a 2D-style sweeper).

use ndarray::Array2;

use crate::boundary_condition::{BoundaryCondition, BoundaryConditions};
use crate::cmfd;
use crate::coarse_data::CoarseData;
use crate::core_mesh::CoreMesh;
use crate::error::Result;
use crate::quadrature::AngularQuadrature;
use crate::ray::RayData;
use crate::source::{self, SourceBuilder};
use crate::sweep::{boundary_face_sizes, sweep_plane, NullCurrentWorker, TallyCurrentWorker};
use crate::xs_mesh::{ExpandedXs, XSMesh};
use crate::xs_mesh_homogenized::XSMeshHomogenized;

/// One outer iteration's convergence diagnostics, the "convergence history" output of `spec.md`
/// §6.
#[derive(Clone, Copy, Debug)]
pub struct OuterRecord {
    /// Eigenvalue (or, for a fixed-source solve, always `1.0`) at the end of this iteration.
    pub k: f64,
    /// L2 norm of the multi-group fission source.
    pub fission_source_l2: f64,
    /// Max-norm of the scalar flux update this iteration, relative to the flux itself.
    pub flux_residual: f64,
}

/// The full history of outer iterations of a solve, in order.
#[derive(Clone, Debug, Default)]
pub struct ConvergenceHistory {
    /// One entry per outer iteration.
    pub records: Vec<OuterRecord>,
}

impl ConvergenceHistory {
    /// Number of outer iterations recorded.
    #[must_use]
    pub fn n_outer(&self) -> usize {
        self.records.len()
    }
}

/// Shared per-plane sweep bookkeeping: persistent radial boundary angular flux and a scratch
/// buffer for this sweep's outgoing flux, one pair per fine axial plane.
struct BoundaryState {
    incoming: Vec<BoundaryCondition>,
    outgoing: Vec<BoundaryCondition>,
}

impl BoundaryState {
    fn new(mesh: &CoreMesh, ray_data: &RayData) -> Self {
        let sizes = boundary_face_sizes(ray_data);
        let boundaries = core_boundary_conditions(mesh);
        let n_plane = mesh_nz(mesh);
        let n_group = mesh.n_group();
        let incoming = (0..n_plane)
            .map(|_| BoundaryCondition::new(n_group, boundaries, sizes.clone()))
            .collect();
        let outgoing = (0..n_plane)
            .map(|_| BoundaryCondition::new(n_group, boundaries, sizes.clone()))
            .collect();
        Self { incoming, outgoing }
    }
}

fn mesh_nz(mesh: &CoreMesh) -> usize {
    mesh.mesh().nz()
}

fn core_boundary_conditions(mesh: &CoreMesh) -> BoundaryConditions {
    let bc = mesh.core().boundary();
    BoundaryConditions {
        east: bc[0],
        north: bc[1],
        west: bc[2],
        south: bc[3],
        top: bc[4],
        bottom: bc[5],
    }
}

/// Sweeps every fine axial plane for one group, tallying into `flux` and, if `current` is
/// `Some`, the coarse-surface partial currents of the supplied [`CoarseData`]. Boundary angular
/// flux in `boundary` is advanced in place.
#[allow(clippy::too_many_arguments)]
fn sweep_group(
    mesh: &CoreMesh,
    ray_data: &RayData,
    quad: &AngularQuadrature,
    group: usize,
    xstr: &ExpandedXs,
    qbar: &[f64],
    flux: &mut [f64],
    boundary: &mut BoundaryState,
    mut coarse: Option<&mut CoarseData>,
) -> Result<()> {
    if let Some(c) = coarse.as_deref_mut() {
        c.zero_data_radial(mesh.mesh(), group, true);
    }
    for iz in 0..mesh.mesh().nz() {
        let bc_in = &boundary.incoming[iz];
        let bc_out = &mut boundary.outgoing[iz];
        match coarse.as_deref_mut() {
            Some(c) => {
                let mut worker = TallyCurrentWorker::new(c);
                sweep_plane(mesh, ray_data, quad, iz, group, xstr, qbar, flux, bc_in, bc_out, &mut worker)?;
            }
            None => {
                let mut worker = NullCurrentWorker;
                sweep_plane(mesh, ray_data, quad, iz, group, xstr, qbar, flux, bc_in, bc_out, &mut worker)?;
            }
        }
    }
    for iz in 0..mesh.mesh().nz() {
        let out = boundary.outgoing[iz].clone();
        boundary.incoming[iz].update(group, quad, &out)?;
    }
    Ok(())
}

fn flux_residual(old: &[f64], new: &[f64]) -> f64 {
    let mut max_rel = 0.0_f64;
    for (&o, &n) in old.iter().zip(new) {
        let denom = n.abs().max(1e-12);
        max_rel = max_rel.max(((n - o) / denom).abs());
    }
    max_rel
}

fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// A pure Method-of-Characteristics source-iteration solve with no CMFD acceleration: the
/// fixed-source problem of `spec.md` §4.11, used both as a standalone capability and as the
/// inner-iteration kernel the eigenvalue solver calls every outer iteration.
pub struct FixedSourceSolver {
    /// Inner-iteration (scalar flux) convergence tolerance.
    pub tol_flux: f64,
    /// Maximum number of inner iterations.
    pub max_inner: usize,
}

impl Default for FixedSourceSolver {
    fn default() -> Self {
        Self {
            tol_flux: 1e-5,
            max_inner: 100,
        }
    }
}

impl FixedSourceSolver {
    /// Iterates the multi-group scalar flux to convergence against a fixed external/fission
    /// source, with no CMFD acceleration. Returns the converged flux (`n_reg x n_group`) and the
    /// number of inner iterations used.
    pub fn solve(
        &self,
        mesh: &CoreMesh,
        ray_data: &RayData,
        quad: &AngularQuadrature,
        xs_mesh: &XSMesh,
        fixed_source: &Array2<f64>,
    ) -> Result<(Array2<f64>, usize)> {
        let n_reg = mesh.n_reg();
        let n_group = mesh.n_group();

        let mut flux = Array2::<f64>::from_elem((n_reg, n_group), 1.0);
        let mut boundary = BoundaryState::new(mesh, ray_data);
        let mut xstr_cache = ExpandedXs::new(n_reg);

        let mut iterations = 0;
        for inner in 0..self.max_inner {
            iterations = inner + 1;
            let previous = flux.clone();

            for g in 0..n_group {
                xstr_cache.expand(xs_mesh, g);

                let fission_col: Vec<f64> = fixed_source.column(g).to_vec();
                let source = SourceBuilder::initialize_group(n_reg, g)
                    .fission(xs_mesh, &fission_col)
                    .in_scatter(xs_mesh, &flux.t().to_owned())
                    .build();

                let flux_1g: Vec<f64> = flux.column(g).to_vec();
                let mut qbar = vec![0.0; n_reg];
                source::self_scatter(&source, xs_mesh, &flux_1g, &mut qbar);
                source::fixup_negative_source(&mut qbar);

                let mut group_flux = vec![0.0; n_reg];
                sweep_group(mesh, ray_data, quad, g, &xstr_cache, &qbar, &mut group_flux, &mut boundary, None)?;
                for (ireg, &v) in group_flux.iter().enumerate() {
                    flux[[ireg, g]] = v;
                }
            }

            let residual = flux_residual(previous.as_slice().unwrap(), flux.as_slice().unwrap());
            if residual < self.tol_flux {
                break;
            }
        }

        Ok((flux, iterations))
    }
}

/// CMFD-accelerated power iteration for the k-eigenvalue problem (`spec.md` §4.11).
pub struct EigenvalueSolver {
    /// Eigenvalue convergence tolerance (on `|k_new - k_old|`).
    pub tol_k: f64,
    /// Fission-source convergence tolerance (relative L2 change between outer iterations).
    pub tol_fs: f64,
    /// Maximum number of outer iterations.
    pub max_outer: usize,
    /// Number of MoC inner iterations (no re-sweep of the boundary to self-consistency) per
    /// group, per outer iteration.
    pub inner_per_outer: usize,
    /// Whether to run CMFD acceleration after each outer MoC sweep. `false` degenerates to plain
    /// MoC power iteration, used by tests exercising the sweep/source machinery without the
    /// CMFD solver.
    pub use_cmfd: bool,
    /// CMFD per-group linear solve tolerance.
    pub cmfd_tol: f64,
}

impl Default for EigenvalueSolver {
    fn default() -> Self {
        Self {
            tol_k: 1e-6,
            tol_fs: 1e-5,
            max_outer: 100,
            inner_per_outer: 2,
            use_cmfd: true,
            cmfd_tol: 1e-8,
        }
    }
}

impl EigenvalueSolver {
    /// Runs power iteration to convergence. `eubounds` is the descending group upper-energy
    /// bound list (`spec.md` §6); if empty, a synthetic descending bound list is used instead so
    /// callers exercising the sweep/source machinery don't need to invent one. Returns the
    /// converged eigenvalue, the FSR-indexed multi-group flux, and the per-outer-iteration
    /// convergence history.
    pub fn solve(
        &self,
        mesh: &CoreMesh,
        ray_data: &RayData,
        quad: &AngularQuadrature,
        eubounds: &[f64],
    ) -> Result<(f64, Array2<f64>, ConvergenceHistory)> {
        let n_reg = mesh.n_reg();
        let n_group = mesh.n_group();
        let n_cell = mesh.mesh().n_pin();

        let eubounds = if eubounds.is_empty() {
            default_eubounds(n_group)
        } else {
            eubounds.to_vec()
        };
        let fsr_materials = mesh.fsr_materials();
        let mut xs_mesh = XSMesh::new(&fsr_materials, mesh.mat_lib(), eubounds.clone())?;

        let mut flux = Array2::<f64>::from_elem((n_reg, n_group), 1.0);
        let mut k = 1.0_f64;
        let mut boundary = BoundaryState::new(mesh, ray_data);
        let mut xstr_cache = ExpandedXs::new(n_reg);
        let mut history = ConvergenceHistory::default();

        let pins = mesh.homogenization_pins();
        let mut xs_homog = if self.use_cmfd {
            Some(XSMeshHomogenized::new(&pins, mesh.mat_lib(), eubounds)?)
        } else {
            None
        };
        let mut coarse = if self.use_cmfd {
            Some(CoarseData::new(n_cell, mesh.mesh().n_surf(), n_group))
        } else {
            None
        };

        for outer in 0..self.max_outer {
            let previous_flux = flux.clone();
            let old_fission_source = fission_source(&xs_mesh, &flux);

            for _inner in 0..self.inner_per_outer {
                for g in 0..n_group {
                    xstr_cache.expand(&xs_mesh, g);

                    let fission_col = old_fission_source.clone();
                    let source = SourceBuilder::initialize_group(n_reg, g)
                        .fission(&xs_mesh, &fission_col)
                        .in_scatter(&xs_mesh, &flux.t().to_owned())
                        .build();

                    let flux_1g: Vec<f64> = flux.column(g).to_vec();
                    let mut qbar = vec![0.0; n_reg];
                    source::self_scatter(&source, &xs_mesh, &flux_1g, &mut qbar);
                    source::fixup_negative_source(&mut qbar);
                    for q in &mut qbar {
                        *q /= k;
                    }

                    let mut group_flux = vec![0.0; n_reg];
                    sweep_group(mesh, ray_data, quad, g, &xstr_cache, &qbar, &mut group_flux, &mut boundary, coarse.as_mut())?;
                    for (ireg, &v) in group_flux.iter().enumerate() {
                        flux[[ireg, g]] = v;
                    }
                }
            }

            if let (Some(coarse), Some(xs_homog)) = (coarse.as_mut(), xs_homog.as_mut()) {
                coarse.set_has_radial_data(true);
                pin_average_flux(mesh, &flux, &mut coarse.flux);
                xs_homog.set_flux(flux.clone());
                xs_homog.update(mesh.mat_lib())?;
                k = cmfd::accelerate(mesh.mesh(), xs_homog, coarse, k, self.cmfd_tol)?;
                prolongate_flux(mesh, &coarse.flux, &coarse.old_flux, &mut flux);
                coarse.partial_current_fw_old.assign(&coarse.partial_current_fw);
                coarse.partial_current_bw_old.assign(&coarse.partial_current_bw);
                coarse.set_has_old_partial(true);
            } else {
                let new_fission_source = fission_source(&xs_mesh, &flux);
                let old_total: f64 = old_fission_source.iter().sum();
                let new_total: f64 = new_fission_source.iter().sum();
                if old_total.abs() > 1e-300 {
                    k *= new_total / old_total;
                }
            }

            xs_mesh.update();

            let new_fission_source = fission_source(&xs_mesh, &flux);
            let fs_residual = {
                let diff: f64 = old_fission_source
                    .iter()
                    .zip(&new_fission_source)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                let denom = l2_norm(&old_fission_source).max(1e-300);
                diff / denom
            };
            let residual = flux_residual(previous_flux.as_slice().unwrap(), flux.as_slice().unwrap());

            history.records.push(OuterRecord {
                k,
                fission_source_l2: l2_norm(&new_fission_source),
                flux_residual: residual,
            });

            if outer > 0 {
                let prev_k = history.records[history.records.len() - 2].k;
                if (k - prev_k).abs() < self.tol_k && fs_residual < self.tol_fs {
                    break;
                }
            }
        }

        Ok((k, flux, history))
    }
}

fn default_eubounds(n_group: usize) -> Vec<f64> {
    (0..n_group).map(|g| (n_group - g) as f64).collect()
}

fn fission_source(xs_mesh: &XSMesh, flux: &Array2<f64>) -> Vec<f64> {
    let n_reg = flux.nrows();
    let n_group = flux.ncols();
    let mut source = vec![0.0; n_reg];
    for xsr in xs_mesh.iter() {
        for &ireg in xsr.reg() {
            let mut s = 0.0;
            for g in 0..n_group {
                s += xsr.xsmacnf(g) * flux[[ireg, g]];
            }
            source[ireg] = s;
        }
    }
    source
}

/// Averages the fine-mesh scalar flux onto each coarse (pin) cell, volume-weighted, for CMFD and
/// for reporting the pin-homogenized flux an eigenvalue solve produces (`spec.md` §6 "Produced
/// outputs"; see [`crate::output`]).
pub(crate) fn pin_average_flux(mesh: &CoreMesh, flux: &Array2<f64>, coarse_flux: &mut Array2<f64>) {
    let n_group = flux.ncols();
    let n_cell = mesh.mesh().n_pin();
    let pins = mesh.homogenization_pins();

    for (cell, (pin, first_reg)) in pins.iter().enumerate().take(n_cell) {
        let areas = pin.areas();
        let vol = pin.area();
        for g in 0..n_group {
            let mut acc = 0.0;
            for (local, &area) in areas.iter().enumerate() {
                acc += area * flux[[first_reg + local, g]];
            }
            coarse_flux[[cell, g]] = acc / vol;
        }
    }
}

/// Prolongates the CMFD-corrected pin-average flux back onto the fine FSR mesh, preserving each
/// FSR's within-pin flux *shape* from the MoC sweep and only rescaling by the pin's CMFD
/// correction ratio — the standard MoC/CMFD coupling update (`spec.md` §4.11).
fn prolongate_flux(mesh: &CoreMesh, new_coarse: &Array2<f64>, old_coarse: &Array2<f64>, flux: &mut Array2<f64>) {
    let n_group = flux.ncols();
    let n_cell = mesh.mesh().n_pin();
    let pins = mesh.homogenization_pins();

    for (cell, (pin, first_reg)) in pins.iter().enumerate().take(n_cell) {
        for g in 0..n_group {
            let old = old_coarse[[cell, g]];
            let ratio = if old.abs() > 1e-300 { new_coarse[[cell, g]] / old } else { 1.0 };
            for local in 0..pin.n_reg() {
                flux[[first_reg + local, g]] *= ratio;
            }
        }
    }
}
