//! The Method of Characteristics transport sweep kernel: for one energy group and one
//! geometrically-unique plane, walks every traced ray and tallies scalar flux and (optionally)
//! coarse-surface partial currents (`spec.md` §4.8 "Sweep", §4.9 "Current tally";
//! `src/mocc-core/moc_sweeper.cpp`).
//!
//! A sweep only ever touches one plane at a time; a caller (the eigenvalue driver) loops this over
//! every fine axial plane and every group, in whatever inner/outer iteration structure it likes.

use std::f64::consts::PI;

use rayon::prelude::*;

use crate::angle::Angle;
use crate::boundary_condition::{BoundaryCondition, FaceSize};
use crate::coarse_data::CoarseData;
use crate::core_mesh::CoreMesh;
use crate::error::Result;
use crate::fp::one_minus_exp_neg;
use crate::quadrature::{AngularQuadrature, Normal, Surface};
use crate::ray::{plane_volumes, Ray, RayData};
use crate::xs_mesh::ExpandedXs;

/// Builds the per-angle face sizes a [`BoundaryCondition`] needs to hold every traced ray's
/// boundary position, across the full `8 * n_dir_oct` quadrature (octants 5-8 mirror the face
/// sizes of their 2D-geometry twin in octants 1-4).
#[must_use]
pub fn boundary_face_sizes(ray_data: &RayData) -> Vec<FaceSize> {
    let n_traced = ray_data.n_angle();
    let per_octant: Vec<FaceSize> = (0..n_traced).map(|iang| [ray_data.ny(iang), ray_data.nx(iang), 0]).collect();
    per_octant.iter().copied().chain(per_octant).collect()
}

/// Receives a partial-current contribution at a coarse surface crossing, during a sweep. Kept as
/// a trait so a 2D sweeper can skip current tallying entirely (a no-op cost) when it is only
/// being used as a fixed-source solve with no CMFD acceleration.
pub trait CurrentWorker {
    /// Records a ray crossing `global_surf` in the direction given by `angle`, carrying angular
    /// flux `psi`. `surf_kind` tells which canonical surface (`East` or `North`) the crossing
    /// point is recorded against, which combined with the angle's sign on that axis determines
    /// whether the contribution is forward or backward. `weight` is the ray's spacing, not its
    /// full flux-tally weight; the direction-cosine magnitude is folded in here, per surface.
    fn add(&mut self, global_surf: usize, group: usize, surf_kind: Surface, angle: &Angle, weight: f64, psi: f64);
}

/// A [`CurrentWorker`] that discards every contribution; used for sweeps that don't feed CMFD.
pub struct NullCurrentWorker;

impl CurrentWorker for NullCurrentWorker {
    fn add(&mut self, _global_surf: usize, _group: usize, _surf_kind: Surface, _angle: &Angle, _weight: f64, _psi: f64) {}
}

/// A [`CurrentWorker`] that accumulates partial currents into a [`CoarseData`] buffer.
pub struct TallyCurrentWorker<'a> {
    coarse: &'a mut CoarseData,
}

impl<'a> TallyCurrentWorker<'a> {
    /// Wraps `coarse` so a sweep can tally directly into it.
    pub fn new(coarse: &'a mut CoarseData) -> Self {
        Self { coarse }
    }
}

impl CurrentWorker for TallyCurrentWorker<'_> {
    fn add(&mut self, global_surf: usize, group: usize, surf_kind: Surface, angle: &Angle, weight: f64, psi: f64) {
        let (forward, direction_component) = match surf_kind {
            Surface::East => (angle.ox > 0.0, angle.ox),
            Surface::North => (angle.oy > 0.0, angle.oy),
            _ => return,
        };
        let contribution = angle.weight * weight * direction_component.abs() * psi;
        if forward {
            self.coarse.partial_current_fw[[global_surf, group]] += contribution;
        } else {
            self.coarse.partial_current_bw[[global_surf, group]] += contribution;
        }
    }
}

/// Sweeps one energy group over one fine axial plane, tallying scalar flux into `flux` (indexed
/// globally over the whole mesh's FSRs; only this plane's slice is touched) and updating `bc_out`
/// with outgoing angular flux at every domain boundary crossing.
///
/// `qbar` is the reduced, isotropic source per steradian (`spec.md` §4.7's `q_bar`), globally
/// FSR-indexed, already combining fission, in-scatter, and self-scatter. `xstr` is the expanded
/// one-group transport cross section cache for the same group.
#[allow(clippy::too_many_arguments)]
pub fn sweep_plane(
    mesh: &CoreMesh,
    ray_data: &RayData,
    quad: &AngularQuadrature,
    iz: usize,
    group: usize,
    xstr: &ExpandedXs,
    qbar: &[f64],
    flux: &mut [f64],
    bc_in: &BoundaryCondition,
    bc_out: &mut BoundaryCondition,
    current: &mut dyn CurrentWorker,
) -> Result<()> {
    let iu = mesh.unique_plane_id(iz);
    let base = mesh.first_reg_plane(iz);
    let n_reg_plane = mesh.unique_plane(iu).n_reg();
    let coarse_base = mesh.mesh().plane_cell_begin(iz);
    let n_traced = ray_data.n_angle();

    // Every traced angle's rays are independent of every other angle's: each angle reads only
    // `bc_in` and writes only its own slice of `bc_out`. Sweeping angles in a fork-join parallel
    // region and reducing their scalar-flux tallies is the same "thread-local accumulator,
    // merged at the end" pattern used elsewhere in this workspace to combine independent
    // per-subgrid contributions; current-tally and boundary writes are deferred to the
    // single-threaded merge step below since `CurrentWorker`/`BoundaryCondition` are mutated
    // in place and aren't worth making thread-safe for a once-per-angle write.
    let partials: Vec<AnglePartial> = (0..n_traced)
        .into_par_iter()
        .map(|iang_traced| {
            let rays = ray_data.rays(iu, iang_traced);
            let space = ray_data.spacing(iang_traced);
            let mut partial = AnglePartial::new(n_reg_plane);

            for &full_idx in &[iang_traced, iang_traced + n_traced] {
                let angle = quad.angles()[full_idx];
                let rsin = angle.rsintheta();
                let ray_weight = angle.weight * space * angle.theta.sin() * PI;

                for ray in rays {
                    sweep_ray(
                        ray,
                        full_idx,
                        &angle,
                        rsin,
                        ray_weight,
                        space,
                        base,
                        coarse_base,
                        group,
                        xstr,
                        qbar,
                        bc_in,
                        &mut partial,
                    );
                }
            }
            partial
        })
        .collect();

    let mut tally = vec![0.0; n_reg_plane];
    for partial in partials {
        for (ireg, delta) in partial.tally.into_iter().enumerate() {
            tally[ireg] += delta;
        }
        for (global_cell, grp, surf_kind, angle, weight, psi) in partial.current {
            current.add(global_cell, grp, surf_kind, &angle, weight, psi);
        }
        for (angle_idx, normal, pos, psi) in partial.bc_writes {
            bc_out.face_mut(group, angle_idx, normal)[pos] = psi;
        }
    }

    let vol = plane_volumes(mesh, iu);
    for ireg in 0..n_reg_plane {
        let xs = xstr.get(base + ireg);
        flux[base + ireg] = tally[ireg] / (xs * vol[ireg]) + 4.0 * PI * qbar[base + ireg];
    }

    Ok(())
}

/// One traced angle's scalar-flux tally and deferred current/boundary contributions, produced by
/// one fork-join task and merged back into the plane's shared state after the parallel region.
struct AnglePartial {
    tally: Vec<f64>,
    current: Vec<(usize, usize, Surface, Angle, f64, f64)>,
    bc_writes: Vec<(usize, Normal, usize, f64)>,
}

impl AnglePartial {
    fn new(n_reg_plane: usize) -> Self {
        Self {
            tally: vec![0.0; n_reg_plane],
            current: Vec::new(),
            bc_writes: Vec::new(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn sweep_ray(
    ray: &Ray,
    angle_idx: usize,
    angle: &Angle,
    rsin: f64,
    ray_weight: f64,
    space: f64,
    base: usize,
    coarse_base: usize,
    group: usize,
    xstr: &ExpandedXs,
    qbar: &[f64],
    bc_in: &BoundaryCondition,
    partial: &mut AnglePartial,
) {
    let mut psi = bc_in.face(group, angle_idx, ray.bc_normal(0))[ray.bc(0)];

    let mut cm_idx = 0usize;
    let mut seg_in_cm = ray.cm_nseg().first().copied().unwrap_or(0);
    let mut seg = 0usize;

    for (&len, &ireg) in ray.seg_len().iter().zip(ray.seg_index()) {
        let xs = xstr.get(base + ireg);
        let tau = xs * len * rsin;
        let atten = one_minus_exp_neg(tau);
        let q = qbar[base + ireg];
        let delta = (psi - q) * atten;
        partial.tally[ireg] += ray_weight * delta;
        psi -= delta;

        seg += 1;
        if seg == seg_in_cm && cm_idx + 1 < ray.cm_cell().len() {
            let surf_kind = ray.cm_surf()[cm_idx];
            if surf_kind != Surface::Invalid && surf_kind != Surface::Internal {
                let global_cell = coarse_base + ray.cm_cell()[cm_idx];
                partial.current.push((global_cell, group, surf_kind, *angle, space, psi));
            }
            cm_idx += 1;
            seg_in_cm += ray.cm_nseg()[cm_idx];
        }
    }

    partial.bc_writes.push((angle_idx, ray.bc_normal(1), ray.bc(1), psi));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary_condition::BoundaryConditions;
    use crate::core_mesh::{Assembly, Core, CoreMesh, Lattice};
    use crate::material::{Material, MaterialLib};
    use crate::pin::Pin;
    use crate::pin_mesh::{PinMesh, RectMesh};
    use crate::quadrature::Boundary;
    use crate::ray::VolumeCorrection;
    use crate::scattering_matrix::ScatteringMatrix;
    use crate::xs_mesh::XSMesh;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn uniform_vacuum_core(n: usize) -> CoreMesh {
        let mut mat_lib = MaterialLib::new();
        let scat = ScatteringMatrix::from_dense(&[vec![0.2]]).unwrap();
        let mat = Material::new(vec![0.5], vec![0.0], vec![0.0], vec![0.0], scat).unwrap();
        mat_lib.add("fuel", mat).unwrap();
        mat_lib.assign_id(1, "fuel").unwrap();

        let mesh = Arc::new(PinMesh::Rectangular(RectMesh::uniform(1.0, 1.0, 1, 1).unwrap()));
        let mut pin_meshes = HashMap::new();
        pin_meshes.insert(1u32, mesh.clone());

        let mut pins = HashMap::new();
        for i in 0..(n * n) {
            pins.insert(
                i as u32,
                Pin::new(i as u32, 1, mesh.clone(), vec![1], &mat_lib, None).unwrap(),
            );
        }

        let pin_ids: Vec<u32> = (0..(n * n) as u32).collect();
        let mut lattices = HashMap::new();
        lattices.insert(0u32, Lattice::new(0, n, n, pin_ids, &pins).unwrap());

        let mut assemblies = HashMap::new();
        assemblies.insert(
            0u32,
            Assembly::new(0, vec![0], vec![1.0], vec![1], &lattices).unwrap(),
        );

        let core = Core::new(1, 1, vec![0], [Boundary::Vacuum; 6], &assemblies).unwrap();
        CoreMesh::new(pin_meshes, mat_lib, pins, lattices, assemblies, core).unwrap()
    }

    #[test]
    fn vacuum_sweep_produces_nonnegative_flux_everywhere() {
        let mesh = uniform_vacuum_core(2);
        let quad = AngularQuadrature::chebyshev_gauss(4, 2).unwrap();
        let ray_data = RayData::generate(&mesh, &quad, 0.1, VolumeCorrection::Flat).unwrap();

        let fsr_materials = vec![1u32; mesh.n_reg()];
        let xs_mesh = XSMesh::new(&fsr_materials, mesh.mat_lib(), vec![1.0]).unwrap();
        let mut xstr = ExpandedXs::new(mesh.n_reg());
        xstr.expand(&xs_mesh, 0);

        let sizes = boundary_face_sizes(&ray_data);
        let boundaries = BoundaryConditions {
            east: Boundary::Vacuum,
            north: Boundary::Vacuum,
            west: Boundary::Vacuum,
            south: Boundary::Vacuum,
            top: Boundary::Vacuum,
            bottom: Boundary::Vacuum,
        };
        let bc_in = BoundaryCondition::new(1, boundaries, sizes.clone());
        let mut bc_out = BoundaryCondition::new(1, boundaries, sizes);

        let qbar = vec![1.0 / (4.0 * PI); mesh.n_reg()];
        let mut flux = vec![0.0; mesh.n_reg()];
        let mut current = NullCurrentWorker;

        sweep_plane(
            &mesh,
            &ray_data,
            &quad,
            0,
            0,
            &xstr,
            &qbar,
            &mut flux,
            &bc_in,
            &mut bc_out,
            &mut current,
        )
        .unwrap();

        for &v in &flux {
            assert!(v.is_finite());
            assert!(v > 0.0);
        }
    }
}
