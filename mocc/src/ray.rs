//! Characteristic ray tracing and the `RayData` collection (`spec.md` §3 "Ray"/"RayData", §4.4;
//! `src/mocc-core/ray.{hpp,cpp}`, `src/mocc-core/ray_data.{hpp,cpp}`).
//!
//! Rays are only ever traced once per geometrically-unique plane (`CoreMesh::n_unique_planes`),
//! then shared by every fine axial plane with the same pin layout; a sweep combines a ray's
//! plane-local FSR offsets with the fine plane's FSR base at sweep time.

use serde::{Deserialize, Serialize};

use crate::core_mesh::CoreMesh;
use crate::error::{Error, Result};
use crate::geom::{Box2, Point2};
use crate::quadrature::{AngularQuadrature, Normal, Surface};
use crate::warn;

/// How ray segment lengths are rescaled to reproduce true FSR volumes once all rays have been
/// traced (`src/mocc-core/ray_data.hpp::VolumeCorrection`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeCorrection {
    /// Per-angle correction: each angle's own rays alone reproduce FSR volumes. Technically less
    /// correct than [`VolumeCorrection::Angle`], but useful for debugging since it decouples
    /// angles from one another.
    Flat,
    /// Angle-integrated correction: the angle-weighted sum of every angle's rays reproduces FSR
    /// volumes.
    Angle,
}

/// A single characteristic ray traced across one geometrically-unique plane, from one domain
/// boundary point to another.
///
/// FSR indices in [`Ray::seg_index`] are offsets from the first FSR of the plane the ray belongs
/// to, so the same `Ray` can be reused by every fine axial plane sharing that layout. Coarse-mesh
/// bookkeeping (`cm_*`) is similarly plane-local: [`Ray::cm_cell`] holds the row-major pin index
/// within the plane, not a global coarse-cell index, since a `Ray` has no fine-plane `iz` of its
/// own (`src/mocc-core/ray.hpp` leaves the equivalent accessor unimplemented for the same reason;
/// here the caller supplies the plane's cell-index base instead).
#[derive(Clone, Debug)]
pub struct Ray {
    seg_len: Vec<f64>,
    seg_index: Vec<usize>,
    cm_nseg: Vec<usize>,
    cm_cell: Vec<usize>,
    cm_surf: Vec<Surface>,
    bc: [usize; 2],
    bc_normal: [Normal; 2],
}

impl Ray {
    /// Number of fine-mesh segments on this ray.
    #[must_use]
    pub fn nseg(&self) -> usize {
        self.seg_len.len()
    }

    /// Segment lengths, in trace order.
    #[must_use]
    pub fn seg_len(&self) -> &[f64] {
        &self.seg_len
    }

    /// Mutable access to segment lengths, for volume correction.
    pub fn seg_len_mut(&mut self) -> &mut [f64] {
        &mut self.seg_len
    }

    /// Plane-local FSR index of each segment, in trace order.
    #[must_use]
    pub fn seg_index(&self) -> &[usize] {
        &self.seg_index
    }

    /// Number of ray segments passing through each pin the ray crosses, in trace order. Needed to
    /// chunk [`Ray::seg_len`]/[`Ray::seg_index`] back into per-pin spans when tallying coarse
    /// currents during a sweep.
    #[must_use]
    pub fn cm_nseg(&self) -> &[usize] {
        &self.cm_nseg
    }

    /// Plane-local, row-major pin index of each pin the ray crosses, in trace order.
    #[must_use]
    pub fn cm_cell(&self) -> &[usize] {
        &self.cm_cell
    }

    /// The coarse surface crossed between consecutive pins in [`Ray::cm_cell`]; one entry shorter
    /// than `cm_cell`.
    #[must_use]
    pub fn cm_surf(&self) -> &[Surface] {
        &self.cm_surf
    }

    /// Number of coarse-mesh pins the ray traverses.
    #[must_use]
    pub fn ncseg(&self) -> usize {
        self.cm_cell.len()
    }

    /// The boundary-condition index at the start (`dir == 0`) or end (`dir == 1`) of the ray.
    #[must_use]
    pub fn bc(&self, dir: usize) -> usize {
        self.bc[dir]
    }

    /// The face normal (x- or y-) the start (`dir == 0`) or end (`dir == 1`) of the ray crosses
    /// the domain boundary through. Needed by a sweeper to index into
    /// [`crate::boundary_condition::BoundaryCondition`], which stores each normal's incoming
    /// angular flux separately.
    #[must_use]
    pub fn bc_normal(&self, dir: usize) -> Normal {
        self.bc_normal[dir]
    }
}

/// The full collection of [`Ray`]s for every geometrically-unique plane and modularized angle,
/// plus the modularized quadrature they were traced with (`src/mocc-core/ray_data.hpp`).
#[derive(Clone, Debug)]
pub struct RayData {
    ang_quad: AngularQuadrature,
    rays: Vec<Vec<Vec<Ray>>>,
    spacing: Vec<f64>,
    nx: Vec<usize>,
    ny: Vec<usize>,
    n_rays: Vec<usize>,
    max_segments: usize,
}

impl RayData {
    /// Traces rays for every geometrically-unique plane of `mesh`, modularizing `ang_quad`'s
    /// azimuthal angles and ray spacing so that an integer number of rays exactly tiles the core
    /// footprint, then corrects segment lengths to reproduce FSR volumes.
    ///
    /// Only octants 1 through 4 are traced explicitly: since the in-plane trace of a ray depends
    /// only on its azimuth, octants 5-8 (same azimuths, opposite polar sign) reuse the same ray
    /// geometry during a sweep (`src/mocc-core/moc_sweeper.cpp` sizes its boundary storage as
    /// `ndir_oct() * 4` for the same reason).
    pub fn generate(
        mesh: &CoreMesh,
        ang_quad: &AngularQuadrature,
        opt_spacing: f64,
        correction: VolumeCorrection,
    ) -> Result<Self> {
        if !(opt_spacing > 0.0) {
            return Err(Error::Configuration(
                "ray spacing must be positive".to_string(),
            ));
        }
        if !mesh.is_pin_modular() {
            return Err(Error::Geometry(
                "ray generation requires a pin-modular core (uniform pin pitch)".to_string(),
            ));
        }

        let mut ang_quad = ang_quad.clone();
        let n_dir_oct = ang_quad.n_dir_oct();
        let hx: f64 = mesh.mesh().pin_dx().iter().sum();
        let hy: f64 = mesh.mesh().pin_dy().iter().sum();

        let mut nx = Vec::with_capacity(n_dir_oct);
        let mut ny = Vec::with_capacity(n_dir_oct);
        let mut n_rays = Vec::with_capacity(n_dir_oct);
        let mut spacing = Vec::with_capacity(n_dir_oct);

        for iang in 0..n_dir_oct {
            let alpha = ang_quad.angles()[iang].alpha;
            let mut nxi = (hx / opt_spacing * alpha.sin().abs()).ceil() as i64;
            let mut nyi = (hy / opt_spacing * alpha.cos().abs()).ceil() as i64;
            nxi += nxi % 2 + 1;
            nyi += nyi % 2 + 1;
            let nxi = nxi.max(1) as usize;
            let nyi = nyi.max(1) as usize;

            let new_alpha = (hy * nxi as f64 / (hx * nyi as f64)).atan();
            ang_quad.modularize_angle(iang, new_alpha);
            let space = new_alpha.cos() * hy / nyi as f64;

            nx.push(nxi);
            ny.push(nyi);
            n_rays.push(nxi + nyi);
            spacing.push(space);
        }
        // Octants 2-4 share the same Nx/Ny/spacing as octant 1, angle-for-angle.
        for _ in 1..4 {
            for iang in 0..n_dir_oct {
                nx.push(nx[iang]);
                ny.push(ny[iang]);
                n_rays.push(n_rays[iang]);
                spacing.push(spacing[iang]);
            }
        }
        let n_angle = n_dir_oct * 4;
        let core_box = Box2::new(Point2::new(0.0, 0.0), Point2::new(hx, hy));

        let mut max_segments = 0usize;
        let mut rays = Vec::with_capacity(mesh.n_unique_planes());

        for iu in 0..mesh.n_unique_planes() {
            let iz = mesh.first_unique(iu);
            let n_reg_plane = mesh.unique_plane(iu).n_reg();
            let mut angle_rays = Vec::with_capacity(n_angle);

            for iang in 0..n_angle {
                let angle = ang_quad.angles()[iang];
                let nxi = nx[iang];
                let nyi = ny[iang];
                let space = spacing[iang];
                let space_x = (space / angle.alpha.sin()).abs();
                let space_y = (space / angle.alpha.cos()).abs();

                let mut nrayfsr = vec![0usize; n_reg_plane];
                let mut rays_for_angle = Vec::with_capacity(nxi + nyi);

                for iray in 0..nyi {
                    let bc1 = iray;
                    let x0 = if angle.ox > 0.0 { 0.0 } else { hx };
                    let p1 = Point2::new(x0, (0.5 + iray as f64) * space_y);
                    let p2 = core_box.exit_point(p1, Point2::new(angle.ox, angle.oy));
                    let bc2 = exit_bc(p2, hx, hy, space_x, space_y);
                    let normals = [Normal::X, exit_normal(p2, hx, hy)];
                    let ray = trace_ray(mesh, iu, iz, p1, p2, bc1, bc2, normals)?;
                    max_segments = max_segments.max(ray.nseg());
                    for &ireg in &ray.seg_index {
                        nrayfsr[ireg] += 1;
                    }
                    rays_for_angle.push(ray);
                }

                for iray in 0..nxi {
                    let y0 = if angle.oy > 0.0 { 0.0 } else { hy };
                    let p1 = Point2::new((0.5 + iray as f64) * space_x, y0);
                    let p2 = core_box.exit_point(p1, Point2::new(angle.ox, angle.oy));
                    let bc1 = iray;
                    let bc2 = exit_bc(p2, hx, hy, space_x, space_y);
                    let normals = [Normal::Y, exit_normal(p2, hx, hy)];
                    let ray = trace_ray(mesh, iu, iz, p1, p2, bc1, bc2, normals)?;
                    max_segments = max_segments.max(ray.nseg());
                    for &ireg in &ray.seg_index {
                        nrayfsr[ireg] += 1;
                    }
                    rays_for_angle.push(ray);
                }

                if nrayfsr.iter().any(|&c| c == 0) {
                    warn::push(format!(
                        "plane {iu}, angle {iang}: no ray passed through at least one FSR; \
                         try a finer ray spacing or larger regions"
                    ));
                }

                angle_rays.push(rays_for_angle);
            }
            rays.push(angle_rays);
        }

        let mut data = Self {
            ang_quad,
            rays,
            spacing,
            nx,
            ny,
            n_rays,
            max_segments,
        };
        data.correct_volume(mesh, correction);
        Ok(data)
    }

    /// The modularized quadrature used to trace this ray data (a mutated copy of the one passed
    /// to [`RayData::generate`]).
    #[must_use]
    pub const fn angular_quadrature(&self) -> &AngularQuadrature {
        &self.ang_quad
    }

    /// Iterates over the rays of every angle, for the given geometrically-unique plane.
    #[must_use]
    pub fn plane(&self, iu: usize) -> &[Vec<Ray>] {
        &self.rays[iu]
    }

    /// The rays of a single angle, within a geometrically-unique plane.
    #[must_use]
    pub fn rays(&self, iu: usize, iang: usize) -> &[Ray] {
        &self.rays[iu][iang]
    }

    /// Number of rays for the given angle (shared by every plane).
    #[must_use]
    pub fn n_rays(&self, iang: usize) -> usize {
        self.n_rays[iang]
    }

    /// Number of rays entering on the y-normal faces, for the given angle.
    #[must_use]
    pub fn nx(&self, iang: usize) -> usize {
        self.nx[iang]
    }

    /// Number of rays entering on the x-normal faces, for the given angle.
    #[must_use]
    pub fn ny(&self, iang: usize) -> usize {
        self.ny[iang]
    }

    /// Modularized ray spacing for the given angle.
    #[must_use]
    pub fn spacing(&self, iang: usize) -> f64 {
        self.spacing[iang]
    }

    /// Largest number of segments on any traced ray; sized for sweep scratch buffers.
    #[must_use]
    pub const fn max_segments(&self) -> usize {
        self.max_segments
    }

    /// Number of azimuthal angles actually traced (octants 1-4 of `ang_quad`).
    #[must_use]
    pub fn n_angle(&self) -> usize {
        self.ang_quad.n_dir_oct() * 4
    }

    fn correct_volume(&mut self, mesh: &CoreMesh, correction: VolumeCorrection) {
        match correction {
            VolumeCorrection::Flat => {
                for iu in 0..self.rays.len() {
                    let true_vol = plane_volumes(mesh, iu);
                    for iang in 0..self.rays[iu].len() {
                        let space = self.spacing[iang];
                        let mut fsr_vol = vec![0.0; true_vol.len()];
                        for ray in &self.rays[iu][iang] {
                            for (&len, &ireg) in ray.seg_len.iter().zip(&ray.seg_index) {
                                fsr_vol[ireg] += len * space;
                            }
                        }
                        for ray in &mut self.rays[iu][iang] {
                            for (len, &ireg) in ray.seg_len.iter_mut().zip(&ray.seg_index) {
                                *len *= true_vol[ireg] / fsr_vol[ireg];
                            }
                        }
                    }
                }
            }
            VolumeCorrection::Angle => {
                for iu in 0..self.rays.len() {
                    let true_vol = plane_volumes(mesh, iu);
                    let mut fsr_vol = vec![0.0; true_vol.len()];
                    for iang in 0..self.rays[iu].len() {
                        let space = self.spacing[iang];
                        let wgt = self.ang_quad.angles()[iang].weight * 0.5;
                        for ray in &self.rays[iu][iang] {
                            for (&len, &ireg) in ray.seg_len.iter().zip(&ray.seg_index) {
                                fsr_vol[ireg] += len * space * wgt;
                            }
                        }
                    }
                    let factor: Vec<f64> = true_vol
                        .iter()
                        .zip(&fsr_vol)
                        .map(|(&t, &v)| t / v)
                        .collect();
                    for iang in 0..self.rays[iu].len() {
                        for ray in &mut self.rays[iu][iang] {
                            for (len, &ireg) in ray.seg_len.iter_mut().zip(&ray.seg_index) {
                                *len *= factor[ireg];
                            }
                        }
                    }
                }
            }
        }
    }
}

/// True FSR volumes (areas, since this is a 2D per-plane trace) for unique plane `iu`, in FSR
/// order.
pub(crate) fn plane_volumes(mesh: &CoreMesh, iu: usize) -> Vec<f64> {
    let n_reg = mesh.unique_plane(iu).n_reg();
    let mut vols = vec![0.0; n_reg];
    let iz = mesh.first_unique(iu);
    for &pin_id in mesh.core_pins_plane(iz) {
        let pin = mesh.pin(pin_id).expect("core references only known pins");
        let first_reg = pin_first_reg(mesh, iu, pin_id, iz);
        for (i, &a) in pin.areas().iter().enumerate() {
            vols[first_reg + i] = a;
        }
    }
    vols
}

/// Looks up the plane-local FSR base of `pin_id`'s first occurrence in fine plane `iz`, by
/// locating it among `core_pins_plane(iz)` (row-major, matching `Plane::first_reg_pin`'s
/// indexing).
fn pin_first_reg(mesh: &CoreMesh, iu: usize, pin_id: u32, iz: usize) -> usize {
    let idx = mesh
        .core_pins_plane(iz)
        .iter()
        .position(|&id| id == pin_id)
        .expect("pin_id originated from this plane's own pin list");
    mesh.unique_plane(iu).first_reg_pin(idx)
}

/// Traces a single ray from `p1` to `p2` across unique plane `iu` (represented by fine plane
/// `iz`), walking pin-to-pin across the uniform pin grid.
fn trace_ray(
    mesh: &CoreMesh,
    iu: usize,
    iz: usize,
    p1: Point2,
    p2: Point2,
    bc1: usize,
    bc2: usize,
    bc_normal: [Normal; 2],
) -> Result<Ray> {
    let dx = mesh.mesh().pin_dx();
    let dy = mesh.mesh().pin_dy();
    let pitch_x = dx[0];
    let pitch_y = dy[0];
    let nx_pins = dx.len();
    let ny_pins = dy.len();

    let pts = grid_crossing_points(p1, p2, pitch_x, pitch_y, nx_pins, ny_pins);

    let mut seg_len = Vec::new();
    let mut seg_index = Vec::new();
    let mut cm_nseg = Vec::new();
    let mut cm_cell = Vec::new();
    let mut cm_surf = Vec::new();
    let core_pins = mesh.core_pins_plane(iz);

    for window in pts.windows(2) {
        let (a, b) = (window[0], window[1]);
        let mid = Point2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        let ix = ((mid.x / pitch_x) as usize).min(nx_pins - 1);
        let iy = ((mid.y / pitch_y) as usize).min(ny_pins - 1);
        let local_idx = iy * nx_pins + ix;

        let pin_id = core_pins[local_idx];
        let pin = mesh.pin(pin_id)?;
        let pin_mesh = mesh.pin_mesh(pin.mesh_id())?;
        let first_reg = mesh.unique_plane(iu).first_reg_pin(local_idx);

        let origin = Point2::new(ix as f64 * pitch_x, iy as f64 * pitch_y);
        let local_a = Point2::new(a.x - origin.x, a.y - origin.y);
        let local_b = Point2::new(b.x - origin.x, b.y - origin.y);

        let segs = pin_mesh.trace(local_a, local_b, first_reg);
        let nseg = segs.len();
        for (len, idx) in segs {
            seg_len.push(len);
            seg_index.push(idx);
        }
        cm_nseg.push(nseg);

        if !cm_cell.is_empty() {
            cm_surf.push(crossing_surface(a, pitch_x, pitch_y, nx_pins, ny_pins));
        }
        cm_cell.push(local_idx);
    }

    Ok(Ray {
        seg_len,
        seg_index,
        cm_nseg,
        cm_cell,
        cm_surf,
        bc: [bc1, bc2],
        bc_normal,
    })
}

/// The face normal a ray exits the core box through, at point `p2`.
fn exit_normal(p2: Point2, hx: f64, hy: f64) -> Normal {
    if (p2.x - hx).abs() < 1e-9 || p2.x.abs() < 1e-9 {
        Normal::X
    } else {
        Normal::Y
    }
}

/// The sorted, deduplicated list of points where the chord from `p1` to `p2` crosses a pin-grid
/// line, including the endpoints themselves.
fn grid_crossing_points(
    p1: Point2,
    p2: Point2,
    pitch_x: f64,
    pitch_y: f64,
    nx_pins: usize,
    ny_pins: usize,
) -> Vec<Point2> {
    let d = Point2::new(p2.x - p1.x, p2.y - p1.y);
    let mut hits: Vec<(f64, Point2)> = vec![(0.0, p1), (1.0, p2)];

    if d.x.abs() > 1e-12 {
        for i in 1..nx_pins {
            let x = i as f64 * pitch_x;
            let t = (x - p1.x) / d.x;
            if t > 1e-9 && t < 1.0 - 1e-9 {
                hits.push((t, Point2::new(x, p1.y + t * d.y)));
            }
        }
    }
    if d.y.abs() > 1e-12 {
        for j in 1..ny_pins {
            let y = j as f64 * pitch_y;
            let t = (y - p1.y) / d.y;
            if t > 1e-9 && t < 1.0 - 1e-9 {
                hits.push((t, Point2::new(p1.x + t * d.x, y)));
            }
        }
    }

    hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    hits.dedup_by(|a, b| (a.0 - b.0).abs() < 1e-9);
    hits.into_iter().map(|(_, p)| p).collect()
}

/// The local pin-interface surface crossed at grid-crossing point `p`. At a corner (`p` lies
/// exactly on both an x- and a y-grid line), the x-direction surface wins arbitrarily; true
/// corner crossings are measure-zero for a modularized ray set.
fn crossing_surface(p: Point2, pitch_x: f64, pitch_y: f64, nx_pins: usize, ny_pins: usize) -> Surface {
    let on_x_line = (1..nx_pins).any(|i| (p.x - i as f64 * pitch_x).abs() < 1e-9);
    if on_x_line {
        Surface::East
    } else {
        debug_assert!((1..ny_pins).any(|j| (p.y - j as f64 * pitch_y).abs() < 1e-9));
        Surface::North
    }
}

/// The boundary-condition index for a ray exiting the core box at `p2`: a position within its
/// exit face's own 0-based index space (east/west faces are indexed 0..ny, north/south faces
/// 0..nx), matching [`crate::boundary_condition::BoundaryCondition`]'s per-normal storage.
fn exit_bc(p2: Point2, hx: f64, hy: f64, space_x: f64, space_y: f64) -> usize {
    if (p2.x - hx).abs() < 1e-9 || p2.x.abs() < 1e-9 {
        (p2.y / space_y).round() as usize
    } else {
        (p2.x / space_x).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::pin::Pin;
    use crate::pin_mesh::{PinMesh, RectMesh};
    use crate::scattering_matrix::ScatteringMatrix;
    use crate::material::MaterialLib;
    use crate::core_mesh::{Assembly, Core, CoreMesh, Lattice};
    use crate::quadrature::Boundary;
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
    fn generate_traces_at_least_one_ray_per_fsr() {
        let mesh = uniform_vacuum_core(2);
        let quad = AngularQuadrature::chebyshev_gauss(4, 2).unwrap();
        let rays = RayData::generate(&mesh, &quad, 0.1, VolumeCorrection::Flat).unwrap();
        assert_eq!(rays.n_angle(), quad.n_dir_oct() * 4);
        assert!(rays.max_segments() > 0);
        for iu in 0..mesh.n_unique_planes() {
            for iang in 0..rays.n_angle() {
                assert!(!rays.rays(iu, iang).is_empty());
            }
        }
    }

    // Flat volume correction reproduces true FSR areas exactly, per angle.
    #[test]
    fn flat_volume_correction_reproduces_fsr_area() {
        let mesh = uniform_vacuum_core(2);
        let quad = AngularQuadrature::chebyshev_gauss(4, 2).unwrap();
        let rays = RayData::generate(&mesh, &quad, 0.1, VolumeCorrection::Flat).unwrap();
        let true_vol = plane_volumes(&mesh, 0);

        for iang in 0..rays.n_angle() {
            let mut fsr_vol = vec![0.0; true_vol.len()];
            let space = rays.spacing(iang);
            for ray in rays.rays(0, iang) {
                for (&len, &ireg) in ray.seg_len().iter().zip(ray.seg_index()) {
                    fsr_vol[ireg] += len * space;
                }
            }
            for (v, t) in fsr_vol.iter().zip(&true_vol) {
                assert!((v - t).abs() < 1e-6, "{v} vs {t}");
            }
        }
    }

    #[test]
    fn rejects_non_pin_modular_core() {
        // A single 1x1 pin core is trivially pin-modular; instead check the spacing guard.
        let mesh = uniform_vacuum_core(1);
        let quad = AngularQuadrature::chebyshev_gauss(2, 2).unwrap();
        assert!(RayData::generate(&mesh, &quad, 0.0, VolumeCorrection::Flat).is_err());
    }
}
