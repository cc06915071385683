//! Pin -> Lattice -> Assembly -> Core geometry composition, geometrically-unique axial plane
//! detection, and the flat FSR/coarse-cell indexing built on top of [`crate::mesh::Mesh`]
//! (`spec.md` §3 "Lattice / Assembly / Core", "Plane", "CoreMesh"; `src/core/core_mesh.hpp/.cpp`,
//! `src/mocc-core/lattice.hpp`, `src/mocc-core/assembly.hpp`, `src/mocc-core/core.hpp`).
//!
//! Unlike the original's XML-driven constructors, every level here is built directly from
//! already-parsed ids and dimensions (`spec.md` §1: XML input parsing is out of scope), with
//! dimensional conformity ("x-pitches agree column-wise, y-pitches row-wise, z-heights identical
//! across assemblies") checked at construction instead of assumed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::fp::ulp_eq;
use crate::material::MaterialLib;
use crate::mesh::{Mesh, Position};
use crate::pin::Pin;
use crate::pin_mesh::PinMesh;
use crate::quadrature::Boundary;

/// A 2D grid of [`Pin`]s, row-major with y outer, matching [`crate::pin_mesh::RectMesh`]'s
/// indexing convention.
#[derive(Clone, Debug)]
pub struct Lattice {
    id: u32,
    nx: usize,
    ny: usize,
    pin_ids: Vec<u32>,
    hx_vec: Vec<f64>,
    hy_vec: Vec<f64>,
    n_reg: usize,
    n_xsreg: usize,
}

impl Lattice {
    /// Builds a lattice from a row-major pin-id grid. Rejects pins whose mesh pitch disagrees
    /// with another pin in the same column (x) or row (y), per `spec.md` §3's dimensional
    /// conformity requirement.
    pub fn new(id: u32, nx: usize, ny: usize, pin_ids: Vec<u32>, pins: &HashMap<u32, Pin>) -> Result<Self> {
        if pin_ids.len() != nx * ny {
            return Err(Error::Geometry(format!(
                "lattice {id} declares {nx}x{ny} pins but got {} pin ids",
                pin_ids.len()
            )));
        }

        let pin_at = |ix: usize, iy: usize| -> Result<&Pin> {
            let pid = pin_ids[iy * nx + ix];
            pins.get(&pid)
                .ok_or_else(|| Error::Geometry(format!("lattice {id} references unknown pin {pid}")))
        };

        let mut hx_vec = Vec::with_capacity(nx);
        for ix in 0..nx {
            let px = pin_at(ix, 0)?.mesh().pitch_x();
            for iy in 1..ny {
                let other = pin_at(ix, iy)?.mesh().pitch_x();
                if !ulp_eq(px, other) {
                    return Err(Error::Geometry(format!(
                        "lattice {id} column {ix} has inconsistent pin x-pitch"
                    )));
                }
            }
            hx_vec.push(px);
        }

        let mut hy_vec = Vec::with_capacity(ny);
        for iy in 0..ny {
            let py = pin_at(0, iy)?.mesh().pitch_y();
            for ix in 1..nx {
                let other = pin_at(ix, iy)?.mesh().pitch_y();
                if !ulp_eq(py, other) {
                    return Err(Error::Geometry(format!(
                        "lattice {id} row {iy} has inconsistent pin y-pitch"
                    )));
                }
            }
            hy_vec.push(py);
        }

        let mut n_reg = 0;
        let mut n_xsreg = 0;
        for &pid in &pin_ids {
            let pin = pins.get(&pid).unwrap();
            n_reg += pin.n_reg();
            n_xsreg += pin.mat_ids().len();
        }

        Ok(Self {
            id,
            nx,
            ny,
            pin_ids,
            hx_vec,
            hy_vec,
            n_reg,
            n_xsreg,
        })
    }

    /// This lattice's ID.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Number of pins along x.
    #[must_use]
    pub const fn nx(&self) -> usize {
        self.nx
    }

    /// Number of pins along y.
    #[must_use]
    pub const fn ny(&self) -> usize {
        self.ny
    }

    /// Total footprint size along x.
    #[must_use]
    pub fn hx(&self) -> f64 {
        self.hx_vec.iter().sum()
    }

    /// Total footprint size along y.
    #[must_use]
    pub fn hy(&self) -> f64 {
        self.hy_vec.iter().sum()
    }

    /// Per-column pin x-pitches.
    #[must_use]
    pub fn hx_vec(&self) -> &[f64] {
        &self.hx_vec
    }

    /// Per-row pin y-pitches.
    #[must_use]
    pub fn hy_vec(&self) -> &[f64] {
        &self.hy_vec
    }

    /// Total FSR count.
    #[must_use]
    pub const fn n_reg(&self) -> usize {
        self.n_reg
    }

    /// Total XS-region count (sum of each pin's material-assignment count).
    #[must_use]
    pub const fn n_xsreg(&self) -> usize {
        self.n_xsreg
    }

    /// The pin id at grid position `(ix, iy)`.
    #[must_use]
    pub fn at(&self, ix: usize, iy: usize) -> u32 {
        self.pin_ids[iy * self.nx + ix]
    }

    /// Pin ids, row-major with y outer.
    #[must_use]
    pub fn pin_ids(&self) -> &[u32] {
        &self.pin_ids
    }
}

/// A stack of [`Lattice`]s along z, each with its own axial height, plus a grouping of those fine
/// planes into coarser "macroplanes" used by 2D/3D coupling (`subplane_factors`, summing to the
/// number of fine planes).
#[derive(Clone, Debug)]
pub struct Assembly {
    id: u32,
    lattice_ids: Vec<u32>,
    hz: Vec<f64>,
    subplane_factors: Vec<usize>,
    nx: usize,
    ny: usize,
}

impl Assembly {
    /// Builds an assembly from its axial stack of lattice ids and per-plane heights.
    /// `subplane_factors` must sum to `lattice_ids.len()`; every referenced lattice must share the
    /// same `(nx, ny)` footprint.
    pub fn new(
        id: u32,
        lattice_ids: Vec<u32>,
        hz: Vec<f64>,
        subplane_factors: Vec<usize>,
        lattices: &HashMap<u32, Lattice>,
    ) -> Result<Self> {
        if lattice_ids.len() != hz.len() {
            return Err(Error::Geometry(format!(
                "assembly {id} has {} lattices but {} plane heights",
                lattice_ids.len(),
                hz.len()
            )));
        }
        if subplane_factors.iter().sum::<usize>() != lattice_ids.len() {
            return Err(Error::Geometry(format!(
                "assembly {id} subplane factors do not sum to its plane count"
            )));
        }

        let mut lats = lattice_ids.iter().map(|lid| {
            lattices
                .get(lid)
                .ok_or_else(|| Error::Geometry(format!("assembly {id} references unknown lattice {lid}")))
        });
        let first = lats.next().ok_or_else(|| {
            Error::Geometry(format!("assembly {id} must have at least one plane"))
        })??;
        let (nx, ny) = (first.nx(), first.ny());
        for lat in lats {
            let lat = lat?;
            if lat.nx() != nx || lat.ny() != ny {
                return Err(Error::Geometry(format!(
                    "assembly {id} stacks lattices with inconsistent footprints"
                )));
            }
        }

        Ok(Self {
            id,
            lattice_ids,
            hz,
            subplane_factors,
            nx,
            ny,
        })
    }

    /// This assembly's ID.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Number of fine axial planes.
    #[must_use]
    pub fn nz(&self) -> usize {
        self.lattice_ids.len()
    }

    /// Pin footprint along x.
    #[must_use]
    pub const fn nx(&self) -> usize {
        self.nx
    }

    /// Pin footprint along y.
    #[must_use]
    pub const fn ny(&self) -> usize {
        self.ny
    }

    /// Per-plane axial heights.
    #[must_use]
    pub fn hz(&self) -> &[f64] {
        &self.hz
    }

    /// The number of fine planes grouped into each macroplane.
    #[must_use]
    pub fn subplane_factors(&self) -> &[usize] {
        &self.subplane_factors
    }

    /// The lattice id occupying fine plane `iz`.
    #[must_use]
    pub fn lattice_at(&self, iz: usize) -> u32 {
        self.lattice_ids[iz]
    }
}

/// A 2D grid of [`Assembly`]s, row-major with y outer, plus the domain boundary conditions.
#[derive(Clone, Debug)]
pub struct Core {
    nx: usize,
    ny: usize,
    assembly_ids: Vec<u32>,
    bc: [Boundary; 6],
}

impl Core {
    /// Builds a core from a row-major assembly-id grid. Every assembly must agree on its fine
    /// plane count, heights, and subplane factors ("z-heights identical across assemblies").
    pub fn new(
        nx: usize,
        ny: usize,
        assembly_ids: Vec<u32>,
        bc: [Boundary; 6],
        assemblies: &HashMap<u32, Assembly>,
    ) -> Result<Self> {
        if assembly_ids.len() != nx * ny {
            return Err(Error::Geometry(
                "core assembly grid size does not match nx*ny".into(),
            ));
        }

        let resolve = |id: u32| -> Result<&Assembly> {
            assemblies
                .get(&id)
                .ok_or_else(|| Error::Geometry(format!("core references unknown assembly {id}")))
        };

        let first = resolve(assembly_ids[0])?;
        let (hz, subplane) = (first.hz().to_vec(), first.subplane_factors().to_vec());
        for &aid in &assembly_ids[1..] {
            let asy = resolve(aid)?;
            if asy.hz() != hz.as_slice() || asy.subplane_factors() != subplane.as_slice() {
                return Err(Error::Geometry(
                    "core assemblies disagree on axial heights or subplane factors".into(),
                ));
            }
        }

        Ok(Self {
            nx,
            ny,
            assembly_ids,
            bc,
        })
    }

    /// Number of assemblies along x.
    #[must_use]
    pub const fn nx(&self) -> usize {
        self.nx
    }

    /// Number of assemblies along y.
    #[must_use]
    pub const fn ny(&self) -> usize {
        self.ny
    }

    /// The assembly id at grid position `(ix, iy)`.
    #[must_use]
    pub fn at(&self, ix: usize, iy: usize) -> u32 {
        self.assembly_ids[iy * self.nx + ix]
    }

    /// Domain boundary conditions, `{east, north, west, south, top, bottom}`.
    #[must_use]
    pub const fn boundary(&self) -> [Boundary; 6] {
        self.bc
    }
}

/// One axial plane's geometric signature: the ordered sequence of [`PinMesh`] identifiers every
/// pin in the plane uses. Two planes are geometrically equivalent iff these sequences are
/// elementwise identical (`spec.md` §3 "Plane"), which is the only basis for sharing ray data
/// across physically distinct but geometrically identical planes.
#[derive(Clone, Debug)]
pub struct Plane {
    mesh_ids: Vec<u32>,
    first_reg_pin: Vec<usize>,
    n_reg: usize,
    n_fuel: usize,
}

impl Plane {
    /// `true` if `self` and `other` have the same pin-mesh-id sequence.
    #[must_use]
    pub fn geometrically_equivalent(&self, other: &Self) -> bool {
        self.mesh_ids == other.mesh_ids
    }

    /// Number of FSRs in this plane.
    #[must_use]
    pub const fn n_reg(&self) -> usize {
        self.n_reg
    }

    /// Number of fuel pins in this plane.
    #[must_use]
    pub const fn n_fuel(&self) -> usize {
        self.n_fuel
    }

    /// The plane-local FSR offset of the pin at flat (row-major) index `ipin`.
    #[must_use]
    pub fn first_reg_pin(&self, ipin: usize) -> usize {
        self.first_reg_pin[ipin]
    }
}

/// Everything needed to represent the physical state of the reactor: pin meshes, materials, pins,
/// lattices, assemblies, the core grid, the set of geometrically-unique planes, and the flat FSR
/// / coarse-cell indexing built over them (`spec.md` §3 "CoreMesh").
#[derive(Clone, Debug)]
pub struct CoreMesh {
    pin_meshes: HashMap<u32, Arc<PinMesh>>,
    mat_lib: MaterialLib,
    pins: HashMap<u32, Pin>,
    core: Core,
    mesh: Mesh,
    planes: Vec<Plane>,
    core_pins: Vec<u32>,
    unique_plane_ids: Vec<usize>,
    first_unique: Vec<usize>,
    first_reg_plane: Vec<usize>,
    subplane_factors: Vec<usize>,
    macroplane_heights: Vec<f64>,
    n_reg: usize,
    n_fuel_2d: usize,
}

impl CoreMesh {
    /// Composes the full geometry and detects geometrically-unique axial planes.
    pub fn new(
        pin_meshes: HashMap<u32, Arc<PinMesh>>,
        mat_lib: MaterialLib,
        pins: HashMap<u32, Pin>,
        lattices: HashMap<u32, Lattice>,
        assemblies: HashMap<u32, Assembly>,
        core: Core,
    ) -> Result<Self> {
        let nx = core.nx();
        let ny = core.ny();

        let asy_at = |ix: usize, iy: usize| -> Result<&Assembly> {
            let aid = core.at(ix, iy);
            assemblies
                .get(&aid)
                .ok_or_else(|| Error::Geometry(format!("core references unknown assembly {aid}")))
        };
        let lat_at = |asy: &Assembly, iz: usize| -> Result<&Lattice> {
            let lid = asy.lattice_at(iz);
            lattices
                .get(&lid)
                .ok_or_else(|| Error::Geometry(format!("assembly references unknown lattice {lid}")))
        };

        let nz = asy_at(0, 0)?.nz();
        let subplane_factors = asy_at(0, 0)?.subplane_factors().to_vec();

        let npinx: usize = (0..nx).map(|ix| lat_at(asy_at(ix, 0).unwrap(), 0).unwrap().nx()).sum();
        let npiny: usize = (0..ny).map(|iy| lat_at(asy_at(0, iy).unwrap(), 0).unwrap().ny()).sum();

        let mut planes = Vec::new();
        let mut unique_plane_ids = Vec::with_capacity(nz);
        let mut first_unique = Vec::new();
        let mut first_reg_plane = Vec::with_capacity(nz);
        let mut core_pins = Vec::with_capacity(npinx * npiny * nz);
        let mut plane_reg = 0usize;
        let mut n_fuel_2d = 0usize;

        for iz in 0..nz {
            first_reg_plane.push(plane_reg);

            let mut mesh_ids = Vec::with_capacity(npinx * npiny);
            let mut first_reg_pin = Vec::with_capacity(npinx * npiny);
            let mut plane_local_reg = 0usize;
            let mut n_fuel = 0usize;

            for ay in 0..ny {
                for py in 0..lat_at(asy_at(0, ay)?, iz)?.ny() {
                    for ax in 0..nx {
                        let asy = asy_at(ax, ay)?;
                        let lat = lat_at(asy, iz)?;
                        for px in 0..lat.nx() {
                            let pid = lat.at(px, py);
                            let pin = pins
                                .get(&pid)
                                .ok_or_else(|| Error::Geometry(format!("unknown pin {pid}")))?;
                            mesh_ids.push(pin.mesh_id());
                            first_reg_pin.push(plane_local_reg);
                            plane_local_reg += pin.n_reg();
                            if pin.is_fuel() {
                                n_fuel += 1;
                            }
                            core_pins.push(pid);
                        }
                    }
                }
            }

            plane_reg += plane_local_reg;
            n_fuel_2d = n_fuel_2d.max(n_fuel);

            let candidate = Plane {
                mesh_ids,
                first_reg_pin,
                n_reg: plane_local_reg,
                n_fuel,
            };
            let matched = planes.iter().position(|p: &Plane| p.geometrically_equivalent(&candidate));
            match matched {
                Some(idx) => unique_plane_ids.push(idx),
                None => {
                    unique_plane_ids.push(planes.len());
                    first_unique.push(iz);
                    planes.push(candidate);
                }
            }
        }

        let mut dx_vec = Vec::with_capacity(npinx);
        for ax in 0..nx {
            let lat = lat_at(asy_at(ax, 0)?, 0)?;
            dx_vec.extend_from_slice(lat.hx_vec());
        }
        let mut dy_vec = Vec::with_capacity(npiny);
        for ay in 0..ny {
            let lat = lat_at(asy_at(0, ay)?, 0)?;
            dy_vec.extend_from_slice(lat.hy_vec());
        }
        let dz_vec = asy_at(0, 0)?.hz().to_vec();

        let mut macroplane_heights = vec![0.0; subplane_factors.len()];
        let mut iz = 0usize;
        for (isub, &np) in subplane_factors.iter().enumerate() {
            for _ in 0..np {
                macroplane_heights[isub] += dz_vec[iz];
                iz += 1;
            }
        }

        let n_reg = plane_reg;
        let mesh = Mesh::new(dx_vec, dy_vec, dz_vec, core.boundary());

        Ok(Self {
            pin_meshes,
            mat_lib,
            pins,
            core,
            mesh,
            planes,
            core_pins,
            unique_plane_ids,
            first_unique,
            first_reg_plane,
            subplane_factors,
            macroplane_heights,
            n_reg,
            n_fuel_2d,
        })
    }

    /// Total number of FSRs in the true (unreduced) mesh.
    #[must_use]
    pub const fn n_reg(&self) -> usize {
        self.n_reg
    }

    /// Number of geometrically-unique planes.
    #[must_use]
    pub fn n_unique_planes(&self) -> usize {
        self.planes.len()
    }

    /// Number of energy groups in the material library.
    #[must_use]
    pub fn n_group(&self) -> usize {
        self.mat_lib.n_group()
    }

    /// The material library.
    #[must_use]
    pub const fn mat_lib(&self) -> &MaterialLib {
        &self.mat_lib
    }

    /// The underlying coarse-cell/surface indexing mesh.
    #[must_use]
    pub const fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// The pin mesh registered under `id`.
    pub fn pin_mesh(&self, id: u32) -> Result<&Arc<PinMesh>> {
        self.pin_meshes
            .get(&id)
            .ok_or_else(|| Error::Geometry(format!("no pin mesh with id {id}")))
    }

    /// The pin registered under `id`.
    pub fn pin(&self, id: u32) -> Result<&Pin> {
        self.pins
            .get(&id)
            .ok_or_else(|| Error::Geometry(format!("no pin with id {id}")))
    }

    /// A geometrically-unique plane by its unique index.
    #[must_use]
    pub fn unique_plane(&self, ip: usize) -> &Plane {
        &self.planes[ip]
    }

    /// The unique plane occupying fine axial plane `iz`.
    #[must_use]
    pub fn plane_at(&self, iz: usize) -> &Plane {
        &self.planes[self.unique_plane_ids[iz]]
    }

    /// The unique-plane index of fine axial plane `iz`.
    #[must_use]
    pub fn unique_plane_id(&self, iz: usize) -> usize {
        self.unique_plane_ids[iz]
    }

    /// Unique-plane index per fine axial plane.
    #[must_use]
    pub fn unique_plane_ids(&self) -> &[usize] {
        &self.unique_plane_ids
    }

    /// The fine-plane index of the first occurrence of unique plane `iu`.
    #[must_use]
    pub fn first_unique(&self, iu: usize) -> usize {
        self.first_unique[iu]
    }

    /// The FSR index of the first region in fine plane `iz`.
    #[must_use]
    pub fn first_reg_plane(&self, iz: usize) -> usize {
        self.first_reg_plane[iz]
    }

    /// Flat pin-id sequence in FSR order (plane-major, row-major within each plane).
    #[must_use]
    pub fn core_pins(&self) -> &[u32] {
        &self.core_pins
    }

    /// The pin ids occupying fine plane `iz`.
    #[must_use]
    pub fn core_pins_plane(&self, iz: usize) -> &[u32] {
        let npp = self.mesh.nx() * self.mesh.ny();
        &self.core_pins[iz * npp..(iz + 1) * npp]
    }

    /// The number of fine planes grouped into each macroplane.
    #[must_use]
    pub fn subplane(&self) -> &[usize] {
        &self.subplane_factors
    }

    /// The total axial height of each macroplane.
    #[must_use]
    pub fn macroplane_heights(&self) -> &[f64] {
        &self.macroplane_heights
    }

    /// The maximum number of fuel pins in any single axial plane.
    #[must_use]
    pub const fn n_fuel_2d(&self) -> usize {
        self.n_fuel_2d
    }

    /// `true` if the core is a 2D problem: exactly one plane, with reflective top/bottom.
    #[must_use]
    pub fn is_2d(&self) -> bool {
        self.mesh.nz() == 1
            && self.mesh.boundary_condition(crate::quadrature::Surface::Top) == Boundary::Reflect
            && self.mesh.boundary_condition(crate::quadrature::Surface::Bottom) == Boundary::Reflect
    }

    /// `true` if every pin mesh shares the same pitch in each direction (a prerequisite for the
    /// azimuthal-modularization ray generation of `spec.md` §4.4 to apply uniformly).
    #[must_use]
    pub fn is_pin_modular(&self) -> bool {
        let dx = self.mesh.pin_dx();
        let dy = self.mesh.pin_dy();
        dx.iter().all(|&v| ulp_eq(v, dx[0])) && dy.iter().all(|&v| ulp_eq(v, dy[0]))
    }

    /// The core's assembly/lattice/pin composition.
    #[must_use]
    pub const fn core(&self) -> &Core {
        &self.core
    }

    /// The core-local origin (lower-left corner) of pin `ipin`'s footprint, in the x-y plane.
    #[must_use]
    pub fn pin_origin(&self, ipin: usize) -> (f64, f64) {
        let pos = self.pin_position(ipin);
        let x: f64 = self.mesh.pin_dx()[..pos.x].iter().sum();
        let y: f64 = self.mesh.pin_dy()[..pos.y].iter().sum();
        (x, y)
    }

    /// The grid [`Position`] of pin index `ipin` (row-major within its plane, z outermost).
    #[must_use]
    pub fn pin_position(&self, ipin: usize) -> Position {
        self.mesh.coarse_position(ipin)
    }

    /// The material ID assigned to every FSR, in FSR order: plane-major, then row-major within a
    /// plane, then ring-major and radially/azimuthally within a pin, matching the ordering
    /// `crate::xs_mesh_homogenized::PinRecord` assumes. Used to build an un-homogenized
    /// [`crate::xs_mesh::XSMesh`] directly from the material library.
    #[must_use]
    pub fn fsr_materials(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.n_reg);
        let npp = self.mesh.nx() * self.mesh.ny();
        for iz in 0..self.mesh.nz() {
            let pins_in_plane = &self.core_pins[iz * npp..(iz + 1) * npp];
            for &pid in pins_in_plane {
                let pin = &self.pins[&pid];
                for (xsreg, &mid) in pin.mat_ids().iter().enumerate() {
                    let n_fsr = pin.mesh().n_fsrs_for_xs_region(xsreg);
                    out.extend(std::iter::repeat(mid).take(n_fsr));
                }
            }
        }
        out
    }

    /// Every core-pin instance paired with the global FSR index of its first region, in the same
    /// plane-major/row-major order as [`Self::fsr_materials`]. The input
    /// [`crate::xs_mesh_homogenized::XSMeshHomogenized::new`] expects: one homogenized region per
    /// physical pin instance, not per pin type.
    #[must_use]
    pub fn homogenization_pins(&self) -> Vec<(&Pin, usize)> {
        let mut out = Vec::with_capacity(self.core_pins.len());
        let npp = self.mesh.nx() * self.mesh.ny();
        let mut first_reg = 0usize;
        for iz in 0..self.mesh.nz() {
            let pins_in_plane = &self.core_pins[iz * npp..(iz + 1) * npp];
            for &pid in pins_in_plane {
                let pin = &self.pins[&pid];
                out.push((pin, first_reg));
                first_reg += pin.n_reg();
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::pin_mesh::RectMesh;
    use crate::scattering_matrix::ScatteringMatrix;

    fn single_pin_setup(nx: usize, ny: usize, nz: usize) -> (HashMap<u32, Arc<PinMesh>>, MaterialLib, HashMap<u32, Pin>) {
        let mut mat_lib = MaterialLib::new();
        let scat = ScatteringMatrix::from_dense(&[vec![0.2]]).unwrap();
        let mat = Material::new(vec![0.1], vec![0.0], vec![0.0], vec![0.0], scat).unwrap();
        mat_lib.add("mod", mat).unwrap();
        mat_lib.assign_id(1, "mod").unwrap();

        let mesh = Arc::new(PinMesh::Rectangular(RectMesh::uniform(1.0, 1.0, 1, 1).unwrap()));
        let mut pin_meshes = HashMap::new();
        pin_meshes.insert(1u32, mesh.clone());

        let mut pins = HashMap::new();
        for i in 0..(nx * ny * nz) {
            let pin = Pin::new(i as u32, 1, mesh.clone(), vec![1], &mat_lib, None).unwrap();
            pins.insert(i as u32, pin);
        }
        (pin_meshes, mat_lib, pins)
    }

    fn build_uniform_core(nx: usize, ny: usize, nz: usize) -> CoreMesh {
        let (pin_meshes, mat_lib, pins) = single_pin_setup(nx, ny, nz);

        let mut lattices = HashMap::new();
        for iz in 0..nz {
            let pin_ids: Vec<u32> = (0..(nx * ny)).map(|i| (iz * nx * ny + i) as u32).collect();
            lattices.insert(iz as u32, Lattice::new(iz as u32, nx, ny, pin_ids, &pins).unwrap());
        }

        let lattice_ids: Vec<u32> = (0..nz as u32).collect();
        let hz = vec![1.0; nz];
        let subplane_factors = vec![1; nz];
        let mut assemblies = HashMap::new();
        assemblies.insert(
            0u32,
            Assembly::new(0, lattice_ids, hz, subplane_factors, &lattices).unwrap(),
        );

        let core = Core::new(1, 1, vec![0], [Boundary::Vacuum; 6], &assemblies).unwrap();
        CoreMesh::new(pin_meshes, mat_lib, pins, lattices, assemblies, core).unwrap()
    }

    #[test]
    fn single_plane_core_has_one_unique_plane() {
        let mesh = build_uniform_core(2, 2, 1);
        assert_eq!(mesh.n_unique_planes(), 1);
        assert_eq!(mesh.n_reg(), 4);
        assert_eq!(mesh.first_reg_plane(0), 0);
    }

    #[test]
    fn repeated_axial_planes_share_one_unique_plane() {
        let mesh = build_uniform_core(2, 2, 3);
        assert_eq!(mesh.n_unique_planes(), 1);
        assert_eq!(mesh.unique_plane_ids(), &[0, 0, 0]);
        assert_eq!(mesh.first_reg_plane(0), 0);
        assert_eq!(mesh.first_reg_plane(1), 4);
        assert_eq!(mesh.first_reg_plane(2), 8);
        assert_eq!(mesh.n_reg(), 12);
    }

    #[test]
    fn core_pins_are_in_fsr_order() {
        let mesh = build_uniform_core(2, 1, 2);
        assert_eq!(mesh.core_pins().len(), 4);
        assert_eq!(mesh.core_pins_plane(0), &[0, 1]);
        assert_eq!(mesh.core_pins_plane(1), &[2, 3]);
    }

    #[test]
    fn uniform_pin_pitches_are_pin_modular() {
        let mesh = build_uniform_core(2, 2, 1);
        assert!(mesh.is_pin_modular());
    }
}
