//! Declarative, `serde`-deserializable configuration for building a solve-ready geometry,
//! material library, and angular quadrature (`spec.md` §6 "Consumed configuration"). This is the
//! structured-data analogue of the original's XML input deck: [`Configuration`] is a plain data
//! tree an out-of-scope front end (XML, YAML, whatever) parses into, and [`build`] is the single
//! seam that turns it into the immutable objects the solvers in [`crate::driver`] operate on.
//!
//! Every ID field below (`PinMeshConfig`/`PinConfig`/`LatticeConfig`/`AssemblyConfig` ids,
//! material ids) is an arbitrary key chosen by whoever wrote the configuration; `build` resolves
//! cross-references between them and reports unknown ids as [`crate::error::Error::Configuration`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core_mesh::{Assembly, Core, CoreMesh, Lattice};
use crate::error::{Error, Result};
use crate::material::{Material, MaterialLib};
use crate::pin::Pin;
use crate::pin_mesh::{CylMesh, PinMesh, RectMesh};
use crate::quadrature::{AngularQuadrature, Boundary};
use crate::ray::{RayData, VolumeCorrection};
use crate::scattering_matrix::ScatteringMatrix;

/// One pin-mesh shape, keyed by the id pins reference it under (`spec.md` §3 "PinMesh", §4.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PinMeshConfig {
    /// A uniform rectangular subdivision.
    Rectangular {
        /// Pin pitch along x.
        pitch_x: f64,
        /// Pin pitch along y.
        pitch_y: f64,
        /// Number of divisions along x.
        nx: usize,
        /// Number of divisions along y.
        ny: usize,
    },
    /// Concentric material rings, each further split into equal-area radial subdivisions, with
    /// `n_azi` azimuthal sectors applied uniformly.
    Cylindrical {
        /// Pin pitch along x.
        pitch_x: f64,
        /// Pin pitch along y.
        pitch_y: f64,
        /// Outer radius of each material ring, ascending.
        xs_radii: Vec<f64>,
        /// Equal-area radial subdivisions within each ring.
        sub_rad: Vec<usize>,
        /// Azimuthal sector count, shared by every ring.
        n_azi: usize,
    },
}

impl PinMeshConfig {
    fn build(&self) -> Result<PinMesh> {
        match self {
            Self::Rectangular { pitch_x, pitch_y, nx, ny } => {
                Ok(PinMesh::Rectangular(RectMesh::uniform(*pitch_x, *pitch_y, *nx, *ny)?))
            }
            Self::Cylindrical { pitch_x, pitch_y, xs_radii, sub_rad, n_azi } => Ok(PinMesh::Cylindrical(
                CylMesh::new(*pitch_x, *pitch_y, xs_radii.clone(), sub_rad.clone(), *n_azi)?,
            )),
        }
    }
}

/// One material's multigroup cross-section set (`spec.md` §3 "Material").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialConfig {
    /// Name used to cross-reference this material from [`MaterialLib::id_by_name`].
    pub name: String,
    /// Input-deck id this material is assigned to.
    pub id: u32,
    /// Absorption cross section per group.
    pub xsab: Vec<f64>,
    /// Nu-fission cross section per group.
    pub xsnf: Vec<f64>,
    /// Kappa-fission cross section per group.
    pub xskf: Vec<f64>,
    /// Fission spectrum fraction per group (renormalized by [`Material::new`] if any entry is
    /// positive).
    pub xsch: Vec<f64>,
    /// Dense group-to-group scattering matrix, `xssc[to][from]`.
    pub xssc: Vec<Vec<f64>>,
    /// Overrides the auto-derived "is fuel" flag on every pin using this material, if set.
    #[serde(default)]
    pub force_fuel: Option<bool>,
}

/// One pin instance: a mesh id plus a material id per XS region (`spec.md` §3 "Pin").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PinConfig {
    /// This pin's id, referenced by [`LatticeConfig::pin_ids`].
    pub id: u32,
    /// The [`PinMeshConfig`] id this pin's regions are laid out on.
    pub mesh_id: u32,
    /// Material id assigned to each XS region, in region order.
    pub mat_ids: Vec<u32>,
}

/// A 2D grid of pin ids, row-major with y outer (`spec.md` §3 "Lattice").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LatticeConfig {
    /// This lattice's id, referenced by [`AssemblyConfig::lattice_ids`].
    pub id: u32,
    /// Pin footprint along x.
    pub nx: usize,
    /// Pin footprint along y.
    pub ny: usize,
    /// Row-major (y outer) pin ids filling the `nx * ny` grid.
    pub pin_ids: Vec<u32>,
}

/// An axial stack of lattices (`spec.md` §3 "Assembly").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// This assembly's id, referenced by [`CoreConfig::assembly_ids`].
    pub id: u32,
    /// Lattice id occupying each fine axial plane.
    pub lattice_ids: Vec<u32>,
    /// Per-plane axial heights, one per entry of `lattice_ids`.
    pub hz: Vec<f64>,
    /// Number of fine planes grouped into each macroplane; must sum to `lattice_ids.len()`.
    pub subplane_factors: Vec<usize>,
}

/// Domain boundary condition, one entry per face, named rather than positional
/// (`spec.md` §4.5, §6 "boundary-condition face ordering").
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// +x face.
    pub east: Boundary,
    /// +y face.
    pub north: Boundary,
    /// -x face.
    pub west: Boundary,
    /// -y face.
    pub south: Boundary,
    /// +z face.
    pub top: Boundary,
    /// -z face.
    pub bottom: Boundary,
}

impl BoundaryConfig {
    /// Orders the six faces the way [`Core::new`] expects them: East, North, West, South, Top,
    /// Bottom.
    fn to_array(self) -> [Boundary; 6] {
        [self.east, self.north, self.west, self.south, self.top, self.bottom]
    }
}

/// A 2D grid of assembly ids, row-major with y outer, plus the domain boundary condition
/// (`spec.md` §3 "Core").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Assembly footprint along x.
    pub nx: usize,
    /// Assembly footprint along y.
    pub ny: usize,
    /// Row-major (y outer) assembly ids filling the `nx * ny` grid.
    pub assembly_ids: Vec<u32>,
    /// Domain boundary condition.
    pub boundary: BoundaryConfig,
}

/// Angular quadrature family and its parameters (`spec.md` §6 "Angular quadrature").
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuadratureConfig {
    /// Level-symmetric (Sn) quadrature. Only orders 4 and 6 are tabulated.
    LevelSymmetric {
        /// Quadrature order.
        order: usize,
    },
    /// Chebyshev azimuthal x Gauss polar product quadrature.
    ChebyshevGauss {
        /// Azimuthal angle count per octant.
        n_azimuthal: usize,
        /// Polar angle count per octant.
        n_polar: usize,
    },
    /// Chebyshev azimuthal x Yamamoto polar product quadrature. Only `n_polar == 3` is supported.
    ChebyshevYamamoto {
        /// Azimuthal angle count per octant.
        n_azimuthal: usize,
        /// Polar angle count per octant.
        n_polar: usize,
    },
}

impl QuadratureConfig {
    fn build(&self) -> Result<AngularQuadrature> {
        match *self {
            Self::LevelSymmetric { order } => AngularQuadrature::level_symmetric(order),
            Self::ChebyshevGauss { n_azimuthal, n_polar } => {
                AngularQuadrature::chebyshev_gauss(n_azimuthal, n_polar)
            }
            Self::ChebyshevYamamoto { n_azimuthal, n_polar } => {
                AngularQuadrature::chebyshev_yamamoto(n_azimuthal, n_polar)
            }
        }
    }
}

/// Ray-tracing parameters (`spec.md` §4.4).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RayConfig {
    /// Target (pre-modularization) ray spacing.
    pub spacing: f64,
    /// How traced segment lengths are rescaled to reproduce true FSR volumes.
    pub volume_correction: VolumeCorrection,
}

impl Default for RayConfig {
    fn default() -> Self {
        Self {
            spacing: 0.05,
            volume_correction: VolumeCorrection::Angle,
        }
    }
}

/// The full geometry: pin-mesh catalog, pin catalog, lattices, assemblies, and the core
/// (`spec.md` §3, §6 "core geometry config").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Pin-mesh shapes, keyed by id.
    pub pin_meshes: HashMap<u32, PinMeshConfig>,
    /// Pin instances, keyed by id.
    pub pins: HashMap<u32, PinConfig>,
    /// Lattices, keyed by id.
    pub lattices: HashMap<u32, LatticeConfig>,
    /// Assemblies, keyed by id.
    pub assemblies: HashMap<u32, AssemblyConfig>,
    /// The core.
    pub core: CoreConfig,
}

/// The top-level configuration [`build`] consumes: geometry, material library, quadrature, and
/// ray parameters (`spec.md` §6 "Consumed configuration").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Configuration {
    /// Group upper energy bounds, descending, one per energy group.
    pub eubounds: Vec<f64>,
    /// Material library entries.
    pub materials: Vec<MaterialConfig>,
    /// Geometry description.
    pub geometry: GeometryConfig,
    /// Angular quadrature.
    pub quadrature: QuadratureConfig,
    /// Ray-tracing parameters.
    pub ray: RayConfig,
}

/// The immutable, solve-ready objects a [`Configuration`] resolves into.
pub struct SolveInputs {
    /// The resolved core geometry.
    pub mesh: CoreMesh,
    /// The resolved angular quadrature, modularized by ray generation.
    pub quad: AngularQuadrature,
    /// The traced rays for every geometrically-unique plane.
    pub ray_data: RayData,
}

fn build_material_lib(materials: &[MaterialConfig]) -> Result<MaterialLib> {
    let mut lib = MaterialLib::new();
    for m in materials {
        let scat = ScatteringMatrix::from_dense(&m.xssc)?;
        let material = Material::new(m.xsab.clone(), m.xsnf.clone(), m.xskf.clone(), m.xsch.clone(), scat)?;
        lib.add(&m.name, material)?;
        lib.assign_id(m.id, &m.name)?;
    }
    Ok(lib)
}

fn build_pin_meshes(geometry: &GeometryConfig) -> Result<HashMap<u32, Arc<PinMesh>>> {
    geometry
        .pin_meshes
        .iter()
        .map(|(&id, cfg)| Ok((id, Arc::new(cfg.build()?))))
        .collect()
}

fn build_pins(
    geometry: &GeometryConfig,
    pin_meshes: &HashMap<u32, Arc<PinMesh>>,
    mat_lib: &MaterialLib,
) -> Result<HashMap<u32, Pin>> {
    geometry
        .pins
        .iter()
        .map(|(&id, cfg)| {
            let mesh = pin_meshes
                .get(&cfg.mesh_id)
                .ok_or_else(|| Error::Configuration(format!("pin {id} references unknown mesh {}", cfg.mesh_id)))?
                .clone();
            let pin = Pin::new(id, cfg.mesh_id, mesh, cfg.mat_ids.clone(), mat_lib, None)?;
            Ok((id, pin))
        })
        .collect()
}

fn build_lattices(geometry: &GeometryConfig, pins: &HashMap<u32, Pin>) -> Result<HashMap<u32, Lattice>> {
    geometry
        .lattices
        .iter()
        .map(|(&id, cfg)| {
            let lat = Lattice::new(id, cfg.nx, cfg.ny, cfg.pin_ids.clone(), pins)?;
            Ok((id, lat))
        })
        .collect()
}

fn build_assemblies(geometry: &GeometryConfig, lattices: &HashMap<u32, Lattice>) -> Result<HashMap<u32, Assembly>> {
    geometry
        .assemblies
        .iter()
        .map(|(&id, cfg)| {
            let asy = Assembly::new(
                id,
                cfg.lattice_ids.clone(),
                cfg.hz.clone(),
                cfg.subplane_factors.clone(),
                lattices,
            )?;
            Ok((id, asy))
        })
        .collect()
}

/// Resolves a [`Configuration`] into solve-ready objects: the full core geometry (and its
/// material library), the modularized angular quadrature, and its traced rays (`spec.md` §6,
/// `mocc::config::build`).
pub fn build(config: &Configuration) -> Result<SolveInputs> {
    let mat_lib = build_material_lib(&config.materials)?;
    let pin_meshes = build_pin_meshes(&config.geometry)?;
    let pins = build_pins(&config.geometry, &pin_meshes, &mat_lib)?;
    let lattices = build_lattices(&config.geometry, &pins)?;
    let assemblies = build_assemblies(&config.geometry, &lattices)?;

    let core = Core::new(
        config.geometry.core.nx,
        config.geometry.core.ny,
        config.geometry.core.assembly_ids.clone(),
        config.geometry.core.boundary.to_array(),
        &assemblies,
    )?;

    let mesh = CoreMesh::new(pin_meshes, mat_lib, pins, lattices, assemblies, core)?;

    let quad = config.quadrature.build()?;
    let ray_data = RayData::generate(&mesh, &quad, config.ray.spacing, config.ray.volume_correction)?;

    Ok(SolveInputs { mesh, quad, ray_data })
}
