//! A physical pin: a shared [`PinMesh`] plus the material assigned to each of its XS regions
//! (`spec.md` §3 "Pin").

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::material::MaterialLib;
use crate::pin_mesh::PinMesh;

/// A pin instance: a mesh shared with every other pin of the same type, plus the per-XS-region
/// material assignment that makes this particular pin concrete.
#[derive(Clone, Debug)]
pub struct Pin {
    id: u32,
    mesh_id: u32,
    mesh: Arc<PinMesh>,
    mat_ids: Vec<u32>,
    is_fuel: bool,
}

impl Pin {
    /// Builds a pin from a shared mesh and a material ID per XS region. `is_fuel` is
    /// auto-derived as "any assigned material is fissile" unless `force_fuel` overrides it
    /// (`spec.md` §3 "'is fuel' flag (auto-derived from any fissile material unless
    /// overridden)").
    pub fn new(
        id: u32,
        mesh_id: u32,
        mesh: Arc<PinMesh>,
        mat_ids: Vec<u32>,
        mat_lib: &MaterialLib,
        force_fuel: Option<bool>,
    ) -> Result<Self> {
        let mut any_fissile = false;
        for &mid in &mat_ids {
            let material = mat_lib
                .get_by_id(mid)
                .map_err(|_| Error::Geometry(format!("pin {id} references unknown material {mid}")))?;
            any_fissile |= material.is_fissile();
        }

        Ok(Self {
            id,
            mesh_id,
            mesh,
            mat_ids,
            is_fuel: force_fuel.unwrap_or(any_fissile),
        })
    }

    /// This pin's ID.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// The ID of the underlying (possibly shared) [`PinMesh`].
    #[must_use]
    pub const fn mesh_id(&self) -> u32 {
        self.mesh_id
    }

    /// The underlying pin mesh.
    #[must_use]
    pub fn mesh(&self) -> &PinMesh {
        &self.mesh
    }

    /// Number of flat source regions in this pin.
    #[must_use]
    pub fn n_reg(&self) -> usize {
        self.mesh.n_reg()
    }

    /// Total footprint area of the pin.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.mesh.vol()
    }

    /// Per-region areas.
    #[must_use]
    pub fn areas(&self) -> Vec<f64> {
        self.mesh.area_list()
    }

    /// Material ID assigned to each XS region, in region order.
    #[must_use]
    pub fn mat_ids(&self) -> &[u32] {
        &self.mat_ids
    }

    /// Whether this pin contains fissile material.
    #[must_use]
    pub const fn is_fuel(&self) -> bool {
        self.is_fuel
    }
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin_mesh::RectMesh;
    use crate::scattering_matrix::ScatteringMatrix;
    use crate::material::Material;

    fn lib_with(id: u32, fissile: bool) -> MaterialLib {
        let scat = ScatteringMatrix::from_dense(&[vec![0.2]]).unwrap();
        let nf = if fissile { vec![0.1] } else { vec![0.0] };
        let mat = Material::new(vec![0.1], nf.clone(), nf, vec![1.0], scat).unwrap();
        let mut lib = MaterialLib::new();
        lib.add("m", mat).unwrap();
        lib.assign_id(id, "m").unwrap();
        lib
    }

    #[test]
    fn is_fuel_auto_derives_from_fissile_material() {
        let mesh = Arc::new(PinMesh::Rectangular(RectMesh::uniform(1.0, 1.0, 1, 1).unwrap()));
        let lib = lib_with(5, true);
        let pin = Pin::new(1, 10, mesh, vec![5], &lib, None).unwrap();
        assert!(pin.is_fuel());
    }

    #[test]
    fn is_fuel_override_wins_over_derivation() {
        let mesh = Arc::new(PinMesh::Rectangular(RectMesh::uniform(1.0, 1.0, 1, 1).unwrap()));
        let lib = lib_with(5, true);
        let pin = Pin::new(1, 10, mesh, vec![5], &lib, Some(false)).unwrap();
        assert!(!pin.is_fuel());
    }

    #[test]
    fn unknown_material_id_is_rejected() {
        let mesh = Arc::new(PinMesh::Rectangular(RectMesh::uniform(1.0, 1.0, 1, 1).unwrap()));
        let lib = lib_with(5, true);
        assert!(Pin::new(1, 10, mesh, vec![999], &lib, None).is_err());
    }
}
