//! Cross-section mesh: the un-homogenized mapping from flat source regions to macroscopic
//! multigroup cross sections (`spec.md` §3 "XSMeshRegion"; `src/core/xs_mesh_region.hpp`,
//! `src/core/xs_mesh.hpp`).
//!
//! An [`XSMeshRegion`] groups every FSR that shares one equivalence class of cross sections (for
//! the stock, un-homogenized mesh built by [`XSMesh::new`], that equivalence class is simply "has
//! this material"); a pin-homogenized variant that collapses each pin into a single region lives
//! in [`crate::xs_mesh_homogenized`].

use crate::error::{Error, Result};
use crate::material::MaterialLib;
use crate::scattering_matrix::ScatteringMatrix;

/// One equivalence class of cross sections, plus the list of FSRs it applies to.
///
/// The removal cross section is derived, not stored independently:
/// `xsmacrm[g] = xsmactr[g] - xsmacsc.self_scat(g)`, matching `XSMeshRegion::XSMeshRegion`.
#[derive(Clone, Debug, PartialEq)]
pub struct XSMeshRegion {
    reg: Vec<usize>,
    xsmactr: Vec<f64>,
    xsmacnf: Vec<f64>,
    xsmackf: Vec<f64>,
    xsmacch: Vec<f64>,
    xsmacrm: Vec<f64>,
    xsmacsc: ScatteringMatrix,
}

impl XSMeshRegion {
    /// Builds a region from its FSR list and per-group macroscopic cross sections.
    pub fn new(
        reg: Vec<usize>,
        xsmactr: Vec<f64>,
        xsmacnf: Vec<f64>,
        xsmackf: Vec<f64>,
        xsmacch: Vec<f64>,
        xsmacsc: ScatteringMatrix,
    ) -> Result<Self> {
        let ng = xsmactr.len();
        if xsmacnf.len() != ng || xsmackf.len() != ng || xsmacch.len() != ng {
            return Err(Error::Configuration(
                "xs mesh region cross-section vectors must all have the same group count".into(),
            ));
        }
        if xsmacsc.n_group() != ng {
            return Err(Error::Configuration(
                "xs mesh region scattering matrix group count does not match the other cross \
                 sections"
                    .into(),
            ));
        }

        let xsmacrm = (0..ng).map(|g| xsmactr[g] - xsmacsc.self_scat(g)).collect();

        Ok(Self {
            reg,
            xsmactr,
            xsmacnf,
            xsmackf,
            xsmacch,
            xsmacrm,
            xsmacsc,
        })
    }

    /// The FSR indices this region's cross sections apply to.
    #[must_use]
    pub fn reg(&self) -> &[usize] {
        &self.reg
    }

    /// Number of energy groups.
    #[must_use]
    pub fn n_group(&self) -> usize {
        self.xsmactr.len()
    }

    /// Transport cross section for group `g`.
    #[must_use]
    pub fn xsmactr(&self, g: usize) -> f64 {
        self.xsmactr[g]
    }

    /// Nu-fission cross section for group `g`.
    #[must_use]
    pub fn xsmacnf(&self, g: usize) -> f64 {
        self.xsmacnf[g]
    }

    /// Kappa-fission cross section for group `g`.
    #[must_use]
    pub fn xsmackf(&self, g: usize) -> f64 {
        self.xsmackf[g]
    }

    /// Fission spectrum fraction for group `g`.
    #[must_use]
    pub fn xsmacch(&self, g: usize) -> f64 {
        self.xsmacch[g]
    }

    /// Removal cross section for group `g` (`xsmactr[g] - xsmacsc.self_scat(g)`).
    #[must_use]
    pub fn xsmacrm(&self, g: usize) -> f64 {
        self.xsmacrm[g]
    }

    /// This region's scattering matrix.
    #[must_use]
    pub fn xsmacsc(&self) -> &ScatteringMatrix {
        &self.xsmacsc
    }

    /// `true` if this region has any positive nu-fission cross section.
    #[must_use]
    pub fn is_fissile(&self) -> bool {
        self.xsmacnf.iter().any(|&v| v > 0.0)
    }

    /// Replaces this region's cross sections in place, recomputing the removal cross section
    /// (`XSMeshRegion::update`).
    pub fn update(
        &mut self,
        xsmactr: Vec<f64>,
        xsmacnf: Vec<f64>,
        xsmackf: Vec<f64>,
        xsmacch: Vec<f64>,
        xsmacsc: ScatteringMatrix,
    ) -> Result<()> {
        let updated = Self::new(self.reg.clone(), xsmactr, xsmacnf, xsmackf, xsmacch, xsmacsc)?;
        *self = updated;
        Ok(())
    }
}

/// A complete cross-section mesh: every [`XSMeshRegion`] that partitions the FSRs of a
/// computational mesh, plus the energy group structure they're defined over.
///
/// `update()` is a no-op here, since a stock `XSMesh` only ever deals in un-homogenized,
/// macroscopic cross sections taken straight from the material library; homogenized variants
/// (`crate::xs_mesh_homogenized::XSMeshHomogenized`) override it to recompute region cross
/// sections from a flux state.
#[derive(Clone, Debug)]
pub struct XSMesh {
    regions: Vec<XSMeshRegion>,
    eubounds: Vec<f64>,
    n_reg_expanded: usize,
}

impl XSMesh {
    /// Builds an un-homogenized mesh by grouping every FSR that shares the same material ID into
    /// one [`XSMeshRegion`], copying that material's cross sections verbatim.
    ///
    /// `fsr_materials[i]` is the material ID assigned to FSR `i`.
    pub fn new(fsr_materials: &[u32], mat_lib: &MaterialLib, eubounds: Vec<f64>) -> Result<Self> {
        let n_reg_expanded = fsr_materials.len();
        let ng = mat_lib.n_group();

        let mut order: Vec<u32> = Vec::new();
        let mut by_mat: std::collections::HashMap<u32, Vec<usize>> = std::collections::HashMap::new();
        for (ireg, &mid) in fsr_materials.iter().enumerate() {
            by_mat.entry(mid).or_insert_with(|| {
                order.push(mid);
                Vec::new()
            });
            by_mat.get_mut(&mid).unwrap().push(ireg);
        }

        let mut regions = Vec::with_capacity(order.len());
        for mid in order {
            let reg = by_mat.remove(&mid).unwrap();
            let material = mat_lib.get_by_id(mid)?;
            let xsmactr: Vec<f64> = (0..ng).map(|g| material.xstr(g)).collect();
            let xsmacnf: Vec<f64> = (0..ng).map(|g| material.xsnf(g)).collect();
            let xsmackf: Vec<f64> = (0..ng).map(|g| material.xskf(g)).collect();
            let xsmacch: Vec<f64> = (0..ng).map(|g| material.xsch(g)).collect();
            regions.push(XSMeshRegion::new(
                reg,
                xsmactr,
                xsmacnf,
                xsmackf,
                xsmacch,
                material.xssc().clone(),
            )?);
        }

        Ok(Self {
            regions,
            eubounds,
            n_reg_expanded,
        })
    }

    /// Builds a mesh directly from already-homogenized regions, used by
    /// [`crate::xs_mesh_homogenized::XSMeshHomogenized`] to share the iteration/accessor surface
    /// of the stock mesh.
    pub(crate) fn from_regions(regions: Vec<XSMeshRegion>, eubounds: Vec<f64>, n_reg_expanded: usize) -> Self {
        Self {
            regions,
            eubounds,
            n_reg_expanded,
        }
    }

    /// Number of energy groups.
    #[must_use]
    pub fn n_group(&self) -> usize {
        self.eubounds.len()
    }

    /// Number of distinct cross-section regions.
    #[must_use]
    pub fn size(&self) -> usize {
        self.regions.len()
    }

    /// Iterates over every region, in the order they were constructed.
    pub fn iter(&self) -> impl Iterator<Item = &XSMeshRegion> {
        self.regions.iter()
    }

    /// Mutably iterates over every region, used to re-homogenize in place.
    pub(crate) fn regions_mut(&mut self) -> impl Iterator<Item = &mut XSMeshRegion> {
        self.regions.iter_mut()
    }

    /// Accesses region `i`.
    #[must_use]
    pub fn region(&self, i: usize) -> &XSMeshRegion {
        &self.regions[i]
    }

    /// Energy group upper bounds.
    #[must_use]
    pub fn eubounds(&self) -> &[f64] {
        &self.eubounds
    }

    /// Number of FSRs in the computational mesh this XS mesh was built from.
    #[must_use]
    pub const fn n_reg_expanded(&self) -> usize {
        self.n_reg_expanded
    }

    /// Recomputes cross sections if needed. The stock mesh only ever holds un-homogenized,
    /// macroscopic cross sections pulled directly from the material library, so this does
    /// nothing; homogenized meshes override the equivalent method to react to a new flux state.
    pub const fn update(&mut self) {}
}

/// A cache of one-group transport cross sections expanded out to every FSR, so that multiple
/// sweepers needing the same per-region value don't have to duplicate or redundantly re-expand it
/// (`ExpandedXS`).
#[derive(Clone, Debug, Default)]
pub struct ExpandedXs {
    xstr: Vec<f64>,
    group: Option<usize>,
}

impl ExpandedXs {
    /// Builds an expanded-XS cache sized to `n_reg_expanded` FSRs.
    #[must_use]
    pub fn new(n_reg_expanded: usize) -> Self {
        Self {
            xstr: vec![0.0; n_reg_expanded],
            group: None,
        }
    }

    /// The cached transport cross section for FSR `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> f64 {
        self.xstr[i]
    }

    /// Refreshes the cache for `group` from `xs_mesh`, unless it is already current.
    pub fn expand(&mut self, xs_mesh: &XSMesh, group: usize) {
        if self.group == Some(group) {
            return;
        }
        for region in xs_mesh.iter() {
            let xs = region.xsmactr(group);
            for &ireg in region.reg() {
                self.xstr[ireg] = xs;
            }
        }
        self.group = Some(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;

    fn lib_two_materials() -> MaterialLib {
        let mut lib = MaterialLib::new();
        let scat = ScatteringMatrix::from_dense(&[vec![0.2, 0.0], vec![0.1, 0.3]]).unwrap();
        let fuel = Material::new(vec![0.1, 0.2], vec![0.05, 0.1], vec![0.08, 0.15], vec![1.0, 0.0], scat.clone())
            .unwrap();
        let mod_ = Material::new(vec![0.01, 0.02], vec![0.0, 0.0], vec![0.0, 0.0], vec![0.0, 0.0], scat)
            .unwrap();
        lib.add("fuel", fuel).unwrap();
        lib.add("mod", mod_).unwrap();
        lib.assign_id(1, "fuel").unwrap();
        lib.assign_id(2, "mod").unwrap();
        lib
    }

    #[test]
    fn groups_fsrs_by_material_into_regions() {
        let lib = lib_two_materials();
        let fsr_materials = vec![1, 1, 2, 1];
        let mesh = XSMesh::new(&fsr_materials, &lib, vec![1e6, 1.0]).unwrap();
        assert_eq!(mesh.size(), 2);
        let fuel_region = mesh.iter().find(|r| r.reg().contains(&0)).unwrap();
        assert_eq!(fuel_region.reg(), &[0, 1, 3]);
        assert!(fuel_region.is_fissile());
    }

    #[test]
    fn removal_xs_is_transport_minus_self_scatter() {
        let lib = lib_two_materials();
        let fsr_materials = vec![1, 2];
        let mesh = XSMesh::new(&fsr_materials, &lib, vec![1e6, 1.0]).unwrap();
        let region = mesh.region(0);
        let expected = region.xsmactr(1) - region.xsmacsc().self_scat(1);
        assert!((region.xsmacrm(1) - expected).abs() < 1e-12);
    }

    #[test]
    fn expanded_xs_caches_until_group_changes() {
        let lib = lib_two_materials();
        let fsr_materials = vec![1, 2];
        let mesh = XSMesh::new(&fsr_materials, &lib, vec![1e6, 1.0]).unwrap();
        let mut cache = ExpandedXs::new(mesh.n_reg_expanded());
        cache.expand(&mesh, 0);
        assert!((cache.get(0) - mesh.iter().find(|r| r.reg().contains(&0)).unwrap().xsmactr(0)).abs() < 1e-12);
        assert!((cache.get(1) - mesh.iter().find(|r| r.reg().contains(&1)).unwrap().xsmactr(0)).abs() < 1e-12);
    }
}
