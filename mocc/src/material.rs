//! Per-material multigroup cross sections and the library that assigns them IDs
//! (`spec.md` §3 "Material", "MaterialLib"; `src/core/material.hpp`, `src/core/material_lib.hpp`).

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::scattering_matrix::ScatteringMatrix;

/// A single material's multigroup cross-section set.
///
/// The transport cross section is derived, not stored independently: `xstr[g] = xsab[g] +
/// xssc.out(g)`, i.e. absorption plus total scattering out of the group, following
/// `Material::Material` exactly.
#[derive(Clone, Debug)]
pub struct Material {
    xsab: Vec<f64>,
    xstr: Vec<f64>,
    xsnf: Vec<f64>,
    xskf: Vec<f64>,
    xsch: Vec<f64>,
    xssc: ScatteringMatrix,
}

impl Material {
    /// Builds a material from its absorption, nu-fission, kappa-fission, chi, and scattering
    /// cross sections. `chi` is renormalized to sum to 1 if any entry is positive, matching the
    /// original's "normalize chi" step; an all-zero chi (a non-fissile material) is left as-is.
    pub fn new(
        xsab: Vec<f64>,
        xsnf: Vec<f64>,
        xskf: Vec<f64>,
        mut xsch: Vec<f64>,
        xssc: ScatteringMatrix,
    ) -> Result<Self> {
        let ng = xsab.len();
        if xsnf.len() != ng || xskf.len() != ng || xsch.len() != ng {
            return Err(Error::Configuration(
                "material cross-section vectors must all have the same group count".into(),
            ));
        }
        if xssc.n_group() != ng {
            return Err(Error::Configuration(
                "material scattering matrix group count does not match the other cross sections"
                    .into(),
            ));
        }

        if xsch.iter().any(|&c| c > 0.0) {
            let chi_sum: f64 = xsch.iter().sum();
            for c in &mut xsch {
                *c /= chi_sum;
            }
        }

        let xstr = (0..ng).map(|g| xsab[g] + xssc.out(g)).collect();

        Ok(Self {
            xsab,
            xstr,
            xsnf,
            xskf,
            xsch,
            xssc,
        })
    }

    /// Number of energy groups this material is defined over.
    #[must_use]
    pub fn n_group(&self) -> usize {
        self.xsab.len()
    }

    /// Absorption cross section for group `g`.
    #[must_use]
    pub fn xsab(&self, g: usize) -> f64 {
        self.xsab[g]
    }

    /// Transport cross section for group `g` (`xsab[g] + xssc.out(g)`).
    #[must_use]
    pub fn xstr(&self, g: usize) -> f64 {
        self.xstr[g]
    }

    /// Nu-fission cross section for group `g`.
    #[must_use]
    pub fn xsnf(&self, g: usize) -> f64 {
        self.xsnf[g]
    }

    /// Kappa-fission (energy-release) cross section for group `g`.
    #[must_use]
    pub fn xskf(&self, g: usize) -> f64 {
        self.xskf[g]
    }

    /// Fission spectrum fraction for group `g`.
    #[must_use]
    pub fn xsch(&self, g: usize) -> f64 {
        self.xsch[g]
    }

    /// This material's scattering matrix.
    #[must_use]
    pub fn xssc(&self) -> &ScatteringMatrix {
        &self.xssc
    }

    /// `true` if any group has a positive nu-fission cross section.
    #[must_use]
    pub fn is_fissile(&self) -> bool {
        self.xsnf.iter().any(|&v| v > 0.0)
    }
}

/// A library of materials, indexed both by the dense position they were defined in and by the
/// externally-facing integer ID an input deck assigns to them (`spec.md` §3 supplement; `n_grp_`
/// mismatches across materials are rejected at assignment time, unlike the original which
/// silently assumes every library entry agrees).
#[derive(Clone, Debug, Default)]
pub struct MaterialLib {
    materials: Vec<Material>,
    names: HashMap<String, usize>,
    ids: HashMap<u32, usize>,
    n_group: Option<usize>,
}

impl MaterialLib {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named material to the library without assigning it an ID. Returns an error if its
    /// group count disagrees with materials already in the library.
    pub fn add(&mut self, name: impl Into<String>, material: Material) -> Result<()> {
        let name = name.into();
        match self.n_group {
            Some(ng) if ng != material.n_group() => {
                return Err(Error::Configuration(format!(
                    "material '{name}' has {} groups, library already has {ng}",
                    material.n_group()
                )));
            }
            None => self.n_group = Some(material.n_group()),
            _ => {}
        }

        let idx = self.materials.len();
        self.materials.push(material);
        self.names.insert(name, idx);
        Ok(())
    }

    /// Assigns an input-deck ID to a previously-added, named material
    /// (`MaterialLib::assignID`).
    pub fn assign_id(&mut self, id: u32, name: &str) -> Result<()> {
        let idx = *self
            .names
            .get(name)
            .ok_or_else(|| Error::Configuration(format!("no material named '{name}'")))?;
        self.ids.insert(id, idx);
        Ok(())
    }

    /// Number of materials that have been assigned an ID.
    #[must_use]
    pub fn n_materials(&self) -> usize {
        self.ids.len()
    }

    /// Number of energy groups spanned by the library, or `0` if empty.
    #[must_use]
    pub fn n_group(&self) -> usize {
        self.n_group.unwrap_or(0)
    }

    /// Returns `true` if `id` has been assigned a material.
    #[must_use]
    pub fn has(&self, id: u32) -> bool {
        self.ids.contains_key(&id)
    }

    /// Looks up a material by its assigned ID.
    pub fn get_by_id(&self, id: u32) -> Result<&Material> {
        let idx = self
            .ids
            .get(&id)
            .ok_or_else(|| Error::Configuration(format!("no material assigned to ID {id}")))?;
        Ok(&self.materials[*idx])
    }

    /// Looks up the input-deck ID a material was assigned under `name`, if any
    /// (`MaterialLib`'s name-to-ID table, used by diagnostics and by an external input-deck
    /// front-end to cross-reference a material name against its ID).
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<u32> {
        let idx = *self.names.get(name)?;
        self.ids.iter().find(|&(_, &i)| i == idx).map(|(&id, _)| id)
    }

    /// Iterates over all ID-assigned materials as `(id, material)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Material)> {
        self.ids.iter().map(|(&id, &idx)| (id, &self.materials[idx]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_scat(ng: usize) -> ScatteringMatrix {
        let mut dense = vec![vec![0.0; ng]; ng];
        for i in 0..ng {
            dense[i][i] = 0.2;
        }
        ScatteringMatrix::from_dense(&dense).unwrap()
    }

    #[test]
    fn transport_xs_is_absorption_plus_outscatter() {
        let scat = simple_scat(2);
        let m = Material::new(
            vec![0.1, 0.2],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            scat,
        )
        .unwrap();
        assert!((m.xstr(0) - 0.3).abs() < 1e-12);
        assert!((m.xstr(1) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn chi_is_renormalized_to_sum_one() {
        let scat = simple_scat(2);
        let m = Material::new(
            vec![0.1, 0.2],
            vec![0.05, 0.0],
            vec![0.05, 0.0],
            vec![2.0, 0.0],
            scat,
        )
        .unwrap();
        assert!((m.xsch(0) - 1.0).abs() < 1e-12);
        assert!(m.is_fissile());
    }

    #[test]
    fn all_zero_chi_is_left_untouched() {
        let scat = simple_scat(2);
        let m = Material::new(
            vec![0.1, 0.2],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            scat,
        )
        .unwrap();
        assert_eq!(m.xsch(0), 0.0);
        assert!(!m.is_fissile());
    }

    #[test]
    fn lib_assigns_and_looks_up_by_id() {
        let mut lib = MaterialLib::new();
        let scat = simple_scat(2);
        let m = Material::new(vec![0.1, 0.2], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2], scat)
            .unwrap();
        lib.add("UO2", m).unwrap();
        lib.assign_id(7, "UO2").unwrap();

        assert!(lib.has(7));
        assert_eq!(lib.n_materials(), 1);
        assert_eq!(lib.n_group(), 2);
        assert!(lib.get_by_id(8).is_err());
        assert_eq!(lib.id_by_name("UO2"), Some(7));
        assert_eq!(lib.id_by_name("B4C"), None);
    }

    #[test]
    fn lib_rejects_mismatched_group_counts() {
        let mut lib = MaterialLib::new();
        let m2 = Material::new(vec![0.1, 0.2], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2], simple_scat(2))
            .unwrap();
        let m3 = Material::new(
            vec![0.1, 0.2, 0.3],
            vec![0.0; 3],
            vec![0.0; 3],
            vec![0.0; 3],
            simple_scat(3),
        )
        .unwrap();
        lib.add("A", m2).unwrap();
        assert!(lib.add("B", m3).is_err());
    }
}
