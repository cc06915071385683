//! Pin-homogenized cross-section mesh: one [`XSMeshRegion`] per pin, volume- or
//! flux-volume-weighted from the materials assigned to that pin's XS rings
//! (`spec.md` §3 "XSMeshHomogenized"; `src/core/xs_mesh_homogenized.hpp/.cpp`).
//!
//! HDF5 serialization of the homogenized mesh is an out-of-scope external collaborator
//! (`spec.md` §1); only the in-memory homogenization is implemented here.

use ndarray::Array2;

use crate::error::Result;
use crate::material::MaterialLib;
use crate::pin::Pin;
use crate::scattering_matrix::ScatteringMatrix;
use crate::xs_mesh::{XSMesh, XSMeshRegion};

/// The bookkeeping needed to re-homogenize one pin without holding a borrow of the originating
/// [`Pin`]: its mesh (for XS-ring FSR expansion), per-FSR areas, per-ring material IDs, and the
/// offset of its first FSR in the flat computational mesh.
#[derive(Clone, Debug)]
struct PinRecord {
    first_reg: usize,
    areas: Vec<f64>,
    mat_ids: Vec<u32>,
    n_fsrs_per_ring: Vec<usize>,
    vol: f64,
}

impl PinRecord {
    fn from_pin(pin: &Pin, first_reg: usize) -> Self {
        let mat_ids = pin.mat_ids().to_vec();
        let n_fsrs_per_ring = (0..mat_ids.len())
            .map(|xsreg| pin.mesh().n_fsrs_for_xs_region(xsreg))
            .collect();
        Self {
            first_reg,
            areas: pin.areas(),
            mat_ids,
            n_fsrs_per_ring,
            vol: pin.area(),
        }
    }
}

/// A cross-section mesh with one region per pin, homogenized from the pin's constituent
/// materials.
///
/// Homogenization is volume-weighted by default (`homogenize_region`, used at construction and
/// whenever no flux has been associated). Once [`Self::set_flux`] supplies a scalar flux over the
/// underlying fine mesh, [`Self::update`] switches to flux-volume weighting
/// (`homogenize_region_flux`), matching `XSMeshHomogenized::update`.
#[derive(Clone, Debug)]
pub struct XSMeshHomogenized {
    base: XSMesh,
    pins: Vec<PinRecord>,
    flux: Option<Array2<f64>>,
}

impl XSMeshHomogenized {
    /// Builds a pin-homogenized mesh. `pins` pairs each pin with the index of its first FSR in
    /// the flat computational mesh; the resulting regions are in the same order.
    pub fn new(pins: &[(&Pin, usize)], mat_lib: &MaterialLib, eubounds: Vec<f64>) -> Result<Self> {
        let ng = eubounds.len();
        let records: Vec<PinRecord> = pins
            .iter()
            .map(|&(pin, first_reg)| PinRecord::from_pin(pin, first_reg))
            .collect();

        let n_reg_expanded = records
            .iter()
            .zip(pins.iter())
            .map(|(r, &(pin, _))| r.first_reg + pin.n_reg())
            .max()
            .unwrap_or(0);

        let mut regions = Vec::with_capacity(records.len());
        for record in &records {
            regions.push(homogenize_region(record, mat_lib, ng)?);
        }

        Ok(Self {
            base: XSMesh::from_regions(regions, eubounds, n_reg_expanded),
            pins: records,
            flux: None,
        })
    }

    /// Number of energy groups.
    #[must_use]
    pub fn n_group(&self) -> usize {
        self.base.n_group()
    }

    /// Number of pin regions.
    #[must_use]
    pub fn size(&self) -> usize {
        self.base.size()
    }

    /// Iterates over every pin's homogenized region.
    pub fn iter(&self) -> impl Iterator<Item = &XSMeshRegion> {
        self.base.iter()
    }

    /// Accesses the homogenized region for pin `i`.
    #[must_use]
    pub fn region(&self, i: usize) -> &XSMeshRegion {
        self.base.region(i)
    }

    /// Energy group upper bounds.
    #[must_use]
    pub fn eubounds(&self) -> &[f64] {
        self.base.eubounds()
    }

    /// Number of FSRs in the underlying fine mesh.
    #[must_use]
    pub const fn n_reg_expanded(&self) -> usize {
        self.base.n_reg_expanded()
    }

    /// Associates a fine-mesh scalar flux, shaped `(n_reg_expanded, n_group)`, to be used by the
    /// next [`Self::update`] for flux-volume weighting (`XSMeshHomogenized::set_flux`).
    pub fn set_flux(&mut self, flux: Array2<f64>) {
        self.flux = Some(flux);
    }

    /// Re-homogenizes every pin region. If a flux has been associated via [`Self::set_flux`],
    /// uses flux-volume weighting; otherwise this is a no-op, preserving the volume-weighted
    /// cross sections computed at construction (`XSMeshHomogenized::update`).
    pub fn update(&mut self, mat_lib: &MaterialLib) -> Result<()> {
        let Some(flux) = &self.flux else {
            return Ok(());
        };
        let ng = self.n_group();
        for (region, record) in self.base.regions_mut().zip(self.pins.iter()) {
            let new_region = homogenize_region_flux(record, mat_lib, ng, flux)?;
            *region = new_region;
        }
        Ok(())
    }
}

/// Volume-weighted homogenization of one pin's materials into a single [`XSMeshRegion`]
/// (`XSMeshHomogenized::homogenize_region`).
fn homogenize_region(record: &PinRecord, mat_lib: &MaterialLib, ng: usize) -> Result<XSMeshRegion> {
    let mut xstr = vec![0.0; ng];
    let mut xsnf = vec![0.0; ng];
    let mut xskf = vec![0.0; ng];
    let mut xsch = vec![0.0; ng];
    let mut scat = vec![vec![0.0; ng]; ng];
    let mut fvol = 0.0;

    for ig in 0..ng {
        let mut local_fsr = 0usize;
        for (xsreg, &mid) in record.mat_ids.iter().enumerate() {
            let material = mat_lib.get_by_id(mid)?;
            let fsrc: f64 = (0..ng).map(|igg| material.xsnf(igg)).sum();
            let n_fsr = record.n_fsrs_per_ring[xsreg];
            for _ in 0..n_fsr {
                let vol = record.areas[local_fsr];
                if ig == 0 {
                    fvol += vol * fsrc;
                }
                xstr[ig] += vol * material.xstr(ig);
                xsnf[ig] += vol * material.xsnf(ig);
                xskf[ig] += vol * material.xskf(ig);
                xsch[ig] += vol * fsrc * material.xsch(ig);
                let row = material.xssc().to(ig);
                for (igg, v) in row.iter() {
                    scat[ig][igg] += v * vol;
                }
                local_fsr += 1;
            }
        }
    }

    for ig in 0..ng {
        xstr[ig] /= record.vol;
        xsnf[ig] /= record.vol;
        xskf[ig] /= record.vol;
        if fvol > 0.0 {
            xsch[ig] /= fvol;
        }
        for igg in 0..ng {
            scat[ig][igg] /= record.vol;
        }
    }

    let scat = ScatteringMatrix::from_dense(&scat)?;
    XSMeshRegion::new(
        (record.first_reg..record.first_reg + record.areas.len()).collect(),
        xstr,
        xsnf,
        xskf,
        xsch,
        scat,
    )
}

/// Flux-volume-weighted homogenization of one pin's materials into a single [`XSMeshRegion`]
/// (`XSMeshHomogenized::homogenize_region_flux`).
///
/// The scattering weight for destination group `ig`'s contribution from source group `igg` uses
/// the flux in `igg` (the source/column group), not `ig`, matching the original exactly.
fn homogenize_region_flux(
    record: &PinRecord,
    mat_lib: &MaterialLib,
    ng: usize,
    flux: &Array2<f64>,
) -> Result<XSMeshRegion> {
    let n_local = record.areas.len();

    let mut fs = vec![0.0; n_local];
    {
        let mut local_fsr = 0usize;
        for (xsreg, &mid) in record.mat_ids.iter().enumerate() {
            let material = mat_lib.get_by_id(mid)?;
            let n_fsr = record.n_fsrs_per_ring[xsreg];
            for _ in 0..n_fsr {
                let ireg = record.first_reg + local_fsr;
                let vol = record.areas[local_fsr];
                let mut acc = 0.0;
                for ig in 0..ng {
                    acc += material.xsnf(ig) * flux[[ireg, ig]] * vol;
                }
                fs[local_fsr] = acc;
                local_fsr += 1;
            }
        }
    }
    let fs_sum: f64 = fs.iter().sum();

    let mut xstr = vec![0.0; ng];
    let mut xsnf = vec![0.0; ng];
    let mut xskf = vec![0.0; ng];
    let mut xsch = vec![0.0; ng];
    let mut scat = vec![vec![0.0; ng]; ng];

    for ig in 0..ng {
        let mut fluxvolsum = 0.0;
        let mut scatsum = vec![0.0; ng];
        let mut local_fsr = 0usize;
        for (xsreg, &mid) in record.mat_ids.iter().enumerate() {
            let material = mat_lib.get_by_id(mid)?;
            let n_fsr = record.n_fsrs_per_ring[xsreg];
            for _ in 0..n_fsr {
                let ireg = record.first_reg + local_fsr;
                let vol = record.areas[local_fsr];
                let flux_i = flux[[ireg, ig]];

                fluxvolsum += vol * flux_i;
                xstr[ig] += vol * flux_i * material.xstr(ig);
                xsnf[ig] += vol * flux_i * material.xsnf(ig);
                xskf[ig] += vol * flux_i * material.xskf(ig);
                xsch[ig] += fs[local_fsr] * material.xsch(ig);

                let row = material.xssc().to(ig);
                for (igg, v) in row.iter() {
                    let flux_igg = flux[[ireg, igg]];
                    scatsum[igg] += flux_igg * vol;
                    scat[ig][igg] += v * vol * flux_igg;
                }
                local_fsr += 1;
            }
        }

        for igg in 0..ng {
            if scat[ig][igg] > 0.0 {
                scat[ig][igg] /= scatsum[igg];
            }
        }
        xstr[ig] /= fluxvolsum;
        xsnf[ig] /= fluxvolsum;
        xskf[ig] /= fluxvolsum;
        if fs_sum > 0.0 {
            xsch[ig] /= fs_sum;
        }
    }

    let scat = ScatteringMatrix::from_dense(&scat)?;
    XSMeshRegion::new(
        (record.first_reg..record.first_reg + n_local).collect(),
        xstr,
        xsnf,
        xskf,
        xsch,
        scat,
    )
}
