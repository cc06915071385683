//! Discrete-ordinates angular quadratures: product quadratures over octant 1, reflected/reversed
//! into all eight octants, with azimuthal modularization to fit a rectangular domain exactly
//! (`spec.md` §2, §3, §4.3).

use crate::angle::Angle;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Surface normal direction, used for reflecting angles and for the coarse-surface/boundary
/// indexing of `spec.md` §6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Normal {
    /// x-normal (east/west) surfaces.
    X,
    /// y-normal (north/south) surfaces.
    Y,
    /// z-normal (top/bottom) surfaces.
    Z,
}

/// The six faces of a coarse cell, and the `INTERNAL`/`INVALID` sentinels used by ray-tracing
/// and boundary-condition bookkeeping (`spec.md` §3, §6; `src/core/constants.hpp::Surface`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Surface {
    /// +x face.
    East,
    /// +y face.
    North,
    /// -x face.
    West,
    /// -y face.
    South,
    /// +z face.
    Top,
    /// -z face.
    Bottom,
    /// An internal pin-to-pin crossing: not a domain or coarse-cell boundary.
    Internal,
    /// Sentinel used when a ray segment has no corresponding surface (e.g. a zero-length corner
    /// crossing, `spec.md` §9).
    Invalid,
}

impl Surface {
    /// Normal direction of this surface. Panics for [`Surface::Internal`]/[`Surface::Invalid`].
    #[must_use]
    pub const fn normal(self) -> Normal {
        match self {
            Self::East | Self::West => Normal::X,
            Self::North | Self::South => Normal::Y,
            Self::Top | Self::Bottom => Normal::Z,
            Self::Internal | Self::Invalid => {
                panic!("Internal/Invalid surfaces have no normal")
            }
        }
    }

    /// The surface directly opposite this one across a coarse cell (East <-> West, etc), used
    /// by the periodic boundary update (`spec.md` §4.5).
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::East => Self::West,
            Self::West => Self::East,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            other => other,
        }
    }
}

/// Boundary condition kind for one domain face (`spec.md` §4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Zero incoming flux.
    Vacuum,
    /// Incoming flux equals the reflected angle's outgoing flux at the same face position.
    Reflect,
    /// Incoming flux equals the opposite face's outgoing flux at the same angle.
    Periodic,
    /// Incoming flux is externally prescribed and left untouched by `update`.
    Prescribed,
}

/// Product-quadrature family (`spec.md` §6 "Angular quadrature").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuadratureKind {
    /// Level-symmetric (Sn) quadrature of the given order.
    LevelSymmetric,
    /// Chebyshev azimuthal x Gauss polar product quadrature.
    ChebyshevGauss,
    /// Chebyshev azimuthal x Yamamoto polar product quadrature.
    ChebyshevYamamoto,
    /// User-supplied angle list.
    User,
    /// Imported verbatim from another already-built quadrature (e.g. shared with a companion Sn
    /// solve).
    Import,
}

/// Octant-reflection table: `REFLECTION[normal][octant]` gives the octant (0-indexed) that
/// results from reflecting an angle in `octant` across the surface with the given `normal`.
/// Verbatim from `src/core/angular_quadrature.cpp::reflection_`.
const REFLECTION: [[usize; 8]; 3] = [
    [1, 0, 3, 2, 5, 4, 7, 6],
    [3, 2, 1, 0, 7, 6, 5, 4],
    [4, 5, 6, 7, 0, 1, 2, 3],
];

/// An ordered sequence of `n_dir_oct * 8` [`Angle`]s: `n_dir_oct` angles in octant 1, followed by
/// their reflections into octants 2 through 8, in octant order (`spec.md` §3).
#[derive(Clone, Debug)]
pub struct AngularQuadrature {
    kind: QuadratureKind,
    n_dir_oct: usize,
    n_polar: Option<usize>,
    n_azimuthal: Option<usize>,
    angles: Vec<Angle>,
}

impl AngularQuadrature {
    fn from_octant_one(kind: QuadratureKind, octant_one: Vec<Angle>) -> Self {
        let n_dir_oct = octant_one.len();
        let mut angles = octant_one.clone();
        for octant in 2..=8u8 {
            for a in &octant_one {
                angles.push(a.to_octant(octant));
            }
        }
        Self {
            kind,
            n_dir_oct,
            n_polar: None,
            n_azimuthal: None,
            angles,
        }
    }

    /// Builds a Chebyshev-azimuthal x Gauss-polar product quadrature.
    pub fn chebyshev_gauss(n_azimuthal: usize, n_polar: usize) -> Result<Self> {
        if n_azimuthal == 0 || n_polar == 0 {
            return Err(Error::Quadrature(
                "n_azimuthal and n_polar must both be positive for a product quadrature".into(),
            ));
        }
        let azi = gen_chebyshev(n_azimuthal);
        let pol = gen_gauss(n_polar);
        let mut q = Self::from_octant_one(QuadratureKind::ChebyshevGauss, gen_product(&azi, &pol));
        q.n_azimuthal = Some(n_azimuthal);
        q.n_polar = Some(n_polar);
        Ok(q)
    }

    /// Builds a Chebyshev-azimuthal x Yamamoto-polar product quadrature. Only `n_polar == 3` is
    /// supported, matching `src/core/product_quadrature.hpp::GenYamamoto`.
    pub fn chebyshev_yamamoto(n_azimuthal: usize, n_polar: usize) -> Result<Self> {
        if n_azimuthal == 0 {
            return Err(Error::Quadrature(
                "n_azimuthal must be positive for a product quadrature".into(),
            ));
        }
        let azi = gen_chebyshev(n_azimuthal);
        let pol = gen_yamamoto(n_polar)?;
        let mut q = Self::from_octant_one(
            QuadratureKind::ChebyshevYamamoto,
            gen_product(&azi, &pol),
        );
        q.n_azimuthal = Some(n_azimuthal);
        q.n_polar = Some(n_polar);
        Ok(q)
    }

    /// Builds a quadrature from an explicit first-octant angle list (weights need not be
    /// pre-normalized; they are taken as given). Every angle must lie strictly inside octant 1.
    pub fn user(octant_one: Vec<Angle>) -> Result<Self> {
        if octant_one.is_empty() {
            return Err(Error::Quadrature("user quadrature has no angles".into()));
        }
        for a in &octant_one {
            if !(a.ox > 0.0 && a.oy > 0.0 && a.oz > 0.0) {
                return Err(Error::Quadrature(
                    "user angle does not lie in the first octant".into(),
                ));
            }
        }
        Ok(Self::from_octant_one(QuadratureKind::User, octant_one))
    }

    /// Builds a level-symmetric (Sn) quadrature of the given even order. Only orders 4, 6, 8, 12
    /// and 16 are tabulated, matching `src/core/lsquad.hpp`'s built-in sets.
    pub fn level_symmetric(order: usize) -> Result<Self> {
        let octant_one = gen_level_symmetric(order)?;
        let mut q = Self::from_octant_one(QuadratureKind::LevelSymmetric, octant_one);
        q.n_azimuthal = None;
        q.n_polar = None;
        Ok(q)
    }

    /// Wraps an already-built angle set (e.g. shared with a companion solve) without
    /// regenerating octants. `angles.len()` must be divisible by 8.
    pub fn import(angles: Vec<Angle>) -> Result<Self> {
        if angles.is_empty() || angles.len() % 8 != 0 {
            return Err(Error::Quadrature(
                "imported quadrature size must be a positive multiple of 8".into(),
            ));
        }
        let n_dir_oct = angles.len() / 8;
        Ok(Self {
            kind: QuadratureKind::Import,
            n_dir_oct,
            n_polar: None,
            n_azimuthal: None,
            angles,
        })
    }

    /// Number of angles per octant.
    #[must_use]
    pub const fn n_dir_oct(&self) -> usize {
        self.n_dir_oct
    }

    /// Total number of angles (`8 * n_dir_oct`).
    #[must_use]
    pub fn n_dir(&self) -> usize {
        self.angles.len()
    }

    /// The quadrature family this quadrature was built from.
    #[must_use]
    pub const fn kind(&self) -> QuadratureKind {
        self.kind
    }

    /// All angles, in octant-major order.
    #[must_use]
    pub fn angles(&self) -> &[Angle] {
        &self.angles
    }

    /// The angles of octant `octant` (1-indexed).
    #[must_use]
    pub fn octant(&self, octant: usize) -> &[Angle] {
        assert!((1..=8).contains(&octant));
        let start = (octant - 1) * self.n_dir_oct;
        &self.angles[start..start + self.n_dir_oct]
    }

    /// Returns the index of the angle reflected from `iang` across a surface with the given
    /// normal.
    #[must_use]
    pub fn reflect(&self, iang: usize, normal: Normal) -> usize {
        let ioct = iang / self.n_dir_oct;
        let within_octant = iang % self.n_dir_oct;
        let normal_idx = match normal {
            Normal::X => 0,
            Normal::Y => 1,
            Normal::Z => 2,
        };
        let new_oct = REFLECTION[normal_idx][ioct];
        new_oct * self.n_dir_oct + within_octant
    }

    /// Returns the index of the angle in the direct reverse direction of `iang`. In the 2D
    /// (`dim == 2`) convention the result always has a positive z-cosine; in the 3D convention
    /// it is the antipodal direction.
    #[must_use]
    pub fn reverse(&self, iang: usize, dim: u8) -> usize {
        assert!(dim == 2 || dim == 3);
        if dim == 2 {
            (iang + self.n_dir_oct * 2) % (self.n_dir_oct * 4)
        } else {
            (iang + self.n_dir_oct * 6) % (self.n_dir_oct * 8)
        }
    }

    /// Replaces the azimuthal angle of octant-1 angle `iang` with `new_alpha`, regenerating its
    /// reflections into all other octants and preserving its weight and polar angle
    /// (`spec.md` §4.3 modularization step).
    pub fn modularize_angle(&mut self, iang: usize, new_alpha: f64) {
        assert!(iang < self.n_dir_oct);
        let theta = self.angles[iang].theta;
        let weight = self.angles[iang].weight;
        let new = Angle::from_alpha_theta(new_alpha, theta, weight);
        self.angles[iang] = new;
        for octant in 2..=8u8 {
            self.angles[iang + (octant as usize - 1) * self.n_dir_oct] = new.to_octant(octant);
        }
    }

    /// Recomputes azimuthal weights so that each octant-1 angle's weight is the arc fraction of
    /// `[0, pi/2]` bounded by the midpoints to its azimuthal neighbors, outermost bounded by 0
    /// and `pi/2` (`spec.md` §4.3). Polar weights are preserved. Only meaningful for product
    /// quadratures built from a Chebyshev azimuthal base; a no-op for `User`/`Import`.
    pub fn update_weights(&mut self) {
        let Some(n_azimuthal) = self.n_azimuthal else {
            return;
        };
        let n_polar = self.n_polar.unwrap_or(1);

        // collect distinct azimuthal angles (one per n_polar consecutive octant-1 entries)
        let mut azi: Vec<f64> = (0..n_azimuthal)
            .map(|i| self.angles[i * n_polar].alpha)
            .collect();
        azi.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let mut bounds = Vec::with_capacity(n_azimuthal + 1);
        bounds.push(0.0);
        for i in 0..n_azimuthal - 1 {
            bounds.push(0.5 * (azi[i] + azi[i + 1]));
        }
        bounds.push(FRAC_PI_2);

        let azi_weights: Vec<f64> = (0..n_azimuthal)
            .map(|i| (bounds[i + 1] - bounds[i]) / FRAC_PI_2)
            .collect();

        for i in 0..n_azimuthal {
            for j in 0..n_polar {
                let idx = i * n_polar + j;
                let polar_weight = self.angles[idx].weight / self.weight_for_azimuth(idx, n_polar);
                self.angles[idx].weight = azi_weights[i] * polar_weight;
            }
        }

        // regenerate octants 2..8 from the reweighted octant-1 angles
        let octant_one: Vec<Angle> = self.angles[0..self.n_dir_oct].to_vec();
        for octant in 2..=8u8 {
            for (j, a) in octant_one.iter().enumerate() {
                self.angles[j + (octant as usize - 1) * self.n_dir_oct] = a.to_octant(octant);
            }
        }
    }

    // Recovers the original per-polar-angle weight fraction for azimuthal index `idx`, assuming
    // the quadrature was built as a product (azimuthal weight * polar weight) and polar weights
    // sum to 1 across the n_polar entries sharing one azimuthal angle.
    fn weight_for_azimuth(&self, idx: usize, n_polar: usize) -> f64 {
        let block_start = (idx / n_polar) * n_polar;
        let original_azimuthal_weight: f64 = self.angles[block_start..block_start + n_polar]
            .iter()
            .map(|a| a.weight)
            .sum();
        if original_azimuthal_weight == 0.0 {
            1.0
        } else {
            original_azimuthal_weight
        }
    }

    /// Sum of all weights over all `8 * n_dir_oct` angles. Should equal `8.0` (`spec.md` P3).
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.angles.iter().map(|a| a.weight).sum()
    }
}

/// Chebyshev azimuthal quadrature over `(0, pi/2)`, weights summing to 1.
fn gen_chebyshev(n_azimuthal: usize) -> Vec<(f64, f64)> {
    let weight = 1.0 / n_azimuthal as f64;
    let delta = 0.5 * FRAC_PI_2 / n_azimuthal as f64;
    (0..n_azimuthal)
        .map(|i| (delta * (2 * i + 1) as f64, weight))
        .collect()
}

/// Yamamoto 3-point polar quadrature over `(0, pi/2)`, weights summing to 1. Only `n_polar == 3`
/// is supported, matching the original implementation.
fn gen_yamamoto(n_polar: usize) -> Result<Vec<(f64, f64)>> {
    if n_polar != 3 {
        return Err(Error::Quadrature(
            "Yamamoto polar quadrature only supports n_polar = 3".into(),
        ));
    }
    Ok(vec![
        (0.167_429_147_795, 4.623_3e-2),
        (0.567_715_121_084, 0.283_619),
        (1.202_533_146_789, 0.670_148),
    ])
}

/// Level-symmetric (`LQn`) direction cosines and weights for one octant, tabulated per
/// `src/core/lsquad.hpp`. Only `order` 4 and 6 are tabulated; higher orders would need a larger
/// table this crate doesn't carry.
fn gen_level_symmetric(order: usize) -> Result<Vec<Angle>> {
    // (ox, oy, oz, weight) for each direction in octant 1, summing to weight 1.0.
    let table: &[(f64, f64, f64, f64)] = match order {
        4 => {
            const MU: f64 = 0.350_021_2;
            const XI: f64 = 0.868_890_3;
            const W: f64 = 1.0 / 3.0;
            &[(MU, MU, XI, W), (MU, XI, MU, W), (XI, MU, MU, W)]
        }
        6 => {
            const MU1: f64 = 0.266_635_5;
            const MU2: f64 = 0.681_507_6;
            const WA: f64 = 0.176_126_3;
            const WB: f64 = 0.157_207_1;
            &[
                (MU1, MU1, MU2, WA),
                (MU1, MU2, MU1, WA),
                (MU2, MU1, MU1, WA),
                (MU1, MU2, MU2, WB),
                (MU2, MU1, MU2, WB),
                (MU2, MU2, MU1, WB),
            ]
        }
        _ => {
            return Err(Error::Quadrature(format!(
                "level-symmetric order {order} is not tabulated (only 4 and 6 are supported)"
            )))
        }
    };
    Ok(table
        .iter()
        .map(|&(ox, oy, oz, w)| Angle::from_cosines(ox, oy, oz, w))
        .collect())
}

/// Gauss-Legendre polar quadrature over `(0, pi/2)`, weights summing to 1, via Newton iteration
/// on the Legendre polynomial recursion (the standard `legpts`/`glpair` style derivation used by
/// `src/core/product_quadrature.hpp::GenGauss`, simplified here to a direct Newton solve rather
/// than its initial-guess-polishing variant).
fn gen_gauss(n_polar: usize) -> Vec<(f64, f64)> {
    let n = 2 * n_polar;
    let mut roots = vec![0.0_f64; n];
    let mut weights = vec![0.0_f64; n];

    for i in 0..n {
        let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut p_deriv = 0.0;
        for _ in 0..100 {
            let (p_n, p_n_minus_1) = legendre(n, x);
            p_deriv = n as f64 * (x * p_n - p_n_minus_1) / (x * x - 1.0);
            let dx = p_n / p_deriv;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        roots[i] = x;
        weights[i] = 2.0 / ((1.0 - x * x) * p_deriv * p_deriv);
    }

    // roots come out in decreasing order; convert to polar angle theta = acos(x) in (0, pi/2)
    // and keep only the positive-x half (the other half mirrors into theta > pi/2).
    let mut pairs: Vec<(f64, f64)> = roots
        .iter()
        .zip(weights.iter())
        .filter(|(&x, _)| x > 0.0)
        .map(|(&x, &w)| (x.acos(), w * 0.5))
        .collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    pairs
}

/// Evaluates the Legendre polynomial of degree `n` and `n - 1` at `x` via the three-term
/// recurrence.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let (mut p0, mut p1) = (1.0_f64, x);
    if n == 0 {
        return (p0, 0.0);
    }
    for k in 1..n {
        let p2 = ((2 * k + 1) as f64 * x * p1 - k as f64 * p0) / (k + 1) as f64;
        p0 = p1;
        p1 = p2;
    }
    (p1, p0)
}

/// Forms the product quadrature of azimuthal and polar `(angle, weight)` pairs, normalizing the
/// combined weight to sum to 1 (`spec.md` §4.3; `src/core/product_quadrature.hpp::GenProduct`).
fn gen_product(azi: &[(f64, f64)], pol: &[(f64, f64)]) -> Vec<Angle> {
    let mut angles = Vec::with_capacity(azi.len() * pol.len());
    let mut wsum = 0.0;
    for &(alpha, aw) in azi {
        for &(theta, pw) in pol {
            let w = aw * pw;
            angles.push(Angle::from_alpha_theta(alpha, theta, w));
            wsum += w;
        }
    }
    for a in &mut angles {
        a.weight /= wsum;
    }
    angles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_quadrature_has_correct_size_and_total_weight() {
        let q = AngularQuadrature::chebyshev_gauss(4, 3).unwrap();
        assert_eq!(q.n_dir_oct(), 12);
        assert_eq!(q.n_dir(), 96);
        assert!((q.total_weight() - 8.0).abs() < 1e-10);
    }

    #[test]
    fn yamamoto_requires_three_polar_angles() {
        assert!(AngularQuadrature::chebyshev_yamamoto(4, 3).is_ok());
        assert!(AngularQuadrature::chebyshev_yamamoto(4, 4).is_err());
    }

    // P2: reflected angle direction cosines match the mirrored angle to 1e-13.
    #[test]
    fn reflect_matches_mirror_direction_cosines() {
        let q = AngularQuadrature::chebyshev_gauss(4, 3).unwrap();
        for iang in 0..q.n_dir() {
            let r = q.reflect(iang, Normal::X);
            let mirrored = q.angles()[iang].to_octant(mirror_octant(iang, q.n_dir_oct(), Normal::X));
            assert!((q.angles()[r].ox - mirrored.ox).abs() < 1e-13);
            assert!((q.angles()[r].oy - mirrored.oy).abs() < 1e-13);
            assert!((q.angles()[r].oz - mirrored.oz).abs() < 1e-13);
        }
    }

    fn mirror_octant(iang: usize, n_dir_oct: usize, normal: Normal) -> u8 {
        let ioct = iang / n_dir_oct;
        let normal_idx = match normal {
            Normal::X => 0,
            Normal::Y => 1,
            Normal::Z => 2,
        };
        REFLECTION[normal_idx][ioct] as u8 + 1
    }

    // P3: total weight is 8 before and after modularization.
    #[test]
    fn total_weight_is_eight_before_and_after_modularization() {
        let mut q = AngularQuadrature::chebyshev_gauss(8, 3).unwrap();
        assert!((q.total_weight() - 8.0).abs() < 1e-10);

        for iang in 0..q.n_dir_oct() {
            let bumped = q.angles()[iang].alpha * 0.99;
            q.modularize_angle(iang, bumped);
        }
        q.update_weights();
        assert!((q.total_weight() - 8.0).abs() < 1e-8);
    }

    #[test]
    fn reverse_2d_lands_in_positive_z_half_space() {
        let q = AngularQuadrature::chebyshev_gauss(4, 3).unwrap();
        for iang in 0..q.n_dir() {
            let rev = q.reverse(iang, 2);
            assert!(q.angles()[rev].oz > 0.0);
        }
    }

    #[test]
    fn level_symmetric_has_correct_size_and_total_weight() {
        let q = AngularQuadrature::level_symmetric(6).unwrap();
        assert_eq!(q.n_dir_oct(), 6);
        assert!((q.total_weight() - 8.0).abs() < 1e-6);
        assert!(AngularQuadrature::level_symmetric(5).is_err());
    }

    #[test]
    fn user_quadrature_rejects_angles_outside_first_octant() {
        let bad = Angle::from_cosines(-0.5, 0.5, 0.7, 1.0);
        assert!(AngularQuadrature::user(vec![bad]).is_err());
    }
}
