//! A single discrete direction in angular space, as used by [`crate::quadrature`].

use crate::fp::ulp_eq;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// A discrete direction, carrying both (alpha, theta) and the direction cosines, plus the
/// quadrature weight associated with it (`spec.md` §3 "Angle").
///
/// The azimuth `alpha` is restricted to an open subset of `[0, 2*pi)` excluding axis-aligned
/// values, so every angle lies unambiguously in one of the eight octants.
#[derive(Clone, Copy, Debug)]
pub struct Angle {
    /// Azimuthal angle, in `(0, 2*pi)`, excluding `pi/2`, `pi`, `3*pi/2`.
    pub alpha: f64,
    /// Polar angle, in `(0, pi)`.
    pub theta: f64,
    /// x direction cosine.
    pub ox: f64,
    /// y direction cosine.
    pub oy: f64,
    /// z direction cosine.
    pub oz: f64,
    /// Quadrature weight associated with this direction.
    pub weight: f64,
}

impl Angle {
    /// Constructs an angle from its azimuth, polar angle, and weight.
    #[must_use]
    pub fn from_alpha_theta(alpha: f64, theta: f64, weight: f64) -> Self {
        let sin_theta = theta.sin();
        Self {
            alpha,
            theta,
            ox: sin_theta * alpha.cos(),
            oy: sin_theta * alpha.sin(),
            oz: theta.cos(),
            weight,
        }
    }

    /// Constructs an angle from its direction cosines and weight.
    #[must_use]
    pub fn from_cosines(ox: f64, oy: f64, oz: f64, weight: f64) -> Self {
        let theta = oz.clamp(-1.0, 1.0).acos();
        let mut alpha = (ox / theta.sin()).clamp(-1.0, 1.0).acos();
        if oy < 0.0 {
            alpha = TAU - alpha;
        }
        Self {
            alpha,
            theta,
            ox,
            oy,
            oz,
            weight,
        }
    }

    /// Reciprocal of `sin(theta)`, used to convert a 2D projected segment length to a true
    /// 3D path length along the ray.
    #[must_use]
    pub fn rsintheta(&self) -> f64 {
        1.0 / self.theta.sin()
    }

    /// Returns this angle reflected into `octant` (1-indexed, following the mathematical
    /// convention `spec.md` uses), keeping the same weight. Octant numbering follows the
    /// standard convention: 1 = (+,+,+), 2 = (-,+,+), 3 = (-,-,+), 4 = (+,-,+), 5 = (+,+,-),
    /// 6 = (-,+,-), 7 = (-,-,-), 8 = (+,-,-).
    #[must_use]
    pub fn to_octant(&self, octant: u8) -> Self {
        assert!((1..=8).contains(&octant), "octant must be in 1..=8");

        let (sx, sy, sz) = match octant {
            1 => (1.0, 1.0, 1.0),
            2 => (-1.0, 1.0, 1.0),
            3 => (-1.0, -1.0, 1.0),
            4 => (1.0, -1.0, 1.0),
            5 => (1.0, 1.0, -1.0),
            6 => (-1.0, 1.0, -1.0),
            7 => (-1.0, -1.0, -1.0),
            8 => (1.0, -1.0, -1.0),
            _ => unreachable!(),
        };

        Self::from_cosines(
            sx * self.ox.abs(),
            sy * self.oy.abs(),
            sz * self.oz.abs(),
            self.weight,
        )
    }
}

impl PartialEq for Angle {
    fn eq(&self, other: &Self) -> bool {
        ulp_eq(self.ox, other.ox)
            && ulp_eq(self.oy, other.oy)
            && ulp_eq(self.oz, other.oz)
            && ulp_eq(self.alpha, other.alpha)
            && ulp_eq(self.theta, other.theta)
            && ulp_eq(self.weight, other.weight)
    }
}

/// Returns `true` if `alpha` is a valid first-octant azimuth, i.e. strictly inside `(0, pi/2)`.
#[must_use]
pub fn is_first_octant_azimuth(alpha: f64) -> bool {
    alpha > 0.0 && alpha < FRAC_PI_2 && !ulp_eq(alpha, 0.0) && !ulp_eq(alpha, FRAC_PI_2)
}

/// Returns `true` if `alpha` lies on an axis (0, pi/2, pi, or 3*pi/2), which is disallowed for
/// any angle in an [`crate::quadrature::AngularQuadrature`] (`spec.md` §3).
#[must_use]
pub fn is_axis_aligned(alpha: f64) -> bool {
    [0.0, FRAC_PI_2, PI, 1.5 * PI, TAU]
        .iter()
        .any(|&axis| ulp_eq(alpha, axis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_roundtrip() {
        let a = Angle::from_alpha_theta(0.7, 1.1, 1.0);
        let b = Angle::from_cosines(a.ox, a.oy, a.oz, a.weight);
        assert!(ulp_eq(a.alpha, b.alpha));
        assert!(ulp_eq(a.theta, b.theta));
    }

    #[test]
    fn octant_1_is_identity_up_to_sign() {
        let a = Angle::from_alpha_theta(0.3, 1.0, 2.0);
        let o1 = a.to_octant(1);
        assert!(ulp_eq(o1.ox, a.ox.abs()));
        assert!(ulp_eq(o1.oy, a.oy.abs()));
        assert!(ulp_eq(o1.oz, a.oz.abs()));
    }

    #[test]
    fn octant_reflections_match_mirrors() {
        let a = Angle::from_alpha_theta(0.3, 1.0, 2.0);
        let o2 = a.to_octant(2);
        assert!(o2.ox < 0.0);
        assert!(o2.oy > 0.0);
        assert!(o2.oz > 0.0);

        let o7 = a.to_octant(7);
        assert!(o7.ox < 0.0 && o7.oy < 0.0 && o7.oz < 0.0);
    }

    #[test]
    fn axis_aligned_detection() {
        assert!(is_axis_aligned(0.0));
        assert!(is_axis_aligned(FRAC_PI_2));
        assert!(is_axis_aligned(PI));
        assert!(!is_axis_aligned(0.3));
    }
}
