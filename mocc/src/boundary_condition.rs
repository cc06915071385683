//! Per-group, per-angle, per-face angular-flux boundary buffers, with reflective/vacuum/periodic
//! update operators (`spec.md` §3 "BoundaryCondition", §4.5; `src/core/boundary_condition.hpp`).
//!
//! All faces for a given angle/group are stored consecutively, so client code that only needs
//! "the boundary values for this angle" need not reason about surface normals at all
//! (`src/core/boundary_condition.hpp`'s guarantee, kept here).

use crate::error::{Error, Result};
use crate::quadrature::{AngularQuadrature, Boundary, Normal, Surface};

/// The six domain-boundary conditions, one per face.
#[derive(Clone, Copy, Debug)]
pub struct BoundaryConditions {
    /// Boundary condition at the +x face.
    pub east: Boundary,
    /// Boundary condition at the +y face.
    pub north: Boundary,
    /// Boundary condition at the -x face.
    pub west: Boundary,
    /// Boundary condition at the -y face.
    pub south: Boundary,
    /// Boundary condition at the +z face.
    pub top: Boundary,
    /// Boundary condition at the -z face.
    pub bottom: Boundary,
}

impl BoundaryConditions {
    fn at(&self, surface: Surface) -> Boundary {
        match surface {
            Surface::East => self.east,
            Surface::North => self.north,
            Surface::West => self.west,
            Surface::South => self.south,
            Surface::Top => self.top,
            Surface::Bottom => self.bottom,
            Surface::Internal | Surface::Invalid => {
                panic!("Internal/Invalid surfaces have no boundary condition")
            }
        }
    }
}

/// Number of angular-flux values stored for one angle, split by normal direction.
pub type FaceSize = [usize; 3];

const NORMALS: [Normal; 3] = [Normal::X, Normal::Y, Normal::Z];

fn normal_idx(normal: Normal) -> usize {
    match normal {
        Normal::X => 0,
        Normal::Y => 1,
        Normal::Z => 2,
    }
}

/// A flat, group-major buffer of boundary angular fluxes for every angle and face position.
#[derive(Clone, Debug)]
pub struct BoundaryCondition {
    n_group: usize,
    n_angle: usize,
    boundaries: BoundaryConditions,
    sizes: Vec<FaceSize>,
    offset: Vec<[usize; 3]>,
    bc_per_group: usize,
    data: Vec<f64>,
}

impl BoundaryCondition {
    /// Builds a boundary condition buffer with a uniform per-face size for every angle (the Sn
    /// case).
    pub fn uniform(n_group: usize, n_angle: usize, boundaries: BoundaryConditions, n_bc: FaceSize) -> Self {
        Self::new(n_group, boundaries, vec![n_bc; n_angle])
    }

    /// Builds a boundary condition buffer where each angle has its own per-normal size (the MoC
    /// case, where face counts vary with the ray-spacing-modularized angle).
    pub fn new(n_group: usize, boundaries: BoundaryConditions, sizes: Vec<FaceSize>) -> Self {
        let n_angle = sizes.len();
        let mut offset = Vec::with_capacity(n_angle);
        let mut running = 0usize;
        for size in &sizes {
            let mut off = [0usize; 3];
            for (n, &s) in size.iter().enumerate() {
                off[n] = running;
                running += s;
            }
            offset.push(off);
        }
        let bc_per_group = running;

        Self {
            n_group,
            n_angle,
            boundaries,
            sizes,
            offset,
            bc_per_group,
            data: vec![0.0; n_group * bc_per_group],
        }
    }

    /// Total number of stored boundary values.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Sets every stored value to `val`.
    pub fn initialize_scalar(&mut self, val: f64) {
        self.data.iter_mut().for_each(|v| *v = val);
    }

    /// Initializes each group's entire boundary with `spectrum[group]`.
    pub fn initialize_spectrum(&mut self, spectrum: &[f64]) {
        assert_eq!(spectrum.len(), self.n_group);
        for (g, &val) in spectrum.iter().enumerate() {
            let start = g * self.bc_per_group;
            self.data[start..start + self.bc_per_group].fill(val);
        }
    }

    fn face_range(&self, group: usize, angle: usize, normal: Normal) -> std::ops::Range<usize> {
        let n = normal_idx(normal);
        let base = group * self.bc_per_group + self.offset[angle][n];
        base..base + self.sizes[angle][n]
    }

    /// Returns the boundary values for one angle's face along `normal`.
    #[must_use]
    pub fn face(&self, group: usize, angle: usize, normal: Normal) -> &[f64] {
        let range = self.face_range(group, angle, normal);
        &self.data[range]
    }

    /// Mutable access to one angle's face along `normal`.
    pub fn face_mut(&mut self, group: usize, angle: usize, normal: Normal) -> &mut [f64] {
        let range = self.face_range(group, angle, normal);
        &mut self.data[range]
    }

    /// Returns all stored values for one angle across every normal, since faces for a given
    /// angle/group are guaranteed contiguous.
    #[must_use]
    pub fn boundary(&self, group: usize, angle: usize) -> &[f64] {
        let size: usize = self.sizes[angle].iter().sum();
        let off = group * self.bc_per_group + self.offset[angle][0];
        &self.data[off..off + size]
    }

    /// Whole-group Jacobi update: every angle's incoming faces are recomputed from `out` using
    /// the domain's boundary conditions, as if every angle updated simultaneously.
    pub fn update(&mut self, group: usize, quad: &AngularQuadrature, out: &Self) -> Result<()> {
        for angle in 0..self.n_angle {
            self.update_angle(group, angle, quad, out)?;
        }
        Ok(())
    }

    /// Single-angle Gauss-Seidel update: only the faces belonging to `angle` are refreshed from
    /// `out`, letting later angles in the same sweep see this angle's already-updated incoming
    /// flux.
    pub fn update_angle(
        &mut self,
        group: usize,
        angle: usize,
        quad: &AngularQuadrature,
        out: &Self,
    ) -> Result<()> {
        let a = quad.angles().get(angle).ok_or_else(|| {
            Error::Geometry(format!("angle index {angle} out of range for this quadrature"))
        })?;

        for &normal in &NORMALS {
            if self.sizes[angle][normal_idx(normal)] == 0 {
                continue;
            }

            let entering = entering_surface(normal, a.ox, a.oy, a.oz);
            let boundary = self.boundaries.at(entering);

            match boundary {
                Boundary::Vacuum => {
                    self.face_mut(group, angle, normal).fill(0.0);
                }
                Boundary::Reflect => {
                    let reflected = quad.reflect(angle, normal);
                    let values = out.face(group, reflected, normal).to_vec();
                    self.face_mut(group, angle, normal).copy_from_slice(&values);
                }
                Boundary::Periodic => {
                    let values = out.face(group, angle, normal).to_vec();
                    self.face_mut(group, angle, normal).copy_from_slice(&values);
                }
                Boundary::Prescribed => {}
            }
        }
        Ok(())
    }
}

/// The domain face a ray travelling with direction cosines `(ox, oy, oz)` enters through, for the
/// given normal direction.
fn entering_surface(normal: Normal, ox: f64, oy: f64, oz: f64) -> Surface {
    match normal {
        Normal::X => {
            if ox > 0.0 {
                Surface::West
            } else {
                Surface::East
            }
        }
        Normal::Y => {
            if oy > 0.0 {
                Surface::South
            } else {
                Surface::North
            }
        }
        Normal::Z => {
            if oz > 0.0 {
                Surface::Bottom
            } else {
                Surface::Top
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vacuum_box() -> BoundaryConditions {
        BoundaryConditions {
            east: Boundary::Vacuum,
            north: Boundary::Vacuum,
            west: Boundary::Vacuum,
            south: Boundary::Vacuum,
            top: Boundary::Vacuum,
            bottom: Boundary::Vacuum,
        }
    }

    fn reflect_box() -> BoundaryConditions {
        BoundaryConditions {
            east: Boundary::Reflect,
            north: Boundary::Reflect,
            west: Boundary::Reflect,
            south: Boundary::Reflect,
            top: Boundary::Reflect,
            bottom: Boundary::Reflect,
        }
    }

    #[test]
    fn faces_are_contiguous_per_angle() {
        let bc = BoundaryCondition::new(1, vacuum_box(), vec![[2, 3, 0], [1, 1, 0]]);
        assert_eq!(bc.boundary(0, 0).len(), 5);
        assert_eq!(bc.boundary(0, 1).len(), 2);
    }

    // R2: update is idempotent for VACUUM.
    #[test]
    fn vacuum_update_is_idempotent() {
        let quad = AngularQuadrature::chebyshev_gauss(4, 3).unwrap();
        let n = quad.n_dir();
        let mut bc_in = BoundaryCondition::new(1, vacuum_box(), vec![[2, 2, 0]; n]);
        bc_in.initialize_scalar(5.0);
        let out = bc_in.clone();

        bc_in.update(0, &quad, &out).unwrap();
        let snapshot = bc_in.data.clone();
        bc_in.update(0, &quad, &out).unwrap();
        assert_eq!(bc_in.data, snapshot);
        assert!(bc_in.data.iter().all(|&v| v == 0.0));
    }

    // E4: after one update, each angle's incoming face equals the reflected angle's outgoing
    // face.
    #[test]
    fn reflect_update_pulls_from_reflected_angle() {
        let quad = AngularQuadrature::chebyshev_gauss(2, 3).unwrap();
        let n = quad.n_dir();
        let mut out = BoundaryCondition::new(1, reflect_box(), vec![[1, 1, 0]; n]);
        for angle in 0..n {
            out.face_mut(0, angle, Normal::X)[0] = angle as f64 + 1.0;
        }

        let mut bc_in = out.clone();
        bc_in.update(0, &quad, &out).unwrap();

        for angle in 0..n {
            let reflected = quad.reflect(angle, Normal::X);
            assert_eq!(
                bc_in.face(0, angle, Normal::X)[0],
                out.face(0, reflected, Normal::X)[0]
            );
        }
    }

    #[test]
    fn periodic_update_copies_same_angle_face() {
        let boundaries = BoundaryConditions {
            east: Boundary::Periodic,
            north: Boundary::Periodic,
            west: Boundary::Periodic,
            south: Boundary::Periodic,
            top: Boundary::Periodic,
            bottom: Boundary::Periodic,
        };
        let quad = AngularQuadrature::chebyshev_gauss(2, 2).unwrap();
        let n = quad.n_dir();
        let mut out = BoundaryCondition::new(1, boundaries, vec![[1, 0, 0]; n]);
        out.face_mut(0, 3, Normal::X)[0] = 42.0;

        let mut bc_in = out.clone();
        bc_in.update_angle(0, 3, &quad, &out).unwrap();
        assert_eq!(bc_in.face(0, 3, Normal::X)[0], 42.0);
    }
}
