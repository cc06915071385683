//! Geometric primitives: points, lines, circles, and axis-aligned boxes, with
//! floating-point-safe intersection and coincidence queries.

use crate::fp::{ulp_eq, ulp_le};

/// A point in the xy-plane. Equality is ULP-tolerant (`spec.md` §3).
#[derive(Clone, Copy, Debug)]
pub struct Point2 {
    /// x coordinate.
    pub x: f64,
    /// y coordinate.
    pub y: f64,
}

impl Point2 {
    /// Constructs a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(&self, other: Self) -> f64 {
        (*self - other).norm()
    }

    /// Squared euclidean norm of the position vector.
    #[must_use]
    pub fn norm_sq(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean norm of the position vector.
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.norm_sq().sqrt()
    }

    /// Angle of the position vector about the origin, in `[0, 2*pi)`.
    #[must_use]
    pub fn azimuth(&self) -> f64 {
        let a = self.y.atan2(self.x);
        if a < 0.0 {
            a + std::f64::consts::TAU
        } else {
            a
        }
    }
}

impl PartialEq for Point2 {
    fn eq(&self, other: &Self) -> bool {
        ulp_eq(self.x, other.x) && ulp_eq(self.y, other.y)
    }
}

impl std::ops::Sub for Point2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Add for Point2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Mul<f64> for Point2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// A point in 3-space. Equality is ULP-tolerant.
#[derive(Clone, Copy, Debug)]
pub struct Point3 {
    /// x coordinate.
    pub x: f64,
    /// y coordinate.
    pub y: f64,
    /// z coordinate.
    pub z: f64,
}

impl Point3 {
    /// Constructs a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Projects onto the xy-plane, dropping the z coordinate.
    #[must_use]
    pub const fn xy(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

impl PartialEq for Point3 {
    fn eq(&self, other: &Self) -> bool {
        ulp_eq(self.x, other.x) && ulp_eq(self.y, other.y) && ulp_eq(self.z, other.z)
    }
}

/// An infinite (for intersection purposes, a segment with clamped parameter range) line through
/// two points, used both for pin-boundary grid lines and for ray chords.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    /// First endpoint (for a grid line this is simply one representative point; for a ray chord
    /// it is the entry point).
    pub p1: Point2,
    /// Second endpoint.
    pub p2: Point2,
}

impl Line {
    /// Constructs a new line segment.
    #[must_use]
    pub const fn new(p1: Point2, p2: Point2) -> Self {
        Self { p1, p2 }
    }

    /// Direction vector `p2 - p1` (not normalized).
    #[must_use]
    pub fn direction(&self) -> Point2 {
        self.p2 - self.p1
    }

    /// Returns `true` if this line is (to ULP tolerance) vertical.
    #[must_use]
    pub fn is_vertical(&self) -> bool {
        ulp_eq(self.p1.x, self.p2.x)
    }

    /// Returns `true` if this line is (to ULP tolerance) horizontal.
    #[must_use]
    pub fn is_horizontal(&self) -> bool {
        ulp_eq(self.p1.y, self.p2.y)
    }

    /// Intersection of this (infinite) line with another (infinite) line, if one exists and is
    /// not the degenerate case of two parallel or coincident lines.
    #[must_use]
    pub fn intersect_line(&self, other: &Self) -> Option<Point2> {
        let d1 = self.direction();
        let d2 = other.direction();
        let denom = d1.x * d2.y - d1.y * d2.x;

        if ulp_eq(denom, 0.0) {
            return None;
        }

        let diff = other.p1 - self.p1;
        let t = (diff.x * d2.y - diff.y * d2.x) / denom;

        Some(self.p1 + d1 * t)
    }

    /// Intersection of this line segment with a circle centered at `center` with radius `r`,
    /// via the standard line/circle quadratic. Returns zero, one (tangent), or two points, the
    /// two-point case ordered by increasing parameter `t` along `self`.
    #[must_use]
    pub fn intersect_circle(&self, center: Point2, r: f64) -> arrayvec::ArrayVec<Point2, 2> {
        let mut out = arrayvec::ArrayVec::new();
        let d = self.direction();
        let f = self.p1 - center;

        let a = d.norm_sq();
        let b = 2.0 * (f.x * d.x + f.y * d.y);
        let c = f.norm_sq() - r * r;

        let disc = b * b - 4.0 * a * c;

        if disc < 0.0 {
            return out;
        }

        if ulp_eq(disc, 0.0) {
            // tangent: treated as zero crossings per spec.md §4.1 ("degenerate circle-tangent
            // intersections are ignored").
            return out;
        }

        let sqrt_disc = disc.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);

        out.push(self.p1 + d * t1);
        out.push(self.p1 + d * t2);
        out
    }
}

/// A circle in the xy-plane. Equality is ULP-tolerant.
#[derive(Clone, Copy, Debug)]
pub struct Circle {
    /// Center.
    pub center: Point2,
    /// Radius.
    pub radius: f64,
}

impl Circle {
    /// Constructs a new circle.
    #[must_use]
    pub const fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Returns `true` if `p` lies on the circle to ULP tolerance.
    #[must_use]
    pub fn contains_boundary(&self, p: Point2) -> bool {
        ulp_eq(p.distance(self.center), self.radius)
    }
}

impl PartialEq for Circle {
    fn eq(&self, other: &Self) -> bool {
        self.center == other.center && ulp_eq(self.radius, other.radius)
    }
}

/// An axis-aligned box, used both for pin/lattice/assembly bounding extents and for the overall
/// core bounding box that ray generation clips against (`spec.md` §4.4 step 2).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Box2 {
    /// Minimum corner.
    pub lo: Point2,
    /// Maximum corner.
    pub hi: Point2,
}

impl Box2 {
    /// Constructs a new box from its low and high corners.
    #[must_use]
    pub const fn new(lo: Point2, hi: Point2) -> Self {
        Self { lo, hi }
    }

    /// Width along x.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.hi.x - self.lo.x
    }

    /// Height along y.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.hi.y - self.lo.y
    }

    /// Returns `true` if `p` lies within the box, inclusive of the boundary to ULP tolerance.
    #[must_use]
    pub fn contains(&self, p: Point2) -> bool {
        ulp_le(self.lo.x, p.x)
            && ulp_le(p.x, self.hi.x)
            && ulp_le(self.lo.y, p.y)
            && ulp_le(p.y, self.hi.y)
    }

    /// Intersects a ray (origin `p`, direction `dir`, both components non-zero in typical use)
    /// with the box boundary, returning the forward exit point (largest positive parameter).
    /// Used to find where a modular ray generated on one domain face exits through the opposite
    /// or adjacent face.
    #[must_use]
    pub fn exit_point(&self, p: Point2, dir: Point2) -> Point2 {
        let tx = if dir.x > 0.0 {
            (self.hi.x - p.x) / dir.x
        } else if dir.x < 0.0 {
            (self.lo.x - p.x) / dir.x
        } else {
            f64::INFINITY
        };

        let ty = if dir.y > 0.0 {
            (self.hi.y - p.y) / dir.y
        } else if dir.y < 0.0 {
            (self.lo.y - p.y) / dir.y
        } else {
            f64::INFINITY
        };

        let t = tx.min(ty);
        p + dir * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_ulp_equality() {
        let a = Point2::new(0.1 + 0.2, 1.0);
        let b = Point2::new(0.3, 1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn line_line_intersection() {
        let a = Line::new(Point2::new(0.0, 0.0), Point2::new(2.0, 2.0));
        let b = Line::new(Point2::new(0.0, 2.0), Point2::new(2.0, 0.0));
        let p = a.intersect_line(&b).unwrap();
        assert_eq!(p, Point2::new(1.0, 1.0));
    }

    #[test]
    fn parallel_lines_have_no_intersection() {
        let a = Line::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        let b = Line::new(Point2::new(0.0, 1.0), Point2::new(1.0, 1.0));
        assert!(a.intersect_line(&b).is_none());
    }

    #[test]
    fn line_circle_two_points() {
        let line = Line::new(Point2::new(-2.0, 0.0), Point2::new(2.0, 0.0));
        let circle = Circle::new(Point2::new(0.0, 0.0), 1.0);
        let pts = line.intersect_circle(circle.center, circle.radius);
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0], Point2::new(-1.0, 0.0));
        assert_eq!(pts[1], Point2::new(1.0, 0.0));
    }

    #[test]
    fn line_circle_tangent_counts_as_zero_crossings() {
        let line = Line::new(Point2::new(-2.0, 1.0), Point2::new(2.0, 1.0));
        let circle = Circle::new(Point2::new(0.0, 0.0), 1.0);
        let pts = line.intersect_circle(circle.center, circle.radius);
        assert!(pts.is_empty());
    }

    #[test]
    fn line_circle_miss() {
        let line = Line::new(Point2::new(-2.0, 5.0), Point2::new(2.0, 5.0));
        let circle = Circle::new(Point2::new(0.0, 0.0), 1.0);
        assert!(line.intersect_circle(circle.center, circle.radius).is_empty());
    }

    #[test]
    fn box_contains_boundary_points() {
        let b = Box2::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        assert!(b.contains(Point2::new(0.0, 0.5)));
        assert!(b.contains(Point2::new(1.0, 1.0)));
        assert!(!b.contains(Point2::new(1.0001, 0.5)));
    }

    #[test]
    fn box_exit_point_in_first_quadrant_direction() {
        let b = Box2::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let exit = b.exit_point(Point2::new(0.0, 0.0), Point2::new(1.0, 0.5));
        assert_eq!(exit, Point2::new(1.0, 0.5));
    }
}
