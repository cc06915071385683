//! Pin-local 2D meshes: rectangular grids and cylindrical annuli-with-azimuthal-sectors, sharing
//! one dispatch interface (`spec.md` §3 "PinMesh", §4.1, §9 "Polymorphism over pin-mesh types").
//!
//! Implemented as a tagged variant rather than trait-object dispatch: new pin shapes are rare and
//! the `trace` method runs in the hottest loop in the solver, so static dispatch is worth the
//! inflexibility (`spec.md` §9).

use std::f64::consts::TAU;

use crate::error::{Error, Result};
use crate::fp::{ulp_eq, ulp_le};
use crate::geom::{Box2, Circle, Line, Point2};
use crate::quadrature::Surface;

/// A single ray-local direction, used only to break ties when a trace point lands exactly on a
/// mesh boundary (`spec.md` §4.1 "ties on circle/axis boundaries are broken using the direction
/// vector").
#[derive(Clone, Copy, Debug)]
pub struct Direction {
    /// x component.
    pub dx: f64,
    /// y component.
    pub dy: f64,
}

/// A rectangular pin subdivision: `nx` by `ny` cells, region-indexed row-major with y outer.
#[derive(Clone, Debug)]
pub struct RectMesh {
    nx: usize,
    ny: usize,
    pitch_x: f64,
    pitch_y: f64,
    x_bounds: Vec<f64>,
    y_bounds: Vec<f64>,
}

impl RectMesh {
    /// Builds a rectangular mesh with uniform subdivisions in each direction.
    pub fn uniform(pitch_x: f64, pitch_y: f64, nx: usize, ny: usize) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(Error::Geometry(
                "rectangular pin mesh must have at least one division in each direction".into(),
            ));
        }
        let x_bounds = (0..=nx).map(|i| pitch_x * i as f64 / nx as f64).collect();
        let y_bounds = (0..=ny).map(|i| pitch_y * i as f64 / ny as f64).collect();
        Ok(Self {
            nx,
            ny,
            pitch_x,
            pitch_y,
            x_bounds,
            y_bounds,
        })
    }

    fn region_index(&self, ix: usize, iy: usize) -> usize {
        iy * self.nx + ix
    }

    fn find_x(&self, x: f64, dx: f64) -> usize {
        for (ix, window) in self.x_bounds.windows(2).enumerate() {
            if ulp_le(window[0], x) && ulp_le(x, window[1]) {
                if ulp_eq(x, window[1]) && ix + 1 < self.nx && dx > 0.0 {
                    return ix + 1;
                }
                return ix;
            }
        }
        self.nx - 1
    }

    fn find_y(&self, y: f64, dy: f64) -> usize {
        for (iy, window) in self.y_bounds.windows(2).enumerate() {
            if ulp_le(window[0], y) && ulp_le(y, window[1]) {
                if ulp_eq(y, window[1]) && iy + 1 < self.ny && dy > 0.0 {
                    return iy + 1;
                }
                return iy;
            }
        }
        self.ny - 1
    }

    fn find_region(&self, p: Point2, dir: Direction) -> usize {
        let ix = self.find_x(p.x, dir.dx);
        let iy = self.find_y(p.y, dir.dy);
        self.region_index(ix, iy)
    }

    fn trace(&self, p1: Point2, p2: Point2, first_reg: usize) -> Vec<(f64, usize)> {
        let chord = Line::new(p1, p2);
        let dir = Direction {
            dx: p2.x - p1.x,
            dy: p2.y - p1.y,
        };

        let mut points = vec![p1, p2];
        for &x in &self.x_bounds[1..self.nx] {
            let v1 = Point2::new(x, 0.0);
            let v2 = Point2::new(x, self.pitch_y);
            if let Some(p) = chord.intersect_line(&Line::new(v1, v2)) {
                if on_segment(p1, p2, p) {
                    points.push(p);
                }
            }
        }
        for &y in &self.y_bounds[1..self.ny] {
            let h1 = Point2::new(0.0, y);
            let h2 = Point2::new(self.pitch_x, y);
            if let Some(p) = chord.intersect_line(&Line::new(h1, h2)) {
                if on_segment(p1, p2, p) {
                    points.push(p);
                }
            }
        }

        sort_and_dedup_along_chord(&mut points, p1);

        let mut segments = Vec::with_capacity(points.len() - 1);
        for w in points.windows(2) {
            let length = w[0].distance(w[1]);
            if ulp_eq(length, 0.0) {
                continue;
            }
            let mid = Point2::new((w[0].x + w[1].x) * 0.5, (w[0].y + w[1].y) * 0.5);
            let region = self.find_region(mid, dir);
            segments.push((length, first_reg + region));
        }
        segments
    }

    fn area_list(&self) -> Vec<f64> {
        let mut areas = Vec::with_capacity(self.nx * self.ny);
        for wy in self.y_bounds.windows(2) {
            let dy = wy[1] - wy[0];
            for wx in self.x_bounds.windows(2) {
                areas.push((wx[1] - wx[0]) * dy);
            }
        }
        areas
    }

    fn n_reg(&self) -> usize {
        self.nx * self.ny
    }

    fn draw(&self) -> String {
        let mut s = String::new();
        for iy in (0..self.ny).rev() {
            for ix in 0..self.nx {
                s.push_str(&format!("{:4}", self.region_index(ix, iy)));
            }
            s.push('\n');
        }
        s
    }
}

/// A cylindrical pin subdivision: concentric material rings, each further subdivided radially
/// into equal-area annuli, and the whole pin divided into a fixed number of azimuthal sectors.
#[derive(Clone, Debug)]
pub struct CylMesh {
    pitch_x: f64,
    pitch_y: f64,
    xs_radii: Vec<f64>,
    sub_rad: Vec<usize>,
    n_azi: usize,
    mesh_radii: Vec<f64>,
}

impl CylMesh {
    /// Builds a cylindrical mesh. `xs_radii` are the outer radii of each material ring
    /// (ascending, strictly less than half the smaller pitch dimension for the outermost ring to
    /// leave a moderator region); `sub_rad[i]` is the number of equal-area radial subdivisions
    /// within ring `i`; `n_azi` azimuthal sectors are applied uniformly to every ring
    /// (`spec.md` §4.1 "Cylindrical").
    pub fn new(
        pitch_x: f64,
        pitch_y: f64,
        xs_radii: Vec<f64>,
        sub_rad: Vec<usize>,
        n_azi: usize,
    ) -> Result<Self> {
        if xs_radii.is_empty() || xs_radii.len() != sub_rad.len() {
            return Err(Error::Geometry(
                "cylindrical pin mesh requires matching xs_radii and sub_rad vectors".into(),
            ));
        }
        if n_azi == 0 {
            return Err(Error::Geometry(
                "cylindrical pin mesh requires at least one azimuthal sector".into(),
            ));
        }
        for w in xs_radii.windows(2) {
            if w[1] <= w[0] {
                return Err(Error::Geometry("xs_radii must be strictly increasing".into()));
            }
        }

        let mut mesh_radii = Vec::new();
        let mut r_prev_ring = 0.0;
        let mut r = 0.0;
        for (&r_outer, &n_sub) in xs_radii.iter().zip(sub_rad.iter()) {
            if n_sub == 0 {
                return Err(Error::Geometry(
                    "each material ring needs at least one radial subdivision".into(),
                ));
            }
            let area_increment = (r_outer * r_outer - r_prev_ring * r_prev_ring) / n_sub as f64;
            for _ in 0..n_sub {
                r = (r * r + area_increment).sqrt();
                mesh_radii.push(r);
            }
            r_prev_ring = r_outer;
        }

        Ok(Self {
            pitch_x,
            pitch_y,
            xs_radii,
            sub_rad,
            n_azi,
            mesh_radii,
        })
    }

    fn center(&self) -> Point2 {
        Point2::new(self.pitch_x * 0.5, self.pitch_y * 0.5)
    }

    fn sector_index(&self, alpha: f64, dtheta: f64) -> usize {
        let width = TAU / self.n_azi as f64;
        let a = alpha.rem_euclid(TAU);
        let mut idx = (a / width).floor() as usize;
        if idx >= self.n_azi {
            idx = self.n_azi - 1;
        }
        // tie-break at a sector boundary using the direction of travel
        let boundary = idx as f64 * width;
        if ulp_eq(a, boundary) && dtheta < 0.0 {
            idx = (idx + self.n_azi - 1) % self.n_azi;
        }
        idx
    }

    fn radial_index(&self, r: f64, dr: f64) -> usize {
        for (i, &ring_r) in self.mesh_radii.iter().enumerate() {
            if ulp_le(r, ring_r) {
                if ulp_eq(r, ring_r) && i + 1 < self.mesh_radii.len() && dr > 0.0 {
                    return i + 1;
                }
                return i;
            }
        }
        self.mesh_radii.len() - 1
    }

    fn find_region(&self, p: Point2, dir: Direction) -> usize {
        let local = p - self.center();
        let r = local.norm();
        let radial = self.radial_index(r, local.x * dir.dx + local.y * dir.dy);
        // dtheta/dt along the ray direction, used only to break sector-boundary ties
        let dtheta = dir.dx * (-local.y) + dir.dy * local.x;
        let sector = self.sector_index(local.azimuth(), dtheta);
        radial * self.n_azi + sector
    }

    fn trace(&self, p1: Point2, p2: Point2, first_reg: usize) -> Vec<(f64, usize)> {
        let chord = Line::new(p1, p2);
        let center = self.center();
        let dir = Direction {
            dx: p2.x - p1.x,
            dy: p2.y - p1.y,
        };

        let mut points = vec![p1, p2];
        for &r in &self.mesh_radii {
            for pt in chord.intersect_circle(center, r) {
                if on_segment(p1, p2, pt) {
                    points.push(pt);
                }
            }
        }
        for k in 0..self.n_azi {
            let theta = TAU * k as f64 / self.n_azi as f64;
            if let Some(pt) = azimuthal_ray_intersect(&chord, center, theta) {
                if on_segment(p1, p2, pt) {
                    points.push(pt);
                }
            }
        }

        sort_and_dedup_along_chord(&mut points, p1);

        let mut segments = Vec::with_capacity(points.len().saturating_sub(1));
        for w in points.windows(2) {
            let length = w[0].distance(w[1]);
            if ulp_eq(length, 0.0) {
                continue;
            }
            let mid = Point2::new((w[0].x + w[1].x) * 0.5, (w[0].y + w[1].y) * 0.5);
            let region = self.find_region(mid, dir);
            segments.push((length, first_reg + region));
        }
        segments
    }

    fn area_list(&self) -> Vec<f64> {
        let mut areas = Vec::with_capacity(self.mesh_radii.len() * self.n_azi);
        let mut r_prev = 0.0;
        for &r in &self.mesh_radii {
            let annulus_area = std::f64::consts::PI * (r * r - r_prev * r_prev);
            for _ in 0..self.n_azi {
                areas.push(annulus_area / self.n_azi as f64);
            }
            r_prev = r;
        }
        areas
    }

    fn n_reg(&self) -> usize {
        self.mesh_radii.len() * self.n_azi
    }

    /// Number of FSRs belonging to XS ring `xsreg` (`spec.md` §3 "PinMesh"; mirrors
    /// `PinMesh_Cyl::n_fsrs`, which special-cases the moderator region past the last material
    /// ring).
    #[must_use]
    pub fn n_fsrs_for_xs_region(&self, xsreg: usize) -> usize {
        if xsreg < self.xs_radii.len() {
            self.sub_rad[xsreg] * self.n_azi
        } else {
            self.n_azi
        }
    }

    fn draw(&self) -> String {
        format!(
            "cylindrical pin: {} rings x {} azimuthal sectors",
            self.mesh_radii.len(),
            self.n_azi
        )
    }
}

/// Returns `true` if `p3` lies between `p1` and `p2` along their connecting segment, inclusive,
/// to ULP tolerance.
fn on_segment(p1: Point2, p2: Point2, p3: Point2) -> bool {
    let d = p2 - p1;
    let len_sq = d.norm_sq();
    if ulp_eq(len_sq, 0.0) {
        return p1 == p3;
    }
    let t = ((p3.x - p1.x) * d.x + (p3.y - p1.y) * d.y) / len_sq;
    ulp_le(-1e-9, t) && ulp_le(t, 1.0 + 1e-9)
}

/// Sorts `points` by their parameter along the chord starting at `origin` and removes ULP-close
/// duplicates, matching `spec.md` §4.1's "sort ... deduplicate with ULP tolerance" (generalized
/// to sort by position along the chord rather than by y-then-x, which only orders correctly for
/// axis-aligned chords).
fn sort_and_dedup_along_chord(points: &mut Vec<Point2>, origin: Point2) {
    points.sort_by(|a, b| {
        let da = (*a - origin).norm();
        let db = (*b - origin).norm();
        da.partial_cmp(&db).unwrap()
    });
    points.dedup_by(|a, b| a == b);
}

/// Intersects a chord with the half-line from `center` at azimuth `theta`.
fn azimuthal_ray_intersect(chord: &Line, center: Point2, theta: f64) -> Option<Point2> {
    let far = center + Point2::new(theta.cos(), theta.sin()) * 1e6;
    let ray = Line::new(center, far);
    let p = chord.intersect_line(&ray)?;
    let s = (p.x - center.x) * theta.cos() + (p.y - center.y) * theta.sin();
    if s >= -1e-9 {
        Some(p)
    } else {
        None
    }
}

/// The shared pin-mesh interface, implemented as a tagged variant over the two concrete mesh
/// kinds (`spec.md` §9 "Polymorphism over pin-mesh types").
#[derive(Clone, Debug)]
pub enum PinMesh {
    /// A rectangular grid subdivision.
    Rectangular(RectMesh),
    /// A cylindrical annuli-and-sectors subdivision.
    Cylindrical(CylMesh),
}

impl PinMesh {
    /// Pin pitch along x.
    #[must_use]
    pub fn pitch_x(&self) -> f64 {
        match self {
            Self::Rectangular(m) => m.pitch_x,
            Self::Cylindrical(m) => m.pitch_x,
        }
    }

    /// Pin pitch along y.
    #[must_use]
    pub fn pitch_y(&self) -> f64 {
        match self {
            Self::Rectangular(m) => m.pitch_y,
            Self::Cylindrical(m) => m.pitch_y,
        }
    }

    /// Total pin footprint area (`pitch_x * pitch_y`).
    #[must_use]
    pub fn vol(&self) -> f64 {
        self.pitch_x() * self.pitch_y()
    }

    /// Number of flat source regions in this pin.
    #[must_use]
    pub fn n_reg(&self) -> usize {
        match self {
            Self::Rectangular(m) => m.n_reg(),
            Self::Cylindrical(m) => m.n_reg(),
        }
    }

    /// Per-region areas, in region index order.
    #[must_use]
    pub fn area_list(&self) -> Vec<f64> {
        match self {
            Self::Rectangular(m) => m.area_list(),
            Self::Cylindrical(m) => m.area_list(),
        }
    }

    /// The region index containing `p`, breaking ties on a mesh boundary using `dir`.
    #[must_use]
    pub fn find_region(&self, p: Point2, dir: Direction) -> usize {
        match self {
            Self::Rectangular(m) => m.find_region(p, dir),
            Self::Cylindrical(m) => m.find_region(p, dir),
        }
    }

    /// Traces the chord from `p1` to `p2` (both on the pin boundary, in pin-local coordinates)
    /// and returns the ordered `(length, region_index)` segment list, region indices offset by
    /// `first_reg`.
    #[must_use]
    pub fn trace(&self, p1: Point2, p2: Point2, first_reg: usize) -> Vec<(f64, usize)> {
        match self {
            Self::Rectangular(m) => m.trace(p1, p2, first_reg),
            Self::Cylindrical(m) => m.trace(p1, p2, first_reg),
        }
    }

    /// Number of FSRs belonging to XS region `xsreg` (for a rectangular mesh, always `1`; for a
    /// cylindrical mesh, the ring's radial-times-azimuthal subdivision count).
    #[must_use]
    pub fn n_fsrs_for_xs_region(&self, xsreg: usize) -> usize {
        match self {
            Self::Rectangular(_) => 1,
            Self::Cylindrical(m) => m.n_fsrs_for_xs_region(xsreg),
        }
    }

    /// An ASCII rendering of the region layout, for debugging (`PinMesh::draw` in the original).
    #[must_use]
    pub fn draw(&self) -> String {
        match self {
            Self::Rectangular(m) => m.draw(),
            Self::Cylindrical(m) => m.draw(),
        }
    }

    /// Finds the distance from `p` to the next internal grid line or the pin's outer boundary
    /// along `dir`, skipping the surface currently marked `coincident` (the one the ray just
    /// left). Used by ray generation to step a ray forward through a pin without a full trace.
    #[must_use]
    pub fn distance_to_surface(
        &self,
        p: Point2,
        dir: Direction,
        coincident: Option<Surface>,
    ) -> (f64, Surface) {
        let bbox = Box2::new(Point2::new(0.0, 0.0), Point2::new(self.pitch_x(), self.pitch_y()));
        let exit = bbox.exit_point(p, Point2::new(dir.dx, dir.dy));
        let d_outer = p.distance(exit);
        let outer_surface = outer_surface_for_exit(exit, bbox);

        match self {
            Self::Rectangular(m) => {
                let mut best = (d_outer, outer_surface);
                for &x in &m.x_bounds[1..m.nx] {
                    if dir.dx.abs() < 1e-15 {
                        continue;
                    }
                    let t = (x - p.x) / dir.dx;
                    if t > 1e-9 && t < best.0 && Some(Surface::Internal) != coincident {
                        let y = p.y + dir.dy * t;
                        if ulp_le(0.0, y) && ulp_le(y, m.pitch_y) {
                            best = (t, Surface::Internal);
                        }
                    }
                }
                for &y in &m.y_bounds[1..m.ny] {
                    if dir.dy.abs() < 1e-15 {
                        continue;
                    }
                    let t = (y - p.y) / dir.dy;
                    if t > 1e-9 && t < best.0 {
                        let x = p.x + dir.dx * t;
                        if ulp_le(0.0, x) && ulp_le(x, m.pitch_x) {
                            best = (t, Surface::Internal);
                        }
                    }
                }
                best
            }
            Self::Cylindrical(m) => {
                let chord = Line::new(p, p + Point2::new(dir.dx, dir.dy) * (d_outer * 2.0 + 1.0));
                let center = m.center();
                let mut best = (d_outer, outer_surface);
                for &r in &m.mesh_radii {
                    for pt in chord.intersect_circle(center, r) {
                        let t = p.distance(pt);
                        if t > 1e-9 && t < best.0 {
                            best = (t, Surface::Internal);
                        }
                    }
                }
                for k in 0..m.n_azi {
                    let theta = TAU * k as f64 / m.n_azi as f64;
                    if let Some(pt) = azimuthal_ray_intersect(&chord, center, theta) {
                        let t = p.distance(pt);
                        if t > 1e-9 && t < best.0 {
                            best = (t, Surface::Internal);
                        }
                    }
                }
                best
            }
        }
    }
}

fn outer_surface_for_exit(exit: Point2, bbox: Box2) -> Surface {
    if ulp_eq(exit.x, bbox.hi.x) {
        Surface::East
    } else if ulp_eq(exit.x, bbox.lo.x) {
        Surface::West
    } else if ulp_eq(exit.y, bbox.hi.y) {
        Surface::North
    } else {
        Surface::South
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_mesh_region_count_and_areas() {
        let m = RectMesh::uniform(1.26, 1.26, 2, 2).unwrap();
        assert_eq!(m.n_reg(), 4);
        let areas = m.area_list();
        assert_eq!(areas.len(), 4);
        assert!((areas.iter().sum::<f64>() - 1.26 * 1.26).abs() < 1e-10);
    }

    #[test]
    fn rect_mesh_1x1_is_a_single_region_covering_the_full_pin() {
        let m = RectMesh::uniform(1.26, 1.26, 1, 1).unwrap();
        assert_eq!(m.n_reg(), 1);
        let areas = m.area_list();
        assert_eq!(areas.len(), 1);
        assert!((areas[0] - 1.26 * 1.26).abs() < 1e-10);
    }

    #[test]
    fn rect_mesh_trace_conserves_chord_length() {
        let m = PinMesh::Rectangular(RectMesh::uniform(1.0, 1.0, 4, 4).unwrap());
        let p1 = Point2::new(0.0, 0.2);
        let p2 = Point2::new(1.0, 0.8);
        let segs = m.trace(p1, p2, 0);
        let total: f64 = segs.iter().map(|(l, _)| l).sum();
        assert!((total - p1.distance(p2)).abs() < 1e-9);
        assert!(!segs.is_empty());
    }

    #[test]
    fn rect_mesh_row_major_region_indexing() {
        let m = RectMesh::uniform(2.0, 2.0, 2, 2).unwrap();
        let dir = Direction { dx: 1.0, dy: 1.0 };
        assert_eq!(m.find_region(Point2::new(0.5, 0.5), dir), 0);
        assert_eq!(m.find_region(Point2::new(1.5, 0.5), dir), 1);
        assert_eq!(m.find_region(Point2::new(0.5, 1.5), dir), 2);
        assert_eq!(m.find_region(Point2::new(1.5, 1.5), dir), 3);
    }

    #[test]
    fn cyl_mesh_equal_area_annuli_within_a_ring() {
        let m = CylMesh::new(1.26, 1.26, vec![0.4, 0.5], vec![2, 1], 4).unwrap();
        let areas = m.area_list();
        // first ring has 2 radial subs * 4 sectors = 8 entries, each should be equal
        let ring0: Vec<f64> = areas[0..8].to_vec();
        let first = ring0[0];
        assert!(ring0.iter().all(|&a| (a - first).abs() < 1e-10));
    }

    #[test]
    fn cyl_mesh_trace_conserves_chord_length() {
        let mesh = CylMesh::new(1.26, 1.26, vec![0.3, 0.4], vec![1, 1], 8).unwrap();
        let m = PinMesh::Cylindrical(mesh);
        let p1 = Point2::new(0.0, 0.63);
        let p2 = Point2::new(1.26, 0.63);
        let segs = m.trace(p1, p2, 0);
        let total: f64 = segs.iter().map(|(l, _)| l).sum();
        assert!((total - p1.distance(p2)).abs() < 1e-9);
    }

    #[test]
    fn cyl_mesh_one_azimuthal_and_one_radial_subdivision_yields_one_ring() {
        let m = CylMesh::new(1.26, 1.26, vec![0.4], vec![1], 1).unwrap();
        assert_eq!(m.n_reg(), 1);
        let areas = m.area_list();
        assert_eq!(areas.len(), 1);
        assert!((areas[0] - std::f64::consts::PI * 0.4 * 0.4).abs() < 1e-10);
    }

    #[test]
    fn cyl_mesh_rejects_nonincreasing_radii() {
        assert!(CylMesh::new(1.0, 1.0, vec![0.4, 0.3], vec![1, 1], 4).is_err());
    }

    #[test]
    fn n_fsrs_for_xs_region_matches_subdivision_times_azimuth() {
        let m = CylMesh::new(1.26, 1.26, vec![0.4, 0.5], vec![3, 2], 4).unwrap();
        assert_eq!(m.n_fsrs_for_xs_region(0), 12);
        assert_eq!(m.n_fsrs_for_xs_region(1), 8);
        assert_eq!(m.n_fsrs_for_xs_region(2), 4);
    }
}
