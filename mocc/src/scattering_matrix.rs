//! Compressed row storage for a multigroup scattering cross-section matrix
//! (`spec.md` §3 "ScatteringMatrix"; `src/core/scattering_matrix.hpp`).

use crate::error::{Error, Result};

/// The contiguous, nonzero run of "from-group" cross sections that scatter into one destination
/// group, plus the `[min_g, max_g]` bounds that run spans.
#[derive(Clone, Debug, PartialEq)]
pub struct ScatteringRow {
    min_g: usize,
    max_g: usize,
    values: Vec<f64>,
}

impl ScatteringRow {
    /// Lowest source group with a nonzero cross section into this row's destination group.
    #[must_use]
    pub const fn min_g(&self) -> usize {
        self.min_g
    }

    /// Highest source group with a nonzero cross section into this row's destination group.
    #[must_use]
    pub const fn max_g(&self) -> usize {
        self.max_g
    }

    /// The scattering cross section from source group `g` into this row's destination group.
    /// Zero outside `[min_g, max_g]`.
    #[must_use]
    pub fn get(&self, g: usize) -> f64 {
        if g < self.min_g || g > self.max_g {
            0.0
        } else {
            self.values[g - self.min_g]
        }
    }

    /// Iterates `(source_group, cross_section)` pairs over the nonzero run.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        (self.min_g..=self.max_g).zip(self.values.iter().copied())
    }
}

/// A multigroup scattering matrix, stored as one [`ScatteringRow`] per destination group. Rows
/// are typically short: downscatter dominates and upscatter is confined to a handful of thermal
/// groups, so most of the dense `ng x ng` matrix is zero (`spec.md` §3, §9 "Sparse storage").
#[derive(Clone, Debug, PartialEq)]
pub struct ScatteringMatrix {
    n_group: usize,
    rows: Vec<ScatteringRow>,
    out: Vec<f64>,
}

impl ScatteringMatrix {
    /// Builds a scattering matrix from a dense `scat[to][from]` representation, sparsifying each
    /// destination row to its nonzero run. A row that is all zero degenerates to a single
    /// self-scatter entry of `0.0` at `[to, to]`, matching `ScatteringMatrix(const
    /// std::vector<VecF>&)`.
    pub fn from_dense(scat: &[Vec<f64>]) -> Result<Self> {
        let n_group = scat.len();
        for row in scat {
            if row.len() != n_group {
                return Err(Error::Configuration(
                    "scattering matrix must be square".into(),
                ));
            }
        }

        let mut out = vec![0.0; n_group];
        let mut rows = Vec::with_capacity(n_group);

        for (to, scat_row) in scat.iter().enumerate() {
            let mut min_g = None;
            let mut max_g = None;
            for (from, &v) in scat_row.iter().enumerate() {
                if v > 0.0 {
                    if min_g.is_none() {
                        min_g = Some(from);
                    }
                    max_g = Some(from);
                }
            }

            let (min_g, max_g) = match (min_g, max_g) {
                (Some(lo), Some(hi)) => (lo, hi),
                _ => (to, to),
            };

            let values: Vec<f64> = (min_g..=max_g).map(|from| scat_row[from]).collect();
            for (from, &v) in values.iter().enumerate() {
                out[min_g + from] += v;
            }

            rows.push(ScatteringRow {
                min_g,
                max_g,
                values,
            });
        }

        Ok(Self { n_group, rows, out })
    }

    /// Builds a scattering matrix from an `ndarray` dense `(to, from)` representation.
    pub fn from_dense_array(scat: &ndarray::Array2<f64>) -> Result<Self> {
        let (nr, nc) = scat.dim();
        if nr != nc {
            return Err(Error::Configuration(
                "scattering matrix must be square".into(),
            ));
        }
        let dense: Vec<Vec<f64>> = scat.outer_iter().map(|row| row.to_vec()).collect();
        Self::from_dense(&dense)
    }

    /// Number of energy groups.
    #[must_use]
    pub const fn n_group(&self) -> usize {
        self.n_group
    }

    /// The compressed row of source-group cross sections scattering into destination group `to`.
    #[must_use]
    pub fn to(&self, to: usize) -> &ScatteringRow {
        &self.rows[to]
    }

    /// The self-scattering cross section for `group` (`to(group).get(group)`).
    #[must_use]
    pub fn self_scat(&self, group: usize) -> f64 {
        self.to(group).get(group)
    }

    /// Total cross section scattering *out of* `group`, summed over every destination group
    /// (including self-scatter). Equivalent to a column sum of the dense `[to][from]` matrix.
    #[must_use]
    pub fn out(&self, group: usize) -> f64 {
        self.out[group]
    }

    /// Cumulative distribution of outscatter probability from `group` into each destination
    /// group, for use by the (not-implemented-here) stochastic transport methods this matrix
    /// format was originally shared with; kept for parity with the source format (`spec.md`
    /// §3 notes `ScatteringMatrix` mirrors the original field-for-field where not explicitly
    /// redesigned).
    #[must_use]
    pub fn out_cdf(&self, group: usize) -> Vec<f64> {
        let scale = 1.0 / self.out(group);
        let mut prev = 0.0;
        let mut cdf = Vec::with_capacity(self.n_group);
        for to in 0..self.n_group {
            let xssc = self.to(to).get(group);
            prev += xssc * scale;
            cdf.push(prev);
        }
        cdf
    }

    /// Densifies this matrix back into a row-major `ng * ng` `[to][from]` vector.
    #[must_use]
    pub fn as_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_group * self.n_group];
        for (to, row) in self.rows.iter().enumerate() {
            for (from, v) in row.iter() {
                dense[self.n_group * to + from] = v;
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn all_zero_row_degenerates_to_self_scatter_entry() {
        let scat = vec![vec![0.0, 0.0], vec![0.1, 0.2]];
        let m = ScatteringMatrix::from_dense(&scat).unwrap();
        assert_eq!(m.to(0).min_g(), 0);
        assert_eq!(m.to(0).max_g(), 0);
        assert_eq!(m.to(0).get(0), 0.0);
    }

    #[test]
    fn out_is_column_sum_including_self_scatter() {
        let scat = vec![
            vec![0.5, 0.0, 0.0],
            vec![0.3, 0.4, 0.0],
            vec![0.1, 0.2, 0.6],
        ];
        let m = ScatteringMatrix::from_dense(&scat).unwrap();
        assert!((m.out(0) - 0.9).abs() < 1e-12);
        assert!((m.out(1) - 0.6).abs() < 1e-12);
        assert!((m.out(2) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn rejects_nonsquare_input() {
        let scat = vec![vec![0.1, 0.2], vec![0.1]];
        assert!(ScatteringMatrix::from_dense(&scat).is_err());
    }

    // dense ng=47 random matrix, sparsified then densified, must round-trip exactly (E3).
    #[test]
    fn dense_round_trip_ng_47() {
        let ng = 47;
        let mut rng = Pcg64Mcg::new(0xcafe_f00d_dead_beef);
        let mut dense = vec![vec![0.0; ng]; ng];
        for to_row in dense.iter_mut() {
            for v in to_row.iter_mut() {
                if rng.gen_bool(0.3) {
                    *v = rng.gen_range(0.0..1.0);
                }
            }
        }

        let m = ScatteringMatrix::from_dense(&dense).unwrap();
        let flat = m.as_dense();
        for to in 0..ng {
            for from in 0..ng {
                assert_eq!(flat[ng * to + from], dense[to][from]);
            }
        }
    }

    #[test]
    fn out_cdf_is_monotonic_and_ends_near_one() {
        let scat = vec![
            vec![0.5, 0.1, 0.0],
            vec![0.3, 0.4, 0.0],
            vec![0.1, 0.2, 0.6],
        ];
        let m = ScatteringMatrix::from_dense(&scat).unwrap();
        let cdf = m.out_cdf(0);
        assert!(cdf.windows(2).all(|w| w[1] >= w[0] - 1e-12));
        assert!((cdf.last().unwrap() - 1.0).abs() < 1e-9);
    }
}
