//! Convex polytope geometry for admissible-region sampling
//!
//! A [`Polytope`] is a list of inequality rows `a·x <= b` plus equality rows
//! `e·x = c`. Admissible weight regions are assembled from simplex rows,
//! bound rows and user constraint rows; the sampler then needs two geometric
//! primitives from this module: a strictly interior starting point (the
//! Chebyshev centre, obtained through the LP oracle) and an orthonormal
//! basis of the equality null space (the affine hull in which hit-and-run
//! directions live).

use ndarray::{Array1, Array2};
use rdea_lp::{ConstraintOp, Direction, LinExpr, LpBackend, ModelSpec, SolveStatus, Var};

pub mod hitrun;

pub use hitrun::{ChainState, HitAndRun};

/// Geometry failures surfaced before any sampling starts.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GeometryError {
    #[error("polytope is empty (no point satisfies all constraints)")]
    Empty,
    #[error("interior-point LP failed with solver status {0:?}")]
    Solver(SolveStatus),
}

/// H-representation of a bounded convex polytope.
#[derive(Debug, Clone)]
pub struct Polytope {
    dim: usize,
    ineq_a: Vec<Array1<f64>>,
    ineq_b: Vec<f64>,
    eq_a: Vec<Array1<f64>>,
    eq_b: Vec<f64>,
}

impl Polytope {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ineq_a: Vec::new(),
            ineq_b: Vec::new(),
            eq_a: Vec::new(),
            eq_b: Vec::new(),
        }
    }

    /// The unit simplex `x >= 0`, `sum x = 1`.
    pub fn unit_simplex(dim: usize) -> Self {
        let mut p = Self::new(dim);
        for i in 0..dim {
            p.lower_bound(i, 0.0);
        }
        p.eq(Array1::ones(dim), 1.0);
        p
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Add `a·x <= b`.
    pub fn le(&mut self, a: Array1<f64>, b: f64) {
        debug_assert_eq!(a.len(), self.dim);
        self.ineq_a.push(a);
        self.ineq_b.push(b);
    }

    /// Add `a·x >= b` (stored as `-a·x <= -b`).
    pub fn ge(&mut self, a: Array1<f64>, b: f64) {
        self.le(a.mapv(|v| -v), -b);
    }

    /// Add `a·x = b`.
    pub fn eq(&mut self, a: Array1<f64>, b: f64) {
        debug_assert_eq!(a.len(), self.dim);
        self.eq_a.push(a);
        self.eq_b.push(b);
    }

    /// Add `x_i >= lo`.
    pub fn lower_bound(&mut self, i: usize, lo: f64) {
        let mut a = Array1::zeros(self.dim);
        a[i] = -1.0;
        self.le(a, -lo);
    }

    /// Add `x_i <= hi`.
    pub fn upper_bound(&mut self, i: usize, hi: f64) {
        let mut a = Array1::zeros(self.dim);
        a[i] = 1.0;
        self.le(a, hi);
    }

    pub fn ineq_count(&self) -> usize {
        self.ineq_a.len()
    }

    pub(crate) fn ineqs(&self) -> impl Iterator<Item = (&Array1<f64>, f64)> {
        self.ineq_a.iter().zip(self.ineq_b.iter().copied())
    }

    /// Membership test with tolerance.
    pub fn contains(&self, x: &Array1<f64>, tol: f64) -> bool {
        if x.len() != self.dim {
            return false;
        }
        self.ineq_a
            .iter()
            .zip(&self.ineq_b)
            .all(|(a, &b)| a.dot(x) <= b + tol)
            && self
                .eq_a
                .iter()
                .zip(&self.eq_b)
                .all(|(a, &b)| (a.dot(x) - b).abs() <= tol)
    }

    /// Orthonormal basis of the null space of the equality rows (modified
    /// Gram-Schmidt over the standard basis). Columns span the directions
    /// that keep all equalities satisfied.
    pub fn null_basis(&self) -> Array2<f64> {
        let tol = 1e-10;
        let mut eq_ortho: Vec<Array1<f64>> = Vec::new();
        for a in &self.eq_a {
            let mut v = a.clone();
            for q in &eq_ortho {
                let proj = q.dot(&v);
                v = &v - &(q * proj);
            }
            let norm = v.dot(&v).sqrt();
            if norm > tol {
                eq_ortho.push(v / norm);
            }
        }
        let target = self.dim - eq_ortho.len();
        let mut basis: Vec<Array1<f64>> = Vec::with_capacity(target);
        for j in 0..self.dim {
            if basis.len() == target {
                break;
            }
            let mut v = Array1::zeros(self.dim);
            v[j] = 1.0;
            for q in eq_ortho.iter().chain(basis.iter()) {
                let proj = q.dot(&v);
                v = &v - &(q * proj);
            }
            let norm = v.dot(&v).sqrt();
            if norm > tol {
                basis.push(v / norm);
            }
        }
        let mut out = Array2::zeros((self.dim, basis.len()));
        for (k, v) in basis.iter().enumerate() {
            out.column_mut(k).assign(v);
        }
        out
    }

    /// Chebyshev centre: the point maximizing the distance to every
    /// inequality row, measured inside the affine hull of the equalities.
    /// Rows orthogonal to the hull contribute no margin term; their
    /// feasibility is decided by the LP itself.
    pub fn interior_point<B: LpBackend>(&self, backend: &mut B) -> Result<Array1<f64>, GeometryError> {
        let basis = self.null_basis();
        let hull_dim = basis.ncols();

        let mut m = ModelSpec::new(Direction::Maximize);
        let xs: Vec<Var> = (0..self.dim)
            .map(|_| m.add_var(f64::NEG_INFINITY, f64::INFINITY))
            .collect();
        // The margin is bounded above by any row norm scale; a loose cap
        // keeps the LP bounded even for cone-like regions.
        let r = m.add_var(0.0, 1e6);
        m.set_objective(LinExpr::term(r, 1.0));

        for (a, b) in self.ineqs() {
            // Projected norm: the component of the row normal inside the hull.
            let mut proj_sq = 0.0;
            for k in 0..hull_dim {
                let d = basis.column(k).dot(a);
                proj_sq += d * d;
            }
            let norm = proj_sq.sqrt();
            let mut row = LinExpr::new();
            for (i, &coef) in a.iter().enumerate() {
                row.add(xs[i], coef);
            }
            row.add(r, norm);
            m.add_row(row, ConstraintOp::Le, b);
        }
        for (a, &b) in self.eq_a.iter().zip(&self.eq_b) {
            let mut row = LinExpr::new();
            for (i, &coef) in a.iter().enumerate() {
                row.add(xs[i], coef);
            }
            m.add_row(row, ConstraintOp::Eq, b);
        }

        let out = backend.solve(&m);
        match out.status {
            // A zero inradius is not an error: the region may legitimately
            // be lower-dimensional, and the chain degrades to staying put.
            SolveStatus::Optimal => Ok(Array1::from_iter(xs.iter().map(|v| out.values[v.0]))),
            SolveStatus::Infeasible => Err(GeometryError::Empty),
            status => Err(GeometryError::Solver(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdea_lp::MicroLp;

    #[test]
    fn test_simplex_contains_center() {
        let p = Polytope::unit_simplex(3);
        let c = Array1::from(vec![1.0 / 3.0; 3]);
        assert!(p.contains(&c, 1e-12));
        assert!(!p.contains(&Array1::from(vec![0.5, 0.6, -0.1]), 1e-12));
    }

    #[test]
    fn test_null_basis_of_simplex_is_orthogonal_to_ones() {
        let p = Polytope::unit_simplex(4);
        let basis = p.null_basis();
        assert_eq!(basis.ncols(), 3);
        let ones = Array1::ones(4);
        for k in 0..basis.ncols() {
            assert!(basis.column(k).dot(&ones).abs() < 1e-9);
            assert!((basis.column(k).dot(&basis.column(k)) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_interior_point_of_simplex() {
        let p = Polytope::unit_simplex(3);
        let x = p.interior_point(&mut MicroLp).unwrap();
        assert!(p.contains(&x, 1e-9));
        // Strictly interior: every coordinate away from the faces.
        for &xi in x.iter() {
            assert!(xi > 1e-3, "coordinate {xi} not interior");
        }
        assert!((x.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_interior_point_reports_empty_region() {
        let mut p = Polytope::unit_simplex(2);
        // x0 >= 0.8 and x0 <= 0.1 cannot both hold.
        p.lower_bound(0, 0.8);
        p.upper_bound(0, 0.1);
        match p.interior_point(&mut MicroLp) {
            Err(GeometryError::Empty) => {}
            other => panic!("expected empty region, got {other:?}"),
        }
    }

    #[test]
    fn test_box_interior_point_is_center_distance() {
        let mut p = Polytope::new(2);
        p.lower_bound(0, 0.0);
        p.upper_bound(0, 2.0);
        p.lower_bound(1, 0.0);
        p.upper_bound(1, 4.0);
        let x = p.interior_point(&mut MicroLp).unwrap();
        // Inradius 1; x0 pinned to 1, x1 anywhere in [1, 3].
        assert!((x[0] - 1.0).abs() < 1e-6);
        assert!(x[1] > 1.0 - 1e-6 && x[1] < 3.0 + 1e-6);
    }
}
