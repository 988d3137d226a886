//! Hit-and-run sampler over a convex polytope
//!
//! The chain starts from a strictly interior point, picks a uniformly random
//! direction in the affine hull, intersects the ray with every inequality
//! row (ratio test) and jumps to a uniform point on the feasible segment.
//! After burn-in the chain distribution converges to uniform over the
//! polytope; draws are thinned to cut autocorrelation.
//!
//! Burn-in is `10 * dim(affine hull)` steps, thinning `max(1, dim)`.
//! The chain is deterministic for a given RNG seed.

use ndarray::{Array1, Array2};
use rand::Rng;

use crate::Polytope;

/// Lifecycle of one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Uninitialized,
    BurningIn,
    Producing,
}

/// One hit-and-run chain tied to a polytope and an injected RNG.
pub struct HitAndRun<'a, R: Rng> {
    poly: &'a Polytope,
    basis: Array2<f64>,
    point: Array1<f64>,
    rng: R,
    state: ChainState,
    burnin: usize,
    thin: usize,
}

impl<'a, R: Rng> HitAndRun<'a, R> {
    /// `start` must be strictly interior (see [`Polytope::interior_point`]).
    pub fn new(poly: &'a Polytope, start: Array1<f64>, rng: R) -> Self {
        debug_assert_eq!(start.len(), poly.dim());
        let basis = poly.null_basis();
        let hull_dim = basis.ncols();
        Self {
            poly,
            basis,
            point: start,
            rng,
            state: ChainState::Uninitialized,
            burnin: 10 * hull_dim,
            thin: hull_dim.max(1),
        }
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Dimension of the affine hull the chain moves in.
    pub fn hull_dim(&self) -> usize {
        self.basis.ncols()
    }

    /// Advance the chain and return the next (thinned) sample.
    pub fn next_sample(&mut self) -> Array1<f64> {
        if self.basis.ncols() == 0 {
            // The polytope is a single point.
            self.state = ChainState::Producing;
            return self.point.clone();
        }
        if self.state == ChainState::Uninitialized {
            self.state = ChainState::BurningIn;
            for _ in 0..self.burnin {
                self.step();
            }
            self.state = ChainState::Producing;
        }
        for _ in 0..self.thin {
            self.step();
        }
        self.point.clone()
    }

    fn step(&mut self) {
        let dir = match self.random_direction() {
            Some(d) => d,
            None => return,
        };
        // Ratio test: feasible t-range along point + t * dir.
        let mut t_lo = f64::NEG_INFINITY;
        let mut t_hi = f64::INFINITY;
        for (a, b) in self.poly.ineqs() {
            let ad = a.dot(&dir);
            let slack = b - a.dot(&self.point);
            if ad > 1e-13 {
                t_hi = t_hi.min(slack / ad);
            } else if ad < -1e-13 {
                t_lo = t_lo.max(slack / ad);
            } else if slack < -1e-9 {
                // Row violated and unaffected by the move; numerical drift.
                return;
            }
        }
        if !t_lo.is_finite() || !t_hi.is_finite() || t_hi - t_lo <= 1e-13 {
            return;
        }
        let t = t_lo + (t_hi - t_lo) * self.rng.random::<f64>();
        self.point = &self.point + &(dir * t);
    }

    /// Uniform random direction in the affine hull: standard normals on the
    /// basis coordinates (Box-Muller), mapped back and normalized.
    fn random_direction(&mut self) -> Option<Array1<f64>> {
        let k = self.basis.ncols();
        let mut dir: Array1<f64> = Array1::zeros(self.poly.dim());
        for j in 0..k {
            let g = self.standard_normal();
            dir = dir + self.basis.column(j).mapv(|v| v * g);
        }
        let norm = dir.dot(&dir).sqrt();
        if norm < 1e-13 {
            return None;
        }
        Some(dir / norm)
    }

    fn standard_normal(&mut self) -> f64 {
        let u1: f64 = 1.0 - self.rng.random::<f64>();
        let u2: f64 = self.rng.random::<f64>();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;
    use rdea_lp::MicroLp;

    fn simplex_chain(dim: usize) -> (Polytope, Array1<f64>) {
        let p = Polytope::unit_simplex(dim);
        let start = p.interior_point(&mut MicroLp).unwrap();
        (p, start)
    }

    #[test]
    fn test_chain_state_transitions() {
        let (p, start) = simplex_chain(3);
        let mut chain = HitAndRun::new(&p, start, Pcg64Mcg::seed_from_u64(1));
        assert_eq!(chain.state(), ChainState::Uninitialized);
        let _ = chain.next_sample();
        assert_eq!(chain.state(), ChainState::Producing);
    }

    #[test]
    fn test_samples_stay_inside() {
        let (p, start) = simplex_chain(4);
        let mut chain = HitAndRun::new(&p, start, Pcg64Mcg::seed_from_u64(7));
        for _ in 0..200 {
            let x = chain.next_sample();
            assert!(p.contains(&x, 1e-7), "sample left the simplex: {x:?}");
        }
    }

    #[test]
    fn test_same_seed_reproduces_stream() {
        let (p, start) = simplex_chain(3);
        let mut c1 = HitAndRun::new(&p, start.clone(), Pcg64Mcg::seed_from_u64(42));
        let mut c2 = HitAndRun::new(&p, start, Pcg64Mcg::seed_from_u64(42));
        for _ in 0..50 {
            assert_eq!(c1.next_sample(), c2.next_sample());
        }
    }

    #[test]
    fn test_simplex_sample_mean_is_roughly_uniform() {
        let (p, start) = simplex_chain(3);
        let mut chain = HitAndRun::new(&p, start, Pcg64Mcg::seed_from_u64(3));
        let mut mean = Array1::<f64>::zeros(3);
        let m = 3000;
        for _ in 0..m {
            mean = mean + chain.next_sample();
        }
        mean /= m as f64;
        for &c in mean.iter() {
            assert!(
                (c - 1.0 / 3.0).abs() < 0.05,
                "coordinate mean {c} far from 1/3"
            );
        }
    }

    #[test]
    fn test_point_polytope_returns_the_point() {
        // Equalities pin both coordinates: x0 = 0.3, x0 + x1 = 1.
        let mut p = Polytope::new(2);
        p.eq(Array1::from(vec![1.0, 0.0]), 0.3);
        p.eq(Array1::from(vec![1.0, 1.0]), 1.0);
        let start = Array1::from(vec![0.3, 0.7]);
        let mut chain = HitAndRun::new(&p, start.clone(), Pcg64Mcg::seed_from_u64(9));
        assert_eq!(chain.hull_dim(), 0);
        assert_eq!(chain.next_sample(), start);
        assert_eq!(chain.state(), ChainState::Producing);
    }
}
