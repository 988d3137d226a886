//! Admissible-family samplers and analytic scorers
//!
//! SMAA draws weight vectors with hit-and-run over the admissible region
//! and, for imprecise models, completes each sample with value-function
//! realizations (breakpoint-wise monotone draws inside the envelope),
//! interval realizations (uniform in the box) and ordinal realizations
//! (rank-respecting chains). Scoring inside the sample loop is analytic: a
//! contraction for the value model, a ratio evaluation for the ratio model.
//! No LP is ever solved per sample.
//!
//! The RNG consumption order per sample is fixed (weights first, then per
//! factor: shape, then realizations by unit index), so a sample is a pure
//! function of its seed.

use ndarray::Array1;
use rand::Rng;
use rdea_lp::ConstraintOp;
use rdea_polytope::Polytope;

use crate::data::{CcrFactor, CcrProblem, VdeaProblem};
use crate::imprecise::{FactorData, ImpreciseCcrProblem, ImpreciseOptions, ImpreciseVdeaProblem};
use crate::models::vdea::scoped_weight_row;
use crate::value_fn::{Envelope, Polarity};

fn push_row(poly: &mut Polytope, a: Array1<f64>, op: ConstraintOp, rhs: f64) {
    match op {
        ConstraintOp::Le => poly.le(a, rhs),
        ConstraintOp::Ge => poly.ge(a, rhs),
        ConstraintOp::Eq => poly.eq(a, rhs),
    }
}

/// Per-model scoring context for the SMAA loop.
pub(crate) enum Scorer<'a> {
    Ccr(&'a CcrProblem),
    Vdea {
        p: &'a VdeaProblem,
        scope: Vec<usize>,
    },
    ImpVdea(&'a ImpreciseVdeaProblem),
    ImpCcr(&'a ImpreciseCcrProblem),
}

impl Scorer<'_> {
    /// The polytope hit-and-run walks over. For the ratio model both weight
    /// groups are normalized to sum 1 (ratio scores are invariant to the
    /// two scalings, and the product region is bounded).
    pub fn weight_region(&self, eps: f64) -> Polytope {
        match self {
            Scorer::Ccr(p) => {
                let (mi, mo) = (p.n_inputs(), p.n_outputs());
                let mut poly = Polytope::new(mi + mo);
                for j in 0..mi + mo {
                    poly.lower_bound(j, eps);
                }
                let mut sv = Array1::zeros(mi + mo);
                sv.slice_mut(ndarray::s![..mi]).fill(1.0);
                poly.eq(sv, 1.0);
                let mut su = Array1::zeros(mi + mo);
                su.slice_mut(ndarray::s![mi..]).fill(1.0);
                poly.eq(su, 1.0);
                for wc in p.weight_constraints() {
                    let mut a = Array1::zeros(mi + mo);
                    for (name, coef) in &wc.coeffs {
                        match p.factor(name).expect("validated on add") {
                            CcrFactor::Input(i) => a[i] += coef,
                            CcrFactor::Output(r) => a[mi + r] += coef,
                        }
                    }
                    push_row(&mut poly, a, wc.op, wc.rhs);
                }
                poly
            }
            Scorer::Vdea { p, scope } => {
                let dim = scope.len();
                let mut poly = Polytope::new(dim);
                for j in 0..dim {
                    poly.lower_bound(j, 0.0);
                }
                poly.eq(Array1::ones(dim), 1.0);
                for wc in p.weight_constraints() {
                    if let Some(coeffs) = scoped_weight_row(p, scope, wc) {
                        let mut a = Array1::zeros(dim);
                        for (local, coef) in coeffs {
                            a[local] += coef;
                        }
                        push_row(&mut poly, a, wc.op, wc.rhs);
                    }
                }
                poly
            }
            Scorer::ImpVdea(p) => {
                let dim = p.n_factors();
                let mut poly = Polytope::new(dim);
                for j in 0..dim {
                    poly.lower_bound(j, 0.0);
                }
                poly.eq(Array1::ones(dim), 1.0);
                for wc in p.weight_constraints() {
                    let mut a = Array1::zeros(dim);
                    for (name, coef) in &wc.coeffs {
                        let f = p
                            .factor_names()
                            .iter()
                            .position(|n| n == name)
                            .expect("validated on add");
                        a[f] += coef;
                    }
                    push_row(&mut poly, a, wc.op, wc.rhs);
                }
                poly
            }
            Scorer::ImpCcr(p) => {
                let (mi, mo) = (p.n_inputs(), p.n_outputs());
                let mut poly = Polytope::new(mi + mo);
                for j in 0..mi + mo {
                    poly.lower_bound(j, eps);
                }
                let mut sv = Array1::zeros(mi + mo);
                sv.slice_mut(ndarray::s![..mi]).fill(1.0);
                poly.eq(sv, 1.0);
                let mut su = Array1::zeros(mi + mo);
                su.slice_mut(ndarray::s![mi..]).fill(1.0);
                poly.eq(su, 1.0);
                for wc in p.weight_constraints() {
                    let mut a = Array1::zeros(mi + mo);
                    for (name, coef) in &wc.coeffs {
                        match p.factor(name).expect("validated on add") {
                            CcrFactor::Input(i) => a[i] += coef,
                            CcrFactor::Output(r) => a[mi + r] += coef,
                        }
                    }
                    push_row(&mut poly, a, wc.op, wc.rhs);
                }
                poly
            }
        }
    }

    /// Efficiencies of all units under one admissible sample. Ratio scores
    /// come out relative to the per-sample best, so every indicator lives
    /// in `[0, 1]`.
    pub fn score<R: Rng>(&self, w: &Array1<f64>, rng: &mut R) -> Array1<f64> {
        match self {
            Scorer::Ccr(p) => {
                let n = p.n_units();
                let (mi, _mo) = (p.n_inputs(), p.n_outputs());
                let mut r = Array1::zeros(n);
                for k in 0..n {
                    let mut den = 0.0;
                    for i in 0..p.n_inputs() {
                        den += w[i] * p.inputs()[(k, i)];
                    }
                    let mut num = 0.0;
                    for o in 0..p.n_outputs() {
                        num += w[mi + o] * p.outputs()[(k, o)];
                    }
                    r[k] = num / den;
                }
                let best = r.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                r / best
            }
            Scorer::Vdea { p, scope } => {
                let n = p.n_units();
                let mut e = Array1::zeros(n);
                for (local, &f) in scope.iter().enumerate() {
                    let env = p.envelope(f);
                    let shape = realize_shape(env, rng);
                    for k in 0..n {
                        e[k] += w[local] * env.eval(&shape, p.performances()[(k, f)]);
                    }
                }
                e
            }
            Scorer::ImpVdea(p) => {
                let n = p.n_units();
                let mut e = Array1::zeros(n);
                for f in 0..p.n_factors() {
                    match p.data(f) {
                        FactorData::Ordinal { .. } => {
                            let order = p.data(f).units_by_rank();
                            let vals = sample_ordinal_values(
                                &order,
                                p.options().vf_monotonicity_ratio,
                                rng,
                            );
                            for k in 0..n {
                                e[k] += w[f] * vals[k];
                            }
                        }
                        FactorData::Precise(xs) => {
                            let env = p.envelope(f).expect("cardinal factor has an envelope");
                            let shape = realize_shape(env, rng);
                            for k in 0..n {
                                e[k] += w[f] * env.eval(&shape, xs[k]);
                            }
                        }
                        FactorData::Interval { lo, hi } => {
                            let env = p.envelope(f).expect("cardinal factor has an envelope");
                            let shape = realize_shape(env, rng);
                            for k in 0..n {
                                let x = uniform_in(lo[k], hi[k], rng);
                                e[k] += w[f] * env.eval(&shape, x);
                            }
                        }
                    }
                }
                e
            }
            Scorer::ImpCcr(p) => {
                let n = p.n_units();
                let mi = p.n_inputs();
                let mut x = vec![vec![0.0; n]; mi];
                for (i, col) in x.iter_mut().enumerate() {
                    realize_ratio_factor(p.input_data(i), false, p.options(), col, rng);
                }
                let mut y = vec![vec![0.0; n]; p.n_outputs()];
                for (r, col) in y.iter_mut().enumerate() {
                    realize_ratio_factor(p.output_data(r), true, p.options(), col, rng);
                }
                let mut scores = Array1::zeros(n);
                for k in 0..n {
                    let mut den = 0.0;
                    for (i, col) in x.iter().enumerate() {
                        den += w[i] * col[k];
                    }
                    let mut num = 0.0;
                    for (r, col) in y.iter().enumerate() {
                        num += w[mi + r] * col[k];
                    }
                    scores[k] = num / den;
                }
                let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                scores / best
            }
        }
    }
}

fn uniform_in<R: Rng>(lo: f64, hi: f64, rng: &mut R) -> f64 {
    if hi > lo {
        lo + (hi - lo) * rng.random::<f64>()
    } else {
        lo
    }
}

/// Draw one monotone realization inside the envelope, breakpoint by
/// breakpoint, walking the abscissae from the 0-anchored end so the bound
/// from the previous draw keeps the shape monotone.
pub(crate) fn realize_shape<R: Rng>(env: &Envelope, rng: &mut R) -> Vec<f64> {
    let l = env.len();
    let (lo, up) = (env.lower(), env.upper());
    let mut vals = vec![0.0; l];
    match env.polarity() {
        Polarity::Gain => {
            vals[0] = lo[0];
            let mut prev = vals[0];
            for j in 1..l {
                let a = lo[j].max(prev);
                vals[j] = uniform_in(a, up[j], rng);
                prev = vals[j];
            }
        }
        Polarity::Cost => {
            vals[l - 1] = lo[l - 1];
            let mut prev = vals[l - 1];
            for j in (0..l - 1).rev() {
                let a = lo[j].max(prev);
                vals[j] = uniform_in(a, up[j], rng);
                prev = vals[j];
            }
        }
    }
    vals
}

/// Per-unit values in `[0, 1]` respecting a strict ranking (`order` is best
/// first) and the increment-ratio bound toward better ranks.
pub(crate) fn sample_ordinal_values<R: Rng>(order: &[usize], rho: f64, rng: &mut R) -> Vec<f64> {
    let n = order.len();
    let mut draws: Vec<f64> = (0..n).map(|_| rng.random::<f64>()).collect();
    draws.sort_by(|a, b| b.partial_cmp(a).expect("uniform draws are comparable"));
    if rho > 1.0 && n >= 3 {
        let mut incs: Vec<f64> = (0..n - 1).map(|j| draws[j] - draws[j + 1]).collect();
        for j in (0..n - 2).rev() {
            incs[j] = incs[j].max(rho * incs[j + 1]);
        }
        for j in (0..n - 1).rev() {
            draws[j] = draws[j + 1] + incs[j];
        }
        if draws[0] > 1.0 {
            let top = draws[0];
            for d in &mut draws {
                *d /= top;
            }
        }
    }
    let mut vals = vec![0.0; n];
    for (pos, &unit) in order.iter().enumerate() {
        vals[unit] = draws[pos];
    }
    vals
}

/// Realized column of one ratio-model factor. Ordinal chains respect the
/// multiplicative gap and the floor; interval cells are uniform in the box.
fn realize_ratio_factor<R: Rng>(
    data: &FactorData,
    higher_better: bool,
    opts: &ImpreciseOptions,
    out: &mut [f64],
    rng: &mut R,
) {
    match data {
        FactorData::Precise(v) => {
            for (k, slot) in out.iter_mut().enumerate() {
                *slot = v[k];
            }
        }
        FactorData::Interval { lo, hi } => {
            for (k, slot) in out.iter_mut().enumerate() {
                *slot = uniform_in(lo[k], hi[k], rng);
            }
        }
        FactorData::Ordinal { .. } => {
            let order = data.units_by_rank();
            let n = order.len();
            let floor = opts.ordinal_min.max(1e-9);
            let mut draws: Vec<f64> = (0..n).map(|_| uniform_in(floor, 1.0, rng)).collect();
            draws.sort_by(|a, b| a.partial_cmp(b).expect("uniform draws are comparable"));
            for j in 1..n {
                let need = draws[j - 1] * opts.ordinal_ratio;
                if draws[j] < need {
                    draws[j] = need.min(1.0);
                }
            }
            for (pos, &unit) in order.iter().enumerate() {
                // Best rank takes the largest value when more is better,
                // the smallest when less is better.
                out[unit] = if higher_better {
                    draws[n - 1 - pos]
                } else {
                    draws[pos]
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn test_realize_shape_stays_in_envelope_and_monotone() {
        let env = Envelope::range(
            Polarity::Gain,
            vec![0.0, 0.3, 0.7, 1.0],
            vec![0.0, 0.1, 0.4, 1.0],
            vec![0.0, 0.5, 0.9, 1.0],
        )
        .unwrap();
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        for _ in 0..200 {
            let shape = realize_shape(&env, &mut rng);
            for j in 0..shape.len() {
                assert!(shape[j] >= env.lower()[j] - 1e-12);
                assert!(shape[j] <= env.upper()[j] + 1e-12);
                if j > 0 {
                    assert!(shape[j] >= shape[j - 1] - 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_realize_cost_shape_is_decreasing() {
        let env = Envelope::range(
            Polarity::Cost,
            vec![0.0, 0.5, 1.0],
            vec![1.0, 0.2, 0.0],
            vec![1.0, 0.8, 0.0],
        )
        .unwrap();
        let mut rng = Pcg64Mcg::seed_from_u64(5);
        for _ in 0..100 {
            let shape = realize_shape(&env, &mut rng);
            assert!(shape[0] >= shape[1] && shape[1] >= shape[2]);
        }
    }

    #[test]
    fn test_ordinal_values_respect_rank_order() {
        let order = vec![2, 0, 1];
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        for _ in 0..100 {
            let vals = sample_ordinal_values(&order, 1.0, &mut rng);
            assert!(vals[2] >= vals[0] && vals[0] >= vals[1]);
        }
    }

    #[test]
    fn test_ordinal_values_respect_increment_ratio() {
        let order = vec![0, 1, 2, 3];
        let mut rng = Pcg64Mcg::seed_from_u64(9);
        for _ in 0..100 {
            let vals = sample_ordinal_values(&order, 2.0, &mut rng);
            let d01 = vals[0] - vals[1];
            let d12 = vals[1] - vals[2];
            let d23 = vals[2] - vals[3];
            assert!(d01 >= 2.0 * d12 - 1e-9, "{d01} vs {d12}");
            assert!(d12 >= 2.0 * d23 - 1e-9, "{d12} vs {d23}");
            assert!(vals[0] <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn test_ratio_ordinal_realization_orders_outputs() {
        let data = FactorData::Ordinal {
            ranks: vec![2, 1, 3],
        };
        let opts = ImpreciseOptions {
            ordinal_ratio: 1.1,
            ordinal_min: 0.05,
            ..Default::default()
        };
        let mut rng = Pcg64Mcg::seed_from_u64(17);
        let mut out = vec![0.0; 3];
        for _ in 0..100 {
            realize_ratio_factor(&data, true, &opts, &mut out, &mut rng);
            // Unit 1 is rank 1: the largest realized output.
            assert!(out[1] >= out[0] * 1.1 - 1e-9 || (out[1] - 1.0).abs() < 1e-12);
            assert!(out[0] >= out[2] && out[1] >= out[0]);
            assert!(out.iter().all(|&v| v >= 0.05 - 1e-12 && v <= 1.0));
        }
    }
}
