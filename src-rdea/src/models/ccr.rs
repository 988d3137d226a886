//! Ratio-model (CCR) builders
//!
//! Efficiency is the output/input weighted ratio relative to the best unit.
//! The max-efficiency question is the Charnes-Cooper multiplier LP; the
//! min-efficiency question pins some unit to the frontier through binaries;
//! pairwise comparisons use the two separate scale freedoms of the ratio to
//! pin the reference unit's ratio to 1, which makes them linear.

use rdea_lp::{ConstraintOp, Direction, LinExpr, ModelSpec, Var};

use crate::data::{CcrFactor, CcrProblem};

pub(crate) struct CcrVars {
    pub v: Vec<Var>,
    pub u: Vec<Var>,
}

fn weight_vars(spec: &mut ModelSpec, p: &CcrProblem, eps: f64) -> CcrVars {
    let v = (0..p.n_inputs())
        .map(|_| spec.add_var(eps, f64::INFINITY))
        .collect();
    let u = (0..p.n_outputs())
        .map(|_| spec.add_var(eps, f64::INFINITY))
        .collect();
    CcrVars { v, u }
}

fn user_rows(spec: &mut ModelSpec, p: &CcrProblem, vars: &CcrVars) {
    for wc in p.weight_constraints() {
        let mut row = LinExpr::new();
        for (name, coef) in &wc.coeffs {
            match p.factor(name).expect("constraint names validated on add") {
                CcrFactor::Input(i) => row.add(vars.v[i], *coef),
                CcrFactor::Output(r) => row.add(vars.u[r], *coef),
            };
        }
        spec.add_row(row, wc.op, wc.rhs);
    }
}

fn input_expr(p: &CcrProblem, vars: &CcrVars, unit: usize) -> LinExpr {
    let mut e = LinExpr::new();
    for (i, &v) in vars.v.iter().enumerate() {
        e.add(v, p.inputs()[(unit, i)]);
    }
    e
}

fn output_expr(p: &CcrProblem, vars: &CcrVars, unit: usize) -> LinExpr {
    let mut e = LinExpr::new();
    for (r, &u) in vars.u.iter().enumerate() {
        e.add(u, p.outputs()[(unit, r)]);
    }
    e
}

fn envelope_rows(spec: &mut ModelSpec, p: &CcrProblem, vars: &CcrVars, skip: Option<usize>) {
    for k in 0..p.n_units() {
        if Some(k) == skip {
            continue;
        }
        let mut row = output_expr(p, vars, k);
        row.add_scaled(&input_expr(p, vars, k), -1.0);
        spec.add_row(row, ConstraintOp::Le, 0.0);
    }
}

/// Charnes-Cooper multiplier LP: max `u*y_s` with `v*x_s = 1` and every
/// unit's ratio capped at 1. With `exclude_subject` the subject leaves the
/// cap set (super-efficiency), so the optimum may exceed 1.
pub fn max_efficiency(p: &CcrProblem, s: usize, eps: f64, exclude_subject: bool) -> ModelSpec {
    let mut spec = ModelSpec::new(Direction::Maximize);
    let vars = weight_vars(&mut spec, p, eps);
    let objective = output_expr(p, &vars, s);
    spec.set_objective(objective);
    spec.add_row(input_expr(p, &vars, s), ConstraintOp::Eq, 1.0);
    envelope_rows(&mut spec, p, &vars, exclude_subject.then_some(s));
    user_rows(&mut spec, p, &vars);
    spec
}

/// Frontier-pinning MILP: min `u*y_s` under the max-efficiency rows plus one
/// binary per unit forcing at least one ratio to stay at 1, so "relative to
/// the best" remains normalized while the subject is pushed down.
pub fn min_efficiency(p: &CcrProblem, s: usize, eps: f64, exclude_subject: bool) -> ModelSpec {
    let mut spec = ModelSpec::new(Direction::Minimize);
    let vars = weight_vars(&mut spec, p, eps);
    let objective = output_expr(p, &vars, s);
    spec.set_objective(objective);
    spec.add_row(input_expr(p, &vars, s), ConstraintOp::Eq, 1.0);
    envelope_rows(&mut spec, p, &vars, exclude_subject.then_some(s));

    let mut picked = LinExpr::new();
    for k in 0..p.n_units() {
        if exclude_subject && k == s {
            continue;
        }
        // With v*x_s = 1 and v >= 0, v*x_k never exceeds max_i x_ki/x_si.
        let big_m = (0..p.n_inputs())
            .map(|i| p.inputs()[(k, i)] / p.inputs()[(s, i)])
            .fold(0.0_f64, f64::max)
            + 1.0;
        let b = spec.add_binary_var();
        let mut row = input_expr(p, &vars, k);
        row.add_scaled(&output_expr(p, &vars, k), -1.0);
        row.add(b, big_m);
        spec.add_row(row, ConstraintOp::Le, big_m);
        picked.add(b, 1.0);
    }
    spec.add_row(picked, ConstraintOp::Ge, 1.0);
    user_rows(&mut spec, p, &vars);
    spec
}

/// Sign model for ratio comparison: max `u*y_a - v*x_a` with unit `b`'s
/// ratio pinned to 1 through `u*y_b = 1`, `v*x_b = 1`. The optimum is
/// positive iff some admissible weights make `a`'s ratio exceed `b`'s, and
/// nonpositive iff `b` is weakly preferred everywhere.
pub fn pairwise(p: &CcrProblem, a: usize, b: usize, eps: f64) -> ModelSpec {
    let mut spec = ModelSpec::new(Direction::Maximize);
    let vars = weight_vars(&mut spec, p, eps);
    let mut objective = output_expr(p, &vars, a);
    objective.add_scaled(&input_expr(p, &vars, a), -1.0);
    spec.set_objective(objective);
    spec.add_row(output_expr(p, &vars, b), ConstraintOp::Eq, 1.0);
    spec.add_row(input_expr(p, &vars, b), ConstraintOp::Eq, 1.0);
    user_rows(&mut spec, p, &vars);
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rdea_lp::{SolveStatus, SolverCtx};

    fn toy() -> CcrProblem {
        CcrProblem::new(
            vec!["x1", "x2"],
            vec!["y"],
            array![[1.0, 2.0], [5.0, 7.0], [4.0, 2.0], [7.0, 4.0], [3.0, 8.0]],
            array![[1.0], [10.0], [5.0], [7.0], [12.0]],
        )
        .unwrap()
    }

    fn solve(spec: &ModelSpec) -> f64 {
        let out = SolverCtx::new().solve(spec);
        assert_eq!(out.status, SolveStatus::Optimal);
        out.objective
    }

    #[test]
    fn test_max_efficiency_of_efficient_unit_is_one() {
        let p = toy();
        let e = solve(&max_efficiency(&p, 4, 1e-9, false));
        assert!((e - 1.0).abs() < 1e-6, "unit E should be efficient, got {e}");
    }

    #[test]
    fn test_max_efficiency_hand_value() {
        let p = toy();
        let e = solve(&max_efficiency(&p, 0, 1e-9, false));
        assert!((e - 13.0 / 41.0).abs() < 1e-6, "got {e}");
    }

    #[test]
    fn test_min_efficiency_below_max() {
        let p = toy();
        for s in 0..5 {
            let lo = solve(&min_efficiency(&p, s, 1e-9, false));
            let hi = solve(&max_efficiency(&p, s, 1e-9, false));
            assert!(
                lo <= hi + 1e-9,
                "unit {s}: min {lo} above max {hi}"
            );
        }
    }

    #[test]
    fn test_super_efficiency_exceeds_one_for_extreme_unit() {
        let p = toy();
        let e = solve(&max_efficiency(&p, 4, 1e-9, true));
        assert!((e - 2.0).abs() < 1e-6, "super-efficiency of E, got {e}");
    }

    #[test]
    fn test_pairwise_sign() {
        let p = toy();
        // E dominates A everywhere: max of A's ratio with E pinned stays
        // below 1.
        let a_over_e = solve(&pairwise(&p, 0, 4, 1e-9));
        assert!(a_over_e < 0.0, "A should never beat E, got {a_over_e}");
        // D beats E for input-2-heavy weights.
        let d_over_e = solve(&pairwise(&p, 3, 4, 1e-9));
        assert!(d_over_e > 0.0, "D should sometimes beat E, got {d_over_e}");
    }
}
