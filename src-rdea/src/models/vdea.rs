//! Additive value-model (VDEA) builders
//!
//! Products of weights and marginal values are folded into one variable per
//! breakpoint (`z = w * u`), which keeps weight questions and value-function
//! envelope questions inside a single LP. A unit's efficiency is a linear
//! interpolation read-out of the folded variables. Analyses may be scoped to
//! a hierarchy node: only the subtree's leaves enter the model and the
//! simplex row covers them alone.

use rdea_lp::{ConstraintOp, Direction, LinExpr, ModelSpec, Var};

use crate::data::{VdeaProblem, WeightConstraint};
use crate::error::ConfigError;
use crate::models::{folded_value_at, folded_value_vars};

pub(crate) struct VdeaLp {
    pub spec: ModelSpec,
    pub z: Vec<Vec<Var>>,
    pub scope: Vec<usize>,
}

impl VdeaLp {
    /// Efficiency of `unit` as a linear read-out.
    pub fn eff_expr(&self, p: &VdeaProblem, unit: usize) -> LinExpr {
        let mut e = LinExpr::new();
        for (local, &f) in self.scope.iter().enumerate() {
            let env = p.envelope(f);
            folded_value_at(&mut e, env, &self.z[local], p.performances()[(unit, f)], 1.0);
        }
        e
    }
}

/// Map a weight constraint onto local (in-scope) factor coefficients.
/// Hierarchy node names expand to their leaf weights. A constraint touching
/// anything outside the scope does not apply to the scoped question and is
/// dropped.
pub(crate) fn scoped_weight_row(
    p: &VdeaProblem,
    scope: &[usize],
    wc: &WeightConstraint,
) -> Option<Vec<(usize, f64)>> {
    let mut out: Vec<(usize, f64)> = Vec::new();
    for (name, coef) in &wc.coeffs {
        if let Some(f) = p.factor_index(name) {
            let local = scope.iter().position(|&g| g == f)?;
            out.push((local, *coef));
        } else {
            let h = p.hierarchy()?;
            let node = h.node_index(name)?;
            for f in h.factors_under(node) {
                let local = scope.iter().position(|&g| g == f)?;
                out.push((local, *coef));
            }
        }
    }
    Some(out)
}

pub(crate) fn assemble(
    p: &VdeaProblem,
    node: Option<&str>,
    direction: Direction,
) -> Result<VdeaLp, ConfigError> {
    let scope = p.scoped_factors(node)?;
    let mut spec = ModelSpec::new(direction);
    let w: Vec<Var> = scope.iter().map(|_| spec.add_var(0.0, 1.0)).collect();

    let mut simplex = LinExpr::new();
    for &wv in &w {
        simplex.add(wv, 1.0);
    }
    spec.add_row(simplex, ConstraintOp::Eq, 1.0);

    let mut z = Vec::with_capacity(scope.len());
    for (local, &f) in scope.iter().enumerate() {
        z.push(folded_value_vars(&mut spec, p.envelope(f), w[local]));
    }

    for wc in p.weight_constraints() {
        if let Some(coeffs) = scoped_weight_row(p, &scope, wc) {
            let mut row = LinExpr::new();
            for (local, coef) in coeffs {
                row.add(w[local], coef);
            }
            spec.add_row(row, wc.op, wc.rhs);
        }
    }

    Ok(VdeaLp { spec, z, scope })
}

/// Min/max of one unit's efficiency over the admissible family.
pub fn efficiency(
    p: &VdeaProblem,
    node: Option<&str>,
    s: usize,
    direction: Direction,
) -> Result<ModelSpec, ConfigError> {
    let mut lp = assemble(p, node, direction)?;
    let objective = lp.eff_expr(p, s);
    lp.spec.set_objective(objective);
    Ok(lp.spec)
}

/// Min over the family of the distance to the best unit:
/// `min d` with `d >= E_k - E_s` for every rival.
pub fn distance_min(p: &VdeaProblem, node: Option<&str>, s: usize) -> Result<ModelSpec, ConfigError> {
    let mut lp = assemble(p, node, Direction::Minimize)?;
    let d = lp.spec.add_var(0.0, 1.0);
    let eff_s = lp.eff_expr(p, s);
    for k in 0..p.n_units() {
        if k == s {
            continue;
        }
        let mut row = lp.eff_expr(p, k);
        row.add_scaled(&eff_s, -1.0);
        row.add(d, -1.0);
        lp.spec.add_row(row, ConstraintOp::Le, 0.0);
    }
    lp.spec.set_objective(LinExpr::term(d, 1.0));
    Ok(lp.spec)
}

/// One rival's contribution to the max distance: `max E_k - E_s`. The max
/// distance is the outer maximum of these optima over the rivals.
pub fn distance_rival(
    p: &VdeaProblem,
    node: Option<&str>,
    s: usize,
    k: usize,
) -> Result<ModelSpec, ConfigError> {
    pairwise(p, node, k, s)
}

/// Sign model: max of `E_a - E_b` over the admissible family.
pub fn pairwise(
    p: &VdeaProblem,
    node: Option<&str>,
    a: usize,
    b: usize,
) -> Result<ModelSpec, ConfigError> {
    let mut lp = assemble(p, node, Direction::Maximize)?;
    let mut objective = lp.eff_expr(p, a);
    objective.add_scaled(&lp.eff_expr(p, b), -1.0);
    lp.spec.set_objective(objective);
    Ok(lp.spec)
}
