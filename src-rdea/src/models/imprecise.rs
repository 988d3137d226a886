//! Builders over imprecise performance information
//!
//! Interval data never becomes a variable: monotonicity pins the optimizing
//! realization to a corner of the box, chosen by the question's
//! [`CornerPolicy`]. Ordinal data stays variable. In the ratio model the
//! weight-times-value products are substituted (`t = u * z`), which turns
//! the rank chains into linear rows; in the value model the per-rank values
//! are folded into `[0, w]` directly. The realized ordinal scale is
//! normalized so its largest value is 1.

use rdea_lp::{ConstraintOp, Direction, LinExpr, ModelSpec, Var};

use crate::data::CcrFactor;
use crate::error::ConfigError;
use crate::imprecise::{FactorData, ImpreciseCcrProblem, ImpreciseVdeaProblem};
use crate::models::{CornerPolicy, folded_value_at, folded_value_vars};
use crate::value_fn::Polarity;

/// Interval read-out for a gain-like quantity (outputs, gain factors).
fn gain_corner(favorable: bool, lo: f64, hi: f64) -> f64 {
    if favorable { hi } else { lo }
}

/// Interval read-out for a cost-like quantity (inputs, cost factors).
fn cost_corner(favorable: bool, lo: f64, hi: f64) -> f64 {
    if favorable { lo } else { hi }
}

// ---------------------------- value model ----------------------------

enum VdeaFactorVars {
    /// Folded breakpoint values of a cardinal factor.
    Cardinal(Vec<Var>),
    /// Folded per-unit values of an ordinal factor.
    Ordinal(Vec<Var>),
}

pub(crate) struct ImpVdeaLp {
    pub spec: ModelSpec,
    kind: Vec<VdeaFactorVars>,
    policy: CornerPolicy,
}

impl ImpVdeaLp {
    pub fn eff_expr(&self, p: &ImpreciseVdeaProblem, unit: usize) -> LinExpr {
        let mut e = LinExpr::new();
        for f in 0..p.n_factors() {
            match &self.kind[f] {
                VdeaFactorVars::Cardinal(z) => {
                    let env = p.envelope(f).expect("cardinal factor has an envelope");
                    let x = match p.data(f) {
                        FactorData::Precise(v) => v[unit],
                        FactorData::Interval { lo, hi } => match env.polarity() {
                            Polarity::Gain => {
                                gain_corner(self.policy.favors(unit), lo[unit], hi[unit])
                            }
                            Polarity::Cost => {
                                cost_corner(self.policy.favors(unit), lo[unit], hi[unit])
                            }
                        },
                        FactorData::Ordinal { .. } => unreachable!("ordinal factor marked cardinal"),
                    };
                    folded_value_at(&mut e, env, z, x, 1.0);
                }
                VdeaFactorVars::Ordinal(zeta) => {
                    e.add(zeta[unit], 1.0);
                }
            }
        }
        e
    }
}

pub(crate) fn assemble_vdea(
    p: &ImpreciseVdeaProblem,
    direction: Direction,
    policy: CornerPolicy,
) -> ImpVdeaLp {
    let mut spec = ModelSpec::new(direction);
    let m = p.n_factors();
    let n = p.n_units();
    let rho = p.options().vf_monotonicity_ratio;

    let w: Vec<Var> = (0..m).map(|_| spec.add_var(0.0, 1.0)).collect();
    let mut simplex = LinExpr::new();
    for &wv in &w {
        simplex.add(wv, 1.0);
    }
    spec.add_row(simplex, ConstraintOp::Eq, 1.0);

    let mut kind = Vec::with_capacity(m);
    for f in 0..m {
        match p.data(f) {
            FactorData::Ordinal { .. } => {
                let zeta: Vec<Var> = (0..n).map(|_| spec.add_var(0.0, 1.0)).collect();
                let order = p.data(f).units_by_rank();
                // Best-ranked value capped by the factor weight.
                let mut cap = LinExpr::new();
                cap.add(zeta[order[0]], 1.0).add(w[f], -1.0);
                spec.add_row(cap, ConstraintOp::Le, 0.0);
                // Monotone along the ranking.
                for j in 0..n - 1 {
                    let mut step = LinExpr::new();
                    step.add(zeta[order[j]], 1.0).add(zeta[order[j + 1]], -1.0);
                    spec.add_row(step, ConstraintOp::Ge, 0.0);
                }
                // Increments grow toward better ranks by at least `rho`.
                if rho > 1.0 {
                    for j in 0..n.saturating_sub(2) {
                        let mut row = LinExpr::new();
                        row.add(zeta[order[j]], 1.0)
                            .add(zeta[order[j + 1]], -1.0 - rho)
                            .add(zeta[order[j + 2]], rho);
                        spec.add_row(row, ConstraintOp::Ge, 0.0);
                    }
                }
                kind.push(VdeaFactorVars::Ordinal(zeta));
            }
            _ => {
                let env = p.envelope(f).expect("cardinal factor has an envelope");
                kind.push(VdeaFactorVars::Cardinal(folded_value_vars(
                    &mut spec, env, w[f],
                )));
            }
        }
    }

    for wc in p.weight_constraints() {
        let mut row = LinExpr::new();
        for (name, coef) in &wc.coeffs {
            let f = p
                .factor_names()
                .iter()
                .position(|nm| nm == name)
                .expect("constraint names validated on add");
            row.add(w[f], *coef);
        }
        spec.add_row(row, wc.op, wc.rhs);
    }

    ImpVdeaLp { spec, kind, policy }
}

pub fn vdea_efficiency(
    p: &ImpreciseVdeaProblem,
    s: usize,
    direction: Direction,
) -> Result<ModelSpec, ConfigError> {
    let policy = match direction {
        Direction::Maximize => CornerPolicy::FavorUnit(s),
        Direction::Minimize => CornerPolicy::DisfavorUnit(s),
    };
    let mut lp = assemble_vdea(p, direction, policy);
    let objective = lp.eff_expr(p, s);
    lp.spec.set_objective(objective);
    Ok(lp.spec)
}

pub fn vdea_distance_min(p: &ImpreciseVdeaProblem, s: usize) -> Result<ModelSpec, ConfigError> {
    let mut lp = assemble_vdea(p, Direction::Minimize, CornerPolicy::FavorUnit(s));
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

pub fn vdea_distance_rival(
    p: &ImpreciseVdeaProblem,
    s: usize,
    k: usize,
) -> Result<ModelSpec, ConfigError> {
    vdea_pairwise(p, k, s)
}

/// Sign model: max of `E_a - E_b` over weights, shapes and realizations.
pub fn vdea_pairwise(
    p: &ImpreciseVdeaProblem,
    a: usize,
    b: usize,
) -> Result<ModelSpec, ConfigError> {
    let mut lp = assemble_vdea(p, Direction::Maximize, CornerPolicy::FavorUnit(a));
    let mut objective = lp.eff_expr(p, a);
    objective.add_scaled(&lp.eff_expr(p, b), -1.0);
    lp.spec.set_objective(objective);
    Ok(lp.spec)
}

// ---------------------------- ratio model ----------------------------

pub(crate) struct ImpCcrLp {
    pub spec: ModelSpec,
    v: Vec<Var>,
    u: Vec<Var>,
    /// Product variables `tau = v * z` per ordinal input, per unit.
    tin: Vec<Option<Vec<Var>>>,
    /// Product variables `t = u * z` per ordinal output, per unit.
    tout: Vec<Option<Vec<Var>>>,
    policy: CornerPolicy,
}

impl ImpCcrLp {
    pub fn input_expr(&self, p: &ImpreciseCcrProblem, unit: usize) -> LinExpr {
        let mut e = LinExpr::new();
        for i in 0..p.n_inputs() {
            match (p.input_data(i), &self.tin[i]) {
                (FactorData::Precise(x), _) => {
                    e.add(self.v[i], x[unit]);
                }
                (FactorData::Interval { lo, hi }, _) => {
                    e.add(
                        self.v[i],
                        cost_corner(self.policy.favors(unit), lo[unit], hi[unit]),
                    );
                }
                (FactorData::Ordinal { .. }, Some(tau)) => {
                    e.add(tau[unit], 1.0);
                }
                (FactorData::Ordinal { .. }, None) => unreachable!("ordinal input without vars"),
            }
        }
        e
    }

    pub fn output_expr(&self, p: &ImpreciseCcrProblem, unit: usize) -> LinExpr {
        let mut e = LinExpr::new();
        for r in 0..p.n_outputs() {
            match (p.output_data(r), &self.tout[r]) {
                (FactorData::Precise(y), _) => {
                    e.add(self.u[r], y[unit]);
                }
                (FactorData::Interval { lo, hi }, _) => {
                    e.add(
                        self.u[r],
                        gain_corner(self.policy.favors(unit), lo[unit], hi[unit]),
                    );
                }
                (FactorData::Ordinal { .. }, Some(t)) => {
                    e.add(t[unit], 1.0);
                }
                (FactorData::Ordinal { .. }, None) => unreachable!("ordinal output without vars"),
            }
        }
        e
    }
}

pub(crate) fn assemble_ccr(
    p: &ImpreciseCcrProblem,
    direction: Direction,
    policy: CornerPolicy,
    eps: f64,
) -> ImpCcrLp {
    let mut spec = ModelSpec::new(direction);
    let n = p.n_units();
    let rho = p.options().ordinal_ratio;
    let floor = p.options().ordinal_min;

    let v: Vec<Var> = (0..p.n_inputs())
        .map(|_| spec.add_var(eps, f64::INFINITY))
        .collect();
    let u: Vec<Var> = (0..p.n_outputs())
        .map(|_| spec.add_var(eps, f64::INFINITY))
        .collect();

    // Ordinal inputs: rank 1 consumes least. The realized scale tops out at
    // 1, so the worst-ranked product is pinned to the weight itself.
    let mut tin = Vec::with_capacity(p.n_inputs());
    for i in 0..p.n_inputs() {
        if let FactorData::Ordinal { .. } = p.input_data(i) {
            let tau: Vec<Var> = (0..n).map(|_| spec.add_var(0.0, f64::INFINITY)).collect();
            let order = p.input_data(i).units_by_rank();
            let mut pin = LinExpr::new();
            pin.add(tau[order[n - 1]], 1.0).add(v[i], -1.0);
            spec.add_row(pin, ConstraintOp::Eq, 0.0);
            for j in 0..n - 1 {
                let mut step = LinExpr::new();
                step.add(tau[order[j + 1]], 1.0).add(tau[order[j]], -rho);
                spec.add_row(step, ConstraintOp::Ge, 0.0);
            }
            if floor > 0.0 {
                let mut low = LinExpr::new();
                low.add(tau[order[0]], 1.0).add(v[i], -floor);
                spec.add_row(low, ConstraintOp::Ge, 0.0);
            }
            tin.push(Some(tau));
        } else {
            tin.push(None);
        }
    }

    // Ordinal outputs: rank 1 produces most and is pinned to the weight.
    let mut tout = Vec::with_capacity(p.n_outputs());
    for r in 0..p.n_outputs() {
        if let FactorData::Ordinal { .. } = p.output_data(r) {
            let t: Vec<Var> = (0..n).map(|_| spec.add_var(0.0, f64::INFINITY)).collect();
            let order = p.output_data(r).units_by_rank();
            let mut pin = LinExpr::new();
            pin.add(t[order[0]], 1.0).add(u[r], -1.0);
            spec.add_row(pin, ConstraintOp::Eq, 0.0);
            for j in 0..n - 1 {
                let mut step = LinExpr::new();
                step.add(t[order[j]], 1.0).add(t[order[j + 1]], -rho);
                spec.add_row(step, ConstraintOp::Ge, 0.0);
            }
            if floor > 0.0 {
                let mut low = LinExpr::new();
                low.add(t[order[n - 1]], 1.0).add(u[r], -floor);
                spec.add_row(low, ConstraintOp::Ge, 0.0);
            }
            tout.push(Some(t));
        } else {
            tout.push(None);
        }
    }

    ImpCcrLp {
        spec,
        v,
        u,
        tin,
        tout,
        policy,
    }
}

fn user_rows(lp: &mut ImpCcrLp, p: &ImpreciseCcrProblem) {
    for wc in p.weight_constraints() {
        let mut row = LinExpr::new();
        for (name, coef) in &wc.coeffs {
            match p.factor(name).expect("constraint names validated on add") {
                CcrFactor::Input(i) => row.add(lp.v[i], *coef),
                CcrFactor::Output(r) => row.add(lp.u[r], *coef),
            };
        }
        lp.spec.add_row(row, wc.op, wc.rhs);
    }
}

fn envelope_rows(lp: &mut ImpCcrLp, p: &ImpreciseCcrProblem, skip: Option<usize>) {
    for k in 0..p.n_units() {
        if Some(k) == skip {
            continue;
        }
        let mut row = lp.output_expr(p, k);
        let input = lp.input_expr(p, k);
        row.add_scaled(&input, -1.0);
        lp.spec.add_row(row, ConstraintOp::Le, 0.0);
    }
}

pub fn ccr_max_efficiency(
    p: &ImpreciseCcrProblem,
    s: usize,
    eps: f64,
    exclude_subject: bool,
) -> ModelSpec {
    let mut lp = assemble_ccr(p, Direction::Maximize, CornerPolicy::FavorUnit(s), eps);
    let objective = lp.output_expr(p, s);
    lp.spec.set_objective(objective);
    let norm = lp.input_expr(p, s);
    lp.spec.add_row(norm, ConstraintOp::Eq, 1.0);
    envelope_rows(&mut lp, p, exclude_subject.then_some(s));
    user_rows(&mut lp, p);
    lp.spec
}

/// One candidate LP of the min-efficiency question: unit `candidate` is
/// pinned to the frontier; the true minimum is the smallest optimum over
/// the feasible candidates.
pub fn ccr_min_efficiency_candidate(
    p: &ImpreciseCcrProblem,
    s: usize,
    candidate: usize,
    eps: f64,
    exclude_subject: bool,
) -> ModelSpec {
    let mut lp = assemble_ccr(p, Direction::Minimize, CornerPolicy::DisfavorUnit(s), eps);
    let objective = lp.output_expr(p, s);
    lp.spec.set_objective(objective);
    let norm = lp.input_expr(p, s);
    lp.spec.add_row(norm, ConstraintOp::Eq, 1.0);
    envelope_rows(&mut lp, p, exclude_subject.then_some(s));
    let mut pin = lp.output_expr(p, candidate);
    let input = lp.input_expr(p, candidate);
    pin.add_scaled(&input, -1.0);
    lp.spec.add_row(pin, ConstraintOp::Eq, 0.0);
    user_rows(&mut lp, p);
    lp.spec
}

/// Sign model with unit `b` pinned to ratio 1, as in the precise builder;
/// `a` reads its box favorably, `b` unfavorably, ordinal chains stay shared.
pub fn ccr_pairwise(p: &ImpreciseCcrProblem, a: usize, b: usize, eps: f64) -> ModelSpec {
    let mut lp = assemble_ccr(p, Direction::Maximize, CornerPolicy::FavorUnit(a), eps);
    let mut objective = lp.output_expr(p, a);
    let input_a = lp.input_expr(p, a);
    objective.add_scaled(&input_a, -1.0);
    lp.spec.set_objective(objective);
    let out_b = lp.output_expr(p, b);
    lp.spec.add_row(out_b, ConstraintOp::Eq, 1.0);
    let in_b = lp.input_expr(p, b);
    lp.spec.add_row(in_b, ConstraintOp::Eq, 1.0);
    user_rows(&mut lp, p);
    lp.spec
}
