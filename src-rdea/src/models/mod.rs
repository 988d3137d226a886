//! LP/MILP model builders
//!
//! One free-standing constructor per (efficiency model, question) pair.
//! Builders only assemble [`ModelSpec`] values; classification of solver
//! outcomes stays with the drivers.

use rdea_lp::{ConstraintOp, LinExpr, ModelSpec, Var};

use crate::value_fn::{Envelope, Polarity};

pub mod ccr;
pub mod imprecise;
pub mod vdea;

/// Which units read their interval data at the favorable end of the box.
///
/// Monotonicity pins the optimizing realization of interval data to a box
/// corner, so imprecise builders take a corner policy instead of carrying
/// per-cell variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CornerPolicy {
    /// The named unit is favored; everyone else reads unfavorably.
    FavorUnit(usize),
    /// The named unit reads unfavorably; everyone else is favored.
    DisfavorUnit(usize),
}

impl CornerPolicy {
    pub(crate) fn favors(self, unit: usize) -> bool {
        match self {
            CornerPolicy::FavorUnit(a) => unit == a,
            CornerPolicy::DisfavorUnit(a) => unit != a,
        }
    }
}

/// Weight-folded value variables for one factor: `z_j = w * u(x_j)` at each
/// breakpoint. Emits the anchors (0 at the worst end, `w` at the best end),
/// the monotonicity chain and the envelope rows; returns the breakpoint
/// variables.
pub(crate) fn folded_value_vars(spec: &mut ModelSpec, env: &Envelope, w: Var) -> Vec<Var> {
    let l = env.len();
    let z: Vec<Var> = (0..l).map(|_| spec.add_var(0.0, 1.0)).collect();
    let best = env.best_end();
    let worst = env.worst_end();

    spec.add_row(LinExpr::term(z[worst], 1.0), ConstraintOp::Eq, 0.0);
    let mut anchor = LinExpr::new();
    anchor.add(z[best], 1.0).add(w, -1.0);
    spec.add_row(anchor, ConstraintOp::Eq, 0.0);

    for j in 0..l - 1 {
        let mut step = LinExpr::new();
        step.add(z[j + 1], 1.0).add(z[j], -1.0);
        match env.polarity() {
            Polarity::Gain => spec.add_row(step, ConstraintOp::Ge, 0.0),
            Polarity::Cost => spec.add_row(step, ConstraintOp::Le, 0.0),
        }
    }

    let (lo, up) = (env.lower(), env.upper());
    for j in 0..l {
        if j == best || j == worst {
            continue;
        }
        if (up[j] - lo[j]).abs() <= 1e-12 {
            let mut row = LinExpr::new();
            row.add(z[j], 1.0).add(w, -lo[j]);
            spec.add_row(row, ConstraintOp::Eq, 0.0);
        } else {
            // z >= 0 covers lo == 0; monotonicity to the best anchor covers
            // up == 1.
            if lo[j] > 0.0 {
                let mut row = LinExpr::new();
                row.add(z[j], 1.0).add(w, -lo[j]);
                spec.add_row(row, ConstraintOp::Ge, 0.0);
            }
            if up[j] < 1.0 {
                let mut row = LinExpr::new();
                row.add(z[j], 1.0).add(w, -up[j]);
                spec.add_row(row, ConstraintOp::Le, 0.0);
            }
        }
    }
    z
}

/// Interpolation read-out of a folded value at abscissa `x`.
pub(crate) fn folded_value_at(expr: &mut LinExpr, env: &Envelope, z: &[Var], x: f64, scale: f64) {
    let (j, theta) = env.segment(x);
    expr.add(z[j], scale * (1.0 - theta));
    expr.add(z[j + 1], scale * theta);
}
