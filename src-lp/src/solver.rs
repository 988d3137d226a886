//! LP/MILP oracle adapter
//!
//! The engine sees one operation: hand a [`ModelSpec`] to a backend, get a
//! status, an objective value and a variable assignment back. The default
//! backend is `microlp` (pure-Rust simplex with branch-and-bound for integer
//! variables). Anything the oracle reports beyond optimal/infeasible/
//! unbounded is folded into [`SolveStatus::NumericalError`]; panics never
//! cross this boundary.

use microlp::{ComparisonOp, OptimizationDirection, Problem};

use crate::{ConstraintOp, Direction, ModelSpec};

/// Outcome classification of one oracle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NumericalError,
}

/// Result of one oracle call. `objective` and `values` are meaningful only
/// when `status == Optimal`.
#[derive(Debug, Clone)]
pub struct LpOutcome {
    pub status: SolveStatus,
    pub objective: f64,
    pub values: Vec<f64>,
}

impl LpOutcome {
    fn failed(status: SolveStatus) -> Self {
        Self {
            status,
            objective: f64::NAN,
            values: Vec::new(),
        }
    }
}

/// Narrow seam to the LP/MILP oracle.
pub trait LpBackend {
    fn solve(&mut self, model: &ModelSpec) -> LpOutcome;
}

/// Default backend over the `microlp` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLp;

impl LpBackend for MicroLp {
    fn solve(&mut self, model: &ModelSpec) -> LpOutcome {
        let direction = match model.direction {
            Direction::Minimize => OptimizationDirection::Minimize,
            Direction::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = Problem::new(direction);

        // Dense objective so each column carries its coefficient at creation.
        let mut obj = vec![0.0; model.var_count()];
        for (var, coef) in model.objective.canonicalize() {
            obj[var.0] = coef;
        }

        let mut vars = Vec::with_capacity(model.var_count());
        for (i, def) in model.vars().iter().enumerate() {
            let v = if def.integer {
                let lo = def.lower.max(i32::MIN as f64).ceil() as i32;
                let hi = def.upper.min(i32::MAX as f64).floor() as i32;
                problem.add_integer_var(obj[i], (lo, hi))
            } else {
                problem.add_var(obj[i], (def.lower, def.upper))
            };
            vars.push(v);
        }

        for row in model.rows() {
            let terms: Vec<_> = row
                .expr
                .canonicalize()
                .into_iter()
                .map(|(var, coef)| (vars[var.0], coef))
                .collect();
            let op = match row.op {
                ConstraintOp::Le => ComparisonOp::Le,
                ConstraintOp::Ge => ComparisonOp::Ge,
                ConstraintOp::Eq => ComparisonOp::Eq,
            };
            problem.add_constraint(terms, op, row.rhs);
        }

        match problem.solve() {
            Ok(solution) => {
                let values = vars.iter().map(|&v| solution[v]).collect();
                LpOutcome {
                    status: SolveStatus::Optimal,
                    objective: solution.objective(),
                    values,
                }
            }
            Err(microlp::Error::Infeasible) => LpOutcome::failed(SolveStatus::Infeasible),
            Err(microlp::Error::Unbounded) => LpOutcome::failed(SolveStatus::Unbounded),
            Err(_) => LpOutcome::failed(SolveStatus::NumericalError),
        }
    }
}

/// Per-worker solver context.
///
/// Each rayon worker owns one context for the whole driver call; the many
/// near-identical models of the rank and preference drivers all go through
/// it. `microlp` re-factorizes per solve, so the context amortizes only
/// allocation today, but it is the seam where a basis-reusing backend would
/// keep its warm-start state.
#[derive(Debug, Default)]
pub struct SolverCtx<B: LpBackend = MicroLp> {
    backend: B,
    solves: usize,
}

impl<B: LpBackend> SolverCtx<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend, solves: 0 }
    }

    pub fn solve(&mut self, model: &ModelSpec) -> LpOutcome {
        self.solves += 1;
        self.backend.solve(model)
    }

    /// Number of oracle calls issued through this context.
    pub fn solve_count(&self) -> usize {
        self.solves
    }
}

impl SolverCtx<MicroLp> {
    pub fn new() -> Self {
        Self::with_backend(MicroLp)
    }
}
