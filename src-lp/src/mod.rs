//! Solver-agnostic linear and mixed-integer linear models
//!
//! Every optimization question in RDEA is phrased as a [`ModelSpec`]: a flat
//! record of variables (bounds, optional integrality), linear constraint rows
//! and a linear objective. Model builders assemble specs; the [`solver`]
//! module hands them to an LP/MILP oracle and maps the outcome back onto a
//! small status enum.
//!
//! Supported surface:
//! - Sparse linear expressions over indexed variables
//! - Constraint operators <=, >=, =
//! - Continuous variables with finite or infinite bounds
//! - Integer variables (used for frontier-pinning binaries)

use std::fmt;

pub mod solver;

pub use solver::{LpBackend, LpOutcome, MicroLp, SolveStatus, SolverCtx};

/// Index of a variable inside one [`ModelSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var(pub usize);

/// Objective sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// Constraint operator for a row `expr op rhs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintOp::Le => write!(f, "<="),
            ConstraintOp::Ge => write!(f, ">="),
            ConstraintOp::Eq => write!(f, "="),
        }
    }
}

/// Sparse linear expression `sum coef_i * x_i`.
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    terms: Vec<(Var, f64)>,
}

impl LinExpr {
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Single-term expression.
    pub fn term(var: Var, coef: f64) -> Self {
        Self {
            terms: vec![(var, coef)],
        }
    }

    /// Append `coef * var`; zero coefficients are kept out of the row.
    pub fn add(&mut self, var: Var, coef: f64) -> &mut Self {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
        self
    }

    /// Append a whole expression scaled by `scale`.
    pub fn add_scaled(&mut self, other: &LinExpr, scale: f64) -> &mut Self {
        for &(v, c) in &other.terms {
            self.add(v, c * scale);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[(Var, f64)] {
        &self.terms
    }

    /// Merge duplicate variables. Oracles typically reject repeated columns
    /// within one row, so rows are canonicalized before hand-off.
    pub fn canonicalize(&self) -> Vec<(Var, f64)> {
        let mut merged: Vec<(Var, f64)> = Vec::with_capacity(self.terms.len());
        let mut sorted = self.terms.clone();
        sorted.sort_by_key(|&(v, _)| v.0);
        for (v, c) in sorted {
            match merged.last_mut() {
                Some((lv, lc)) if *lv == v => *lc += c,
                _ => merged.push((v, c)),
            }
        }
        merged.retain(|&(_, c)| c != 0.0);
        merged
    }

    /// Evaluate the expression at a dense point.
    pub fn eval(&self, x: &[f64]) -> f64 {
        self.terms.iter().map(|&(v, c)| c * x[v.0]).sum()
    }
}

/// One variable of a model: bounds plus integrality.
#[derive(Debug, Clone, Copy)]
pub struct VarDef {
    pub lower: f64,
    pub upper: f64,
    pub integer: bool,
}

/// One constraint row.
#[derive(Debug, Clone)]
pub struct RowConstraint {
    pub expr: LinExpr,
    pub op: ConstraintOp,
    pub rhs: f64,
}

/// A complete LP/MILP instance, independent of any solver.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub direction: Direction,
    pub objective: LinExpr,
    vars: Vec<VarDef>,
    rows: Vec<RowConstraint>,
}

impl ModelSpec {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            objective: LinExpr::new(),
            vars: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Add a continuous variable and return its handle.
    pub fn add_var(&mut self, lower: f64, upper: f64) -> Var {
        debug_assert!(lower <= upper, "variable bounds inverted");
        self.vars.push(VarDef {
            lower,
            upper,
            integer: false,
        });
        Var(self.vars.len() - 1)
    }

    /// Add an integer variable (bounds are rounded outward by the backend).
    pub fn add_integer_var(&mut self, lower: f64, upper: f64) -> Var {
        self.vars.push(VarDef {
            lower,
            upper,
            integer: true,
        });
        Var(self.vars.len() - 1)
    }

    /// Shorthand for a 0/1 variable.
    pub fn add_binary_var(&mut self) -> Var {
        self.add_integer_var(0.0, 1.0)
    }

    pub fn add_row(&mut self, expr: LinExpr, op: ConstraintOp, rhs: f64) {
        self.rows.push(RowConstraint { expr, op, rhs });
    }

    pub fn set_objective(&mut self, objective: LinExpr) {
        self.objective = objective;
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn rows(&self) -> &[RowConstraint] {
        &self.rows
    }

    pub fn has_integers(&self) -> bool {
        self.vars.iter().any(|v| v.integer)
    }
}
