//! Problem data model
//!
//! Problems are validated at construction and treated as immutable during
//! analysis. Weight constraints are appended one at a time to an ordered
//! collection before the first analysis call; each append re-validates the
//! referenced names.

use ndarray::Array2;

use crate::error::ConfigError;
use crate::hierarchy::Hierarchy;
use crate::value_fn::Envelope;

pub use rdea_lp::ConstraintOp;

/// One user weight constraint `sum coeffs[name] * w[name] op rhs`.
#[derive(Debug, Clone)]
pub struct WeightConstraint {
    pub coeffs: Vec<(String, f64)>,
    pub op: ConstraintOp,
    pub rhs: f64,
}

impl WeightConstraint {
    pub fn new(coeffs: Vec<(impl Into<String>, f64)>, op: ConstraintOp, rhs: f64) -> Self {
        Self {
            coeffs: coeffs.into_iter().map(|(n, c)| (n.into(), c)).collect(),
            op,
            rhs,
        }
    }

    pub fn le(coeffs: Vec<(impl Into<String>, f64)>, rhs: f64) -> Self {
        Self::new(coeffs, ConstraintOp::Le, rhs)
    }

    pub fn ge(coeffs: Vec<(impl Into<String>, f64)>, rhs: f64) -> Self {
        Self::new(coeffs, ConstraintOp::Ge, rhs)
    }

    pub fn eq(coeffs: Vec<(impl Into<String>, f64)>, rhs: f64) -> Self {
        Self::new(coeffs, ConstraintOp::Eq, rhs)
    }
}

pub(crate) fn validate_unique_names<'a>(
    names: impl Iterator<Item = &'a String>,
) -> Result<(), ConfigError> {
    let mut seen: Vec<&str> = Vec::new();
    for n in names {
        if seen.contains(&n.as_str()) {
            return Err(ConfigError::DuplicateFactor(n.clone()));
        }
        seen.push(n);
    }
    Ok(())
}

/// Which weight group a ratio-model factor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CcrFactor {
    Input(usize),
    Output(usize),
}

/// Ratio-form (CCR) problem: dense input/output matrices, one row per unit.
///
/// Efficiency is measured relative to the best unit, so scores live in
/// `(0, 1]` and at least one unit attains 1.
#[derive(Debug, Clone)]
pub struct CcrProblem {
    input_names: Vec<String>,
    output_names: Vec<String>,
    inputs: Array2<f64>,
    outputs: Array2<f64>,
    constraints: Vec<WeightConstraint>,
}

impl CcrProblem {
    pub fn new(
        input_names: Vec<impl Into<String>>,
        output_names: Vec<impl Into<String>>,
        inputs: Array2<f64>,
        outputs: Array2<f64>,
    ) -> Result<Self, ConfigError> {
        let input_names: Vec<String> = input_names.into_iter().map(Into::into).collect();
        let output_names: Vec<String> = output_names.into_iter().map(Into::into).collect();
        let n = inputs.nrows();
        if n == 0 || input_names.is_empty() || output_names.is_empty() {
            return Err(ConfigError::EmptyProblem);
        }
        if inputs.ncols() != input_names.len() {
            return Err(ConfigError::ShapeMismatch(format!(
                "inputs are {}x{} but {} input names given",
                n,
                inputs.ncols(),
                input_names.len()
            )));
        }
        if outputs.nrows() != n || outputs.ncols() != output_names.len() {
            return Err(ConfigError::ShapeMismatch(format!(
                "outputs are {}x{} for {} units and {} output names",
                outputs.nrows(),
                outputs.ncols(),
                n,
                output_names.len()
            )));
        }
        validate_unique_names(input_names.iter().chain(output_names.iter()))?;
        let problem = Self {
            input_names,
            output_names,
            inputs,
            outputs,
            constraints: Vec::new(),
        };
        problem.validate_positive()?;
        Ok(problem)
    }

    fn validate_positive(&self) -> Result<(), ConfigError> {
        for k in 0..self.n_units() {
            for (i, name) in self.input_names.iter().enumerate() {
                if self.inputs[(k, i)] <= 0.0 {
                    return Err(ConfigError::NonPositiveData {
                        unit: k,
                        factor: name.clone(),
                    });
                }
            }
            for (r, name) in self.output_names.iter().enumerate() {
                if self.outputs[(k, r)] <= 0.0 {
                    return Err(ConfigError::NonPositiveData {
                        unit: k,
                        factor: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Ratio efficiency is invariant to separate scalings of the input and
    /// the output weight vectors, so a constraint is admissible only when it
    /// is homogeneous (rhs 0) and stays within one weight group.
    pub fn add_weight_constraint(&mut self, wc: WeightConstraint) -> Result<(), ConfigError> {
        if wc.rhs != 0.0 {
            return Err(ConfigError::BadRatioConstraint(format!(
                "rhs {} is not 0",
                wc.rhs
            )));
        }
        let mut groups = wc.coeffs.iter().map(|(name, _)| {
            self.factor(name)
                .map(|f| matches!(f, CcrFactor::Input(_)))
        });
        let first = match groups.next() {
            Some(g) => g?,
            None => {
                return Err(ConfigError::BadRatioConstraint(
                    "constraint has no terms".into(),
                ));
            }
        };
        for g in groups {
            if g? != first {
                return Err(ConfigError::BadRatioConstraint(
                    "constraint mixes input and output weights".into(),
                ));
            }
        }
        self.constraints.push(wc);
        Ok(())
    }

    pub(crate) fn factor(&self, name: &str) -> Result<CcrFactor, ConfigError> {
        if let Some(i) = self.input_names.iter().position(|n| n == name) {
            return Ok(CcrFactor::Input(i));
        }
        if let Some(r) = self.output_names.iter().position(|n| n == name) {
            return Ok(CcrFactor::Output(r));
        }
        Err(ConfigError::UnknownFactor(name.to_string()))
    }

    pub fn n_units(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn n_inputs(&self) -> usize {
        self.input_names.len()
    }

    pub fn n_outputs(&self) -> usize {
        self.output_names.len()
    }

    pub fn inputs(&self) -> &Array2<f64> {
        &self.inputs
    }

    pub fn outputs(&self) -> &Array2<f64> {
        &self.outputs
    }

    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn weight_constraints(&self) -> &[WeightConstraint] {
        &self.constraints
    }
}

/// Additive value-model (VDEA) problem.
///
/// Efficiency of a unit is `sum_f w_f * u_f(p_{f,unit})` with weights in the
/// constrained unit simplex and each `u_f` a realization inside the factor's
/// envelope. An optional hierarchy groups factors; analyses may be scoped to
/// any of its nodes.
#[derive(Debug, Clone)]
pub struct VdeaProblem {
    factor_names: Vec<String>,
    performances: Array2<f64>,
    envelopes: Vec<Envelope>,
    constraints: Vec<WeightConstraint>,
    hierarchy: Option<Hierarchy>,
}

impl VdeaProblem {
    pub fn new(
        factor_names: Vec<impl Into<String>>,
        performances: Array2<f64>,
        envelopes: Vec<Envelope>,
    ) -> Result<Self, ConfigError> {
        let factor_names: Vec<String> = factor_names.into_iter().map(Into::into).collect();
        let n = performances.nrows();
        let m = factor_names.len();
        if n == 0 || m == 0 {
            return Err(ConfigError::EmptyProblem);
        }
        if performances.ncols() != m || envelopes.len() != m {
            return Err(ConfigError::ShapeMismatch(format!(
                "performances are {}x{} for {} factors and {} envelopes",
                n,
                performances.ncols(),
                m,
                envelopes.len()
            )));
        }
        validate_unique_names(factor_names.iter())?;
        for (f, env) in envelopes.iter().enumerate() {
            env.validate_for(&factor_names[f])?;
            for k in 0..n {
                let p = performances[(k, f)];
                if !env.in_domain(p) {
                    return Err(ConfigError::OutOfDomain {
                        unit: k,
                        factor: factor_names[f].clone(),
                        value: p,
                    });
                }
            }
        }
        Ok(Self {
            factor_names,
            performances,
            envelopes,
            constraints: Vec::new(),
            hierarchy: None,
        })
    }

    /// Attach a hierarchy; its leaves must match the factor set exactly.
    pub fn with_hierarchy(mut self, mut hierarchy: Hierarchy) -> Result<Self, ConfigError> {
        hierarchy.bind_factors(&self.factor_names)?;
        self.hierarchy = Some(hierarchy);
        Ok(self)
    }

    pub fn add_weight_constraint(&mut self, wc: WeightConstraint) -> Result<(), ConfigError> {
        for (name, _) in &wc.coeffs {
            let known = self.factor_names.iter().any(|n| n == name)
                || self
                    .hierarchy
                    .as_ref()
                    .is_some_and(|h| h.node_index(name).is_some());
            if !known {
                return Err(ConfigError::UnknownFactor(name.clone()));
            }
        }
        self.constraints.push(wc);
        Ok(())
    }

    pub fn n_units(&self) -> usize {
        self.performances.nrows()
    }

    pub fn n_factors(&self) -> usize {
        self.factor_names.len()
    }

    pub fn performances(&self) -> &Array2<f64> {
        &self.performances
    }

    pub fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    pub fn factor_index(&self, name: &str) -> Option<usize> {
        self.factor_names.iter().position(|n| n == name)
    }

    pub fn envelope(&self, f: usize) -> &Envelope {
        &self.envelopes[f]
    }

    pub fn weight_constraints(&self) -> &[WeightConstraint] {
        &self.constraints
    }

    pub fn hierarchy(&self) -> Option<&Hierarchy> {
        self.hierarchy.as_ref()
    }

    /// Factor indices in scope for an analysis at `node` (`None` = all).
    pub(crate) fn scoped_factors(&self, node: Option<&str>) -> Result<Vec<usize>, ConfigError> {
        match node {
            None => Ok((0..self.n_factors()).collect()),
            Some(name) => {
                let h = self
                    .hierarchy
                    .as_ref()
                    .ok_or_else(|| ConfigError::UnknownFactor(name.to_string()))?;
                let idx = h
                    .node_index(name)
                    .ok_or_else(|| ConfigError::UnknownFactor(name.to_string()))?;
                Ok(h.factors_under(idx))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy_ccr() -> CcrProblem {
        CcrProblem::new(
            vec!["x1", "x2"],
            vec!["y"],
            array![[1.0, 2.0], [5.0, 7.0]],
            array![[1.0], [10.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_ccr_rejects_duplicate_names() {
        let r = CcrProblem::new(
            vec!["a", "b"],
            vec!["a"],
            array![[1.0, 2.0]],
            array![[1.0]],
        );
        assert!(matches!(r, Err(ConfigError::DuplicateFactor(_))));
    }

    #[test]
    fn test_ccr_rejects_nonpositive_data() {
        let r = CcrProblem::new(
            vec!["x"],
            vec!["y"],
            array![[1.0], [0.0]],
            array![[1.0], [1.0]],
        );
        assert!(matches!(r, Err(ConfigError::NonPositiveData { unit: 1, .. })));
    }

    #[test]
    fn test_ccr_rejects_inhomogeneous_constraint() {
        let mut p = toy_ccr();
        let r = p.add_weight_constraint(WeightConstraint::le(vec![("x1", 1.0)], 0.5));
        assert!(matches!(r, Err(ConfigError::BadRatioConstraint(_))));
    }

    #[test]
    fn test_ccr_rejects_mixed_group_constraint() {
        let mut p = toy_ccr();
        let r = p.add_weight_constraint(WeightConstraint::le(
            vec![("x1", 1.0), ("y", -1.0)],
            0.0,
        ));
        assert!(matches!(r, Err(ConfigError::BadRatioConstraint(_))));
    }

    #[test]
    fn test_ccr_accepts_assurance_region_row() {
        let mut p = toy_ccr();
        // w(x1) <= 3 w(x2)
        p.add_weight_constraint(WeightConstraint::le(
            vec![("x1", 1.0), ("x2", -3.0)],
            0.0,
        ))
        .unwrap();
        assert_eq!(p.weight_constraints().len(), 1);
    }

    #[test]
    fn test_vdea_rejects_out_of_domain_performance() {
        let r = VdeaProblem::new(
            vec!["f"],
            array![[2.0]],
            vec![Envelope::linear_gain(0.0, 1.0)],
        );
        assert!(matches!(r, Err(ConfigError::OutOfDomain { .. })));
    }

    #[test]
    fn test_vdea_constraint_may_name_hierarchy_node() {
        let mut h = Hierarchy::new("all");
        h.add_node("grp", "all").unwrap();
        h.add_node("f1", "grp").unwrap();
        h.add_node("f2", "all").unwrap();
        let mut p = VdeaProblem::new(
            vec!["f1", "f2"],
            array![[0.5, 0.5]],
            vec![
                Envelope::linear_gain(0.0, 1.0),
                Envelope::linear_gain(0.0, 1.0),
            ],
        )
        .unwrap()
        .with_hierarchy(h)
        .unwrap();
        p.add_weight_constraint(WeightConstraint::ge(vec![("grp", 1.0)], 0.3))
            .unwrap();
        assert!(
            p.add_weight_constraint(WeightConstraint::ge(vec![("nope", 1.0)], 0.3))
                .is_err()
        );
    }

    #[test]
    fn test_scoped_factors_at_root_and_node() {
        let mut h = Hierarchy::new("all");
        h.add_node("grp", "all").unwrap();
        h.add_node("f1", "grp").unwrap();
        h.add_node("f2", "all").unwrap();
        let p = VdeaProblem::new(
            vec!["f1", "f2"],
            array![[0.5, 0.5]],
            vec![
                Envelope::linear_gain(0.0, 1.0),
                Envelope::linear_gain(0.0, 1.0),
            ],
        )
        .unwrap()
        .with_hierarchy(h)
        .unwrap();
        assert_eq!(p.scoped_factors(None).unwrap(), vec![0, 1]);
        assert_eq!(p.scoped_factors(Some("grp")).unwrap(), vec![0]);
        assert_eq!(p.scoped_factors(Some("all")).unwrap(), vec![0, 1]);
        assert!(p.scoped_factors(Some("missing")).is_err());
    }
}
