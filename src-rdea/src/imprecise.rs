//! Imprecise performance information
//!
//! A factor's data can be precise reals, per-unit intervals, or a strict
//! ordinal ranking. The tolerances live with the problem value: the
//! multiplicative gap between units adjacent in an ordinal ranking, the
//! floor for the lowest realized ordinal value, and the increment-ratio
//! bound on value functions along ordinal axes. They enter the models as
//! constraint coefficients, so changing them means building a new problem.

use ndarray::Array1;

use crate::data::{CcrFactor, WeightConstraint, validate_unique_names};
use crate::error::ConfigError;
use crate::value_fn::Envelope;

/// Per-factor performance data.
#[derive(Debug, Clone)]
pub enum FactorData {
    /// One real per unit.
    Precise(Array1<f64>),
    /// Per-unit `[lo, hi]` with `lo <= hi`.
    Interval { lo: Array1<f64>, hi: Array1<f64> },
    /// Strict ranking, a permutation of `1..=n`; rank 1 is best.
    Ordinal { ranks: Vec<usize> },
}

impl FactorData {
    pub fn n_units(&self) -> usize {
        match self {
            FactorData::Precise(v) => v.len(),
            FactorData::Interval { lo, .. } => lo.len(),
            FactorData::Ordinal { ranks } => ranks.len(),
        }
    }

    pub fn is_ordinal(&self) -> bool {
        matches!(self, FactorData::Ordinal { .. })
    }

    fn validate(&self, n: usize, factor: &str, positive: bool) -> Result<(), ConfigError> {
        if self.n_units() != n {
            return Err(ConfigError::ShapeMismatch(format!(
                "factor `{factor}` has data for {} of {} units",
                self.n_units(),
                n
            )));
        }
        match self {
            FactorData::Precise(v) => {
                if positive {
                    for (k, &x) in v.iter().enumerate() {
                        if x <= 0.0 {
                            return Err(ConfigError::NonPositiveData {
                                unit: k,
                                factor: factor.to_string(),
                            });
                        }
                    }
                }
            }
            FactorData::Interval { lo, hi } => {
                if hi.len() != n {
                    return Err(ConfigError::ShapeMismatch(format!(
                        "factor `{factor}` interval bounds differ in length"
                    )));
                }
                for k in 0..n {
                    if lo[k] > hi[k] {
                        return Err(ConfigError::BadInterval {
                            unit: k,
                            factor: factor.to_string(),
                        });
                    }
                    if positive && lo[k] <= 0.0 {
                        return Err(ConfigError::NonPositiveData {
                            unit: k,
                            factor: factor.to_string(),
                        });
                    }
                }
            }
            FactorData::Ordinal { ranks } => {
                let mut seen = vec![false; n];
                for &r in ranks {
                    if r < 1 || r > n || seen[r - 1] {
                        return Err(ConfigError::BadOrdinalRanks {
                            factor: factor.to_string(),
                        });
                    }
                    seen[r - 1] = true;
                }
            }
        }
        Ok(())
    }

    /// Unit indices ordered best rank first. Only meaningful for ordinal data.
    pub(crate) fn units_by_rank(&self) -> Vec<usize> {
        match self {
            FactorData::Ordinal { ranks } => {
                let mut order: Vec<usize> = (0..ranks.len()).collect();
                order.sort_by_key(|&k| ranks[k]);
                order
            }
            _ => Vec::new(),
        }
    }
}

/// Tolerances of the imprecise models.
#[derive(Debug, Clone, Copy)]
pub struct ImpreciseOptions {
    /// Multiplicative gap between realized values of units adjacent in an
    /// ordinal ranking.
    pub ordinal_ratio: f64,
    /// Floor for the smallest realized ordinal value (the top of the scale
    /// is pinned to 1).
    pub ordinal_min: f64,
    /// Minimum ratio between consecutive value-function increments along an
    /// ordinal axis.
    pub vf_monotonicity_ratio: f64,
}

impl Default for ImpreciseOptions {
    fn default() -> Self {
        Self {
            ordinal_ratio: 1.0001,
            ordinal_min: 0.0,
            vf_monotonicity_ratio: 1.0,
        }
    }
}

impl ImpreciseOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ordinal_ratio < 1.0 {
            return Err(ConfigError::BadOptions(format!(
                "ordinal_ratio {} < 1",
                self.ordinal_ratio
            )));
        }
        if self.ordinal_min < 0.0 || self.ordinal_min >= 1.0 {
            return Err(ConfigError::BadOptions(format!(
                "ordinal_min {} outside [0, 1)",
                self.ordinal_min
            )));
        }
        if self.vf_monotonicity_ratio < 1.0 {
            return Err(ConfigError::BadOptions(format!(
                "vf_monotonicity_ratio {} < 1",
                self.vf_monotonicity_ratio
            )));
        }
        Ok(())
    }
}

/// VDEA problem over imprecise data. Non-ordinal factors carry an envelope;
/// ordinal factors are scored through per-rank value variables instead.
#[derive(Debug, Clone)]
pub struct ImpreciseVdeaProblem {
    factor_names: Vec<String>,
    data: Vec<FactorData>,
    envelopes: Vec<Option<Envelope>>,
    constraints: Vec<WeightConstraint>,
    options: ImpreciseOptions,
    n_units: usize,
}

impl ImpreciseVdeaProblem {
    pub fn new(
        factor_names: Vec<impl Into<String>>,
        data: Vec<FactorData>,
        envelopes: Vec<Option<Envelope>>,
        options: ImpreciseOptions,
    ) -> Result<Self, ConfigError> {
        let factor_names: Vec<String> = factor_names.into_iter().map(Into::into).collect();
        let m = factor_names.len();
        if m == 0 || data.is_empty() {
            return Err(ConfigError::EmptyProblem);
        }
        if data.len() != m || envelopes.len() != m {
            return Err(ConfigError::ShapeMismatch(format!(
                "{} factors, {} data columns, {} envelopes",
                m,
                data.len(),
                envelopes.len()
            )));
        }
        validate_unique_names(factor_names.iter())?;
        options.validate()?;
        let n = data[0].n_units();
        if n == 0 {
            return Err(ConfigError::EmptyProblem);
        }
        for (f, d) in data.iter().enumerate() {
            d.validate(n, &factor_names[f], false)?;
            match (&envelopes[f], d.is_ordinal()) {
                (Some(env), false) => {
                    env.validate_for(&factor_names[f])?;
                    let (lo_d, hi_d) = env.domain();
                    let check = |unit: usize, x: f64| -> Result<(), ConfigError> {
                        if x < lo_d - 1e-12 || x > hi_d + 1e-12 {
                            Err(ConfigError::OutOfDomain {
                                unit,
                                factor: factor_names[f].clone(),
                                value: x,
                            })
                        } else {
                            Ok(())
                        }
                    };
                    match d {
                        FactorData::Precise(v) => {
                            for (k, &x) in v.iter().enumerate() {
                                check(k, x)?;
                            }
                        }
                        FactorData::Interval { lo, hi } => {
                            for k in 0..n {
                                check(k, lo[k])?;
                                check(k, hi[k])?;
                            }
                        }
                        FactorData::Ordinal { .. } => unreachable!(),
                    }
                }
                (None, true) => {}
                (Some(_), true) => {
                    return Err(ConfigError::BadValueFunction {
                        factor: factor_names[f].clone(),
                        reason: "ordinal factors take per-rank values, not an envelope".into(),
                    });
                }
                (None, false) => {
                    return Err(ConfigError::BadValueFunction {
                        factor: factor_names[f].clone(),
                        reason: "cardinal factor has no envelope".into(),
                    });
                }
            }
        }
        Ok(Self {
            factor_names,
            data,
            envelopes,
            constraints: Vec::new(),
            options,
            n_units: n,
        })
    }

    pub fn add_weight_constraint(&mut self, wc: WeightConstraint) -> Result<(), ConfigError> {
        for (name, _) in &wc.coeffs {
            if !self.factor_names.iter().any(|n| n == name) {
                return Err(ConfigError::UnknownFactor(name.clone()));
            }
        }
        self.constraints.push(wc);
        Ok(())
    }

    pub fn n_units(&self) -> usize {
        self.n_units
    }

    pub fn n_factors(&self) -> usize {
        self.factor_names.len()
    }

    pub fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    pub fn data(&self, f: usize) -> &FactorData {
        &self.data[f]
    }

    pub fn envelope(&self, f: usize) -> Option<&Envelope> {
        self.envelopes[f].as_ref()
    }

    pub fn options(&self) -> &ImpreciseOptions {
        &self.options
    }

    pub fn weight_constraints(&self) -> &[WeightConstraint] {
        &self.constraints
    }
}

/// Ratio-form problem over imprecise data.
#[derive(Debug, Clone)]
pub struct ImpreciseCcrProblem {
    input_names: Vec<String>,
    output_names: Vec<String>,
    input_data: Vec<FactorData>,
    output_data: Vec<FactorData>,
    constraints: Vec<WeightConstraint>,
    options: ImpreciseOptions,
    n_units: usize,
}

impl ImpreciseCcrProblem {
    pub fn new(
        input_names: Vec<impl Into<String>>,
        output_names: Vec<impl Into<String>>,
        input_data: Vec<FactorData>,
        output_data: Vec<FactorData>,
        options: ImpreciseOptions,
    ) -> Result<Self, ConfigError> {
        let input_names: Vec<String> = input_names.into_iter().map(Into::into).collect();
        let output_names: Vec<String> = output_names.into_iter().map(Into::into).collect();
        if input_names.is_empty() || output_names.is_empty() {
            return Err(ConfigError::EmptyProblem);
        }
        if input_data.len() != input_names.len() || output_data.len() != output_names.len() {
            return Err(ConfigError::ShapeMismatch(
                "factor data count differs from factor name count".into(),
            ));
        }
        validate_unique_names(input_names.iter().chain(output_names.iter()))?;
        options.validate()?;
        let n = input_data[0].n_units();
        if n == 0 {
            return Err(ConfigError::EmptyProblem);
        }
        for (d, name) in input_data
            .iter()
            .zip(&input_names)
            .chain(output_data.iter().zip(&output_names))
        {
            d.validate(n, name, true)?;
        }
        Ok(Self {
            input_names,
            output_names,
            input_data,
            output_data,
            constraints: Vec::new(),
            options,
            n_units: n,
        })
    }

    /// Same admissibility rule as the precise ratio model.
    pub fn add_weight_constraint(&mut self, wc: WeightConstraint) -> Result<(), ConfigError> {
        if wc.rhs != 0.0 {
            return Err(ConfigError::BadRatioConstraint(format!(
                "rhs {} is not 0",
                wc.rhs
            )));
        }
        let mut groups = wc
            .coeffs
            .iter()
            .map(|(name, _)| self.factor(name).map(|f| matches!(f, CcrFactor::Input(_))));
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
        self.n_units
    }

    pub fn n_inputs(&self) -> usize {
        self.input_names.len()
    }

    pub fn n_outputs(&self) -> usize {
        self.output_names.len()
    }

    pub fn input_data(&self, i: usize) -> &FactorData {
        &self.input_data[i]
    }

    pub fn output_data(&self, r: usize) -> &FactorData {
        &self.output_data[r]
    }

    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn options(&self) -> &ImpreciseOptions {
        &self.options
    }

    pub fn weight_constraints(&self) -> &[WeightConstraint] {
        &self.constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_fn::Polarity;
    use ndarray::array;

    #[test]
    fn test_ordinal_ranks_must_be_permutation() {
        let r = ImpreciseCcrProblem::new(
            vec!["x"],
            vec!["y"],
            vec![FactorData::Precise(array![1.0, 2.0, 3.0])],
            vec![FactorData::Ordinal {
                ranks: vec![1, 1, 2],
            }],
            ImpreciseOptions::default(),
        );
        assert!(matches!(r, Err(ConfigError::BadOrdinalRanks { .. })));
    }

    #[test]
    fn test_units_by_rank_orders_best_first() {
        let d = FactorData::Ordinal {
            ranks: vec![2, 3, 1],
        };
        assert_eq!(d.units_by_rank(), vec![2, 0, 1]);
    }

    #[test]
    fn test_interval_lo_above_hi_rejected() {
        let r = ImpreciseCcrProblem::new(
            vec!["x"],
            vec!["y"],
            vec![FactorData::Interval {
                lo: array![2.0, 1.0],
                hi: array![1.0, 2.0],
            }],
            vec![FactorData::Precise(array![1.0, 1.0])],
            ImpreciseOptions::default(),
        );
        assert!(matches!(r, Err(ConfigError::BadInterval { unit: 0, .. })));
    }

    #[test]
    fn test_options_validated() {
        let r = ImpreciseCcrProblem::new(
            vec!["x"],
            vec!["y"],
            vec![FactorData::Precise(array![1.0])],
            vec![FactorData::Precise(array![1.0])],
            ImpreciseOptions {
                ordinal_ratio: 0.5,
                ..Default::default()
            },
        );
        assert!(matches!(r, Err(ConfigError::BadOptions(_))));
    }

    #[test]
    fn test_vdea_ordinal_factor_takes_no_envelope() {
        let r = ImpreciseVdeaProblem::new(
            vec!["f"],
            vec![FactorData::Ordinal { ranks: vec![1, 2] }],
            vec![Some(Envelope::exact(
                Polarity::Gain,
                vec![(0.0, 0.0), (1.0, 1.0)],
            )
            .unwrap())],
            ImpreciseOptions::default(),
        );
        assert!(r.is_err());
    }
}
