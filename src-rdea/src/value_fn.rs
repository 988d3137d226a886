//! Marginal value functions
//!
//! A factor's marginal value function is not a single shape but a *range* of
//! admissible monotone piecewise-linear functions, bracketed by a lower and
//! an upper envelope over a shared abscissae grid. Both envelopes are
//! anchored at 0 and 1 on the domain ends (0 at the worst end, 1 at the
//! best end); every realization `u` with `lower <= u <= upper` at each
//! breakpoint is monotone in the factor's direction. A single fixed shape is
//! the degenerate range `lower == upper`.

use serde::Serialize;

use crate::error::ConfigError;

/// Preference direction of a factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Polarity {
    /// More is better; values rise from 0 at `x_min` to 1 at `x_max`.
    Gain,
    /// Less is better; values fall from 1 at `x_min` to 0 at `x_max`.
    Cost,
}

/// Envelope of admissible marginal value functions for one factor.
///
/// No `Deserialize`: monotonicity, anchoring and the shared grid are checked
/// only by the constructors, and a field-wise decode would skip them.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    polarity: Polarity,
    xs: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Envelope {
    /// Envelope with distinct lower/upper characteristic points.
    pub fn range(
        polarity: Polarity,
        xs: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let env = Self {
            polarity,
            xs,
            lower,
            upper,
        };
        env.validate()?;
        Ok(env)
    }

    /// A single fixed shape (`lower == upper`).
    pub fn exact(polarity: Polarity, points: Vec<(f64, f64)>) -> Result<Self, ConfigError> {
        let xs: Vec<f64> = points.iter().map(|&(x, _)| x).collect();
        let us: Vec<f64> = points.iter().map(|&(_, u)| u).collect();
        Self::range(polarity, xs, us.clone(), us)
    }

    /// The identity gain shape on `[lo, hi]`.
    pub fn linear_gain(lo: f64, hi: f64) -> Self {
        Self::exact(Polarity::Gain, vec![(lo, 0.0), (hi, 1.0)])
            .expect("linear gain shape is always valid")
    }

    /// The inverted cost shape on `[lo, hi]`.
    pub fn linear_cost(lo: f64, hi: f64) -> Self {
        Self::exact(Polarity::Cost, vec![(lo, 1.0), (hi, 0.0)])
            .expect("linear cost shape is always valid")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let bad = |reason: &str| ConfigError::BadValueFunction {
            factor: String::new(),
            reason: reason.to_string(),
        };
        let k = self.xs.len();
        if k < 2 {
            return Err(bad("needs at least two characteristic points"));
        }
        if self.lower.len() != k || self.upper.len() != k {
            return Err(bad("envelopes must share the abscissae grid"));
        }
        if self.xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(bad("abscissae must be strictly increasing"));
        }
        for j in 0..k {
            if !(0.0..=1.0).contains(&self.lower[j]) || !(0.0..=1.0).contains(&self.upper[j]) {
                return Err(bad("characteristic values must lie in [0, 1]"));
            }
            if self.lower[j] > self.upper[j] + 1e-12 {
                return Err(bad("lower envelope exceeds upper envelope"));
            }
        }
        let (first, last) = match self.polarity {
            Polarity::Gain => ((0.0, 0.0), (1.0, 1.0)),
            Polarity::Cost => ((1.0, 1.0), (0.0, 0.0)),
        };
        if (self.lower[0] - first.0).abs() > 1e-12 || (self.upper[0] - first.1).abs() > 1e-12 {
            return Err(bad("envelope is not anchored at the domain start"));
        }
        if (self.lower[k - 1] - last.0).abs() > 1e-12 || (self.upper[k - 1] - last.1).abs() > 1e-12
        {
            return Err(bad("envelope is not anchored at the domain end"));
        }
        let monotone_ok = |vals: &[f64]| match self.polarity {
            Polarity::Gain => vals.windows(2).all(|w| w[1] >= w[0] - 1e-12),
            Polarity::Cost => vals.windows(2).all(|w| w[1] <= w[0] + 1e-12),
        };
        if !monotone_ok(&self.lower) || !monotone_ok(&self.upper) {
            return Err(bad("envelope is not monotone in the factor direction"));
        }
        Ok(())
    }

    /// Attach the factor name to a validation error.
    pub(crate) fn validate_for(&self, factor: &str) -> Result<(), ConfigError> {
        self.validate().map_err(|e| match e {
            ConfigError::BadValueFunction { reason, .. } => ConfigError::BadValueFunction {
                factor: factor.to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Whether the range collapses to a single shape.
    pub fn is_exact(&self) -> bool {
        self.lower
            .iter()
            .zip(&self.upper)
            .all(|(l, u)| (u - l).abs() <= 1e-12)
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    pub fn in_domain(&self, x: f64) -> bool {
        let (lo, hi) = self.domain();
        x >= lo - 1e-12 && x <= hi + 1e-12
    }

    /// Segment index `j` and interpolation parameter `theta` so that a
    /// realization evaluates as `v[j]*(1-theta) + v[j+1]*theta` at `x`.
    pub fn segment(&self, x: f64) -> (usize, f64) {
        let k = self.xs.len();
        let x = x.clamp(self.xs[0], self.xs[k - 1]);
        let j = match self.xs.iter().rposition(|&xj| xj <= x) {
            Some(j) if j >= k - 1 => k - 2,
            Some(j) => j,
            None => 0,
        };
        let span = self.xs[j + 1] - self.xs[j];
        (j, ((x - self.xs[j]) / span).clamp(0.0, 1.0))
    }

    /// Evaluate a realization (its breakpoint values) at `x`.
    pub fn eval(&self, values: &[f64], x: f64) -> f64 {
        let (j, theta) = self.segment(x);
        values[j] * (1.0 - theta) + values[j + 1] * theta
    }

    /// The end of the domain where the value anchors to 1.
    pub fn best_end(&self) -> usize {
        match self.polarity {
            Polarity::Gain => self.xs.len() - 1,
            Polarity::Cost => 0,
        }
    }

    /// The end of the domain where the value anchors to 0.
    pub fn worst_end(&self) -> usize {
        match self.polarity {
            Polarity::Gain => 0,
            Polarity::Cost => self.xs.len() - 1,
        }
    }
}
