//! Analysis drivers
//!
//! Six orchestrators over the model builders and the samplers: extreme
//! efficiency, extreme distance, extreme ranks, preference relations, SMAA
//! distributions and pairwise outranking indices. Per-unit work is
//! embarrassingly parallel; every driver runs it on a bounded rayon pool
//! with one solver context per worker and reports results in unit index
//! order regardless of completion order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use rdea_lp::{Direction, ModelSpec, SolveStatus, SolverCtx};

use crate::data::{CcrProblem, VdeaProblem};
use crate::error::{ConfigError, DeaError};
use crate::imprecise::{ImpreciseCcrProblem, ImpreciseVdeaProblem};
use crate::models::{ccr, imprecise, vdea};
use crate::sampling::Scorer;

pub mod extremes;
pub mod preferences;
pub mod ranks;
pub mod smaa;

pub use extremes::{extreme_distance, extreme_efficiency};
pub use preferences::preference_relations;
pub use ranks::extreme_ranks;
pub use smaa::{smaa, smaa_preferences};

/// Default strict-inequality tolerance.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Cooperative cancellation shared between the caller and the workers;
/// checked between solver calls and between samples.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A borrowed problem of any of the four model families.
#[derive(Clone, Copy)]
pub enum ModelRef<'a> {
    Ccr(&'a CcrProblem),
    Vdea(&'a VdeaProblem),
    ImpreciseVdea(&'a ImpreciseVdeaProblem),
    ImpreciseCcr(&'a ImpreciseCcrProblem),
}

impl<'a> From<&'a CcrProblem> for ModelRef<'a> {
    fn from(p: &'a CcrProblem) -> Self {
        ModelRef::Ccr(p)
    }
}

impl<'a> From<&'a VdeaProblem> for ModelRef<'a> {
    fn from(p: &'a VdeaProblem) -> Self {
        ModelRef::Vdea(p)
    }
}

impl<'a> From<&'a ImpreciseVdeaProblem> for ModelRef<'a> {
    fn from(p: &'a ImpreciseVdeaProblem) -> Self {
        ModelRef::ImpreciseVdea(p)
    }
}

impl<'a> From<&'a ImpreciseCcrProblem> for ModelRef<'a> {
    fn from(p: &'a ImpreciseCcrProblem) -> Self {
        ModelRef::ImpreciseCcr(p)
    }
}

/// The min-efficiency question is one model for most families, but the
/// imprecise ratio model enumerates frontier candidates.
pub(crate) enum MinEffSpecs {
    Single(ModelSpec),
    Candidates(Vec<ModelSpec>),
}

impl<'a> ModelRef<'a> {
    pub fn n_units(&self) -> usize {
        match *self {
            ModelRef::Ccr(p) => p.n_units(),
            ModelRef::Vdea(p) => p.n_units(),
            ModelRef::ImpreciseVdea(p) => p.n_units(),
            ModelRef::ImpreciseCcr(p) => p.n_units(),
        }
    }

    pub(crate) fn is_ratio_model(&self) -> bool {
        matches!(self, ModelRef::Ccr(_) | ModelRef::ImpreciseCcr(_))
    }

    pub(crate) fn max_eff_spec(
        &self,
        s: usize,
        node: Option<&str>,
        eps: f64,
        super_efficiency: bool,
    ) -> Result<ModelSpec, ConfigError> {
        match *self {
            ModelRef::Ccr(p) => Ok(ccr::max_efficiency(p, s, eps, super_efficiency)),
            ModelRef::Vdea(p) => vdea::efficiency(p, node, s, Direction::Maximize),
            ModelRef::ImpreciseVdea(p) => imprecise::vdea_efficiency(p, s, Direction::Maximize),
            ModelRef::ImpreciseCcr(p) => {
                Ok(imprecise::ccr_max_efficiency(p, s, eps, super_efficiency))
            }
        }
    }

    pub(crate) fn min_eff_specs(
        &self,
        s: usize,
        node: Option<&str>,
        eps: f64,
        super_efficiency: bool,
    ) -> Result<MinEffSpecs, ConfigError> {
        match *self {
            ModelRef::Ccr(p) => Ok(MinEffSpecs::Single(ccr::min_efficiency(
                p,
                s,
                eps,
                super_efficiency,
            ))),
            ModelRef::Vdea(p) => Ok(MinEffSpecs::Single(vdea::efficiency(
                p,
                node,
                s,
                Direction::Minimize,
            )?)),
            ModelRef::ImpreciseVdea(p) => Ok(MinEffSpecs::Single(imprecise::vdea_efficiency(
                p,
                s,
                Direction::Minimize,
            )?)),
            ModelRef::ImpreciseCcr(p) => {
                let specs = (0..p.n_units())
                    .filter(|&k| !(super_efficiency && k == s))
                    .map(|k| imprecise::ccr_min_efficiency_candidate(p, s, k, eps, super_efficiency))
                    .collect();
                Ok(MinEffSpecs::Candidates(specs))
            }
        }
    }

    /// Sign model: maximum of `score(a) - score(b)` over the family.
    pub(crate) fn pair_spec(
        &self,
        a: usize,
        b: usize,
        node: Option<&str>,
        eps: f64,
    ) -> Result<ModelSpec, ConfigError> {
        match *self {
            ModelRef::Ccr(p) => Ok(ccr::pairwise(p, a, b, eps)),
            ModelRef::Vdea(p) => vdea::pairwise(p, node, a, b),
            ModelRef::ImpreciseVdea(p) => imprecise::vdea_pairwise(p, a, b),
            ModelRef::ImpreciseCcr(p) => Ok(imprecise::ccr_pairwise(p, a, b, eps)),
        }
    }

    pub(crate) fn distance_min_spec(
        &self,
        s: usize,
        node: Option<&str>,
    ) -> Result<ModelSpec, ConfigError> {
        match *self {
            ModelRef::Vdea(p) => vdea::distance_min(p, node, s),
            ModelRef::ImpreciseVdea(p) => imprecise::vdea_distance_min(p, s),
            _ => unreachable!("ratio-model distance derives from efficiency"),
        }
    }

    pub(crate) fn distance_rival_spec(
        &self,
        s: usize,
        k: usize,
        node: Option<&str>,
    ) -> Result<ModelSpec, ConfigError> {
        match *self {
            ModelRef::Vdea(p) => vdea::distance_rival(p, node, s, k),
            ModelRef::ImpreciseVdea(p) => imprecise::vdea_distance_rival(p, s, k),
            _ => unreachable!("ratio-model distance derives from efficiency"),
        }
    }

    pub(crate) fn scorer(&self, node: Option<&str>) -> Result<Scorer<'a>, ConfigError> {
        match *self {
            ModelRef::Ccr(p) => Ok(Scorer::Ccr(p)),
            ModelRef::Vdea(p) => Ok(Scorer::Vdea {
                p,
                scope: p.scoped_factors(node)?,
            }),
            ModelRef::ImpreciseVdea(p) => Ok(Scorer::ImpVdea(p)),
            ModelRef::ImpreciseCcr(p) => Ok(Scorer::ImpCcr(p)),
        }
    }

    /// Fail fast on an unknown node before any parallel work starts.
    pub(crate) fn validate_node(&self, node: Option<&str>) -> Result<(), ConfigError> {
        if let (ModelRef::Vdea(p), Some(_)) = (*self, node) {
            p.scoped_factors(node)?;
        }
        Ok(())
    }
}

/// Options of the extreme-value, rank and preference drivers.
#[derive(Debug, Clone)]
pub struct ExtremeOptions {
    /// Strict-inequality tolerance.
    pub epsilon: f64,
    /// Exclude the subject from the envelope (ratio models only).
    pub super_efficiency: bool,
    /// Hierarchy node to evaluate at (value models with a hierarchy).
    pub node: Option<String>,
    pub parallelism: usize,
    pub cancel: CancelToken,
    pub deadline: Option<Instant>,
}

impl Default for ExtremeOptions {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            super_efficiency: false,
            node: None,
            parallelism: num_cpus::get(),
            cancel: CancelToken::new(),
            deadline: None,
        }
    }
}

impl ExtremeOptions {
    pub fn epsilon(mut self, v: f64) -> Self {
        self.epsilon = v;
        self
    }

    pub fn super_efficiency(mut self, v: bool) -> Self {
        self.super_efficiency = v;
        self
    }

    pub fn node(mut self, v: impl Into<String>) -> Self {
        self.node = Some(v.into());
        self
    }

    pub fn parallelism(mut self, v: usize) -> Self {
        self.parallelism = v;
        self
    }

    pub fn cancel(mut self, v: CancelToken) -> Self {
        self.cancel = v;
        self
    }

    pub fn deadline(mut self, v: Instant) -> Self {
        self.deadline = Some(v);
        self
    }
}

/// Options of the SMAA drivers.
#[derive(Debug, Clone)]
pub struct SmaaOptions {
    pub samples: usize,
    pub bins: usize,
    pub seed: u64,
    pub parallelism: usize,
    /// Hierarchy node to evaluate at (value models with a hierarchy).
    pub node: Option<String>,
    pub cancel: CancelToken,
    pub deadline: Option<Instant>,
    /// Print a progress summary to stderr.
    pub disp: bool,
}

impl Default for SmaaOptions {
    fn default() -> Self {
        Self {
            samples: 1000,
            bins: 10,
            seed: 0,
            parallelism: num_cpus::get(),
            node: None,
            cancel: CancelToken::new(),
            deadline: None,
            disp: false,
        }
    }
}

impl SmaaOptions {
    pub fn samples(mut self, v: usize) -> Self {
        self.samples = v;
        self
    }

    pub fn bins(mut self, v: usize) -> Self {
        self.bins = v;
        self
    }

    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    pub fn parallelism(mut self, v: usize) -> Self {
        self.parallelism = v;
        self
    }

    pub fn node(mut self, v: impl Into<String>) -> Self {
        self.node = Some(v.into());
        self
    }

    pub fn cancel(mut self, v: CancelToken) -> Self {
        self.cancel = v;
        self
    }

    pub fn deadline(mut self, v: Instant) -> Self {
        self.deadline = Some(v);
        self
    }

    pub fn disp(mut self, v: bool) -> Self {
        self.disp = v;
        self
    }
}

// ---------------------------- report shapes ----------------------------

/// Per-unit extreme values; failed entries are NaN and listed in `failed`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtremeValues {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub failed: Vec<usize>,
}

/// Per-unit rank bounds; failed entries are 0 and listed in `failed`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RankBounds {
    pub min: Vec<usize>,
    pub max: Vec<usize>,
    pub failed: Vec<usize>,
}

/// Necessary and possible preference matrices. Entry `[s][t]` answers
/// whether unit `s` is (necessarily / possibly) at least as efficient as
/// unit `t`; diagonals are true.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PreferenceRelations {
    pub necessary: ndarray::Array2<bool>,
    pub possible: ndarray::Array2<bool>,
    pub failed: Vec<usize>,
}

/// Per-unit distribution of one indicator plus its expected value.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SmaaDistribution {
    /// `n x B` for efficiency/distance, `n x n` for ranks; rows sum to 1.
    pub histogram: ndarray::Array2<f64>,
    pub expected: Vec<f64>,
    pub skipped: usize,
}

/// Pairwise efficiency outranking indices; `[s][t]` is the fraction of
/// samples where `s` scores at least as high as `t`. Diagonal is 1.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Peoi {
    pub matrix: ndarray::Array2<f64>,
    pub skipped: usize,
}

// ---------------------------- shared plumbing ----------------------------

pub(crate) enum UnitFail {
    Cancelled,
    Deadline,
    Infeasible(String),
    Unbounded(String),
    Numerical,
    Config(ConfigError),
}

impl From<ConfigError> for UnitFail {
    fn from(e: ConfigError) -> Self {
        UnitFail::Config(e)
    }
}

pub(crate) fn solve_value(
    ctx: &mut SolverCtx,
    spec: &ModelSpec,
    what: &str,
    unit: usize,
) -> Result<f64, UnitFail> {
    let out = ctx.solve(spec);
    match out.status {
        SolveStatus::Optimal => Ok(out.objective),
        SolveStatus::Infeasible => Err(UnitFail::Infeasible(format!("{what}, unit {unit}"))),
        SolveStatus::Unbounded => Err(UnitFail::Unbounded(format!("{what}, unit {unit}"))),
        SolveStatus::NumericalError => Err(UnitFail::Numerical),
    }
}

pub(crate) fn check_interrupted(opts_cancel: &CancelToken, deadline: Option<Instant>) -> Result<(), UnitFail> {
    if opts_cancel.is_cancelled() {
        return Err(UnitFail::Cancelled);
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Err(UnitFail::Deadline);
    }
    Ok(())
}

/// Run `work` for every unit on a bounded pool, one solver context per
/// worker. Results come back in unit order.
pub(crate) fn run_per_unit<T, F>(
    n: usize,
    parallelism: usize,
    work: F,
) -> Result<Vec<Result<T, UnitFail>>, DeaError>
where
    T: Send,
    F: Fn(usize, &mut SolverCtx) -> Result<T, UnitFail> + Sync,
{
    if parallelism == 0 {
        return Err(ConfigError::BadOptions("parallelism must be at least 1".into()).into());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism.min(n.max(1)))
        .build()
        .map_err(|e| ConfigError::BadOptions(format!("worker pool: {e}")))?;
    Ok(pool.install(|| {
        (0..n)
            .into_par_iter()
            .map_init(SolverCtx::new, |ctx, s| work(s, ctx))
            .collect()
    }))
}

/// Fold per-unit outcomes into the driver result: model errors are fatal,
/// interruption carries the completed indices, numerical failures isolate
/// to their unit.
pub(crate) fn finalize<T>(
    results: Vec<Result<T, UnitFail>>,
) -> Result<(Vec<Option<T>>, Vec<usize>), DeaError> {
    for r in &results {
        match r {
            Err(UnitFail::Infeasible(context)) => {
                return Err(DeaError::InfeasibleRegion {
                    context: context.clone(),
                });
            }
            Err(UnitFail::Unbounded(context)) => {
                return Err(DeaError::UnboundedModel {
                    context: context.clone(),
                });
            }
            Err(UnitFail::Config(e)) => return Err(e.clone().into()),
            _ => {}
        }
    }
    let completed: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_ok())
        .map(|(i, _)| i)
        .collect();
    if results.iter().any(|r| matches!(r, Err(UnitFail::Deadline))) {
        return Err(DeaError::DeadlineExceeded { completed });
    }
    if results.iter().any(|r| matches!(r, Err(UnitFail::Cancelled))) {
        return Err(DeaError::Cancelled { completed });
    }
    let mut failed = Vec::new();
    let mut out = Vec::with_capacity(results.len());
    for (i, r) in results.into_iter().enumerate() {
        match r {
            Ok(v) => out.push(Some(v)),
            Err(UnitFail::Numerical) => {
                failed.push(i);
                out.push(None);
            }
            Err(_) => unreachable!("fatal failures handled above"),
        }
    }
    Ok((out, failed))
}

/// Split-mix of the user seed and the sample index: every sample owns an
/// independent deterministic stream, so sharding across workers cannot
/// change results.
pub(crate) fn sample_seed(seed: u64, index: usize) -> u64 {
    let mut z = seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_round_trip() {
        let t = CancelToken::new();
        assert!(!t.is_cancelled());
        let t2 = t.clone();
        t2.cancel();
        assert!(t.is_cancelled());
    }

    #[test]
    fn test_sample_seed_spreads_indices() {
        let a = sample_seed(5, 0);
        let b = sample_seed(5, 1);
        let c = sample_seed(6, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        // Stable across calls.
        assert_eq!(a, sample_seed(5, 0));
    }

    #[test]
    fn test_finalize_isolates_numerical_failures() {
        let results: Vec<Result<f64, UnitFail>> =
            vec![Ok(1.0), Err(UnitFail::Numerical), Ok(3.0)];
        let (vals, failed) = finalize(results).unwrap();
        assert_eq!(vals[0], Some(1.0));
        assert_eq!(vals[1], None);
        assert_eq!(failed, vec![1]);
    }

    #[test]
    fn test_finalize_reports_deadline_with_completed() {
        let results: Vec<Result<f64, UnitFail>> =
            vec![Ok(1.0), Err(UnitFail::Deadline), Ok(3.0)];
        match finalize(results) {
            Err(DeaError::DeadlineExceeded { completed }) => {
                assert_eq!(completed, vec![0, 2]);
            }
            other => panic!("expected deadline error, got {other:?}"),
        }
    }

    #[test]
    fn test_finalize_prefers_model_errors() {
        let results: Vec<Result<f64, UnitFail>> = vec![
            Err(UnitFail::Cancelled),
            Err(UnitFail::Infeasible("max efficiency, unit 1".into())),
        ];
        assert!(matches!(
            finalize(results),
            Err(DeaError::InfeasibleRegion { .. })
        ));
    }
}
