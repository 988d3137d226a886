//! Extreme efficiency and extreme distance-to-best
//!
//! For every unit, the smallest and largest value of the indicator over the
//! whole admissible family. Ratio-model scores are relative to the best
//! unit, so their distance range is the mirrored efficiency range; value
//! models solve the dedicated distance LPs.

use super::{
    ExtremeOptions, ExtremeValues, MinEffSpecs, ModelRef, UnitFail, check_interrupted, finalize,
    run_per_unit, solve_value,
};
use crate::error::DeaError;
use rdea_lp::SolverCtx;

fn min_over_candidates(
    ctx: &mut SolverCtx,
    specs: &[rdea_lp::ModelSpec],
    what: &str,
    unit: usize,
) -> Result<f64, UnitFail> {
    let mut best: Option<f64> = None;
    for spec in specs {
        match solve_value(ctx, spec, what, unit) {
            Ok(v) => best = Some(best.map_or(v, |b: f64| b.min(v))),
            // An infeasible candidate only means this rival cannot sit on
            // the frontier; the minimum ranges over the feasible ones.
            Err(UnitFail::Infeasible(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    best.ok_or_else(|| UnitFail::Infeasible(format!("{what}, unit {unit}: no frontier candidate")))
}

fn extremes_of_efficiency(
    model: ModelRef<'_>,
    opts: &ExtremeOptions,
    s: usize,
    ctx: &mut SolverCtx,
) -> Result<(f64, f64), UnitFail> {
    let node = opts.node.as_deref();
    check_interrupted(&opts.cancel, opts.deadline)?;
    let max_spec = model.max_eff_spec(s, node, opts.epsilon, opts.super_efficiency)?;
    let max = solve_value(ctx, &max_spec, "max efficiency", s)?;
    check_interrupted(&opts.cancel, opts.deadline)?;
    let min = match model.min_eff_specs(s, node, opts.epsilon, opts.super_efficiency)? {
        MinEffSpecs::Single(spec) => solve_value(ctx, &spec, "min efficiency", s)?,
        MinEffSpecs::Candidates(specs) => min_over_candidates(ctx, &specs, "min efficiency", s)?,
    };
    Ok((min, max))
}

/// Range of every unit's efficiency over the admissible family.
pub fn extreme_efficiency<'a>(
    model: impl Into<ModelRef<'a>>,
    opts: &ExtremeOptions,
) -> Result<ExtremeValues, DeaError> {
    let model = model.into();
    model.validate_node(opts.node.as_deref())?;
    let n = model.n_units();
    let results = run_per_unit(n, opts.parallelism, |s, ctx| {
        extremes_of_efficiency(model, opts, s, ctx)
    })?;
    let (values, failed) = finalize(results)?;
    let mut min = vec![f64::NAN; n];
    let mut max = vec![f64::NAN; n];
    for (s, v) in values.into_iter().enumerate() {
        if let Some((lo, hi)) = v {
            min[s] = lo;
            max[s] = hi;
        }
    }
    Ok(ExtremeValues { min, max, failed })
}

/// Range of every unit's distance to the best over the admissible family.
pub fn extreme_distance<'a>(
    model: impl Into<ModelRef<'a>>,
    opts: &ExtremeOptions,
) -> Result<ExtremeValues, DeaError> {
    let model = model.into();
    model.validate_node(opts.node.as_deref())?;
    let n = model.n_units();

    if model.is_ratio_model() {
        // Relative scores put the best unit at 1: the distance range is the
        // efficiency range reflected around it.
        let standard = ExtremeOptions {
            super_efficiency: false,
            ..opts.clone()
        };
        let eff = extreme_efficiency(model, &standard)?;
        let min = eff.max.iter().map(|&v| 1.0 - v).collect();
        let max = eff.min.iter().map(|&v| 1.0 - v).collect();
        return Ok(ExtremeValues {
            min,
            max,
            failed: eff.failed,
        });
    }

    let results = run_per_unit(n, opts.parallelism, |s, ctx| {
        let node = opts.node.as_deref();
        check_interrupted(&opts.cancel, opts.deadline)?;
        let min = solve_value(ctx, &model.distance_min_spec(s, node)?, "min distance", s)?;
        let mut max = 0.0_f64;
        for k in 0..n {
            if k == s {
                continue;
            }
            check_interrupted(&opts.cancel, opts.deadline)?;
            let spec = model.distance_rival_spec(s, k, node)?;
            max = max.max(solve_value(ctx, &spec, "max distance", s)?);
        }
        Ok((min.max(0.0), max))
    })?;
    let (values, failed) = finalize(results)?;
    let mut min = vec![f64::NAN; n];
    let mut max = vec![f64::NAN; n];
    for (s, v) in values.into_iter().enumerate() {
        if let Some((lo, hi)) = v {
            min[s] = lo;
            max[s] = hi;
        }
    }
    Ok(ExtremeValues { min, max, failed })
}
