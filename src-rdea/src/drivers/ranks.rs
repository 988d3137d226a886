//! Extreme rank bounds
//!
//! At most `n - 1` LPs per unit per bound. The best achievable rank counts
//! the rivals that are strictly more efficient under every admissible
//! weight; the worst rank counts the rivals that are strictly more
//! efficient under at least one.

use super::{
    ExtremeOptions, ModelRef, RankBounds, check_interrupted, finalize, run_per_unit, solve_value,
};
use crate::error::DeaError;

/// Best and worst achievable rank of every unit.
pub fn extreme_ranks<'a>(
    model: impl Into<ModelRef<'a>>,
    opts: &ExtremeOptions,
) -> Result<RankBounds, DeaError> {
    let model = model.into();
    model.validate_node(opts.node.as_deref())?;
    let n = model.n_units();
    let results = run_per_unit(n, opts.parallelism, |s, ctx| {
        let node = opts.node.as_deref();
        let mut best_rank = 1_usize;
        let mut worst_rank = 1_usize;
        for t in 0..n {
            if t == s {
                continue;
            }
            check_interrupted(&opts.cancel, opts.deadline)?;
            // Can s match t anywhere? If not, t beats s everywhere.
            let weak = solve_value(ctx, &model.pair_spec(s, t, node, opts.epsilon)?, "rank", s)?;
            if weak < -opts.epsilon {
                best_rank += 1;
            }
            // Can t strictly beat s anywhere?
            let strict = solve_value(ctx, &model.pair_spec(t, s, node, opts.epsilon)?, "rank", s)?;
            if strict > opts.epsilon {
                worst_rank += 1;
            }
        }
        Ok((best_rank, worst_rank))
    })?;
    let (values, failed) = finalize(results)?;
    let mut min = vec![0_usize; n];
    let mut max = vec![0_usize; n];
    for (s, v) in values.into_iter().enumerate() {
        if let Some((lo, hi)) = v {
            min[s] = lo;
            max[s] = hi;
        }
    }
    Ok(RankBounds { min, max, failed })
}
