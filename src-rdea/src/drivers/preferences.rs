//! Necessary and possible preference relations
//!
//! `s` necessarily outranks `t` when its efficiency matches `t`'s under
//! every admissible weight vector; possibly, when it does under at least
//! one. Both reduce to the sign of one pairwise LP per ordered pair.

use ndarray::Array2;

use super::{
    ExtremeOptions, ModelRef, PreferenceRelations, check_interrupted, finalize, run_per_unit,
    solve_value,
};
use crate::error::DeaError;

/// The two `n x n` relation matrices. Diagonals are true by reflexivity.
pub fn preference_relations<'a>(
    model: impl Into<ModelRef<'a>>,
    opts: &ExtremeOptions,
) -> Result<PreferenceRelations, DeaError> {
    let model = model.into();
    model.validate_node(opts.node.as_deref())?;
    let n = model.n_units();
    let results = run_per_unit(n, opts.parallelism, |s, ctx| {
        let node = opts.node.as_deref();
        let mut necessary = vec![false; n];
        let mut possible = vec![false; n];
        necessary[s] = true;
        possible[s] = true;
        for t in 0..n {
            if t == s {
                continue;
            }
            check_interrupted(&opts.cancel, opts.deadline)?;
            // Necessary: t never gets strictly ahead of s.
            let t_over_s = solve_value(
                ctx,
                &model.pair_spec(t, s, node, opts.epsilon)?,
                "necessary preference",
                s,
            )?;
            necessary[t] = t_over_s <= opts.epsilon;
            // Possible: s reaches t somewhere.
            let s_over_t = solve_value(
                ctx,
                &model.pair_spec(s, t, node, opts.epsilon)?,
                "possible preference",
                s,
            )?;
            possible[t] = s_over_t >= -opts.epsilon;
        }
        Ok((necessary, possible))
    })?;
    let (rows, failed) = finalize(results)?;
    let mut necessary = Array2::from_elem((n, n), false);
    let mut possible = Array2::from_elem((n, n), false);
    for (s, row) in rows.into_iter().enumerate() {
        if let Some((nec, pos)) = row {
            for t in 0..n {
                necessary[(s, t)] = nec[t];
                possible[(s, t)] = pos[t];
            }
        } else {
            necessary[(s, s)] = true;
            possible[(s, s)] = true;
        }
    }
    Ok(PreferenceRelations {
        necessary,
        possible,
        failed,
    })
}
