//! SMAA distributions and pairwise outranking indices
//!
//! Draws admissible samples (weights, and for imprecise models the
//! performance and value-function realizations), scores every unit
//! analytically per sample, and aggregates histograms, expected values and
//! pairwise outranking frequencies. Every sample owns a counter-derived RNG
//! stream and its own short hit-and-run chain, so results are bitwise
//! deterministic for a given seed at any parallelism; aggregation runs
//! sequentially in sample order.

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use rdea_lp::MicroLp;
use rdea_polytope::{GeometryError, HitAndRun};

use super::{DEFAULT_EPSILON, ModelRef, Peoi, SmaaDistribution, SmaaOptions, sample_seed};
use crate::error::{ConfigError, DeaError};

/// Which indicator the distribution is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmaaIndicator {
    Efficiency,
    /// Distance to the per-sample best unit.
    Distance,
    /// Rank by per-sample efficiency, 1 = best; the histogram has one
    /// column per rank.
    Rank,
}

fn validate(opts: &SmaaOptions) -> Result<(), ConfigError> {
    if opts.samples == 0 {
        return Err(ConfigError::BadOptions("samples must be positive".into()));
    }
    if opts.bins == 0 {
        return Err(ConfigError::BadOptions("bins must be positive".into()));
    }
    if opts.parallelism == 0 {
        return Err(ConfigError::BadOptions(
            "parallelism must be at least 1".into(),
        ));
    }
    Ok(())
}

enum SampleOutcome {
    Scores(Array1<f64>),
    Failed,
    Cancelled,
    Deadline,
}

/// Draw all samples in parallel; `Vec` index is the sample index.
fn draw_samples<'a>(
    model: ModelRef<'a>,
    opts: &SmaaOptions,
) -> Result<Vec<Array1<f64>>, DeaError> {
    let scorer = model.scorer(opts.node.as_deref())?;
    let region = scorer.weight_region(DEFAULT_EPSILON);
    let start = region.interior_point(&mut MicroLp).map_err(|e| match e {
        GeometryError::Empty => DeaError::InfeasibleRegion {
            context: "weight region".into(),
        },
        GeometryError::Solver(status) => DeaError::InfeasibleRegion {
            context: format!("weight region interior point: {status:?}"),
        },
    })?;

    if opts.disp {
        eprintln!(
            "SMAA: {} samples over a dim-{} region, seed {}, {} workers",
            opts.samples,
            region.dim(),
            opts.seed,
            opts.parallelism
        );
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.parallelism.min(opts.samples))
        .build()
        .map_err(|e| ConfigError::BadOptions(format!("worker pool: {e}")))?;
    let outcomes: Vec<SampleOutcome> = pool.install(|| {
        (0..opts.samples)
            .into_par_iter()
            .map(|m| {
                if opts.cancel.is_cancelled() {
                    return SampleOutcome::Cancelled;
                }
                if opts
                    .deadline
                    .is_some_and(|d| std::time::Instant::now() >= d)
                {
                    return SampleOutcome::Deadline;
                }
                let mut rng = Pcg64Mcg::seed_from_u64(sample_seed(opts.seed, m));
                let w = HitAndRun::new(&region, start.clone(), &mut rng).next_sample();
                let scores = scorer.score(&w, &mut rng);
                if scores.iter().all(|v| v.is_finite()) {
                    SampleOutcome::Scores(scores)
                } else {
                    SampleOutcome::Failed
                }
            })
            .collect()
    });

    // No partial samples: interruption drops the whole draw.
    if outcomes
        .iter()
        .any(|o| matches!(o, SampleOutcome::Deadline))
    {
        return Err(DeaError::DeadlineExceeded { completed: vec![] });
    }
    if outcomes
        .iter()
        .any(|o| matches!(o, SampleOutcome::Cancelled))
    {
        return Err(DeaError::Cancelled { completed: vec![] });
    }

    let valid: Vec<Array1<f64>> = outcomes
        .into_iter()
        .filter_map(|o| match o {
            SampleOutcome::Scores(s) => Some(s),
            _ => None,
        })
        .collect();
    let failed = opts.samples - valid.len();
    if failed * 10 > opts.samples {
        return Err(DeaError::TooManySampleFailures {
            failed,
            total: opts.samples,
        });
    }
    if opts.disp && failed > 0 {
        eprintln!("SMAA: {failed} of {} samples skipped", opts.samples);
    }
    Ok(valid)
}

fn bin_index(value: f64, bins: usize) -> usize {
    // Bin 0 is [0, 1/B]; bin j > 0 is (j/B, (j+1)/B].
    if value <= 1.0 / bins as f64 {
        0
    } else {
        (((value * bins as f64).ceil() as usize) - 1).min(bins - 1)
    }
}

/// Distribution and expectation of one indicator across the family.
pub fn smaa<'a>(
    model: impl Into<ModelRef<'a>>,
    indicator: SmaaIndicator,
    opts: &SmaaOptions,
) -> Result<SmaaDistribution, DeaError> {
    let model = model.into();
    validate(opts)?;
    let samples = draw_samples(model, opts)?;
    let n = model.n_units();
    let cols = match indicator {
        SmaaIndicator::Rank => n,
        _ => opts.bins,
    };
    let mut histogram = Array2::<f64>::zeros((n, cols));
    let mut expected = vec![0.0_f64; n];

    for scores in &samples {
        let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        for k in 0..n {
            let value = match indicator {
                SmaaIndicator::Efficiency => scores[k],
                SmaaIndicator::Distance => best - scores[k],
                SmaaIndicator::Rank => {
                    (1 + scores.iter().filter(|&&e| e > scores[k]).count()) as f64
                }
            };
            expected[k] += value;
            let col = match indicator {
                SmaaIndicator::Rank => (value as usize) - 1,
                _ => bin_index(value.clamp(0.0, 1.0), opts.bins),
            };
            histogram[(k, col)] += 1.0;
        }
    }

    let count = samples.len() as f64;
    histogram /= count;
    for e in &mut expected {
        *e /= count;
    }
    Ok(SmaaDistribution {
        histogram,
        expected,
        skipped: opts.samples - samples.len(),
    })
}

/// Pairwise efficiency outranking indices over the same sampling scheme.
pub fn smaa_preferences<'a>(
    model: impl Into<ModelRef<'a>>,
    opts: &SmaaOptions,
) -> Result<Peoi, DeaError> {
    let model = model.into();
    validate(opts)?;
    let samples = draw_samples(model, opts)?;
    let n = model.n_units();
    let mut counts = Array2::<f64>::zeros((n, n));
    for scores in &samples {
        for s in 0..n {
            for t in 0..n {
                if scores[s] >= scores[t] {
                    counts[(s, t)] += 1.0;
                }
            }
        }
    }
    counts /= samples.len() as f64;
    Ok(Peoi {
        matrix: counts,
        skipped: opts.samples - samples.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_index_boundaries() {
        // 10 bins: 0.1 still lands in bin 0, 0.1000001 in bin 1, 1.0 in
        // bin 9.
        assert_eq!(bin_index(0.0, 10), 0);
        assert_eq!(bin_index(0.1, 10), 0);
        assert_eq!(bin_index(0.1000001, 10), 1);
        assert_eq!(bin_index(0.95, 10), 9);
        assert_eq!(bin_index(1.0, 10), 9);
    }

    #[test]
    fn test_bin_index_single_bin() {
        assert_eq!(bin_index(0.3, 1), 0);
        assert_eq!(bin_index(1.0, 1), 0);
    }
}
