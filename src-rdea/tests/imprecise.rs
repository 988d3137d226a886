use ndarray::array;
use rdea::{
    Envelope, ExtremeOptions, FactorData, ImpreciseCcrProblem, ImpreciseOptions,
    ImpreciseVdeaProblem, SmaaIndicator, SmaaOptions, VdeaProblem, extreme_efficiency,
    extreme_ranks, preference_relations, smaa,
};

/// Imprecise value-model problem whose boxes are all degenerate: it must
/// behave exactly like the precise problem it collapses to.
fn degenerate_pair() -> (ImpreciseVdeaProblem, VdeaProblem) {
    let imprecise = ImpreciseVdeaProblem::new(
        vec!["consumption", "yield"],
        vec![
            FactorData::Interval {
                lo: array![0.0, 0.5, 1.0],
                hi: array![0.0, 0.5, 1.0],
            },
            FactorData::Precise(array![1.0, 0.5, 0.0]),
        ],
        vec![
            Some(Envelope::linear_cost(0.0, 1.0)),
            Some(Envelope::linear_gain(0.0, 1.0)),
        ],
        ImpreciseOptions::default(),
    )
    .unwrap();
    let precise = VdeaProblem::new(
        vec!["consumption", "yield"],
        array![[0.0, 1.0], [0.5, 0.5], [1.0, 0.0]],
        vec![
            Envelope::linear_cost(0.0, 1.0),
            Envelope::linear_gain(0.0, 1.0),
        ],
    )
    .unwrap();
    (imprecise, precise)
}

#[test]
fn test_degenerate_imprecise_matches_precise_extremes() {
    let (imp, pre) = degenerate_pair();
    let opts = ExtremeOptions::default();
    let a = extreme_efficiency(&imp, &opts).unwrap();
    let b = extreme_efficiency(&pre, &opts).unwrap();
    for s in 0..3 {
        assert!((a.max[s] - b.max[s]).abs() < 1e-6, "max of unit {s}");
        assert!((a.min[s] - b.min[s]).abs() < 1e-6, "min of unit {s}");
    }
}

#[test]
fn test_degenerate_imprecise_matches_precise_smaa() {
    let (imp, pre) = degenerate_pair();
    let opts = SmaaOptions::default().samples(200).bins(10).seed(5).parallelism(1);
    let a = smaa(&imp, SmaaIndicator::Efficiency, &opts).unwrap();
    let b = smaa(&pre, SmaaIndicator::Efficiency, &opts).unwrap();
    for s in 0..3 {
        assert!(
            (a.expected[s] - b.expected[s]).abs() < 1e-9,
            "expected value of unit {s}: {} vs {}",
            a.expected[s],
            b.expected[s]
        );
    }
}

#[test]
fn test_interval_width_widens_the_efficiency_range() {
    let tight = ImpreciseVdeaProblem::new(
        vec!["yield"],
        vec![FactorData::Precise(array![0.5, 1.0])],
        vec![Some(Envelope::linear_gain(0.0, 1.0))],
        ImpreciseOptions::default(),
    )
    .unwrap();
    let wide = ImpreciseVdeaProblem::new(
        vec!["yield"],
        vec![FactorData::Interval {
            lo: array![0.2, 1.0],
            hi: array![0.8, 1.0],
        }],
        vec![Some(Envelope::linear_gain(0.0, 1.0))],
        ImpreciseOptions::default(),
    )
    .unwrap();
    let opts = ExtremeOptions::default();
    let t = extreme_efficiency(&tight, &opts).unwrap();
    let w = extreme_efficiency(&wide, &opts).unwrap();
    assert!((t.min[0] - 0.5).abs() < 1e-6 && (t.max[0] - 0.5).abs() < 1e-6);
    assert!((w.min[0] - 0.2).abs() < 1e-6, "got {}", w.min[0]);
    assert!((w.max[0] - 0.8).abs() < 1e-6, "got {}", w.max[0]);
}

/// Mixed ratio-model data: precise staff, an interval on floor space, a
/// purely ordinal service-quality output next to precise sales.
fn mixed_ratio_problem() -> ImpreciseCcrProblem {
    ImpreciseCcrProblem::new(
        vec!["staff", "floor"],
        vec!["sales", "service"],
        vec![
            FactorData::Precise(array![2.0, 3.0, 4.0]),
            FactorData::Interval {
                lo: array![1.0, 2.0, 1.5],
                hi: array![1.5, 2.5, 2.0],
            },
        ],
        vec![
            FactorData::Precise(array![5.0, 6.0, 9.0]),
            FactorData::Ordinal {
                ranks: vec![2, 1, 3],
            },
        ],
        ImpreciseOptions {
            ordinal_ratio: 1.1,
            ordinal_min: 0.01,
            ..Default::default()
        },
    )
    .unwrap()
}

#[test]
fn test_mixed_ratio_extremes_are_consistent() {
    let p = mixed_ratio_problem();
    let eff = extreme_efficiency(&p, &ExtremeOptions::default()).unwrap();
    assert!(eff.failed.is_empty());
    for s in 0..3 {
        assert!(eff.min[s] > 0.0, "unit {s} min {}", eff.min[s]);
        assert!(
            eff.min[s] <= eff.max[s] + 1e-9,
            "unit {s}: {} > {}",
            eff.min[s],
            eff.max[s]
        );
        assert!(eff.max[s] <= 1.0 + 1e-6, "unit {s} max {}", eff.max[s]);
    }
    let best = eff.max.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!((best - 1.0).abs() < 1e-6, "someone must reach the frontier");
}

#[test]
fn test_mixed_ratio_ranks_nest_inside_bounds() {
    let p = mixed_ratio_problem();
    let opts = ExtremeOptions::default().epsilon(1e-6);
    let ranks = extreme_ranks(&p, &opts).unwrap();
    for s in 0..3 {
        assert!(ranks.min[s] >= 1 && ranks.min[s] <= ranks.max[s] && ranks.max[s] <= 3);
    }
    let rel = preference_relations(&p, &opts).unwrap();
    for s in 0..3 {
        for t in 0..3 {
            if rel.necessary[(s, t)] {
                assert!(rel.possible[(s, t)]);
            }
        }
    }
}

#[test]
fn test_mixed_ratio_smaa_is_deterministic_and_bounded() {
    let p = mixed_ratio_problem();
    let opts = SmaaOptions::default().samples(300).bins(10).seed(42);
    let a = smaa(&p, SmaaIndicator::Efficiency, &opts.clone().parallelism(1)).unwrap();
    let b = smaa(&p, SmaaIndicator::Efficiency, &opts.parallelism(3)).unwrap();
    assert_eq!(a.histogram, b.histogram);
    assert_eq!(a.expected, b.expected);
    let eff = extreme_efficiency(&p, &ExtremeOptions::default()).unwrap();
    for s in 0..3 {
        assert!(
            a.expected[s] <= eff.max[s] + 1e-6 && a.expected[s] >= eff.min[s] - 1e-6,
            "unit {s}: expected {} outside [{}, {}]",
            a.expected[s],
            eff.min[s],
            eff.max[s]
        );
    }
}

#[test]
fn test_ordinal_top_rank_beats_bottom_everywhere_on_pure_ordinal_output() {
    let p = ImpreciseCcrProblem::new(
        vec!["cost"],
        vec!["quality"],
        vec![FactorData::Precise(array![1.0, 1.0, 1.0])],
        vec![FactorData::Ordinal {
            ranks: vec![1, 2, 3],
        }],
        ImpreciseOptions {
            ordinal_ratio: 1.2,
            ordinal_min: 0.05,
            ..Default::default()
        },
    )
    .unwrap();
    let opts = ExtremeOptions::default().epsilon(1e-6);
    let rel = preference_relations(&p, &opts).unwrap();
    // Equal inputs and a strict output ranking: the order is total and
    // certain.
    assert!(rel.necessary[(0, 1)] && rel.necessary[(1, 2)] && rel.necessary[(0, 2)]);
    assert!(!rel.possible[(2, 0)] && !rel.possible[(1, 0)]);
    let ranks = extreme_ranks(&p, &opts).unwrap();
    assert_eq!(ranks.min, vec![1, 2, 3]);
    assert_eq!(ranks.max, vec![1, 2, 3]);
}

#[test]
fn test_rejected_tolerances() {
    let r = ImpreciseCcrProblem::new(
        vec!["x"],
        vec!["y"],
        vec![FactorData::Precise(array![1.0])],
        vec![FactorData::Precise(array![1.0])],
        ImpreciseOptions {
            ordinal_min: 1.5,
            ..Default::default()
        },
    );
    assert!(r.is_err());
}
