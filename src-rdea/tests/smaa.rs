use ndarray::array;
use rdea::{
    CcrProblem, Envelope, ExtremeOptions, SmaaIndicator, SmaaOptions, VdeaProblem,
    extreme_efficiency, extreme_ranks, smaa, smaa_preferences,
};

fn shop_network() -> CcrProblem {
    CcrProblem::new(
        vec!["staff", "floor"],
        vec!["sales"],
        array![[1.0, 2.0], [5.0, 7.0], [4.0, 2.0], [7.0, 4.0], [3.0, 8.0]],
        array![[1.0], [10.0], [5.0], [7.0], [12.0]],
    )
    .unwrap()
}

fn mirrored() -> VdeaProblem {
    VdeaProblem::new(
        vec!["consumption", "yield"],
        array![[0.0, 1.0], [0.5, 0.5], [1.0, 0.0]],
        vec![
            Envelope::linear_cost(0.0, 1.0),
            Envelope::linear_gain(0.0, 1.0),
        ],
    )
    .unwrap()
}

#[test]
fn test_same_seed_reproduces_results_exactly() {
    let p = shop_network();
    let opts = SmaaOptions::default()
        .samples(100)
        .bins(10)
        .seed(5)
        .parallelism(1);
    let a = smaa(&p, SmaaIndicator::Efficiency, &opts).unwrap();
    let b = smaa(&p, SmaaIndicator::Efficiency, &opts).unwrap();
    assert_eq!(a.histogram, b.histogram);
    assert_eq!(a.expected, b.expected);
}

#[test]
fn test_parallelism_does_not_change_results() {
    let p = shop_network();
    let base = SmaaOptions::default().samples(200).bins(10).seed(7);
    let serial = smaa(&p, SmaaIndicator::Efficiency, &base.clone().parallelism(1)).unwrap();
    let parallel = smaa(&p, SmaaIndicator::Efficiency, &base.parallelism(4)).unwrap();
    assert_eq!(serial.histogram, parallel.histogram);
    assert_eq!(serial.expected, parallel.expected);
}

#[test]
fn test_distribution_rows_sum_to_one() {
    let p = shop_network();
    let opts = SmaaOptions::default().samples(500).bins(8).seed(3);
    for indicator in [
        SmaaIndicator::Efficiency,
        SmaaIndicator::Distance,
        SmaaIndicator::Rank,
    ] {
        let d = smaa(&p, indicator, &opts).unwrap();
        assert_eq!(d.skipped, 0);
        for (s, row) in d.histogram.rows().into_iter().enumerate() {
            let sum: f64 = row.sum();
            assert!(
                (sum - 1.0).abs() < 1e-9,
                "row {s} of {indicator:?} sums to {sum}"
            );
        }
    }
}

#[test]
fn test_expected_efficiency_lies_inside_the_extreme_range() {
    let p = shop_network();
    let d = smaa(
        &p,
        SmaaIndicator::Efficiency,
        &SmaaOptions::default().samples(1000).seed(11),
    )
    .unwrap();
    let eff = extreme_efficiency(&p, &ExtremeOptions::default()).unwrap();
    for s in 0..5 {
        assert!(
            d.expected[s] >= eff.min[s] - 1e-6 && d.expected[s] <= eff.max[s] + 1e-6,
            "unit {s}: expected {} outside [{}, {}]",
            d.expected[s],
            eff.min[s],
            eff.max[s]
        );
    }
}

#[test]
fn test_expected_rank_lies_inside_the_rank_bounds() {
    let p = shop_network();
    let d = smaa(
        &p,
        SmaaIndicator::Rank,
        &SmaaOptions::default().samples(1000).seed(13),
    )
    .unwrap();
    let bounds = extreme_ranks(&p, &ExtremeOptions::default().epsilon(1e-6)).unwrap();
    assert_eq!(d.histogram.ncols(), 5);
    for s in 0..5 {
        assert!(
            d.expected[s] >= bounds.min[s] as f64 - 1e-6,
            "unit {s}: expected rank {} below best rank {}",
            d.expected[s],
            bounds.min[s]
        );
        assert!(
            d.expected[s] <= bounds.max[s] as f64 + 1e-6,
            "unit {s}: expected rank {} above worst rank {}",
            d.expected[s],
            bounds.max[s]
        );
    }
}

#[test]
fn test_rank_distribution_on_weight_free_problem_is_degenerate() {
    let p = mirrored();
    let d = smaa(
        &p,
        SmaaIndicator::Rank,
        &SmaaOptions::default().samples(200).seed(2),
    )
    .unwrap();
    // The ordering never changes, so each unit's rank column is all mass.
    for (s, want_rank) in [(0usize, 1usize), (1, 2), (2, 3)] {
        assert!(
            (d.histogram[(s, want_rank - 1)] - 1.0).abs() < 1e-12,
            "unit {s} should always rank {want_rank}"
        );
        assert!((d.expected[s] - want_rank as f64).abs() < 1e-12);
    }
}

#[test]
fn test_peoi_diagonal_and_complementarity() {
    let p = shop_network();
    let samples = 2000;
    let peoi = smaa_preferences(&p, &SmaaOptions::default().samples(samples).seed(5)).unwrap();
    for i in 0..5 {
        assert!((peoi.matrix[(i, i)] - 1.0).abs() < 1e-12, "diagonal at {i}");
        for j in 0..5 {
            if i == j {
                continue;
            }
            let sum = peoi.matrix[(i, j)] + peoi.matrix[(j, i)];
            assert!(
                sum >= 1.0 - 1e-9 && sum <= 1.0 + 2.0 / samples as f64 + 1e-9,
                "complementarity broken at ({i}, {j}): {sum}"
            );
        }
    }
}

#[test]
fn test_peoi_agrees_with_dominance() {
    let p = shop_network();
    let peoi = smaa_preferences(&p, &SmaaOptions::default().samples(500).seed(9)).unwrap();
    // Unit 4 dominates unit 0 for every weight vector.
    assert!((peoi.matrix[(4, 0)] - 1.0).abs() < 1e-12);
    assert!(peoi.matrix[(0, 4)] < 1e-12);
    // Units 2 and 4 split the weight space.
    assert!(peoi.matrix[(2, 4)] > 0.05);
    assert!(peoi.matrix[(4, 2)] > 0.05);
}

#[test]
fn test_efficiency_histogram_mass_respects_the_range() {
    let p = shop_network();
    let bins = 10;
    let d = smaa(
        &p,
        SmaaIndicator::Efficiency,
        &SmaaOptions::default().samples(500).bins(bins).seed(21),
    )
    .unwrap();
    // Unit 4 never scores below 0.6: the first five bins stay empty.
    for b in 0..5 {
        assert!(
            d.histogram[(4, b)] < 1e-12,
            "unit 4 has mass {} in bin {b}",
            d.histogram[(4, b)]
        );
    }
}

#[test]
fn test_zero_samples_is_rejected() {
    let p = shop_network();
    let r = smaa(
        &p,
        SmaaIndicator::Efficiency,
        &SmaaOptions::default().samples(0),
    );
    assert!(r.is_err());
}
