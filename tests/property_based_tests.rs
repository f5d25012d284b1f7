// Property-based tests for the permutation engine invariants: permutation
// validity, ensemble sizing, and p-value bounds.

use permtest::builder::{self, FailurePolicy};
use permtest::permute;
use permtest::pvalue;
use permtest::spec::{RegressionKind, RegressionSpec};
use permtest::table::DataTable;
use proptest::prelude::*;

fn arbitrary_response() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-100.0..100.0f64, 8..40)
}

proptest! {
    #[test]
    fn prop_permutation_is_a_bijection_of_the_response(
        y in arbitrary_response(),
        seed in any::<u64>(),
        n_perms in 1usize..20,
    ) {
        let n = y.len();
        let x1: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let table = DataTable::new(vec![
            ("y".to_string(), y.clone()),
            ("x1".to_string(), x1.clone()),
        ]).unwrap();

        let samples = permute::generate(&table, "y", n_perms, Some(seed)).unwrap();
        prop_assert_eq!(samples.len(), n_perms);

        let mut sorted_original = y;
        sorted_original.sort_by(|a, b| a.partial_cmp(b).unwrap());

        for sample in &samples {
            // Predictors byte-identical to the source
            prop_assert_eq!(sample.data.column("x1").unwrap(), x1.as_slice());

            // Response is a reordering: same multiset, nothing invented or
            // dropped
            let mut sorted_permuted = sample.data.column("y").unwrap().to_vec();
            sorted_permuted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            prop_assert_eq!(&sorted_permuted, &sorted_original);
        }
    }

    #[test]
    fn prop_seeded_generation_is_reproducible(
        seed in any::<u64>(),
        n_perms in 1usize..10,
    ) {
        let y: Vec<f64> = (0..12).map(|i| (i as f64 * 1.3).sin()).collect();
        let x1: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let table = DataTable::new(vec![
            ("y".to_string(), y),
            ("x1".to_string(), x1),
        ]).unwrap();

        let a = permute::generate(&table, "y", n_perms, Some(seed)).unwrap();
        let b = permute::generate(&table, "y", n_perms, Some(seed)).unwrap();
        for (sa, sb) in a.iter().zip(b.iter()) {
            prop_assert_eq!(
                sa.data.column("y").unwrap(),
                sb.data.column("y").unwrap()
            );
        }
    }

    #[test]
    fn prop_p_value_is_bounded_and_count_exact(
        null in prop::collection::vec(-50.0..50.0f64, 1..200),
        observed in -50.0..50.0f64,
    ) {
        let p = pvalue::p_value(observed, &null).unwrap();
        prop_assert!((0.0..=1.0).contains(&p));

        let count = null.iter().filter(|t| t.abs() >= observed.abs()).count();
        prop_assert_eq!(p, count as f64 / null.len() as f64);

        // Non-zero p-values never undercut the floor
        if p > 0.0 {
            prop_assert!(p >= pvalue::p_value_floor(null.len()) - 1e-15);
        }
    }

    #[test]
    fn prop_ensemble_length_matches_n_perms(
        seed in any::<u64>(),
        n_perms in 1usize..12,
    ) {
        let n = 20;
        let x1: Vec<f64> = (0..n).map(|i| i as f64 / 2.0).collect();
        let x2: Vec<f64> = (0..n).map(|i| ((i * 3) % 7) as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).cos() * 3.0).collect();
        let table = DataTable::new(vec![
            ("y".to_string(), y),
            ("x1".to_string(), x1),
            ("x2".to_string(), x2),
        ]).unwrap();
        let spec = RegressionSpec::new("y", &["x1", "x2"], "x1").unwrap();

        let samples = permute::generate(&table, "y", n_perms, Some(seed)).unwrap();
        let ensemble = builder::build(
            &spec,
            samples,
            RegressionKind::Ols,
            0,
            FailurePolicy::FailFast,
        ).unwrap();
        prop_assert_eq!(ensemble.len(), n_perms);
    }
}
