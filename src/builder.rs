//! Null distribution builder: the refit loop, serial or pooled
//!
//! Drives the model evaluator over every permuted sample and collects the
//! ensemble of null t-statistics. The parallel path is a fixed pool of
//! worker threads fed over crossbeam channels; each worker owns its own
//! clone of the spec and regression kind and the samples move through the
//! channel, so no mutable state crosses a thread boundary. Results come
//! back tagged with their permutation index and are slotted into place,
//! which makes a seeded run return an identically ordered ensemble no
//! matter how many workers ran it.

use crate::error::{PermTestError, Result};
use crate::evaluate;
use crate::permute::PermutedSample;
use crate::spec::{RegressionKind, RegressionSpec};
use crossbeam::channel;
use std::thread;
use tracing::{debug, warn};

/// What to do when a single refit fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Any fit failure fails the whole build (default)
    #[default]
    FailFast,
    /// Drop the failed entry, shrink the ensemble, and log the drop
    Lenient,
}

/// The collected null statistics, each tagged with the permutation index
/// that produced it
#[derive(Debug, Clone)]
pub struct NullEnsemble {
    entries: Vec<(usize, f64)>,
}

impl NullEnsemble {
    /// Number of collected statistics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(permutation index, t-statistic)` pairs in permutation order
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    /// Just the t-statistics, in permutation order
    pub fn statistics(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, t)| *t).collect()
    }
}

/// Evaluate every permuted sample and collect the null ensemble
///
/// `workers == 0` runs serially in input order; `workers > 0` runs a fixed
/// pool, capped at the machine's available parallelism.
pub fn build(
    spec: &RegressionSpec,
    samples: Vec<PermutedSample>,
    kind: RegressionKind,
    workers: usize,
    policy: FailurePolicy,
) -> Result<NullEnsemble> {
    let requested = samples.len();
    if requested == 0 {
        return Err(PermTestError::InvalidArgument(
            "no permuted samples to evaluate".to_string(),
        ));
    }

    if workers == 0 {
        build_serial(spec, samples, kind, policy)
    } else {
        let pool_size = cap_workers(workers, requested);
        build_parallel(spec, samples, kind, pool_size, policy)
    }
}

/// Cap the pool at available hardware parallelism and at the work count;
/// oversubscription is permitted by the caller but pointless
fn cap_workers(requested_workers: usize, n_samples: usize) -> usize {
    let hardware = thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    requested_workers.min(hardware).min(n_samples).max(1)
}

fn build_serial(
    spec: &RegressionSpec,
    samples: Vec<PermutedSample>,
    kind: RegressionKind,
    policy: FailurePolicy,
) -> Result<NullEnsemble> {
    let requested = samples.len();
    let mut entries = Vec::with_capacity(requested);

    for sample in samples {
        match evaluate::evaluate(spec, &sample.data, kind) {
            Ok(result) => entries.push((sample.index, result.t_statistic)),
            Err(err) => match policy {
                FailurePolicy::FailFast => {
                    warn!(
                        permutation = sample.index,
                        error = %err,
                        "refit failed; aborting build (fail-fast)"
                    );
                    return Err(PermTestError::IncompleteEnsemble {
                        succeeded: entries.len(),
                        requested,
                    });
                }
                FailurePolicy::Lenient => {
                    warn!(
                        permutation = sample.index,
                        error = %err,
                        "refit failed; dropping entry (lenient)"
                    );
                }
            },
        }
    }

    debug!(collected = entries.len(), requested, "serial build complete");
    Ok(NullEnsemble { entries })
}

fn build_parallel(
    spec: &RegressionSpec,
    samples: Vec<PermutedSample>,
    kind: RegressionKind,
    pool_size: usize,
    policy: FailurePolicy,
) -> Result<NullEnsemble> {
    let requested = samples.len();
    debug!(pool_size, requested, "starting worker pool");

    let (work_tx, work_rx) = channel::unbounded::<PermutedSample>();
    let (result_tx, result_rx) = channel::unbounded::<(usize, Result<f64>)>();

    let mut handles = Vec::with_capacity(pool_size);
    for _ in 0..pool_size {
        let work_rx = work_rx.clone();
        let result_tx = result_tx.clone();
        let spec = spec.clone();
        let handle = thread::spawn(move || {
            // Each worker owns its spec clone and the samples it pulls; the
            // channel closing is the shutdown signal
            for sample in work_rx.iter() {
                let outcome = evaluate::evaluate(&spec, &sample.data, kind)
                    .map(|result| result.t_statistic);
                if result_tx.send((sample.index, outcome)).is_err() {
                    break;
                }
            }
        });
        handles.push(handle);
    }
    drop(work_rx);
    drop(result_tx);

    for sample in samples {
        // Receivers only disconnect if a worker panicked; surface that as a
        // fit failure rather than panicking the caller
        if work_tx.send(sample).is_err() {
            break;
        }
    }
    drop(work_tx);

    // Slot results by permutation index so ordering is deterministic
    let mut slots: Vec<Option<Result<f64>>> = (0..requested).map(|_| None).collect();
    for (index, outcome) in result_rx.iter() {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(outcome);
        }
    }

    for handle in handles {
        if handle.join().is_err() {
            return Err(PermTestError::RegressionFitFailure(
                "a worker thread panicked".to_string(),
            ));
        }
    }

    let mut entries = Vec::with_capacity(requested);
    let mut failed = 0usize;
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(Ok(t)) => entries.push((index, t)),
            Some(Err(err)) => {
                failed += 1;
                warn!(permutation = index, error = %err, "refit failed in pool");
            }
            None => {
                failed += 1;
                warn!(permutation = index, "no result collected for permutation");
            }
        }
    }

    if failed > 0 && policy == FailurePolicy::FailFast {
        return Err(PermTestError::IncompleteEnsemble {
            succeeded: entries.len(),
            requested,
        });
    }

    debug!(collected = entries.len(), requested, "pooled build complete");
    Ok(NullEnsemble { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permute;
    use crate::table::DataTable;

    fn noise_table() -> DataTable {
        // y unrelated to the predictors, with enough texture that every
        // permutation still fits cleanly
        let x1: Vec<f64> = (0..24).map(|i| i as f64 / 2.0).collect();
        let x2: Vec<f64> = (0..24).map(|i| ((i * 7) % 11) as f64).collect();
        let y: Vec<f64> = (0..24).map(|i| ((i as f64) * 1.7).sin() * 3.0).collect();
        DataTable::new(vec![
            ("y".to_string(), y),
            ("x1".to_string(), x1),
            ("x2".to_string(), x2),
        ])
        .unwrap()
    }

    fn spec() -> RegressionSpec {
        RegressionSpec::new("y", &["x1", "x2"], "x1").unwrap()
    }

    #[test]
    fn test_serial_build_collects_every_sample() {
        let table = noise_table();
        let samples = permute::generate(&table, "y", 40, Some(9)).unwrap();
        let ensemble = build(
            &spec(),
            samples,
            RegressionKind::Ols,
            0,
            FailurePolicy::FailFast,
        )
        .unwrap();
        assert_eq!(ensemble.len(), 40);
        for (i, (index, _)) in ensemble.entries().iter().enumerate() {
            assert_eq!(*index, i);
        }
    }

    #[test]
    fn test_parallel_matches_serial_bit_for_bit() {
        let table = noise_table();
        for workers in [1usize, 4] {
            let serial = build(
                &spec(),
                permute::generate(&table, "y", 30, Some(42)).unwrap(),
                RegressionKind::Ols,
                0,
                FailurePolicy::FailFast,
            )
            .unwrap();
            let pooled = build(
                &spec(),
                permute::generate(&table, "y", 30, Some(42)).unwrap(),
                RegressionKind::Ols,
                workers,
                FailurePolicy::FailFast,
            )
            .unwrap();
            assert_eq!(serial.statistics(), pooled.statistics());
        }
    }

    #[test]
    fn test_empty_sample_set_rejected() {
        let result = build(
            &spec(),
            Vec::new(),
            RegressionKind::Ols,
            0,
            FailurePolicy::FailFast,
        );
        assert!(matches!(result, Err(PermTestError::InvalidArgument(_))));
    }

    #[test]
    fn test_fail_fast_surfaces_incomplete_ensemble() {
        // A spec whose predictor is missing from the data makes every fit
        // fail before any statistic is produced
        let table = noise_table();
        let samples = permute::generate(&table, "y", 10, Some(1)).unwrap();
        let bad_spec = RegressionSpec::new("y", &["x1", "x9"], "x1").unwrap();

        let result = build(
            &bad_spec,
            samples,
            RegressionKind::Ols,
            0,
            FailurePolicy::FailFast,
        );
        match result {
            Err(PermTestError::IncompleteEnsemble {
                succeeded,
                requested,
            }) => {
                assert_eq!(succeeded, 0);
                assert_eq!(requested, 10);
            }
            other => panic!("expected IncompleteEnsemble, got {:?}", other),
        }
    }

    #[test]
    fn test_lenient_policy_drops_failures_explicitly() {
        let table = noise_table();
        let samples = permute::generate(&table, "y", 5, Some(1)).unwrap();
        let bad_spec = RegressionSpec::new("y", &["x1", "x9"], "x1").unwrap();

        let ensemble = build(
            &bad_spec,
            samples,
            RegressionKind::Ols,
            0,
            FailurePolicy::Lenient,
        )
        .unwrap();
        // Every fit failed, so the lenient ensemble drops to zero entries,
        // visibly rather than silently
        assert_eq!(ensemble.len(), 0);
    }

    #[test]
    fn test_parallel_fail_fast() {
        let table = noise_table();
        let samples = permute::generate(&table, "y", 8, Some(1)).unwrap();
        let bad_spec = RegressionSpec::new("y", &["x1", "x9"], "x1").unwrap();

        let result = build(
            &bad_spec,
            samples,
            RegressionKind::Ols,
            4,
            FailurePolicy::FailFast,
        );
        assert!(matches!(
            result,
            Err(PermTestError::IncompleteEnsemble { .. })
        ));
    }

    #[test]
    fn test_oversized_worker_count_is_capped_not_an_error() {
        let table = noise_table();
        let samples = permute::generate(&table, "y", 12, Some(5)).unwrap();
        let ensemble = build(
            &spec(),
            samples,
            RegressionKind::Ols,
            10_000,
            FailurePolicy::FailFast,
        )
        .unwrap();
        assert_eq!(ensemble.len(), 12);
    }

    #[test]
    fn test_cap_workers_bounds() {
        assert_eq!(cap_workers(1, 100), 1);
        assert!(cap_workers(10_000, 100) <= 100);
        assert!(cap_workers(4, 2) <= 2);
        assert!(cap_workers(1, 1) >= 1);
    }
}
