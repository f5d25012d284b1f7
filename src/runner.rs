//! Top-level orchestration: config in, permutation test result out
//!
//! Wires the pipeline in its fixed order: validate the configuration, fit
//! the observed data once, generate the permuted ensemble, drive the refit
//! loop, then derive the p-value. The diagnostic reporter is deliberately
//! not invoked here; callers that want the histogram pass the result to
//! `report` themselves.

use crate::builder::{self, FailurePolicy};
use crate::error::{PermTestError, Result};
use crate::evaluate;
use crate::permute;
use crate::pvalue;
use crate::spec::{RegressionKind, RegressionSpec};
use crate::table::DataTable;
use serde::Serialize;
use tracing::info;

/// Default number of permutations
pub const DEFAULT_N_PERMS: usize = 5000;

/// Run configuration with builder-style setters
#[derive(Debug, Clone)]
pub struct PermTestConfig {
    pub spec: RegressionSpec,
    pub n_perms: usize,
    pub kind: RegressionKind,
    pub workers: usize,
    pub seed: Option<u64>,
    pub policy: FailurePolicy,
}

impl PermTestConfig {
    /// Defaults: 5000 permutations, OLS, serial, unseeded, fail-fast
    pub fn new(spec: RegressionSpec) -> Self {
        Self {
            spec,
            n_perms: DEFAULT_N_PERMS,
            kind: RegressionKind::Ols,
            workers: 0,
            seed: None,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_n_perms(mut self, n_perms: usize) -> Self {
        self.n_perms = n_perms;
        self
    }

    pub fn with_kind(mut self, kind: RegressionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Everything a caller needs from one run, JSON-serializable
#[derive(Debug, Clone, Serialize)]
pub struct PermutationTestResult {
    /// The predictor whose coefficient was tested
    pub variable: String,
    /// Coefficient from the observed (unpermuted) fit
    pub observed_coefficient: f64,
    /// t-statistic from the observed fit; the comparison statistic
    pub observed_t: f64,
    /// Two-sided empirical p-value
    pub p_value: f64,
    /// Smallest non-zero p-value this ensemble can resolve (1 / n)
    pub p_value_floor: f64,
    /// Number of null statistics actually collected
    pub n_perms: usize,
    /// The full null ensemble, in permutation order
    pub null_statistics: Vec<f64>,
}

/// Execute the full permutation test
pub fn run(config: &PermTestConfig, data: &DataTable) -> Result<PermutationTestResult> {
    // All configuration errors surface before any fitting work
    if config.n_perms == 0 {
        return Err(PermTestError::InvalidArgument(
            "n_perms must be a positive integer".to_string(),
        ));
    }
    config.spec.validate_against(data)?;

    info!(
        variable = config.spec.variable(),
        n_perms = config.n_perms,
        kind = ?config.kind,
        workers = config.workers,
        seeded = config.seed.is_some(),
        "starting permutation test"
    );

    let observed = evaluate::evaluate(&config.spec, data, config.kind)?;

    let samples = permute::generate(data, config.spec.response(), config.n_perms, config.seed)?;
    let ensemble = builder::build(
        &config.spec,
        samples,
        config.kind,
        config.workers,
        config.policy,
    )?;

    let null_statistics = ensemble.statistics();
    let p = pvalue::p_value(observed.t_statistic, &null_statistics)?;

    info!(
        p_value = p,
        observed_t = observed.t_statistic,
        collected = null_statistics.len(),
        "permutation test complete"
    );

    Ok(PermutationTestResult {
        variable: config.spec.variable().to_string(),
        observed_coefficient: observed.coefficient,
        observed_t: observed.t_statistic,
        p_value: p,
        p_value_floor: pvalue::p_value_floor(null_statistics.len()),
        n_perms: null_statistics.len(),
        null_statistics,
    })
}
