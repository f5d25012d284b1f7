//! Empirical p-value from the null ensemble
//!
//! Two-sided, exact count-based: the share of null statistics whose
//! magnitude meets or exceeds the observed magnitude. No continuity
//! correction, no interpolation. The smallest non-zero value the estimate
//! can take is `1 / n_perms`; an exact 0 means no null draw reached the
//! observed magnitude, not a true zero probability.

use crate::error::{PermTestError, Result};

/// `count(|null_i| >= |observed|) / len(null)`
pub fn p_value(observed: f64, null_statistics: &[f64]) -> Result<f64> {
    if null_statistics.is_empty() {
        return Err(PermTestError::EmptyEnsemble);
    }

    let threshold = observed.abs();
    let exceeding = null_statistics
        .iter()
        .filter(|t| t.abs() >= threshold)
        .count();

    Ok(exceeding as f64 / null_statistics.len() as f64)
}

/// The smallest non-zero p-value attainable with an ensemble of this size
pub fn p_value_floor(ensemble_len: usize) -> f64 {
    if ensemble_len == 0 {
        return f64::NAN;
    }
    1.0 / ensemble_len as f64
}
