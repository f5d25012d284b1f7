//! Permutation generator for the response column
//!
//! Each permuted sample is a fully materialized copy of the source table
//! whose response column has been shuffled in place. Predictor columns are
//! never touched: the joint predictor structure stays intact while the
//! response-predictor association is broken, which is what makes the
//! permutation null valid.

use crate::error::{PermTestError, Result};
use crate::table::DataTable;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One permuted dataset, tagged with the draw that produced it
#[derive(Debug, Clone)]
pub struct PermutedSample {
    /// Index of this permutation within the run (0-based)
    pub index: usize,
    /// Source table with the response column shuffled
    pub data: DataTable,
}

/// Generate `n_perms` independent uniform shuffles of the response column
///
/// With a seed, the sequence of permutations is bit-identical across runs;
/// without one, the generator draws from system entropy.
pub fn generate(
    data: &DataTable,
    response_name: &str,
    n_perms: usize,
    seed: Option<u64>,
) -> Result<Vec<PermutedSample>> {
    if n_perms == 0 {
        return Err(PermTestError::InvalidArgument(
            "n_perms must be a positive integer".to_string(),
        ));
    }

    // Fails here if the response column does not exist
    let response = data.column(response_name)?.to_vec();

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let mut samples = Vec::with_capacity(n_perms);
    for index in 0..n_perms {
        let mut shuffled = response.clone();
        shuffled.shuffle(&mut rng);

        let mut table = data.clone();
        table.replace_column(response_name, shuffled)?;

        samples.push(PermutedSample { index, data: table });
    }

    Ok(samples)
}
