//! Stratified Train/Test Split

use crate::ModelError;
use preprocessing::Dataset;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tracing::debug;

/// Fraction of rows held out for evaluation
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Seed used for reproducible splits and fits
pub const DEFAULT_RANDOM_STATE: u64 = 1;

/// Split a dataset into (train, test), preserving the class balance of the target.
///
/// Each class contributes `round(count * test_size)` rows to the test set.
pub fn train_test_split(
    dataset: &Dataset,
    test_size: f64,
    random_state: u64,
) -> Result<(Dataset, Dataset), ModelError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ModelError::InvalidSplit(format!(
            "test_size must be between 0 and 1, got {}",
            test_size
        )));
    }

    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in dataset.target.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }

    if let Some((label, members)) = by_class.iter().find(|(_, m)| m.len() < 2) {
        return Err(ModelError::InvalidSplit(format!(
            "the least populated class ({}) has only {} member(s); need at least 2",
            label,
            members.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(random_state);
    let mut train_idx = Vec::new();
    let mut test_idx = Vec::new();

    for (label, mut members) in by_class {
        members.shuffle(&mut rng);
        let n_test = (members.len() as f64 * test_size).round() as usize;
        debug!(
            "Class {}: {} rows, {} held out",
            label,
            members.len(),
            n_test
        );
        test_idx.extend_from_slice(&members[..n_test]);
        train_idx.extend_from_slice(&members[n_test..]);
    }

    if train_idx.is_empty() || test_idx.is_empty() {
        return Err(ModelError::InvalidSplit(format!(
            "split would leave an empty set (n_train={}, n_test={})",
            train_idx.len(),
            test_idx.len()
        )));
    }

    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    Ok((dataset.select(&train_idx), dataset.select(&test_idx)))
}
