//! Stratified, seeded train/test split
//!
//! Each class is shuffled on its own and contributes `round(n_class *
//! test_fraction)` samples to the test side, so both sides keep the corpus
//! label balance. A class never gives away its last training sample.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Split `labels` indices into `(train, test)`, both sorted ascending
pub fn stratified_split<L: Ord + Copy>(labels: &[L], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: BTreeMap<L, Vec<usize>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        by_class.entry(*label).or_default().push(idx);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for (_, mut members) in by_class {
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.min(members.len().saturating_sub(1));
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    tracing::debug!(
        "Stratified split: {} training, {} test ({}% / {}%)",
        train.len(),
        test.len(),
        (train.len() * 100) / labels.len().max(1),
        (test.len() * 100) / labels.len().max(1),
    );

    (train, test)
}
