//! Stratified partitioning of a labelled set.
//!
//! Both functions preserve the positive rate in every partition and return
//! index sets sorted ascending, so results depend only on the RNG state.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::FitError;

fn class_indices(y: &[bool]) -> (Vec<usize>, Vec<usize>) {
    (0..y.len()).partition(|&i| y[i])
}

/// Split into (train, test) indices with `test_fraction` of each class held out.
///
/// # Errors
/// Returns error when the fraction is outside (0, 1) or a class has fewer
/// than two members.
pub fn stratified_split<R: Rng + ?Sized>(
    y: &[bool],
    test_fraction: f64,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>), FitError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(FitError::InvalidParameter(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }
    if y.is_empty() {
        return Err(FitError::Empty);
    }
    let (mut pos, mut neg) = class_indices(y);
    if pos.is_empty() || neg.is_empty() {
        return Err(FitError::SingleClass(y.len()));
    }

    let mut train = Vec::with_capacity(y.len());
    let mut test = Vec::new();
    for members in [&mut pos, &mut neg] {
        if members.len() < 2 {
            return Err(FitError::TooFewMembers {
                needed: 2,
                have: members.len(),
            });
        }
        members.shuffle(rng);
        // Both sides keep at least one member of each class.
        let n_test = ((members.len() as f64 * test_fraction).round() as usize)
            .clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// Partition into `k` disjoint held-out folds covering every index.
///
/// # Errors
/// Returns error when `k < 2` or a class has fewer than `k` members.
pub fn stratified_kfold<R: Rng + ?Sized>(
    y: &[bool],
    k: usize,
    rng: &mut R,
) -> Result<Vec<Vec<usize>>, FitError> {
    if k < 2 {
        return Err(FitError::InvalidParameter(format!(
            "at least 2 folds are required, got {k}"
        )));
    }
    let (mut pos, mut neg) = class_indices(y);
    let mut folds = vec![Vec::new(); k];
    for members in [&mut pos, &mut neg] {
        if members.len() < k {
            return Err(FitError::TooFewMembers {
                needed: k,
                have: members.len(),
            });
        }
        members.shuffle(rng);
        for (j, &i) in members.iter().enumerate() {
            folds[j % k].push(i);
        }
    }

    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}
