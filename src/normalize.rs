// src/normalize.rs

use crate::error::{FocusError, Result};

/// Integer counts widened to `f64`.
pub fn counts_to_f64(counts: &[u64]) -> Vec<f64> {
    counts.iter().map(|&c| c as f64).collect()
}

/// Divide every element by the vector total so the result sums to 1.
///
/// An empty or all-zero vector has no probability interpretation and is
/// rejected with `InvalidInput` instead of producing NaNs.
pub fn normalize(counts: &[f64], context: &str) -> Result<Vec<f64>> {
    let total: f64 = counts.iter().sum();
    if counts.is_empty() || total <= 0.0 || !total.is_finite() {
        return Err(FocusError::invalid_input(
            context,
            format!("cannot normalize a vector of {} entries summing to {}", counts.len(), total),
        ));
    }
    Ok(counts.iter().map(|&c| c / total).collect())
}
