//! Turning raw model outputs into probabilities.

use renewa_core::InvalidScores;

/// Tolerance when deciding whether scores already sum to one.
pub const SUM_TOLERANCE: f32 = 1e-3;

/// True if every score is in `[0, 1]` and they sum to one within [`SUM_TOLERANCE`].
pub fn is_distribution(scores: &[f32]) -> bool {
    !scores.is_empty() && check_distribution(scores).is_ok()
}

/// Reject scores that are not finite probabilities summing to one.
pub fn check_distribution(scores: &[f32]) -> Result<(), InvalidScores> {
    for (index, &value) in scores.iter().enumerate() {
        if !value.is_finite() {
            return Err(InvalidScores::NonFinite { index, value });
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(InvalidScores::OutOfRange { index, value });
        }
    }
    let total: f32 = scores.iter().sum();
    if !scores.is_empty() && (total - 1.0).abs() > SUM_TOLERANCE {
        return Err(InvalidScores::NotNormalized { total });
    }
    Ok(())
}

/// Numerically stable softmax over finite logits.
pub fn softmax(logits: &[f32]) -> Result<Vec<f32>, InvalidScores> {
    if let Some((index, &value)) = logits.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(InvalidScores::NonFinite { index, value });
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    // The largest logit contributes exp(0) = 1, so the sum is at least 1.
    let sum: f32 = exps.iter().sum();
    Ok(exps.into_iter().map(|e| e / sum).collect())
}

/// Pass probabilities through unchanged; softmax anything else.
pub fn to_probabilities(scores: Vec<f32>) -> Result<Vec<f32>, InvalidScores> {
    if is_distribution(&scores) {
        Ok(scores)
    } else {
        softmax(&scores)
    }
}
