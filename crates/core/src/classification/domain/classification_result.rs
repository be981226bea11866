use serde::{Deserialize, Serialize};

/// Predicted label and its softmax probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub confidence: f32,
}

/// Arg-max index of `logits` and its softmax probability. `None` for an
/// empty or non-finite output.
pub fn softmax_argmax(logits: &[f32]) -> Option<(usize, f32)> {
    if logits.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let (best, &max) = logits.iter().enumerate().max_by(|a, b| a.1.total_cmp(b.1))?;
    let denom: f32 = logits.iter().map(|&v| (v - max).exp()).sum();
    Some((best, 1.0 / denom))
}
