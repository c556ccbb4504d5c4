//! Per-request prediction result: one probability per vocabulary label.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ShapeMismatch;
use crate::labels::LabelVocabulary;

/// Label → probability mapping in vocabulary order.
///
/// Serializes as a JSON object whose keys appear in vocabulary order.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    entries: Vec<(String, f32)>,
}

impl Prediction {
    /// Zip `vocabulary` with `scores` by position.
    pub fn from_scores(
        vocabulary: &LabelVocabulary,
        scores: &[f32],
    ) -> Result<Self, ShapeMismatch> {
        if vocabulary.len() != scores.len() {
            return Err(ShapeMismatch {
                labels: vocabulary.len(),
                outputs: scores.len(),
            });
        }

        let entries = vocabulary
            .iter()
            .zip(scores)
            .map(|(label, &p)| (label.to_string(), p))
            .collect();
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Probability for `label`, if it is in the vocabulary.
    pub fn get(&self, label: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|&(_, p)| p)
    }

    /// Entries in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(l, p)| (l.as_str(), *p))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    /// Entries sorted by descending probability. Ties keep vocabulary order.
    pub fn ranked(&self) -> Vec<(&str, f32)> {
        let mut ranked: Vec<(&str, f32)> = self.iter().collect();
        // Stable sort, so equal scores stay in vocabulary order.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    /// The `k` most probable entries; `k == 0` returns all of them.
    pub fn top(&self, k: usize) -> Vec<(&str, f32)> {
        let mut ranked = self.ranked();
        if k > 0 {
            ranked.truncate(k);
        }
        ranked
    }

    /// Most probable label.
    pub fn best(&self) -> Option<(&str, f32)> {
        self.ranked().into_iter().next()
    }

    /// Sum of all probabilities (≈ 1.0 for a well-formed prediction).
    pub fn total(&self) -> f32 {
        self.entries.iter().map(|(_, p)| p).sum()
    }
}

impl Serialize for Prediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, p) in &self.entries {
            map.serialize_entry(label, p)?;
        }
        map.end()
    }
}
