//! Ordered label vocabulary shipped with a classifier artifact.
//!
//! The position of each label defines which model output score it owns:
//! the label at index `i` maps to score `i`. A vocabulary is non-empty and
//! its labels are unique, so a prediction keyed by label never collapses
//! two scores into one entry.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("label vocabulary is empty")]
    Empty,

    #[error("label at index {0} is blank")]
    Blank(usize),

    #[error("duplicate label {label:?} at index {index}")]
    Duplicate { label: String, index: usize },

    #[error("label vocabulary is not a JSON array of strings: {0}")]
    Json(String),
}

/// Ordered, non-empty sequence of unique class names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    /// Build a vocabulary, rejecting empty lists, blank labels and duplicates.
    ///
    /// Labels are trimmed; order is preserved.
    pub fn new<I, S>(labels: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|s| s.into().trim().to_string())
            .collect();

        if labels.is_empty() {
            return Err(VocabularyError::Empty);
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for (index, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(VocabularyError::Blank(index));
            }
            if !seen.insert(label.as_str()) {
                return Err(VocabularyError::Duplicate {
                    label: label.clone(),
                    index,
                });
            }
        }

        Ok(Self { labels })
    }

    /// Parse a JSON array of strings, e.g. `["solar","wind","hydro"]`.
    pub fn from_json(source: &str) -> Result<Self, VocabularyError> {
        let labels: Vec<String> =
            serde_json::from_str(source).map_err(|e| VocabularyError::Json(e.to_string()))?;
        Self::new(labels)
    }

    /// Parse one label per line. Blank lines and `#` comments are skipped.
    pub fn from_lines(source: &str) -> Result<Self, VocabularyError> {
        Self::new(
            source
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false: construction rejects empty vocabularies.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Position of `label` in the vocabulary.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

impl<'a> IntoIterator for &'a LabelVocabulary {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}
