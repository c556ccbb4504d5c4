//! Error taxonomy shared by the loader, the inference handler and the shells.
//!
//! Every variant's message carries the remediation a user should try, so the
//! shells can print or render `to_string()` as-is.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by [`ModelError::Load`] and [`ModelError::Prediction`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

const MISSING_HINT: &str = "Export the trained model and place it beside the application";
const LOAD_HINT: &str = "Re-export the trained model and download it again";
const PREDICT_HINT: &str = "Check that the upload is a readable image and try again";

/// Number of labels and number of model outputs disagree.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("label vocabulary has {labels} entries but the model produces {outputs} scores")]
pub struct ShapeMismatch {
    pub labels: usize,
    pub outputs: usize,
}

/// Model outputs that cannot be reported as a probability distribution.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum InvalidScores {
    #[error("score at index {index} is {value}, not a finite number")]
    NonFinite { index: usize, value: f32 },

    #[error("score at index {index} is {value}, outside [0, 1]")]
    OutOfRange { index: usize, value: f32 },

    #[error("scores sum to {total}, not 1")]
    NotNormalized { total: f32 },
}

#[derive(Debug, Error)]
pub enum ModelError {
    /// The artifact is absent: a setup problem on the operator's side.
    #[error("model artifact is missing at {}. {}", .path.display(), MISSING_HINT)]
    Configuration { path: PathBuf },

    /// The artifact exists but cannot be deserialized or is inconsistent.
    #[error("model artifact at {} could not be loaded. {}", .path.display(), LOAD_HINT)]
    Load {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A single inference call failed. Local to the request that caused it.
    #[error("prediction failed: {}. {}", .source, PREDICT_HINT)]
    Prediction {
        #[source]
        source: BoxError,
    },
}

impl ModelError {
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Configuration { path: path.into() }
    }

    pub fn load(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Load {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn prediction(source: impl Into<BoxError>) -> Self {
        Self::Prediction {
            source: source.into(),
        }
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Load { .. } => "load",
            Self::Prediction { .. } => "prediction",
        }
    }

    /// Remediation sentence for the variant.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => MISSING_HINT,
            Self::Load { .. } => LOAD_HINT,
            Self::Prediction { .. } => PREDICT_HINT,
        }
    }
}
