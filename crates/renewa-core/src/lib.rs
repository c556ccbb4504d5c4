pub mod error;
pub mod labels;
pub mod prediction;

pub use error::{BoxError, InvalidScores, ModelError, ShapeMismatch};
pub use labels::{LabelVocabulary, VocabularyError};
pub use prediction::Prediction;
