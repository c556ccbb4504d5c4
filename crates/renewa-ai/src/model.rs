//! Backend seam and the loaded-model context.
//!
//! A backend knows how to open one kind of artifact. The classifier it
//! returns is an opaque `image -> scores` capability plus the label
//! vocabulary that came with the artifact. [`LoadedModel`] pairs the two for
//! the lifetime of the process and turns raw scores into a [`Prediction`].

use std::path::Path;

use image::DynamicImage;
use renewa_core::{LabelVocabulary, ModelError, Prediction, ShapeMismatch};
use tracing::{debug, error};

use crate::scores;

/// A trained classifier able to score one image.
pub trait ImageClassifier: Send {
    /// Labels in output order.
    fn vocabulary(&self) -> &LabelVocabulary;

    /// Length of the score vector, when the backend can tell without running.
    fn output_dim(&self) -> Option<usize> {
        None
    }

    /// Run the forward pass. Preprocessing is the classifier's concern.
    fn infer(&mut self, image: &DynamicImage) -> anyhow::Result<Vec<f32>>;
}

/// Opens artifacts of one serialization format.
pub trait ModelBackend {
    /// Short name used in logs and the health endpoint.
    const NAME: &'static str;

    type Model: ImageClassifier + 'static;

    /// Inference runtime and its version, reported in startup diagnostics.
    fn runtime() -> Option<String> {
        None
    }

    fn open(path: &Path) -> anyhow::Result<Self::Model>;
}

/// Loaded classifier plus its cached vocabulary.
pub struct LoadedModel {
    classifier: Box<dyn ImageClassifier>,
    vocabulary: LabelVocabulary,
    backend: &'static str,
}

impl LoadedModel {
    /// Wrap a classifier, checking its declared output size against its vocabulary.
    pub fn new(
        classifier: impl ImageClassifier + 'static,
        backend: &'static str,
    ) -> Result<Self, ShapeMismatch> {
        let vocabulary = classifier.vocabulary().clone();
        if let Some(outputs) = classifier.output_dim()
            && outputs != vocabulary.len()
        {
            return Err(ShapeMismatch {
                labels: vocabulary.len(),
                outputs,
            });
        }

        Ok(Self {
            classifier: Box::new(classifier),
            vocabulary,
            backend,
        })
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Score `image` and map each vocabulary label to its probability.
    ///
    /// Scores must already be probabilities: finite, in `[0, 1]` and summing
    /// to one. Failures are logged and returned as [`ModelError::Prediction`].
    pub fn predict(&mut self, image: &DynamicImage) -> Result<Prediction, ModelError> {
        let scores = self.classifier.infer(image).map_err(|e| {
            error!(error = %format!("{e:#}"), "prediction failed");
            ModelError::prediction(e)
        })?;

        let prediction = Prediction::from_scores(&self.vocabulary, &scores).map_err(|e| {
            error!(error = %e, "prediction failed");
            ModelError::prediction(e)
        })?;
        scores::check_distribution(&scores).map_err(|e| {
            error!(error = %e, "model produced invalid scores");
            ModelError::prediction(e)
        })?;

        if let Some((label, p)) = prediction.best() {
            debug!(label, probability = p, "predicted");
        }
        Ok(prediction)
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("backend", &self.backend)
            .field("vocabulary", &self.vocabulary)
            .finish_non_exhaustive()
    }
}
