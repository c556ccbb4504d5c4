//! One-shot model loading with startup checks.

use std::path::Path;
use std::time::Instant;

use renewa_core::ModelError;
use tracing::{error, info};

use crate::diagnostics::StartupReport;
use crate::model::{LoadedModel, ModelBackend};

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Log a [`StartupReport`] before opening the artifact.
    pub diagnostics: bool,
}

/// Open the artifact at `path` with backend `B`.
///
/// - missing file → [`ModelError::Configuration`]
/// - backend failure or vocabulary/output mismatch → [`ModelError::Load`]
pub fn load<B: ModelBackend>(
    path: &Path,
    options: &LoadOptions,
) -> Result<LoadedModel, ModelError> {
    if options.diagnostics {
        StartupReport::for_backend::<B>(path).log();
    }

    if !path.is_file() {
        error!(path = %path.display(), "model artifact is missing");
        return Err(ModelError::missing(path));
    }

    let start = Instant::now();
    let classifier = B::open(path).map_err(|e| {
        error!(path = %path.display(), error = %format!("{e:#}"), "failed to load model artifact");
        ModelError::load(path, e)
    })?;

    let model = LoadedModel::new(classifier, B::NAME).map_err(|e| {
        error!(path = %path.display(), error = %e, "model artifact is inconsistent");
        ModelError::load(path, e)
    })?;

    info!(
        path = %path.display(),
        backend = B::NAME,
        labels = model.vocabulary().len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "loaded model"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageClassifier;
    use anyhow::Context;
    use image::DynamicImage;
    use renewa_core::{LabelVocabulary, ShapeMismatch};
    use std::error::Error as _;
    use std::path::PathBuf;

    /// Test artifact format: `{"labels": [...], "scores": [...], "outputs": n}`.
    struct JsonBackend;

    struct JsonModel {
        vocabulary: LabelVocabulary,
        scores: Vec<f32>,
        outputs: Option<usize>,
    }

    impl ImageClassifier for JsonModel {
        fn vocabulary(&self) -> &LabelVocabulary {
            &self.vocabulary
        }

        fn output_dim(&self) -> Option<usize> {
            self.outputs
        }

        fn infer(&mut self, _image: &DynamicImage) -> anyhow::Result<Vec<f32>> {
            Ok(self.scores.clone())
        }
    }

    impl ModelBackend for JsonBackend {
        const NAME: &'static str = "json";
        type Model = JsonModel;

        fn open(path: &Path) -> anyhow::Result<JsonModel> {
            let text = std::fs::read_to_string(path)?;
            let doc: serde_json::Value =
                serde_json::from_str(&text).context("parsing stub artifact")?;

            let labels: Vec<String> = serde_json::from_value(doc["labels"].clone())
                .context("reading labels")?;
            let scores: Vec<f32> = serde_json::from_value(doc["scores"].clone())
                .context("reading scores")?;
            let outputs = doc["outputs"].as_u64().map(|n| n as usize);

            Ok(JsonModel {
                vocabulary: LabelVocabulary::new(labels)?,
                scores,
                outputs,
            })
        }
    }

    fn write_artifact(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("model.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_valid_artifact() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_artifact(
            &dir,
            r#"{"labels":["solar","wind","hydro"],"scores":[0.7,0.2,0.1],"outputs":3}"#,
        );

        let mut model = load::<JsonBackend>(&path, &LoadOptions::default()).unwrap();
        assert_eq!(model.backend(), "json");
        assert_eq!(model.vocabulary().len(), 3);

        let p = model.predict(&DynamicImage::new_rgb8(2, 2)).unwrap();
        assert_eq!(p.get("solar"), Some(0.7));
        assert_eq!(p.get("wind"), Some(0.2));
        assert_eq!(p.get("hydro"), Some(0.1));
    }

    #[test]
    fn vocabulary_length_equals_output_dim() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_artifact(
            &dir,
            r#"{"labels":["a","b","c","d"],"scores":[0.25,0.25,0.25,0.25],"outputs":4}"#,
        );

        let model = load::<JsonBackend>(&path, &LoadOptions::default()).unwrap();
        assert_eq!(model.vocabulary().len(), 4);
    }

    #[test]
    fn missing_path_is_configuration_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        let err = load::<JsonBackend>(&path, &LoadOptions::default()).unwrap_err();
        match err {
            ModelError::Configuration { path: p } => assert_eq!(p, path),
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn directory_is_configuration_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load::<JsonBackend>(dir.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ModelError::Configuration { .. }), "{err:?}");
    }

    #[test]
    fn missing_path_with_diagnostics_still_configuration_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        let options = LoadOptions { diagnostics: true };
        let err = load::<JsonBackend>(&path, &options).unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn corrupt_file_is_load_error_with_cause() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_artifact(&dir, "\u{0}\u{1}not json at all");

        let err = load::<JsonBackend>(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ModelError::Load { .. }), "{err:?}");
        let cause = err.source().expect("cause should be preserved");
        assert!(
            cause.to_string().contains("parsing stub artifact"),
            "unexpected cause: {cause}"
        );
    }

    #[test]
    fn output_mismatch_is_load_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_artifact(
            &dir,
            r#"{"labels":["solar","wind","hydro"],"scores":[0.5,0.5],"outputs":2}"#,
        );

        let err = load::<JsonBackend>(&path, &LoadOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "load");
        let cause = err.source().unwrap().downcast_ref::<ShapeMismatch>().unwrap();
        assert_eq!(
            *cause,
            ShapeMismatch {
                labels: 3,
                outputs: 2
            }
        );
    }
}
