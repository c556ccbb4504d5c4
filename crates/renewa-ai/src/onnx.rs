//! ONNX Runtime backend for exported image classifiers.
//!
//! The artifact is a single `.onnx` file. Its label vocabulary is read from
//! the model's custom metadata key `labels` (a JSON array of strings), or,
//! when the exporter did not embed one, from a `labels.txt` file next to the
//! artifact with one label per line.

use std::path::Path;

use anyhow::Context;
use image::DynamicImage;
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use renewa_core::LabelVocabulary;
use tracing::{debug, info};

use crate::model::{ImageClassifier, ModelBackend};
use crate::preprocess::{self, InputGeometry};
use crate::scores;

/// Metadata key holding the JSON label array.
pub const LABELS_METADATA_KEY: &str = "labels";
/// Sidecar vocabulary file consulted when the metadata key is absent.
pub const LABELS_SIDECAR: &str = "labels.txt";

pub struct OnnxBackend;

impl ModelBackend for OnnxBackend {
    const NAME: &'static str = "onnx";
    type Model = OnnxClassifier;

    fn runtime() -> Option<String> {
        Some(format!("ONNX Runtime, C API v{}", ort::sys::ORT_API_VERSION))
    }

    fn open(path: &Path) -> anyhow::Result<OnnxClassifier> {
        OnnxClassifier::load(path)
    }
}

/// Image classifier backed by an ONNX Runtime session.
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
    geometry: InputGeometry,
    output_dim: Option<usize>,
    vocabulary: LabelVocabulary,
}

impl OnnxClassifier {
    /// Load an exported classifier and its label vocabulary.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let session = Session::builder()?
            .commit_from_file(path)
            .with_context(|| format!("creating ONNX session from {}", path.display()))?;

        let input = session
            .inputs()
            .first()
            .context("model declares no inputs")?;
        let input_name = input.name().to_string();
        let geometry = infer_geometry(input.dtype()).unwrap_or_default();

        let output_dim = session
            .outputs()
            .first()
            .and_then(|output| infer_dim(output.dtype()));

        let embedded = session
            .metadata()
            .map(|m| m.custom(LABELS_METADATA_KEY))
            .context("reading model metadata")?;
        let vocabulary = match embedded {
            Some(json) => {
                debug!("using label vocabulary from model metadata");
                LabelVocabulary::from_json(&json).context("parsing embedded label vocabulary")?
            }
            None => read_sidecar(path)?,
        };

        info!(
            input = %input_name,
            width = geometry.width,
            height = geometry.height,
            outputs = ?output_dim,
            labels = vocabulary.len(),
            "opened ONNX classifier"
        );

        Ok(Self {
            session,
            input_name,
            geometry,
            output_dim,
            vocabulary,
        })
    }

    pub fn geometry(&self) -> InputGeometry {
        self.geometry
    }
}

impl ImageClassifier for OnnxClassifier {
    fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    fn output_dim(&self) -> Option<usize> {
        self.output_dim
    }

    fn infer(&mut self, image: &DynamicImage) -> anyhow::Result<Vec<f32>> {
        let data = preprocess::to_chw(image, self.geometry);
        let tensor = Tensor::from_array((self.geometry.shape(), data.into_boxed_slice()))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])?;
        let (_, raw) = outputs[0].try_extract_tensor::<f32>()?;

        Ok(scores::to_probabilities(raw.to_vec())?)
    }
}

fn read_sidecar(artifact: &Path) -> anyhow::Result<LabelVocabulary> {
    let sidecar = artifact
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(LABELS_SIDECAR);
    let text = std::fs::read_to_string(&sidecar).with_context(|| {
        format!(
            "model has no `{LABELS_METADATA_KEY}` metadata and {} is unreadable",
            sidecar.display()
        )
    })?;
    debug!(path = %sidecar.display(), "using label vocabulary from sidecar file");
    LabelVocabulary::from_lines(&text).with_context(|| format!("parsing {}", sidecar.display()))
}

/// Class count from the last static dimension of the output shape.
fn infer_dim(output_type: &ValueType) -> Option<usize> {
    match output_type {
        ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

/// Spatial size from an NCHW input shape; dynamic dimensions yield `None`.
fn infer_geometry(input_type: &ValueType) -> Option<InputGeometry> {
    match input_type {
        ValueType::Tensor { shape, .. } => geometry_from_dims(shape),
        _ => None,
    }
}

fn geometry_from_dims(dims: &[i64]) -> Option<InputGeometry> {
    match dims {
        [_, 3, h, w] if *h > 0 && *w > 0 => Some(InputGeometry {
            width: *w as u32,
            height: *h as u32,
        }),
        _ => None,
    }
}
