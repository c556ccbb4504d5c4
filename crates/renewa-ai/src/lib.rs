//! Model loading and inference: backend seam, loader, diagnostics, ONNX Runtime backend.

pub mod diagnostics;
mod loader;
mod model;
pub mod preprocess;
pub mod scores;

pub use diagnostics::StartupReport;
pub use loader::{LoadOptions, load};
pub use model::{ImageClassifier, LoadedModel, ModelBackend};

#[cfg(feature = "onnx")]
pub mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::{OnnxBackend, OnnxClassifier};

pub use image::DynamicImage;
