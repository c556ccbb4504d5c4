//! Process-wide context handed to every request.

use std::sync::{Arc, Mutex};

use renewa_ai::LoadedModel;
use renewa_core::{ModelError, Prediction};
use tracing::warn;

use crate::config::ServeConfig;

pub type SharedState = Arc<AppState>;

/// Loaded model plus web settings.
///
/// Inference needs exclusive access to the model, so requests are serialized
/// on the mutex.
pub struct AppState {
    model: Mutex<LoadedModel>,
    pub config: ServeConfig,
    pub label_count: usize,
    pub backend: &'static str,
}

impl AppState {
    pub fn new(model: LoadedModel, config: ServeConfig) -> Self {
        let label_count = model.vocabulary().len();
        let backend = model.backend();
        Self {
            model: Mutex::new(model),
            config,
            label_count,
            backend,
        }
    }

    /// Decode and score an uploaded image on a blocking thread.
    pub async fn predict(self: &Arc<Self>, upload: Vec<u8>) -> Result<Prediction, ModelError> {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || state.predict_blocking(&upload))
            .await
            .map_err(ModelError::prediction)?
    }

    pub fn predict_blocking(&self, upload: &[u8]) -> Result<Prediction, ModelError> {
        let image = image::load_from_memory(upload).map_err(|e| {
            warn!(error = %e, bytes = upload.len(), "could not decode upload");
            ModelError::prediction(e)
        })?;

        // A panic during inference leaves the loaded model intact.
        let mut model = self.model.lock().unwrap_or_else(|poisoned| {
            warn!("model lock was poisoned by an earlier panic");
            poisoned.into_inner()
        });
        model.predict(&image)
    }
}
