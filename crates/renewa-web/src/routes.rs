//! Request handlers.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use renewa_core::Prediction;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::render::{self, Outcome};
use crate::state::SharedState;

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub struct Confidence {
    pub label: String,
    pub probability: f32,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    /// Most probable label.
    pub label: String,
    /// Ranked, truncated to the configured top-k.
    pub confidences: Vec<Confidence>,
    /// Full label → probability mapping in vocabulary order.
    pub probabilities: Prediction,
}

impl PredictionResponse {
    fn new(prediction: Prediction, top_k: usize) -> Self {
        let label = prediction
            .best()
            .map(|(l, _)| l.to_string())
            .unwrap_or_default();
        let confidences = prediction
            .top(top_k)
            .into_iter()
            .map(|(label, probability)| Confidence {
                label: label.to_string(),
                probability,
            })
            .collect();
        Self {
            label,
            confidences,
            probabilities: prediction,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub labels: usize,
    pub backend: &'static str,
}

/// GET / - empty upload form
pub async fn index(State(state): State<SharedState>) -> Html<String> {
    Html(render::page(&state.config, Outcome::Empty))
}

/// POST /predict - form submission, answered with the rendered page
pub async fn predict_form(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> (StatusCode, Html<String>) {
    match run_prediction(&state, multipart).await {
        Ok(prediction) => (
            StatusCode::OK,
            Html(render::page(&state.config, Outcome::Predicted(&prediction))),
        ),
        Err(e) => {
            let message = e.to_string();
            (
                e.status(),
                Html(render::page(&state.config, Outcome::Failed(&message))),
            )
        }
    }
}

/// POST /api/predict - same input, JSON answer
pub async fn predict_json(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    let prediction = run_prediction(&state, multipart).await?;
    Ok(Json(PredictionResponse::new(prediction, state.config.top_k)))
}

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        labels: state.label_count,
        backend: state.backend,
    })
}

async fn run_prediction(
    state: &SharedState,
    multipart: Multipart,
) -> Result<Prediction, ApiError> {
    let upload = read_image_field(multipart).await.inspect_err(|e| {
        warn!(error = %e, "rejected upload");
    })?;

    let bytes = upload.len();
    let prediction = state.predict(upload).await?;
    if let Some((label, p)) = prediction.best() {
        info!(bytes, label, probability = p, "prediction served");
    }
    Ok(prediction)
}

async fn read_image_field(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await?;
            // A browser submits an empty part when no file was chosen.
            if bytes.is_empty() {
                return Err(ApiError::MissingImage);
            }
            return Ok(bytes.to_vec());
        }
    }
    Err(ApiError::MissingImage)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use image::{DynamicImage, ImageFormat};
    use renewa_ai::{ImageClassifier, LoadedModel};
    use renewa_core::LabelVocabulary;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ServeConfig;
    use crate::state::AppState;

    const BOUNDARY: &str = "renewa-test-boundary";

    struct FixedScores {
        vocabulary: LabelVocabulary,
        scores: Vec<f32>,
    }

    impl ImageClassifier for FixedScores {
        fn vocabulary(&self) -> &LabelVocabulary {
            &self.vocabulary
        }

        fn infer(&mut self, _image: &DynamicImage) -> anyhow::Result<Vec<f32>> {
            Ok(self.scores.clone())
        }
    }

    /// Panics on the first call while holding the model lock, then scores normally.
    struct PanicsOnce {
        vocabulary: LabelVocabulary,
        panicked: bool,
    }

    impl ImageClassifier for PanicsOnce {
        fn vocabulary(&self) -> &LabelVocabulary {
            &self.vocabulary
        }

        fn infer(&mut self, _image: &DynamicImage) -> anyhow::Result<Vec<f32>> {
            if !self.panicked {
                self.panicked = true;
                panic!("inference kernel crashed");
            }
            Ok(vec![0.25, 0.75])
        }
    }

    fn app_for(classifier: impl ImageClassifier + 'static, config: ServeConfig) -> axum::Router {
        let model = LoadedModel::new(classifier, "fixed").unwrap();
        crate::router(Arc::new(AppState::new(model, config)))
    }

    fn app_with(labels: &[&str], scores: &[f32], config: ServeConfig) -> axum::Router {
        let stub = FixedScores {
            vocabulary: LabelVocabulary::new(labels.iter().copied()).unwrap(),
            scores: scores.to_vec(),
        };
        app_for(stub, config)
    }

    fn app() -> axum::Router {
        app_with(
            &["solar", "wind", "hydro"],
            &[0.7, 0.2, 0.1],
            ServeConfig::default(),
        )
    }

    fn png() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(16, 16)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn multipart(uri: &str, field: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    #[tokio::test]
    async fn index_serves_form() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("<form action=\"/predict\""));
    }

    #[tokio::test]
    async fn api_returns_full_mapping() {
        let response = app()
            .oneshot(multipart("/api/predict", IMAGE_FIELD, &png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["label"], "solar");
        let probs = json["probabilities"].as_object().unwrap();
        assert_eq!(probs.len(), 3);
        for (label, expected) in [("solar", 0.7), ("wind", 0.2), ("hydro", 0.1)] {
            let got = probs[label].as_f64().unwrap();
            assert!((got - expected).abs() < 1e-6, "{label}: {got}");
        }
    }

    #[tokio::test]
    async fn api_confidences_respect_top_k() {
        let app = app_with(
            &["solar", "wind", "hydro", "geothermal"],
            &[0.1, 0.5, 0.3, 0.1],
            ServeConfig::default(),
        );
        let response = app
            .oneshot(multipart("/api/predict", IMAGE_FIELD, &png()))
            .await
            .unwrap();

        let json = body_json(response).await;
        let ranked: Vec<&str> = json["confidences"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["label"].as_str().unwrap())
            .collect();
        assert_eq!(ranked, vec!["wind", "hydro", "solar"]);
        assert_eq!(json["probabilities"].as_object().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn form_renders_ranked_result() {
        let response = app()
            .oneshot(multipart("/predict", IMAGE_FIELD, &png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert!(html.contains("<div class=\"best\">solar</div>"));
        assert!(html.contains("70.0%"));
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let response = app()
            .oneshot(multipart("/api/predict", "file", &png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["kind"], "upload");
    }

    #[tokio::test]
    async fn empty_upload_is_bad_request() {
        let response = app()
            .oneshot(multipart("/predict", IMAGE_FIELD, &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("no image was uploaded"));
    }

    #[tokio::test]
    async fn undecodable_image_is_prediction_error() {
        let response = app()
            .oneshot(multipart("/api/predict", IMAGE_FIELD, b"not an image"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["kind"], "prediction");
        assert!(json["error"].as_str().unwrap().contains("try again"));
    }

    #[tokio::test]
    async fn failed_request_does_not_affect_next() {
        let app = app();

        let bad = app
            .clone()
            .oneshot(multipart("/api/predict", IMAGE_FIELD, b"garbage"))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let good = app
            .oneshot(multipart("/api/predict", IMAGE_FIELD, &png()))
            .await
            .unwrap();
        assert_eq!(good.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn panic_during_inference_fails_only_that_request() {
        let stub = PanicsOnce {
            vocabulary: LabelVocabulary::new(["solar", "wind"]).unwrap(),
            panicked: false,
        };
        let app = app_for(stub, ServeConfig::default());

        let crashed = app
            .clone()
            .oneshot(multipart("/api/predict", IMAGE_FIELD, &png()))
            .await
            .unwrap();
        assert_eq!(crashed.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(crashed).await["kind"], "prediction");

        // The lock is poisoned now; the next request still gets the model.
        let next = app
            .oneshot(multipart("/api/predict", IMAGE_FIELD, &png()))
            .await
            .unwrap();
        assert_eq!(next.status(), StatusCode::OK);
        let json = body_json(next).await;
        assert_eq!(json["label"], "wind");
    }

    #[tokio::test]
    async fn health_reports_model() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["labels"], 3);
        assert_eq!(json["backend"], "fixed");
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let config = ServeConfig {
            max_upload_bytes: 64,
            ..ServeConfig::default()
        };
        let app = app_with(&["solar", "wind"], &[0.5, 0.5], config);
        let response = app
            .oneshot(multipart("/api/predict", IMAGE_FIELD, &png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
