use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use mealscan_core::ScanResult;
use mealscan_vision::{
    write_result, FoodDetector, FoodRecognizer, ImageUpload, PipelineError, ReceiptReader, ScanPipeline,
};

/// Multipart field carrying the photo.
pub const IMAGE_FIELD: &str = "food_image";

/// Anything that can turn an uploaded image into a [`ScanResult`].
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self, upload: ImageUpload) -> Result<ScanResult, PipelineError>;
}

#[async_trait]
impl<R, F, D> Scanner for ScanPipeline<R, F, D>
where
    R: ReceiptReader,
    F: FoodRecognizer,
    D: FoodDetector,
{
    async fn scan(&self, upload: ImageUpload) -> Result<ScanResult, PipelineError> {
        self.scan_bytes(upload).await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub scanner: Arc<dyn Scanner>,
    /// When set, every result is also saved here.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("multipart field `{IMAGE_FIELD}` is required")]
    MissingImage,
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
    #[error("{0}")]
    Scan(#[from] PipelineError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingImage => StatusCode::BAD_REQUEST,
            // 413 when the body limit cut the upload short, 400 otherwise.
            ApiError::Multipart(e) => e.status(),
            ApiError::Scan(PipelineError::Io(_) | PipelineError::Serialize(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Scan(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

async fn predict(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<ScanResult>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.jpg").to_string();
        let bytes = field.bytes().await?;
        upload = Some(ImageUpload::new(file_name, bytes.to_vec()));
        break;
    }
    let upload = upload.ok_or(ApiError::MissingImage)?;

    info!(file = %upload.file_name, bytes = upload.bytes.len(), "Scanning uploaded image");
    let result = state.scanner.scan(upload).await.map_err(|e| {
        error!(error = %e, "Scan failed");
        ApiError::from(e)
    })?;

    if let Some(path) = &state.output {
        // The response is still returned when saving fails.
        if let Err(e) = write_result(&result, Some(path)).await {
            error!(path = %path.display(), error = %e, "Failed to save result");
        }
    }
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use mealscan_core::{Detection, Detections, OcrResponse};
    use mealscan_vision::{MockDetector, MockReader, MockRecognizer, ScanOptions};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "mealscan-test-boundary";

    fn app(reader: MockReader, output: Option<PathBuf>) -> Router {
        app_with_limit(reader, output, 1024 * 1024)
    }

    fn app_with_limit(reader: MockReader, output: Option<PathBuf>, max_upload_bytes: usize) -> Router {
        let pipeline = ScanPipeline::new(
            reader,
            MockRecognizer::failing(),
            MockDetector::new(Detections(vec![Detection::named("비빔밥")])),
            ScanOptions::default(),
        );
        router(AppState { scanner: Arc::new(pipeline), output }, max_upload_bytes)
    }

    fn not_a_receipt() -> MockReader {
        MockReader::new(serde_json::from_value(json!({ "images": [{ "inferResult": "ERROR" }] })).unwrap())
    }

    fn multipart_request(field: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"meal.jpg\"\r\n").as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/predict")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app(not_a_receipt(), None)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn predict_returns_aggregated_result() {
        let response = app(not_a_receipt(), None)
            .oneshot(multipart_request(IMAGE_FIELD, b"not really a jpeg"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "inferResult": 1, "predict": { "foodNames": ["비빔밥"], "ktFoodsInfo": {} } })
        );
    }

    #[tokio::test]
    async fn predict_without_image_field_is_bad_request() {
        let response = app(not_a_receipt(), None)
            .oneshot(multipart_request("photo", b"abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].as_str().unwrap().contains(IMAGE_FIELD));
    }

    #[tokio::test]
    async fn ocr_failure_is_bad_gateway() {
        let response = app(MockReader::failing(), None)
            .oneshot(multipart_request(IMAGE_FIELD, b"abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(json_body(response).await["error"].as_str().unwrap().starts_with("OCR failed"));
    }

    #[tokio::test]
    async fn result_is_saved_when_output_configured() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results").join("result.json");
        let receipt: OcrResponse = serde_json::from_value(json!({
            "images": [{ "inferResult": "SUCCESS", "receipt": { "result": { "subResults": [
                { "items": [ { "name": { "text": "Coffee" } } ] }
            ] } } }]
        }))
        .unwrap();

        let response = app(MockReader::new(receipt), Some(out.clone()))
            .oneshot(multipart_request(IMAGE_FIELD, b"abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(saved["predict"]["foodNames"], json!(["Coffee"]));
    }

    #[tokio::test]
    async fn oversized_streamed_upload_is_payload_too_large() {
        let response = app_with_limit(not_a_receipt(), None, 1024)
            .oneshot(multipart_request(IMAGE_FIELD, &[7u8; 4096]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn oversized_declared_upload_is_payload_too_large() {
        let mut request = multipart_request(IMAGE_FIELD, &[7u8; 4096]);
        request.headers_mut().insert("content-length", "4200".parse().unwrap());
        let response = app_with_limit(not_a_receipt(), None, 1024).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn upload_within_limit_is_accepted() {
        let response = app_with_limit(not_a_receipt(), None, 8192)
            .oneshot(multipart_request(IMAGE_FIELD, &[7u8; 4096]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
