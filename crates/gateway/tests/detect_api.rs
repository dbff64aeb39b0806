use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use gateway::{AppState, DetectionHandler, router};
use image::{DynamicImage, ImageFormat};
use inference::{
    Detection, DetectionResult, DetectorConfig, DetectorState, InferenceEngine, InferenceError,
    ModelManager,
};
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "X-DETECT-TEST-BOUNDARY";

/// Engine with a fixed state and canned answer; counts forward passes.
struct FakeEngine {
    state: DetectorState,
    result: Result<DetectionResult, InferenceError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeEngine {
    fn new(state: DetectorState, result: Result<DetectionResult, InferenceError>) -> Self {
        Self {
            state,
            result,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn ready(detections: DetectionResult) -> Arc<Self> {
        Arc::new(Self::new(DetectorState::Ready, Ok(detections)))
    }

    fn failed() -> Arc<Self> {
        Arc::new(Self::new(DetectorState::Failed, Err(InferenceError::NotReady)))
    }

    fn erroring(err: InferenceError) -> Arc<Self> {
        Arc::new(Self::new(DetectorState::Ready, Err(err)))
    }

    fn slow(delay: Duration) -> Arc<Self> {
        let mut engine = Self::new(DetectorState::Ready, Ok(Vec::new()));
        engine.delay = delay;
        Arc::new(engine)
    }
}

impl InferenceEngine for FakeEngine {
    fn state(&self) -> DetectorState {
        self.state
    }

    fn detect(&self, _image: &DynamicImage) -> Result<DetectionResult, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.result.clone()
    }
}

fn app(engine: Arc<dyn InferenceEngine>) -> Router {
    app_with(engine, Duration::from_secs(30), 1024 * 1024)
}

fn app_with(engine: Arc<dyn InferenceEngine>, timeout: Duration, max_body_bytes: usize) -> Router {
    router(AppState::new(
        DetectionHandler::new(engine),
        timeout,
        max_body_bytes,
    ))
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

fn raw_request(uri: &str, content_type: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

fn multipart_request(field: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.bin\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    raw_request(
        "/detect/",
        &format!("multipart/form-data; boundary={}", BOUNDARY),
        body,
    )
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

#[tokio::test]
async fn test_empty_image_returns_empty_list() {
    let app = app(FakeEngine::ready(Vec::new()));

    let (status, body) = send(
        app,
        raw_request("/detect", "image/jpeg", encode(100, 100, ImageFormat::Jpeg)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "detections": [] }));
}

#[tokio::test]
async fn test_detections_use_wire_schema() {
    let app = app(FakeEngine::ready(vec![Detection {
        bbox: [12.5, 20.0, 80.0, 95.5],
        confidence: 0.75,
        class_id: 0,
        class_name: "person".to_string(),
    }]));

    let (status, body) = send(
        app,
        raw_request("/detect", "image/png", encode(100, 100, ImageFormat::Png)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "detections": [{
                "box": [12.5, 20.0, 80.0, 95.5],
                "confidence": 0.75,
                "class_id": 0,
                "class_name": "person"
            }]
        })
    );
}

#[tokio::test]
async fn test_multipart_upload() {
    let engine = FakeEngine::ready(Vec::new());
    let app = app(engine.clone());

    let (status, body) = send(
        app,
        multipart_request("file", "image/jpeg", &encode(64, 48, ImageFormat::Jpeg)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "detections": [] }));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_multipart_non_image_is_rejected() {
    let engine = FakeEngine::ready(Vec::new());
    let app = app(engine.clone());

    let (status, body) = send(app, multipart_request("file", "text/plain", b"hello")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid file type. Please upload an image.");
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_multipart_without_file_field() {
    let app = app(FakeEngine::ready(Vec::new()));

    let (status, body) = send(
        app,
        multipart_request("image", "image/png", &encode(8, 8, ImageFormat::Png)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_zero_byte_jpeg_is_bad_request() {
    let engine = FakeEngine::ready(Vec::new());
    let app = app(engine.clone());

    let (status, body) = send(app, raw_request("/detect", "image/jpeg", Vec::new())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("Invalid image data"));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_image_content_type_is_bad_request() {
    let app = app(FakeEngine::ready(Vec::new()));

    let (status, body) = send(
        app,
        raw_request("/detect", "application/pdf", encode(10, 10, ImageFormat::Png)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid file type. Please upload an image.");
}

#[tokio::test]
async fn test_failed_model_is_service_unavailable() {
    let engine = FakeEngine::failed();

    for request in [
        raw_request("/detect", "image/png", encode(10, 10, ImageFormat::Png)),
        raw_request("/detect", "text/plain", b"nope".to_vec()),
        raw_request("/detect/", "image/jpeg", Vec::new()),
    ] {
        let (status, body) = send(app(engine.clone()), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body["detail"],
            "Model not loaded or failed to load. Cannot perform detection."
        );
    }

    let (status, body) = get(app(engine.clone()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Human Detection API is running. Model status: Not Loaded"
    );
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_bad_model_path_end_to_end() {
    let model_dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(ModelManager::new());
    manager.initialize(&DetectorConfig::new(
        model_dir.path().join("missing.onnx").to_string_lossy(),
    ));
    assert_eq!(manager.state(), DetectorState::Failed);

    let (status, _) = send(
        app(manager.clone()),
        raw_request("/detect", "image/png", encode(10, 10, ImageFormat::Png)),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = get(app(manager.clone()), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "failed");
    assert_eq!(
        body["reason"].as_str(),
        manager.failure(),
        "health body should carry the load error"
    );
    assert!(body["reason"].as_str().is_some_and(|reason| !reason.is_empty()));
}

#[tokio::test]
async fn test_root_reports_loaded() {
    let (status, body) = get(app(FakeEngine::ready(Vec::new())), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "message": "Human Detection API is running. Model status: Loaded" })
    );
}

#[tokio::test]
async fn test_health_ready() {
    let (status, body) = get(app(FakeEngine::ready(Vec::new())), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ready" }));
}

#[tokio::test]
async fn test_health_uninitialized() {
    let manager: Arc<dyn InferenceEngine> = Arc::new(ModelManager::new());

    let (status, body) = get(app(manager), "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "status": "uninitialized" }));
}

#[tokio::test]
async fn test_inference_error_is_internal_error() {
    let app = app(FakeEngine::erroring(InferenceError::Runtime(
        "output0 missing".to_string(),
    )));

    let (status, body) = send(
        app,
        raw_request("/detect", "image/png", encode(10, 10, ImageFormat::Png)),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "detail": "Error processing image: Inference failed: output0 missing" })
    );
}

#[tokio::test]
async fn test_slow_engine_times_out() {
    let app = app_with(
        FakeEngine::slow(Duration::from_millis(500)),
        Duration::from_millis(20),
        1024 * 1024,
    );

    let (status, body) = send(
        app,
        raw_request("/detect", "image/png", encode(10, 10, ImageFormat::Png)),
    )
    .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["detail"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let engine = FakeEngine::ready(Vec::new());
    let app = app_with(engine.clone(), Duration::from_secs(30), 1024);

    let (status, body) = send(app, raw_request("/detect", "image/png", vec![0u8; 4096])).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["detail"], "Request body exceeds the 1024 byte limit");
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_identical_requests_identical_responses() {
    let engine = FakeEngine::ready(vec![Detection {
        bbox: [1.0, 2.0, 3.0, 4.0],
        confidence: 0.5,
        class_id: 2,
        class_name: "car".to_string(),
    }]);
    let image = encode(32, 32, ImageFormat::Png);

    let first = send(app(engine.clone()), raw_request("/detect", "image/png", image.clone())).await;
    let second = send(app(engine.clone()), raw_request("/detect", "image/png", image)).await;

    assert_eq!(first, second);
}
