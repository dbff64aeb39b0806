use crate::{
    error::{DetectError, InvalidInput},
    handler::DetectionRequest,
    state::AppState,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State, multipart::MultipartError},
    http::{StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::{get, post},
};
use inference::DetectorState;
use schema::{DetectionResponse, HealthResponse, StatusResponse};
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Multipart form field carrying the image.
const UPLOAD_FIELD: &str = "file";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/detect", post(detect_handler))
        .route("/detect/", post(detect_handler))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = if state.handler.engine().is_ready() {
        "Loaded"
    } else {
        "Not Loaded"
    };

    Json(StatusResponse {
        message: format!("Human Detection API is running. Model status: {}", status),
    })
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.handler.engine();
    let detector_state = engine.state();
    let status = match detector_state {
        DetectorState::Ready => StatusCode::OK,
        DetectorState::Uninitialized | DetectorState::Failed => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        status,
        Json(HealthResponse {
            status: detector_state.as_str().to_string(),
            reason: engine.failure().map(str::to_string),
        }),
    )
}

async fn detect_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<DetectionResponse>, DetectError> {
    let result = run_detection(&state, request).await;

    state.metrics.record_outcome(match &result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    });

    result.map(Json)
}

#[tracing::instrument(skip_all)]
async fn run_detection(state: &AppState, request: Request) -> Result<DetectionResponse, DetectError> {
    // Reject before reading the body
    state.handler.ensure_ready()?;

    let upload = read_upload(request, state.max_body_bytes).await?;
    tracing::debug!(
        bytes = upload.bytes.len(),
        content_type = upload.content_type.as_deref().unwrap_or(""),
        "Upload received"
    );

    let handler = state.handler.clone();
    let start = Instant::now();
    let task = tokio::task::spawn_blocking(move || handler.handle(&upload));

    let response = match tokio::time::timeout(state.request_timeout, task).await {
        Err(_) => return Err(DetectError::Timeout(state.request_timeout)),
        Ok(Err(join_error)) => {
            return Err(DetectError::InferenceFailure(format!(
                "Detection task failed: {}",
                join_error
            )));
        }
        Ok(Ok(result)) => result?,
    };

    let elapsed = start.elapsed();
    state.metrics.record_inference(elapsed, response.detections.len());
    tracing::info!(
        detections = response.detections.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Detection complete"
    );

    Ok(response)
}

/// Extract the image from either a raw body or a multipart form's `file` field.
async fn read_upload(request: Request, limit: usize) -> Result<DetectionRequest, DetectError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let is_multipart = content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));

    if !is_multipart {
        let bytes = Bytes::from_request(request, &()).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                InvalidInput::PayloadTooLarge(limit)
            } else {
                InvalidInput::MalformedUpload(rejection.body_text())
            }
        })?;

        return Ok(DetectionRequest {
            bytes,
            content_type,
        });
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| InvalidInput::MalformedUpload(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        return Ok(DetectionRequest {
            bytes,
            content_type,
        });
    }

    Err(InvalidInput::MalformedUpload(format!("missing `{}` field", UPLOAD_FIELD)).into())
}

fn multipart_error(err: MultipartError, limit: usize) -> InvalidInput {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        InvalidInput::PayloadTooLarge(limit)
    } else {
        InvalidInput::MalformedUpload(err.body_text())
    }
}
