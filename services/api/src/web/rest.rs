//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::{str::FromStr, sync::Arc};
use tracing::{error, info, warn};
use tutorial_core::{EncodingError, Lesson, LessonId, PipelineError, RawImage};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_lesson_handler,
        list_lessons_handler,
        get_lesson_handler,
        health_handler,
    ),
    components(
        schemas(LessonResponse, HealthResponse)
    ),
    tags(
        (name = "Screenshot Tutorials API", description = "Turn app screenshots into step-by-step lessons.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A lesson as returned to the client.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonResponse {
    id: String,
    title: String,
    description: String,
    steps: Vec<String>,
    /// Display date, e.g. "June 15".
    created_at: String,
    /// A data URL of the original screenshot, or a remote image URL.
    thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_url: Option<String>,
}

impl From<Lesson> for LessonResponse {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id.to_string(),
            title: lesson.title,
            description: lesson.description,
            steps: lesson.steps,
            created_at: lesson.created_at,
            thumbnail_url: lesson.thumbnail_url,
            video_url: lesson.video_url.map(String::from),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate a lesson from an uploaded screenshot.
///
/// Accepts a multipart/form-data request. The `image` part is used if present,
/// otherwise the first part carrying a file. The request completes once the
/// lesson has been saved, which may take a few minutes while the video renders.
#[utoipa::path(
    post,
    path = "/lessons",
    request_body(content_type = "multipart/form-data", description = "The screenshot to turn into a lesson."),
    responses(
        (status = 201, description = "Lesson created", body = LessonResponse),
        (status = 400, description = "Missing or unreadable screenshot"),
        (status = 413, description = "Screenshot is too large"),
        (status = 500, description = "The lesson could not be saved")
    )
)]
pub async fn create_lesson_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), format!("Failed to read multipart data: {}", e)))?
    {
        let is_image = field.name() == Some("image");
        if !is_image && field.file_name().is_none() {
            continue;
        }
        upload = Some(read_image_field(field).await?);
        if is_image {
            break;
        }
    }

    let raw = upload.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Multipart form must include an image".to_string(),
        )
    })?;

    match app_state.pipeline.run(raw).await {
        Ok(lesson) => Ok((StatusCode::CREATED, Json(LessonResponse::from(lesson)))),
        Err(e) => Err(pipeline_error_response(e)),
    }
}

async fn read_image_field(field: Field<'_>) -> ApiResult<RawImage> {
    let declared_mime = field.content_type().map(str::to_string);
    let data = field
        .bytes()
        .await
        .map_err(|e| (e.status(), format!("Failed to read image bytes: {}", e)))?;
    Ok(RawImage::from_bytes(data.to_vec(), declared_mime))
}

fn pipeline_error_response(e: PipelineError) -> (StatusCode, String) {
    match &e {
        PipelineError::Encoding(EncodingError::TooLarge { .. }) => {
            warn!("Rejected oversized screenshot: {}", e);
            (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
        }
        PipelineError::Encoding(_) => {
            warn!("Rejected unreadable screenshot: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        PipelineError::Persistence(_) | PipelineError::Cancelled => {
            error!("Failed to create lesson: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create lesson".to_string(),
            )
        }
    }
}

/// List all lessons, newest first.
#[utoipa::path(
    get,
    path = "/lessons",
    responses(
        (status = 200, description = "All saved lessons", body = [LessonResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_lessons_handler(
    State(app_state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<LessonResponse>>> {
    let lessons = app_state.lessons.list().await.map_err(|e| {
        error!("Failed to list lessons: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to list lessons".to_string(),
        )
    })?;
    Ok(Json(lessons.into_iter().map(LessonResponse::from).collect()))
}

/// Fetch one lesson.
#[utoipa::path(
    get,
    path = "/lessons/{id}",
    params(
        ("id" = String, Path, description = "The lesson id.")
    ),
    responses(
        (status = 200, description = "The lesson", body = LessonResponse),
        (status = 400, description = "Malformed lesson id"),
        (status = 404, description = "No lesson with this id"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_lesson_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<LessonResponse>> {
    let lesson_id = LessonId::from_str(&id).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid lesson id: {}", id),
        )
    })?;

    match app_state.lessons.get_by_id(&lesson_id).await {
        Ok(Some(lesson)) => Ok(Json(lesson.into())),
        Ok(None) => {
            info!(%lesson_id, "Lesson not found.");
            Err((StatusCode::NOT_FOUND, "Lesson not found".to_string()))
        }
        Err(e) => {
            error!("Failed to load lesson {}: {:?}", lesson_id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load lesson".to_string(),
            ))
        }
    }
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
