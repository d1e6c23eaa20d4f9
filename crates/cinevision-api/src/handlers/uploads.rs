use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use cinevision_core::models::{
    CompleteMultipartRequest, CompleteMultipartResponse, InitiateMultipartRequest,
    InitiateMultipartResponse, PartProgressRequest, UploadStatusResponse,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Open a multipart upload session for a content language variant
#[utoipa::path(
    post,
    path = "/api/v0/uploads/multipart",
    tag = "uploads",
    request_body = InitiateMultipartRequest,
    security(("service_api_key" = [])),
    responses(
        (status = 200, description = "Session opened, presigned part URLs returned", body = InitiateMultipartResponse),
        (status = 400, description = "Disallowed content type or size", body = ErrorResponse),
        (status = 401, description = "Missing or invalid service key", body = ErrorResponse),
        (status = 404, description = "Content not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        content_id = %request.content_id,
        filename = %request.filename,
        size = request.total_size_bytes,
        operation = "initiate_multipart"
    )
)]
pub async fn initiate_multipart(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitiateMultipartRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let response = state.uploads.initiate(request).await?;
    Ok(Json(response))
}

/// Report that a part has finished uploading
#[utoipa::path(
    post,
    path = "/api/v0/uploads/{upload_id}/progress",
    tag = "uploads",
    params(("upload_id" = Uuid, Path, description = "Upload session id")),
    request_body = PartProgressRequest,
    security(("service_api_key" = [])),
    responses(
        (status = 200, description = "Progress recorded", body = UploadStatusResponse),
        (status = 404, description = "Unknown upload session", body = ErrorResponse),
        (status = 409, description = "Session is not open", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "part_progress"))]
pub async fn part_progress(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<Uuid>,
    Json(request): Json<PartProgressRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let response = state
        .uploads
        .record_part(upload_id, request.part_number)
        .await?;
    Ok(Json(response))
}

/// Complete a multipart upload
#[utoipa::path(
    post,
    path = "/api/v0/uploads/{upload_id}/complete",
    tag = "uploads",
    params(("upload_id" = Uuid, Path, description = "Upload session id")),
    request_body = CompleteMultipartRequest,
    security(("service_api_key" = [])),
    responses(
        (status = 200, description = "Object assembled and variant linked", body = CompleteMultipartResponse),
        (status = 400, description = "Part list has gaps or duplicates", body = ErrorResponse),
        (status = 404, description = "Unknown upload session", body = ErrorResponse),
        (status = 409, description = "Session already closed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "complete_multipart"))]
pub async fn complete_multipart(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<Uuid>,
    Json(request): Json<CompleteMultipartRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let response = state.uploads.complete(upload_id, request).await?;
    Ok(Json(response))
}

/// Cancel a multipart upload, discarding uploaded parts
#[utoipa::path(
    post,
    path = "/api/v0/uploads/{upload_id}/cancel",
    tag = "uploads",
    params(("upload_id" = Uuid, Path, description = "Upload session id")),
    security(("service_api_key" = [])),
    responses(
        (status = 200, description = "Session aborted", body = UploadStatusResponse),
        (status = 404, description = "Unknown upload session", body = ErrorResponse),
        (status = 409, description = "Session already closed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "cancel_multipart"))]
pub async fn cancel_multipart(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state.uploads.cancel(upload_id).await?;
    Ok(Json(response))
}

/// Current status of an upload session
#[utoipa::path(
    get,
    path = "/api/v0/uploads/{upload_id}",
    tag = "uploads",
    params(("upload_id" = Uuid, Path, description = "Upload session id")),
    security(("service_api_key" = [])),
    responses(
        (status = 200, description = "Upload status", body = UploadStatusResponse),
        (status = 404, description = "Unknown upload session", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "upload_status"))]
pub async fn upload_status(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state.uploads.status(upload_id).await?;
    Ok(Json(response))
}
