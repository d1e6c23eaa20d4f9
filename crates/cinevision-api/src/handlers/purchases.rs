use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use cinevision_core::models::{
    CreatePurchaseRequest, CreatePurchaseResponse, PurchaseStatusResponse,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Open a purchase for one content language variant
#[utoipa::path(
    post,
    path = "/api/v0/purchases",
    tag = "purchases",
    request_body = CreatePurchaseRequest,
    responses(
        (status = 201, description = "Purchase opened", body = CreatePurchaseResponse),
        (status = 400, description = "Invalid input or amount mismatch", body = ErrorResponse),
        (status = 404, description = "Content or language variant not found", body = ErrorResponse),
        (status = 409, description = "Identity already has a pending purchase for this variant", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        content_id = %request.content_id,
        channel = %request.delivery_channel,
        operation = "create_purchase"
    )
)]
pub async fn create_purchase(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePurchaseRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let response = state.purchases.create(request).await?;
    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// Poll the status of a purchase by its token
#[utoipa::path(
    get,
    path = "/api/v0/purchases/{purchase_token}",
    tag = "purchases",
    params(
        ("purchase_token" = Uuid, Path, description = "Purchase token returned when the purchase was opened")
    ),
    responses(
        (status = 200, description = "Purchase status", body = PurchaseStatusResponse),
        (status = 404, description = "Unknown purchase token", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "purchase_status"))]
pub async fn purchase_status(
    State(state): State<Arc<AppState>>,
    Path(purchase_token): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state.purchases.status(purchase_token).await?;
    Ok(Json(response))
}
