//! Route configuration and setup

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use cinevision_core::constants::API_PREFIX;
use cinevision_core::Config;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{require_service_key, AuthState};
use crate::handlers;
use crate::state::AppState;

/// Request bodies are JSON only; video bytes go straight to object storage
/// through presigned part URLs and never pass through this server.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState {
        service_api_key: config.service_api_key.clone(),
    });

    // Public surface: purchase flow and payment webhooks. The webhook route
    // carries its own HMAC check instead of the service key.
    let public_routes = public_routes(state.clone());

    // Admin surface: the upload triad and the progress socket.
    let protected_routes = protected_routes(state.clone()).layer(
        axum::middleware::from_fn_with_state(auth_state, require_service_key),
    );

    let app = public_routes
        .merge(protected_routes)
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Public routes (no authentication required)
fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/live", get(liveness_check))
        .route(
            &format!("{}/purchases", API_PREFIX),
            post(handlers::purchases::create_purchase),
        )
        .route(
            &format!("{}/purchases/{{purchase_token}}", API_PREFIX),
            get(handlers::purchases::purchase_status),
        )
        .route(
            &format!("{}/webhooks/payment", API_PREFIX),
            post(handlers::payment_webhook::payment_webhook),
        )
        .with_state(state)
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::openapi_spec()) }),
        )
}

/// Protected routes (require the service API key)
fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/uploads/multipart", API_PREFIX),
            post(handlers::uploads::initiate_multipart),
        )
        .route(
            &format!("{}/uploads/progress", API_PREFIX),
            get(handlers::progress_ws::progress_snapshot),
        )
        .route(
            &format!("{}/uploads/progress/ws", API_PREFIX),
            get(handlers::progress_ws::progress_ws),
        )
        .route(
            &format!("{}/uploads/{{upload_id}}", API_PREFIX),
            get(handlers::uploads::upload_status),
        )
        .route(
            &format!("{}/uploads/{{upload_id}}/progress", API_PREFIX),
            post(handlers::uploads::part_progress),
        )
        .route(
            &format!("{}/uploads/{{upload_id}}/complete", API_PREFIX),
            post(handlers::uploads::complete_multipart),
        )
        .route(
            &format!("{}/uploads/{{upload_id}}/cancel", API_PREFIX),
            post(handlers::uploads::cancel_multipart),
        )
        .with_state(state)
}

#[derive(serde::Serialize)]
struct HealthCheckResponse {
    status: String,
    database: String,
    storage: String,
}

/// Liveness probe, always 200 while the process can respond.
async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "alive" })))
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    const TIMEOUT: Duration = Duration::from_secs(5);

    let mut response = HealthCheckResponse {
        status: "healthy".to_string(),
        database: "unknown".to_string(),
        storage: "unknown".to_string(),
    };

    let mut overall_healthy = true;

    match tokio::time::timeout(TIMEOUT, sqlx::query("SELECT 1").execute(&state.pool)).await {
        Ok(Ok(_)) => {
            response.database = "healthy".to_string();
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Database health check failed");
            response.database = format!("unhealthy: {}", e);
            overall_healthy = false;
        }
        Err(_) => {
            tracing::error!("Database health check timed out");
            response.database = "timeout".to_string();
            overall_healthy = false;
        }
    }

    // Lightweight connectivity check against a key that never exists.
    // Storage trouble is reported but does not fail the probe.
    match tokio::time::timeout(
        TIMEOUT,
        state.storage.exists("health-check-non-existent-key"),
    )
    .await
    {
        Ok(Ok(_)) => {
            response.storage = "healthy".to_string();
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Storage health check warning");
            response.storage = format!("degraded: {}", e);
        }
        Err(_) => {
            tracing::warn!("Storage health check timed out");
            response.storage = "timeout".to_string();
        }
    }

    if !overall_healthy {
        response.status = "unhealthy".to_string();
    }

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
