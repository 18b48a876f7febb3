use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use service::AppState;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    status: String,
    /// Server time, RFC 3339.
    timestamp: String,
    /// Subscribers currently connected to `/ws`.
    clients: usize,
    /// Event ids with their own routing entry.
    events: usize,
}

/// GET the liveness of the relay along with its subscriber count
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Relay is up and responding to requests", body = HealthStatus),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    let health = HealthStatus {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        clients: app_state.relay_manager.subscriber_count().await,
        events: app_state.event_router.event_count(),
    };

    (StatusCode::OK, Json(health))
}
