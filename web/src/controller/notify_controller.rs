use crate::controller::ApiResponse;
use crate::error::Error;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use events::DomainEvent;
use log::*;
use serde::Serialize;
use serde_json::{Map, Value};
use service::AppState;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationReceived {
    /// Event id the refresh round was started for.
    event: String,
    resource_id: Option<String>,
}

/// POST a change notification. Starts a refresh round in the background and
/// answers before any upstream data is fetched.
#[utoipa::path(
    post,
    path = "/notify",
    request_body(
        content = serde_json::Value,
        description = "Notification envelope such as {\"type\": \"USER_CREATED\", \"resourceId\": \"42\"}. A missing `type` refreshes the full dashboard.",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Notification received and refresh round started", body = NotificationReceived),
        (status = 400, description = "Body is not a JSON object")
    )
)]
pub async fn notify(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    let envelope: Map<String, Value> = serde_json::from_slice(&body)?;
    let event = DomainEvent::from_notification(&envelope);

    let DomainEvent::DashboardUpdate {
        event_id,
        resource_id,
    } = &event;
    info!(
        "Notification received: {event_id} (resource {})",
        resource_id.as_deref().unwrap_or("-")
    );

    let received = NotificationReceived {
        event: event_id.to_string(),
        resource_id: resource_id.clone(),
    };

    // The round outlives this request; its outcome is logged by the handler.
    drop(app_state.event_publisher.spawn_publish(event));

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), received)))
}
