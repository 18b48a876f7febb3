use crate::controller::{health_check_controller, notify_controller};
use crate::ws::handler::ws_handler;
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI document. To be a part
// of the rendered document, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Dashboard Relay API"
        ),
        paths(
            health_check_controller::health_check,
            notify_controller::notify,
        ),
        components(
            schemas(
                health_check_controller::HealthStatus,
                notify_controller::NotificationReceived,
            )
        ),
        tags(
            (name = "dashboard_relay", description = "Pushes refreshed dashboard data to WebSocket subscribers")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes(app_state.clone()))
        .merge(notify_routes(app_state.clone()))
        .merge(ws_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

fn notify_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/notify", post(notify_controller::notify))
        .with_state(app_state)
}

// WebSocket upgrade endpoint; every connection is a broadcast subscriber
fn ws_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
