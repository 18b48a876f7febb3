use axum::http::{header, HeaderValue, Method};
use log::*;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

use service::config::Config;
pub use service::AppState;

mod controller;
mod error;
pub mod router;
mod ws;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let server_url = format!(
        "{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );

    let listener = TcpListener::bind(&server_url).await?;
    info!("Server starting... listening for connections on http://{server_url}");

    serve(listener, app_state).await
}

/// Serves the relay on an already bound listener until the process stops.
pub async fn serve(listener: TcpListener, app_state: AppState) -> std::io::Result<()> {
    let cors_layer = cors_layer(&app_state.config);
    let app = router::define_routes(app_state).layer(cors_layer);

    axum::serve(listener, app).await
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use domain::PartialResult;
    use events::EventId;
    use futures_util::StreamExt;
    use relay::message::OutgoingMessage;
    use mockito::{Mock, Server, ServerGuard};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio_tungstenite::connect_async;

    async fn start_relay(upstream: &str) -> (SocketAddr, AppState) {
        start_relay_with(upstream, &[]).await
    }

    async fn start_relay_with(upstream: &str, flags: &[&str]) -> (SocketAddr, AppState) {
        let config = Config::try_parse_from(
            [
                "dashboard_relay",
                "--upstream-base-url",
                upstream,
                "--fetch-timeout-ms",
                "2000",
            ]
            .into_iter()
            .chain(flags.iter().copied()),
        )
        .unwrap();
        let app_state = service::init_app_state(config).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, app_state.clone()));

        (addr, app_state)
    }

    async fn wait_for_subscribers(app_state: &AppState, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while app_state.relay_manager.subscriber_count().await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    async fn mock_json(server: &mut ServerGuard, path: &str, body: Value) -> Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    #[tokio::test]
    async fn notification_is_pushed_to_websocket_subscribers() {
        let mut upstream = Server::new_async().await;
        let _overview = mock_json(
            &mut upstream,
            "/users/stats/overview",
            json!({"total": 12, "clients": 9}),
        )
        .await;
        let _clients = upstream
            .mock("GET", "/users/stats/count/clients")
            .with_status(500)
            .create_async()
            .await;

        let (addr, app_state) = start_relay(&upstream.url()).await;
        let (mut socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        wait_for_subscribers(&app_state, 1).await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/notify"))
            .header("content-type", "application/json")
            .body(r#"{"event":"DASHBOARD_UPDATE","type":"USER_CREATED","resourceId":"7"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let pushed: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();

        assert_eq!(pushed["event"], json!("USER_CREATED"));
        assert_eq!(
            pushed["data"],
            json!({"users_overview": {"total": 12, "clients": 9}})
        );
        assert!(pushed["timestamp"].is_string());
    }

    #[tokio::test]
    async fn closed_websocket_is_unregistered() {
        let (addr, app_state) = start_relay("http://127.0.0.1:9").await;

        let (mut socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        wait_for_subscribers(&app_state, 1).await;

        socket.close(None).await.unwrap();
        wait_for_subscribers(&app_state, 0).await;
    }

    #[tokio::test]
    async fn lagging_subscriber_gets_queued_frame_then_close() {
        let (addr, app_state) =
            start_relay_with("http://127.0.0.1:9", &["--subscriber-buffer", "1"]).await;

        let (mut socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        wait_for_subscribers(&app_state, 1).await;

        let mut data = PartialResult::new();
        data.insert("users_count_clients".to_string(), json!(3));
        let message = OutgoingMessage::new(EventId::new("USER_CREATED"), data);

        // Back to back, so the socket task never drains the one-frame queue.
        let mut delivered = 0;
        let mut evicted = 0;
        for _ in 0..3 {
            let report = app_state.relay_manager.broadcast(&message).await;
            delivered += report.delivered;
            evicted += report.evicted.len();
        }

        assert_eq!(delivered, 1);
        assert_eq!(evicted, 1);
        assert_eq!(app_state.relay_manager.subscriber_count().await, 0);

        let first = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(first.is_text());
        let pushed: Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
        assert_eq!(pushed["data"], json!({"users_count_clients": 3}));

        let second = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(second.is_close());
    }
}
