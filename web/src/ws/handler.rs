use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use log::*;
use relay::Manager;
use service::AppState;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Upgrades to a WebSocket that receives every broadcast until it disconnects
/// or falls behind. Nothing is sent on connect; the first frame is the next round.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> Response {
    let manager = Arc::clone(&app_state.relay_manager);
    ws.on_upgrade(move |socket| handle_socket(socket, manager))
}

/// Owns one subscriber for the lifetime of its socket: drains the outbound
/// queue into the socket and watches inbound traffic for closure.
async fn handle_socket(mut socket: WebSocket, manager: Arc<Manager>) {
    let (tx, mut rx) = mpsc::channel(manager.subscriber_buffer());
    let subscriber_id = manager.register_connection(tx).await;

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(frame) => {
                    if let Err(e) = socket.send(frame).await {
                        debug!("Write to subscriber {} failed: {e}", subscriber_id.as_str());
                        break;
                    }
                }
                // The broadcaster evicted this subscriber and dropped its queue.
                None => {
                    debug!("Subscriber {} was evicted, closing socket", subscriber_id.as_str());
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("Read from subscriber {} failed: {e}", subscriber_id.as_str());
                    break;
                }
                // Client frames carry no meaning; pings are answered by axum.
                Some(Ok(_)) => {}
            },
        }
    }

    manager.unregister_connection(&subscriber_id).await;
}
