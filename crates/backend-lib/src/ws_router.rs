// ============================
// crates/backend-lib/src/ws_router.rs
// ============================
//! WebSocket router and connection handling.
use crate::websocket::ConnectionHandler;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use coderoom_common::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the router: the WebSocket endpoint plus the status query
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.client_origin);
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods([Method::GET, Method::POST]),
        Err(_) => CorsLayer::new(),
    }
}

/// Process-wide counters: active rooms and active connections
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "rooms": state.rooms.len(),
        "users": state.sessions.len(),
    }))
}

/// Handler for WebSocket connections
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    counter!(crate::metrics::WS_CONNECTION).increment(1);
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    gauge!(crate::metrics::WS_ACTIVE).increment(1.0);
    let (mut sink, mut stream) = socket.split();

    // Outbound path: room actors push ServerMessages into this channel,
    // a dedicated task serializes them onto the socket.
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.settings.send_buffer);
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize outbound message");
                    continue;
                },
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut handler = ConnectionHandler::new(state, tx.clone());
    tracing::debug!(conn = %handler.connection_id(), "client connected");

    // Inbound path: per-connection events are applied in the order the
    // connection sent them.
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    if let Err(e) = handler.handle_message(msg).await {
                        tracing::warn!(conn = %handler.connection_id(), error = %e, "event handling failed");
                    }
                },
                Err(e) => {
                    // malformed frames get an error reply, never a close
                    let _ = tx
                        .send(ServerMessage::MalformedMessage {
                            err_msg: e.to_string(),
                        })
                        .await;
                },
            },
            Message::Close(_) => break,
            _ => {},
        }
    }

    // Cleanup runs before the connection slot is reclaimed
    handler.disconnect().await;
    send_task.abort();
    gauge!(crate::metrics::WS_ACTIVE).decrement(1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_zero_counters_on_fresh_state() {
        let state = Arc::new(AppState::new_default());
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["rooms"], 0);
        assert_eq!(body["users"], 0);
    }

    #[tokio::test]
    async fn test_health_counts_active_rooms_and_sessions() {
        let state = Arc::new(AppState::new_default());
        let (tx, _rx) = mpsc::channel(8);
        let mut handler = ConnectionHandler::new(state.clone(), tx);
        handler
            .handle_message(ClientMessage::JoinRoom {
                room_id: "r1".to_string(),
                username: "ada".to_string(),
                color: "#000000".to_string(),
            })
            .await
            .unwrap();

        let app = create_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["rooms"], 1);
        assert_eq!(body["users"], 1);
    }

    #[tokio::test]
    async fn test_non_websocket_request_to_ws_is_rejected() {
        let state = Arc::new(AppState::new_default());
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        // missing upgrade headers
        assert_ne!(response.status(), StatusCode::OK);
    }
}
