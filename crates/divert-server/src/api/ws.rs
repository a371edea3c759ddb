//! WebSocket streaming of decision events.
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsQuery>,
) -> axum::response::Response {
    let flight_filter = params.flight_id;
    ws.on_upgrade(move |socket| handle_socket(socket, state, flight_filter))
        .into_response()
}

#[derive(Debug, Deserialize, Default)]
pub struct WsQuery {
    flight_id: Option<String>,
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, flight_filter: Option<String>) {
    let mut rx = state.tx.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(msg) => {
                        if let Some(flight_id) = flight_filter.as_deref() {
                            if msg.flight_id != flight_id {
                                continue;
                            }
                        }
                        if socket.send(Message::Text(msg.payload.as_ref().to_owned())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Stream subscriber lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(_) => break,
                }
            }
        }
    }
}
