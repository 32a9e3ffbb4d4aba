//! Real-time order notifications over WebSocket
//!
//! GET /ws upgrades the connection. Protocol in [`shared::realtime`]:
//! - Client → Server: `join_restaurant`, `join_customer`, `ping`
//! - Server → Client: `connected`, `pong`, `new_order`,
//!   `order_status_update`, `order_ready`
//!
//! Closing the socket leaves every room the connection had joined.

use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, StreamExt};
use shared::error::{AppError, ErrorCode};
use shared::realtime::{ClientEvent, ConnectionStats, ServerEvent};
use shared::response::ApiResponse;
use shared::util::now_millis;
use tokio::time::Duration;
use uuid::Uuid;

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::live::NotificationHub;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// GET /ws
///
/// 503 while real-time notifications are disabled, checked before the upgrade.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Some(hub) = state.notifier.hub().cloned() else {
        return Err(AppError::new(ErrorCode::RealtimeUnavailable));
    };
    let ws = ws.map_err(|rejection| {
        AppError::from_status(rejection.status(), rejection.body_text())
    })?;
    Ok(ws.on_upgrade(move |socket| ws_session(socket, hub)))
}

/// GET {api}/realtime/stats
pub async fn connection_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<ConnectionStats> {
    user.require_admin()?;
    Ok(ApiResponse::ok(state.notifier.connection_stats()))
}

async fn ws_session(socket: WebSocket, hub: NotificationHub) {
    let (mut sink, mut stream) = socket.split();
    let (connection_id, mut rx) = hub.connect();
    tracing::info!(connection_id = %connection_id, "WebSocket connected");

    let connected = ServerEvent::Connected {
        connection_id: connection_id.to_string(),
    };
    if send_event(&mut sink, &connected).await.is_err() {
        hub.disconnect(connection_id);
        return;
    }

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            event = rx.recv() => {
                let Some(event) = event else { break };
                if send_event(&mut sink, &event).await.is_err() {
                    break;
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_text(&hub, connection_id, &text)
                            && send_event(&mut sink, &reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                        break;
                    }
                    _ => {} // Binary, Ping, Pong
                }
            }
        }
    }

    hub.disconnect(connection_id);
    tracing::info!(connection_id = %connection_id, "WebSocket disconnected");
}

/// Apply one client frame; returns the direct reply, if any
fn handle_client_text(hub: &NotificationHub, connection_id: Uuid, text: &str) -> Option<ServerEvent> {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(connection_id = %connection_id, error = %e, "Ignoring malformed frame");
            return None;
        }
    };
    match event {
        ClientEvent::JoinRestaurant { restaurant_id } => {
            hub.join_restaurant(connection_id, restaurant_id);
            None
        }
        ClientEvent::JoinCustomer { customer_id } => {
            hub.join_customer(connection_id, customer_id);
            None
        }
        ClientEvent::Ping => Some(ServerEvent::Pong {
            timestamp: now_millis(),
        }),
    }
}

async fn send_event<S>(sink: &mut S, event: &ServerEvent) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(event = event.name(), error = %e, "Failed to serialize event");
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}
