//! WebSocket handler bridging widgets and the event bus.
//!
//! Protocol (plain bus messages, JSON text frames):
//! → `{"realm":"webamp_data","action":"requestData"}`
//! → `{"realm":"webamp_data","action":"storeData","payload":{...},"overwrite":true}`
//! ← `{"realm":"webamp_data","action":"broadcastData","payload":{...}}`

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;
use zergling_core::{BusAction, BusMessage};

use super::server::GatewayState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Parse a frame from a widget. Widgets may only request or store data.
pub fn parse_inbound(text: &str) -> Result<BusMessage, String> {
    let msg: BusMessage = serde_json::from_str(text).map_err(|e| format!("Invalid JSON: {e}"))?;
    match msg.action {
        BusAction::RequestData | BusAction::StoreData => Ok(msg),
        other => Err(format!("Unsupported action from widget: {other:?}")),
    }
}

/// The frame to forward to widgets for a bus message, if any.
pub fn outbound_frame(msg: &BusMessage) -> Option<String> {
    if msg.action != BusAction::BroadcastData {
        return None;
    }
    serde_json::to_string(msg).ok()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<GatewayState>) {
    tracing::info!("🔌 Widget connected");
    let mut bus_rx = state.bus.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(msg)) = incoming else { break };
                match msg {
                    Message::Text(text) => match parse_inbound(text.as_str()) {
                        Ok(bus_msg) => {
                            state.bus.publish(bus_msg);
                        }
                        Err(e) => {
                            tracing::debug!("Rejected widget frame: {e}");
                            send_error(&mut socket, &e).await;
                        }
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            outgoing = bus_rx.recv() => match outgoing {
                Ok(msg) => {
                    let Some(frame) = outbound_frame(&msg) else { continue };
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::warn!("⚠️ Widget socket lagged, skipped {n} bus messages"),
                Err(RecvError::Closed) => break,
            }
        }
    }
    tracing::info!("🔌 Widget disconnected");
}

async fn send_error(socket: &mut WebSocket, message: &str) {
    let error = serde_json::json!({
        "type": "error",
        "message": message,
    });
    if let Err(e) = socket.send(Message::Text(error.to_string().into())).await {
        tracing::error!("WS send failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_inbound() {
        let req = parse_inbound(r#"{"realm":"np_data","action":"requestData"}"#).unwrap();
        assert_eq!(req, BusMessage::request("np_data"));

        let store = parse_inbound(r#"{"realm":"webamp_data","action":"storeData","payload":{"skinfn":"a.wsz"}}"#)
            .unwrap();
        assert_eq!(store.payload, Some(json!({"skinfn": "a.wsz"})));
        assert_eq!(store.overwrite, None);

        assert!(parse_inbound("not json").unwrap_err().starts_with("Invalid JSON"));
        assert!(parse_inbound(r#"{"realm":"x","action":"broadcastData","payload":{}}"#).is_err());
    }

    #[test]
    fn test_only_broadcasts_go_out() {
        let frame = outbound_frame(&BusMessage::broadcast("np_data", json!({"song": "a"}))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!({"realm": "np_data", "action": "broadcastData", "payload": {"song": "a"}}));
        assert!(outbound_frame(&BusMessage::request("np_data")).is_none());
    }
}
