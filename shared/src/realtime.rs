//! Real-time notification protocol
//!
//! WebSocket frames are JSON text messages of the form
//! `{"event": "<name>", "data": {...}}`.
//!
//! Client → server: `join_restaurant`, `join_customer`, `ping`.
//! Server → client: `connected`, `pong`, `new_order`,
//! `order_status_update`, `order_ready`.

use serde::{Deserialize, Serialize};

/// Events sent by a connected client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Subscribe to every order of a restaurant (staff dashboards)
    JoinRestaurant { restaurant_id: i64 },
    /// Receive the updates addressed to one customer
    JoinCustomer { customer_id: i64 },
    Ping,
}

/// Events pushed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    Connected { connection_id: String },
    Pong { timestamp: i64 },
    NewOrder(Notification),
    OrderStatusUpdate(Notification),
    OrderReady(Notification),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Pong { .. } => "pong",
            Self::NewOrder(_) => "new_order",
            Self::OrderStatusUpdate(_) => "order_status_update",
            Self::OrderReady(_) => "order_ready",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewOrder,
    StatusUpdate,
    OrderReady,
}

/// Order notification payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub order_id: i64,
    pub restaurant_id: i64,
    pub message: String,
    /// Snapshot of the order at the time of the event
    pub data: serde_json::Value,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Snapshot of the connection registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    /// Restaurants with at least one subscribed connection
    pub restaurants: Vec<i64>,
    /// Customers with a registered connection
    pub customers: Vec<i64>,
    pub total_connections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_event_parse() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"join_restaurant","data":{"restaurantId":12}}"#)
                .unwrap();
        assert_eq!(event, ClientEvent::JoinRestaurant { restaurant_id: 12 });

        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"join_customer","data":{"customerId":7}}"#).unwrap();
        assert_eq!(event, ClientEvent::JoinCustomer { customer_id: 7 });

        let event: ClientEvent = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(event, ClientEvent::Ping);
    }

    #[test]
    fn test_client_event_rejects_unknown() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"shout","data":{}}"#).is_err());
        assert!(
            serde_json::from_str::<ClientEvent>(r#"{"event":"join_restaurant","data":{}}"#)
                .is_err()
        );
    }

    #[test]
    fn test_server_event_shape() {
        let event = ServerEvent::OrderReady(Notification {
            kind: NotificationType::OrderReady,
            order_id: 1,
            restaurant_id: 2,
            message: "Your order #A1 is ready for pickup!".into(),
            data: json!({"id": 1}),
            timestamp: 1_700_000_000_000,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "order_ready");
        assert_eq!(value["data"]["type"], "order_ready");
        assert_eq!(value["data"]["orderId"], 1);
        assert_eq!(value["data"]["restaurantId"], 2);
        assert_eq!(event.name(), "order_ready");

        let connected = serde_json::to_value(ServerEvent::Connected {
            connection_id: "abc".into(),
        })
        .unwrap();
        assert_eq!(connected, json!({"event": "connected", "data": {"connectionId": "abc"}}));
    }
}
