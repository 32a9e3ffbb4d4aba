//! Real-time order notifications
//!
//! [`OrderNotifier`] is what handlers call after an order changes. It wraps a
//! lazily initialized [`NotificationHub`]; until the hub is initialized every
//! notify call is a silent no-op.

mod hub;

pub use hub::{CONNECTION_QUEUE_SIZE, NotificationHub};

use std::sync::{Arc, OnceLock};

use shared::models::{Order, OrderStatus};
use shared::realtime::{ConnectionStats, Notification, NotificationType, ServerEvent};
use shared::util::now_millis;

/// Message shown to the customer for each status
pub fn customer_status_message(order_number: &str, status: OrderStatus) -> String {
    match status {
        OrderStatus::Pending => format!("Your order #{order_number} has been received"),
        OrderStatus::Confirmed => {
            format!("Your order #{order_number} has been confirmed by the restaurant")
        }
        OrderStatus::Preparing => format!("Your order #{order_number} is being prepared"),
        OrderStatus::Ready => format!("Your order #{order_number} is ready!"),
        OrderStatus::Served => {
            format!("Your order #{order_number} has been served. Enjoy your meal!")
        }
        OrderStatus::Completed => format!("Your order #{order_number} is complete. Thank you!"),
        OrderStatus::Cancelled => format!("Your order #{order_number} has been cancelled"),
    }
}

fn notification(kind: NotificationType, order: &Order, message: String) -> Notification {
    Notification {
        kind,
        order_id: order.id,
        restaurant_id: order.restaurant_id,
        message,
        data: serde_json::to_value(order).unwrap_or_default(),
        timestamp: now_millis(),
    }
}

#[derive(Clone, Default)]
pub struct OrderNotifier {
    hub: Arc<OnceLock<NotificationHub>>,
}

impl OrderNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the transport up; repeated calls return the same hub
    pub fn initialize(&self) -> NotificationHub {
        self.hub.get_or_init(NotificationHub::new).clone()
    }

    pub fn hub(&self) -> Option<&NotificationHub> {
        self.hub.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.hub.get().is_some()
    }

    /// `new_order` to the restaurant room
    pub fn notify_new_order(&self, order: &Order) {
        let Some(hub) = self.hub() else { return };
        let message = format!("New order #{} received", order.order_number);
        let event = ServerEvent::NewOrder(notification(NotificationType::NewOrder, order, message));
        let delivered = hub.send_to_restaurant(order.restaurant_id, &event);
        tracing::debug!(order_id = order.id, delivered, "new_order sent");
    }

    /// Generic update to the restaurant room, status-specific text to the customer
    pub fn notify_order_status_update(&self, order: &Order) {
        let Some(hub) = self.hub() else { return };
        let room_message = format!(
            "Order #{} status changed to {}",
            order.order_number, order.status
        );
        let event = ServerEvent::OrderStatusUpdate(notification(
            NotificationType::StatusUpdate,
            order,
            room_message,
        ));
        let delivered = hub.send_to_restaurant(order.restaurant_id, &event);

        let customer_notified = order.customer_id.is_some_and(|customer_id| {
            let message = customer_status_message(&order.order_number, order.status);
            hub.send_to_customer(
                customer_id,
                ServerEvent::OrderStatusUpdate(notification(
                    NotificationType::StatusUpdate,
                    order,
                    message,
                )),
            )
        });
        tracing::debug!(
            order_id = order.id,
            status = %order.status,
            delivered,
            customer_notified,
            "order_status_update sent"
        );
    }

    /// `order_ready` to the customer channel only
    pub fn notify_order_ready(&self, order: &Order) {
        let Some(hub) = self.hub() else { return };
        let Some(customer_id) = order.customer_id else {
            return;
        };
        let message = format!("Your order #{} is ready for pickup!", order.order_number);
        let event =
            ServerEvent::OrderReady(notification(NotificationType::OrderReady, order, message));
        let delivered = hub.send_to_customer(customer_id, event);
        tracing::debug!(order_id = order.id, delivered, "order_ready sent");
    }

    /// Empty stats while the transport is down
    pub fn connection_stats(&self) -> ConnectionStats {
        self.hub().map(NotificationHub::stats).unwrap_or_default()
    }
}
