//! NotificationHub: connection registry and room membership
//!
//! ```text
//! WS session ──connect()──▶ connections: id → mpsc::Sender<ServerEvent>
//!            ──join_*()───▶ restaurants: restaurant_id → {connection ids}
//!                           customers:   customer_id   → connection id
//! notifier ──send_to_*()──▶ try_send into each member's queue
//! ```
//!
//! Delivery is best effort: a full or closed queue drops the event.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use shared::realtime::{ConnectionStats, ServerEvent};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound queue capacity per connection
pub const CONNECTION_QUEUE_SIZE: usize = 64;

#[derive(Default)]
struct HubInner {
    connections: DashMap<Uuid, mpsc::Sender<ServerEvent>>,
    restaurants: DashMap<i64, HashSet<Uuid>>,
    customers: DashMap<i64, Uuid>,
}

#[derive(Clone, Default)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and hand back its outbound queue
    pub fn connect(&self) -> (Uuid, mpsc::Receiver<ServerEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CONNECTION_QUEUE_SIZE);
        self.inner.connections.insert(id, tx);
        tracing::debug!(connection_id = %id, "Realtime connection registered");
        (id, rx)
    }

    /// Add a connection to a restaurant room; unknown connections are ignored
    pub fn join_restaurant(&self, connection_id: Uuid, restaurant_id: i64) -> bool {
        if !self.inner.connections.contains_key(&connection_id) {
            return false;
        }
        self.inner
            .restaurants
            .entry(restaurant_id)
            .or_default()
            .insert(connection_id);
        tracing::info!(connection_id = %connection_id, restaurant_id, "Joined restaurant room");
        true
    }

    /// Map a customer to this connection, replacing any earlier mapping
    pub fn join_customer(&self, connection_id: Uuid, customer_id: i64) -> bool {
        if !self.inner.connections.contains_key(&connection_id) {
            return false;
        }
        let previous = self.inner.customers.insert(customer_id, connection_id);
        if let Some(previous) = previous.filter(|p| *p != connection_id) {
            tracing::debug!(customer_id, previous = %previous, "Customer channel taken over");
        }
        tracing::info!(connection_id = %connection_id, customer_id, "Joined customer channel");
        true
    }

    /// Remove a connection from every room and channel, then drop it
    pub fn disconnect(&self, connection_id: Uuid) {
        self.inner.restaurants.retain(|_, members| {
            members.remove(&connection_id);
            !members.is_empty()
        });
        self.inner.customers.retain(|_, id| *id != connection_id);
        if self.inner.connections.remove(&connection_id).is_some() {
            tracing::info!(connection_id = %connection_id, "Realtime connection closed");
        }
    }

    /// Queue an event for one connection; `false` if it was not delivered
    pub fn send_to_connection(&self, connection_id: Uuid, event: ServerEvent) -> bool {
        let Some(tx) = self
            .inner
            .connections
            .get(&connection_id)
            .map(|entry| entry.value().clone())
        else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    event = event.name(),
                    "Outbound queue full, event dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Fan an event out to a restaurant room; returns how many were queued
    pub fn send_to_restaurant(&self, restaurant_id: i64, event: &ServerEvent) -> usize {
        let members: Vec<Uuid> = match self.inner.restaurants.get(&restaurant_id) {
            Some(set) => set.iter().copied().collect(),
            None => return 0,
        };
        members
            .into_iter()
            .filter(|id| self.send_to_connection(*id, event.clone()))
            .count()
    }

    pub fn send_to_customer(&self, customer_id: i64, event: ServerEvent) -> bool {
        let Some(connection_id) = self.inner.customers.get(&customer_id).map(|e| *e.value()) else {
            return false;
        };
        self.send_to_connection(connection_id, event)
    }

    pub fn stats(&self) -> ConnectionStats {
        let mut restaurants: Vec<i64> = self.inner.restaurants.iter().map(|e| *e.key()).collect();
        let mut customers: Vec<i64> = self.inner.customers.iter().map(|e| *e.key()).collect();
        restaurants.sort_unstable();
        customers.sort_unstable();
        ConnectionStats {
            restaurants,
            customers,
            total_connections: self.inner.connections.len(),
        }
    }
}
