//! Order placement, pricing, status flow and notifications end to end

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{API, TestApp, test_config};
use dine_server::db::memory::MemoryStore;
use dine_server::db::{
    DbError, DbResult, NewOrder, NewRestaurant, OrderFilter, OrderRepository, Repositories,
    Window,
};
use http::{Method, StatusCode};
use serde_json::json;
use shared::models::{DiningTableCreate, Order, OrderStatus, RestaurantUpdate, UserRole};
use shared::realtime::ServerEvent;
use tokio::sync::mpsc;

fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn place_simple_order(app: &TestApp, token: &str, fx: &common::Fixture) -> i64 {
    let res = app
        .post(
            "/orders",
            Some(token),
            json!({ "restaurantId": fx.restaurant.id, "items": [{ "menuItemId": fx.item_id, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    res.body["data"]["id"].as_i64().unwrap()
}

async fn set_status(app: &TestApp, token: &str, order_id: i64, status: &str) -> common::TestResponse {
    app.request(
        Method::PATCH,
        &format!("{API}/orders/{order_id}/status"),
        Some(token),
        Some(json!({ "status": status })),
    )
    .await
}

#[tokio::test]
async fn test_order_ready_reaches_customer_exactly_once() {
    let app = TestApp::new();
    let fx = app.fixture().await;
    let (customer, customer_token) = app
        .create_user("diner@example.com", UserRole::Customer, None)
        .await;

    let hub = app.state.notifier.hub().cloned().unwrap();
    let (customer_conn, mut customer_rx) = hub.connect();
    assert!(hub.join_customer(customer_conn, customer.id));
    let (staff_conn, mut staff_rx) = hub.connect();
    assert!(hub.join_restaurant(staff_conn, fx.restaurant.id));

    let res = app
        .post(
            "/orders",
            Some(&customer_token),
            json!({
                "restaurantId": fx.restaurant.id,
                "items": [{ "menuItemId": fx.item_id, "quantity": 2 }]
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let order_id = res.body["data"]["id"].as_i64().unwrap();
    assert_eq!(res.body["data"]["status"], "PENDING");
    assert_eq!(res.body["data"]["customerId"], customer.id);

    let staff_events = drain(&mut staff_rx);
    assert_eq!(staff_events.len(), 1);
    match &staff_events[0] {
        ServerEvent::NewOrder(n) => assert_eq!(n.order_id, order_id),
        other => panic!("unexpected event {other:?}"),
    }

    let res = set_status(&app, &fx.owner_token, order_id, "READY").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "READY");

    let events = drain(&mut customer_rx);
    let ready: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::OrderReady(n) => Some(n),
            _ => None,
        })
        .collect();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].order_id, order_id);
    assert!(ready[0].message.contains("ready for pickup"));

    let status_updates = events
        .iter()
        .filter(|e| matches!(e, ServerEvent::OrderStatusUpdate(_)))
        .count();
    assert_eq!(status_updates, 1);

    // The room gets the generic update but never order_ready
    let staff_events = drain(&mut staff_rx);
    assert_eq!(staff_events.len(), 1);
    assert!(matches!(staff_events[0], ServerEvent::OrderStatusUpdate(_)));
}

/// Order repository whose inserts always hit the order number constraint
/// Fails the first `collisions` inserts with an order-number unique violation
struct ConflictingOrders {
    inner: MemoryStore,
    collisions: usize,
    attempts: AtomicUsize,
}

impl ConflictingOrders {
    fn new(inner: MemoryStore, collisions: usize) -> Arc<Self> {
        Arc::new(Self {
            inner,
            collisions,
            attempts: AtomicUsize::new(0),
        })
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderRepository for ConflictingOrders {
    async fn create(&self, new: NewOrder) -> DbResult<Order> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.collisions {
            return Err(DbError::UniqueViolation("orders_order_number_key".into()));
        }
        OrderRepository::create(&self.inner, new).await
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        OrderRepository::find_by_id(&self.inner, id).await
    }

    async fn list(&self, filter: OrderFilter, window: Window) -> DbResult<(Vec<Order>, i64)> {
        OrderRepository::list(&self.inner, filter, window).await
    }

    async fn update_status(
        &self,
        id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> DbResult<Option<Order>> {
        OrderRepository::update_status(&self.inner, id, expected, next).await
    }
}

fn app_with_collisions(collisions: usize) -> (TestApp, Arc<ConflictingOrders>) {
    let (mut repos, store) = Repositories::in_memory();
    let orders = ConflictingOrders::new(store.clone(), collisions);
    repos.orders = orders.clone();
    (TestApp::with_repositories(test_config(), repos, store), orders)
}

#[tokio::test]
async fn test_unique_violation_on_create_is_409() {
    let (app, orders) = app_with_collisions(usize::MAX);
    let fx = app.fixture().await;

    let res = app
        .post(
            "/orders",
            None,
            json!({
                "restaurantId": fx.restaurant.id,
                "items": [{ "menuItemId": fx.item_id, "quantity": 1 }]
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["error"]["statusCode"], 409);
    assert_eq!(res.body["error"]["method"], "POST");
    assert_eq!(res.body["error"]["path"], "/api/v1/orders");
    assert_eq!(app.store.order_count(), 0);
    // Three order numbers tried before giving up
    assert_eq!(orders.attempts(), 3);
}

#[tokio::test]
async fn test_order_number_collision_is_retried() {
    let (app, orders) = app_with_collisions(1);
    let fx = app.fixture().await;

    let res = app
        .post(
            "/orders",
            None,
            json!({
                "restaurantId": fx.restaurant.id,
                "items": [{ "menuItemId": fx.item_id, "quantity": 1 }]
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(orders.attempts(), 2);
    assert_eq!(app.store.order_count(), 1);
}

#[tokio::test]
async fn test_prices_come_from_menu() {
    let app = TestApp::new();
    let fx = app.fixture().await;

    let res = app
        .post(
            "/orders",
            None,
            json!({
                "restaurantId": fx.restaurant.id,
                "notes": "no onions",
                "items": [
                    { "menuItemId": fx.item_id, "quantity": 1 },
                    { "menuItemId": fx.item_id, "variantId": fx.variant_id, "quantity": 2, "unitPrice": 0.01 }
                ]
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let order = &res.body["data"];
    // 10.00 + 2 × 12.50
    assert_eq!(order["total"], 35.0);
    assert_eq!(order["items"][1]["name"], "Burger (Large)");
    assert_eq!(order["items"][1]["unitPrice"], 12.5);
    assert!(order["customerId"].is_null());
    assert_eq!(order["orderNumber"].as_str().unwrap().len(), 6);
}

#[tokio::test]
async fn test_order_validation_errors() {
    let app = TestApp::new();
    let fx = app.fixture().await;

    // Empty order
    let res = app
        .post("/orders", None, json!({ "restaurantId": fx.restaurant.id, "items": [] }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Unknown item
    let res = app
        .post(
            "/orders",
            None,
            json!({ "restaurantId": fx.restaurant.id, "items": [{ "menuItemId": 999_999, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    // Unavailable item
    app.state
        .repos
        .menus
        .update_item(
            fx.item_id,
            shared::models::MenuItemUpdate {
                is_available: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let res = app
        .post(
            "/orders",
            None,
            json!({ "restaurantId": fx.restaurant.id, "items": [{ "menuItemId": fx.item_id, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.order_count(), 0);
}

#[tokio::test]
async fn test_table_from_other_restaurant_rejected() {
    let app = TestApp::new();
    let fx = app.fixture().await;
    let (other_owner, _) = app
        .create_user("other@example.com", UserRole::Owner, None)
        .await;
    let other = app
        .state
        .repos
        .restaurants
        .create(NewRestaurant {
            owner_id: other_owner.id,
            name: "Elsewhere".into(),
            slug: "elsewhere".into(),
            description: None,
            address: None,
            phone: None,
            email: None,
        })
        .await
        .unwrap();
    let foreign_table = app
        .state
        .repos
        .tables
        .create(DiningTableCreate {
            restaurant_id: other.id,
            number: "1".into(),
            capacity: None,
        })
        .await
        .unwrap();

    let res = app
        .post(
            "/orders",
            None,
            json!({
                "restaurantId": fx.restaurant.id,
                "tableId": foreign_table.id,
                "items": [{ "menuItemId": fx.item_id, "quantity": 1 }]
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inactive_restaurant_rejects_orders() {
    let app = TestApp::new();
    let fx = app.fixture().await;
    app.state
        .repos
        .restaurants
        .update(
            fx.restaurant.id,
            RestaurantUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let res = app
        .post(
            "/orders",
            None,
            json!({ "restaurantId": fx.restaurant.id, "items": [{ "menuItemId": fx.item_id, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_flow_and_final_states() {
    let app = TestApp::new();
    let fx = app.fixture().await;
    let res = app
        .post(
            "/orders",
            None,
            json!({ "restaurantId": fx.restaurant.id, "items": [{ "menuItemId": fx.item_id, "quantity": 1 }] }),
        )
        .await;
    let order_id = res.body["data"]["id"].as_i64().unwrap();

    assert_eq!(set_status(&app, &fx.owner_token, order_id, "PREPARING").await.status, StatusCode::OK);
    // Backwards is rejected
    assert_eq!(set_status(&app, &fx.owner_token, order_id, "CONFIRMED").await.status, StatusCode::CONFLICT);
    assert_eq!(set_status(&app, &fx.owner_token, order_id, "COMPLETED").await.status, StatusCode::OK);
    // Final
    let res = set_status(&app, &fx.owner_token, order_id, "CANCELLED").await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"]["statusCode"], 409);
}

#[tokio::test]
async fn test_only_managers_change_status() {
    let app = TestApp::new();
    let fx = app.fixture().await;
    let (_, customer_token) = app
        .create_user("diner@example.com", UserRole::Customer, None)
        .await;
    let (_, staff_token) = app
        .create_user("cook@example.com", UserRole::Staff, Some(fx.restaurant.id))
        .await;
    let (_, stranger_token) = app
        .create_user("stranger@example.com", UserRole::Staff, None)
        .await;

    let res = app
        .post(
            "/orders",
            Some(&customer_token),
            json!({ "restaurantId": fx.restaurant.id, "items": [{ "menuItemId": fx.item_id, "quantity": 1 }] }),
        )
        .await;
    let order_id = res.body["data"]["id"].as_i64().unwrap();

    assert_eq!(set_status(&app, &customer_token, order_id, "CONFIRMED").await.status, StatusCode::FORBIDDEN);
    assert_eq!(set_status(&app, &stranger_token, order_id, "CONFIRMED").await.status, StatusCode::FORBIDDEN);
    assert_eq!(set_status(&app, &staff_token, order_id, "CONFIRMED").await.status, StatusCode::OK);

    // The customer can still read it, the stranger cannot
    assert_eq!(app.get(&format!("/orders/{order_id}"), Some(&customer_token)).await.status, StatusCode::OK);
    assert_eq!(app.get(&format!("/orders/{order_id}"), Some(&stranger_token)).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_customer_cancels_only_pending() {
    let app = TestApp::new();
    let fx = app.fixture().await;
    let (_, customer_token) = app
        .create_user("diner@example.com", UserRole::Customer, None)
        .await;
    let first = place_simple_order(&app, &customer_token, &fx).await;
    let res = app
        .post(&format!("/orders/{first}/cancel"), Some(&customer_token), json!({}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "CANCELLED");

    let second = place_simple_order(&app, &customer_token, &fx).await;
    set_status(&app, &fx.owner_token, second, "CONFIRMED").await;
    let res = app
        .post(&format!("/orders/{second}/cancel"), Some(&customer_token), json!({}))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    // Managers may still cancel it
    let res = app
        .post(&format!("/orders/{second}/cancel"), Some(&fx.owner_token), json!({}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_order_listing_scopes() {
    let app = TestApp::new();
    let fx = app.fixture().await;
    let (_, alice) = app
        .create_user("alice@example.com", UserRole::Customer, None)
        .await;
    let (_, bob) = app
        .create_user("bob@example.com", UserRole::Customer, None)
        .await;

    for token in [&alice, &alice, &bob] {
        app.post(
            "/orders",
            Some(token),
            json!({ "restaurantId": fx.restaurant.id, "items": [{ "menuItemId": fx.item_id, "quantity": 1 }] }),
        )
        .await;
    }

    let res = app.get("/orders", Some(&alice)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["pagination"]["total"], 2);

    let scoped = format!("/orders?restaurantId={}", fx.restaurant.id);
    assert_eq!(app.get(&scoped, Some(&alice)).await.status, StatusCode::FORBIDDEN);

    let res = app.get(&scoped, Some(&fx.owner_token)).await;
    assert_eq!(res.body["data"]["pagination"]["total"], 3);

    let res = app
        .get(&format!("{scoped}&status=CONFIRMED"), Some(&fx.owner_token))
        .await;
    assert_eq!(res.body["data"]["pagination"]["total"], 0);

    assert_eq!(app.get("/orders", None).await.status, StatusCode::UNAUTHORIZED);
}
