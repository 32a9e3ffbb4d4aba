//! HTTP surface: auth, error envelope, resource permissions

mod common;

use axum::body::Body;
use common::{API, TestApp, test_config};
use dine_server::config::Config;
use http::{Method, Request, StatusCode, header};
use serde_json::json;
use shared::models::UserRole;

fn session_cookie(res: &common::TestResponse) -> String {
    let set_cookie = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

// ========== Auth ==========

#[tokio::test]
async fn test_register_login_me_logout() {
    let app = TestApp::new();

    let res = app
        .post(
            "/auth/register",
            None,
            json!({ "email": "Ada@Example.com", "password": "correct-horse", "name": "Ada" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["user"]["email"], "ada@example.com");
    assert_eq!(res.body["data"]["user"]["role"], "CUSTOMER");
    assert!(res.body["data"]["user"].get("passwordHash").is_none());
    let cookie = session_cookie(&res);
    assert!(cookie.starts_with("token="));

    // Duplicate email, differently cased
    let res = app
        .post(
            "/auth/register",
            None,
            json!({ "email": "ADA@example.com", "password": "another-pass", "name": "Ada 2" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"]["statusCode"], 409);

    let res = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let token = res.body["data"]["token"].as_str().unwrap().to_string();

    let res = app.get("/auth/me", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "Ada");

    // Signed cookie works in place of the bearer header
    let request = Request::builder()
        .uri(format!("{API}/auth/me"))
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status, StatusCode::OK);

    // Tampered cookie is rejected
    let request = Request::builder()
        .uri(format!("{API}/auth/me"))
        .header(header::COOKIE, format!("{cookie}00"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status, StatusCode::UNAUTHORIZED);

    let res = app.post("/auth/logout", None, json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    let cleared = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_register_role_rules() {
    let app = TestApp::new();

    let res = app
        .post(
            "/auth/register",
            None,
            json!({ "email": "o@example.com", "password": "password-1", "name": "O", "role": "OWNER" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["user"]["role"], "OWNER");

    for role in ["STAFF", "ADMIN"] {
        let res = app
            .post(
                "/auth/register",
                None,
                json!({ "email": format!("{role}@example.com"), "password": "password-1", "name": "X", "role": role }),
            )
            .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "{role}");
    }

    let res = app
        .post(
            "/auth/register",
            None,
            json!({ "email": "not-an-email", "password": "short", "name": "" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let details = &res.body["error"]["details"];
    assert!(details.get("email").is_some());
    assert!(details.get("password").is_some());
}

#[tokio::test]
async fn test_login_rate_limited_per_ip() {
    let app = TestApp::new();
    let body = json!({ "email": "nobody@example.com", "password": "whatever-1" });
    for _ in 0..5 {
        let res = app
            .request_from("192.0.2.7", Method::POST, &format!("{API}/auth/login"), None, Some(body.clone()))
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }
    let res = app
        .request_from("192.0.2.7", Method::POST, &format!("{API}/auth/login"), None, Some(body.clone()))
        .await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.body["error"]["statusCode"], 429);

    // Another client is unaffected
    let res = app
        .request_from("192.0.2.8", Method::POST, &format!("{API}/auth/login"), None, Some(body))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_global_rate_limit() {
    let app = TestApp::with_config(Config {
        rate_limit_max: 2,
        ..test_config()
    });
    for _ in 0..2 {
        let res = app
            .request_from("198.51.100.1", Method::GET, &format!("{API}/restaurants"), None, None)
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }
    let res = app
        .request_from("198.51.100.1", Method::GET, &format!("{API}/restaurants"), None, None)
        .await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);

    // Health sits outside the API limiter
    let res = app
        .request_from("198.51.100.1", Method::GET, "/health", None, None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

// ========== Error envelope ==========

#[tokio::test]
async fn test_unknown_route_envelope() {
    let app = TestApp::new();

    let res = app.get("/nothing-here", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["error"]["statusCode"], 404);
    assert_eq!(res.body["error"]["message"], "Route not found");
    assert_eq!(res.body["error"]["path"], "/api/v1/nothing-here");
    assert_eq!(res.body["error"]["method"], "GET");
    assert!(res.body["error"]["timestamp"].is_string());

    let res = app.request(Method::GET, "/elsewhere", None, None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"]["path"], "/elsewhere");
}

#[tokio::test]
async fn test_rejections_are_enveloped() {
    let app = TestApp::new();

    // Malformed JSON
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("{API}/auth/login"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();
    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["error"]["method"], "POST");

    // Bad path parameter
    let res = app.get("/restaurants/not-a-number", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"]["statusCode"], 400);

    // Wrong method
    let res = app
        .request(Method::DELETE, &format!("{API}/auth/me"), None, None)
        .await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.body["error"]["statusCode"], 405);

    // Missing credentials
    let res = app.get("/auth/me", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"]["path"], "/api/v1/auth/me");

    // Garbage token
    let res = app.get("/auth/me", Some("not.a.jwt")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_details_hidden_outside_development() {
    let app = TestApp::with_config(Config {
        environment: "production".into(),
        ..test_config()
    });
    let res = app
        .post("/auth/register", None, json!({ "email": "bad", "password": "x", "name": "" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["error"].get("details").is_none());
    assert!(res.body["error"]["message"].is_string());
}

// ========== Restaurants ==========

#[tokio::test]
async fn test_restaurant_lifecycle() {
    let app = TestApp::new();
    let (_, owner) = app.create_user("owner@example.com", UserRole::Owner, None).await;
    let (_, rival) = app.create_user("rival@example.com", UserRole::Owner, None).await;
    let (_, customer) = app.create_user("c@example.com", UserRole::Customer, None).await;
    let (_, admin) = app.create_user("admin@example.com", UserRole::Admin, None).await;

    let res = app
        .post("/restaurants", Some(&customer), json!({ "name": "Nope" }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .post("/restaurants", Some(&owner), json!({ "name": "Chez Ada & Co" }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["slug"], "chez-ada-co");
    let id = res.body["data"]["id"].as_i64().unwrap();

    let res = app
        .post("/restaurants", Some(&rival), json!({ "name": "Chez Ada Co" }))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .post("/restaurants", Some(&owner), json!({ "name": "Bad", "slug": "Not A Slug" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let update = |token: String, body: serde_json::Value| {
        let app = &app;
        async move {
            app.request(
                Method::PUT,
                &format!("{API}/restaurants/{id}"),
                Some(&token),
                Some(body),
            )
            .await
        }
    };
    assert_eq!(
        update(rival.clone(), json!({ "name": "Mine now" })).await.status,
        StatusCode::FORBIDDEN
    );
    let res = update(owner.clone(), json!({ "description": "Cosy", "isActive": false })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["description"], "Cosy");

    // Inactive restaurants are only listed for admins who ask
    let res = app.get("/restaurants", None).await;
    assert_eq!(res.body["data"]["pagination"]["total"], 0);
    let res = app.get("/restaurants?includeInactive=true", Some(&owner)).await;
    assert_eq!(res.body["data"]["pagination"]["total"], 0);
    let res = app.get("/restaurants?includeInactive=true", Some(&admin)).await;
    assert_eq!(res.body["data"]["pagination"]["total"], 1);

    let res = app
        .request(Method::DELETE, &format!("{API}/restaurants/{id}"), Some(&owner), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.get(&format!("/restaurants/{id}"), None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_restaurant_search_and_pagination() {
    let app = TestApp::new();
    let (_, owner) = app.create_user("owner@example.com", UserRole::Owner, None).await;
    for name in ["Pizza Place", "Pizza Palace", "Sushi Bar"] {
        let res = app.post("/restaurants", Some(&owner), json!({ "name": name })).await;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    let res = app.get("/restaurants?search=pizza&limit=1", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(res.body["data"]["pagination"]["total"], 2);
    assert_eq!(res.body["data"]["pagination"]["totalPages"], 2);
}

// ========== Menus and tables ==========

#[tokio::test]
async fn test_menu_tree_management() {
    let app = TestApp::new();
    let fx = app.fixture().await;
    let (_, staff) = app
        .create_user("staff@example.com", UserRole::Staff, Some(fx.restaurant.id))
        .await;
    let (_, outsider) = app.create_user("out@example.com", UserRole::Owner, None).await;

    let res = app
        .post(
            "/menus",
            Some(&outsider),
            json!({ "restaurantId": fx.restaurant.id, "name": "Hijack" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .post(
            "/menus",
            Some(&staff),
            json!({ "restaurantId": fx.restaurant.id, "name": "Drinks", "sortOrder": 5 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let menu_id = res.body["data"]["id"].as_i64().unwrap();

    let res = app
        .post(&format!("/menus/{menu_id}/categories"), Some(&staff), json!({ "name": "Cold" }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let category_id = res.body["data"]["id"].as_i64().unwrap();

    let res = app
        .post(
            &format!("/menus/categories/{category_id}/items"),
            Some(&fx.owner_token),
            json!({ "name": "Iced Tea", "price": 3.5 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let item_id = res.body["data"]["id"].as_i64().unwrap();

    let res = app
        .post(
            &format!("/menus/categories/{category_id}/items"),
            Some(&fx.owner_token),
            json!({ "name": "Refund", "price": -1.0 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post(
            &format!("/menus/items/{item_id}/variants"),
            Some(&staff),
            json!({ "name": "Large", "priceDelta": 1.0 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = app.get(&format!("/menus/{menu_id}"), None).await;
    assert_eq!(res.status, StatusCode::OK);
    let tree = &res.body["data"];
    assert_eq!(tree["name"], "Drinks");
    assert_eq!(tree["categories"][0]["name"], "Cold");
    assert_eq!(tree["categories"][0]["items"][0]["name"], "Iced Tea");
    assert_eq!(tree["categories"][0]["items"][0]["variants"][0]["name"], "Large");

    let res = app
        .get(&format!("/menus?restaurantId={}", fx.restaurant.id), None)
        .await;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 2);

    let res = app
        .request(Method::DELETE, &format!("{API}/menus/items/{item_id}"), Some(&outsider), None)
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app
        .request(Method::DELETE, &format!("{API}/menus/{menu_id}"), Some(&staff), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.get(&format!("/menus/{menu_id}"), None).await.status, StatusCode::NOT_FOUND);
    let res = app
        .request(Method::DELETE, &format!("{API}/menus/items/{item_id}"), Some(&staff), None)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tables() {
    let app = TestApp::new();
    let fx = app.fixture().await;
    let (_, customer) = app.create_user("c@example.com", UserRole::Customer, None).await;
    let rid = fx.restaurant.id;

    let res = app
        .post("/tables", Some(&customer), json!({ "restaurantId": rid, "number": "A1" }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .post("/tables", Some(&fx.owner_token), json!({ "restaurantId": rid, "number": "A1" }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["capacity"], 4);
    let table_id = res.body["data"]["id"].as_i64().unwrap();

    let res = app
        .post("/tables", Some(&fx.owner_token), json!({ "restaurantId": rid, "number": "A1" }))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .post(
            "/tables",
            Some(&fx.owner_token),
            json!({ "restaurantId": rid, "number": "this-number-is-way-too-long" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .request(
            Method::PUT,
            &format!("{API}/tables/{table_id}"),
            Some(&fx.owner_token),
            Some(json!({ "capacity": 8 })),
        )
        .await;
    assert_eq!(res.body["data"]["capacity"], 8);

    let res = app.get(&format!("/tables?restaurantId={rid}"), None).await;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    let res = app.get(&format!("/restaurants/{rid}/tables"), None).await;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
}

// ========== Users ==========

#[tokio::test]
async fn test_user_management() {
    let app = TestApp::new();
    let (admin, admin_token) = app.create_user("admin@example.com", UserRole::Admin, None).await;
    let (alice, alice_token) = app.create_user("alice@example.com", UserRole::Customer, None).await;
    let (bob, _) = app.create_user("bob@example.com", UserRole::Customer, None).await;

    assert_eq!(app.get("/users", Some(&alice_token)).await.status, StatusCode::FORBIDDEN);
    let res = app.get("/users?role=CUSTOMER", Some(&admin_token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["pagination"]["total"], 2);

    assert_eq!(app.get(&format!("/users/{}", alice.id), Some(&alice_token)).await.status, StatusCode::OK);
    assert_eq!(app.get(&format!("/users/{}", bob.id), Some(&alice_token)).await.status, StatusCode::FORBIDDEN);

    let put = |token: String, id: i64, body: serde_json::Value| {
        let app = &app;
        async move {
            app.request(Method::PUT, &format!("{API}/users/{id}"), Some(&token), Some(body))
                .await
        }
    };
    let res = put(alice_token.clone(), alice.id, json!({ "name": "Alice B" })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "Alice B");

    let res = put(alice_token.clone(), alice.id, json!({ "role": "ADMIN" })).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = put(admin_token.clone(), bob.id, json!({ "role": "OWNER" })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["role"], "OWNER");

    let res = app
        .request(Method::DELETE, &format!("{API}/users/{}", admin.id), Some(&admin_token), None)
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .request(Method::DELETE, &format!("{API}/users/{}", bob.id), Some(&alice_token), None)
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .request(Method::DELETE, &format!("{API}/users/{}", bob.id), Some(&admin_token), None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.get(&format!("/users/{}", bob.id), Some(&admin_token)).await.status, StatusCode::NOT_FOUND);
}

// ========== Health and realtime ==========

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let res = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ok");
    assert_eq!(res.body["environment"], "development");
    assert_eq!(res.body["apiVersion"], "v1");
    assert_eq!(res.body["realtime"], true);
    assert!(res.body["uptimeSeconds"].is_u64());
    assert!(res.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_realtime_disabled() {
    let app = TestApp::with_config(Config {
        realtime_enabled: false,
        ..test_config()
    });
    assert!(!app.state.notifier.is_enabled());

    let res = app.request(Method::GET, "/ws", None, None).await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body["error"]["statusCode"], 503);

    // Orders still work, notifications are no-ops
    let fx = app.fixture().await;
    let res = app
        .post(
            "/orders",
            None,
            json!({ "restaurantId": fx.restaurant.id, "items": [{ "menuItemId": fx.item_id, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_realtime_stats_admin_only() {
    let app = TestApp::new();
    let (_, admin) = app.create_user("admin@example.com", UserRole::Admin, None).await;
    let (_, customer) = app.create_user("c@example.com", UserRole::Customer, None).await;

    let hub = app.state.notifier.hub().cloned().unwrap();
    let (a, _rx_a) = hub.connect();
    let (_b, _rx_b) = hub.connect();
    hub.join_restaurant(a, 42);

    assert_eq!(app.get("/realtime/stats", Some(&customer)).await.status, StatusCode::FORBIDDEN);
    let res = app.get("/realtime/stats", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["totalConnections"], 2);
    assert_eq!(res.body["data"]["restaurants"], json!([42]));

    // Versioned like every other API route
    let res = app
        .request(Method::GET, "/api/realtime/stats", Some(&admin), None)
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
