//! In-process test harness: full router over the in-memory store

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::Router;
use axum::body::Body;
use dine_server::api::create_router;
use dine_server::config::Config;
use dine_server::db::memory::MemoryStore;
use dine_server::db::{NewRestaurant, NewUser, Repositories};
use dine_server::state::AppState;
use http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::models::{
    CategoryCreate, MenuCreate, MenuItemCreate, Restaurant, User, UserRole, VariantCreate,
};
use tower::ServiceExt;

pub const API: &str = "/api/v1";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
    router: Router,
    next_ip: AtomicU32,
}

/// A seeded restaurant with one menu item (and a "Large" variant)
pub struct Fixture {
    pub restaurant: Restaurant,
    pub owner_token: String,
    pub item_id: i64,
    pub variant_id: i64,
}

pub fn test_config() -> Config {
    Config {
        rate_limit_max: 10_000,
        ..Config::default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let (repos, store) = Repositories::in_memory();
        Self::with_repositories(config, repos, store)
    }

    pub fn with_repositories(config: Config, repos: Repositories, store: MemoryStore) -> Self {
        let state = AppState::with_repositories(config, repos);
        Self {
            router: create_router(state.clone()),
            state,
            store,
            next_ip: AtomicU32::new(1),
        }
    }

    /// Serve the router on an ephemeral local port for real socket clients
    pub async fn spawn_server(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });
        addr
    }

    /// Send a request; each call comes from a distinct client IP
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let n = self.next_ip.fetch_add(1, Ordering::Relaxed);
        let ip = format!("10.{}.{}.{}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff);
        self.request_from(&ip, method, uri, token, body).await
    }

    pub async fn request_from(
        &self,
        ip: &str,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", ip);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, &format!("{API}{path}"), token, None)
            .await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, &format!("{API}{path}"), token, Some(body))
            .await
    }

    /// Insert a user straight into the store and mint a token for it
    pub async fn create_user(
        &self,
        email: &str,
        role: UserRole,
        restaurant_id: Option<i64>,
    ) -> (User, String) {
        let user = self
            .state
            .repos
            .users
            .create(NewUser {
                email: email.to_string(),
                password_hash: "not-a-real-hash".to_string(),
                name: email.split('@').next().unwrap_or("user").to_string(),
                phone: None,
                role,
                restaurant_id,
            })
            .await
            .unwrap();
        let token = self.state.jwt.generate_token(&user).unwrap();
        (user, token)
    }

    /// Owner, restaurant, menu, one item priced 10.00 with a +2.50 variant
    pub async fn fixture(&self) -> Fixture {
        let (owner, owner_token) = self
            .create_user("owner@example.com", UserRole::Owner, None)
            .await;
        let repos = &self.state.repos;
        let restaurant = repos
            .restaurants
            .create(NewRestaurant {
                owner_id: owner.id,
                name: "Test Bistro".into(),
                slug: "test-bistro".into(),
                description: None,
                address: None,
                phone: None,
                email: None,
            })
            .await
            .unwrap();
        let menu = repos
            .menus
            .create_menu(MenuCreate {
                restaurant_id: restaurant.id,
                name: "Main".into(),
                description: None,
                is_active: None,
                sort_order: None,
            })
            .await
            .unwrap();
        let category = repos
            .menus
            .create_category(
                menu.id,
                CategoryCreate {
                    name: "Mains".into(),
                    sort_order: None,
                },
            )
            .await
            .unwrap();
        let item = repos
            .menus
            .create_item(
                category.id,
                MenuItemCreate {
                    name: "Burger".into(),
                    description: None,
                    price: Decimal::new(1000, 2),
                    image_url: None,
                    is_available: Some(true),
                    sort_order: None,
                },
            )
            .await
            .unwrap();
        let variant = repos
            .menus
            .create_variant(
                item.id,
                VariantCreate {
                    name: "Large".into(),
                    price_delta: Decimal::new(250, 2),
                },
            )
            .await
            .unwrap();
        Fixture {
            restaurant,
            owner_token,
            item_id: item.id,
            variant_id: variant.id,
        }
    }
}
