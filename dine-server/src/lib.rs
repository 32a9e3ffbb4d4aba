//! dine-server: restaurant ordering API
//!
//! - REST API for accounts, restaurants, menus, tables, orders and users
//! - WebSocket channel pushing order notifications to restaurant rooms and
//!   customer channels
//! - PostgreSQL storage behind repository traits

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod live;
pub mod logger;
pub mod orders;
pub mod state;
pub mod util;

pub use config::Config;
pub use state::AppState;
