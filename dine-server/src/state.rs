//! Application state shared by all handlers

use std::sync::Arc;
use std::time::Instant;

use crate::auth::{JwtService, RateLimiter};
use crate::config::{BoxError, Config};
use crate::crypto::CookieSigner;
use crate::db::{self, Repositories};
use crate::live::OrderNotifier;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Data access, one repository per resource
    pub repos: Repositories,
    pub jwt: JwtService,
    /// Signs the session cookie
    pub cookies: CookieSigner,
    /// Real-time order notifications (no-op while disabled)
    pub notifier: OrderNotifier,
    /// Per-IP request counters
    pub rate_limiter: RateLimiter,
    pub started_at: Instant,
}

impl AppState {
    /// Connect to PostgreSQL and build the state
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = db::connect(config).await?;
        Ok(Self::with_repositories(config.clone(), Repositories::postgres(pool)))
    }

    /// Build the state around existing repositories
    pub fn with_repositories(config: Config, repos: Repositories) -> Self {
        let notifier = OrderNotifier::new();
        if config.realtime_enabled {
            notifier.initialize();
            tracing::info!("Realtime notifications enabled");
        } else {
            tracing::info!("Realtime notifications disabled");
        }

        Self {
            jwt: JwtService::new(&config.jwt_secret, config.jwt_expires_hours),
            cookies: CookieSigner::new(&config.cookie_secret, !config.is_development()),
            config: Arc::new(config),
            repos,
            notifier,
            rate_limiter: RateLimiter::new(),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
