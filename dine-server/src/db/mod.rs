//! Database access layer
//!
//! Each resource has a repository trait with a PostgreSQL implementation.
//! Handlers only see the traits through [`Repositories`], so tests can run
//! against the in-memory store (`test-support` feature).

pub mod dining_tables;
pub mod menus;
pub mod orders;
pub mod restaurants;
pub mod users;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use shared::error::{AppError, ErrorCode};
use sqlx::PgPool;
use sqlx::error::ErrorKind;
use sqlx::postgres::PgPoolOptions;

use crate::config::{BoxError, Config};

pub use dining_tables::{PgTableRepository, TableRepository};
pub use menus::{MenuNode, MenuRepository, PgMenuRepository, PricedItem};
pub use orders::{NewOrder, NewOrderItem, OrderFilter, OrderRepository, PgOrderRepository};
pub use restaurants::{
    NewRestaurant, PgRestaurantRepository, RestaurantFilter, RestaurantRepository,
};
pub use users::{NewUser, PgUserRepository, UserChanges, UserRepository};

/// Errors surfaced by repositories
///
/// Constraint names are kept so callers can pick a precise error code.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("database error: {0}")]
    Backend(#[source] sqlx::Error),
}

impl DbError {
    fn classify(err: &sqlx::Error) -> Option<Self> {
        let db = match err {
            sqlx::Error::RowNotFound => return Some(Self::NotFound),
            sqlx::Error::Database(db) => db,
            _ => return None,
        };
        let constraint = db.constraint().unwrap_or_default().to_string();
        match db.kind() {
            ErrorKind::UniqueViolation => Some(Self::UniqueViolation(constraint)),
            ErrorKind::ForeignKeyViolation => Some(Self::ForeignKeyViolation(constraint)),
            ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                Some(Self::InvalidData(db.message().to_string()))
            }
            // invalid_text_representation (e.g. bad enum literal)
            _ if db.code().as_deref() == Some("22P02") => {
                Some(Self::InvalidData(db.message().to_string()))
            }
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        Self::classify(&err).unwrap_or(Self::Backend(err))
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => AppError::new(ErrorCode::NotFound),
            DbError::UniqueViolation(constraint) => {
                AppError::conflict("A record with the same unique value already exists")
                    .with_detail("constraint", constraint)
            }
            DbError::ForeignKeyViolation(constraint) => AppError::new(ErrorCode::InvalidReference)
                .with_detail("constraint", constraint),
            DbError::InvalidData(cause) => {
                AppError::validation("Invalid data").with_detail("cause", cause)
            }
            DbError::Backend(e) => {
                tracing::error!(error = %e, "Database error");
                AppError::new(ErrorCode::DatabaseError).with_detail("cause", e.to_string())
            }
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Pagination window passed down to list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
}

impl From<shared::request::Page> for Window {
    fn from(page: shared::request::Page) -> Self {
        Self {
            limit: page.limit(),
            offset: page.offset(),
        }
    }
}

/// Repository handles shared by all handlers
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub restaurants: Arc<dyn RestaurantRepository>,
    pub tables: Arc<dyn TableRepository>,
    pub menus: Arc<dyn MenuRepository>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            restaurants: Arc::new(PgRestaurantRepository::new(pool.clone())),
            tables: Arc::new(PgTableRepository::new(pool.clone())),
            menus: Arc::new(PgMenuRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool)),
        }
    }

    /// All repositories backed by one shared in-memory store
    #[cfg(any(test, feature = "test-support"))]
    pub fn in_memory() -> (Self, memory::MemoryStore) {
        let store = memory::MemoryStore::new();
        let repos = Self {
            users: Arc::new(store.clone()),
            restaurants: Arc::new(store.clone()),
            tables: Arc::new(store.clone()),
            menus: Arc::new(store.clone()),
            orders: Arc::new(store.clone()),
        };
        (repos, store)
    }
}

/// Open the connection pool and apply migrations when configured
pub async fn connect(config: &Config) -> Result<PgPool, BoxError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;
    tracing::info!(
        max_connections = config.database_max_connections,
        "Database pool ready"
    );

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound));
    }

    #[test]
    fn test_db_error_to_app_error() {
        let err: AppError = DbError::UniqueViolation("orders_order_number_key".into()).into();
        assert_eq!(err.http_status().as_u16(), 409);
        assert_eq!(
            err.details.unwrap().get("constraint").unwrap(),
            "orders_order_number_key"
        );

        let err: AppError = DbError::ForeignKeyViolation("orders_table_id_fkey".into()).into();
        assert_eq!(err.code, ErrorCode::InvalidReference);
        assert_eq!(err.http_status().as_u16(), 400);

        let err: AppError = DbError::NotFound.into();
        assert_eq!(err.http_status().as_u16(), 404);

        let err: AppError = DbError::InvalidData("null value".into()).into();
        assert_eq!(err.http_status().as_u16(), 400);
    }

    #[test]
    fn test_backend_error_is_500() {
        let err: AppError = DbError::Backend(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.http_status().as_u16(), 500);
    }
}
