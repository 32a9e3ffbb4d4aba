//! Restaurants

use async_trait::async_trait;
use shared::models::{Restaurant, RestaurantUpdate};
use sqlx::PgPool;

use super::{DbError, DbResult, Window};

/// Insert payload; the slug is already resolved
#[derive(Debug, Clone)]
pub struct NewRestaurant {
    pub owner_id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RestaurantFilter {
    /// Case-insensitive substring match on the name
    pub search: Option<String>,
    pub owner_id: Option<i64>,
    pub include_inactive: bool,
}

#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    async fn create(&self, new: NewRestaurant) -> DbResult<Restaurant>;
    async fn find_by_id(&self, id: i64) -> DbResult<Option<Restaurant>>;
    async fn list(&self, filter: RestaurantFilter, window: Window)
    -> DbResult<(Vec<Restaurant>, i64)>;
    async fn update(&self, id: i64, changes: RestaurantUpdate) -> DbResult<Restaurant>;
    async fn delete(&self, id: i64) -> DbResult<()>;
}

pub struct PgRestaurantRepository {
    pool: PgPool,
}

impl PgRestaurantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RESTAURANT_COLUMNS: &str = "id, owner_id, name, slug, description, address, phone, email, \
     is_active, created_at, updated_at";

const RESTAURANT_FILTER: &str = r#"
    ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
    AND ($2::bigint IS NULL OR owner_id = $2)
    AND ($3 OR is_active)
"#;

#[async_trait]
impl RestaurantRepository for PgRestaurantRepository {
    async fn create(&self, new: NewRestaurant) -> DbResult<Restaurant> {
        let now = shared::util::now_millis();
        let restaurant = sqlx::query_as(&format!(
            r#"
            INSERT INTO restaurants (
                id, owner_id, name, slug, description, address, phone, email,
                is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, $9)
            RETURNING {RESTAURANT_COLUMNS}
            "#
        ))
        .bind(shared::util::snowflake_id())
        .bind(new.owner_id)
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(&new.address)
        .bind(&new.phone)
        .bind(&new.email)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(restaurant)
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<Restaurant>> {
        let restaurant = sqlx::query_as(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(restaurant)
    }

    async fn list(
        &self,
        filter: RestaurantFilter,
        window: Window,
    ) -> DbResult<(Vec<Restaurant>, i64)> {
        let rows: Vec<Restaurant> = sqlx::query_as(&format!(
            r#"
            SELECT {RESTAURANT_COLUMNS} FROM restaurants
            WHERE {RESTAURANT_FILTER}
            ORDER BY name, id
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(&filter.search)
        .bind(filter.owner_id)
        .bind(filter.include_inactive)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM restaurants WHERE {RESTAURANT_FILTER}"
        ))
        .bind(&filter.search)
        .bind(filter.owner_id)
        .bind(filter.include_inactive)
        .fetch_one(&self.pool)
        .await?;
        Ok((rows, total))
    }

    async fn update(&self, id: i64, changes: RestaurantUpdate) -> DbResult<Restaurant> {
        let restaurant: Option<Restaurant> = sqlx::query_as(&format!(
            r#"
            UPDATE restaurants SET
                name = COALESCE($1, name),
                slug = COALESCE($2, slug),
                description = COALESCE($3, description),
                address = COALESCE($4, address),
                phone = COALESCE($5, phone),
                email = COALESCE($6, email),
                is_active = COALESCE($7, is_active),
                updated_at = $8
            WHERE id = $9
            RETURNING {RESTAURANT_COLUMNS}
            "#
        ))
        .bind(&changes.name)
        .bind(&changes.slug)
        .bind(&changes.description)
        .bind(&changes.address)
        .bind(&changes.phone)
        .bind(&changes.email)
        .bind(changes.is_active)
        .bind(shared::util::now_millis())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        restaurant.ok_or(DbError::NotFound)
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM restaurants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
