//! Dining tables

use async_trait::async_trait;
use shared::models::{DEFAULT_TABLE_CAPACITY, DiningTable, DiningTableCreate, DiningTableUpdate};
use sqlx::PgPool;

use super::{DbError, DbResult};

#[async_trait]
pub trait TableRepository: Send + Sync {
    async fn create(&self, data: DiningTableCreate) -> DbResult<DiningTable>;
    async fn find_by_id(&self, id: i64) -> DbResult<Option<DiningTable>>;
    async fn list_by_restaurant(&self, restaurant_id: i64) -> DbResult<Vec<DiningTable>>;
    async fn update(&self, id: i64, changes: DiningTableUpdate) -> DbResult<DiningTable>;
    async fn delete(&self, id: i64) -> DbResult<()>;
}

pub struct PgTableRepository {
    pool: PgPool,
}

impl PgTableRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TABLE_COLUMNS: &str = "id, restaurant_id, number, capacity, is_active, created_at, updated_at";

#[async_trait]
impl TableRepository for PgTableRepository {
    async fn create(&self, data: DiningTableCreate) -> DbResult<DiningTable> {
        let now = shared::util::now_millis();
        let table = sqlx::query_as(&format!(
            r#"
            INSERT INTO dining_tables (id, restaurant_id, number, capacity, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, $5)
            RETURNING {TABLE_COLUMNS}
            "#
        ))
        .bind(shared::util::snowflake_id())
        .bind(data.restaurant_id)
        .bind(data.number.trim())
        .bind(data.capacity.unwrap_or(DEFAULT_TABLE_CAPACITY))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(table)
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<DiningTable>> {
        let table = sqlx::query_as(&format!(
            "SELECT {TABLE_COLUMNS} FROM dining_tables WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(table)
    }

    async fn list_by_restaurant(&self, restaurant_id: i64) -> DbResult<Vec<DiningTable>> {
        let tables = sqlx::query_as(&format!(
            r#"
            SELECT {TABLE_COLUMNS} FROM dining_tables
            WHERE restaurant_id = $1
            ORDER BY number
            "#
        ))
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn update(&self, id: i64, changes: DiningTableUpdate) -> DbResult<DiningTable> {
        let table: Option<DiningTable> = sqlx::query_as(&format!(
            r#"
            UPDATE dining_tables SET
                number = COALESCE($1, number),
                capacity = COALESCE($2, capacity),
                is_active = COALESCE($3, is_active),
                updated_at = $4
            WHERE id = $5
            RETURNING {TABLE_COLUMNS}
            "#
        ))
        .bind(changes.number.as_deref().map(str::trim))
        .bind(changes.capacity)
        .bind(changes.is_active)
        .bind(shared::util::now_millis())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        table.ok_or(DbError::NotFound)
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM dining_tables WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
