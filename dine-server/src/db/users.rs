//! User accounts

use async_trait::async_trait;
use shared::models::{User, UserRole};
use sqlx::PgPool;

use super::{DbError, DbResult, Window};

/// Insert payload (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub restaurant_id: Option<i64>,
}

/// Partial update; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub restaurant_id: Option<i64>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new: NewUser) -> DbResult<User>;
    async fn find_by_id(&self, id: i64) -> DbResult<Option<User>>;
    /// Lookup by normalized (lowercase) email
    async fn find_by_email(&self, email: &str) -> DbResult<Option<User>>;
    async fn list(&self, role: Option<UserRole>, window: Window) -> DbResult<(Vec<User>, i64)>;
    async fn update(&self, id: i64, changes: UserChanges) -> DbResult<User>;
    async fn delete(&self, id: i64) -> DbResult<()>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, phone, role, restaurant_id, created_at, updated_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new: NewUser) -> DbResult<User> {
        let now = shared::util::now_millis();
        let user: User = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, phone, role, restaurant_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(shared::util::snowflake_id())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(&new.phone)
        .bind(new.role)
        .bind(new.restaurant_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list(&self, role: Option<UserRole>, window: Window) -> DbResult<(Vec<User>, i64)> {
        let users: Vec<User> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(role)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE ($1::user_role IS NULL OR role = $1)")
                .bind(role)
                .fetch_one(&self.pool)
                .await?;
        Ok((users, total))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> DbResult<User> {
        let user: Option<User> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($1, name),
                phone = COALESCE($2, phone),
                password_hash = COALESCE($3, password_hash),
                role = COALESCE($4, role),
                restaurant_id = COALESCE($5, restaurant_id),
                updated_at = $6
            WHERE id = $7
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&changes.name)
        .bind(&changes.phone)
        .bind(&changes.password_hash)
        .bind(changes.role)
        .bind(changes.restaurant_id)
        .bind(shared::util::now_millis())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        user.ok_or(DbError::NotFound)
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
