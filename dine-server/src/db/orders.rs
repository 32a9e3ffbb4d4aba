//! Orders and order items

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{Order, OrderItem, OrderStatus};
use sqlx::PgPool;

use super::{DbResult, Window};

/// Priced order ready to insert
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub restaurant_id: i64,
    pub table_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub notes: Option<String>,
    pub total: Decimal,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub menu_item_id: i64,
    pub variant_id: Option<i64>,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub restaurant_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert the order and its items atomically, status PENDING
    async fn create(&self, new: NewOrder) -> DbResult<Order>;
    async fn find_by_id(&self, id: i64) -> DbResult<Option<Order>>;
    /// Newest first
    async fn list(&self, filter: OrderFilter, window: Window) -> DbResult<(Vec<Order>, i64)>;
    /// Compare-and-set status change; `None` when the order is missing or
    /// no longer in `expected`
    async fn update_status(
        &self,
        id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> DbResult<Option<Order>>;
}

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_items(&self, orders: &mut [Order]) -> DbResult<()> {
        if orders.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let items: Vec<OrderItem> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in orders.iter_mut() {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(())
    }
}

const ORDER_COLUMNS: &str = "id, order_number, restaurant_id, table_id, customer_id, status, \
     total, notes, created_at, updated_at";
const ITEM_COLUMNS: &str =
    "id, order_id, menu_item_id, variant_id, name, unit_price, quantity, notes";

const ORDER_FILTER: &str = r#"
    ($1::bigint IS NULL OR restaurant_id = $1)
    AND ($2::bigint IS NULL OR customer_id = $2)
    AND ($3::order_status IS NULL OR status = $3)
"#;

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, new: NewOrder) -> DbResult<Order> {
        let now = shared::util::now_millis();
        let mut tx = self.pool.begin().await?;

        let mut order: Order = sqlx::query_as(&format!(
            r#"
            INSERT INTO orders (
                id, order_number, restaurant_id, table_id, customer_id, status,
                total, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, 'PENDING', $6, $7, $8, $8)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(shared::util::snowflake_id())
        .bind(&new.order_number)
        .bind(new.restaurant_id)
        .bind(new.table_id)
        .bind(new.customer_id)
        .bind(new.total)
        .bind(&new.notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for line in &new.items {
            let item: OrderItem = sqlx::query_as(&format!(
                r#"
                INSERT INTO order_items (
                    id, order_id, menu_item_id, variant_id, name, unit_price, quantity, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {ITEM_COLUMNS}
                "#
            ))
            .bind(shared::util::snowflake_id())
            .bind(order.id)
            .bind(line.menu_item_id)
            .bind(line.variant_id)
            .bind(&line.name)
            .bind(line.unit_price)
            .bind(line.quantity)
            .bind(&line.notes)
            .fetch_one(&mut *tx)
            .await?;
            order.items.push(item);
        }

        tx.commit().await?;
        Ok(order)
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let order: Option<Order> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let Some(order) = order else {
            return Ok(None);
        };
        let mut orders = [order];
        self.attach_items(&mut orders).await?;
        let [order] = orders;
        Ok(Some(order))
    }

    async fn list(&self, filter: OrderFilter, window: Window) -> DbResult<(Vec<Order>, i64)> {
        let mut orders: Vec<Order> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE {ORDER_FILTER}
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.restaurant_id)
        .bind(filter.customer_id)
        .bind(filter.status)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM orders WHERE {ORDER_FILTER}"))
                .bind(filter.restaurant_id)
                .bind(filter.customer_id)
                .bind(filter.status)
                .fetch_one(&self.pool)
                .await?;

        self.attach_items(&mut orders).await?;
        Ok((orders, total))
    }

    async fn update_status(
        &self,
        id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> DbResult<Option<Order>> {
        let order: Option<Order> = sqlx::query_as(&format!(
            r#"
            UPDATE orders SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(next)
        .bind(shared::util::now_millis())
        .bind(id)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;
        let Some(order) = order else {
            return Ok(None);
        };
        let mut orders = [order];
        self.attach_items(&mut orders).await?;
        let [order] = orders;
        Ok(Some(order))
    }
}
