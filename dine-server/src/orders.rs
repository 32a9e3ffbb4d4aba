//! Order placement and lifecycle
//!
//! Prices always come from the menu. Status changes go through a
//! compare-and-set on the current status, and every successful change is
//! pushed to the notification layer.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderCreate, OrderLineRequest, OrderStatus, Restaurant};

use crate::auth::CurrentUser;
use crate::db::{DbError, NewOrder, NewOrderItem, PricedItem};
use crate::error::{DbResultExt, OptionExt, ServiceResult};
use crate::state::AppState;
use crate::util::generate_order_number;

/// Attempts at finding a free order number
const ORDER_NUMBER_ATTEMPTS: usize = 3;
const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

/// Priced lines and their total
#[derive(Debug, Clone)]
pub struct PricedLines {
    pub items: Vec<NewOrderItem>,
    pub total: Decimal,
}

/// Price each requested line from the menu catalog
pub fn price_lines(
    restaurant_id: i64,
    lines: &[OrderLineRequest],
    catalog: &[PricedItem],
) -> AppResult<PricedLines> {
    let by_id: HashMap<i64, &PricedItem> = catalog.iter().map(|p| (p.item.id, p)).collect();

    let mut items = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    for line in lines {
        let priced = by_id.get(&line.menu_item_id).ok_or_else(|| {
            AppError::new(ErrorCode::MenuItemNotFound).with_detail("menuItemId", line.menu_item_id)
        })?;
        if priced.restaurant_id != restaurant_id {
            return Err(AppError::with_message(
                ErrorCode::RestaurantMismatch,
                "Menu item belongs to another restaurant",
            )
            .with_detail("menuItemId", line.menu_item_id));
        }
        if !priced.item.is_available {
            return Err(AppError::with_message(
                ErrorCode::ItemUnavailable,
                format!("{} is currently unavailable", priced.item.name),
            )
            .with_detail("menuItemId", line.menu_item_id));
        }

        let (name, unit_price) = match line.variant_id {
            None => (priced.item.name.clone(), priced.item.price),
            Some(variant_id) => {
                let variant = priced
                    .variants
                    .iter()
                    .find(|v| v.id == variant_id)
                    .ok_or_else(|| {
                        AppError::new(ErrorCode::VariantNotFound).with_detail("variantId", variant_id)
                    })?;
                (
                    format!("{} ({})", priced.item.name, variant.name),
                    priced.item.price + variant.price_delta,
                )
            }
        };
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(AppError::new(ErrorCode::InvalidPrice)
                .with_detail("menuItemId", line.menu_item_id));
        }

        total += unit_price * Decimal::from(line.quantity);
        items.push(NewOrderItem {
            menu_item_id: line.menu_item_id,
            variant_id: line.variant_id,
            name,
            unit_price,
            quantity: line.quantity,
            notes: line.notes.clone(),
        });
    }
    Ok(PricedLines { items, total })
}

async fn load_restaurant(state: &AppState, restaurant_id: i64) -> ServiceResult<Restaurant> {
    state
        .repos
        .restaurants
        .find_by_id(restaurant_id)
        .await?
        .or_missing(ErrorCode::RestaurantNotFound)
}

/// Create a PENDING order and announce it to the restaurant room
pub async fn place_order(
    state: &AppState,
    customer: Option<&CurrentUser>,
    request: OrderCreate,
) -> ServiceResult<Order> {
    let restaurant = load_restaurant(state, request.restaurant_id).await?;
    if !restaurant.is_active {
        return Err(AppError::new(ErrorCode::RestaurantInactive).into());
    }

    if let Some(table_id) = request.table_id {
        let table = state
            .repos
            .tables
            .find_by_id(table_id)
            .await?
            .or_missing(ErrorCode::TableNotFound)?;
        if table.restaurant_id != restaurant.id {
            return Err(AppError::with_message(
                ErrorCode::RestaurantMismatch,
                "Table belongs to another restaurant",
            )
            .with_detail("tableId", table_id)
            .into());
        }
    }

    let mut item_ids: Vec<i64> = request.items.iter().map(|l| l.menu_item_id).collect();
    item_ids.sort_unstable();
    item_ids.dedup();
    let catalog = state.repos.menus.priced_items(&item_ids).await?;
    let priced = price_lines(restaurant.id, &request.items, &catalog)?;

    let mut attempt = 0;
    let order = loop {
        attempt += 1;
        let new_order = NewOrder {
            order_number: generate_order_number(),
            restaurant_id: restaurant.id,
            table_id: request.table_id,
            customer_id: customer.map(|c| c.id),
            notes: request.notes.clone(),
            total: priced.total,
            items: priced.items.clone(),
        };
        match state.repos.orders.create(new_order).await {
            Ok(order) => break order,
            Err(DbError::UniqueViolation(constraint))
                if constraint == ORDER_NUMBER_CONSTRAINT && attempt < ORDER_NUMBER_ATTEMPTS =>
            {
                tracing::debug!(attempt, "Order number collision, retrying");
            }
            Err(e) => return Err::<Order, DbError>(e).on_conflict(ErrorCode::OrderNumberExists),
        }
    };

    tracing::info!(
        order_id = order.id,
        order_number = %order.order_number,
        restaurant_id = order.restaurant_id,
        total = %order.total,
        "Order placed"
    );
    state.notifier.notify_new_order(&order);
    Ok(order)
}

/// Customer who placed the order, or a manager of its restaurant
pub async fn ensure_can_view(state: &AppState, user: &CurrentUser, order: &Order) -> ServiceResult<()> {
    if order.customer_id == Some(user.id) {
        return Ok(());
    }
    let restaurant = load_restaurant(state, order.restaurant_id).await?;
    user.ensure_manager(&restaurant)?;
    Ok(())
}

async fn load_order(state: &AppState, order_id: i64) -> ServiceResult<Order> {
    state
        .repos
        .orders
        .find_by_id(order_id)
        .await?
        .or_missing(ErrorCode::OrderNotFound)
}

/// Apply a validated status change and notify
async fn transition(state: &AppState, order: &Order, next: OrderStatus) -> ServiceResult<Order> {
    if order.status.is_final() {
        return Err(AppError::new(ErrorCode::OrderAlreadyFinalized)
            .with_detail("status", order.status.as_str())
            .into());
    }
    if !order.status.can_transition_to(next) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot change status from {} to {}", order.status, next),
        )
        .with_detail("from", order.status.as_str())
        .with_detail("to", next.as_str())
        .into());
    }

    let updated = state
        .repos
        .orders
        .update_status(order.id, order.status, next)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::InvalidStatusTransition,
                "Order status changed concurrently, reload and retry",
            )
        })?;

    tracing::info!(
        order_id = updated.id,
        from = %order.status,
        to = %updated.status,
        "Order status changed"
    );
    state.notifier.notify_order_status_update(&updated);
    if updated.status == OrderStatus::Ready {
        state.notifier.notify_order_ready(&updated);
    }
    Ok(updated)
}

/// Manager-driven status change
pub async fn change_status(
    state: &AppState,
    user: &CurrentUser,
    order_id: i64,
    next: OrderStatus,
) -> ServiceResult<Order> {
    let order = load_order(state, order_id).await?;
    let restaurant = load_restaurant(state, order.restaurant_id).await?;
    user.ensure_manager(&restaurant)?;
    transition(state, &order, next).await
}

/// The ordering customer may cancel while PENDING; managers until final
pub async fn cancel_order(state: &AppState, user: &CurrentUser, order_id: i64) -> ServiceResult<Order> {
    let order = load_order(state, order_id).await?;
    let restaurant = load_restaurant(state, order.restaurant_id).await?;

    if !user.can_manage(&restaurant) {
        if order.customer_id != Some(user.id) {
            return Err(AppError::permission_denied("Not allowed to cancel this order").into());
        }
        if order.status != OrderStatus::Pending {
            return Err(AppError::with_message(
                ErrorCode::InvalidStatusTransition,
                "Only pending orders can be cancelled",
            )
            .with_detail("status", order.status.as_str())
            .into());
        }
    }
    transition(state, &order, OrderStatus::Cancelled).await
}
