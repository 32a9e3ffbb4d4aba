//! Dining Table Model

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::not_blank;

/// Seats used when a table is created without an explicit capacity
pub const DEFAULT_TABLE_CAPACITY: i32 = 4;

/// Dining table. `number` is unique within its restaurant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct DiningTable {
    pub id: i64,
    pub restaurant_id: i64,
    pub number: String,
    pub capacity: i32,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DiningTableCreate {
    pub restaurant_id: i64,
    #[validate(length(min = 1, max = 20), custom(function = "not_blank"))]
    pub number: String,
    #[validate(range(min = 1, max = 50))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DiningTableUpdate {
    #[validate(length(min = 1, max = 20), custom(function = "not_blank"))]
    pub number: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}
