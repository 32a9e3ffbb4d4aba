//! Menus, categories, items and variants

use std::collections::HashMap;

use async_trait::async_trait;
use shared::models::{
    Category, CategoryCreate, CategoryDetail, CategoryUpdate, Menu, MenuCreate, MenuDetail,
    MenuItem, MenuItemCreate, MenuItemDetail, MenuItemUpdate, MenuUpdate, Variant, VariantCreate,
};
use sqlx::PgPool;

use super::{DbError, DbResult};

/// A node of the menu tree, used to resolve which restaurant owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuNode {
    Menu(i64),
    Category(i64),
    Item(i64),
    Variant(i64),
}

/// Menu item with what order pricing needs to know about it
#[derive(Debug, Clone)]
pub struct PricedItem {
    pub item: MenuItem,
    pub restaurant_id: i64,
    pub variants: Vec<Variant>,
}

#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn create_menu(&self, data: MenuCreate) -> DbResult<Menu>;
    async fn find_menu(&self, id: i64) -> DbResult<Option<Menu>>;
    async fn list_menus(&self, restaurant_id: i64) -> DbResult<Vec<Menu>>;
    /// Menu with its full category/item/variant tree
    async fn menu_detail(&self, id: i64) -> DbResult<Option<MenuDetail>>;
    async fn update_menu(&self, id: i64, changes: MenuUpdate) -> DbResult<Menu>;
    async fn delete_menu(&self, id: i64) -> DbResult<()>;

    async fn create_category(&self, menu_id: i64, data: CategoryCreate) -> DbResult<Category>;
    async fn update_category(&self, id: i64, changes: CategoryUpdate) -> DbResult<Category>;
    async fn delete_category(&self, id: i64) -> DbResult<()>;

    async fn create_item(&self, category_id: i64, data: MenuItemCreate) -> DbResult<MenuItem>;
    async fn find_item(&self, id: i64) -> DbResult<Option<MenuItem>>;
    async fn update_item(&self, id: i64, changes: MenuItemUpdate) -> DbResult<MenuItem>;
    async fn delete_item(&self, id: i64) -> DbResult<()>;

    async fn create_variant(&self, item_id: i64, data: VariantCreate) -> DbResult<Variant>;
    async fn delete_variant(&self, id: i64) -> DbResult<()>;

    /// Restaurant owning a node, `None` if the node does not exist
    async fn owning_restaurant(&self, node: MenuNode) -> DbResult<Option<i64>>;
    /// Items (with variants) for order pricing; unknown ids are skipped
    async fn priced_items(&self, item_ids: &[i64]) -> DbResult<Vec<PricedItem>>;
}

/// Build the nested read model from flat rows
pub(crate) fn assemble_menu(
    menu: Menu,
    mut categories: Vec<Category>,
    mut items: Vec<MenuItem>,
    mut variants: Vec<Variant>,
) -> MenuDetail {
    categories.sort_by_key(|c| (c.sort_order, c.id));
    items.sort_by_key(|i| (i.sort_order, i.id));
    variants.sort_by_key(|v| v.id);

    let mut variants_by_item: HashMap<i64, Vec<Variant>> = HashMap::new();
    for variant in variants {
        variants_by_item.entry(variant.item_id).or_default().push(variant);
    }
    let mut items_by_category: HashMap<i64, Vec<MenuItemDetail>> = HashMap::new();
    for item in items {
        let variants = variants_by_item.remove(&item.id).unwrap_or_default();
        items_by_category
            .entry(item.category_id)
            .or_default()
            .push(MenuItemDetail { item, variants });
    }

    let categories = categories
        .into_iter()
        .map(|category| CategoryDetail {
            items: items_by_category.remove(&category.id).unwrap_or_default(),
            category,
        })
        .collect();
    MenuDetail { menu, categories }
}

pub struct PgMenuRepository {
    pool: PgPool,
}

impl PgMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn delete_by_id(&self, table: &str, id: i64) -> DbResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

const MENU_COLUMNS: &str =
    "id, restaurant_id, name, description, is_active, sort_order, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, menu_id, name, sort_order";
const ITEM_COLUMNS: &str = "id, category_id, name, description, price, image_url, is_available, \
     sort_order, created_at, updated_at";
const VARIANT_COLUMNS: &str = "id, item_id, name, price_delta";

#[derive(sqlx::FromRow)]
struct PricedItemRow {
    #[sqlx(flatten)]
    item: MenuItem,
    restaurant_id: i64,
}

#[async_trait]
impl MenuRepository for PgMenuRepository {
    async fn create_menu(&self, data: MenuCreate) -> DbResult<Menu> {
        let now = shared::util::now_millis();
        let menu = sqlx::query_as(&format!(
            r#"
            INSERT INTO menus (id, restaurant_id, name, description, is_active, sort_order, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(shared::util::snowflake_id())
        .bind(data.restaurant_id)
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(data.is_active.unwrap_or(true))
        .bind(data.sort_order.unwrap_or(0))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(menu)
    }

    async fn find_menu(&self, id: i64) -> DbResult<Option<Menu>> {
        let menu = sqlx::query_as(&format!("SELECT {MENU_COLUMNS} FROM menus WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(menu)
    }

    async fn list_menus(&self, restaurant_id: i64) -> DbResult<Vec<Menu>> {
        let menus = sqlx::query_as(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE restaurant_id = $1 ORDER BY sort_order, id"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(menus)
    }

    async fn menu_detail(&self, id: i64) -> DbResult<Option<MenuDetail>> {
        let Some(menu) = self.find_menu(id).await? else {
            return Ok(None);
        };

        let categories: Vec<Category> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM menu_categories WHERE menu_id = $1"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let category_ids: Vec<i64> = categories.iter().map(|c| c.id).collect();
        let items: Vec<MenuItem> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM menu_items WHERE category_id = ANY($1)"
        ))
        .bind(&category_ids)
        .fetch_all(&self.pool)
        .await?;

        let item_ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        let variants: Vec<Variant> = sqlx::query_as(&format!(
            "SELECT {VARIANT_COLUMNS} FROM menu_item_variants WHERE item_id = ANY($1)"
        ))
        .bind(&item_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(assemble_menu(menu, categories, items, variants)))
    }

    async fn update_menu(&self, id: i64, changes: MenuUpdate) -> DbResult<Menu> {
        let menu: Option<Menu> = sqlx::query_as(&format!(
            r#"
            UPDATE menus SET
                name = COALESCE($1, name),
                description = COALESCE($2, description),
                is_active = COALESCE($3, is_active),
                sort_order = COALESCE($4, sort_order),
                updated_at = $5
            WHERE id = $6
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(changes.name.as_deref().map(str::trim))
        .bind(&changes.description)
        .bind(changes.is_active)
        .bind(changes.sort_order)
        .bind(shared::util::now_millis())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        menu.ok_or(DbError::NotFound)
    }

    async fn delete_menu(&self, id: i64) -> DbResult<()> {
        self.delete_by_id("menus", id).await
    }

    async fn create_category(&self, menu_id: i64, data: CategoryCreate) -> DbResult<Category> {
        let category = sqlx::query_as(&format!(
            r#"
            INSERT INTO menu_categories (id, menu_id, name, sort_order)
            VALUES ($1, $2, $3, $4)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(shared::util::snowflake_id())
        .bind(menu_id)
        .bind(data.name.trim())
        .bind(data.sort_order.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(&self, id: i64, changes: CategoryUpdate) -> DbResult<Category> {
        let category: Option<Category> = sqlx::query_as(&format!(
            r#"
            UPDATE menu_categories SET
                name = COALESCE($1, name),
                sort_order = COALESCE($2, sort_order)
            WHERE id = $3
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.sort_order)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        category.ok_or(DbError::NotFound)
    }

    async fn delete_category(&self, id: i64) -> DbResult<()> {
        self.delete_by_id("menu_categories", id).await
    }

    async fn create_item(&self, category_id: i64, data: MenuItemCreate) -> DbResult<MenuItem> {
        let now = shared::util::now_millis();
        let item = sqlx::query_as(&format!(
            r#"
            INSERT INTO menu_items (
                id, category_id, name, description, price, image_url, is_available,
                sort_order, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(shared::util::snowflake_id())
        .bind(category_id)
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(data.price)
        .bind(&data.image_url)
        .bind(data.is_available.unwrap_or(true))
        .bind(data.sort_order.unwrap_or(0))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn find_item(&self, id: i64) -> DbResult<Option<MenuItem>> {
        let item = sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM menu_items WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn update_item(&self, id: i64, changes: MenuItemUpdate) -> DbResult<MenuItem> {
        let item: Option<MenuItem> = sqlx::query_as(&format!(
            r#"
            UPDATE menu_items SET
                name = COALESCE($1, name),
                description = COALESCE($2, description),
                price = COALESCE($3, price),
                image_url = COALESCE($4, image_url),
                is_available = COALESCE($5, is_available),
                sort_order = COALESCE($6, sort_order),
                updated_at = $7
            WHERE id = $8
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(changes.name.as_deref().map(str::trim))
        .bind(&changes.description)
        .bind(changes.price)
        .bind(&changes.image_url)
        .bind(changes.is_available)
        .bind(changes.sort_order)
        .bind(shared::util::now_millis())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        item.ok_or(DbError::NotFound)
    }

    async fn delete_item(&self, id: i64) -> DbResult<()> {
        self.delete_by_id("menu_items", id).await
    }

    async fn create_variant(&self, item_id: i64, data: VariantCreate) -> DbResult<Variant> {
        let variant = sqlx::query_as(&format!(
            r#"
            INSERT INTO menu_item_variants (id, item_id, name, price_delta)
            VALUES ($1, $2, $3, $4)
            RETURNING {VARIANT_COLUMNS}
            "#
        ))
        .bind(shared::util::snowflake_id())
        .bind(item_id)
        .bind(data.name.trim())
        .bind(data.price_delta)
        .fetch_one(&self.pool)
        .await?;
        Ok(variant)
    }

    async fn delete_variant(&self, id: i64) -> DbResult<()> {
        self.delete_by_id("menu_item_variants", id).await
    }

    async fn owning_restaurant(&self, node: MenuNode) -> DbResult<Option<i64>> {
        let (sql, id) = match node {
            MenuNode::Menu(id) => ("SELECT restaurant_id FROM menus WHERE id = $1", id),
            MenuNode::Category(id) => (
                r#"
                SELECT m.restaurant_id FROM menu_categories c
                JOIN menus m ON m.id = c.menu_id
                WHERE c.id = $1
                "#,
                id,
            ),
            MenuNode::Item(id) => (
                r#"
                SELECT m.restaurant_id FROM menu_items i
                JOIN menu_categories c ON c.id = i.category_id
                JOIN menus m ON m.id = c.menu_id
                WHERE i.id = $1
                "#,
                id,
            ),
            MenuNode::Variant(id) => (
                r#"
                SELECT m.restaurant_id FROM menu_item_variants v
                JOIN menu_items i ON i.id = v.item_id
                JOIN menu_categories c ON c.id = i.category_id
                JOIN menus m ON m.id = c.menu_id
                WHERE v.id = $1
                "#,
                id,
            ),
        };
        let row: Option<(i64,)> = sqlx::query_as(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(restaurant_id,)| restaurant_id))
    }

    async fn priced_items(&self, item_ids: &[i64]) -> DbResult<Vec<PricedItem>> {
        let rows: Vec<PricedItemRow> = sqlx::query_as(
            r#"
            SELECT i.id, i.category_id, i.name, i.description, i.price, i.image_url,
                   i.is_available, i.sort_order, i.created_at, i.updated_at,
                   m.restaurant_id
            FROM menu_items i
            JOIN menu_categories c ON c.id = i.category_id
            JOIN menus m ON m.id = c.menu_id
            WHERE i.id = ANY($1)
            "#,
        )
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await?;

        let found: Vec<i64> = rows.iter().map(|r| r.item.id).collect();
        let variants: Vec<Variant> = sqlx::query_as(&format!(
            "SELECT {VARIANT_COLUMNS} FROM menu_item_variants WHERE item_id = ANY($1)"
        ))
        .bind(&found)
        .fetch_all(&self.pool)
        .await?;

        let mut by_item: HashMap<i64, Vec<Variant>> = HashMap::new();
        for variant in variants {
            by_item.entry(variant.item_id).or_default().push(variant);
        }
        Ok(rows
            .into_iter()
            .map(|row| PricedItem {
                variants: by_item.remove(&row.item.id).unwrap_or_default(),
                restaurant_id: row.restaurant_id,
                item: row.item,
            })
            .collect())
    }
}
