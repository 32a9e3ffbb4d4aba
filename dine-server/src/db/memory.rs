//! In-memory repositories for tests
//!
//! Mirrors the PostgreSQL schema's unique keys, foreign keys and cascade
//! rules closely enough that handlers see the same [`DbError`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::{
    Category, CategoryCreate, CategoryUpdate, DEFAULT_TABLE_CAPACITY, DiningTable,
    DiningTableCreate, DiningTableUpdate, Menu, MenuCreate, MenuDetail, MenuItem, MenuItemCreate,
    MenuItemUpdate, MenuUpdate, Order, OrderItem, OrderStatus, Restaurant, RestaurantUpdate, User,
    UserRole, Variant, VariantCreate,
};
use shared::util::now_millis;

use super::menus::assemble_menu;
use super::{
    DbError, DbResult, MenuNode, MenuRepository, NewOrder, NewRestaurant, NewUser, OrderFilter,
    OrderRepository, PricedItem, RestaurantFilter, RestaurantRepository, TableRepository,
    UserChanges, UserRepository, Window,
};

#[derive(Default)]
struct State {
    next_id: i64,
    users: BTreeMap<i64, User>,
    restaurants: BTreeMap<i64, Restaurant>,
    tables: BTreeMap<i64, DiningTable>,
    menus: BTreeMap<i64, Menu>,
    categories: BTreeMap<i64, Category>,
    items: BTreeMap<i64, MenuItem>,
    variants: BTreeMap<i64, Variant>,
    orders: BTreeMap<i64, Order>,
}

fn unique(constraint: &str) -> DbError {
    DbError::UniqueViolation(constraint.to_string())
}

fn foreign_key(constraint: &str) -> DbError {
    DbError::ForeignKeyViolation(constraint.to_string())
}

fn paginate<T>(rows: Vec<T>, window: Window) -> Vec<T> {
    rows.into_iter()
        .skip(window.offset.max(0) as usize)
        .take(window.limit.max(0) as usize)
        .collect()
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_variants(&mut self, doomed: impl Fn(&Variant) -> bool) {
        let ids: Vec<i64> = self
            .variants
            .values()
            .filter(|v| doomed(v))
            .map(|v| v.id)
            .collect();
        for id in ids {
            self.variants.remove(&id);
            for order in self.orders.values_mut() {
                for line in order.items.iter_mut().filter(|l| l.variant_id == Some(id)) {
                    line.variant_id = None;
                }
            }
        }
    }

    fn remove_items(&mut self, doomed: impl Fn(&MenuItem) -> bool) {
        let ids: Vec<i64> = self
            .items
            .values()
            .filter(|i| doomed(i))
            .map(|i| i.id)
            .collect();
        for id in ids {
            self.remove_variants(|v| v.item_id == id);
            self.items.remove(&id);
            for order in self.orders.values_mut() {
                for line in order.items.iter_mut().filter(|l| l.menu_item_id == Some(id)) {
                    line.menu_item_id = None;
                }
            }
        }
    }

    fn remove_categories(&mut self, doomed: impl Fn(&Category) -> bool) {
        let ids: Vec<i64> = self
            .categories
            .values()
            .filter(|c| doomed(c))
            .map(|c| c.id)
            .collect();
        for id in ids {
            self.remove_items(|i| i.category_id == id);
            self.categories.remove(&id);
        }
    }

    fn remove_menus(&mut self, doomed: impl Fn(&Menu) -> bool) {
        let ids: Vec<i64> = self
            .menus
            .values()
            .filter(|m| doomed(m))
            .map(|m| m.id)
            .collect();
        for id in ids {
            self.remove_categories(|c| c.menu_id == id);
            self.menus.remove(&id);
        }
    }

    fn restaurant_of_category(&self, category_id: i64) -> Option<i64> {
        let category = self.categories.get(&category_id)?;
        self.menus.get(&category.menu_id).map(|m| m.restaurant_id)
    }

    fn restaurant_of_item(&self, item_id: i64) -> Option<i64> {
        let item = self.items.get(&item_id)?;
        self.restaurant_of_category(item.category_id)
    }
}

/// Shared in-memory database; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, new: NewUser) -> DbResult<User> {
        let mut state = self.state.lock();
        if state.users.values().any(|u| u.email == new.email) {
            return Err(unique("users_email_key"));
        }
        if new
            .restaurant_id
            .is_some_and(|rid| !state.restaurants.contains_key(&rid))
        {
            return Err(foreign_key("users_restaurant_id_fkey"));
        }
        let now = now_millis();
        let user = User {
            id: state.next_id(),
            email: new.email,
            password_hash: new.password_hash,
            name: new.name,
            phone: new.phone,
            role: new.role,
            restaurant_id: new.restaurant_id,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<User>> {
        Ok(self.state.lock().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let state = self.state.lock();
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, role: Option<UserRole>, window: Window) -> DbResult<(Vec<User>, i64)> {
        let state = self.state.lock();
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        users.sort_by_key(|u| std::cmp::Reverse((u.created_at, u.id)));
        let total = users.len() as i64;
        Ok((paginate(users, window), total))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> DbResult<User> {
        let mut state = self.state.lock();
        if changes
            .restaurant_id
            .is_some_and(|rid| !state.restaurants.contains_key(&rid))
        {
            return Err(foreign_key("users_restaurant_id_fkey"));
        }
        let user = state.users.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(phone) = changes.phone {
            user.phone = Some(phone);
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(rid) = changes.restaurant_id {
            user.restaurant_id = Some(rid);
        }
        user.updated_at = now_millis();
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock();
        if !state.users.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        if state.restaurants.values().any(|r| r.owner_id == id) {
            return Err(foreign_key("restaurants_owner_id_fkey"));
        }
        state.users.remove(&id);
        for order in state.orders.values_mut() {
            if order.customer_id == Some(id) {
                order.customer_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RestaurantRepository for MemoryStore {
    async fn create(&self, new: NewRestaurant) -> DbResult<Restaurant> {
        let mut state = self.state.lock();
        if !state.users.contains_key(&new.owner_id) {
            return Err(foreign_key("restaurants_owner_id_fkey"));
        }
        if state.restaurants.values().any(|r| r.slug == new.slug) {
            return Err(unique("restaurants_slug_key"));
        }
        let now = now_millis();
        let restaurant = Restaurant {
            id: state.next_id(),
            owner_id: new.owner_id,
            name: new.name,
            slug: new.slug,
            description: new.description,
            address: new.address,
            phone: new.phone,
            email: new.email,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.restaurants.insert(restaurant.id, restaurant.clone());
        Ok(restaurant)
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<Restaurant>> {
        Ok(self.state.lock().restaurants.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: RestaurantFilter,
        window: Window,
    ) -> DbResult<(Vec<Restaurant>, i64)> {
        let state = self.state.lock();
        let needle = filter.search.map(|s| s.to_lowercase());
        let mut rows: Vec<Restaurant> = state
            .restaurants
            .values()
            .filter(|r| filter.include_inactive || r.is_active)
            .filter(|r| filter.owner_id.is_none_or(|o| r.owner_id == o))
            .filter(|r| {
                needle
                    .as_deref()
                    .is_none_or(|n| r.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        let total = rows.len() as i64;
        Ok((paginate(rows, window), total))
    }

    async fn update(&self, id: i64, changes: RestaurantUpdate) -> DbResult<Restaurant> {
        let mut state = self.state.lock();
        let slug_taken = changes.slug.as_ref().is_some_and(|slug| {
            state
                .restaurants
                .values()
                .any(|r| r.id != id && &r.slug == slug)
        });
        if slug_taken {
            return Err(unique("restaurants_slug_key"));
        }
        let restaurant = state.restaurants.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(name) = changes.name {
            restaurant.name = name;
        }
        if let Some(slug) = changes.slug {
            restaurant.slug = slug;
        }
        if let Some(description) = changes.description {
            restaurant.description = Some(description);
        }
        if let Some(address) = changes.address {
            restaurant.address = Some(address);
        }
        if let Some(phone) = changes.phone {
            restaurant.phone = Some(phone);
        }
        if let Some(email) = changes.email {
            restaurant.email = Some(email);
        }
        if let Some(active) = changes.is_active {
            restaurant.is_active = active;
        }
        restaurant.updated_at = now_millis();
        Ok(restaurant.clone())
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock();
        if state.restaurants.remove(&id).is_none() {
            return Err(DbError::NotFound);
        }
        state.tables.retain(|_, t| t.restaurant_id != id);
        state.remove_menus(|m| m.restaurant_id == id);
        state.orders.retain(|_, o| o.restaurant_id != id);
        for user in state.users.values_mut() {
            if user.restaurant_id == Some(id) {
                user.restaurant_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TableRepository for MemoryStore {
    async fn create(&self, data: DiningTableCreate) -> DbResult<DiningTable> {
        let mut state = self.state.lock();
        if !state.restaurants.contains_key(&data.restaurant_id) {
            return Err(foreign_key("dining_tables_restaurant_id_fkey"));
        }
        let number = data.number.trim().to_string();
        if state
            .tables
            .values()
            .any(|t| t.restaurant_id == data.restaurant_id && t.number == number)
        {
            return Err(unique("dining_tables_restaurant_id_number_key"));
        }
        let now = now_millis();
        let table = DiningTable {
            id: state.next_id(),
            restaurant_id: data.restaurant_id,
            number,
            capacity: data.capacity.unwrap_or(DEFAULT_TABLE_CAPACITY),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.tables.insert(table.id, table.clone());
        Ok(table)
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<DiningTable>> {
        Ok(self.state.lock().tables.get(&id).cloned())
    }

    async fn list_by_restaurant(&self, restaurant_id: i64) -> DbResult<Vec<DiningTable>> {
        let state = self.state.lock();
        let mut tables: Vec<DiningTable> = state
            .tables
            .values()
            .filter(|t| t.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        tables.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(tables)
    }

    async fn update(&self, id: i64, changes: DiningTableUpdate) -> DbResult<DiningTable> {
        let mut state = self.state.lock();
        let restaurant_id = state
            .tables
            .get(&id)
            .map(|t| t.restaurant_id)
            .ok_or(DbError::NotFound)?;
        let number = changes.number.map(|n| n.trim().to_string());
        let number_taken = number.as_ref().is_some_and(|number| {
            state
                .tables
                .values()
                .any(|t| t.id != id && t.restaurant_id == restaurant_id && &t.number == number)
        });
        if number_taken {
            return Err(unique("dining_tables_restaurant_id_number_key"));
        }
        let table = state.tables.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(number) = number {
            table.number = number;
        }
        if let Some(capacity) = changes.capacity {
            table.capacity = capacity;
        }
        if let Some(active) = changes.is_active {
            table.is_active = active;
        }
        table.updated_at = now_millis();
        Ok(table.clone())
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock();
        if state.tables.remove(&id).is_none() {
            return Err(DbError::NotFound);
        }
        for order in state.orders.values_mut() {
            if order.table_id == Some(id) {
                order.table_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MenuRepository for MemoryStore {
    async fn create_menu(&self, data: MenuCreate) -> DbResult<Menu> {
        let mut state = self.state.lock();
        if !state.restaurants.contains_key(&data.restaurant_id) {
            return Err(foreign_key("menus_restaurant_id_fkey"));
        }
        let now = now_millis();
        let menu = Menu {
            id: state.next_id(),
            restaurant_id: data.restaurant_id,
            name: data.name.trim().to_string(),
            description: data.description,
            is_active: data.is_active.unwrap_or(true),
            sort_order: data.sort_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        state.menus.insert(menu.id, menu.clone());
        Ok(menu)
    }

    async fn find_menu(&self, id: i64) -> DbResult<Option<Menu>> {
        Ok(self.state.lock().menus.get(&id).cloned())
    }

    async fn list_menus(&self, restaurant_id: i64) -> DbResult<Vec<Menu>> {
        let state = self.state.lock();
        let mut menus: Vec<Menu> = state
            .menus
            .values()
            .filter(|m| m.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        menus.sort_by_key(|m| (m.sort_order, m.id));
        Ok(menus)
    }

    async fn menu_detail(&self, id: i64) -> DbResult<Option<MenuDetail>> {
        let state = self.state.lock();
        let Some(menu) = state.menus.get(&id).cloned() else {
            return Ok(None);
        };
        let categories: Vec<Category> = state
            .categories
            .values()
            .filter(|c| c.menu_id == id)
            .cloned()
            .collect();
        let items: Vec<MenuItem> = state
            .items
            .values()
            .filter(|i| categories.iter().any(|c| c.id == i.category_id))
            .cloned()
            .collect();
        let variants: Vec<Variant> = state
            .variants
            .values()
            .filter(|v| items.iter().any(|i| i.id == v.item_id))
            .cloned()
            .collect();
        Ok(Some(assemble_menu(menu, categories, items, variants)))
    }

    async fn update_menu(&self, id: i64, changes: MenuUpdate) -> DbResult<Menu> {
        let mut state = self.state.lock();
        let menu = state.menus.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(name) = changes.name {
            menu.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            menu.description = Some(description);
        }
        if let Some(active) = changes.is_active {
            menu.is_active = active;
        }
        if let Some(sort_order) = changes.sort_order {
            menu.sort_order = sort_order;
        }
        menu.updated_at = now_millis();
        Ok(menu.clone())
    }

    async fn delete_menu(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock();
        if !state.menus.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        state.remove_menus(|m| m.id == id);
        Ok(())
    }

    async fn create_category(&self, menu_id: i64, data: CategoryCreate) -> DbResult<Category> {
        let mut state = self.state.lock();
        if !state.menus.contains_key(&menu_id) {
            return Err(foreign_key("menu_categories_menu_id_fkey"));
        }
        let category = Category {
            id: state.next_id(),
            menu_id,
            name: data.name.trim().to_string(),
            sort_order: data.sort_order.unwrap_or(0),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, changes: CategoryUpdate) -> DbResult<Category> {
        let mut state = self.state.lock();
        let category = state.categories.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(name) = changes.name {
            category.name = name.trim().to_string();
        }
        if let Some(sort_order) = changes.sort_order {
            category.sort_order = sort_order;
        }
        Ok(category.clone())
    }

    async fn delete_category(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock();
        if !state.categories.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        state.remove_categories(|c| c.id == id);
        Ok(())
    }

    async fn create_item(&self, category_id: i64, data: MenuItemCreate) -> DbResult<MenuItem> {
        let mut state = self.state.lock();
        if !state.categories.contains_key(&category_id) {
            return Err(foreign_key("menu_items_category_id_fkey"));
        }
        let now = now_millis();
        let item = MenuItem {
            id: state.next_id(),
            category_id,
            name: data.name.trim().to_string(),
            description: data.description,
            price: data.price,
            image_url: data.image_url,
            is_available: data.is_available.unwrap_or(true),
            sort_order: data.sort_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn find_item(&self, id: i64) -> DbResult<Option<MenuItem>> {
        Ok(self.state.lock().items.get(&id).cloned())
    }

    async fn update_item(&self, id: i64, changes: MenuItemUpdate) -> DbResult<MenuItem> {
        let mut state = self.state.lock();
        let item = state.items.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(name) = changes.name {
            item.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            item.description = Some(description);
        }
        if let Some(price) = changes.price {
            item.price = price;
        }
        if let Some(url) = changes.image_url {
            item.image_url = Some(url);
        }
        if let Some(available) = changes.is_available {
            item.is_available = available;
        }
        if let Some(sort_order) = changes.sort_order {
            item.sort_order = sort_order;
        }
        item.updated_at = now_millis();
        Ok(item.clone())
    }

    async fn delete_item(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock();
        if !state.items.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        state.remove_items(|i| i.id == id);
        Ok(())
    }

    async fn create_variant(&self, item_id: i64, data: VariantCreate) -> DbResult<Variant> {
        let mut state = self.state.lock();
        if !state.items.contains_key(&item_id) {
            return Err(foreign_key("menu_item_variants_item_id_fkey"));
        }
        let variant = Variant {
            id: state.next_id(),
            item_id,
            name: data.name.trim().to_string(),
            price_delta: data.price_delta,
        };
        state.variants.insert(variant.id, variant.clone());
        Ok(variant)
    }

    async fn delete_variant(&self, id: i64) -> DbResult<()> {
        let mut state = self.state.lock();
        if !state.variants.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        state.remove_variants(|v| v.id == id);
        Ok(())
    }

    async fn owning_restaurant(&self, node: MenuNode) -> DbResult<Option<i64>> {
        let state = self.state.lock();
        Ok(match node {
            MenuNode::Menu(id) => state.menus.get(&id).map(|m| m.restaurant_id),
            MenuNode::Category(id) => state.restaurant_of_category(id),
            MenuNode::Item(id) => state.restaurant_of_item(id),
            MenuNode::Variant(id) => state
                .variants
                .get(&id)
                .and_then(|v| state.restaurant_of_item(v.item_id)),
        })
    }

    async fn priced_items(&self, item_ids: &[i64]) -> DbResult<Vec<PricedItem>> {
        let state = self.state.lock();
        Ok(item_ids
            .iter()
            .filter_map(|id| {
                let item = state.items.get(id)?.clone();
                let restaurant_id = state.restaurant_of_item(item.id)?;
                let variants = state
                    .variants
                    .values()
                    .filter(|v| v.item_id == item.id)
                    .cloned()
                    .collect();
                Some(PricedItem {
                    item,
                    restaurant_id,
                    variants,
                })
            })
            .collect())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, new: NewOrder) -> DbResult<Order> {
        let mut state = self.state.lock();
        if state.orders.values().any(|o| o.order_number == new.order_number) {
            return Err(unique("orders_order_number_key"));
        }
        if !state.restaurants.contains_key(&new.restaurant_id) {
            return Err(foreign_key("orders_restaurant_id_fkey"));
        }
        if new
            .table_id
            .is_some_and(|table_id| !state.tables.contains_key(&table_id))
        {
            return Err(foreign_key("orders_table_id_fkey"));
        }
        if new
            .customer_id
            .is_some_and(|customer_id| !state.users.contains_key(&customer_id))
        {
            return Err(foreign_key("orders_customer_id_fkey"));
        }
        for line in &new.items {
            if !state.items.contains_key(&line.menu_item_id) {
                return Err(foreign_key("order_items_menu_item_id_fkey"));
            }
        }

        let now = now_millis();
        let order_id = state.next_id();
        let mut items = Vec::with_capacity(new.items.len());
        for line in new.items {
            items.push(OrderItem {
                id: state.next_id(),
                order_id,
                menu_item_id: Some(line.menu_item_id),
                variant_id: line.variant_id,
                name: line.name,
                unit_price: line.unit_price,
                quantity: line.quantity,
                notes: line.notes,
            });
        }
        let order = Order {
            id: order_id,
            order_number: new.order_number,
            restaurant_id: new.restaurant_id,
            table_id: new.table_id,
            customer_id: new.customer_id,
            status: OrderStatus::Pending,
            total: new.total,
            notes: new.notes,
            created_at: now,
            updated_at: now,
            items,
        };
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        Ok(self.state.lock().orders.get(&id).cloned())
    }

    async fn list(&self, filter: OrderFilter, window: Window) -> DbResult<(Vec<Order>, i64)> {
        let state = self.state.lock();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| filter.restaurant_id.is_none_or(|r| o.restaurant_id == r))
            .filter(|o| filter.customer_id.is_none_or(|c| o.customer_id == Some(c)))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by_key(|o| std::cmp::Reverse((o.created_at, o.id)));
        let total = orders.len() as i64;
        Ok((paginate(orders, window), total))
    }

    async fn update_status(
        &self,
        id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> DbResult<Option<Order>> {
        let mut state = self.state.lock();
        match state.orders.get_mut(&id) {
            Some(order) if order.status == expected => {
                order.status = next;
                order.updated_at = now_millis();
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }
}
