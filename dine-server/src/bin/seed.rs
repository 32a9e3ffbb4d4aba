//! dine-seed: load demo data into an empty database
//!
//! Creates an admin, an owner with one restaurant (tables and a menu), a
//! staff member and a customer. Skips everything when the admin exists.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use shared::models::{
    CategoryCreate, DiningTableCreate, MenuCreate, MenuItemCreate, UserRole, VariantCreate,
};
use shared::util::slugify;

use dine_server::config::Config;
use dine_server::db::{self, NewRestaurant, NewUser, Repositories};
use dine_server::util::hash_password;

const ADMIN_EMAIL: &str = "admin@dine.local";
const DEMO_PASSWORD: &str = "password123";

struct SeedItem {
    name: &'static str,
    description: &'static str,
    price: Decimal,
    variants: Vec<(&'static str, Decimal)>,
}

fn user(email: &str, name: &str, role: UserRole, restaurant_id: Option<i64>) -> Result<NewUser> {
    let password_hash = hash_password(DEMO_PASSWORD)
        .map_err(|e| anyhow::anyhow!("hash password: {e}"))?;
    Ok(NewUser {
        email: email.to_string(),
        password_hash,
        name: name.to_string(),
        phone: None,
        role,
        restaurant_id,
    })
}

/// Categories of the demo dinner menu, in display order
fn demo_menu() -> Vec<(&'static str, Vec<SeedItem>)> {
    vec![
        (
            "Pizza",
            vec![
                SeedItem {
                    name: "Margherita",
                    description: "Tomato, mozzarella, basil",
                    price: Decimal::new(1100, 2),
                    variants: vec![("Large", Decimal::new(400, 2))],
                },
                SeedItem {
                    name: "Diavola",
                    description: "Spicy salami, chili oil",
                    price: Decimal::new(1350, 2),
                    variants: vec![("Large", Decimal::new(400, 2))],
                },
            ],
        ),
        (
            "Drinks",
            vec![SeedItem {
                name: "Lemonade",
                description: "House-made",
                price: Decimal::new(450, 2),
                variants: Vec::new(),
            }],
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dine_seed=info,dine_server=info".into()),
        )
        .init();

    let mut config = Config::from_env().map_err(|e| anyhow::anyhow!("load config: {e}"))?;
    config.run_migrations = true;
    let pool = db::connect(&config)
        .await
        .map_err(|e| anyhow::anyhow!("connect database: {e}"))?;
    let repos = Repositories::postgres(pool);

    if repos.users.find_by_email(ADMIN_EMAIL).await?.is_some() {
        tracing::info!(email = ADMIN_EMAIL, "Admin already exists, nothing to seed");
        return Ok(());
    }

    repos
        .users
        .create(user(ADMIN_EMAIL, "Admin", UserRole::Admin, None)?)
        .await
        .context("create admin")?;
    let owner = repos
        .users
        .create(user("owner@dine.local", "Olivia Owner", UserRole::Owner, None)?)
        .await
        .context("create owner")?;

    let name = "Trattoria Demo";
    let restaurant = repos
        .restaurants
        .create(NewRestaurant {
            owner_id: owner.id,
            name: name.to_string(),
            slug: slugify(name),
            description: Some("Wood-fired pizza and fresh pasta".into()),
            address: Some("1 Market Street".into()),
            phone: Some("+1 555 0100".into()),
            email: Some("hello@trattoria.local".into()),
        })
        .await
        .context("create restaurant")?;

    repos
        .users
        .create(user(
            "staff@dine.local",
            "Sam Staff",
            UserRole::Staff,
            Some(restaurant.id),
        )?)
        .await
        .context("create staff")?;
    repos
        .users
        .create(user("customer@dine.local", "Casey Customer", UserRole::Customer, None)?)
        .await
        .context("create customer")?;

    for number in 1..=6 {
        repos
            .tables
            .create(DiningTableCreate {
                restaurant_id: restaurant.id,
                number: format!("T{number}"),
                capacity: Some(if number <= 4 { 4 } else { 6 }),
            })
            .await
            .with_context(|| format!("create table T{number}"))?;
    }

    let menu = repos
        .menus
        .create_menu(MenuCreate {
            restaurant_id: restaurant.id,
            name: "Dinner".into(),
            description: Some("Served from 6pm".into()),
            is_active: Some(true),
            sort_order: Some(0),
        })
        .await
        .context("create menu")?;

    for (position, (category_name, items)) in demo_menu().into_iter().enumerate() {
        let category = repos
            .menus
            .create_category(
                menu.id,
                CategoryCreate {
                    name: category_name.into(),
                    sort_order: Some(position as i32),
                },
            )
            .await
            .with_context(|| format!("create category {category_name}"))?;

        for (sort_order, seed) in items.into_iter().enumerate() {
            let item = repos
                .menus
                .create_item(
                    category.id,
                    MenuItemCreate {
                        name: seed.name.into(),
                        description: Some(seed.description.into()),
                        price: seed.price,
                        image_url: None,
                        is_available: Some(true),
                        sort_order: Some(sort_order as i32),
                    },
                )
                .await
                .with_context(|| format!("create item {}", seed.name))?;
            for (variant_name, delta) in seed.variants {
                repos
                    .menus
                    .create_variant(
                        item.id,
                        VariantCreate {
                            name: variant_name.into(),
                            price_delta: delta,
                        },
                    )
                    .await
                    .with_context(|| format!("create variant {variant_name}"))?;
            }
        }
    }

    tracing::info!(
        restaurant_id = restaurant.id,
        slug = %restaurant.slug,
        password = DEMO_PASSWORD,
        "Seed data created"
    );
    Ok(())
}
