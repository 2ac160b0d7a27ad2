use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sea_orm::ActiveValue::NotSet;
use storefront_api::{
    auth::{Role, password::hash_password},
    config::database_url,
    db::{create_orm_conn, run_migrations},
    entity::{Categories, Products, Roles, UserRoles, Users, categories, products, roles, user_roles, users},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let orm = create_orm_conn(&database_url()?).await?;
    // Roles are seeded by the migration.
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin", "admin@example.com", "admin123", Role::Admin).await?;
    let seller_id =
        ensure_user(&orm, "seller", "seller@example.com", "seller123", Role::Seller).await?;
    let user_id = ensure_user(&orm, "user", "user@example.com", "user123", Role::User).await?;
    seed_catalog(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, Seller ID: {seller_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let user_id = match Users::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?
    {
        Some(existing) => existing.id,
        None => {
            users::ActiveModel {
                id: Set(Uuid::new_v4()),
                username: Set(username.to_string()),
                email: Set(email.to_string()),
                password_hash: Set(hash_password(password)?),
                created_at: NotSet,
            }
            .insert(orm)
            .await?
            .id
        }
    };

    let role_row = Roles::find()
        .filter(roles::Column::Name.eq(role.as_str()))
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("role {role} is missing; run migrations first"))?;

    let assigned = UserRoles::find()
        .filter(user_roles::Column::UserId.eq(user_id))
        .filter(user_roles::Column::RoleId.eq(role_row.id))
        .one(orm)
        .await?;
    if assigned.is_none() {
        user_roles::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            role_id: Set(role_row.id),
        }
        .insert(orm)
        .await?;
    }

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_category(orm: &DatabaseConnection, name: &str, url: &str) -> anyhow::Result<Uuid> {
    if let Some(existing) = Categories::find()
        .filter(categories::Column::Url.eq(url))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }
    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        url: Set(url.to_string()),
    }
    .insert(orm)
    .await?;
    Ok(category.id)
}

async fn seed_catalog(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let apparel = ensure_category(orm, "Apparel", "apparel").await?;
    let kitchen = ensure_category(orm, "Kitchen", "kitchen").await?;
    let books = ensure_category(orm, "Books", "books").await?;

    let catalog = vec![
        ("Axum Hoodie", "Warm hoodie for Rustaceans", 550000, 50, apparel, Some("black"), Some("L")),
        ("Ferris Mug", "Coffee tastes better with Ferris", 120000, 100, kitchen, Some("orange"), None),
        ("Rust Sticker Pack", "Decorate your laptop", 50000, 200, apparel, None, None),
        ("E-book: Async Rust", "Learn async Rust patterns", 250000, 75, books, None, None),
    ];

    for (name, desc, price, stock, category_id, color, size) in catalog {
        let exists = Products::find()
            .filter(products::Column::Name.eq(name))
            .one(orm)
            .await?;
        if exists.is_some() {
            continue;
        }
        products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            description: Set(Some(desc.to_string())),
            image: Set(None),
            color: Set(color.map(str::to_string)),
            size: Set(size.map(str::to_string)),
            stock: Set(stock),
            category_id: Set(category_id),
            created_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded categories and products");
    Ok(())
}
