use std::sync::Arc;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set, Statement,
};
use storefront_api::{
    auth::{Role, TokenIssuer},
    db::{create_orm_conn, run_migrations},
    dto::{
        auth::{LoginRequest, RegisterRequest},
        cart::AddToCartRequest,
        orders::{LineItemRequest, PlaceOrderRequest, UpdateOrderRequest},
        users::{CreateUserRequest, UpdateUserRequest},
    },
    entity::{
        CartItems, OrderItems, Orders, Products, Users, categories::ActiveModel as CategoryActive,
        products::ActiveModel as ProductActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::OrderQuery,
    auth::password::looks_like_password_hash,
    services::{auth_service, cart_service, order_service, user_service},
    state::AppState,
};
use uuid::Uuid;

// These flows need PostgreSQL; they are skipped when no database is configured.
fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run store flow tests.");
            None
        }
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs; roles stay seeded.
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, cart_items, favorite_items, products, categories, user_roles, users CASCADE",
    ))
    .await?;

    Ok(AppState {
        orm,
        tokens: Arc::new(TokenIssuer::new(b"store-flow-secret", chrono::Duration::hours(24))),
    })
}

async fn register(state: &AppState, username: &str, role: &str) -> anyhow::Result<AuthUser> {
    let resp = auth_service::register_user(
        state,
        RegisterRequest {
            username: username.into(),
            email: format!("{username}@example.com"),
            password: "secret1".into(),
            role: role.into(),
        },
    )
    .await?;
    let identity = state.tokens.verify(&resp.token)?;
    Ok(AuthUser {
        user_id: identity.user_id,
        roles: identity.roles.iter().filter_map(|r| r.parse::<Role>().ok()).collect(),
    })
}

async fn create_product(state: &AppState, name: &str, price: i64, stock: i32) -> anyhow::Result<Uuid> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("{name} category")),
        url: Set(name.to_lowercase().replace(' ', "-")),
    }
    .insert(&state.orm)
    .await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        price: Set(price),
        description: Set(None),
        image: Set(None),
        color: Set(None),
        size: Set(None),
        stock: Set(stock),
        category_id: Set(category.id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product vanished"))?;
    Ok(product.stock)
}

// Run sequentially in one test: the flows share a database and truncate it.
#[tokio::test]
async fn store_flows() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;

    register_login_profile(&state).await?;
    duplicate_registration_is_rejected(&state).await?;
    cart_over_stock_leaves_no_row(&state).await?;
    order_writes_header_and_items(&state).await?;
    failed_order_leaves_nothing(&state).await?;
    order_status_machine(&state).await?;
    cancelled_order_cannot_be_placed(&state).await?;
    password_update_keeps_hashes_hashed(&state).await?;
    phc_shaped_password_is_hashed(&state).await?;
    plain_user_cannot_create_admin(&state).await?;
    Ok(())
}

async fn register_login_profile(state: &AppState) -> anyhow::Result<()> {
    let resp = auth_service::register_user(
        state,
        RegisterRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "secret1".into(),
            role: "User".into(),
        },
    )
    .await?;
    assert_eq!(resp.message, "User registered successfully");

    let login = auth_service::login_user(
        state,
        LoginRequest {
            email: "alice@example.com".into(),
            password: "secret1".into(),
        },
    )
    .await?;
    let identity = state.tokens.verify(&login.token)?;
    assert_eq!(identity.roles, vec!["User".to_string()]);

    let caller = AuthUser {
        user_id: identity.user_id,
        roles: [Role::User].into_iter().collect(),
    };
    let profile = auth_service::profile(state, &caller).await?;
    assert_eq!(profile.name, "alice");
    assert_eq!(profile.email, "alice@example.com");

    let wrong = auth_service::login_user(
        state,
        LoginRequest {
            email: "alice@example.com".into(),
            password: "secret2".into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

    let stored = Users::find_by_id(identity.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user missing"))?;
    assert_ne!(stored.password_hash, "secret1");
    Ok(())
}

async fn duplicate_registration_is_rejected(state: &AppState) -> anyhow::Result<()> {
    register(state, "bob", "Seller").await?;
    let again = auth_service::register_user(
        state,
        RegisterRequest {
            username: "bobby".into(),
            email: "bob@example.com".into(),
            password: "secret1".into(),
            role: "User".into(),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));
    assert_eq!(
        Users::find()
            .filter(storefront_api::entity::users::Column::Email.eq("bob@example.com"))
            .count(&state.orm)
            .await?,
        1
    );
    Ok(())
}

async fn cart_over_stock_leaves_no_row(state: &AppState) -> anyhow::Result<()> {
    let buyer = register(state, "carol", "User").await?;
    let product_id = create_product(state, "Cart Widget", 500, 3).await?;

    let result = cart_service::add_to_cart(
        state,
        &buyer,
        AddToCartRequest {
            product_id,
            quantity: 4,
        },
    )
    .await;
    match result {
        Err(AppError::BadRequest(message)) => assert_eq!(message, "Not enough stock"),
        other => panic!("expected not enough stock, got {other:?}"),
    }
    let rows = CartItems::find()
        .filter(storefront_api::entity::cart_items::Column::UserId.eq(buyer.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(rows, 0);

    cart_service::add_to_cart(
        state,
        &buyer,
        AddToCartRequest {
            product_id,
            quantity: 3,
        },
    )
    .await?;
    let duplicate = cart_service::add_to_cart(
        state,
        &buyer,
        AddToCartRequest {
            product_id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));
    Ok(())
}

async fn order_writes_header_and_items(state: &AppState) -> anyhow::Result<()> {
    let buyer = register(state, "dave", "User").await?;
    let mug = create_product(state, "Order Mug", 1200, 10).await?;
    let shirt = create_product(state, "Order Shirt", 3000, 5).await?;

    let resp = order_service::place_order(
        state,
        &buyer,
        PlaceOrderRequest {
            user_id: None,
            status: None,
            total: None,
            items: vec![
                LineItemRequest {
                    product_id: mug,
                    quantity: 2,
                },
                LineItemRequest {
                    product_id: shirt,
                    quantity: 1,
                },
            ],
        },
    )
    .await?;
    let order = resp.data.ok_or_else(|| anyhow::anyhow!("no order"))?;

    assert_eq!(order.user_id, buyer.user_id);
    assert_eq!(order.status, "pending");
    assert_eq!(order.total, 2 * 1200 + 3000);
    assert_eq!(order.items.len(), 2);
    assert!(order.items.iter().all(|i| i.product.is_some()));
    assert_eq!(order.user.as_ref().map(|u| u.username.as_str()), Some("dave"));

    let stored_items = OrderItems::find()
        .filter(storefront_api::entity::order_items::Column::OrderId.eq(order.id))
        .count(&state.orm)
        .await?;
    assert_eq!(stored_items, 2);
    assert_eq!(stock_of(state, mug).await?, 8);
    assert_eq!(stock_of(state, shirt).await?, 4);

    let listed = order_service::list_orders(state, &buyer, OrderQuery::default()).await?;
    assert_eq!(listed.total, 1);
    assert_eq!(listed.data[0].id, order.id);
    Ok(())
}

async fn failed_order_leaves_nothing(state: &AppState) -> anyhow::Result<()> {
    let buyer = register(state, "erin", "User").await?;
    let lamp = create_product(state, "Rollback Lamp", 800, 10).await?;
    let orders_before = Orders::find().count(&state.orm).await?;
    let items_before = OrderItems::find().count(&state.orm).await?;

    // Second line item references a product that does not exist.
    let missing = order_service::place_order(
        state,
        &buyer,
        PlaceOrderRequest {
            user_id: None,
            status: None,
            total: None,
            items: vec![
                LineItemRequest {
                    product_id: lamp,
                    quantity: 1,
                },
                LineItemRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                },
            ],
        },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound("Product"))));

    // Second line item wants more than is in stock.
    let short = order_service::place_order(
        state,
        &buyer,
        PlaceOrderRequest {
            user_id: None,
            status: None,
            total: Some(100),
            items: vec![
                LineItemRequest {
                    product_id: lamp,
                    quantity: 3,
                },
                LineItemRequest {
                    product_id: lamp,
                    quantity: 8,
                },
            ],
        },
    )
    .await;
    assert!(matches!(short, Err(AppError::BadRequest(_))));

    assert_eq!(Orders::find().count(&state.orm).await?, orders_before);
    assert_eq!(OrderItems::find().count(&state.orm).await?, items_before);
    assert_eq!(stock_of(state, lamp).await?, 10);
    Ok(())
}

async fn order_status_machine(state: &AppState) -> anyhow::Result<()> {
    let buyer = register(state, "frank", "User").await?;
    let pen = create_product(state, "Status Pen", 100, 10).await?;

    let order = order_service::place_order(
        state,
        &buyer,
        PlaceOrderRequest {
            user_id: None,
            status: None,
            total: None,
            items: vec![LineItemRequest {
                product_id: pen,
                quantity: 4,
            }],
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("no order"))?;
    assert_eq!(stock_of(state, pen).await?, 6);

    let cancelled = order_service::update_order(
        state,
        &buyer,
        order.id,
        UpdateOrderRequest {
            status: Some("cancelled".into()),
            total: None,
        },
    )
    .await?;
    assert_eq!(cancelled.data.map(|o| o.status).as_deref(), Some("cancelled"));
    assert_eq!(stock_of(state, pen).await?, 10);

    let reopen = order_service::update_order(
        state,
        &buyer,
        order.id,
        UpdateOrderRequest {
            status: Some("pending".into()),
            total: None,
        },
    )
    .await;
    assert!(matches!(reopen, Err(AppError::BadRequest(_))));

    let total_change = order_service::update_order(
        state,
        &buyer,
        order.id,
        UpdateOrderRequest {
            status: None,
            total: Some(1),
        },
    )
    .await;
    assert!(matches!(total_change, Err(AppError::Forbidden)));
    Ok(())
}

async fn password_update_keeps_hashes_hashed(state: &AppState) -> anyhow::Result<()> {
    let user = register(state, "grace", "User").await?;

    user_service::update_user(
        state,
        &user,
        user.user_id,
        UpdateUserRequest {
            username: None,
            email: None,
            password: Some("newsecret".into()),
            password_hashed: None,
        },
    )
    .await?;

    let login = auth_service::login_user(
        state,
        LoginRequest {
            email: "grace@example.com".into(),
            password: "newsecret".into(),
        },
    )
    .await;
    assert!(login.is_ok());

    let other = register(state, "heidi", "User").await?;
    let denied = user_service::update_user(
        state,
        &user,
        other.user_id,
        UpdateUserRequest {
            username: Some("mallory".into()),
            email: None,
            password: None,
            password_hashed: None,
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    Ok(())
}

async fn cancelled_order_cannot_be_placed(state: &AppState) -> anyhow::Result<()> {
    let buyer = register(state, "ivan", "User").await?;
    let kettle = create_product(state, "Cancelled Kettle", 900, 5).await?;
    let orders_before = Orders::find().count(&state.orm).await?;

    let result = order_service::place_order(
        state,
        &buyer,
        PlaceOrderRequest {
            user_id: None,
            status: Some("cancelled".into()),
            total: None,
            items: vec![LineItemRequest {
                product_id: kettle,
                quantity: 5,
            }],
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(state, kettle).await?, 5);
    assert_eq!(Orders::find().count(&state.orm).await?, orders_before);
    Ok(())
}

async fn phc_shaped_password_is_hashed(state: &AppState) -> anyhow::Result<()> {
    let user = register(state, "judy", "User").await?;

    user_service::update_user(
        state,
        &user,
        user.user_id,
        UpdateUserRequest {
            username: None,
            email: None,
            password: Some("$argon2i$mypassword".into()),
            password_hashed: None,
        },
    )
    .await?;

    let stored = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user missing"))?;
    assert_ne!(stored.password_hash, "$argon2i$mypassword");
    assert!(looks_like_password_hash(&stored.password_hash));

    let login = auth_service::login_user(
        state,
        LoginRequest {
            email: "judy@example.com".into(),
            password: "$argon2i$mypassword".into(),
        },
    )
    .await;
    assert!(login.is_ok());
    Ok(())
}

async fn plain_user_cannot_create_admin(state: &AppState) -> anyhow::Result<()> {
    let user = register(state, "kim", "User").await?;
    let users_before = Users::find().count(&state.orm).await?;

    let escalate = user_service::create_user(
        state,
        &user,
        CreateUserRequest {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "secret1".into(),
            roles: Some(vec!["Admin".into()]),
        },
    )
    .await;
    assert!(matches!(escalate, Err(AppError::Forbidden)));
    assert_eq!(Users::find().count(&state.orm).await?, users_before);

    let plain = user_service::create_user(
        state,
        &user,
        CreateUserRequest {
            username: "kim-friend".into(),
            email: "kim-friend@example.com".into(),
            password: "secret1".into(),
            roles: None,
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("no user"))?;
    assert_eq!(plain.roles.len(), 1);
    Ok(())
}
