//! Batched hydration of related rows for API responses.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    entity::{
        Categories, OrderItems, Products, Roles, UserRoles, Users, categories, order_items, orders,
        products, user_roles, users,
    },
    models::{Category, OrderDetail, OrderItem, Product, Role, UserSummary},
};

/// Products keyed by id, each with its category attached.
pub async fn load_products<C: ConnectionTrait>(
    conn: &C,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, Product>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Products::find()
        .filter(products::Column::Id.is_in(ids.to_vec()))
        .all(conn)
        .await?;
    hydrate_products(conn, rows)
        .await
        .map(|list| list.into_iter().map(|p| (p.id, p)).collect())
}

/// Attach categories to already fetched product rows, preserving their order.
pub async fn hydrate_products<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<products::Model>,
) -> Result<Vec<Product>, DbErr> {
    let category_ids: Vec<Uuid> = rows.iter().map(|p| p.category_id).collect();
    let categories: HashMap<Uuid, Category> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        Categories::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|c| (c.id, Category::from(c)))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|p| {
            let category = categories.get(&p.category_id).cloned();
            Product::from_entity(p, category)
        })
        .collect())
}

pub async fn load_roles_by_user<C: ConnectionTrait>(
    conn: &C,
    user_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Role>>, DbErr> {
    let mut by_user: HashMap<Uuid, Vec<Role>> = HashMap::new();
    if user_ids.is_empty() {
        return Ok(by_user);
    }
    let rows = UserRoles::find()
        .filter(user_roles::Column::UserId.is_in(user_ids.to_vec()))
        .find_also_related(Roles)
        .all(conn)
        .await?;
    for (link, role) in rows {
        if let Some(role) = role {
            by_user.entry(link.user_id).or_default().push(Role::from(role));
        }
    }
    Ok(by_user)
}

/// Role names for one user, as carried in session tokens.
pub async fn role_names<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<Vec<String>, DbErr> {
    let roles = load_roles_by_user(conn, &[user_id]).await?;
    Ok(roles
        .get(&user_id)
        .map(|list| list.iter().map(|r| r.name.clone()).collect())
        .unwrap_or_default())
}

/// Orders with owner, line items, and each item's product and category.
pub async fn load_order_details<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<orders::Model>,
) -> Result<Vec<OrderDetail>, DbErr> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let user_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();

    let users: HashMap<Uuid, UserSummary> = Users::find()
        .filter(users::Column::Id.is_in(user_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    let items = OrderItems::find()
        .filter(order_items::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_items::Column::Id)
        .all(conn)
        .await?;
    let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let products = load_products(conn, &product_ids).await?;

    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        let product = products.get(&item.product_id).cloned();
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItem::from_entity(item, product));
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let user = users.get(&order.user_id).cloned();
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            OrderDetail::from_entity(order, user, items)
        })
        .collect())
}
