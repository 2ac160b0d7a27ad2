use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    cart_items, categories, favorite_items, order_items, orders, products, roles, user_roles,
    users,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
}

impl From<roles::Model> for Role {
    fn from(model: roles::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
}

impl From<user_roles::Model> for UserRole {
    fn from(model: user_roles::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            role_id: model.role_id,
        }
    }
}

/// A user as returned by the API. The password hash never leaves the service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<Role>,
}

impl User {
    pub fn from_entity(model: users::Model, roles: Vec<Role>) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            created_at: model.created_at.with_timezone(&Utc),
            roles,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<users::Model> for UserSummary {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub url: String,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            url: model.url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
    pub image: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub stock: i32,
    pub category_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub category: Option<Category>,
}

impl Product {
    pub fn from_entity(model: products::Model, category: Option<Category>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            description: model.description,
            image: model.image,
            color: model.color,
            size: model.size,
            stock: model.stock,
            category_id: model.category_id,
            created_at: model.created_at.with_timezone(&Utc),
            category,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub product: Option<Product>,
}

impl CartItem {
    pub fn from_entity(model: cart_items::Model, product: Option<Product>) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            quantity: model.quantity,
            created_at: model.created_at.with_timezone(&Utc),
            product,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FavoriteItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub product: Option<Product>,
}

impl FavoriteItem {
    pub fn from_entity(model: favorite_items::Model, product: Option<Product>) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            created_at: model.created_at.with_timezone(&Utc),
            product,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
    pub product: Option<Product>,
}

impl OrderItem {
    pub fn from_entity(model: order_items::Model, product: Option<Product>) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
            product,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub status: String,
    pub total: i64,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            order_date: model.order_date.with_timezone(&Utc),
            status: model.status,
            total: model.total,
        }
    }
}

/// An order with its owner and line items attached.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub status: String,
    pub total: i64,
    pub user: Option<UserSummary>,
    pub items: Vec<OrderItem>,
}

impl OrderDetail {
    pub fn from_entity(
        model: orders::Model,
        user: Option<UserSummary>,
        items: Vec<OrderItem>,
    ) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            order_date: model.order_date.with_timezone(&Utc),
            status: model.status,
            total: model.total,
            user,
            items,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Only pending orders move; everything else is terminal.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        *self == next || *self == OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "shipped" => Ok(OrderStatus::Shipped),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("Unknown order status '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_moves_to_any_other_status() {
        for next in [
            OrderStatus::Completed,
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
        ] {
            assert!(OrderStatus::Pending.can_transition_to(next));
        }
    }

    #[test]
    fn terminal_statuses_only_accept_themselves() {
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn status_parses_lowercase_names_only() {
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert!("Shipped".parse::<OrderStatus>().is_err());
        assert!("paid".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(OrderStatus::Cancelled).unwrap();
        assert_eq!(json, "cancelled");
    }
}
