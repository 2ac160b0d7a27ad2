use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LineItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    /// Defaults to the caller. Only admins may place orders for someone else.
    pub user_id: Option<Uuid>,
    /// Defaults to `pending`.
    pub status: Option<String>,
    /// Computed from the line items when omitted.
    pub total: Option<i64>,
    pub items: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub total: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderItemRequest {
    pub quantity: i32,
}
