use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
    pub image: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub stock: i32,
    pub category_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
}
