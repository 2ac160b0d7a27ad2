use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddFavoriteRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FavoriteCheckResponse {
    pub favorited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_item_id: Option<Uuid>,
}
