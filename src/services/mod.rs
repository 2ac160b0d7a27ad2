pub mod auth_service;
pub mod cart_service;
pub mod category_service;
pub mod favorite_service;
pub mod loaders;
pub mod order_item_service;
pub mod order_service;
pub mod product_service;
pub mod role_service;
pub mod user_service;
