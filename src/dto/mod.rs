pub mod auth;
pub mod cart;
pub mod categories;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod roles;
pub mod users;
