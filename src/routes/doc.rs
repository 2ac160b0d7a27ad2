use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, ProfileResponse, RegisterRequest, RegisterResponse},
        cart::{AddToCartRequest, UpdateCartItemRequest},
        categories::CreateCategoryRequest,
        favorites::{AddFavoriteRequest, FavoriteCheckResponse},
        orders::{
            CreateOrderItemRequest, LineItemRequest, PlaceOrderRequest, UpdateOrderItemRequest,
            UpdateOrderRequest,
        },
        products::{CreateProductRequest, UpdateProductRequest},
        roles::{AddUserRoleRequest, RoleRequest},
        users::{CreateUserRequest, UpdateUserRequest},
    },
    models::{
        CartItem, Category, FavoriteItem, OrderDetail, OrderItem, OrderStatus, Product, Role,
        User, UserRole, UserSummary,
    },
    routes::{
        auth, cart, categories, favorites, health, order_items, orders, products, roles, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::profile,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        roles::list_roles,
        roles::get_role,
        roles::create_role,
        roles::update_role,
        roles::delete_role,
        roles::list_user_roles,
        roles::add_user_role,
        roles::remove_user_role,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        favorites::list_favorites,
        favorites::get_favorite,
        favorites::check_favorite,
        favorites::add_favorite,
        favorites::remove_favorite,
        favorites::remove_favorite_by_product,
        orders::list_orders,
        orders::place_order,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        order_items::list_order_items,
        order_items::create_order_item,
        order_items::update_order_item,
        order_items::delete_order_item,
    ),
    components(
        schemas(
            User,
            UserSummary,
            Role,
            UserRole,
            Category,
            Product,
            CartItem,
            FavoriteItem,
            OrderDetail,
            OrderItem,
            OrderStatus,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            LoginResponse,
            ProfileResponse,
            CreateUserRequest,
            UpdateUserRequest,
            RoleRequest,
            AddUserRoleRequest,
            CreateCategoryRequest,
            CreateProductRequest,
            UpdateProductRequest,
            AddToCartRequest,
            UpdateCartItemRequest,
            AddFavoriteRequest,
            FavoriteCheckResponse,
            PlaceOrderRequest,
            LineItemRequest,
            UpdateOrderRequest,
            CreateOrderItemRequest,
            UpdateOrderItemRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Products", description = "Product endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Users", description = "User management"),
        (name = "Roles", description = "Roles and role assignments"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Favorites", description = "Favorite endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Order items", description = "Order line item endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
