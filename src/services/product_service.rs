use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, UpdateProductRequest},
    entity::{
        Categories,
        products::{ActiveModel, Column, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Page},
    routes::params::{ProductQuery, text_filter},
    services::loaders,
    state::AppState,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::ActiveValue::NotSet;

pub async fn list_products(state: &AppState, query: ProductQuery) -> AppResult<Page<Product>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = text_filter(&query.name) {
        condition = condition.add(Expr::col(Column::Name).ilike(format!("%{}%", search)));
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await?;
    let rows = finder.limit(limit).offset(offset).all(&state.orm).await?;

    let items = loaders::hydrate_products(&state.orm, rows).await?;
    Ok(Page::new(items, page, limit, total))
}

async fn find_product(state: &AppState, id: Uuid) -> AppResult<Product> {
    loaders::load_products(&state.orm, &[id])
        .await?
        .remove(&id)
        .ok_or(AppError::NotFound("Product"))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    Ok(ApiResponse::success("Product", find_product(state, id).await?))
}

async fn ensure_category(state: &AppState, category_id: Uuid) -> AppResult<()> {
    if Categories::find_by_id(category_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest("Category not found".into()));
    }
    Ok(())
}

fn validate_amounts(price: Option<i64>, stock: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("Price must not be negative".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("Stock must not be negative".into()));
    }
    Ok(())
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    validate_amounts(Some(payload.price), Some(payload.stock))?;
    ensure_category(state, payload.category_id).await?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        price: Set(payload.price),
        description: Set(payload.description),
        image: Set(payload.image),
        color: Set(payload.color),
        size: Set(payload.size),
        stock: Set(payload.stock),
        category_id: Set(payload.category_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(product_id = %product.id, user_id = %user.user_id, "product created");
    Ok(ApiResponse::success(
        "Product created",
        find_product(state, product.id).await?,
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    validate_amounts(payload.price, payload.stock)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(image) = payload.image {
        active.image = Set(Some(image));
    }
    if let Some(color) = payload.color {
        active.color = Set(Some(color));
    }
    if let Some(size) = payload.size {
        active.size = Set(Some(size));
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(category_id) = payload.category_id {
        ensure_category(state, category_id).await?;
        active.category_id = Set(category_id);
    }

    active.update(&state.orm).await?;

    tracing::info!(product_id = %id, user_id = %user.user_id, "product updated");
    Ok(ApiResponse::success("Product updated", find_product(state, id).await?))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<()>> {
    let result = Products::delete_by_id(id)
        .exec(&state.orm)
        .await
        .map_err(|e| AppError::from_write(e, "Product is referenced by existing orders"))?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product"));
    }

    tracing::info!(product_id = %id, user_id = %user.user_id, "product deleted");
    Ok(ApiResponse::message("Product deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(validate_amounts(Some(-1), None).is_err());
        assert!(validate_amounts(None, Some(-1)).is_err());
        assert!(validate_amounts(Some(0), Some(0)).is_ok());
        assert!(validate_amounts(None, None).is_ok());
    }
}
