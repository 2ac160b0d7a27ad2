use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::categories::CreateCategoryRequest,
    entity::{
        Categories,
        categories::{ActiveModel as CategoryActive, Column as CategoryCol},
    },
    error::{AppError, AppResult},
    models::Category,
    response::{ApiResponse, Page},
    routes::params::{ListQuery, text_filter},
    state::AppState,
};

pub async fn list_categories(state: &AppState, query: ListQuery) -> AppResult<Page<Category>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(search) = text_filter(&query.filter) {
        condition = condition.add(Expr::col(CategoryCol::Name).ilike(format!("%{}%", search)));
    }

    let finder = Categories::find()
        .filter(condition)
        .order_by_asc(CategoryCol::Name);
    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    Ok(Page::new(items, page, limit, total))
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Category"))?;
    Ok(ApiResponse::success("Category", category.into()))
}

pub async fn create_category(
    state: &AppState,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    let name = payload.name.trim();
    let url = payload.url.trim();
    if name.is_empty() || url.is_empty() {
        return Err(AppError::BadRequest("Name and url are required".into()));
    }

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        url: Set(url.to_string()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(category_id = %category.id, "category created");
    Ok(ApiResponse::success("Category created", category.into()))
}
