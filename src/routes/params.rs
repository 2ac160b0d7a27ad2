use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Raw `page` / `limit` query values. Kept as strings so that junk input falls
/// back to the defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl Pagination {
    /// Returns `(page, limit, offset)`.
    pub fn normalize(&self) -> (u64, u64, u64) {
        let page = positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE);
        let limit = positive(self.limit.as_deref())
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        let offset = (page - 1).saturating_mul(limit);
        (page, limit, offset)
    }
}

fn positive(value: Option<&str>) -> Option<u64> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as u64)
}

/// Trimmed, non-empty free-text filter.
pub fn text_filter(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub filter: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserRoleQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub user_id: Option<Uuid>,
    pub role_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CartQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub user_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FavoriteQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub user_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FavoriteCheckQuery {
    pub user_id: Option<Uuid>,
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FavoriteDeleteQuery {
    pub user_id: Option<Uuid>,
    pub product_id: Uuid,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderItemQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub order_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pagination(page: Option<&str>, limit: Option<&str>) -> Pagination {
        Pagination {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn defaults_when_absent() {
        assert_eq!(pagination(None, None).normalize(), (1, 10, 0));
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(pagination(Some("3"), Some("20")).normalize(), (3, 20, 40));
    }

    #[test]
    fn junk_and_non_positive_values_fall_back() {
        assert_eq!(pagination(Some("abc"), Some("-5")).normalize(), (1, 10, 0));
        assert_eq!(pagination(Some("0"), Some("0")).normalize(), (1, 10, 0));
    }

    #[test]
    fn limit_is_capped() {
        assert_eq!(pagination(Some("1"), Some("5000")).normalize(), (1, 100, 0));
    }

    #[test]
    fn blank_text_filter_is_ignored() {
        assert_eq!(text_filter(&Some("  ".into())), None);
        assert_eq!(text_filter(&Some(" shoe ".into())), Some("shoe"));
        assert_eq!(text_filter(&None), None);
    }
}
