use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

/// Envelope for paginated list endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            data,
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Page::<u8>::new(vec![], 1, 10, 0).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], 1, 10, 10).total_pages, 1);
        assert_eq!(Page::<u8>::new(vec![], 1, 10, 11).total_pages, 2);
    }

    #[test]
    fn page_serializes_camel_case_total_pages() {
        let json = serde_json::to_value(Page::new(vec![1, 2], 2, 2, 5)).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn message_only_response_omits_data() {
        let json = serde_json::to_value(ApiResponse::message("Deleted")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "Deleted" }));
    }
}
