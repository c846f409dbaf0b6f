//! Success envelope: `{success, statusCode, data, count?, page?, limit?}`

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::Page;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, T> {
    success: bool,
    status_code: u16,
    data: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
struct PageMeta {
    count: u64,
    page: u64,
    limit: u64,
}

/// Wrapper for API responses that adds the success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    data: T,
    meta: Option<PageMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
            meta: None,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
            meta: None,
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// List response carrying `count`, `page` and `limit`
    pub fn page(page: Page<T>) -> Self {
        Self {
            status: StatusCode::OK,
            meta: Some(PageMeta {
                count: page.count,
                page: page.page,
                limit: page.limit,
            }),
            data: page.items,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            success: true,
            status_code: self.status.as_u16(),
            data: &self.data,
            count: self.meta.map(|m| m.count),
            page: self.meta.map(|m| m.page),
            limit: self.meta.map(|m| m.limit),
        };
        (self.status, Json(envelope)).into_response()
    }
}

/// Returned by every DELETE endpoint
#[derive(Debug, Clone, Copy, Serialize, utoipa::ToSchema)]
pub struct Deleted {
    pub id: i32,
}
