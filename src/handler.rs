use std::sync::Arc;

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use tracing::info;

use crate::api::{APIResponse, ErrorResponse, QueryParams};
use crate::db::Database;
use crate::error::HandlerError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub session_ttl_hours: i64,
}

const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 9;

#[derive(Debug, PartialEq, Eq)]
pub struct HandlerParams {
    pub page: u32,
    pub limit: u32,
    pub offset: u64,
}

impl QueryParams {
    pub fn into_handler_params(self) -> HandlerParams {
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, DEFAULT_LIMIT);

        HandlerParams {
            page,
            limit,
            offset: u64::from(page - 1) * u64::from(limit),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let HandlerError::StorageError(e) = &self {
            tracing::error!(error = %format!("{:#}", e), "storage error");
            return (
                status,
                Json(ErrorResponse {
                    error: "internal error".to_string(),
                }),
            )
                .into_response();
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Redirect an anonymous visitor to the login page, remembering where they were.
pub fn login_redirect(next: &str) -> Response {
    let location = format!("/accounts/login/?next={}", urlencoding::encode(next));
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(APIResponse::new_from_msg("ok"))
}
