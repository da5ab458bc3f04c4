use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::{ApiError, SERVER_ERROR_MESSAGE};
use crate::proxy::envelope::json_response;

/// Success envelope for endpoints the gateway answers itself:
/// `{ "success": true, "data": ... }` with the usual no-store headers.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return ApiError::internal_server_error(SERVER_ERROR_MESSAGE)
                    .into_response_with_no_store();
            }
        };

        json_response(self.status_code, json!({ "success": true, "data": data }), None)
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
