//! JSON response envelope.
//!
//! Every endpoint answers `{"code": .., "message": .., "data": ..}`; `code` is
//! 0 on success and the HTTP status otherwise.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// `200 {"code":0,"message":..}`.
pub fn ok(message: impl Into<String>) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::<()> {
            code: 0,
            message: message.into(),
            data: None,
        }),
    )
        .into_response()
}

/// `200 {"code":0,"data":..}`.
pub fn data<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse {
            code: 0,
            message: String::new(),
            data: Some(data),
        }),
    )
        .into_response()
}

/// `{status} {"code":{status},"message":..}`.
pub fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            code: status.as_u16(),
            message: message.into(),
            data: None,
        }),
    )
        .into_response()
}
