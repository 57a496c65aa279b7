use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Code carried by every successful envelope.
pub const SUCCESS_CODE: i32 = 0;

/// Uniform response envelope: `{ code, message, data }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub code: i32,
    pub message: Option<String>,
    pub data: Option<T>,
}

pub fn success<T>(data: T) -> Response
where
    T: Serialize,
{
    let body = ApiResponse {
        code: SUCCESS_CODE,
        message: None,
        data: Some(data),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn success_with_message<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    let body = ApiResponse {
        code: SUCCESS_CODE,
        message: Some(message.into()),
        data: Some(data),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error(code: i32, message: impl Into<String>, status: StatusCode) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        code,
        message: Some(message.into()),
        data: None,
    };

    (status, Json(body)).into_response()
}
