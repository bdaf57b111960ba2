//! 控制器辅助函数

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// 错误响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// 有结果时返回 200，否则返回 404
pub fn handle_result<T: Serialize>(result: Option<T>) -> Response {
    match result {
        Some(value) => (StatusCode::OK, Json(value)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// 返回 400 和错误信息
pub fn handle_error(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, message)
}

/// 指定状态码的错误响应
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
        .into_response()
}
