//! 统一 API 响应信封
//!
//! 成功：{"data": ..., "meta"?: ...}
//! 失败：{"error": {"code": "...", "message": "..."}}
//! HTTP 状态码跟随错误码类别。

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use serde_json::json;

use crate::errors::ShortspanError;

/// API 错误码（封闭集合）
///
/// token/email 类错误码属于认证协作方的信封兼容层，核心只发出前七种。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    InternalError,
    TokenExpired,
    TokenInvalid,
    TokenConsumed,
    EmailSendFailed,
}

impl ApiErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorCode::ValidationError => "VALIDATION_ERROR",
            ApiErrorCode::Unauthorized => "UNAUTHORIZED",
            ApiErrorCode::Forbidden => "FORBIDDEN",
            ApiErrorCode::NotFound => "NOT_FOUND",
            ApiErrorCode::Conflict => "CONFLICT",
            ApiErrorCode::RateLimited => "RATE_LIMITED",
            ApiErrorCode::InternalError => "INTERNAL_ERROR",
            ApiErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ApiErrorCode::TokenInvalid => "TOKEN_INVALID",
            ApiErrorCode::TokenConsumed => "TOKEN_CONSUMED",
            ApiErrorCode::EmailSendFailed => "EMAIL_SEND_FAILED",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::Conflict => StatusCode::CONFLICT,
            ApiErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorCode::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiErrorCode::TokenInvalid => StatusCode::UNAUTHORIZED,
            ApiErrorCode::TokenConsumed => StatusCode::UNAUTHORIZED,
            ApiErrorCode::EmailSendFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 成功响应
pub fn success<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "data": data }))
}

/// 带 meta 的成功响应（分页游标等）
pub fn success_with_meta<T: Serialize, M: Serialize>(data: T, meta: M) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "data": data, "meta": meta }))
}

/// 错误响应
pub fn error_response(code: ApiErrorCode, message: &str) -> HttpResponse {
    HttpResponse::build(code.status_code()).json(json!({
        "error": { "code": code.as_str(), "message": message }
    }))
}

/// 内部错误 → API 错误码映射
pub fn error_from_shortspan(e: &ShortspanError) -> HttpResponse {
    match e {
        ShortspanError::Validation(msg) => error_response(ApiErrorCode::ValidationError, msg),
        ShortspanError::NotFound(msg) => error_response(ApiErrorCode::NotFound, msg),
        _ => {
            tracing::error!("API internal error: {}", e);
            error_response(ApiErrorCode::InternalError, "Internal server error")
        }
    }
}
