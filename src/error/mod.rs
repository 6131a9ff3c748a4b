//! Error codes and the application error type
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Cart errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Coupon / discount errors
//! - 7xxx: Catalog errors
//! - 9xxx: System errors

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Unified error code enum, serialized as a bare u16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Email not verified
    EmailNotVerified = 1005,
    /// Verification code expired
    VerificationCodeExpired = 1006,
    /// Verification code invalid
    VerificationCodeInvalid = 1007,
    /// Too many verification attempts
    TooManyAttempts = 1008,
    /// Password too short
    PasswordTooShort = 1009,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2002,

    // ==================== 3xxx: Cart ====================
    /// Cart not found
    CartNotFound = 3001,
    /// Cart is empty
    CartEmpty = 3002,
    /// Quantity per product exceeds the allowed maximum
    QuantityLimitExceeded = 3003,
    /// Not enough stock available
    InsufficientStock = 3004,
    /// Product is not active
    ProductInactive = 3005,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Payment for this session was not completed
    PaymentNotCompleted = 4002,

    // ==================== 5xxx: Payment ====================
    /// Payment not found
    PaymentNotFound = 5001,
    /// Only succeeded payments can be refunded
    RefundNotAllowed = 5002,
    /// Payment provider call failed
    PaymentProviderError = 5003,

    // ==================== 6xxx: Coupon / Discount ====================
    /// Coupon or discount code is invalid
    CodeInvalid = 6001,
    /// Coupon or discount code has expired
    CodeExpired = 6002,
    /// Coupon usage limit reached
    CouponExhausted = 6003,
    /// Coupon already used by this user
    CouponAlreadyUsed = 6004,
    /// Cart total below the code's minimum
    MinPurchaseNotMet = 6005,

    // ==================== 7xxx: Catalog ====================
    /// Product not found
    ProductNotFound = 7001,
    /// Category not found
    CategoryNotFound = 7002,
    /// Category still has products
    CategoryInUse = 7003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code as u16
    }
}

impl ErrorCode {
    /// HTTP status this code maps to
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::CartEmpty
            | Self::QuantityLimitExceeded
            | Self::InsufficientStock
            | Self::ProductInactive
            | Self::PaymentNotCompleted
            | Self::RefundNotAllowed
            | Self::CodeInvalid
            | Self::CodeExpired
            | Self::CouponExhausted
            | Self::CouponAlreadyUsed
            | Self::MinPurchaseNotMet
            | Self::EmailNotVerified
            | Self::VerificationCodeExpired
            | Self::VerificationCodeInvalid
            | Self::PasswordTooShort => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied | Self::AdminRequired => StatusCode::FORBIDDEN,
            Self::NotFound
            | Self::CartNotFound
            | Self::OrderNotFound
            | Self::PaymentNotFound
            | Self::ProductNotFound
            | Self::CategoryNotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists | Self::CategoryInUse => StatusCode::CONFLICT,
            Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError | Self::PaymentProviderError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Default human-readable message
    pub fn message(self) -> &'static str {
        match self {
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::NotAuthenticated => "Authentication required",
            Self::InvalidCredentials => "Invalid credentials",
            Self::TokenExpired => "Token expired",
            Self::TokenInvalid => "Invalid token",
            Self::EmailNotVerified => "Please verify your email first",
            Self::VerificationCodeExpired => "Verification code expired",
            Self::VerificationCodeInvalid => "Verification code invalid",
            Self::TooManyAttempts => "Too many attempts, request a new code",
            Self::PasswordTooShort => "Password must be at least 8 characters",
            Self::PermissionDenied => "Permission denied",
            Self::AdminRequired => "Admin role required",
            Self::CartNotFound => "Cart not found",
            Self::CartEmpty => "Cart is empty",
            Self::QuantityLimitExceeded => "Quantity per product cannot exceed 10",
            Self::InsufficientStock => "Not enough stock available",
            Self::ProductInactive => "Product is not active",
            Self::OrderNotFound => "Order not found",
            Self::PaymentNotCompleted => "Payment not completed",
            Self::PaymentNotFound => "Payment not found",
            Self::RefundNotAllowed => "Only succeeded payments can be refunded",
            Self::PaymentProviderError => "Payment provider call failed",
            Self::CodeInvalid => "Invalid code",
            Self::CodeExpired => "Code has expired",
            Self::CouponExhausted => "Coupon usage limit reached",
            Self::CouponAlreadyUsed => "Coupon already used",
            Self::MinPurchaseNotMet => "Cart total below the required minimum",
            Self::ProductNotFound => "Product not found",
            Self::CategoryNotFound => "Category not found",
            Self::CategoryInUse => "Category still has products",
            Self::InternalError => "Internal server error",
        }
    }
}

/// Application error with structured error code and details
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a not found error for a named resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{r} not found")).with_detail("resource", r)
    }
}

/// JSON error envelope: `{ "code": u16, "message": ..., "details": {...} }`
#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<HashMap<String, Value>>,
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.code.http_status();
        if status.is_server_error() {
            tracing::error!(code = u16::from(self.code), message = %self.message, "System error");
        }
        let body = ErrorBody {
            code: self.code.into(),
            message: self.message,
            details: self.details,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::ProductNotFound);
        assert_eq!(err.code, ErrorCode::ProductNotFound);
        assert_eq!(err.message, "Product not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_message_and_detail() {
        let err = AppError::with_message(ErrorCode::ValidationFailed, "Invalid email format")
            .with_detail("field", "email");
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.message, "Invalid email format");
        assert_eq!(err.details.unwrap().get("field").unwrap(), "email");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            AppError::new(ErrorCode::CartNotFound).code.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::new(ErrorCode::NotAuthenticated).code.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::new(ErrorCode::AdminRequired).code.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::new(ErrorCode::InsufficientStock).code.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::new(ErrorCode::InternalError).code.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_carries_resource_detail() {
        let err = AppError::not_found("Order");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Order not found");
        assert!(err.details.as_ref().unwrap().contains_key("resource"));
    }

    #[test]
    fn test_error_code_serializes_as_u16() {
        let json = serde_json::to_string(&ErrorCode::CouponExhausted).unwrap();
        assert_eq!(json, "6003");
    }
}
