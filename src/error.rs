//! API error type with HTTP response mapping.
//!
//! Every failure leaving a handler goes through here, so all error
//! responses share the `{"success": false, "message": ...}` shape;
//! validation failures additionally carry per-field descriptors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::checkout::CheckoutError;
use crate::domain::aggregates::CartError;
use crate::store::StoreError;

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Malformed input; reported with field-level detail, nothing
    /// mutated.
    Validation(Vec<FieldError>),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError { field: field.into(), message: message.into() }])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            Self::Validation(errors) => {
                (StatusCode::BAD_REQUEST, "Validation failed".to_string(), Some(errors))
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message, None),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message, None),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
            Self::Internal(message) => {
                tracing::error!(error = %message, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string(), None)
            }
        };

        let mut body = serde_json::json!({ "success": false, "message": message });
        if let Some(errors) = errors {
            body["errors"] = serde_json::json!(errors);
        }
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound => Self::NotFound(err.to_string()),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match &err {
            CheckoutError::EmptyCart
            | CheckoutError::ProductGone
            | CheckoutError::ProductUnavailable { .. }
            | CheckoutError::InsufficientStock { .. }
            | CheckoutError::Order(_) => Self::BadRequest(err.to_string()),
            CheckoutError::NotFound => Self::NotFound(err.to_string()),
            CheckoutError::Forbidden => Self::Forbidden(err.to_string()),
            CheckoutError::Store(inner) => Self::Internal(inner.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_field_errors(&errors, "", &mut fields);
        Self::Validation(fields)
    }
}

fn collect_field_errors(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() { (*field).to_string() } else { format!("{prefix}.{field}") };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    out.push(FieldError { field: path.clone(), message });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_error_mapping() {
        assert!(matches!(ApiError::from(CheckoutError::EmptyCart), ApiError::BadRequest(_)));
        assert!(matches!(ApiError::from(CheckoutError::NotFound), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from(CheckoutError::Forbidden), ApiError::Forbidden(_)));
    }

    #[test]
    fn test_cart_error_maps_to_not_found() {
        let err = ApiError::from(CartError::ItemNotFound);
        match err {
            ApiError::NotFound(message) => assert_eq!(message, "Item not found in cart"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
