//! Common response envelope

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::FieldErrors;

/// Standard API response wrapper
///
/// Every endpoint answers with this envelope.
/// On success: `{"success": true, "message": "...", "data": {...}}`,
/// on failure: `{"success": false, "message": "...", "errors": {"field": ["..."]}}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Field-keyed validation messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<FieldErrors>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
        }
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            errors: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            errors: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            errors: None,
        }
    }

    pub fn validation(message: impl Into<String>, errors: FieldErrors) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            errors: Some(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_omits_empty_fields() {
        let body = serde_json::to_value(ApiResponse::error("nope")).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "message": "nope"}));
    }

    #[test]
    fn validation_envelope_lists_field_errors() {
        let mut errors = FieldErrors::new();
        errors.insert("email".into(), vec!["taken".into()]);
        let body =
            serde_json::to_value(ApiResponse::validation("Validation failed", errors)).unwrap();
        assert_eq!(body["errors"]["email"][0], "taken");
    }
}
