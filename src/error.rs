use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::ports::RepositoryError;
use crate::response::{Envelope, ResultCode};
use crate::validation::{ValidationError, ValidationErrors};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    Business(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Internal(String),
}

/// Which code unexpected failures are reported under.
///
/// `BusinessCode` reports them as 1002 like business rule violations; `SystemCode`
/// reports the dedicated -1 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SystemErrorPolicy {
    #[default]
    BusinessCode,
    SystemCode,
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<ValidationError> for AppError {
    fn from(error: ValidationError) -> Self {
        AppError::Validation(error.into())
    }
}

impl AppError {
    pub fn result_code(&self, policy: SystemErrorPolicy) -> ResultCode {
        match self {
            AppError::Validation(_) => ResultCode::ParamError,
            AppError::Business(_) => ResultCode::BizError,
            AppError::Repository(_) | AppError::Internal(_) => match policy {
                SystemErrorPolicy::BusinessCode => ResultCode::BizError,
                SystemErrorPolicy::SystemCode => ResultCode::SystemError,
            },
        }
    }

    /// Logs the failure and renders it as a failure envelope.
    pub fn into_envelope(self, policy: SystemErrorPolicy) -> Envelope<()> {
        let code = self.result_code(policy);
        match &self {
            AppError::Validation(errors) => {
                tracing::warn!(errors = %errors, "Request validation failed");
            }
            AppError::Business(msg) => {
                tracing::warn!(error = %msg, "Business rule violated");
            }
            AppError::Repository(_) | AppError::Internal(_) => {
                tracing::error!(error = ?self, "Unexpected error");
            }
        }

        let msg = self.to_string();
        if msg.is_empty() {
            Envelope::fail(code, ResultCode::SystemError.msg())
        } else {
            Envelope::fail(code, msg)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_envelope(SystemErrorPolicy::default())
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_validation_error_code() {
        let error = AppError::from(ValidationError::new("amount", "must not be null"));
        assert_eq!(
            error.result_code(SystemErrorPolicy::BusinessCode),
            ResultCode::ParamError
        );
        assert_eq!(
            error.into_envelope(SystemErrorPolicy::BusinessCode).msg,
            "{amount=must not be null}"
        );
    }

    #[test]
    fn test_business_error_code_ignores_policy() {
        let error = AppError::Business("Transaction with id 999 does not exist.".to_string());
        assert_eq!(
            error.result_code(SystemErrorPolicy::SystemCode),
            ResultCode::BizError
        );
    }

    #[test]
    fn test_unexpected_error_uses_business_code_by_default() {
        let error = AppError::Repository(RepositoryError::Sqlx(sqlx::Error::PoolTimedOut));
        let envelope = error.into_envelope(SystemErrorPolicy::default());

        assert_eq!(envelope.code, 1002);
        assert!(envelope.msg.contains("Database error"));
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_unexpected_error_uses_system_code_when_enabled() {
        let error = AppError::Internal("boom".to_string());
        let envelope = error.into_envelope(SystemErrorPolicy::SystemCode);

        assert_eq!(envelope.code, -1);
        assert_eq!(envelope.msg, "boom");
    }

    #[test]
    fn test_empty_message_falls_back_to_generic_text() {
        let envelope = AppError::Internal(String::new()).into_envelope(SystemErrorPolicy::default());

        assert_eq!(envelope.code, 1002);
        assert_eq!(envelope.msg, "system error");
    }

    #[tokio::test]
    async fn test_error_response_is_http_ok() {
        let response = AppError::Business("duplicate".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["code"], 1002);
        assert_eq!(value["msg"], "duplicate");
        assert!(value["data"].is_null());
    }
}
