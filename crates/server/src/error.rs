use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use callplan_core::errors::{ApplicationError, InterfaceError};
use callplan_workflow::Caller;

/// A failed request, rendered as `{ error, message, correlation_id }`.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: String,
    correlation_id: &'a str,
}

impl ApiError {
    pub fn from_application(error: ApplicationError, correlation_id: &str) -> Self {
        Self(error.into_interface(correlation_id))
    }

    pub fn unauthorized(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::Unauthorized {
            message: message.into(),
            correlation_id: correlation_id.to_owned(),
        })
    }

    pub fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation_id.to_owned(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::InvalidState { .. } => StatusCode::CONFLICT,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::Conflict { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                event_name = "http.request.failed",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
        }

        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.user_message(),
            correlation_id: self.0.correlation_id(),
        };
        (status, Json(body)).into_response()
    }
}

/// Attaches the caller's correlation id to a workflow failure.
pub trait ForCaller<T> {
    fn for_caller(self, caller: &Caller) -> Result<T, ApiError>;
}

impl<T> ForCaller<T> for Result<T, ApplicationError> {
    fn for_caller(self, caller: &Caller) -> Result<T, ApiError> {
        self.map_err(|error| ApiError::from_application(error, &caller.correlation_id))
    }
}
