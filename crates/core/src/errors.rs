use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hierarchy::HierarchyError;
use crate::lifecycle::TransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} `{id}` is `{state}` and cannot {action}")]
    InvalidState { entity: &'static str, id: String, state: String, action: &'static str },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn invalid_state(
        entity: &'static str,
        id: impl Into<String>,
        state: impl Into<String>,
        action: &'static str,
    ) -> Self {
        Self::InvalidState { entity, id: id.into(), state: state.into(), action }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState { .. } | Self::Transition(_) => ErrorKind::InvalidState,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Hierarchy(error) => error.kind(),
        }
    }
}

/// Stable, caller-facing classification of a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Forbidden,
    Conflict,
    Validation,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidState => "invalid_state",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(error) => error.kind(),
            Self::Persistence(_) | Self::Integration(_) => ErrorKind::Unavailable,
            Self::Configuration(_) => ErrorKind::Internal,
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let kind = self.kind();
        let message = match &self {
            Self::Domain(error) => error.to_string(),
            Self::Persistence(_) | Self::Integration(_) => {
                "a dependency is temporarily unavailable".to_owned()
            }
            Self::Configuration(_) => "internal configuration error".to_owned(),
        };

        match kind {
            ErrorKind::NotFound => InterfaceError::NotFound { message, correlation_id },
            ErrorKind::InvalidState => InterfaceError::InvalidState { message, correlation_id },
            ErrorKind::Forbidden => InterfaceError::Forbidden { message, correlation_id },
            ErrorKind::Conflict => InterfaceError::Conflict { message, correlation_id },
            ErrorKind::Validation => InterfaceError::BadRequest { message, correlation_id },
            ErrorKind::Unavailable => InterfaceError::ServiceUnavailable { message, correlation_id },
            ErrorKind::Internal => InterfaceError::Internal { message, correlation_id },
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("invalid state: {message}")]
    InvalidState { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::NotFound { .. } => ErrorKind::NotFound.as_str(),
            Self::InvalidState { .. } => ErrorKind::InvalidState.as_str(),
            Self::Forbidden { .. } => ErrorKind::Forbidden.as_str(),
            Self::Conflict { .. } => ErrorKind::Conflict.as_str(),
            Self::BadRequest { .. } => ErrorKind::Validation.as_str(),
            Self::ServiceUnavailable { .. } => ErrorKind::Unavailable.as_str(),
            Self::Internal { .. } => ErrorKind::Internal.as_str(),
        }
    }

    /// The message returned to the caller. Domain failures carry their own reason; infrastructure
    /// failures collapse to a fixed sentence.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { message, .. }
            | Self::NotFound { message, .. }
            | Self::InvalidState { message, .. }
            | Self::Forbidden { message, .. }
            | Self::Conflict { message, .. }
            | Self::BadRequest { message, .. } => message.clone(),
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly.".to_owned()
            }
            Self::Internal { .. } => "An unexpected internal error occurred.".to_owned(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Unauthorized { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::InvalidState { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}
