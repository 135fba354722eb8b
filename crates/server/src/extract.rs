use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use callplan_core::domain::user::UserId;
use callplan_workflow::Caller;

use crate::error::ApiError;

/// Set by the credential layer in front of this service.
pub const USER_HEADER: &str = "x-callplan-user";
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// The identified caller of a request. Requests without a user header are rejected with 401.
#[derive(Clone, Debug)]
pub struct CurrentCaller(pub Caller);

impl<S> FromRequestParts<S> for CurrentCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = header_value(parts, CORRELATION_HEADER)
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let Some(user_id) = header_value(parts, USER_HEADER) else {
            return Err(ApiError::unauthorized(
                format!("missing `{USER_HEADER}` header"),
                &correlation_id,
            ));
        };

        Ok(Self(Caller::with_correlation_id(UserId(user_id.to_owned()), correlation_id)))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
