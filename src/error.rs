//! Error types.
//!
//! [`Error`] covers misconfiguration detected while a middleware is being
//! built. [`ActionError`] is the failure half of a handler-level action run
//! through [`ActionLogger`](crate::ActionLogger): it wraps [`anyhow::Error`]
//! and converts into a `500` JSON response via [`IntoResponse`], so handlers
//! can return `Result<ActionResult, ActionError>` and propagate with `?`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Configuration errors raised while building a middleware.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid correlation header name `{0}`")]
    InvalidHeaderName(String),
}

/// A failed action outcome.
///
/// Any type that implements `Into<anyhow::Error>` (which includes `io::Error`,
/// `serde_json::Error`, and any `#[derive(thiserror::Error)]` type) converts
/// into an [`ActionError`] via the blanket [`From`] implementation.
#[derive(Debug)]
pub struct ActionError(anyhow::Error);

impl ActionError {
    /// Build an error from a plain message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self(anyhow::Error::msg(message))
    }

    /// The wrapped error.
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

impl<E> From<E> for ActionError
where
    E: Into<anyhow::Error>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}
