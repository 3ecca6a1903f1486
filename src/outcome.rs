//! Outcome classification shared by both request loggers.

use axum::http::StatusCode;
use serde::Serialize;

/// Status recorded when the downstream call failed without producing a
/// response of its own.
pub const FAILURE_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// Severity of a request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Information,
    Error,
}

impl Severity {
    /// Pick the severity for a completed request.
    ///
    /// Anything above 499 is an error, as is any call that failed outright,
    /// whatever status ended up being reported for it.
    pub fn classify(status: StatusCode, failed: bool) -> Self {
        if failed || status.as_u16() > 499 {
            Self::Error
        } else {
            Self::Information
        }
    }

    pub fn is_error(self) -> bool {
        self == Self::Error
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Information => "information",
            Self::Error => "error",
        })
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_owned()
    }
}
