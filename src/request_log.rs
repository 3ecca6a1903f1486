//! Simple request logging middleware.
//!
//! Times the downstream call and emits one record per request:
//!
//! - `Information` for responses with status ≤ 499
//! - `Error` for status > 499, with the request's error context attached
//! - `Error` with status 500 when the downstream future panics; the panic is
//!   then resumed unchanged, so an outer `CatchPanicLayer` (or the server)
//!   still sees it
//!
//! Url-encoded form bodies are buffered before the call so their fields can
//! be reported on error records. Buffering goes through the `Bytes`
//! extractor and so honors `DefaultBodyLimit`; every form body up to that
//! limit is held in memory for the duration of the request. A body that
//! fails to read is answered with the extractor's rejection (`400`, or `413`
//! over the limit) and logged at `Error`; the handler is not called.

use std::{
    panic::AssertUnwindSafe,
    sync::Arc,
    time::Instant,
};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt as _;

use crate::{
    context::{self, RequestInfo},
    outcome::{panic_message, Severity, FAILURE_STATUS},
    record::{LogRecord, RecordKind, RecordSink, TracingSink},
};

/// Middleware state: where request records go.
#[derive(Clone)]
pub struct RequestLogger {
    sink: Arc<dyn RecordSink>,
}

impl RequestLogger {
    pub fn new(sink: impl RecordSink) -> Self {
        Self { sink: Arc::new(sink) }
    }

    /// Logger emitting through [`TracingSink`].
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    fn log_response(&self, info: &RequestInfo, status: StatusCode, elapsed_ms: f64) {
        let level = Severity::classify(status, false);
        self.sink
            .emit(&LogRecord::new(RecordKind::Request, info, level, status, elapsed_ms));
    }

    fn log_failure(&self, info: &RequestInfo, status: StatusCode, message: String, elapsed_ms: f64) {
        let level = Severity::classify(status, true);
        let record = LogRecord::new(RecordKind::Request, info, level, status, elapsed_ms)
            .with_error(message);
        self.sink.emit(&record);
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::tracing()
    }
}

impl std::fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLogger").finish_non_exhaustive()
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Axum middleware that logs every request passing through it.
pub async fn request_log_middleware(
    State(logger): State<RequestLogger>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let req = match context::buffer_form(req).await {
        Ok(req) => req,
        Err((parts, rejection)) => {
            let info = RequestInfo::from_parts(&parts);
            let status = rejection.status();
            logger.log_failure(&info, status, rejection.body_text(), elapsed_ms(start));
            return rejection.into_response();
        }
    };
    let info = RequestInfo::from_request(&req);

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => {
            logger.log_response(&info, response.status(), elapsed_ms(start));
            response
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            logger.log_failure(&info, FAILURE_STATUS, message, elapsed_ms(start));
            std::panic::resume_unwind(payload)
        }
    }
}
