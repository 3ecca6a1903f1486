//! # correlog
//!
//! Correlation-id propagation and structured request logging for axum.
//!
//! Two independent interceptors:
//!
//! - [`correlation_id_middleware`] reads the `X-Correlation-ID` header (or
//!   generates one), exposes it as a [`CorrelationId`] extension and a
//!   `correlation` tracing span for the lifetime of the request, and echoes it
//!   on the response.
//! - [`request_log_middleware`] emits one record per request with method,
//!   path, status and elapsed time, at `Error` for status > 499 or a panic and
//!   at `Information` otherwise. [`ActionLogger`] does the same at handler
//!   level, adding the handler's arguments and result payload.
//!
//! Records go to a [`RecordSink`]; [`TracingSink`] (the default) turns them
//! into `tracing` events under the `correlog::request` target.
//!
//! ## Wiring
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use correlog::{CorrelationIdConfig, RequestLogger, RouterExt};
//!
//! # fn build() -> Result<Router, correlog::Error> {
//! let app = Router::new()
//!     .route("/ping", get(|| async { "Pong" }))
//!     .with_request_log(RequestLogger::tracing())
//!     // Added last, so it runs first and the log records see the id.
//!     .with_correlation_id(CorrelationIdConfig::default())?;
//! # Ok(app)
//! # }
//! ```

mod action_log;
mod context;
mod correlation;
mod error;
mod outcome;
mod record;
mod request_log;
mod value;

pub mod config;

#[cfg(test)]
mod test_support;

use axum::{middleware, Extension, Router};

pub use action_log::{ActionLogger, ActionResult, FailedAction, MissingActionLogger};
pub use context::{BufferedForm, ErrorContext, RequestInfo};
pub use correlation::{
    correlation_id_middleware, CorrelationId, CorrelationIdConfig, CorrelationIdSettings,
    IdGenerator, DEFAULT_HEADER,
};
pub use error::{ActionError, Error};
pub use outcome::{Severity, FAILURE_STATUS};
pub use record::{LogRecord, MemorySink, RecordKind, RecordSink, TracingSink, LOG_TARGET};
pub use request_log::{request_log_middleware, RequestLogger};
pub use value::LogValue;

/// Attach the interceptors to an axum [`Router`].
///
/// Each call wraps the routes registered so far; the last layer added runs
/// first. Add the correlation id last so the loggers run inside its span.
pub trait RouterExt: Sized {
    /// Propagate correlation ids. Fails if the configured header name is invalid.
    fn with_correlation_id(self, config: CorrelationIdConfig) -> Result<Self, Error>;

    /// Log every request with the simple request logger.
    fn with_request_log(self, logger: RequestLogger) -> Self;

    /// Make `logger` available to handlers as an extractor.
    fn with_action_log(self, logger: ActionLogger) -> Self;
}

impl<S> RouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_correlation_id(self, config: CorrelationIdConfig) -> Result<Self, Error> {
        let settings = config.build()?;
        Ok(self.layer(middleware::from_fn_with_state(
            settings,
            correlation_id_middleware,
        )))
    }

    fn with_request_log(self, logger: RequestLogger) -> Self {
        self.layer(middleware::from_fn_with_state(logger, request_log_middleware))
    }

    fn with_action_log(self, logger: ActionLogger) -> Self {
        self.layer(Extension(logger))
    }
}
