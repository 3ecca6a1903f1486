//! Handler-level request logging.
//!
//! [`ActionLogger::run`] wraps one action (the body of a handler) and logs it
//! together with its arguments and result payload:
//!
//! ```rust,ignore
//! async fn create_order(
//!     log: ActionLogger,
//!     info: RequestInfo,
//!     Json(order): Json<Order>,
//! ) -> Result<ActionResult, ActionError> {
//!     log.run(&info, &order, async {
//!         let id = store(&order).await?;
//!         Ok(ActionResult::payload(StatusCode::CREATED, id))
//!     })
//!     .await
//! }
//! ```
//!
//! An `Err` returned by the action is logged at `Error`. With an
//! [`on_error`](ActionLogger::on_error) handler configured, the error is
//! replaced by the handler's result (e.g. a `200` acknowledgement that embeds
//! the error) and does not propagate further; the record still goes out at
//! `Error`, with the replacement's status and body.

use std::{future::Future, panic::AssertUnwindSafe, sync::Arc, time::Instant};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::FutureExt as _;
use serde::Serialize;

use crate::{
    context::RequestInfo,
    error::ActionError,
    outcome::{panic_message, Severity, FAILURE_STATUS},
    record::{LogRecord, RecordKind, RecordSink, TracingSink},
    request_log::elapsed_ms,
    value::LogValue,
};

/// Successful outcome of an action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// Status plus a body, rendered as JSON.
    Payload { status: StatusCode, body: LogValue },
    /// Status only, empty body.
    StatusOnly { status: StatusCode },
}

impl ActionResult {
    /// `200 OK` with `body`.
    pub fn ok(body: impl Into<LogValue>) -> Self {
        Self::payload(StatusCode::OK, body)
    }

    pub fn payload(status: StatusCode, body: impl Into<LogValue>) -> Self {
        Self::Payload { status, body: body.into() }
    }

    /// Any serializable body, dispatched through [`LogValue::capture`].
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Self {
        Self::Payload { status, body: LogValue::capture(body) }
    }

    pub fn status(status: StatusCode) -> Self {
        Self::StatusOnly { status }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Payload { status, .. } | Self::StatusOnly { status } => *status,
        }
    }

    pub fn body(&self) -> Option<&LogValue> {
        match self {
            Self::Payload { body, .. } => Some(body),
            Self::StatusOnly { .. } => None,
        }
    }
}

impl IntoResponse for ActionResult {
    fn into_response(self) -> Response {
        match self {
            Self::Payload { status, body } => (status, Json(body.to_json())).into_response(),
            Self::StatusOnly { status } => status.into_response(),
        }
    }
}

/// What an error handler gets to look at.
#[derive(Debug)]
pub struct FailedAction<'a> {
    pub error: &'a ActionError,
    pub request: &'a RequestInfo,
    pub arguments: &'a LogValue,
}

type ErrorHandler = Arc<dyn Fn(&FailedAction<'_>) -> ActionResult + Send + Sync>;

/// Logs handler actions to a [`RecordSink`].
///
/// Register with [`RouterExt::with_action_log`](crate::RouterExt::with_action_log)
/// and extract it in handlers, or carry it in your own state.
#[derive(Clone)]
pub struct ActionLogger {
    sink: Arc<dyn RecordSink>,
    on_error: Option<ErrorHandler>,
}

impl ActionLogger {
    pub fn new(sink: impl RecordSink) -> Self {
        Self {
            sink: Arc::new(sink),
            on_error: None,
        }
    }

    /// Logger emitting through [`TracingSink`].
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    /// Replace failed outcomes with the handler's result.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&FailedAction<'_>) -> ActionResult + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Run `action`, logging exactly one record for it.
    ///
    /// `arguments` are captured before the action starts. A panic inside the
    /// action is logged as a `500` error and then resumed.
    pub async fn run<A, Fut>(
        &self,
        request: &RequestInfo,
        arguments: &A,
        action: Fut,
    ) -> Result<ActionResult, ActionError>
    where
        A: Serialize + ?Sized,
        Fut: Future<Output = Result<ActionResult, ActionError>>,
    {
        let start = Instant::now();
        let arguments = LogValue::capture(arguments);

        let outcome = AssertUnwindSafe(action).catch_unwind().await;
        let elapsed = elapsed_ms(start);

        match outcome {
            Ok(Ok(result)) => {
                let level = Severity::classify(result.status_code(), false);
                let record = LogRecord::new(
                    RecordKind::Action,
                    request,
                    level,
                    result.status_code(),
                    elapsed,
                )
                .with_bodies(arguments, result.body().cloned());
                self.sink.emit(&record);
                Ok(result)
            }
            Ok(Err(error)) => self.fail(request, arguments, error, elapsed),
            Err(payload) => {
                let record = LogRecord::new(
                    RecordKind::Action,
                    request,
                    Severity::classify(FAILURE_STATUS, true),
                    FAILURE_STATUS,
                    elapsed,
                )
                .with_bodies(arguments, None)
                .with_error(panic_message(payload.as_ref()));
                self.sink.emit(&record);
                std::panic::resume_unwind(payload)
            }
        }
    }

    fn fail(
        &self,
        request: &RequestInfo,
        arguments: LogValue,
        error: ActionError,
        elapsed: f64,
    ) -> Result<ActionResult, ActionError> {
        let Some(handler) = &self.on_error else {
            let record = LogRecord::new(
                RecordKind::Action,
                request,
                Severity::classify(FAILURE_STATUS, true),
                FAILURE_STATUS,
                elapsed,
            )
            .with_bodies(arguments, None)
            .with_error(error.to_string());
            self.sink.emit(&record);
            return Err(error);
        };

        let replacement = handler(&FailedAction {
            error: &error,
            request,
            arguments: &arguments,
        });
        let record = LogRecord::new(
            RecordKind::Action,
            request,
            Severity::classify(replacement.status_code(), true),
            replacement.status_code(),
            elapsed,
        )
        .with_bodies(arguments, replacement.body().cloned())
        .with_error(error.to_string());
        self.sink.emit(&record);
        Ok(replacement)
    }
}

impl Default for ActionLogger {
    fn default() -> Self {
        Self::tracing()
    }
}

impl std::fmt::Debug for ActionLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionLogger")
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

/// Rejection when a handler extracts an [`ActionLogger`] that was never
/// registered on the router.
#[derive(Debug)]
pub struct MissingActionLogger;

impl IntoResponse for MissingActionLogger {
    fn into_response(self) -> Response {
        tracing::error!("ActionLogger extracted but not registered; use RouterExt::with_action_log");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

impl<S> FromRequestParts<S> for ActionLogger
where
    S: Send + Sync,
{
    type Rejection = MissingActionLogger;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ActionLogger>()
            .cloned()
            .ok_or(MissingActionLogger)
    }
}
