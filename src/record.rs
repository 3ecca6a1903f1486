//! Request records and the sinks that receive them.
//!
//! Loggers build exactly one [`LogRecord`] per request and hand it to the
//! [`RecordSink`] they were constructed with. [`TracingSink`] turns records
//! into `tracing` events; [`MemorySink`] keeps them for inspection in tests.

use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use serde::Serialize;

use crate::{
    context::{ErrorContext, RequestInfo},
    outcome::Severity,
    value::LogValue,
};

/// Target of every event emitted by [`TracingSink`].
pub const LOG_TARGET: &str = "correlog::request";

/// Which logger produced a record; selects the message layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Middleware logger: method, path, status, timing.
    Request,
    /// Handler-level logger: adds arguments and result payload.
    Action,
}

/// One structured event describing a finished request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub kind: RecordKind,
    pub level: Severity,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub elapsed_ms: f64,
    pub correlation_id: Option<String>,
    pub request_body: Option<LogValue>,
    pub response_body: Option<LogValue>,
    /// Failure description for panics and action errors.
    pub error: Option<String>,
    /// Present on `Error` records only.
    pub error_context: Option<ErrorContext>,
}

impl LogRecord {
    /// Start a record for `info`. Error records get the request's error
    /// context attached.
    pub(crate) fn new(
        kind: RecordKind,
        info: &RequestInfo,
        level: Severity,
        status: StatusCode,
        elapsed_ms: f64,
    ) -> Self {
        Self {
            kind,
            level,
            method: info.method.to_string(),
            path: info.path.clone(),
            status: status.as_u16(),
            elapsed_ms,
            correlation_id: info.correlation_id.clone(),
            request_body: None,
            response_body: None,
            error: None,
            error_context: level.is_error().then(|| info.error_context()),
        }
    }

    pub(crate) fn with_bodies(mut self, request: LogValue, response: Option<LogValue>) -> Self {
        self.request_body = Some(request);
        self.response_body = response;
        self
    }

    pub(crate) fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// The rendered message line.
    pub fn message(&self) -> String {
        match self.kind {
            RecordKind::Request => format!(
                "HTTP {} {} responded {} in {:.4} ms",
                self.method, self.path, self.status, self.elapsed_ms
            ),
            RecordKind::Action => format!(
                "HTTP {} {} {} responded {} {} in {:.4} ms",
                self.method,
                self.path,
                render(self.request_body.as_ref()),
                render(self.response_body.as_ref()),
                self.status,
                self.elapsed_ms
            ),
        }
    }
}

fn render(value: Option<&LogValue>) -> String {
    value.map_or_else(|| "null".to_owned(), LogValue::to_string)
}

/// Destination for request records.
pub trait RecordSink: Send + Sync + 'static {
    fn emit(&self, record: &LogRecord);
}

impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn emit(&self, record: &LogRecord) {
        (**self).emit(record)
    }
}

/// Emits records as `tracing` events under [`LOG_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RecordSink for TracingSink {
    fn emit(&self, r: &LogRecord) {
        let message = r.message();
        let correlation_id = r.correlation_id.as_deref();
        let request_body = r.request_body.as_ref().map(tracing::field::display);
        let response_body = r.response_body.as_ref().map(tracing::field::display);

        match r.level {
            Severity::Information => tracing::info!(
                target: LOG_TARGET,
                method = %r.method,
                path = %r.path,
                status = r.status,
                elapsed_ms = r.elapsed_ms,
                correlation_id,
                request_body,
                response_body,
                "{message}"
            ),
            Severity::Error => {
                let ctx = r.error_context.as_ref();
                let request_headers = ctx.and_then(|c| serde_json::to_string(&c.request_headers).ok());
                let request_form = ctx
                    .and_then(|c| c.request_form.as_ref())
                    .and_then(|f| serde_json::to_string(f).ok());
                tracing::error!(
                    target: LOG_TARGET,
                    method = %r.method,
                    path = %r.path,
                    status = r.status,
                    elapsed_ms = r.elapsed_ms,
                    correlation_id,
                    request_body,
                    response_body,
                    error = r.error.as_deref(),
                    request_headers = request_headers.as_deref(),
                    request_host = ctx.and_then(|c| c.request_host.as_deref()),
                    request_protocol = ctx.map(|c| c.request_protocol.as_str()),
                    request_form = request_form.as_deref(),
                    "{message}"
                )
            }
        }
    }
}

/// Keeps every record in memory.
///
/// Clones share the same buffer, so keep one handle and pass another to the
/// logger.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records emitted so far, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}
