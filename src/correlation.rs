//! Correlation-id propagation middleware.
//!
//! Every inbound request is tied to a correlation id. The id is:
//!
//! - Accepted from the caller if they already send the configured header
//! - Otherwise produced by the configured [`IdGenerator`] and written back into
//!   the request headers, so downstream handlers see it as if the caller sent it
//! - Stored as a [`CorrelationId`] request extension
//! - Recorded on a `correlation` [`tracing`] span wrapping the downstream call,
//!   so every log line for the request carries `correlation_id`
//! - Optionally set on the response under the same header name
//!
//! With no generator configured and no incoming header, the request passes
//! through untouched.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument as _;
use uuid::Uuid;

use crate::Error;

/// Header used when none is configured.
pub const DEFAULT_HEADER: &str = "X-Correlation-ID";

/// Strategy producing a fresh correlation id.
///
/// An empty or whitespace-only result is treated as "no id".
#[derive(Clone)]
pub struct IdGenerator(Arc<dyn Fn() -> String + Send + Sync>);

impl IdGenerator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Hyphenated UUID v4, e.g. `6811bcb3-dead-43bb-a738-2c5faf98ce1d`.
    pub fn uuid() -> Self {
        Self::new(|| Uuid::new_v4().to_string())
    }

    /// UUID v4 without dashes, e.g. `6811bcb3dead43bba7382c5faf98ce1d`.
    pub fn simple_uuid() -> Self {
        Self::new(|| Uuid::new_v4().simple().to_string())
    }

    pub fn generate(&self) -> String {
        (self.0)()
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdGenerator(..)")
    }
}

/// User-facing configuration for the propagator.
#[derive(Debug, Clone)]
pub struct CorrelationIdConfig {
    /// Header carrying the id, matched case-insensitively.
    pub header: String,
    /// Whether the id is set on the response.
    pub include_in_response: bool,
    /// Produces an id when the request has none. `None` disables generation.
    pub generator: Option<IdGenerator>,
}

impl Default for CorrelationIdConfig {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_owned(),
            include_in_response: true,
            generator: Some(IdGenerator::uuid()),
        }
    }
}

impl CorrelationIdConfig {
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn include_in_response(mut self, enabled: bool) -> Self {
        self.include_in_response = enabled;
        self
    }

    pub fn generator(mut self, generator: IdGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Only propagate ids sent by the caller; never invent one.
    pub fn without_generator(mut self) -> Self {
        self.generator = None;
        self
    }

    /// Validate the configuration into middleware state.
    pub fn build(self) -> Result<CorrelationIdSettings, Error> {
        let header = HeaderName::try_from(self.header.as_str())
            .map_err(|_| Error::InvalidHeaderName(self.header.clone()))?;
        Ok(CorrelationIdSettings {
            header,
            include_in_response: self.include_in_response,
            generator: self.generator,
        })
    }
}

/// Validated middleware state produced by [`CorrelationIdConfig::build`].
#[derive(Debug, Clone)]
pub struct CorrelationIdSettings {
    header: HeaderName,
    include_in_response: bool,
    generator: Option<IdGenerator>,
}

impl CorrelationIdSettings {
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// The caller's id. Repeated headers are comma-joined; empty and
    /// non-UTF-8 values are skipped.
    fn incoming(&self, req: &Request) -> Option<(String, HeaderValue)> {
        let mut values = req
            .headers()
            .get_all(&self.header)
            .iter()
            .filter(|v| v.to_str().is_ok_and(|s| !s.is_empty()));

        let first = values.next()?;
        let Some(second) = values.next() else {
            let id = first.to_str().ok()?.to_owned();
            return Some((id, first.clone()));
        };

        let joined = [first, second]
            .into_iter()
            .chain(values)
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        let value = HeaderValue::from_str(&joined).ok()?;
        Some((joined, value))
    }

    /// Pick the id for `req`, writing a generated one into its headers.
    fn resolve(&self, req: &mut Request) -> Option<(String, HeaderValue)> {
        if let Some(found) = self.incoming(req) {
            return Some(found);
        }

        let id = self.generator.as_ref()?.generate();
        if id.trim().is_empty() {
            return None;
        }

        let value = match HeaderValue::from_str(&id) {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(id = %id, "generated correlation id is not a valid header value");
                return None;
            }
        };
        req.headers_mut().insert(self.header.clone(), value.clone());
        Some((id, value))
    }
}

/// Newtype carrying the request's correlation id.
///
/// Exposed as a request extension so any handler can read it:
/// ```rust,ignore
/// async fn handler(Extension(id): Extension<CorrelationId>) { ... }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Axum middleware that propagates a [`CorrelationId`].
///
/// Layer order matters: apply this **outside** the request loggers so their
/// records are emitted inside the `correlation` span and see the extension.
pub async fn correlation_id_middleware(
    State(settings): State<CorrelationIdSettings>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some((id, value)) = settings.resolve(&mut req) else {
        return next.run(req).await;
    };

    req.extensions_mut().insert(CorrelationId(id.clone()));

    let span = tracing::info_span!("correlation", correlation_id = %id);
    let mut response = next.run(req).instrument(span).await;

    // Set, not append: the propagated id replaces any value written downstream.
    if settings.include_in_response {
        response.headers_mut().insert(settings.header.clone(), value);
    }

    response
}
