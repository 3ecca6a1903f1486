//! Request snapshots taken before a request is handed downstream.
//!
//! Once `next` runs, the request is gone, so the loggers keep a
//! [`RequestInfo`] with everything a record may need afterwards. The
//! error-only fields are rendered lazily through [`RequestInfo::error_context`].

use std::{collections::BTreeMap, convert::Infallible};

use axum::{
    body::Body,
    extract::{rejection::BytesRejection, FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, Method, Version},
};
use bytes::Bytes;
use serde::Serialize;

use crate::correlation::CorrelationId;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Raw body of a url-encoded form request, kept in request extensions once
/// the request log middleware has buffered it.
#[derive(Debug, Clone)]
pub struct BufferedForm(pub Bytes);

/// What a request looked like when it entered a logger.
///
/// Also usable as an axum extractor in handlers that run an
/// [`ActionLogger`](crate::ActionLogger).
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub version: Version,
    pub host: Option<String>,
    pub headers: HeaderMap,
    pub correlation_id: Option<String>,
    pub form: Option<Bytes>,
}

impl RequestInfo {
    pub fn from_parts(parts: &Parts) -> Self {
        Self::capture(
            &parts.method,
            &parts.uri,
            parts.version,
            &parts.headers,
            &parts.extensions,
        )
    }

    pub fn from_request(req: &Request) -> Self {
        Self::capture(
            req.method(),
            req.uri(),
            req.version(),
            req.headers(),
            req.extensions(),
        )
    }

    fn capture(
        method: &Method,
        uri: &axum::http::Uri,
        version: Version,
        headers: &HeaderMap,
        extensions: &axum::http::Extensions,
    ) -> Self {
        let host = uri.authority().map(|a| a.to_string()).or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        });

        Self {
            method: method.clone(),
            path: uri.path().to_owned(),
            version,
            host,
            headers: headers.clone(),
            correlation_id: extensions.get::<CorrelationId>().map(|c| c.0.clone()),
            form: extensions.get::<BufferedForm>().map(|f| f.0.clone()),
        }
    }

    /// Protocol string in `HTTP/1.1` form.
    pub fn protocol(&self) -> String {
        format!("{:?}", self.version)
    }

    /// Render the fields attached to error records.
    pub fn error_context(&self) -> ErrorContext {
        ErrorContext {
            request_headers: header_map(&self.headers),
            request_host: self.host.clone(),
            request_protocol: self.protocol(),
            request_form: self.form.as_deref().and_then(decode_form),
        }
    }
}

impl<S> FromRequestParts<S> for RequestInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Request details attached to error records only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    pub request_headers: BTreeMap<String, String>,
    pub request_host: Option<String>,
    pub request_protocol: String,
    /// Present only for url-encoded form bodies.
    pub request_form: Option<BTreeMap<String, String>>,
}

/// Flatten headers to one string per name; repeated values are comma-joined.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            (name.as_str().to_owned(), joined)
        })
        .collect()
}

fn decode_form(body: &[u8]) -> Option<BTreeMap<String, String>> {
    let pairs: Vec<(String, String)> = match serde_urlencoded::from_bytes(body) {
        Ok(pairs) => pairs,
        Err(e) => {
            tracing::debug!(error = %e, "form body could not be decoded");
            return None;
        }
    };

    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in pairs {
        fields
            .entry(key)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    Some(fields)
}

pub(crate) fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// Buffer a url-encoded body so it can still be read downstream and
/// reported on error. Other requests pass through untouched.
///
/// The body is read through the `Bytes` extractor, so the request's
/// `DefaultBodyLimit` (2 MB unless a `DefaultBodyLimit` layer runs outside
/// the logger) caps how much is held in memory. A body that cannot be read
/// comes back as the extractor's rejection together with the request parts.
pub(crate) async fn buffer_form(req: Request) -> Result<Request, (Parts, BytesRejection)> {
    if !is_form(req.headers()) || req.extensions().get::<BufferedForm>().is_some() {
        return Ok(req);
    }

    let (mut parts, body) = req.into_parts();
    let mut limited = Request::new(body);
    *limited.extensions_mut() = parts.extensions.clone();

    match Bytes::from_request(limited, &()).await {
        Ok(bytes) => {
            parts.extensions.insert(BufferedForm(bytes.clone()));
            Ok(Request::from_parts(parts, Body::from(bytes)))
        }
        Err(rejection) => Err((parts, rejection)),
    }
}
