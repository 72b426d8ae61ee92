//! Per-stream transaction context.
//!
//! The proxy never sends a whole HTTP transaction at once: request headers,
//! response headers, bodies and trailers arrive as separate messages on the
//! same stream. [`TransactionContext`] folds them into one view so that a
//! processor running on the response can still see what the request looked
//! like.

use std::collections::HashMap;
use std::sync::OnceLock;

use axum::http::uri::PathAndQuery;
use bytes::Bytes;

use crate::headers::{cookie, Cookie, Headers};
use crate::proto::processing_request::Request;

/// Path and query of the request, derived from `:path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl {
    raw: String,
    path: String,
    query: String,
}

impl RequestUrl {
    /// Parse a request target.
    ///
    /// Never fails: a target that is not a valid path-and-query is split on
    /// its first `?`, and a target without `?` has an empty query.
    pub fn parse(raw: &str) -> Self {
        let (path, query) = match raw.parse::<PathAndQuery>() {
            Ok(pq) => (pq.path().to_string(), pq.query().unwrap_or_default().to_string()),
            Err(_) => {
                let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
                (path.to_string(), query.to_string())
            }
        };
        Self {
            raw: raw.to_string(),
            path,
            query,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Decoded `application/x-www-form-urlencoded` query pairs, in order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .into_owned()
            .collect()
    }
}

/// Value stored in the per-stream metadata slot.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(Bytes),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            MetadataValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::String(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::String(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Int(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

impl From<Bytes> for MetadataValue {
    fn from(v: Bytes) -> Self {
        MetadataValue::Bytes(v)
    }
}

impl From<Vec<u8>> for MetadataValue {
    fn from(v: Vec<u8>) -> Self {
        MetadataValue::Bytes(Bytes::from(v))
    }
}

/// Facts processors hand to later processors and phases of the same stream.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    values: HashMap<String, MetadataValue>,
}

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.values.get(key)
    }

    /// Store a value, returning the previous one for `key`.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Option<MetadataValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Aggregate of everything seen so far on one stream.
///
/// Owned by the stream handler and lent to processors one at a time. Header
/// maps only grow; derived fields are first-write-wins.
///
/// Only the stream handler feeds messages in and only it can build a
/// context. Processors read everything and write through
/// [`metadata_mut`](Self::metadata_mut):
///
/// ```
/// use ext_proc::processing::{
///     MetadataValue, MutationBuilder, Processor, ProcessorResult, TransactionContext,
/// };
///
/// struct Tagger;
///
/// #[async_trait::async_trait]
/// impl Processor for Tagger {
///     async fn request_headers(
///         &self,
///         ctx: &mut TransactionContext,
///         _mutation: &mut MutationBuilder,
///     ) -> ProcessorResult {
///         let method = ctx.method().to_string();
///         ctx.metadata_mut().insert("method", MetadataValue::from(method));
///         Ok(None)
///     }
/// }
/// ```
///
/// Header maps and derived fields cannot be written from a processor:
///
/// ```compile_fail
/// use ext_proc::processing::{MutationBuilder, Processor, ProcessorResult, TransactionContext};
/// use ext_proc::proto::{processing_request::Request, HttpHeaders};
///
/// struct Forger;
///
/// #[async_trait::async_trait]
/// impl Processor for Forger {
///     async fn request_headers(
///         &self,
///         ctx: &mut TransactionContext,
///         _mutation: &mut MutationBuilder,
///     ) -> ProcessorResult {
///         ctx.record(&Request::RequestHeaders(HttpHeaders::default()));
///         Ok(None)
///     }
/// }
/// ```
///
/// Nor can a processor swap in a fresh context:
///
/// ```compile_fail
/// use ext_proc::processing::TransactionContext;
///
/// fn reset(ctx: &mut TransactionContext) {
///     *ctx = TransactionContext::new();
/// }
/// ```
#[derive(Debug)]
pub struct TransactionContext {
    scheme: Option<String>,
    authority: Option<String>,
    method: Option<String>,
    request_id: Option<String>,
    url: Option<RequestUrl>,
    status: u16,
    request_headers: Headers,
    response_headers: Headers,
    request_trailers: Headers,
    response_trailers: Headers,
    request_headers_seen: bool,
    response_headers_seen: bool,
    cookies: OnceLock<Vec<Cookie>>,
    set_cookies: OnceLock<Vec<Cookie>>,
    metadata: Metadata,
}

impl TransactionContext {
    pub(crate) fn new() -> Self {
        Self {
            scheme: None,
            authority: None,
            method: None,
            request_id: None,
            url: None,
            status: 0,
            request_headers: Headers::new(),
            response_headers: Headers::new(),
            request_trailers: Headers::new(),
            response_trailers: Headers::new(),
            request_headers_seen: false,
            response_headers_seen: false,
            cookies: OnceLock::new(),
            set_cookies: OnceLock::new(),
            metadata: Metadata::default(),
        }
    }

    /// Fold one phase message into the context.
    ///
    /// Must be called for every message received on the stream, whatever
    /// its phase.
    pub(crate) fn record(&mut self, request: &Request) {
        match request {
            Request::RequestHeaders(h) => {
                if let Some(map) = &h.headers {
                    self.request_headers.extend_from_wire(map);
                }
                self.request_headers_seen = true;
            }
            Request::ResponseHeaders(h) => {
                if let Some(map) = &h.headers {
                    self.response_headers.extend_from_wire(map);
                }
                self.response_headers_seen = true;
            }
            Request::RequestTrailers(t) => {
                if let Some(map) = &t.trailers {
                    self.request_trailers.extend_from_wire(map);
                }
            }
            Request::ResponseTrailers(t) => {
                if let Some(map) = &t.trailers {
                    self.response_trailers.extend_from_wire(map);
                }
            }
            Request::RequestBody(_) | Request::ResponseBody(_) => {}
        }
        self.derive_fields();
    }

    fn derive_fields(&mut self) {
        let request = &self.request_headers;
        let first = |key: &str| request.get(key).filter(|v| !v.is_empty()).map(str::to_string);

        if self.scheme.is_none() {
            self.scheme = first(":scheme");
        }
        if self.authority.is_none() {
            self.authority = first(":authority");
        }
        if self.method.is_none() {
            self.method = first(":method");
        }
        if self.request_id.is_none() {
            self.request_id = first("x-request-id");
        }
        if self.url.is_none() {
            self.url = request.get(":path").map(RequestUrl::parse);
        }
        if self.status == 0 {
            self.status = self
                .response_headers
                .get(":status")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0);
        }
    }

    /// Request scheme (`http` / `https`), empty until known.
    pub fn scheme(&self) -> &str {
        self.scheme.as_deref().unwrap_or_default()
    }

    pub fn authority(&self) -> &str {
        self.authority.as_deref().unwrap_or_default()
    }

    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or_default()
    }

    /// Value of the request's `x-request-id`, empty if absent.
    pub fn request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or_default()
    }

    pub fn url(&self) -> Option<&RequestUrl> {
        self.url.as_ref()
    }

    /// Response status, `0` until a valid `:status` was seen.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn request_headers(&self) -> &Headers {
        &self.request_headers
    }

    pub fn response_headers(&self) -> &Headers {
        &self.response_headers
    }

    pub fn request_trailers(&self) -> &Headers {
        &self.request_trailers
    }

    pub fn response_trailers(&self) -> &Headers {
        &self.response_trailers
    }

    /// First value of a request header, case-insensitive.
    pub fn request_header(&self, key: &str) -> Option<&str> {
        self.request_headers.get(key)
    }

    /// First value of a response header, case-insensitive.
    pub fn response_header(&self, key: &str) -> Option<&str> {
        self.response_headers.get(key)
    }

    /// Cookies sent by the client.
    ///
    /// Parsed once, on the first call after the request headers arrived.
    pub fn cookies(&self) -> &[Cookie] {
        if !self.request_headers_seen {
            return &[];
        }
        self.cookies
            .get_or_init(|| cookie::parse_cookies(self.request_headers.get_all("cookie")))
    }

    /// Cookies set by the upstream, one per `set-cookie` entry.
    ///
    /// Parsed once, on the first call after the response headers arrived.
    pub fn set_cookies(&self) -> &[Cookie] {
        if !self.response_headers_seen {
            return &[];
        }
        self.set_cookies
            .get_or_init(|| cookie::parse_set_cookies(self.response_headers.get_all("set-cookie")))
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
