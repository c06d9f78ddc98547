//! Options controlling handler acquisition and individual forwards.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::{request, response, HeaderMap};

/// Rewrites outbound request headers before they are sent to the origin.
///
/// Receives the request parts for context (method, URI); the header map to
/// send travels in the second argument and the returned map replaces it.
pub type RequestHeaderRewrite = Arc<dyn Fn(&request::Parts, HeaderMap) -> HeaderMap + Send + Sync>;

/// Rewrites origin response headers before the response is returned.
pub type ResponseHeaderRewrite = Arc<dyn Fn(HeaderMap) -> HeaderMap + Send + Sync>;

/// Observes the raw origin response before any headers are altered and
/// before the body is piped back.
pub type ResponseObserver = Arc<dyn Fn(&response::Parts) + Send + Sync>;

/// Transport-level options applied when a handler is constructed.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Time allowed for the TCP connect to the origin.
    pub connect_timeout: Duration,

    /// Time allowed from sending the request until response headers arrive.
    /// Body streaming is not bounded by this.
    pub request_timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration for acquiring a proxy handler.
///
/// The `base` URL identifies the origin and keys the registry map: two
/// acquisitions with the same base share one handler.
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    /// Origin base URL, e.g. `http://127.0.0.1:5665`.
    pub base: String,

    /// Transport options for the handler's client.
    pub request: RequestOptions,
}

impl ProxyOptions {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            request: RequestOptions::default(),
        }
    }

    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }
}

/// Per-forward options: header rewrite hooks, response observation, and
/// query-string override.
#[derive(Clone, Default)]
pub struct ForwardOptions {
    /// Transform outbound headers before forwarding.
    pub rewrite_request_headers: Option<RequestHeaderRewrite>,

    /// Transform response headers before returning them to the client.
    pub rewrite_headers: Option<ResponseHeaderRewrite>,

    /// Invoked with the raw origin response parts once headers arrive.
    pub on_response: Option<ResponseObserver>,

    /// Replaces the inbound request's query string when set. An empty
    /// string drops the query entirely.
    pub query_string: Option<String>,
}

impl fmt::Debug for ForwardOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardOptions")
            .field(
                "rewrite_request_headers",
                &self.rewrite_request_headers.is_some(),
            )
            .field("rewrite_headers", &self.rewrite_headers.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("query_string", &self.query_string)
            .finish()
    }
}
