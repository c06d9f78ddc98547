//! Per-origin request forwarding.
//!
//! A [`ProxyHandler`] is bound to one origin base URL and forwards inbound
//! HTTP requests to it, streaming bodies in both directions. The protocol
//! work is delegated to hyper's client; this module only rewrites the
//! target URI and headers around it.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use http::{HeaderValue, Request, Response, Uri};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::time::timeout;
use url::Url;

use crate::proxy::options::{ForwardOptions, ProxyOptions};

/// Body type used on both sides of a forward.
///
/// Origin response bodies box into this without buffering, and synthesized
/// bodies (errors, tests) build from [`full_body`] / [`empty_body`].
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// Builds a `ProxyBody` holding the given bytes.
pub fn full_body(data: impl Into<Bytes>) -> ProxyBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// Builds an empty `ProxyBody`.
pub fn empty_body() -> ProxyBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

/// Headers that describe the client connection rather than the request and
/// must not travel to the origin.
const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Headers describing the origin connection; stripped from responses so the
/// client side can apply its own framing.
const RESPONSE_CONNECTION_HEADERS: [&str; 3] = ["connection", "keep-alive", "transfer-encoding"];

/// Forwards requests to a single origin.
#[derive(Debug)]
pub struct ProxyHandler {
    /// Raw base URL this handler was acquired with.
    base: String,

    /// Origin authority, e.g. `127.0.0.1:5665`.
    authority: String,

    /// Precomputed Host header value for outbound requests.
    host_value: HeaderValue,

    /// Path prefix of the base URL, without a trailing slash.
    origin_path: String,

    /// Taken and dropped on close so pooled origin connections release.
    client: Mutex<Option<Client<HttpConnector, ProxyBody>>>,
    request_timeout: Duration,
}

impl ProxyHandler {
    /// Create a handler bound to the origin in `options.base`.
    ///
    /// Fails on an unparseable base URL, a missing host, or a non-http
    /// scheme; those errors propagate unmodified to the acquiring caller.
    pub fn new(options: &ProxyOptions) -> anyhow::Result<Self> {
        let origin = Url::parse(&options.base)
            .with_context(|| format!("invalid proxy base URL {}", options.base))?;

        if origin.scheme() != "http" {
            anyhow::bail!(
                "unsupported proxy base scheme {} (only http origins are supported)",
                origin.scheme()
            );
        }

        let host = origin
            .host_str()
            .with_context(|| format!("proxy base URL {} has no host", options.base))?;

        let authority = match origin.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let host_value = HeaderValue::from_str(&authority)
            .with_context(|| format!("proxy base URL {} yields an invalid Host header", options.base))?;

        let origin_path = origin.path().trim_end_matches('/').to_string();

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(options.request.connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            base: options.base.clone(),
            authority,
            host_value,
            origin_path,
            client: Mutex::new(Some(client)),
            request_timeout: options.request.request_timeout,
        })
    }

    /// Forward a request to this handler's origin and return the origin's
    /// response with its body streamed through.
    ///
    /// Header handling, in order: hop-by-hop headers are stripped and Host
    /// is set to the origin authority; the request-header rewrite hook runs
    /// last and sees the result. On the way back, the `on_response` hook
    /// observes the raw origin response first, then connection headers are
    /// stripped and the response-header rewrite hook runs.
    pub async fn forward(
        &self,
        req: Request<ProxyBody>,
        opts: &ForwardOptions,
    ) -> anyhow::Result<Response<ProxyBody>> {
        let client = match self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some(client) => client,
            None => anyhow::bail!("proxy handler for {} is closed", self.base),
        };

        let (mut parts, body) = req.into_parts();
        let target = self.target_uri(&parts.uri, opts.query_string.as_deref())?;

        for name in HOP_BY_HOP_HEADERS {
            parts.headers.remove(name);
        }
        parts.headers.insert(http::header::HOST, self.host_value.clone());

        if let Some(rewrite) = &opts.rewrite_request_headers {
            let headers = std::mem::take(&mut parts.headers);
            parts.headers = rewrite(&parts, headers);
        }

        tracing::debug!(
            origin = %self.base,
            method = %parts.method,
            path = %parts.uri.path(),
            "Forwarding request to origin"
        );

        parts.uri = target;
        let outbound = Request::from_parts(parts, body);

        let response = timeout(self.request_timeout, client.request(outbound))
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "request to {} timed out after {:?}",
                    self.base,
                    self.request_timeout
                )
            })?
            .with_context(|| format!("failed to forward request to {}", self.base))?;

        let (mut parts, body) = response.into_parts();

        if let Some(observe) = &opts.on_response {
            observe(&parts);
        }

        for name in RESPONSE_CONNECTION_HEADERS {
            parts.headers.remove(name);
        }

        if let Some(rewrite) = &opts.rewrite_headers {
            let headers = std::mem::take(&mut parts.headers);
            parts.headers = rewrite(headers);
        }

        Ok(Response::from_parts(parts, body.boxed()))
    }

    /// Close the handler. The first call drops the underlying client,
    /// releasing its pooled origin connections, and succeeds; any further
    /// call is an error. In-flight forwards hold a clone of the client and
    /// run to completion; new forwards are refused.
    pub fn close(&self) -> anyhow::Result<()> {
        let client = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if client.is_none() {
            anyhow::bail!("proxy handler for {} is already closed", self.base);
        }

        tracing::debug!(origin = %self.base, "Proxy handler closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// The base URL this handler was acquired with.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Build the target URI for an inbound request: origin authority and
    /// path prefix, the inbound path, and either the override query or the
    /// inbound query.
    fn target_uri(&self, inbound: &Uri, query_override: Option<&str>) -> anyhow::Result<Uri> {
        let query = match query_override {
            Some(q) if q.is_empty() => None,
            Some(q) => Some(q),
            None => inbound.query(),
        };

        // Scheme is validated to be http at construction.
        let mut target = format!("http://{}{}{}", self.authority, self.origin_path, inbound.path());
        if let Some(q) = query {
            target.push('?');
            target.push_str(q);
        }

        target
            .parse()
            .with_context(|| format!("invalid target URI {}", target))
    }
}
