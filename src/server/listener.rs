use std::convert::Infallible;
use std::sync::Arc;

use http::{HeaderValue, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::proxy::{full_body, ForwardOptions, ProxyBody, ProxyOptions, ProxyRegistry};

/// Bind `cfg.server.listen_addr` and serve until the task is cancelled.
pub async fn run(cfg: &Config, registry: Arc<ProxyRegistry>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!("Listening on {}", cfg.server.listen_addr);

    serve(listener, cfg.proxy.default_options(), registry).await
}

/// Accept loop: every request on `listener` is forwarded to the origin in
/// `options` through the shared registry.
pub async fn serve(
    listener: TcpListener,
    options: ProxyOptions,
    registry: Arc<ProxyRegistry>,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let registry = Arc::clone(&registry);
        let options = options.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(socket);
            let service = service_fn(move |req| {
                let registry = Arc::clone(&registry);
                let options = options.clone();
                async move { Ok::<_, Infallible>(handle(req, &registry, options).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}

/// Forward one request, mapping failures to gateway error responses.
async fn handle(
    req: Request<Incoming>,
    registry: &ProxyRegistry,
    options: ProxyOptions,
) -> Response<ProxyBody> {
    let origin = options.base.clone();

    let handler = match registry.acquire(options).await {
        Ok(handler) => handler,
        Err(e) => {
            tracing::error!(origin = %origin, error = %e, "Failed to acquire proxy handler");
            return error_response(StatusCode::BAD_GATEWAY, "Failed to reach the origin server.");
        }
    };

    match handler
        .forward(req.map(|body| body.boxed()), &ForwardOptions::default())
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(origin = %origin, error = %e, "Failed to forward request");

            if is_timeout_error(&e) {
                error_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    "The origin server did not respond in time.",
                )
            } else {
                error_response(StatusCode::BAD_GATEWAY, "Failed to reach the origin server.")
            }
        }
    }
}

/// Whether a forward failure is a timeout of any kind: the request
/// deadline, or a connect timeout buried in the cause chain as an io
/// error with kind `TimedOut`.
fn is_timeout_error(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return io.kind() == std::io::ErrorKind::TimedOut;
        }
        let msg = cause.to_string();
        msg.contains("timed out") || msg.contains("timeout")
    })
}

fn error_response(status: StatusCode, message: &str) -> Response<ProxyBody> {
    let mut response = Response::new(full_body(message.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain"),
    );
    response
}
