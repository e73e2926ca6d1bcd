//! HTTP front end.
//!
//! Two kinds of request are served:
//!
//! - `GET /status` returns the service report as JSON
//! - `GET /<operation>/<WxH>/<source-url>` returns the thumbnail
//!
//! The thumbnail path is taken verbatim from the request target, query
//! string included, so it reaches the orchestrator exactly as the client
//! sent it.

mod response;

pub use response::{error_response, http_date, parse_http_date, plain, record_response};

use crate::backend::Backend;
use crate::loader::SourceLoader;
use crate::service::ThumbService;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Response, StatusCode, Uri};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Builds the router for `service`.
pub fn router<L: SourceLoader, B: Backend>(service: Arc<ThumbService<L, B>>) -> Router {
    Router::new()
        .route("/status", get(status_handler::<L, B>))
        .fallback(thumbnail_handler::<L, B>)
        .with_state(service)
}

/// Serves `service` on an already bound listener until `shutdown` fires.
pub async fn serve<L: SourceLoader, B: Backend>(
    listener: TcpListener,
    service: Arc<ThumbService<L, B>>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let local: Option<SocketAddr> = listener.local_addr().ok();
    info!(addr = ?local, "HTTP server listening");

    let app = router(Arc::clone(&service));
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .await?;

    info!("HTTP server stopped, draining workers");
    service.shutdown().await;
    Ok(())
}

/// Binds `addr` and serves until `shutdown` fires.
pub async fn bind_and_serve<L: SourceLoader, B: Backend>(
    addr: SocketAddr,
    service: Arc<ThumbService<L, B>>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, service, shutdown).await
}

async fn status_handler<L: SourceLoader, B: Backend>(
    State(service): State<Arc<ThumbService<L, B>>>,
) -> Response<Body> {
    match serde_json::to_string_pretty(&service.report()) {
        Ok(json) => Response::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json))
            .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")),
        Err(e) => {
            error!(error = %e, "Failed to serialize status report");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

async fn thumbnail_handler<L: SourceLoader, B: Backend>(
    State(service): State<Arc<ThumbService<L, B>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response<Body> {
    if method != Method::GET && method != Method::HEAD {
        return plain(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }

    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let path = target.strip_prefix('/').unwrap_or(target);

    match service.thumbnail(path).await {
        Ok(record) => {
            debug!(path, kind = record.kind.as_str(), "Serving record");
            record_response(record, &headers, service.policy())
        }
        Err(e) => {
            debug!(path, error = %e, "Request failed");
            error_response(&e)
        }
    }
}
