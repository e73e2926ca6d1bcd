//! Record to HTTP response mapping.

use crate::codec::{RecordKind, ThumbRecord};
use crate::orchestrator::OrchestratorError;
use crate::service::ResponsePolicy;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{error, warn};

/// IMF-fixdate, the only date format HTTP/1.1 servers send.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Formats a timestamp as an HTTP date.
pub fn http_date(time: &DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// Parses an IMF-fixdate header value.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// True when the client's copy is at least as new as the record.
///
/// HTTP dates have second resolution, so the record time is truncated
/// before comparing.
fn not_modified(record: &ThumbRecord, headers: &HeaderMap) -> bool {
    let Some(since) = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date)
    else {
        return false;
    };
    record.created.timestamp() <= since.timestamp()
}

/// Builds the response for a record returned by the orchestrator.
pub fn record_response(
    record: ThumbRecord,
    headers: &HeaderMap,
    policy: ResponsePolicy,
) -> Response<Body> {
    let mut builder = Response::builder().header(header::LAST_MODIFIED, http_date(&record.created));

    let status = match record.kind {
        RecordKind::Rendered => {
            if policy.response_max_age > 0 {
                builder = builder.header(
                    header::CACHE_CONTROL,
                    format!("public, max-age={}", policy.response_max_age),
                );
            }
            if not_modified(&record, headers) {
                return finish(builder.status(StatusCode::NOT_MODIFIED), Body::empty());
            }
            StatusCode::OK
        }
        RecordKind::Pending => {
            builder = builder.header(
                header::CACHE_CONTROL,
                format!("no-cache, max-age={}", policy.pending_max_age),
            );
            StatusCode::OK
        }
        RecordKind::Failed => StatusCode::NOT_FOUND,
    };

    match HeaderValue::from_str(&record.mime) {
        Ok(mime) => builder = builder.header(header::CONTENT_TYPE, mime),
        Err(_) => warn!(mime = %record.mime, "Record has an unusable MIME type"),
    }

    finish(builder.status(status), Body::from(record.data))
}

/// Maps an orchestrator error onto a status code and plain-text body.
pub fn error_response(err: &OrchestratorError) -> Response<Body> {
    let status = match err {
        OrchestratorError::Request(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        OrchestratorError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    plain(status, err.to_string())
}

/// A `text/plain` response.
pub fn plain(status: StatusCode, message: impl Into<String>) -> Response<Body> {
    finish(
        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8"),
        Body::from(message.into()),
    )
}

fn finish(builder: axum::http::response::Builder, body: Body) -> Response<Body> {
    builder.body(body).unwrap_or_else(|e| {
        error!(error = %e, "Failed to build response");
        let mut fallback = Response::new(Body::empty());
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
