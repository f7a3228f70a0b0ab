//! Request timing middleware.
//!
//! Whole-game analysis waits on one engine search and possibly one language
//! model call per position, so the slow-request threshold is in seconds.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::{Duration, Instant};

/// Requests taking longer than this are logged as warnings.
pub const SLOW_REQUEST: Duration = Duration::from_secs(5);

/// Middleware that logs request timing.
///
/// Server errors are logged at `error`, slow requests at `warn`, and
/// everything else at `debug`.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use analysis_server::middleware::timing_layer;
///
/// let app = Router::new()
///     .route("/api/example", get(handler))
///     .layer(middleware::from_fn(timing_layer));
/// ```
pub async fn timing_layer(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %uri,
            status = status.as_u16(),
            duration_ms = duration.as_millis(),
            "Request failed"
        );
    } else if duration > SLOW_REQUEST {
        tracing::warn!(
            method = %method,
            path = %uri,
            status = status.as_u16(),
            duration_ms = duration.as_millis(),
            "Slow request"
        );
    } else {
        tracing::debug!(
            method = %method,
            path = %uri,
            status = status.as_u16(),
            duration_ms = duration.as_millis(),
            "Request completed"
        );
    }

    response
}
