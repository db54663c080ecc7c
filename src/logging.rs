//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Bodies longer than this many bytes are cut short in `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 256;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated and
/// the full body is logged at the `debug` level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body = match read_body(body).await {
        Ok(body) => body,
        Err(error) => {
            tracing::error!("Could not read request body: {error}");
            return (StatusCode::BAD_REQUEST, "could not read request body").into_response();
        }
    };

    let body_text = String::from_utf8_lossy(&body);
    tracing::info!(
        "Received request: {} {}\nbody: {}",
        parts.method,
        parts.uri,
        truncate(&body_text)
    );
    log_full_body("request", &body_text);

    let response = next.run(Request::from_parts(parts, Body::from(body))).await;

    let (parts, body) = response.into_parts();
    let body = match read_body(body).await {
        Ok(body) => body,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body_text = String::from_utf8_lossy(&body);
    tracing::info!(
        "Sending response: {}\nbody: {}",
        parts.status,
        truncate(&body_text)
    );
    log_full_body("response", &body_text);

    Response::from_parts(parts, Body::from(body))
}

async fn read_body(body: Body) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(body, usize::MAX).await
}

fn log_full_body(kind: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::debug!("Full {kind} body: {body:?}");
    }
}

/// Cut `body` to at most [LOG_BODY_LENGTH_LIMIT] bytes without splitting a character.
fn truncate(body: &str) -> String {
    if body.len() <= LOG_BODY_LENGTH_LIMIT {
        return format!("{body:?}");
    }

    let end = (0..=LOG_BODY_LENGTH_LIMIT)
        .rev()
        .find(|&index| body.is_char_boundary(index))
        .unwrap_or(0);

    format!("{:?}...", &body[..end])
}

#[cfg(test)]
mod logging_tests {
    use axum::{Router, http::StatusCode, middleware, routing::post};

    use super::{LOG_BODY_LENGTH_LIMIT, logging_middleware, truncate};

    #[test]
    fn short_body_is_kept() {
        assert_eq!(truncate("{\"a\":1}"), "\"{\\\"a\\\":1}\"");
    }

    #[test]
    fn long_body_is_cut_at_limit() {
        let body = "x".repeat(LOG_BODY_LENGTH_LIMIT + 10);

        let got = truncate(&body);

        assert_eq!(got, format!("\"{}\"...", "x".repeat(LOG_BODY_LENGTH_LIMIT)));
    }

    #[test]
    fn long_body_is_not_cut_inside_character() {
        let body = format!("x{}", "é".repeat(LOG_BODY_LENGTH_LIMIT));

        let got = truncate(&body);

        assert!(got.ends_with("\"..."));
        assert!(got.len() <= LOG_BODY_LENGTH_LIMIT + 5);
    }

    #[tokio::test]
    async fn middleware_passes_body_through() {
        let app = Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(middleware::from_fn(logging_middleware));
        let server = axum_test::TestServer::new(app);

        let response = server.post("/echo").text("hello fleet").await;

        response.assert_status(StatusCode::OK);
        response.assert_text("hello fleet");
    }
}
