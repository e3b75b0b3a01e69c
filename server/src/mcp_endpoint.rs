//! The `/mcp` route: one buffered HTTP call per engine invocation.
//!
//! # Design
//! The handler reads the whole body, describes the call as a `RequestScope`,
//! hands a fresh `Exchange` to the shared engine, and converts whatever the
//! engine sent into one `Response`. Failures are contained here so the
//! listener keeps serving.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use mcp_bridge_core::{Exchange, HttpResponse, RequestScope};

use crate::error::HandlerError;
use crate::{cors, AppState};

/// `OPTIONS /mcp`. Never reaches the engine.
pub async fn preflight() -> Response {
    let mut response = StatusCode::OK.into_response();
    cors::preflight(response.headers_mut());
    response
}

/// `GET` and `POST /mcp`.
pub async fn handle(State(state): State<AppState>, request: Request) -> Response {
    match dispatch(&state, request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = ?err, "error in MCP endpoint");
            err.into_response()
        }
    }
}

async fn dispatch(state: &AppState, request: Request) -> Result<Response, HandlerError> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(HandlerError::Body)?;

    let scope = scope_from_parts(&parts);
    let mut exchange = Exchange::new(body);
    state.engine.call(&scope, &mut exchange).await?;

    let mut response = into_http_response(exchange.into_response())?;
    cors::allow_origin(response.headers_mut());
    Ok(response)
}

/// Describe the call the way the engine expects: raw query, lower-cased names.
pub fn scope_from_parts(parts: &Parts) -> RequestScope {
    let query = parts.uri.query().unwrap_or("");
    RequestScope::new(
        parts.method.as_str(),
        parts.uri.path(),
        query.as_bytes(),
        parts
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().as_bytes(), value.as_bytes())),
    )
}

/// Later headers with the same name replace earlier ones.
fn into_http_response(collected: HttpResponse) -> Result<Response, HandlerError> {
    let status = StatusCode::from_u16(collected.status)
        .map_err(|_| HandlerError::InvalidStatus(collected.status))?;

    let mut response = Response::new(Body::from(collected.body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    for (name, value) in collected.headers {
        let name = HeaderName::from_bytes(&name)
            .map_err(|e| HandlerError::InvalidHeader(format!("{}: {e}", String::from_utf8_lossy(&name))))?;
        let value = HeaderValue::from_bytes(&value)
            .map_err(|e| HandlerError::InvalidHeader(format!("{name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    #[test]
    fn scope_keeps_raw_query_and_lowercases_headers() {
        let (parts, _) = HttpRequest::builder()
            .method("POST")
            .uri("/mcp?session=1&x=%20")
            .header("X-Custom", "Value")
            .body(())
            .unwrap()
            .into_parts();
        let scope = scope_from_parts(&parts);
        assert_eq!(scope.method(), "POST");
        assert_eq!(scope.path(), "/mcp");
        assert_eq!(scope.query_string(), b"session=1&x=%20");
        assert_eq!(scope.headers(), &[(b"x-custom".to_vec(), b"Value".to_vec())]);
    }

    #[test]
    fn duplicate_engine_headers_keep_last_value() {
        let response = into_http_response(HttpResponse {
            status: 200,
            headers: vec![
                (b"x-a".to_vec(), b"1".to_vec()),
                (b"x-a".to_vec(), b"2".to_vec()),
            ],
            body: Vec::new(),
        })
        .unwrap();
        assert_eq!(response.headers()["x-a"], "2");
    }

    #[test]
    fn invalid_status_is_an_error() {
        let err = into_http_response(HttpResponse {
            status: 42,
            headers: Vec::new(),
            body: Vec::new(),
        })
        .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidStatus(42)));
    }

    #[test]
    fn invalid_header_name_is_an_error() {
        let err = into_http_response(HttpResponse {
            status: 200,
            headers: vec![(b"bad header".to_vec(), b"v".to_vec())],
            body: Vec::new(),
        })
        .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidHeader(_)));
    }
}
