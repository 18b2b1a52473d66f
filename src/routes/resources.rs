//! Resource routes: every path not matched elsewhere goes through the path router.
//! Mounted as a fallback because resource paths are resolved at request time.

use crate::app::Application;
use crate::error::{AppError, ErrorKind};
use crate::params::Params;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

/// Media ranges that admit a JSON reply.
const JSON_RANGES: [&str; 3] = ["application/json", "application/*", "*/*"];

pub fn resource_routes(app: Application, body_limit: usize) -> Router {
    Router::new()
        .fallback(serve)
        .layer(
            ServiceBuilder::new()
                // axum's own 2 MiB extractor cap would otherwise shadow larger limits.
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
        .with_state(AppState::new(app))
}

async fn serve(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match request_params(&uri, &headers, &body) {
        Ok(params) => state.app.call(&method, uri.path(), params).await,
        Err(e) => {
            let response = e.into_response();
            tracing::info!(method = %method, path = uri.path(), status = response.status().as_u16(), "request");
            response
        }
    }
}

fn request_params(uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Result<Params, AppError> {
    if !accepts_json(headers) {
        return Err(AppError::new(ErrorKind::NotAcceptable));
    }
    let mut params = Params::from_query(uri.query())?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    params.merge_body(content_type, body)?;
    Ok(params)
}

/// A missing or empty `Accept` header admits anything.
fn accepts_json(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return true;
    };
    if accept.trim().is_empty() {
        return true;
    }
    accept
        .split(',')
        .filter_map(|range| range.split(';').next())
        .map(|range| range.trim().to_ascii_lowercase())
        .any(|range| JSON_RANGES.contains(&range.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn accept_negotiation() {
        assert!(accepts_json(&HeaderMap::new()));
        assert!(accepts_json(&with_accept("application/json")));
        assert!(accepts_json(&with_accept("text/html, */*;q=0.8")));
        assert!(accepts_json(&with_accept("Application/*")));
        assert!(!accepts_json(&with_accept("text/html")));
        assert!(!accepts_json(&with_accept("image/png, text/plain;q=0.5")));
    }

    #[test]
    fn body_overrides_query() {
        let uri: Uri = "/users/1?name=ivan&page=2".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let params = request_params(&uri, &headers, b"name=kolo").unwrap();
        assert_eq!(params.get_str("name").as_deref(), Some("kolo"));
        assert_eq!(params.get_str("page").as_deref(), Some("2"));
    }
}
