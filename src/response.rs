//! Successful reply: status, handler headers and the rendered document.

use crate::error::JSON_CONTENT_TYPE;
use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Reply {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        // 204 carries no body and no content type.
        let mut response = if self.status == StatusCode::NO_CONTENT {
            self.status.into_response()
        } else {
            let mut response = (self.status, Json(self.body)).into_response();
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            response
        };
        // Handler headers win over the defaults.
        for (name, value) in self.headers.iter() {
            response.headers_mut().insert(name.clone(), value.clone());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_reply_has_content_type() {
        let response = Reply::new(StatusCode::CREATED, json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[test]
    fn handler_headers_override_defaults() {
        let mut reply = Reply::new(StatusCode::OK, json!({}));
        reply
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/vnd.api+json"));
        reply.headers.insert("x-total", HeaderValue::from_static("3"));
        let response = reply.into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/vnd.api+json");
        assert_eq!(response.headers()["x-total"], "3");
    }

    #[test]
    fn no_content_has_no_content_type() {
        let response = Reply::new(StatusCode::NO_CONTENT, json!({"ignored": true})).into_response();
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }
}
