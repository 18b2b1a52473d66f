//! HTTP-level tests: the axum router driven with `oneshot`.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use resourceful::{
    common_routes, resolve, resource_routes, Action, AppError, Application, DeclareActions,
    MemoryStore, ModelConfig, Registry, StoreConfig, StoreError,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";

fn router(body_limit: usize) -> Router {
    let config = StoreConfig::new().model(
        ModelConfig::new("users")
            .column("id", "bigint")
            .column("name", "text")
            .column("email", "text")
            .validates_presence_of("name"),
    );
    let store = MemoryStore::new(resolve(&config).unwrap());
    let registry = Registry::builder()
        .resource("users", |r| {
            r.model(store.model("users").unwrap())
                .attribute("id")
                .attribute("name")
                .action(Action::Create)
                .action(Action::Show)
                .action(Action::Update)
                .member("quiet", |m| {
                    m.destroy(|mut ctx| async move {
                        ctx.no_content();
                        Ok(ctx)
                    })
                })
                .collection("broken", |c| {
                    c.show(|_ctx| async move {
                        Err(AppError::from(StoreError::Backend("pool timed out".into())))
                    })
                })
                .collection("mislabeled", |c| {
                    c.show(|mut ctx| async move {
                        ctx.set_header("x bad name", "1")?;
                        Ok(ctx)
                    })
                })
        })
        .build()
        .unwrap();
    common_routes().merge(resource_routes(Application::new(registry), body_limit))
}

fn request(method: &str, uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_and_show_over_http() {
    let app = router(1024);

    let response = app
        .clone()
        .oneshot(request("POST", "/users", Some(FORM), "name=kolo&email=kolo@gmail.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json;charset=UTF-8"
    );
    assert_eq!(json_body(response).await, json!({"id": 1, "name": "kolo"}));

    let response = app
        .clone()
        .oneshot(request("PUT", "/users/1?name=ivan", None, ""))
        .await
        .unwrap();
    assert_eq!(json_body(response).await, json!({"id": 1, "name": "ivan"}));

    let response = app.oneshot(request("GET", "/users/1", None, "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["name"], json!("ivan"));
}

#[tokio::test]
async fn json_bodies_are_accepted() {
    let response = router(1024)
        .oneshot(request("POST", "/users", Some("application/json"), r#"{"name":"carol"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["name"], json!("carol"));
}

#[tokio::test]
async fn errors_use_message_documents() {
    let app = router(1024);

    let response = app.clone().oneshot(request("GET", "/nothing", None, "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json;charset=UTF-8"
    );
    assert!(json_body(response).await["message"].is_string());

    let response = app.clone().oneshot(request("GET", "/users/99", None, "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.clone().oneshot(request("DELETE", "/users", None, "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

    let response = app.oneshot(request("PATCH", "/users/1", None, "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(response).await["message"], json!("method PATCH is not supported"));
}

#[tokio::test]
async fn unexpected_failures_stay_generic() {
    let response = router(1024)
        .oneshot(request("GET", "/users/broken", None, ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"message": "Internal Server Error"}));
}

#[tokio::test]
async fn bad_response_header_stays_generic() {
    let response = router(1024)
        .oneshot(request("GET", "/users/mislabeled", None, ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"message": "Internal Server Error"}));
}

#[tokio::test]
async fn validation_failure_is_a_document() {
    let response = router(1024)
        .oneshot(request("POST", "/users", Some(FORM), "email=kolo@gmail.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"name": ["can't be blank"]}));
}

#[tokio::test]
async fn unacceptable_media_type() {
    let req = Request::builder()
        .method("GET")
        .uri("/users")
        .header(header::ACCEPT, "text/html")
        .body(Body::empty())
        .unwrap();
    let response = router(1024).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(json_body(response).await, json!({"message": "Not Acceptable Error"}));
}

#[tokio::test]
async fn no_content_has_empty_body() {
    let app = router(1024);
    app.clone()
        .oneshot(request("POST", "/users", Some(FORM), "name=kolo"))
        .await
        .unwrap();
    let response = app
        .oneshot(request("DELETE", "/users/1/quiet", None, ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let body = format!("name={}", "k".repeat(256));
    let response = router(64)
        .oneshot(request("POST", "/users", Some(FORM), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn body_limit_above_two_mebibytes_is_honoured() {
    let body = format!("name={}", "k".repeat(3 * 1024 * 1024));
    let response = router(8 * 1024 * 1024)
        .oneshot(request("POST", "/users", Some(FORM), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn health_and_version() {
    let app = router(1024);
    let response = app.clone().oneshot(request("GET", "/health", None, "")).await.unwrap();
    assert_eq!(json_body(response).await, json!({"status": "ok"}));

    let response = app.oneshot(request("GET", "/version", None, "")).await.unwrap();
    assert_eq!(json_body(response).await["name"], json!("resourceful"));
}
