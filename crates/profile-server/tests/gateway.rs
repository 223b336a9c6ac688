use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use profile_server::server::{
    gateway::{SWAGGER_JSON, SWAGGER_PATH, router},
    service::resource::ProfileService,
    store::memory::MemoryStore,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    router(ProfileService::new(Arc::new(MemoryStore::new())), false)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn crud_round_trip_over_http() {
    let app = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/v1/users",
        Some(json!({"user": {"name": "user", "email": "user@example.com"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": 1}));

    let (status, body) = call(&app, Method::GET, "/v1/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "users": [{"id": 1, "name": "user", "email": "user@example.com"}],
            "limit": 100,
            "offset": 0,
            "total": 1
        })
    );

    let (status, _) = call(
        &app,
        Method::PATCH,
        "/v1/users/1",
        Some(json!({
            "user": {"name": "user1", "email": "user1@example.com"},
            "fields": ["name", "email"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, "/v1/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "user1");
    assert_eq!(body["user"]["email"], "user1@example.com");

    let (status, body) = call(&app, Method::DELETE, "/v1/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = call(&app, Method::DELETE, "/v1/users/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn list_clamps_and_keeps_the_total() {
    let app = app();
    for i in 0..3 {
        call(
            &app,
            Method::POST,
            "/v1/users",
            Some(json!({"user": {"name": format!("u{i}"), "email": "x@example.com"}})),
        )
        .await;
    }

    let (status, body) = call(&app, Method::GET, "/v1/users?limit=5000&offset=2&fields=name", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 1000);
    assert_eq!(body["offset"], 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["users"], json!([{"id": 0, "name": "u2", "email": ""}]));

    let (_, body) = call(&app, Method::GET, "/v1/users?offset=10", None).await;
    assert_eq!(body["users"], json!([]));
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn client_errors_are_bad_requests() {
    let app = app();

    let (status, body) = call(&app, Method::GET, "/v1/users?offset=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 3);

    let (status, _) = call(&app, Method::POST, "/v1/users", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::GET, "/v1/users/not-a-number", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    call(
        &app,
        Method::POST,
        "/v1/users",
        Some(json!({"user": {"name": "a", "email": "a@example.com"}})),
    )
    .await;
    let (status, body) = call(
        &app,
        Method::PATCH,
        "/v1/users/1",
        Some(json!({"user": {"name": "b"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "field mask must not be empty");

    let (_, body) = call(&app, Method::GET, "/v1/users/1", None).await;
    assert_eq!(body["user"]["name"], "a");
}

#[tokio::test]
async fn missing_users_and_replace() {
    let app = app();

    let (status, _) = call(&app, Method::GET, "/v1/users/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/v1/users/1",
        Some(json!({"user": {"name": "a"}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["code"], 12);
}

#[tokio::test]
async fn serves_the_api_description() {
    let app = app();
    let (status, body) = call(&app, Method::GET, SWAGGER_PATH, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::from_str::<Value>(SWAGGER_JSON).unwrap());
    assert!(body["paths"]["/v1/users/{id}"]["patch"].is_object());
}
