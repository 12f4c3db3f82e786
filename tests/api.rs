//! Router-level tests for the paths that answer before touching the database.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use basecamp_store::integrations::payment_gateway::{sign, SIGNATURE_HEADER};
use basecamp_store::{create_router, AppState, Config};

fn app() -> Router {
    let config = Config::default();
    let db = PgPoolOptions::new().connect_lazy(&config.database_url).unwrap();
    create_router(AppState::new(db, config, None).unwrap())
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn webhook(body: &str, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::post("/webhooks/payment").header(header::CONTENT_TYPE, "application/json");
    if let Some(sig) = signature {
        builder = builder.header(SIGNATURE_HEADER, sig);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_reports_service() {
    let response = app().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "basecamp-store");
}

#[tokio::test]
async fn webhook_without_signature_is_unauthorized() {
    let response = app().oneshot(webhook(r#"{"event_id":"evt_1"}"#, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_with_wrong_signature_is_unauthorized() {
    let body = r#"{"event_id":"evt_1","bill_id":"b1","status":"paid","amount":1000}"#;
    let forged = sign(body.as_bytes(), "not-the-secret").unwrap();
    let response = app().oneshot(webhook(body, Some(forged))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_with_valid_signature_but_bad_body_is_rejected() {
    let secret = Config::default().payment.webhook_secret;
    let body = r#"{"event_id":"evt_1","status":"refunded"}"#;
    let signature = format!("sha256={}", sign(body.as_bytes(), &secret).unwrap());
    let response = app().oneshot(webhook(body, Some(signature))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_require_bearer_token() {
    let missing = app().oneshot(Request::get("/api/v1/admin/orders").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(missing).await;
    assert_eq!(body, json!({"success": false, "error": "Authentication required"}));

    let wrong = Request::get("/api/v1/admin/orders")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app().oneshot(wrong).await.unwrap().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_token_lets_validation_run() {
    let token = Config::default().admin_api_token;
    let request = Request::post("/api/v1/admin/promos")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"code": "HALFOFF", "kind": "PERCENTAGE", "value": "150"}).to_string()))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["success"], false);
}

#[tokio::test]
async fn checkout_rejects_delivery_without_address() {
    let request = Request::post("/api/v1/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "customer_name": "Aina",
                "customer_email": "aina@example.com",
                "delivery_method": "DELIVERY",
                "items": [{"product_id": "0191d4f0-0000-7000-8000-000000000001", "quantity": 1}],
            })
            .to_string(),
        ))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
