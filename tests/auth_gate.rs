use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
    routing::get,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use storefront_api::{
    auth::{Role, TokenIssuer},
    error::AppResult,
    middleware::auth::AuthUser,
    routes::create_app,
    state::AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &[u8] = b"gate-test-secret";
const ADMIN_ONLY: &[Role] = &[Role::Admin];

fn issuer() -> Arc<TokenIssuer> {
    Arc::new(TokenIssuer::new(SECRET, chrono::Duration::hours(24)))
}

fn token_for(tokens: &TokenIssuer, roles: &[&str]) -> String {
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    tokens.issue(Uuid::new_v4(), &roles).expect("token")
}

async fn admin_area(user: AuthUser) -> AppResult<Json<Value>> {
    user.require_any(ADMIN_ONLY)?;
    Ok(Json(serde_json::json!({ "user_id": user.user_id })))
}

fn gated_router(tokens: Arc<TokenIssuer>) -> Router {
    Router::new()
        .route("/admin-area", get(admin_area))
        .with_state(tokens)
}

/// The real application with no database behind it. Good for anything that
/// is decided before a handler touches storage.
fn offline_app(tokens: Arc<TokenIssuer>) -> Router {
    let state = AppState {
        orm: DatabaseConnection::Disconnected,
        tokens,
    };
    create_app(state, Duration::from_secs(5))
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let response = gated_router(issuer())
        .oneshot(get_request("/admin-area", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json_body(response).await;
    assert_eq!(body["data"]["error"], "unauthenticated");
}

#[tokio::test]
async fn non_bearer_scheme_is_unauthorized() {
    let request = Request::builder()
        .uri("/admin-area")
        .header(header::AUTHORIZATION, "Basic YWRtaW46YWRtaW4=")
        .body(Body::empty())
        .unwrap();
    let response = gated_router(issuer()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_from_another_secret_is_unauthorized() {
    let foreign = TokenIssuer::new(b"some-other-secret", chrono::Duration::hours(1));
    let token = token_for(&foreign, &["Admin"]);
    let response = gated_router(issuer())
        .oneshot(get_request("/admin-area", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_token_on_admin_route_is_forbidden() {
    let tokens = issuer();
    let token = token_for(&tokens, &["User"]);
    let response = gated_router(tokens)
        .oneshot(get_request("/admin-area", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Access denied");
}

#[tokio::test]
async fn unknown_role_names_grant_nothing() {
    let tokens = issuer();
    let token = token_for(&tokens, &["admin", "Root"]);
    let response = gated_router(tokens)
        .oneshot(get_request("/admin-area", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_token_passes() {
    let tokens = issuer();
    let token = token_for(&tokens, &["User", "Admin"]);
    let response = gated_router(tokens)
        .oneshot(get_request("/admin-area", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn app_rejects_anonymous_user_listing() {
    let response = offline_app(issuer())
        .oneshot(get_request("/users", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn app_forbids_plain_user_on_admin_endpoints() {
    let tokens = issuer();
    let token = token_for(&tokens, &["User"]);
    let app = offline_app(tokens);

    for uri in ["/users", "/roles", "/user-roles", "/order-items"] {
        let response = app
            .clone()
            .oneshot(get_request(uri, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn plain_user_cannot_create_privileged_accounts() {
    let tokens = issuer();
    let token = token_for(&tokens, &["User"]);
    let app = offline_app(tokens);

    for roles in [vec!["Admin"], vec!["Seller"], vec!["User", "Support"]] {
        let body = serde_json::json!({
            "username": "mallory",
            "email": "mallory@example.com",
            "password": "secret1",
            "roles": roles,
        });
        let response = app
            .clone()
            .oneshot(post_json("/users", &token, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["data"]["error"], "forbidden");
    }
}

#[tokio::test]
async fn app_health_carries_request_id() {
    let response = offline_app(issuer())
        .oneshot(get_request("/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_path_falls_back_to_not_found() {
    let response = offline_app(issuer())
        .oneshot(get_request("/nope", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["data"]["path"], "/nope");
}
