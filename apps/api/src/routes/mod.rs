pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::auth::handlers as auth;
use crate::errors::AppError;
use crate::jobs::handlers as jobs;
use crate::payments::handlers as payments;
use crate::state::AppState;
use crate::users::handlers as users;

const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/profile", put(users::update_profile))
        .route("/api/auth/wallet-login", post(auth::wallet_login))
        .route("/api/auth/connect-wallet", post(auth::connect_wallet))
        // Jobs
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/jobs/my-jobs", get(jobs::my_jobs))
        .route("/api/jobs/applications", get(jobs::received_applications))
        .route("/api/jobs/recommended", get(jobs::recommended))
        .route("/api/jobs/extract-skills", post(jobs::extract))
        .route(
            "/api/jobs/:id",
            get(jobs::get_job).put(jobs::update_job).delete(jobs::delete_job),
        )
        .route("/api/jobs/:id/match", get(jobs::job_match))
        .route("/api/jobs/:id/apply", post(jobs::apply))
        .route(
            "/api/jobs/:id/applications/:application_id",
            put(jobs::update_application_status),
        )
        // Users
        .route("/api/users/search", get(users::search))
        .route("/api/users/stats", get(users::stats))
        .route("/api/users/profile", put(users::update_profile))
        .route("/api/users/skills", post(users::add_user_skill))
        .route("/api/users/skills/:skill", delete(users::remove_user_skill))
        .route("/api/users/:id", get(users::get_by_id))
        // Payments
        .route("/api/payments/verify", post(payments::verify))
        .route("/api/payments/platform-fee", post(payments::platform_fee))
        .route("/api/payments/platform-fee-info", get(payments::platform_fee_info))
        .route("/api/payments/escrow", post(payments::create_escrow))
        .route("/api/payments/release-escrow", post(payments::release_escrow))
        .route("/api/payments/history", get(payments::history))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::payments::verify::tests::StubChain;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Router over a pool that is never dialed. Only requests rejected before
    /// any query runs are safe to send.
    fn app() -> Router {
        let config = Config::for_tests();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        build_router(AppState {
            db,
            config,
            chain: Arc::new(StubChain::default()),
        })
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = send(get_request("/api/nothing-here")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Route not found");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        for uri in ["/api/auth/me", "/api/jobs/my-jobs", "/api/users/stats", "/api/payments/history"] {
            let (status, _) = send(get_request(uri)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let request = Request::builder()
            .uri("/api/auth/me")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let (status, body) = send(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({
                "name": "A",
                "email": "not-an-email",
                "password": "123456",
                "confirmPassword": "654321"
            }),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        let fields: Vec<&str> = body["error"]["details"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|d| d["field"].as_str())
            .collect();
        assert_eq!(fields, vec!["confirmPassword", "email", "name"]);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_platform_fee_info() {
        let (status, body) = send(get_request("/api/payments/platform-fee-info")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["amount"], "0.001");
        assert_eq!(body["currency"], "ETH");
        assert_eq!(body["walletAddress"], "0x1234567890123456789012345678901234567890");
    }

    #[tokio::test]
    async fn test_extract_skills_route() {
        let (status, body) = send(json_request(
            "POST",
            "/api/jobs/extract-skills",
            serde_json::json!({ "text": "I know React and Solidity" }),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["skills"], serde_json::json!(["react", "solidity"]));
    }

    #[tokio::test]
    async fn test_job_list_rejects_unknown_job_type() {
        let (status, body) = send(get_request("/api/jobs?jobType=gig")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"][0]["field"], "jobType");
    }

    #[tokio::test]
    async fn test_bad_query_string_is_json_400() {
        let (status, body) = send(get_request("/api/jobs?page=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_bad_path_id_is_json_400() {
        let (status, body) = send(get_request("/api/jobs/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert!(body["error"]["message"].is_string());
    }
}
