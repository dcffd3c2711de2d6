mod agents;
mod arena;
mod config;
mod error;
mod generation;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::{api, arena as arena_routes};

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn app(state: Arc<state::AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/rate-outfit", post(api::rate_outfit))
        .route("/api/generate-outfit", post(api::generate_outfit))
        .route("/api/regenerate-outfit", post(api::regenerate_outfit))
        .route("/api/generate-outfit/jobs", post(api::start_generation_job))
        .route(
            "/api/generate-outfit/jobs/:job_id",
            get(api::generation_job_status),
        )
        .route("/api/arena/submit", post(arena_routes::submit))
        .route("/api/arena/submissions", get(arena_routes::submissions))
        .route("/api/arena/leaderboard", get(arena_routes::leaderboard))
        .route("/api/arena/vote", post(arena_routes::vote))
        .route("/api/arena/vote/:submission_id", get(arena_routes::voter_vote))
        .route("/api/arena/like", post(arena_routes::like))
        .route(
            "/api/arena/submission/:submission_id",
            get(arena_routes::submission),
        )
        .route("/api/arena/stats", get(arena_routes::stats))
        .route("/api/arena/cleanup", post(arena_routes::cleanup))
        .route("/api/arena/backup", get(arena_routes::backup))
        .route("/api/arena/restore", post(arena_routes::restore))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outfit_assistant=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    if config.openai_api_key.is_none() {
        tracing::warn!(
            "OPENAI_API_KEY not found in environment; rating and outfit generation will fail"
        );
    }
    tracing::info!("Arena database: {}", config.arena_db_path.display());

    let state = Arc::new(state::AppState::new(config.clone())?);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Outfit Assistant listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn router_serves_health_and_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_tests("http://127.0.0.1:9", dir.path().join("arena.json"));
        let state = Arc::new(state::AppState::new(Arc::new(config)).unwrap());
        let base = test_support::serve(app(state)).await;
        let client = reqwest::Client::new();

        let health: serde_json::Value = client
            .get(format!("{}/api/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "healthy");

        let missing = client
            .get(format!("{}/api/arena/submission/nope", base))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
        let body: serde_json::Value = missing.json().await.unwrap();
        assert_eq!(body["error"], "Submission not found");

        let invalid = client
            .post(format!("{}/api/arena/vote", base))
            .json(&serde_json::json!({"submission_id": "x", "vote_type": "meh"}))
            .send()
            .await
            .unwrap();
        assert_eq!(invalid.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_requests_get_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_tests("http://127.0.0.1:9", dir.path().join("arena.json"));
        let state = Arc::new(state::AppState::new(Arc::new(config)).unwrap());
        let base = test_support::serve(app(state)).await;
        let client = reqwest::Client::new();

        let wrong_type = client
            .post(format!("{}/api/arena/vote", base))
            .json(&serde_json::json!({"submission_id": "x", "rating": "high"}))
            .send()
            .await
            .unwrap();
        assert_eq!(wrong_type.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = wrong_type.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("rating"), "{body}");

        let not_json = client
            .post(format!("{}/api/arena/submit", base))
            .header("content-type", "application/json")
            .body("{photo:")
            .send()
            .await
            .unwrap();
        assert_eq!(not_json.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = not_json.json().await.unwrap();
        assert!(body["error"].is_string());

        let bad_limit = client
            .get(format!("{}/api/arena/leaderboard?limit=abc", base))
            .send()
            .await
            .unwrap();
        assert_eq!(bad_limit.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = bad_limit.json().await.unwrap();
        assert!(body["error"].is_string());
    }
}
