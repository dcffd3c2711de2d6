use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::{JsonBody, QueryParams};
use crate::arena::{NewSubmission, SortBy, Submission, VoteType};
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const DEFAULT_RATING: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    photo: Option<String>,
    title: Option<String>,
    description: Option<String>,
    occasion: Option<String>,
    source_mode: Option<String>,
    user_id: Option<String>,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<SubmitBody>,
) -> Result<Json<Value>, AppError> {
    let new = NewSubmission {
        photo: body.photo.unwrap_or_default(),
        title: body.title.unwrap_or_else(|| "Untitled".to_string()),
        description: body.description.unwrap_or_default(),
        occasion: body.occasion.unwrap_or_else(|| "General".to_string()),
        source_mode: body.source_mode.unwrap_or_else(|| "unknown".to_string()),
        user_id: body.user_id,
    };

    let submission = state.with_arena(move |arena| arena.submit(new)).await?;
    info!(
        "Arena submission {} created ({}, {})",
        submission.id, submission.title, submission.occasion
    );

    Ok(Json(json!({ "success": true, "submission": submission })))
}

#[derive(Serialize)]
struct ListedSubmission {
    #[serde(flatten)]
    submission: Submission,
    has_photo: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionsQuery {
    sort_by: Option<String>,
}

pub async fn submissions(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<SubmissionsQuery>,
) -> Result<Json<Value>, AppError> {
    let sort_by = SortBy::from_param(query.sort_by.as_deref());
    let submissions: Vec<ListedSubmission> = state
        .with_arena(move |arena| arena.list(sort_by))
        .await?
        .into_iter()
        .map(|submission| ListedSubmission {
            has_photo: !submission.photo.is_empty(),
            submission,
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "total": submissions.len(),
        "submissions": submissions,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    limit: Option<usize>,
}

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<LeaderboardQuery>,
) -> Result<Json<Value>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    let leaderboard = state
        .with_arena(move |arena| arena.leaderboard(limit))
        .await?;
    Ok(Json(json!({ "success": true, "leaderboard": leaderboard })))
}

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    submission_id: Option<String>,
    vote_type: Option<String>,
    rating: Option<i64>,
    voter_id: Option<String>,
}

pub async fn vote(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<VoteBody>,
) -> Result<Json<Value>, AppError> {
    let submission_id = body
        .submission_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("No submission_id provided".to_string()))?;
    let vote_type = VoteType::parse(body.vote_type.as_deref().unwrap_or("upvote"))?;
    let rating = body.rating.unwrap_or(DEFAULT_RATING);

    let id = submission_id.clone();
    let voter_id = body.voter_id;
    let submission = state
        .with_arena(move |arena| arena.vote(&id, vote_type, rating, voter_id.as_deref()))
        .await?;
    info!(
        "Vote recorded on {} ({:?}, rating {})",
        submission_id, vote_type, rating
    );

    Ok(Json(json!({ "success": true, "submission": submission })))
}

#[derive(Debug, Deserialize)]
pub struct VoterQuery {
    voter_id: Option<String>,
}

pub async fn voter_vote(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
    QueryParams(query): QueryParams<VoterQuery>,
) -> Result<Json<Value>, AppError> {
    let vote = state
        .with_arena(move |arena| arena.voter_vote(&submission_id, query.voter_id.as_deref()))
        .await?;
    Ok(Json(json!({ "success": true, "vote": vote })))
}

#[derive(Debug, Deserialize)]
pub struct LikeBody {
    submission_id: Option<String>,
}

pub async fn like(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<LikeBody>,
) -> Result<Json<Value>, AppError> {
    let submission_id = body
        .submission_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("No submission_id provided".to_string()))?;

    let submission = state
        .with_arena(move |arena| arena.like(&submission_id))
        .await?;
    Ok(Json(json!({ "success": true, "submission": submission })))
}

pub async fn submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let submission = state
        .with_arena(move |arena| arena.get(&submission_id))
        .await?;
    Ok(Json(json!({ "success": true, "submission": submission })))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let stats = state.with_arena(|arena| arena.stats()).await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

pub async fn cleanup(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let result = state.with_arena(|arena| arena.cleanup_invalid()).await?;
    info!(
        "Arena cleanup removed {} of {} submissions",
        result.removed_count, result.original_count
    );

    Ok(Json(json!({
        "success": true,
        "message": format!("Removed {} invalid submissions", result.removed_count),
        "result": result,
    })))
}

pub async fn backup(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let data = state.with_arena(|arena| arena.export()).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn restore(
    State(state): State<Arc<AppState>>,
    JsonBody(backup): JsonBody<Value>,
) -> Result<Json<Value>, AppError> {
    let restored_count = state
        .with_arena(move |arena| arena.restore(backup))
        .await?;
    info!("Arena restored with {} submissions", restored_count);

    Ok(Json(json!({
        "success": true,
        "message": format!("Restored {} submissions", restored_count),
        "restored_count": restored_count,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn app_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let config = Config::for_tests("http://127.0.0.1:9", dir.path().join("db/arena.json"));
        Arc::new(AppState::new(Arc::new(config)).unwrap())
    }

    async fn submit_photo(state: &Arc<AppState>, photo: &str, title: &str) -> String {
        let body: SubmitBody = serde_json::from_value(json!({
            "photo": photo,
            "title": title,
            "occasion": "Wedding"
        }))
        .unwrap();
        let Json(response) = submit(State(state.clone()), JsonBody(body)).await.unwrap();
        response["submission"]["id"].as_str().unwrap().to_string()
    }

    async fn cast(state: &Arc<AppState>, body: Value) -> Result<Value, AppError> {
        let body: VoteBody = serde_json::from_value(body).unwrap();
        vote(State(state.clone()), JsonBody(body)).await.map(|Json(v)| v)
    }

    #[tokio::test]
    async fn submit_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);

        let body: SubmitBody =
            serde_json::from_value(json!({"photo": "data:image/jpeg;base64,AAAA"})).unwrap();
        let Json(response) = submit(State(state), JsonBody(body)).await.unwrap();

        let submission = &response["submission"];
        assert_eq!(submission["title"], "Untitled");
        assert_eq!(submission["occasion"], "General");
        assert_eq!(submission["source_mode"], "unknown");
        assert_eq!(submission["user_id"], "anonymous");
        assert_eq!(submission["vote_count"], 0);
    }

    #[tokio::test]
    async fn submit_without_photo_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);

        let body: SubmitBody = serde_json::from_value(json!({"title": "Empty"})).unwrap();
        let err = submit(State(state), JsonBody(body)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn vote_defaults_and_revote() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        let id = submit_photo(&state, "data:image/jpeg;base64,AAAA", "Red Dress").await;

        let first = cast(&state, json!({"submission_id": id, "voter_id": "v1"}))
            .await
            .unwrap();
        assert_eq!(first["submission"]["total_votes"], 1);
        assert_eq!(first["submission"]["average_rating"], 5.0);

        let second = cast(
            &state,
            json!({"submission_id": id, "voter_id": "v1", "vote_type": "downvote", "rating": 4}),
        )
        .await
        .unwrap();
        assert_eq!(second["submission"]["total_votes"], 0);
        assert_eq!(second["submission"]["vote_count"], 1);
        assert_eq!(second["submission"]["average_rating"], 4.0);

        let Json(lookup) = voter_vote(
            State(state.clone()),
            Path(id.clone()),
            QueryParams(VoterQuery {
                voter_id: Some("v1".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(lookup["vote"]["vote_type"], "downvote");

        let Json(nobody) = voter_vote(
            State(state),
            Path(id),
            QueryParams(VoterQuery { voter_id: None }),
        )
        .await
        .unwrap();
        assert!(nobody["vote"].is_null());
    }

    #[tokio::test]
    async fn vote_errors_map_to_client_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        let id = submit_photo(&state, "data:image/jpeg;base64,AAAA", "Suit").await;

        let bad_type = cast(&state, json!({"submission_id": id, "vote_type": "sideways"}))
            .await
            .unwrap_err();
        assert_eq!(bad_type.status(), axum::http::StatusCode::BAD_REQUEST);

        let bad_rating = cast(&state, json!({"submission_id": id, "rating": 0}))
            .await
            .unwrap_err();
        assert_eq!(bad_rating.status(), axum::http::StatusCode::BAD_REQUEST);

        let missing = cast(&state, json!({"submission_id": "missing"}))
            .await
            .unwrap_err();
        assert_eq!(missing.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_flags_photos_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        submit_photo(&state, "data:image/jpeg;base64,AAAA", "One").await;
        submit_photo(&state, "https://cdn.test/two.jpg", "Two").await;

        let Json(response) = submissions(
            State(state),
            QueryParams(SubmissionsQuery {
                sort_by: Some("top_rated".into()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response["total"], 2);
        let listed = response["submissions"].as_array().unwrap();
        assert!(listed.iter().all(|s| s["has_photo"] == true));
        assert!(listed.iter().all(|s| s["id"].is_string()));
    }

    #[tokio::test]
    async fn like_and_fetch_submission() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        let id = submit_photo(&state, "data:image/jpeg;base64,AAAA", "Jacket").await;

        let body: LikeBody = serde_json::from_value(json!({"submission_id": id})).unwrap();
        like(State(state.clone()), JsonBody(body)).await.unwrap();

        let Json(fetched) = submission(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(fetched["submission"]["total_votes"], 1);
        assert_eq!(fetched["submission"]["vote_count"], 0);

        let err = submission(State(state), Path("missing".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn cleanup_backup_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        submit_photo(&state, "file:///tmp/local.png", "Local").await;
        let keep = submit_photo(&state, "data:image/jpeg;base64,AAAA", "Keep").await;

        let Json(cleaned) = cleanup(State(state.clone())).await.unwrap();
        assert_eq!(cleaned["result"]["removed_count"], 1);
        assert_eq!(cleaned["result"]["remaining_count"], 1);

        let Json(exported) = backup(State(state.clone())).await.unwrap();
        assert_eq!(exported["data"]["submissions"][0]["id"], keep.as_str());

        let Json(restored) = restore(State(state.clone()), JsonBody(exported["data"].clone()))
            .await
            .unwrap();
        assert_eq!(restored["restored_count"], 1);

        let err = restore(State(state.clone()), JsonBody(json!("not a backup")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let Json(stats) = stats(State(state)).await.unwrap();
        assert_eq!(stats["stats"]["total_submissions"], 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_are_all_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        let id = submit_photo(&state, "data:image/jpeg;base64,AAAA", "Crowd").await;

        let voters: Vec<_> = (0..16)
            .map(|n| {
                let state = state.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    cast(&state, json!({"submission_id": id, "voter_id": format!("v{n}"), "rating": 6}))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for voter in voters {
            voter.await.unwrap();
        }

        let Json(fetched) = submission(State(state), Path(id)).await.unwrap();
        assert_eq!(fetched["submission"]["vote_count"], 16);
        assert_eq!(fetched["submission"]["total_votes"], 16);
        assert_eq!(fetched["submission"]["average_rating"], 6.0);
    }

    #[tokio::test]
    async fn leaderboard_honours_limit() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir);
        for title in ["A", "B", "C"] {
            submit_photo(&state, "data:image/jpeg;base64,AAAA", title).await;
        }

        let Json(response) = leaderboard(State(state), QueryParams(LeaderboardQuery { limit: Some(2) }))
            .await
            .unwrap();
        assert_eq!(response["leaderboard"].as_array().unwrap().len(), 2);
    }
}
