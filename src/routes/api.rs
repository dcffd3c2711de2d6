use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::JsonBody;
use crate::agents::{prompts, OutfitRating};
use crate::error::AppError;
use crate::generation::{self, OutfitRequest};
use crate::state::AppState;

const DEFAULT_WOW_FACTOR: i64 = 5;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Outfit Assistant API is running"
    }))
}

#[derive(Debug, Deserialize)]
pub struct RateOutfitBody {
    image: Option<String>,
    occasion: Option<String>,
    budget: Option<String>,
}

pub async fn rate_outfit(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<RateOutfitBody>,
) -> Result<Json<Value>, AppError> {
    let image = body
        .image
        .filter(|i| !i.is_empty())
        .ok_or_else(|| AppError::Validation("No image provided".to_string()))?;
    let occasion = body
        .occasion
        .unwrap_or_else(|| prompts::DEFAULT_OCCASION.to_string());
    let budget = body.budget.unwrap_or_default();
    info!("Rate outfit request (occasion: {}, budget: {:?})", occasion, budget);

    let mut agent = state.openai_agent()?;
    let rating = agent
        .complete_json(&prompts::rating_prompt(&occasion, &budget), Some(&image))
        .await?;
    OutfitRating::parse(&rating)?;

    Ok(Json(json!({ "success": true, "data": rating })))
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateOutfitBody {
    user_image: Option<String>,
    wow_factor: Option<i64>,
    brands: Option<Vec<String>>,
    budget: Option<String>,
    occasion: Option<String>,
    conditions: Option<String>,
}

impl GenerateOutfitBody {
    fn into_request(self) -> Result<OutfitRequest, AppError> {
        let wow_factor = self.wow_factor.unwrap_or(DEFAULT_WOW_FACTOR);
        if !(1..=10).contains(&wow_factor) {
            return Err(AppError::Validation(
                "wow_factor must be between 1 and 10".to_string(),
            ));
        }
        let user_image = self.user_image.filter(|i| !i.is_empty()).ok_or_else(|| {
            AppError::Validation(
                "No user image provided. Image generation requires a user photo.".to_string(),
            )
        })?;

        Ok(OutfitRequest {
            user_image,
            wow_factor: wow_factor as u8,
            brands: self.brands.unwrap_or_default(),
            budget: self.budget.unwrap_or_default(),
            occasion: self
                .occasion
                .unwrap_or_else(|| prompts::DEFAULT_OCCASION.to_string()),
            conditions: self.conditions.unwrap_or_default(),
        })
    }
}

fn log_request(request: &OutfitRequest) {
    info!(
        "Generate outfit request (occasion: {}, wow factor: {}, brands: {:?}, budget: {:?}, conditions: {:?})",
        request.occasion, request.wow_factor, request.brands, request.budget, request.conditions
    );
}

pub async fn generate_outfit(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<GenerateOutfitBody>,
) -> Result<Json<Value>, AppError> {
    let request = body.into_request()?;
    log_request(&request);

    let outfit = generation::generate_outfit(&state, &request).await?;

    Ok(Json(json!({
        "success": true,
        "outfit_description": outfit.outfit_description,
        "outfit_image_url": outfit.outfit_image_url,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RegenerateOutfitBody {
    feedback: Option<Value>,
    previous_params: Option<Value>,
    #[serde(flatten)]
    params: GenerateOutfitBody,
}

pub async fn regenerate_outfit(
    state: State<Arc<AppState>>,
    JsonBody(body): JsonBody<RegenerateOutfitBody>,
) -> Result<Json<Value>, AppError> {
    // Feedback does not steer generation yet.
    info!(
        "Regenerate request (feedback: {}, previous params: {})",
        body.feedback.is_some(),
        body.previous_params.is_some()
    );
    generate_outfit(state, JsonBody(body.params)).await
}

pub async fn start_generation_job(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<GenerateOutfitBody>,
) -> Result<Json<Value>, AppError> {
    let request = body.into_request()?;
    log_request(&request);

    let job_id = state.jobs.create().await;
    info!("Generation job {} started", job_id);

    let task_state = state.clone();
    state.jobs.spawn(job_id.clone(), async move {
        generation::generate_outfit(&task_state, &request).await
    });

    Ok(Json(json!({
        "success": true,
        "job_id": job_id,
        "status": "processing",
    })))
}

pub async fn generation_job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let status = state
        .jobs
        .get(&job_id)
        .await
        .ok_or_else(|| AppError::NotFound("Generation job not found".to_string()))?;

    let mut response =
        serde_json::to_value(status).map_err(|e| AppError::parse("job status", e))?;
    response["success"] = json!(true);
    response["job_id"] = json!(job_id);
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::generation::tests::{fake_services, person_photo, OUTFIT_JSON};
    use std::time::Duration;

    fn app_state(base: &str, dir: &tempfile::TempDir) -> Arc<AppState> {
        let config = Config::for_tests(base, dir.path().join("arena.json"));
        Arc::new(AppState::new(Arc::new(config)).unwrap())
    }

    fn generate_body(json: Value) -> GenerateOutfitBody {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn health_reports_running() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "healthy");
    }

    #[test]
    fn generate_body_applies_defaults() {
        let request = generate_body(json!({"user_image": "abc"}))
            .into_request()
            .unwrap();
        assert_eq!(request.wow_factor, 5);
        assert_eq!(request.occasion, "Casual Outing");
        assert!(request.brands.is_empty());
    }

    #[test]
    fn generate_body_rejects_bad_input() {
        let missing_image = generate_body(json!({"wow_factor": 4})).into_request();
        assert!(matches!(missing_image, Err(AppError::Validation(_))));

        let too_bold = generate_body(json!({"user_image": "abc", "wow_factor": 11})).into_request();
        assert!(matches!(too_bold, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn rate_outfit_requires_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state("http://127.0.0.1:9", &dir);

        let err = rate_outfit(
            State(state),
            JsonBody(RateOutfitBody {
                image: None,
                occasion: None,
                budget: None,
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref m) if m == "No image provided"));
    }

    #[tokio::test]
    async fn rate_outfit_rejects_replies_without_scores() {
        // The fake model answers every prompt with an outfit description.
        let (base, _fake) = fake_services(1).await;
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&base, &dir);

        let err = rate_outfit(
            State(state),
            JsonBody(RateOutfitBody {
                image: Some(person_photo()),
                occasion: Some("Date Night".into()),
                budget: None,
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[tokio::test]
    async fn regenerate_behaves_like_generate() {
        let (base, _fake) = fake_services(2).await;
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&base, &dir);

        let body: RegenerateOutfitBody = serde_json::from_value(json!({
            "feedback": {"liked": false},
            "previous_params": {"occasion": "Wedding"},
            "user_image": person_photo(),
            "occasion": "Wedding"
        }))
        .unwrap();
        let Json(response) = regenerate_outfit(State(state), JsonBody(body)).await.unwrap();

        assert_eq!(response["success"], true);
        assert_eq!(response["outfit_description"], OUTFIT_JSON);
        assert!(response["outfit_image_url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn background_job_reaches_complete() {
        let (base, _fake) = fake_services(2).await;
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&base, &dir);

        let Json(started) = start_generation_job(
            State(state.clone()),
            JsonBody(generate_body(json!({"user_image": person_photo()}))),
        )
        .await
        .unwrap();
        assert_eq!(started["status"], "processing");
        let job_id = started["job_id"].as_str().unwrap().to_string();

        let mut status = Value::Null;
        for _ in 0..200 {
            let Json(current) =
                generation_job_status(State(state.clone()), Path(job_id.clone()))
                    .await
                    .unwrap();
            status = current;
            if status["status"] != "processing" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        assert_eq!(status["status"], "complete", "{status}");
        assert_eq!(status["job_id"], job_id.as_str());
        assert_eq!(status["outfit_description"], OUTFIT_JSON);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state("http://127.0.0.1:9", &dir);

        let err = generation_job_status(State(state), Path("nope".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
