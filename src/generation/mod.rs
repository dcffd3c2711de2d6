mod cdn;
mod imaging;
mod job;
mod nanobanana;
mod registry;

pub use registry::{JobRegistry, JobStatus};

use cdn::CdnUploader;
use job::{run_to_completion, GenerationJob, PollPolicy};
use nanobanana::NanobananaClient;

use reqwest::Client;
use tracing::{debug, info};

use crate::agents::prompts::{self, OutfitPreferences};
use crate::agents::OutfitRecommendation;
use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;

/// Validated generate-outfit parameters.
#[derive(Debug, Clone)]
pub struct OutfitRequest {
    pub user_image: String,
    pub wow_factor: u8,
    pub brands: Vec<String>,
    pub budget: String,
    pub occasion: String,
    pub conditions: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedOutfit {
    pub outfit_description: String,
    pub outfit_image_url: String,
}

/// Renders an outfit onto a person photo: stage, upload, submit, poll,
/// download and transcode.
pub struct ImageGenerator {
    uploader: CdnUploader,
    service: NanobananaClient,
    policy: PollPolicy,
}

impl ImageGenerator {
    pub fn from_config(client: &Client, config: &Config) -> Result<Self, AppError> {
        let api_key = config.nanobanana_api_key.clone().ok_or_else(|| {
            AppError::Configuration(
                "NANOBANANA_API_KEY not configured. Please add it to your .env file.".to_string(),
            )
        })?;
        let fal_key = config.fal_key.clone().ok_or_else(|| {
            AppError::Configuration(
                "FAL_KEY not configured. Image upload requires a CDN credential.".to_string(),
            )
        })?;

        Ok(Self {
            uploader: CdnUploader::new(client.clone(), fal_key, config.fal_storage_base.clone()),
            service: NanobananaClient::new(
                client.clone(),
                api_key,
                config.nanobanana_api_base.clone(),
                config.callback_url.clone(),
            ),
            policy: PollPolicy {
                interval: config.poll_interval,
                max_attempts: config.max_polls,
            },
        })
    }

    pub async fn generate(
        &self,
        person_image: &str,
        outfit: &str,
        occasion: &str,
        background: &str,
    ) -> Result<String, AppError> {
        info!("Image generation started (occasion: {})", occasion);
        info!("Background: {}", background);

        let photo = imaging::decode_base64_photo(person_image)?;
        let staged = imaging::write_temp_photo(&photo)?;
        info!("Person image staged: {}", staged.path().display());

        let image_url = self.uploader.upload_file(staged.path()).await?;
        drop(staged);

        let prompt = prompts::image_edit_prompt(outfit, occasion, background);
        debug!("Image generation prompt:\n{}", prompt);

        let task_id = self.service.submit(&prompt, &image_url).await?;
        let mut job = GenerationJob::new(task_id, self.policy.max_attempts);
        let result_url = run_to_completion(&self.service, &mut job, self.policy).await?;

        let bytes = self.service.download(&result_url).await?;
        let data_url = imaging::to_jpeg_data_url(&bytes)?;

        info!("Image generation complete ({} chars)", data_url.len());
        Ok(data_url)
    }
}

/// Describes an outfit with the language model, then renders it onto the
/// user's photo.
pub async fn generate_outfit(
    state: &AppState,
    request: &OutfitRequest,
) -> Result<GeneratedOutfit, AppError> {
    let generator = ImageGenerator::from_config(&state.http, &state.config)?;
    let mut agent = state.openai_agent()?;

    let prompt = prompts::outfit_description_prompt(&OutfitPreferences {
        occasion: &request.occasion,
        wow_factor: request.wow_factor,
        brands: &request.brands,
        budget: &request.budget,
        conditions: &request.conditions,
    });
    debug!("Outfit description prompt:\n{}", prompt);

    let outfit_description = agent
        .complete_json(&prompt, Some(&request.user_image))
        .await?;
    let outfit = OutfitRecommendation::parse(&outfit_description)?;

    let outfit_details = outfit.image_outfit_details();
    let background = prompts::background_for_occasion(&request.occasion);
    info!("Outfit details for image: {}", outfit_details);

    let outfit_image_url = generator
        .generate(
            &request.user_image,
            &outfit_details,
            &request.occasion,
            background,
        )
        .await?;

    Ok(GeneratedOutfit {
        outfit_description,
        outfit_image_url,
    })
}
