use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::job::{PollObservation, TaskStatusSource};
use crate::error::AppError;

const IMAGE_TO_IMAGE: &str = "IMAGETOIAMGE";
const PORTRAIT: &str = "3:4";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    prompt: &'a str,
    #[serde(rename = "type")]
    task_type: &'static str,
    image_urls: Vec<&'a str>,
    num_images: u32,
    #[serde(rename = "image_size")]
    image_size: &'static str,
    call_back_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: Option<i64>,
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmittedTask {
    task_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    success_flag: Option<i64>,
    response: Option<TaskResponse>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskResponse {
    result_image_url: Option<String>,
}

impl TaskRecord {
    fn observation(self) -> PollObservation {
        match self.success_flag {
            Some(1) => match self.response.and_then(|r| r.result_image_url) {
                Some(url) if !url.is_empty() => PollObservation::Ready(url),
                _ => {
                    warn!("Success flag is 1 but no resultImageUrl found");
                    PollObservation::Pending
                }
            },
            None | Some(0) => PollObservation::Pending,
            Some(_) => PollObservation::Failed(
                self.error_message
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
        }
    }
}

/// Image-to-image generation service client.
pub struct NanobananaClient {
    client: Client,
    api_key: String,
    api_base: String,
    callback_url: String,
}

impl NanobananaClient {
    pub fn new(client: Client, api_key: String, api_base: String, callback_url: String) -> Self {
        Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            callback_url,
        }
    }

    /// Submits an edit of `image_url` and returns the remote task id.
    pub async fn submit(&self, prompt: &str, image_url: &str) -> Result<String, AppError> {
        let payload = GenerateRequest {
            prompt,
            task_type: IMAGE_TO_IMAGE,
            image_urls: vec![image_url],
            num_images: 1,
            image_size: PORTRAIT,
            call_back_url: &self.callback_url,
        };

        let response = self
            .client
            .post(format!("{}/generate", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Request(format!(
                "Image generation request failed ({}): {}",
                status, text
            )));
        }

        let envelope: Envelope<SubmittedTask> =
            serde_json::from_str(&text).map_err(|e| AppError::parse("generation response", e))?;
        if envelope.code != Some(200) {
            return Err(AppError::Request(format!(
                "Image generation error: {}",
                envelope.msg.unwrap_or_default()
            )));
        }

        let task = envelope
            .data
            .ok_or_else(|| AppError::parse("generation response", "missing data.taskId"))?;
        info!("Generation task submitted: {}", task.task_id);
        Ok(task.task_id)
    }

    pub async fn download(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Request(format!(
                "Downloading generated image failed ({})",
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        info!("Image downloaded: {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

impl TaskStatusSource for NanobananaClient {
    async fn poll(&self, task_id: &str) -> Result<PollObservation, AppError> {
        let response = self
            .client
            .get(format!("{}/record-info", self.api_base))
            .query(&[("taskId", task_id)])
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Status check failed: {}", status);
            return Ok(PollObservation::Pending);
        }

        let envelope: Envelope<TaskRecord> = response
            .json()
            .await
            .map_err(|e| AppError::parse("task status", e))?;
        if envelope.code != Some(200) {
            return Ok(PollObservation::Pending);
        }

        let record = envelope.data.unwrap_or_default();
        info!("Task {}: successFlag = {:?}", task_id, record.success_flag);
        Ok(record.observation())
    }
}
