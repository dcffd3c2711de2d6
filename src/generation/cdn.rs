use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::AppError;

#[derive(Debug, Serialize)]
struct InitiateUpload<'a> {
    content_type: &'a str,
    file_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitiatedUpload {
    upload_url: String,
    file_url: String,
}

/// Two-phase upload to the fal.ai CDN: initiate, then PUT the bytes.
pub struct CdnUploader {
    client: Client,
    api_key: String,
    storage_base: String,
}

impl CdnUploader {
    pub fn new(client: Client, api_key: String, storage_base: String) -> Self {
        Self {
            client,
            api_key,
            storage_base: storage_base.trim_end_matches('/').to_string(),
        }
    }

    /// Uploads a local file and returns its public URL.
    pub async fn upload_file(&self, path: &Path) -> Result<String, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Upload(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.png");
        let content_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");

        let response = self
            .client
            .post(format!("{}/storage/upload/initiate", self.storage_base))
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&InitiateUpload {
                content_type,
                file_name,
            })
            .send()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upload(format!("initiate returned {}: {}", status, body)));
        }
        let initiated: InitiatedUpload = response
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("unexpected initiate response: {}", e)))?;

        let size = bytes.len();
        let put = self
            .client
            .put(&initiated.upload_url)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        if !put.status().is_success() {
            return Err(AppError::Upload(format!(
                "storage PUT returned {}",
                put.status()
            )));
        }

        info!("Image uploaded to CDN ({} bytes): {}", size, initiated.file_url);
        Ok(initiated.file_url)
    }
}
