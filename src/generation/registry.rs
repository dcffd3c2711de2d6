use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::error;
use uuid::Uuid;

use super::GeneratedOutfit;
use crate::error::AppError;

const FINISHED_JOB_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Complete {
        outfit_description: String,
        outfit_image_url: String,
    },
    Error {
        error: String,
    },
}

struct JobEntry {
    status: JobStatus,
    finished_at: Option<Instant>,
}

/// In-memory status of background generations. Finished jobs are kept for
/// an hour so clients can collect the result.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, JobEntry>>>,
}

impl JobRegistry {
    pub async fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut jobs = self.jobs.write().await;
        jobs.retain(|_, entry| {
            entry
                .finished_at
                .map_or(true, |at| at.elapsed() < FINISHED_JOB_TTL)
        });
        jobs.insert(
            id.clone(),
            JobEntry {
                status: JobStatus::Processing,
                finished_at: None,
            },
        );
        id
    }

    pub async fn finish(&self, id: &str, result: Result<GeneratedOutfit, AppError>) {
        let status = match result {
            Ok(outfit) => JobStatus::Complete {
                outfit_description: outfit.outfit_description,
                outfit_image_url: outfit.outfit_image_url,
            },
            Err(e) => JobStatus::Error {
                error: e.to_string(),
            },
        };

        if let Some(entry) = self.jobs.write().await.get_mut(id) {
            entry.status = status;
            entry.finished_at = Some(Instant::now());
        }
    }

    /// Runs `work` in the background and records its outcome under `id`.
    /// A task that panics or is cancelled still finishes the job with an error.
    pub fn spawn<F>(&self, id: String, work: F)
    where
        F: Future<Output = Result<GeneratedOutfit, AppError>> + Send + 'static,
    {
        let registry = self.clone();
        let handle = tokio::spawn(work);
        tokio::spawn(async move {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(AppError::Request(format!("Generation task aborted: {}", e))),
            };
            if let Err(ref e) = result {
                error!("Generation job {} failed: {}", id, e);
            }
            registry.finish(&id, result).await;
        });
    }

    pub async fn get(&self, id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(id).map(|e| e.status.clone())
    }
}
