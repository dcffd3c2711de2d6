use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::AppError;

/// What one status poll told us about the remote task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollObservation {
    Pending,
    Ready(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Polling { attempts: u32 },
    Succeeded { image_url: String },
    Failed { reason: String },
    TimedOut { attempts: u32 },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded { .. } | JobState::Failed { .. } | JobState::TimedOut { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}

/// `submitted -> polling -> succeeded | failed | timed_out`
#[derive(Debug, Clone)]
pub struct GenerationJob {
    task_id: String,
    max_attempts: u32,
    state: JobState,
}

impl GenerationJob {
    pub fn new(task_id: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            task_id: task_id.into(),
            max_attempts,
            state: JobState::Submitted,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Applies the result of one poll. Terminal states absorb further
    /// observations.
    pub fn observe(&mut self, observation: PollObservation) -> &JobState {
        if self.state.is_terminal() {
            return &self.state;
        }

        let attempts = match self.state {
            JobState::Polling { attempts } => attempts + 1,
            _ => 1,
        };

        self.state = match observation {
            PollObservation::Ready(image_url) => JobState::Succeeded { image_url },
            PollObservation::Failed(reason) => JobState::Failed { reason },
            PollObservation::Pending if attempts >= self.max_attempts => {
                JobState::TimedOut { attempts }
            }
            PollObservation::Pending => JobState::Polling { attempts },
        };
        &self.state
    }
}

/// Anything that can report the status of a remote generation task.
pub trait TaskStatusSource {
    fn poll(
        &self,
        task_id: &str,
    ) -> impl Future<Output = Result<PollObservation, AppError>> + Send;
}

/// Drives `job` to a terminal state, sleeping `policy.interval` before
/// each poll. Poll errors count as an attempt and polling continues.
pub async fn run_to_completion<S: TaskStatusSource>(
    source: &S,
    job: &mut GenerationJob,
    policy: PollPolicy,
) -> Result<String, AppError> {
    let task_id = job.task_id().to_string();

    loop {
        tokio::time::sleep(policy.interval).await;

        let observation = match source.poll(&task_id).await {
            Ok(observation) => observation,
            Err(e) => {
                warn!("Status check for task {} failed: {}", task_id, e);
                PollObservation::Pending
            }
        };

        match job.observe(observation) {
            JobState::Succeeded { image_url } => {
                info!("Task {} succeeded: {}", task_id, image_url);
                return Ok(image_url.clone());
            }
            JobState::Failed { reason } => {
                return Err(AppError::Request(format!("Task failed: {}", reason)));
            }
            JobState::TimedOut { attempts } => {
                return Err(AppError::Timeout(format!(
                    "Task timeout - image generation took too long ({} polls)",
                    attempts
                )));
            }
            JobState::Polling { attempts } => {
                info!("Task {} still running (attempt {})", task_id, attempts);
            }
            JobState::Submitted => {}
        }
    }
}
