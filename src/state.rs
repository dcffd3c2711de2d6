use crate::agents::OpenAiAgent;
use crate::arena::{ArenaStore, JsonFileStorage};
use crate::config::Config;
use crate::error::AppError;
use crate::generation::JobRegistry;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub type Arena = Arc<Mutex<ArenaStore<JsonFileStorage>>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: Client,
    pub arena: Arena,
    pub jobs: JobRegistry,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let storage = JsonFileStorage::new(&config.arena_db_path);
        storage.ensure_dir()?;

        Ok(Self {
            config,
            http,
            arena: Arc::new(Mutex::new(ArenaStore::new(storage))),
            jobs: JobRegistry::default(),
        })
    }

    /// Runs `op` against the arena on the blocking pool, since every store
    /// call reads and rewrites the JSON file.
    pub async fn with_arena<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&ArenaStore<JsonFileStorage>) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let arena = self.arena.clone();
        tokio::task::spawn_blocking(move || op(&*arena.blocking_lock()))
            .await
            .map_err(|e| AppError::Storage(format!("Arena task failed: {}", e)))?
    }

    pub fn openai_agent(&self) -> Result<OpenAiAgent, AppError> {
        let api_key = self
            .config
            .openai_api_key
            .clone()
            .ok_or_else(|| AppError::Configuration("OPENAI_API_KEY not configured".to_string()))?;

        Ok(OpenAiAgent::new(
            self.http.clone(),
            api_key,
            self.config.openai_api_base.clone(),
        ))
    }
}
