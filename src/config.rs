use std::path::{Path, PathBuf};
use std::time::Duration;

const VOLUME_DIR: &str = "/app/data";
const ARENA_DB_FILE: &str = "fashion_arena_db.json";

#[derive(Clone, Debug)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub nanobanana_api_key: Option<String>,
    pub nanobanana_api_base: String,
    pub fal_key: Option<String>,
    pub fal_storage_base: String,
    pub callback_url: String,
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub arena_db_path: PathBuf,
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();

        let openai_api_key = optional_var("OPENAI_API_KEY");
        let nanobanana_api_key = optional_var("NANOBANANA_API_KEY");
        let fal_key = optional_var("FAL_KEY").or_else(|| optional_var("FAL_API_KEY"));

        let openai_api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let nanobanana_api_base = std::env::var("NANOBANANA_API_BASE")
            .unwrap_or_else(|_| "https://api.nanobananaapi.ai/api/v1/nanobanana".to_string());
        let fal_storage_base = std::env::var("FAL_STORAGE_BASE")
            .unwrap_or_else(|_| "https://rest.alpha.fal.ai".to_string());
        let callback_url = std::env::var("GENERATION_CALLBACK_URL")
            .unwrap_or_else(|_| "https://webhook.site/dummy".to_string());

        let poll_interval = Duration::from_secs(
            std::env::var("GENERATION_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .map_err(|_| "GENERATION_POLL_INTERVAL_SECS must be a whole number of seconds")?,
        );
        let max_polls: u32 = std::env::var("GENERATION_MAX_POLLS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| "GENERATION_MAX_POLLS must be a positive integer")?;
        if max_polls == 0 {
            return Err("GENERATION_MAX_POLLS must be a positive integer".into());
        }

        let arena_db_path = std::env::var("ARENA_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_arena_db_path(Path::new(VOLUME_DIR)));

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or_default();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .unwrap_or(5000);

        Ok(Self {
            openai_api_key,
            openai_api_base,
            nanobanana_api_key,
            nanobanana_api_base,
            fal_key,
            fal_storage_base,
            callback_url,
            poll_interval,
            max_polls,
            arena_db_path,
            cors_origins,
            host,
            port,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Every remote service pointed at one fake server, with instant polling.
    pub fn for_tests(api_base: &str, arena_db_path: PathBuf) -> Self {
        Self {
            openai_api_key: Some("sk-test".to_string()),
            openai_api_base: api_base.to_string(),
            nanobanana_api_key: Some("nb-test".to_string()),
            nanobanana_api_base: api_base.to_string(),
            fal_key: Some("fal-test".to_string()),
            fal_storage_base: api_base.to_string(),
            callback_url: "https://webhook.site/dummy".to_string(),
            poll_interval: Duration::ZERO,
            max_polls: 60,
            arena_db_path,
            cors_origins: Vec::new(),
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }
}

fn optional_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Mounted volume when present, working directory otherwise.
fn default_arena_db_path(volume_dir: &Path) -> PathBuf {
    if volume_dir.is_dir() {
        volume_dir.join(ARENA_DB_FILE)
    } else {
        PathBuf::from(".").join(ARENA_DB_FILE)
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
