use std::path::PathBuf;

use super::models::ArenaDb;
use crate::error::AppError;

/// Load/save contract for the arena document. Every mutation is a full
/// load followed by a full save.
pub trait ArenaStorage: Send + Sync {
    fn load(&self) -> Result<ArenaDb, AppError>;
    fn save(&self, db: &ArenaDb) -> Result<(), AppError>;
}

pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn ensure_dir(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

impl ArenaStorage for JsonFileStorage {
    fn load(&self) -> Result<ArenaDb, AppError> {
        if !self.path.exists() {
            let empty = ArenaDb::default();
            self.save(&empty)?;
            return Ok(empty);
        }

        let raw = std::fs::read(&self.path)?;
        serde_json::from_slice(&raw)
            .map_err(|e| AppError::Storage(format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, db: &ArenaDb) -> Result<(), AppError> {
        let body = serde_json::to_vec_pretty(db).map_err(|e| AppError::Storage(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
pub struct MemoryStorage {
    db: std::sync::Mutex<ArenaDb>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            db: std::sync::Mutex::new(ArenaDb::default()),
        }
    }
}

#[cfg(test)]
impl ArenaStorage for MemoryStorage {
    fn load(&self) -> Result<ArenaDb, AppError> {
        Ok(self.db.lock().unwrap().clone())
    }

    fn save(&self, db: &ArenaDb) -> Result<(), AppError> {
        *self.db.lock().unwrap() = db.clone();
        Ok(())
    }
}
