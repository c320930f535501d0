use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

pub const DB_PATH_ENV: &str = "BOOKER_DB_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub database_path: PathBuf,
    pub log_level: String,
    pub mirror_clustered_events: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("booker.sqlite3"),
            log_level: "info".into(),
            mirror_clustered_events: true,
        }
    }
}

impl PipelineSettings {
    /// Read settings from `path` when given, then apply `BOOKER_DB_PATH`.
    /// Keys missing from the file keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(std::env::var(DB_PATH_ENV).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    fn apply_env(&mut self, db_path: Option<String>) {
        if let Some(value) = db_path.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            self.database_path = PathBuf::from(value);
        }
    }
}
