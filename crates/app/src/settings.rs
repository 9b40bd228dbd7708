//! Handles settings for the application.
//!
//! Configuration is read from `settings.toml` (optional) and then from
//! `FLOWDISTRIBUTOR__<SECTION>__<KEY>` environment variables, which win.
//! See `settings.toml` at the repository root for an example.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    /// Path of the SQLite file. Ignored when `memory` is set.
    pub sqlite: Option<String>,
    #[serde(default)]
    pub memory: bool,
}

impl Database {
    pub fn url(&self) -> String {
        if self.memory {
            return String::from("sqlite::memory:");
        }
        let path = self.sqlite.as_deref().unwrap_or("flowdistributor.db");
        format!("sqlite:{path}?mode=rwc")
    }
}

#[derive(Debug, Deserialize)]
pub struct EngineSettings {
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl EngineSettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub engine: EngineSettings,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("database.memory", false)?
            .set_default("engine.max_attempts", 5)?
            .set_default("engine.retry_backoff_ms", 20)?
            .add_source(File::with_name(path.unwrap_or("settings")).required(path.is_some()))
            .add_source(
                Environment::with_prefix("FLOWDISTRIBUTOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
