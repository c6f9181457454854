use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::client::{ChatOptions, DEFAULT_BASE_URL};
use crate::{debounce, reveal};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub debounce: bool,
    pub debounce_ms: u64,
    /// Send the whole transcript with each question instead of just the question.
    pub send_history: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub reveal_chunk: usize,
    pub reveal_tick_ms: u64,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            debounce: false,
            debounce_ms: debounce::DEFAULT_DELAY.as_millis() as u64,
            send_history: false,
            temperature: None,
            max_tokens: None,
            reveal_chunk: reveal::DEFAULT_CHUNK,
            reveal_tick_ms: reveal::DEFAULT_TICK.as_millis() as u64,
            log_level: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_base_url(url: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.base_url = url.to_string();
        config.save()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ragchat").join("config.json"))
    }

    pub fn debounce_delay(&self) -> Option<Duration> {
        self.debounce.then(|| Duration::from_millis(self.debounce_ms))
    }

    pub fn reveal_tick(&self) -> Duration {
        Duration::from_millis(self.reveal_tick_ms.max(1))
    }

    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.reveal_chunk, 3);
        assert_eq!(config.reveal_tick(), Duration::from_millis(10));
        assert_eq!(config.debounce_delay(), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            base_url: "http://rag.internal:9000".to_string(),
            debounce: true,
            temperature: Some(0.2),
            ..Config::new()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.debounce_delay(), Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"send_history": true}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.send_history);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.debounce_ms, 300);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
