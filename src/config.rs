use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_turns() -> u32 {
    10
}

fn default_turn_timeout_secs() -> u64 {
    120
}

fn default_tool_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

/// Persistent settings, stored as JSON under the user config directory.
/// Missing fields fall back to defaults so old files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: String::new(),
            max_turns: default_max_turns(),
            turn_timeout_secs: default_turn_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let settings: Settings = serde_json::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// API key resolution: environment variable wins over the config file.
    pub fn resolve_api_key(&self) -> String {
        env::var("TASKFORGE_API_KEY").unwrap_or_else(|_| self.api_key.clone())
    }

    fn config_path() -> PathBuf {
        if cfg!(test) || env::var("TASKFORGE_TEST_MODE").is_ok() {
            PathBuf::from("/tmp/taskforge_test_config.json")
        } else {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("taskforge")
                .join("config.json")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.max_turns, 10);
        assert_eq!(settings.turn_timeout_secs, 120);
        assert_eq!(settings.tool_timeout_secs, 60);
        assert!(settings.base_url.contains("api.openai.com"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"model": "gpt-4o-mini", "api_key": "k"}"#).unwrap();
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.api_key, "k");
        assert_eq!(settings.max_turns, 10);
        assert_eq!(settings.max_tokens, 4096);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut settings = Settings::default();
        settings.model = "test-model".to_string();
        settings.max_turns = 3;

        let serialized = serde_json::to_string(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&serialized).unwrap();
        assert_eq!(loaded.model, "test-model");
        assert_eq!(loaded.max_turns, 3);
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let mut settings = Settings::default();
        settings.model = "saved-model".to_string();
        settings.save()?;

        let loaded = Settings::load()?;
        assert_eq!(loaded.model, "saved-model");

        let _ = fs::remove_file("/tmp/taskforge_test_config.json");
        Ok(())
    }
}
