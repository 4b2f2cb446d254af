//! Configuration for study-quiz.

use directories::ProjectDirs;
use quiz_engine::http::{ClientConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides `[api] base_url`.
pub const API_URL_ENV: &str = "STUDY_QUIZ_API_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub lists: ListsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load the config file, falling back to defaults when it is missing or
    /// unreadable, then apply environment overrides.
    pub fn load() -> Self {
        let mut config: Self = Self::config_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default();
        config.apply_env(std::env::var(API_URL_ENV).ok());
        config
    }

    fn apply_env(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "study-quiz").map(|d| d.config_dir().join("config.toml"))
    }

    /// Where the log file goes. Relative paths land in the data dir.
    pub fn log_path(&self) -> PathBuf {
        let file = PathBuf::from(&self.logging.file);
        if file.is_absolute() {
            return file;
        }
        ProjectDirs::from("", "", "study-quiz")
            .map(|d| d.data_dir().join(&file))
            .unwrap_or(file)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.lists.search_debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { DEFAULT_BASE_URL.to_string() }
fn default_timeout() -> u64 { 15 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListsConfig {
    #[serde(default = "default_debounce")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_quizzes_per_page")]
    pub quizzes_per_page: u32,
    #[serde(default = "default_attempts_per_page")]
    pub attempts_per_page: u32,
    #[serde(default = "default_materials_per_page")]
    pub materials_per_page: u32,
}

fn default_debounce() -> u64 { 500 }
fn default_quizzes_per_page() -> u32 { 8 }
fn default_attempts_per_page() -> u32 { 5 }
fn default_materials_per_page() -> u32 { 10 }

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: default_debounce(),
            quizzes_per_page: default_quizzes_per_page(),
            attempts_per_page: default_attempts_per_page(),
            materials_per_page: default_materials_per_page(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_level() -> String { "info".to_string() }
fn default_log_file() -> String { "study-quiz.log".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: default_log_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://quiz.example.com/api"

            [lists]
            quizzes_per_page = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://quiz.example.com/api");
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.lists.quizzes_per_page, 12);
        assert_eq!(config.lists.attempts_per_page, 5);
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env(Some("  ".to_string()));
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);

        config.apply_env(Some("http://10.0.0.2:5000/api".to_string()));
        assert_eq!(config.client_config().base_url, "http://10.0.0.2:5000/api");
    }

    #[test]
    fn test_absolute_log_path_kept() {
        let mut config = Config::default();
        config.logging.file = "/tmp/quiz.log".to_string();
        assert_eq!(config.log_path(), PathBuf::from("/tmp/quiz.log"));
    }
}
