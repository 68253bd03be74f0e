use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AgentError, Result};

/// Top-level configuration for the voice agent.
///
/// Loaded from `~/.ezcaters/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AgentConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AgentError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Speech capture settings passed to the recognition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Whether voice capture is offered at all.
    pub enabled: bool,
    /// BCP 47 recognition language.
    pub language: String,
    /// Keep listening after the first final result.
    pub continuous: bool,
    /// Ask the engine for provisional results.
    pub interim_results: bool,
    pub max_alternatives: u32,
    /// Hard deadline for the first result of a capture attempt.
    pub timeout_secs: u64,
}

impl CaptureConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "en-US".to_string(),
            continuous: false,
            interim_results: true,
            max_alternatives: 1,
            timeout_secs: 10,
        }
    }
}

/// Conversation and search backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL hosting `/webhook` and `/search`.
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Artificial delay before each conversation call. 0 disables it.
    pub simulated_latency_ms: u64,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 10,
            simulated_latency_ms: 1500,
        }
    }
}

/// Text-to-speech settings for spoken replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 0.8,
            pitch: 1.0,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.general.log_level, "info");

        assert!(config.capture.enabled);
        assert_eq!(config.capture.language, "en-US");
        assert!(!config.capture.continuous);
        assert!(config.capture.interim_results);
        assert_eq!(config.capture.max_alternatives, 1);
        assert_eq!(config.capture.deadline(), Duration::from_secs(10));

        assert_eq!(config.backend.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.backend.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.backend.simulated_latency(), Duration::from_millis(1500));

        assert!(config.speech.enabled);
        assert!((config.speech.rate - 0.8).abs() < f32::EPSILON);
        assert!((config.speech.pitch - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(
            r#"
[general]
log_level = "debug"

[capture]
language = "en-GB"
timeout_secs = 5

[backend]
base_url = "http://agent.local:8080"
simulated_latency_ms = 0

[speech]
enabled = false
"#,
        );

        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.capture.language, "en-GB");
        assert_eq!(config.capture.deadline(), Duration::from_secs(5));
        assert_eq!(config.backend.base_url, "http://agent.local:8080");
        assert!(config.backend.simulated_latency().is_zero());
        assert!(!config.speech.enabled);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[capture]\ncontinuous = true\n");
        let config = AgentConfig::load(file.path()).unwrap();
        assert!(config.capture.continuous);
        assert_eq!(config.capture.timeout_secs, 10);
        assert_eq!(config.backend.request_timeout_secs, 10);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AgentConfig::load_or_default(Path::new("/does/not/exist/config.toml"));
        assert_eq!(config.capture.timeout_secs, 10);
        assert_eq!(config.backend.simulated_latency_ms, 1500);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is not [valid toml");
        let result = AgentConfig::load(file.path());
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AgentConfig::default();
        config.capture.timeout_secs = 3;
        config.backend.base_url = "http://localhost:9999".to_string();
        config.save(&path).unwrap();

        let loaded = AgentConfig::load(&path).unwrap();
        assert_eq!(loaded.capture.timeout_secs, 3);
        assert_eq!(loaded.backend.base_url, "http://localhost:9999");
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.capture.language, "en-US");
        assert!(config.speech.enabled);
    }
}
