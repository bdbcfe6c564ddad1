//! Optional TOML configuration and credential resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::enrichment::gemini::{GeminiSettings, DEFAULT_API_BASE_URL, DEFAULT_MODEL};

const CONFIG_DIR_NAME: &str = "ai-music-tagger";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Root configuration read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    /// Inference service settings.
    pub inference: InferenceConfig,
}

/// Settings for the text-generation service.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Overall per-request timeout; unset keeps the transport defaults.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base_url: default_api_base_url(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: None,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unable to get api key: environment variable {0} is not set")]
    MissingApiKey(String),
}

/// Location of the per-user config file, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads `explicit_path`, or the per-user config file when it exists.
///
/// An explicitly requested file must be readable. Without one, a missing
/// per-user file means defaults.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit_path {
        return read_config_file(path);
    }

    match default_config_path() {
        Some(path) if path.is_file() => {
            debug!("Loading config from {}", path.display());
            read_config_file(&path)
        }
        _ => Ok(Config::default()),
    }
}

impl InferenceConfig {
    /// Looks up the API key through `lookup`, usually the process environment.
    pub fn resolve_api_key<F>(&self, lookup: F) -> Result<String, ConfigError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        lookup(&self.api_key_env)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(self.api_key_env.clone()))
    }

    pub fn gemini_settings(&self, api_key: String) -> GeminiSettings {
        GeminiSettings {
            api_key,
            model: self.model.clone(),
            api_base_url: self.api_base_url.clone(),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{load_config, Config, ConfigError, InferenceConfig};
    use std::fs;
    use std::time::Duration;

    #[test]
    fn test_default_config_targets_gemini_flash() {
        let config = Config::default();
        assert_eq!(config.inference.model, "gemini-2.0-flash");
        assert_eq!(
            config.inference.api_base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(config.inference.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.inference.request_timeout_secs, None);
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("temp dir should be creatable");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[inference]
model = "gemini-2.5-flash"
request_timeout_secs = 30
"#,
        )
        .expect("config should be writable");

        let config = load_config(Some(&path)).expect("config should load");
        assert_eq!(config.inference.model, "gemini-2.5-flash");
        assert_eq!(config.inference.request_timeout_secs, Some(30));
        assert_eq!(config.inference.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().expect("temp dir should be creatable");
        let path = dir.path().join("missing.toml");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_invalid_config_file_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir should be creatable");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[inference]\nmodel = 12\n").expect("config should be writable");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_resolve_api_key_reads_configured_variable() {
        let config = InferenceConfig {
            api_key_env: "TAGGER_KEY".to_string(),
            ..InferenceConfig::default()
        };
        let key = config
            .resolve_api_key(|name| (name == "TAGGER_KEY").then(|| " secret \n".to_string()))
            .expect("key should resolve");
        assert_eq!(key, "secret");
    }

    #[test]
    fn test_resolve_api_key_rejects_missing_or_blank_key() {
        let config = InferenceConfig::default();
        assert!(matches!(
            config.resolve_api_key(|_| None),
            Err(ConfigError::MissingApiKey(name)) if name == "GEMINI_API_KEY"
        ));
        assert!(matches!(
            config.resolve_api_key(|_| Some("   ".to_string())),
            Err(ConfigError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_gemini_settings_carries_timeout() {
        let config = InferenceConfig {
            request_timeout_secs: Some(12),
            ..InferenceConfig::default()
        };
        let settings = config.gemini_settings("key".to_string());
        assert_eq!(settings.api_key, "key");
        assert_eq!(settings.model, "gemini-2.0-flash");
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(12)));
    }
}
