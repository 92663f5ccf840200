//! Workspace settings.
//!
//! Settings are read from `.hwy/settings.json` in the workspace, then
//! overridden by environment variables. Command flags are applied last by
//! each command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use hwy_chat::{GenerationParams, OllamaConfig};
use hwy_docs::{GeminiConfig, TrackerConfig};
use hwy_reports::{ReportError, ReportsConfig, ENV_BASE_URL};

const ENV_OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
const ENV_MODEL: &str = "HWY_MODEL";
const ENV_TEMPERATURE: &str = "HWY_TEMPERATURE";
const ENV_MAX_TOKENS: &str = "HWY_MAX_TOKENS";
const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
const ENV_MAX_FILE_SIZE_MB: &str = "HWY_MAX_FILE_SIZE_MB";
const ENV_REPORTS_BASE_URL: &str = ENV_BASE_URL;

/// User-adjustable settings; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_size_mb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_base_url: Option<String>,
}

impl Settings {
    /// Location of the settings file inside a workspace
    pub fn path(workspace: &Path) -> PathBuf {
        workspace.join(".hwy").join("settings.json")
    }

    /// Load the settings file, or defaults if there is none.
    pub fn load(workspace: &Path) -> Result<Self> {
        let path = Self::path(workspace);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Load the settings file and apply environment overrides.
    pub fn resolve(workspace: &Path) -> Result<Self> {
        Self::load(workspace)?.overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var(ENV_OLLAMA_BASE_URL) {
            self.ollama_base_url = Some(url);
        }
        if let Some(model) = var(ENV_MODEL) {
            self.default_model = Some(model);
        }
        if let Some(value) = var(ENV_TEMPERATURE) {
            self.temperature = Some(
                value
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a number, got '{}'", ENV_TEMPERATURE, value))?,
            );
        }
        if let Some(value) = var(ENV_MAX_TOKENS) {
            self.max_tokens = Some(
                value
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a positive integer, got '{}'", ENV_MAX_TOKENS, value))?,
            );
        }
        if let Some(model) = var(ENV_GEMINI_MODEL) {
            self.gemini_model = Some(model);
        }
        if let Some(value) = var(ENV_MAX_FILE_SIZE_MB) {
            self.max_file_size_mb = Some(
                value
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a positive integer, got '{}'", ENV_MAX_FILE_SIZE_MB, value))?,
            );
        }
        if let Some(url) = var(ENV_REPORTS_BASE_URL) {
            self.reports_base_url = Some(url);
        }
        Ok(self)
    }

    pub fn ollama_config(&self) -> OllamaConfig {
        let config = match &self.ollama_base_url {
            Some(url) => OllamaConfig::new(url.clone()),
            None => OllamaConfig::default(),
        };
        config.default_params(self.generation_params())
    }

    pub fn generation_params(&self) -> GenerationParams {
        let defaults = GenerationParams::default();
        GenerationParams::new(
            self.temperature.unwrap_or(defaults.temperature),
            self.max_tokens.unwrap_or(defaults.max_length),
        )
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        let config = TrackerConfig::default();
        match self.max_file_size_mb {
            Some(mb) => config.max_file_size(mb * 1024 * 1024),
            None => config,
        }
    }

    /// Gemini settings; the API key always comes from `GEMINI_API_KEY`.
    pub fn gemini_config(&self) -> Result<GeminiConfig> {
        let config = GeminiConfig::from_env()?;
        Ok(match &self.gemini_model {
            Some(model) => config.model(model.clone()),
            None => config,
        })
    }

    pub fn reports_config(&self) -> Result<ReportsConfig> {
        match self.reports_base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(ReportsConfig::new(url)),
            _ => Err(ReportError::NotConfigured(format!(
                "set {} or reportsBaseUrl in the settings file",
                ENV_REPORTS_BASE_URL
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.generation_params(), GenerationParams::default());
        assert_eq!(settings.ollama_config().base_url, "http://localhost:11434");
    }

    #[test]
    fn test_load_camel_case_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".hwy")).unwrap();
        std::fs::write(
            Settings::path(dir.path()),
            r#"{"ollamaBaseUrl":"http://gpu-box:11434","defaultModel":"mistral:7b","temperature":0.2,"maxTokens":512,"maxFileSizeMb":10}"#,
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.default_model.as_deref(), Some("mistral:7b"));
        assert_eq!(settings.ollama_config().base_url, "http://gpu-box:11434");
        assert_eq!(settings.generation_params(), GenerationParams::new(0.2, 512));
        assert_eq!(settings.tracker_config().max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".hwy")).unwrap();
        std::fs::write(Settings::path(dir.path()), "{ not json").unwrap();

        let err = Settings::load(dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid settings file"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = Settings {
            default_model: Some("llama2:7b".to_string()),
            temperature: Some(0.9),
            ..Settings::default()
        };

        let settings = file
            .overlay(env(&[
                ("HWY_MODEL", "codellama:13b"),
                ("HWY_TEMPERATURE", "0.1"),
                ("GEMINI_MODEL", "  "),
            ]))
            .unwrap();

        assert_eq!(settings.default_model.as_deref(), Some("codellama:13b"));
        assert_eq!(settings.temperature, Some(0.1));
        assert!(settings.gemini_model.is_none());
    }

    #[test]
    fn test_reports_url_from_file_or_environment() {
        assert!(Settings::default().reports_config().is_err());

        let file = Settings {
            reports_base_url: Some("http://reports.local:8000/".to_string()),
            ..Settings::default()
        };
        assert_eq!(file.reports_config().unwrap().base_url, "http://reports.local:8000");

        let settings = file
            .overlay(env(&[("MPR_API_BASE_URL", "http://mpr.internal")]))
            .unwrap();
        assert_eq!(settings.reports_config().unwrap().base_url, "http://mpr.internal");
    }

    #[test]
    fn test_bad_environment_value() {
        let err = Settings::default()
            .overlay(env(&[("HWY_MAX_TOKENS", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("HWY_MAX_TOKENS"));
    }
}
