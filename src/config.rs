use crate::error::{RelayError, Result};
use crate::providers::{ProviderPreset, DEFAULT_PROVIDER};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_header: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Total time budgets for upstream calls, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_chat_secs")]
    pub chat_secs: u64,
    #[serde(default = "default_models_secs")]
    pub models_secs: u64,
}

/// Static model catalog served when the upstream model listing is unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_fallback_models")]
    pub models: Vec<String>,
    /// Owner label for the catalog entries. Defaults to the provider preset's owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
    #[serde(default = "default_created")]
    pub created: i64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7860
}

fn default_provider_name() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_user_agent() -> String {
    format!("chat-relay/{}", env!("CARGO_PKG_VERSION"))
}

fn default_chat_secs() -> u64 {
    200
}

fn default_models_secs() -> u64 {
    10
}

fn default_fallback_models() -> Vec<String> {
    [
        "grok-3-beta",
        "grok-3-mini-beta",
        "grok-3-fast-beta",
        "grok-3-mini-fast-beta",
        "grok-4-0709",
        "grok-4-fast-non-reasoning",
        "grok-4-fast-reasoning",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_created() -> i64 {
    1_744_681_729
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            provider: ProviderConfig::default(),
            timeouts: TimeoutConfig::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: None,
            credential_header: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            chat_secs: default_chat_secs(),
            models_secs: default_models_secs(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            models: default_fallback_models(),
            owned_by: None,
            created: default_created(),
        }
    }
}

impl TimeoutConfig {
    pub fn chat(&self) -> Duration {
        Duration::from_secs(self.chat_secs)
    }

    pub fn models(&self) -> Duration {
        Duration::from_secs(self.models_secs)
    }
}

impl RelayConfig {
    /// Load config from a TOML file. Missing sections take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir > built-in defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(&candidate);
            }
        }

        tracing::info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    fn preset(&self) -> Option<&'static ProviderPreset> {
        ProviderPreset::from_name(&self.provider.name)
    }

    /// Resolve the effective base URL (config override or provider preset default).
    /// The returned value never ends with a slash.
    pub fn effective_base_url(&self) -> Result<String> {
        if let Some(ref url) = self.provider.base_url {
            return Ok(url.trim_end_matches('/').to_string());
        }

        let preset = self
            .preset()
            .ok_or_else(|| unknown_provider(&self.provider.name))?;

        Ok(preset.base_url.to_string())
    }

    /// Name of the inbound header carrying the caller's upstream credential.
    pub fn credential_header(&self) -> String {
        if let Some(ref header) = self.provider.credential_header {
            return header.clone();
        }

        self.preset()
            .map(|p| p.credential_header.to_string())
            .unwrap_or_else(|| "X-API-Key".to_string())
    }

    /// Owner label for fallback catalog entries: config override, then the preset's
    /// owner, then the provider name as given.
    pub fn fallback_owner(&self) -> String {
        if let Some(ref owner) = self.fallback.owned_by {
            return owner.clone();
        }

        self.preset()
            .map(|p| p.owned_by.to_string())
            .unwrap_or_else(|| self.provider.name.clone())
    }

    pub fn chat_completions_url(&self) -> Result<String> {
        Ok(format!("{}/chat/completions", self.effective_base_url()?))
    }

    pub fn models_url(&self) -> Result<String> {
        Ok(format!("{}/models", self.effective_base_url()?))
    }
}

fn unknown_provider(name: &str) -> RelayError {
    let known = ProviderPreset::all()
        .iter()
        .map(|p| p.name)
        .collect::<Vec<_>>()
        .join(", ");
    RelayError::config(format!(
        "Unknown provider '{}' and no base_url configured. Known providers: {}",
        name, known
    ))
}

/// Candidate config file locations, in search order.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("chat-relay.toml"));

    if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("chat-relay")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("chat-relay").join("config.toml"));
        }
        if let Some(home) = home_dir() {
            paths.push(home.join(".config").join("chat-relay").join("config.toml"));
        }
    }

    if let Some(home) = home_dir() {
        paths.push(home.join(".chat-relay.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
