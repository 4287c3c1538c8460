use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Explicit provider name. If unset, it is inferred from the model
    /// prefix or falls back to the first provider with an API key.
    #[serde(default)]
    pub provider: Option<String>,
}

fn default_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            provider: None,
        }
    }
}

/// Bounds on a single automation run. The step cap and timeout are the only
/// safety mechanism around the backend; both are always applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Upper bound on primitive browser actions per run.
    #[serde(default = "default_step_cap")]
    pub step_cap: u32,
    /// Wall-clock budget for one run, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retention cap for in-memory session history (oldest evicted first).
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Case-insensitive phrases that mark a backend signal as a login wall.
    #[serde(default = "default_login_indicators")]
    pub login_indicators: Vec<String>,
}

fn default_step_cap() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_history_cap() -> usize {
    50
}

fn default_login_indicators() -> Vec<String> {
    ["log in", "sign in", "login", "authentication required", "password"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            step_cap: default_step_cap(),
            timeout_secs: default_timeout_secs(),
            history_cap: default_history_cap(),
            login_indicators: default_login_indicators(),
        }
    }
}

/// Connection settings for the already-running automation bridge service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_endpoint")]
    pub endpoint: String,
    /// HTTP timeout for non-run bridge calls (state capture, reset).
    #[serde(default = "default_bridge_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_bridge_endpoint() -> String {
    "http://127.0.0.1:7790".to_string()
}

fn default_bridge_http_timeout() -> u64 {
    30
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_bridge_endpoint(),
            http_timeout_secs: default_bridge_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Proxy URL for outbound provider/bridge HTTP. Empty/None follows the
    /// process environment.
    #[serde(default)]
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub agent: AgentDefaults,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert("anthropic".to_string(), ProviderConfig::default());
        providers.insert("openai".to_string(), ProviderConfig::default());
        providers.insert("gemini".to_string(), ProviderConfig::default());
        providers.insert(
            "deepseek".to_string(),
            ProviderConfig {
                api_key: String::new(),
                api_base: Some("https://api.deepseek.com/v1".to_string()),
            },
        );
        providers.insert(
            "ollama".to_string(),
            ProviderConfig {
                api_key: "ollama".to_string(),
                api_base: Some("http://localhost:11434".to_string()),
            },
        );

        Self {
            providers,
            agent: AgentDefaults::default(),
            runner: RunnerConfig::default(),
            bridge: BridgeConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Names of providers that have a usable API key configured.
    pub fn configured_providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .providers
            .iter()
            .filter(|(name, p)| !p.api_key.is_empty() || name.as_str() == "ollama")
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}
