use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::chat::llm::ProviderKind;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub memory: MemoryConfig,
    pub providers: ProvidersConfig,
    pub profiles: Vec<ProfileConfig>,
    pub models: Vec<ModelRouteConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of past exchanges replayed into every prompt.
    pub history_limit: usize,
    /// Upper bound for the `limit` accepted by `/api/memory`.
    pub max_history_limit: usize,
    pub search_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
    pub deepseek: ProviderConfig,
}

/// An empty `base_url` falls back to the provider's public endpoint.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

/// A memory namespace shared by one or more model ids.
#[derive(Debug, Deserialize, Clone)]
pub struct ProfileConfig {
    pub name: String,
    #[serde(default = "default_persona")]
    pub persona: String,
    /// Known trigger names, checked in this order.
    #[serde(default)]
    pub triggers: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelRouteConfig {
    /// Model id as sent by clients.
    pub id: String,
    pub profile: String,
    pub provider: ProviderKind,
    /// Model name forwarded upstream. Defaults to `id`.
    #[serde(default)]
    pub upstream_model: Option<String>,
}

const STATIC_TRIGGERS: [&str; 5] = [
    "first_chats_awareness",
    "first_chats_connection",
    "first_chats_general",
    "first_chats_Nadine",
    "relational_subject",
];

fn default_persona() -> String {
    "You are a relational AI agent.".into()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            memory: MemoryConfig::default(),
            providers: ProvidersConfig::default(),
            profiles: default_profiles(),
            models: default_models(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_relay_dir()
            .join("relay.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            max_history_limit: 200,
            search_limit: 50,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: ProviderConfig {
                base_url: ProviderKind::OpenAi.default_base_url().into(),
                api_key: None,
            },
            deepseek: ProviderConfig {
                base_url: ProviderKind::DeepSeek.default_base_url().into(),
                api_key: None,
            },
        }
    }
}

impl ProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::DeepSeek => &self.deepseek,
        }
    }
}

fn default_profiles() -> Vec<ProfileConfig> {
    let static_triggers: Vec<String> = STATIC_TRIGGERS.iter().map(|t| t.to_string()).collect();
    vec![
        ProfileConfig {
            name: "nevan".into(),
            persona: default_persona(),
            triggers: static_triggers.clone(),
        },
        ProfileConfig {
            name: "reon".into(),
            persona: default_persona(),
            triggers: static_triggers,
        },
        ProfileConfig {
            name: "deepseek".into(),
            persona: default_persona(),
            triggers: Vec::new(),
        },
    ]
}

fn default_models() -> Vec<ModelRouteConfig> {
    let route = |id: &str, profile: &str, provider: ProviderKind| ModelRouteConfig {
        id: id.into(),
        profile: profile.into(),
        provider,
        upstream_model: None,
    };
    vec![
        route("chatgpt-4o-latest", "nevan", ProviderKind::OpenAi),
        route("gpt-4o-2024-11-20", "nevan", ProviderKind::OpenAi),
        route("gpt-5.1-chat-latest", "reon", ProviderKind::OpenAi),
        route("deepseek-chat", "deepseek", ProviderKind::DeepSeek),
    ]
}

/// Returns `~/.memory-relay/`
pub fn default_relay_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memory-relay")
}

/// Returns the default config file path: `~/.memory-relay/config.toml`
pub fn default_config_path() -> PathBuf {
    default_relay_dir().join("config.toml")
}

impl RelayConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            RelayConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RELAY_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("RELAY_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("RELAY_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid PORT"),
            }
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.providers.openai.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("DEEPSEEK_API_KEY") {
            self.providers.deepseek.api_key = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RelayConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.memory.history_limit, 20);
        assert!(config.storage.db_path.ends_with("relay.db"));
        assert_eq!(config.profiles.len(), 3);
        assert_eq!(config.profiles[0].triggers.len(), 5);
        assert_eq!(config.models.len(), 4);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"
port = 3000

[storage]
db_path = "/tmp/test.db"

[providers.deepseek]
base_url = "http://localhost:9999/v1"

[[profiles]]
name = "ada"
triggers = ["garden", "first_trip"]

[[models]]
id = "gpt-4o"
profile = "ada"
provider = "openai"
upstream_model = "gpt-4o-2024-11-20"
"#;
        let config: RelayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.providers.deepseek.base_url, "http://localhost:9999/v1");
        // unset provider keeps its default
        assert_eq!(config.providers.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.profiles.len(), 1);
        assert_eq!(config.profiles[0].persona, "You are a relational AI agent.");
        assert_eq!(config.models[0].provider, ProviderKind::OpenAi);
        assert_eq!(
            config.models[0].upstream_model.as_deref(),
            Some("gpt-4o-2024-11-20")
        );
        // defaults still apply for unset sections
        assert_eq!(config.memory.search_limit, 50);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let toml_str = r#"
[[models]]
id = "x"
profile = "p"
provider = "anthropic"
"#;
        assert!(toml::from_str::<RelayConfig>(toml_str).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = RelayConfig::default();
        std::env::set_var("RELAY_DB", "/tmp/override.db");
        std::env::set_var("RELAY_LOG_LEVEL", "trace");
        std::env::set_var("PORT", "9090");
        std::env::set_var("DEEPSEEK_API_KEY", "sk-deep");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.providers.deepseek.api_key.as_deref(), Some("sk-deep"));

        // Clean up
        std::env::remove_var("RELAY_DB");
        std::env::remove_var("RELAY_LOG_LEVEL");
        std::env::remove_var("PORT");
        std::env::remove_var("DEEPSEEK_API_KEY");
    }
}
