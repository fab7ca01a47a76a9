//! Configuration management for Quotecast
//!
//! Every section is optional; a missing file or section yields the built-in
//! defaults. Durations are written as human-readable strings (`"4h"`,
//! `"90s"`) and only turned into a [`PostingPolicy`] by [`Config::policy`],
//! which also validates it. Secrets are never read from the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::generation::GeminiConfig;
use crate::policy::{DelayRange, HumanDelays, PostingPolicy, RetryBackoff};
use crate::scheduling::parse_duration;
use crate::types::PostingWindow;

pub const ENV_CONFIG: &str = "QUOTECAST_CONFIG";
pub const ENV_PASSWORD: &str = "QUOTECAST_PASSWORD";
pub const ENV_GEMINI_API_KEY: &str = "QUOTECAST_GEMINI_API_KEY";
pub const ENV_USERNAME: &str = "QUOTECAST_USERNAME";
pub const ENV_TRIGGER: &str = "QUOTECAST_TRIGGER";
pub const ENV_OUTPUT: &str = "QUOTECAST_OUTPUT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub policy: PolicyConfig,
    pub platform: PlatformConfig,
    pub generation: GenerationConfig,
    pub render: RenderConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub max_daily_posts: u32,
    pub min_post_interval: String,
    pub max_post_interval: String,
    pub max_retries: u32,
    pub cooldown: String,
    pub posting_windows: Vec<PostingWindow>,
    pub retry_backoff: BackoffConfig,
    pub human_delays: HumanDelaysConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_daily_posts: 3,
            min_post_interval: "4h".to_string(),
            max_post_interval: "8h".to_string(),
            max_retries: 3,
            cooldown: "24h".to_string(),
            posting_windows: PostingPolicy::default().posting_windows,
            retry_backoff: BackoffConfig::default(),
            human_delays: HumanDelaysConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub base: String,
    pub jitter: String,
    pub step: String,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: "2m".to_string(),
            jitter: "1m".to_string(),
            step: "1m".to_string(),
        }
    }
}

/// Each delay is a `[min, max]` pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanDelaysConfig {
    pub pre_login: [String; 2],
    pub post_login: [String; 2],
    pub pre_upload: [String; 2],
}

impl Default for HumanDelaysConfig {
    fn default() -> Self {
        Self {
            pre_login: ["30s".to_string(), "60s".to_string()],
            post_login: ["60s".to_string(), "120s".to_string()],
            pre_upload: ["30s".to_string(), "60s".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub timeout: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            timeout: "60s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub endpoint: String,
    pub timeout: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let defaults = GeminiConfig::default();
        Self {
            model: defaults.model,
            endpoint: defaults.endpoint,
            timeout: "30s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub output_path: String,
    pub font_path: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_path: "quote_post.jpg".to_string(),
            font_path: "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Presence switches the daemon from run-once to scheduled mode
    pub trigger: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file at the resolved location is not an error.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = if config_path.exists() {
            Self::parse_file(&config_path)?
        } else {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path, which must exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Environment values take precedence over the file
    pub fn apply_env_overrides(&mut self) {
        if let Some(username) = non_empty_env(ENV_USERNAME) {
            self.platform.username = Some(username);
        }
        if let Some(trigger) = non_empty_env(ENV_TRIGGER) {
            self.schedule.trigger = Some(trigger);
        }
        if let Some(output) = non_empty_env(ENV_OUTPUT) {
            self.render.output_path = output;
        }
    }

    /// Build and validate the posting policy
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidDuration` for unparseable durations and
    /// `ConfigError::InvalidPolicy` when the values are inconsistent.
    pub fn policy(&self) -> std::result::Result<PostingPolicy, ConfigError> {
        let p = &self.policy;
        let policy = PostingPolicy {
            max_daily_posts: p.max_daily_posts,
            min_post_interval: parse_duration(&p.min_post_interval)?,
            max_post_interval: parse_duration(&p.max_post_interval)?,
            posting_windows: p.posting_windows.clone(),
            max_retries: p.max_retries,
            retry_backoff: RetryBackoff {
                base: parse_duration(&p.retry_backoff.base)?,
                jitter: parse_duration(&p.retry_backoff.jitter)?,
                step: parse_duration(&p.retry_backoff.step)?,
            },
            cooldown: parse_duration(&p.cooldown)?,
            human_delays: HumanDelays {
                pre_login: parse_range(&p.human_delays.pre_login)?,
                post_login: parse_range(&p.human_delays.post_login)?,
                pre_upload: parse_range(&p.human_delays.pre_upload)?,
            },
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn scheduled(&self) -> bool {
        self.schedule.trigger.is_some()
    }

    /// Account handle used for login and the image signature
    pub fn username(&self) -> std::result::Result<&str, ConfigError> {
        self.platform
            .username
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField("platform.username".to_string()))
    }

    pub fn base_url(&self) -> std::result::Result<&str, ConfigError> {
        self.platform
            .base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField("platform.base_url".to_string()))
    }

    pub fn platform_timeout(&self) -> std::result::Result<Duration, ConfigError> {
        parse_duration(&self.platform.timeout)
    }

    pub fn gemini_config(&self) -> std::result::Result<GeminiConfig, ConfigError> {
        Ok(GeminiConfig {
            endpoint: self.generation.endpoint.trim_end_matches('/').to_string(),
            model: self.generation.model.clone(),
            timeout: parse_duration(&self.generation.timeout)?,
            ..GeminiConfig::default()
        })
    }

    pub fn output_path(&self) -> PathBuf {
        expand_path(&self.render.output_path)
    }

    pub fn font_path(&self) -> PathBuf {
        expand_path(&self.render.font_path)
    }
}

fn parse_range(pair: &[String; 2]) -> std::result::Result<DelayRange, ConfigError> {
    Ok(DelayRange::new(parse_duration(&pair[0])?, parse_duration(&pair[1])?))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Platform password from `QUOTECAST_PASSWORD`
pub fn password() -> Option<SecretString> {
    non_empty_env(ENV_PASSWORD).map(SecretString::from)
}

/// Gemini API key from `QUOTECAST_GEMINI_API_KEY`
pub fn gemini_api_key() -> Option<SecretString> {
    non_empty_env(ENV_GEMINI_API_KEY).map(SecretString::from)
}

/// Resolve the configuration file path under the XDG config directory
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG) {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("quotecast").join("config.toml"))
}
