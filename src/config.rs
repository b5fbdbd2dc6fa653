// config.rs - Bot configuration
// Two sources: botconfig.txt (credentials, KEY=VALUE) and config/config.json
// (runtime settings). The JSON document is owned by a ConfigStore which is the
// only writer of the file and keeps a timestamped backup of every previous version.

use chrono::Local;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};

use crate::error::ConfigError;

pub const MIN_RELATED_ITEMS: u32 = 1;
pub const MAX_RELATED_ITEMS: u32 = 10;

// ============================================================================
// config.json
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    pub commands: CommandsConfig,
    pub ai: AiConfig,
    pub wordpress: WordPressConfig,
    pub youtube: YouTubeConfig,
    pub discord: DiscordConfig,
    pub thread_archive_duration: u16,
    pub bot: ProcessConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            commands: CommandsConfig::default(),
            ai: AiConfig::default(),
            wordpress: WordPressConfig::default(),
            youtube: YouTubeConfig::default(),
            discord: DiscordConfig::default(),
            thread_archive_duration: 60,
            bot: ProcessConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CommandsConfig {
    pub topic: LengthLimits,
    pub draft: DraftCommandConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LengthLimits {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for LengthLimits {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DraftCommandConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub related_content: RelatedContentCaps,
}

impl Default for DraftCommandConfig {
    fn default() -> Self {
        Self {
            min_length: 10,
            max_length: 2000,
            related_content: RelatedContentCaps::default(),
        }
    }
}

impl DraftCommandConfig {
    pub fn limits(&self) -> LengthLimits {
        LengthLimits {
            min_length: self.min_length,
            max_length: self.max_length,
        }
    }
}

/// How many related articles and videos are spliced into a generated draft.
/// Both values live in 1..=10.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelatedContentCaps {
    pub max_articles: u32,
    pub max_videos: u32,
}

impl Default for RelatedContentCaps {
    fn default() -> Self {
        Self {
            max_articles: 5,
            max_videos: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiConfig {
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub token_limits: HashMap<String, usize>,
}

impl Default for AiConfig {
    fn default() -> Self {
        let token_limits = [("gpt-3.5-turbo", 4096), ("gpt-4", 8192), ("gpt-4-32k", 32768)]
            .into_iter()
            .map(|(model, limit)| (model.to_string(), limit))
            .collect();
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            timeout_secs: 120,
            token_limits,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WordPressConfig {
    pub domain: String,
    pub results_per_page: u32,
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            results_per_page: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct YouTubeConfig {
    pub channel_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscordConfig {
    pub message_limit: usize,
    pub thread_title_limit: usize,
    pub max_results_per_embed: usize,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            message_limit: 2000,
            thread_title_limit: 100,
            max_results_per_embed: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessConfig {
    pub shutdown_timeout: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self { shutdown_timeout: 30 }
    }
}

// ============================================================================
// ConfigStore
// ============================================================================

/// Owner of config/config.json. Readers get a snapshot of whatever is current;
/// writers are serialized and every write is preceded by a backup copy.
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<BotConfig>,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: BotConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!("[CONFIG] Loaded configuration from {}", path.display());
        Ok(Self {
            path,
            current: RwLock::new(config),
            write_lock: Mutex::new(()),
        })
    }

    pub async fn read(&self) -> BotConfig {
        self.current.read().await.clone()
    }

    pub async fn related_caps(&self) -> RelatedContentCaps {
        self.current.read().await.commands.draft.related_content
    }

    /// Apply `change` to the current configuration and persist it.
    /// The file on disk is copied to a timestamped backup first; if that copy
    /// fails nothing is written.
    pub async fn update<F>(&self, change: F) -> Result<BotConfig, ConfigError>
    where
        F: FnOnce(&mut BotConfig),
    {
        let _guard = self.write_lock.lock().await;

        let mut next = self.current.read().await.clone();
        change(&mut next);

        let backup = self.backup_path();
        tokio::fs::copy(&self.path, &backup)
            .await
            .map_err(ConfigError::Backup)?;
        info!("[CONFIG] Backup created: {}", backup.display());

        let json = serde_json::to_string_pretty(&next).map_err(ConfigError::Serialize)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(ConfigError::Write)?;

        *self.current.write().await = next.clone();
        Ok(next)
    }

    fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config".to_string());
        let timestamp = Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        let mut candidate = self
            .path
            .with_file_name(format!("{}_backup_{}.json", stem, timestamp));
        let mut n = 1;
        // Two writes in the same millisecond must not share a backup.
        while candidate.exists() {
            candidate = self
                .path
                .with_file_name(format!("{}_backup_{}_{}.json", stem, timestamp, n));
            n += 1;
        }
        candidate
    }
}

// ============================================================================
// botconfig.txt
// ============================================================================

/// Secrets and endpoints read from botconfig.txt.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub discord_token: String,
    pub prefix: String,
    pub ai_api_key: String,
    pub ai_base_url: String,
    pub wp_api_url: Option<String>,
    pub wp_username: Option<String>,
    pub wp_app_password: Option<String>,
    pub youtube_api_key: Option<String>,
}

impl Credentials {
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| map.get(key).filter(|v| !v.is_empty()).cloned();

        let discord_token = get("DISCORD_TOKEN")
            .ok_or_else(|| ConfigError::Missing("DISCORD_TOKEN not found in botconfig.txt".to_string()))?;
        if discord_token == "YOUR_BOT_TOKEN_HERE" {
            return Err(ConfigError::Missing(
                "DISCORD_TOKEN in botconfig.txt is set to the placeholder value".to_string(),
            ));
        }
        let ai_api_key = get("AI_API_KEY")
            .ok_or_else(|| ConfigError::Missing("AI_API_KEY not found in botconfig.txt".to_string()))?;

        Ok(Self {
            discord_token,
            prefix: get("PREFIX").unwrap_or_else(|| "!".to_string()),
            ai_api_key,
            ai_base_url: get("AI_BASE_URL").unwrap_or_else(|| "https://api.openai.com".to_string()),
            wp_api_url: get("WP_API_URL"),
            wp_username: get("WP_USERNAME"),
            wp_app_password: get("WP_APP_PASSWORD"),
            youtube_api_key: get("YOUTUBE_API_KEY"),
        })
    }
}

/// Parse KEY=VALUE lines, skipping blanks and `#` comments. A leading BOM is ignored.
pub fn parse_key_values(content: &str) -> HashMap<String, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut config = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(equals_pos) = line.find('=') {
            let key = line[..equals_pos].trim().to_string();
            let value = line[equals_pos + 1..].trim().to_string();
            config.insert(key, value);
        }
    }

    config
}

/// Read botconfig.txt from the first location that has one.
pub fn load_bot_config() -> Result<Credentials, ConfigError> {
    let config_paths = [
        "botconfig.txt",
        "../botconfig.txt",
        "../../botconfig.txt",
        "src/botconfig.txt",
    ];

    for config_path in &config_paths {
        match fs::read_to_string(config_path) {
            Ok(content) => {
                info!("[CONFIG] Credentials loaded from {}", config_path);
                return Credentials::from_map(&parse_key_values(&content));
            }
            Err(_) => continue,
        }
    }

    warn!("[CONFIG] botconfig.txt not found in any expected location");
    Err(ConfigError::Missing(
        "No botconfig.txt file found in any expected location (., .., ../.., src/)".to_string(),
    ))
}
