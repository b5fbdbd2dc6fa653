// prompts.rs - Prompt templates loaded from config/prompts.json
// The file can be edited while the bot runs; generation reloads it every time.

use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::error::ConfigError;

pub const ARTICLE_TEMPLATE: &str = "article_generation";

#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    pub template: String,
}

pub struct PromptStore {
    path: PathBuf,
    prompts: RwLock<HashMap<String, PromptTemplate>>,
}

impl PromptStore {
    /// Create the store and try a first load. A missing file is not fatal here:
    /// generation reports the missing template when it needs it.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            path: path.into(),
            prompts: RwLock::new(HashMap::new()),
        };
        if let Err(e) = store.reload().await {
            log::error!("[PROMPTS] Initial load failed: {}", e);
        }
        store
    }

    pub async fn reload(&self) -> Result<usize, ConfigError> {
        let display = self.path.display().to_string();
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ConfigError::Read {
                path: display.clone(),
                source,
            })?;
        let parsed: HashMap<String, PromptTemplate> =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: display,
                source,
            })?;

        let count = parsed.len();
        *self.prompts.write().await = parsed;
        info!("[PROMPTS] Loaded {} prompt templates", count);
        Ok(count)
    }

    pub async fn template(&self, name: &str) -> Option<String> {
        self.prompts
            .read()
            .await
            .get(name)
            .map(|p| p.template.clone())
    }
}
