// generation.rs - Article generation through an OpenAI-compatible chat API
// Builds the prompt from the hot-reloaded template, checks the approximate token
// budget before paying for a request, and makes a single call bounded by a timeout.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AiConfig;
use crate::error::GenerationError;
use crate::messages::fill;
use crate::prompts::{PromptStore, ARTICLE_TEMPLATE};

pub const SYSTEM_PROMPT: &str = "You are an expert assistant for writing technical documentation.";

/// Characters per token used for the estimate. Not a tokenizer.
const CHARS_PER_TOKEN: usize = 4;
/// Share of the context window the prompt may use, and the share of what is
/// left that is requested for the response.
const BUDGET_RATIO: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// A chat completion backend. `Ok(None)` means the backend answered without content.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, GenerationError>;
}

// ============================================================================
// TOKEN BUDGET
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub estimated_prompt_tokens: usize,
    pub model_context_limit: usize,
    pub max_response_tokens: usize,
}

impl TokenBudget {
    pub fn estimate_tokens(text: &str) -> usize {
        text.chars().count() / CHARS_PER_TOKEN
    }

    /// Plan a request for `estimated` prompt tokens, or `None` if the prompt
    /// takes more than 90% of the context window.
    pub fn plan(estimated: usize, model_context_limit: usize) -> Option<Self> {
        if estimated as f64 > model_context_limit as f64 * BUDGET_RATIO {
            return None;
        }
        let remaining = model_context_limit.saturating_sub(estimated) as f64;
        Some(Self {
            estimated_prompt_tokens: estimated,
            model_context_limit,
            max_response_tokens: (remaining * BUDGET_RATIO).floor() as usize,
        })
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct ArticleGenerator {
    backend: Arc<dyn Generator>,
    prompts: Arc<PromptStore>,
}

impl ArticleGenerator {
    pub fn new(backend: Arc<dyn Generator>, prompts: Arc<PromptStore>) -> Self {
        Self { backend, prompts }
    }

    pub async fn generate_article(
        &self,
        ai: &AiConfig,
        topic: &str,
        content: &str,
    ) -> Result<String, GenerationError> {
        if let Err(e) = self.prompts.reload().await {
            warn!("[GENERATION] Prompt reload failed, using cached templates: {}", e);
        }
        let template = self
            .prompts
            .template(ARTICLE_TEMPLATE)
            .await
            .ok_or_else(|| GenerationError::MissingTemplate(ARTICLE_TEMPLATE.to_string()))?;
        let prompt = fill(&template, &[("topic", topic), ("content", content)]);

        let limit = *ai
            .token_limits
            .get(&ai.model)
            .ok_or_else(|| GenerationError::UnknownModel(ai.model.clone()))?;
        let estimated = TokenBudget::estimate_tokens(&prompt);
        let budget = TokenBudget::plan(estimated, limit).ok_or_else(|| {
            error!(
                "[GENERATION] Prompt too long: {} tokens > {} limit",
                estimated,
                limit as f64 * BUDGET_RATIO
            );
            GenerationError::BudgetExceeded {
                model: ai.model.clone(),
                estimated,
                limit: (limit as f64 * BUDGET_RATIO) as usize,
            }
        })?;
        debug!(
            "[GENERATION] Estimated tokens: {}, model limit: {}, response tokens: {}",
            budget.estimated_prompt_tokens, budget.model_context_limit, budget.max_response_tokens
        );

        let request = CompletionRequest {
            model: ai.model.clone(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: prompt,
            temperature: ai.temperature,
            max_tokens: budget.max_response_tokens,
        };

        let timeout = Duration::from_secs(ai.timeout_secs);
        let response = match tokio::time::timeout(timeout, self.backend.complete(&request)).await {
            Err(_) => {
                error!("[GENERATION] Backend call timed out after {:?}", timeout);
                return Err(GenerationError::TimedOut);
            }
            Ok(Err(e)) => {
                error!("[GENERATION] Backend call failed: {}", e);
                return Err(e);
            }
            Ok(Ok(response)) => response,
        };

        match response {
            Some(text) if !text.trim().is_empty() => {
                info!("[GENERATION] Article generated ({} characters)", text.len());
                Ok(text)
            }
            _ => {
                error!("[GENERATION] No response generated by the model");
                Err(GenerationError::NoResponse)
            }
        }
    }
}

// ============================================================================
// OPENAI-COMPATIBLE BACKEND
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Generator for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, GenerationError> {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!("[GENERATION] Calling {} with model {}", self.base_url, request.model);
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("[GENERATION] API returned HTTP {}: {}", status, text);
            return Err(GenerationError::Backend(format!("API request failed: HTTP {}", status)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns a canned reply and remembers every request it saw.
    pub(crate) struct ScriptedGenerator {
        pub reply: Result<Option<String>, String>,
        pub delay: Option<Duration>,
        pub calls: AtomicUsize,
        pub last_request: Mutex<Option<CompletionRequest>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                reply: Ok(Some(text.to_string())),
                delay: None,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone().map_err(GenerationError::Backend)
        }
    }

    pub(crate) async fn prompt_store(dir: &std::path::Path, template: &str) -> Arc<PromptStore> {
        let path = dir.join("prompts.json");
        let json = serde_json::json!({ "article_generation": { "template": template } });
        std::fs::write(&path, json.to_string()).unwrap();
        Arc::new(PromptStore::open(path).await)
    }

    #[test]
    fn test_budget_refuses_prompt_over_ninety_percent() {
        assert_eq!(TokenBudget::plan(3700, 4096), None);
        assert!(TokenBudget::plan(3686, 4096).is_some());
    }

    #[test]
    fn test_budget_response_ceiling() {
        let budget = TokenBudget::plan(1000, 4096).unwrap();
        assert_eq!(budget.max_response_tokens, 2786);
        assert_eq!(TokenBudget::estimate_tokens("abcdefgh"), 2);
        assert_eq!(TokenBudget::estimate_tokens("abc"), 0);
    }

    #[tokio::test]
    async fn test_oversized_prompt_never_reaches_backend() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = prompt_store(dir.path(), "{content}").await;
        let backend = Arc::new(ScriptedGenerator::replying("never"));
        let generator = ArticleGenerator::new(backend.clone(), prompts);

        let content = "x".repeat(3700 * 4);
        let result = generator.generate_article(&AiConfig::default(), "", &content).await;

        assert!(matches!(result, Err(GenerationError::BudgetExceeded { estimated: 3700, .. })));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompt_is_built_from_reloaded_template() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = prompt_store(dir.path(), "old").await;
        let backend = Arc::new(ScriptedGenerator::replying("<h1>Doc</h1>"));
        let generator = ArticleGenerator::new(backend.clone(), prompts);

        std::fs::write(
            dir.path().join("prompts.json"),
            r#"{ "article_generation": { "template": "Topic: {topic}\nContent: {content}" } }"#,
        )
        .unwrap();

        let text = generator
            .generate_article(&AiConfig::default(), "nginx", "configure it")
            .await
            .unwrap();
        assert_eq!(text, "<h1>Doc</h1>");

        let request = backend.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.user_prompt, "Topic: nginx\nContent: configure it");
        assert_eq!(request.system_prompt, SYSTEM_PROMPT);
        assert_eq!(request.model, "gpt-3.5-turbo");
        let estimated = TokenBudget::estimate_tokens(&request.user_prompt);
        assert_eq!(request.max_tokens, ((4096 - estimated) as f64 * 0.9).floor() as usize);
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = prompt_store(dir.path(), "{content}").await;

        let blank = ArticleGenerator::new(Arc::new(ScriptedGenerator::replying("   ")), prompts.clone());
        assert!(matches!(
            blank.generate_article(&AiConfig::default(), "", "x").await,
            Err(GenerationError::NoResponse)
        ));

        let mut backend = ScriptedGenerator::replying("");
        backend.reply = Ok(None);
        let absent = ArticleGenerator::new(Arc::new(backend), prompts);
        assert!(matches!(
            absent.generate_article(&AiConfig::default(), "", "x").await,
            Err(GenerationError::NoResponse)
        ));
    }

    #[tokio::test]
    async fn test_backend_error_and_unknown_model() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = prompt_store(dir.path(), "{content}").await;
        let mut backend = ScriptedGenerator::replying("");
        backend.reply = Err("boom".to_string());
        let generator = ArticleGenerator::new(Arc::new(backend), prompts);

        assert!(matches!(
            generator.generate_article(&AiConfig::default(), "", "x").await,
            Err(GenerationError::Backend(msg)) if msg == "boom"
        ));

        let ai = AiConfig {
            model: "mystery-model".to_string(),
            ..AiConfig::default()
        };
        assert!(matches!(
            generator.generate_article(&ai, "", "x").await,
            Err(GenerationError::UnknownModel(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = prompt_store(dir.path(), "{content}").await;
        let mut backend = ScriptedGenerator::replying("late");
        backend.delay = Some(Duration::from_secs(30));
        let generator = ArticleGenerator::new(Arc::new(backend), prompts);

        let ai = AiConfig {
            timeout_secs: 1,
            ..AiConfig::default()
        };
        let result = generator.generate_article(&ai, "", "x").await;
        assert!(matches!(result, Err(GenerationError::TimedOut)));
    }

    #[tokio::test]
    async fn test_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, r#"{ "other": { "template": "x" } }"#).unwrap();
        let prompts = Arc::new(PromptStore::open(path).await);
        let generator = ArticleGenerator::new(Arc::new(ScriptedGenerator::replying("x")), prompts);

        assert!(matches!(
            generator.generate_article(&AiConfig::default(), "", "x").await,
            Err(GenerationError::MissingTemplate(_))
        ));
    }
}
