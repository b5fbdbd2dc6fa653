// services.rs - Shared collaborators, built once in main and stored in the client TypeMap

use serenity::prelude::TypeMapKey;
use std::sync::Arc;

use crate::config::{ConfigStore, Credentials};
use crate::generation::{ArticleGenerator, OpenAiClient};
use crate::messages::Messages;
use crate::pipeline::DraftPipeline;
use crate::prompts::PromptStore;
use crate::related::{RelatedContentAssembler, SectionHeadings};
use crate::shutdown::InFlight;
use crate::wordpress::WordPressClient;
use crate::youtube::YouTubeClient;

pub struct Services {
    pub config: Arc<ConfigStore>,
    pub prompts: Arc<PromptStore>,
    pub messages: Arc<Messages>,
    pub pipeline: DraftPipeline,
    pub wordpress: Arc<WordPressClient>,
    pub youtube: Arc<YouTubeClient>,
    pub in_flight: Arc<InFlight>,
    pub prefix: String,
    /// Used for attachment downloads.
    pub http: reqwest::Client,
}

impl Services {
    pub async fn build(
        credentials: &Credentials,
        config: Arc<ConfigStore>,
        prompts: Arc<PromptStore>,
        messages: Messages,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("docs_drafter_bot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let settings = config.read().await;

        let wordpress = Arc::new(WordPressClient::new(
            http.clone(),
            credentials.wp_api_url.clone(),
            credentials.wp_username.clone(),
            credentials.wp_app_password.clone(),
            settings.wordpress.results_per_page,
        ));
        let youtube = Arc::new(YouTubeClient::new(
            http.clone(),
            credentials.youtube_api_key.clone(),
            settings.youtube.channel_id.clone(),
        ));

        let backend = Arc::new(OpenAiClient::new(
            http.clone(),
            &credentials.ai_base_url,
            &credentials.ai_api_key,
        ));
        let headings = SectionHeadings {
            articles: messages.related_articles_heading.clone(),
            videos: messages.related_videos_heading.clone(),
        };
        let pipeline = DraftPipeline::new(
            ArticleGenerator::new(backend, prompts.clone()),
            RelatedContentAssembler::new(wordpress.clone(), youtube.clone(), headings),
            wordpress.clone(),
            config.clone(),
            messages.default_title.clone(),
        );

        Ok(Self {
            config,
            prompts,
            messages: Arc::new(messages),
            pipeline,
            wordpress,
            youtube,
            in_flight: InFlight::new(),
            prefix: credentials.prefix.clone(),
            http,
        })
    }
}

pub struct ServicesKey;

impl TypeMapKey for ServicesKey {
    type Value = Arc<Services>;
}
