// pipeline.rs - Draft pipeline: generate, title, related content, publish
// Every collaborator is injected so the whole flow can run against test doubles.

use log::{error, info};
use std::sync::Arc;

use crate::argument::ValidatedArgument;
use crate::config::ConfigStore;
use crate::error::{DraftError, PublishError};
use crate::generation::ArticleGenerator;
use crate::related::RelatedContentAssembler;
use crate::title::extract_title;
use crate::wordpress::Publisher;

/// Article ready to be published, with what was found along the way.
#[derive(Debug, Clone)]
pub struct PreparedDraft {
    pub title: String,
    pub content: String,
    pub keywords: Vec<String>,
    pub article_count: usize,
    /// `None` when the video search did not run or failed.
    pub video_count: Option<usize>,
}

pub struct DraftPipeline {
    generator: ArticleGenerator,
    assembler: RelatedContentAssembler,
    publisher: Arc<dyn Publisher>,
    config: Arc<ConfigStore>,
    default_title: String,
}

impl DraftPipeline {
    pub fn new(
        generator: ArticleGenerator,
        assembler: RelatedContentAssembler,
        publisher: Arc<dyn Publisher>,
        config: Arc<ConfigStore>,
        default_title: String,
    ) -> Self {
        Self {
            generator,
            assembler,
            publisher,
            config,
            default_title,
        }
    }

    /// Generate the article and attach related content. The configuration is
    /// read once, so a cap changed mid-run applies to the next draft.
    pub async fn prepare(&self, argument: &ValidatedArgument) -> Result<PreparedDraft, DraftError> {
        let config = self.config.read().await;
        let text = argument.text();

        let generated = self.generator.generate_article(&config.ai, "", text).await?;
        info!("[DRAFT] Article generated ({} chars)", generated.len());

        // Title comes from the generated text before any section is spliced in.
        let title = extract_title(&generated, text, &self.default_title);
        info!("[DRAFT] Title: {}", title);

        let assembled = self
            .assembler
            .assemble(generated, config.commands.draft.related_content)
            .await;

        Ok(PreparedDraft {
            title,
            content: assembled.content,
            keywords: assembled.keywords,
            article_count: assembled.articles.len(),
            video_count: assembled.videos.as_ref().map(Vec::len),
        })
    }

    /// Publication failures are returned on their own; the prepared draft is
    /// still valid when the site refuses it.
    pub async fn publish(&self, draft: &PreparedDraft) -> Result<String, PublishError> {
        match self.publisher.create_draft(&draft.title, &draft.content).await {
            Ok(url) => {
                info!("[DRAFT] Draft created: {}", url);
                Ok(url)
            }
            Err(e) => {
                error!("[DRAFT] Publication failed: {}", e);
                Err(e)
            }
        }
    }
}
