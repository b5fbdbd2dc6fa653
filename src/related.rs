// related.rs - Related articles and videos for a generated draft
// Keywords come from the metadata block the model writes into the article. Each
// keyword is searched on the docs site, then the video channel is searched once with
// all of them, and both lists are spliced into the article before the HTML anchor.

use async_trait::async_trait;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::RelatedContentCaps;
use crate::error::SearchError;

pub const KEYWORDS_START: &str = "<!-- KEYWORDS -->\n";
pub const KEYWORDS_END: &str = "\n\n<!-- META DESCRIPTION -->";
pub const SPLICE_ANCHOR: &str = "<!-- wp:html -->";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<]+?>").expect("valid tag regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResult {
    pub title: String,
    pub url: String,
}

#[async_trait]
pub trait ContentSearch: Send + Sync {
    /// All results for `query`, across every page the backend reports.
    async fn search_docs(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search_videos(
        &self,
        keywords: &[String],
        max_results: u32,
    ) -> Result<Vec<VideoResult>, SearchError>;
}

pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

/// Keywords listed in the metadata block, one per line, list markers removed.
/// `None` when the block is absent.
pub fn parse_keywords(document: &str) -> Option<Vec<String>> {
    let start = document.find(KEYWORDS_START)? + KEYWORDS_START.len();
    let end = start + document[start..].find(KEYWORDS_END)?;

    let keywords = document[start..end]
        .lines()
        .map(|line| line.trim_matches(|c: char| c == '-' || c == '*' || c.is_whitespace()))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    Some(keywords)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    pub content: String,
    pub keywords: Vec<String>,
    pub articles: Vec<SearchResult>,
    /// `None` when the video search was not run or failed.
    pub videos: Option<Vec<VideoResult>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeadings {
    pub articles: String,
    pub videos: String,
}

pub struct RelatedContentAssembler {
    search: Arc<dyn ContentSearch>,
    videos: Arc<dyn VideoSearch>,
    headings: SectionHeadings,
}

impl RelatedContentAssembler {
    pub fn new(
        search: Arc<dyn ContentSearch>,
        videos: Arc<dyn VideoSearch>,
        headings: SectionHeadings,
    ) -> Self {
        Self {
            search,
            videos,
            headings,
        }
    }

    pub async fn assemble(&self, document: String, caps: RelatedContentCaps) -> AssembledDocument {
        let keywords = match parse_keywords(&document) {
            Some(keywords) => keywords,
            None => {
                info!("[RELATED] No keyword block in the generated article");
                return AssembledDocument {
                    content: document,
                    keywords: Vec::new(),
                    articles: Vec::new(),
                    videos: None,
                };
            }
        };
        info!("[RELATED] Keywords: {:?}", keywords);

        let articles = self.collect_articles(&keywords, caps.max_articles as usize).await;

        let videos = match self.videos.search_videos(&keywords, caps.max_videos).await {
            Ok(videos) => {
                info!("[RELATED] Found {} related videos", videos.len());
                Some(videos)
            }
            Err(e) => {
                warn!("[RELATED] Video search failed: {}", e);
                None
            }
        };

        let mut sections = String::new();
        sections.push_str(&articles_section(
            &self.headings.articles,
            &articles,
            caps.max_articles as usize,
        ));
        if let Some(videos) = &videos {
            sections.push_str(&videos_section(
                &self.headings.videos,
                videos,
                caps.max_videos as usize,
            ));
        }

        AssembledDocument {
            content: splice_before_anchor(document, &sections),
            keywords,
            articles,
            videos,
        }
    }

    /// Search keyword by keyword, keeping the first `max` distinct results.
    async fn collect_articles(&self, keywords: &[String], max: usize) -> Vec<SearchResult> {
        let mut collected: Vec<SearchResult> = Vec::new();
        if max == 0 {
            return collected;
        }

        'keywords: for keyword in keywords {
            let results = match self.search.search_docs(keyword).await {
                Ok(results) => results,
                Err(e) => {
                    warn!("[RELATED] Search for '{}' failed, skipping: {}", keyword, e);
                    continue;
                }
            };
            info!("[RELATED] {} results for '{}'", results.len(), keyword);

            for result in results {
                if !collected.contains(&result) {
                    collected.push(result);
                    if collected.len() >= max {
                        break 'keywords;
                    }
                }
            }
        }

        collected
    }
}

pub fn articles_section(heading: &str, articles: &[SearchResult], max: usize) -> String {
    if articles.is_empty() {
        return String::new();
    }
    let items: Vec<String> = articles
        .iter()
        .take(max)
        .map(|a| format!("<li><a href=\"{}\">{}</a></li>", a.link, strip_tags(&a.title)))
        .collect();
    list_section(heading, &items)
}

pub fn videos_section(heading: &str, videos: &[VideoResult], max: usize) -> String {
    if videos.is_empty() {
        return String::new();
    }
    let items: Vec<String> = videos
        .iter()
        .take(max)
        .map(|v| format!("<li><a href=\"{}\">{}</a></li>", v.url, v.title))
        .collect();
    list_section(heading, &items)
}

fn list_section(heading: &str, items: &[String]) -> String {
    let mut section = format!(
        "\n\n<!-- wp:heading -->\n<h2>{}</h2>\n<!-- /wp:heading -->\n\n<!-- wp:list -->\n<ul>",
        heading
    );
    for item in items {
        section.push('\n');
        section.push_str(item);
    }
    section.push_str("\n</ul>\n<!-- /wp:list -->");
    section
}

/// Insert `sections` right before the first anchor. Without an anchor the
/// document is returned untouched.
pub fn splice_before_anchor(document: String, sections: &str) -> String {
    if sections.is_empty() {
        return document;
    }
    match document.find(SPLICE_ANCHOR) {
        Some(pos) => {
            let mut out = String::with_capacity(document.len() + sections.len() + 2);
            out.push_str(&document[..pos]);
            out.push_str(sections);
            out.push_str("\n\n");
            out.push_str(&document[pos..]);
            out
        }
        None => {
            warn!("[RELATED] Anchor {} missing, related content not inserted", SPLICE_ANCHOR);
            document
        }
    }
}
