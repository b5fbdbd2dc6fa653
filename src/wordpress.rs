// wordpress.rs - WordPress REST client (docs search and draft creation)
// Works against the BetterDocs `docs` post type exposed under /wp-json/wp/v2/docs.

use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::error::{PublishError, SearchError};
use crate::related::{ContentSearch, SearchResult};

/// Stores an article as an unpublished draft and returns its URL.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn create_draft(&self, title: &str, content: &str) -> Result<String, PublishError>;
}

#[derive(Debug, Default, Deserialize)]
struct Rendered {
    #[serde(default)]
    rendered: String,
}

#[derive(Debug, Deserialize)]
struct DocEntry {
    #[serde(default)]
    title: Rendered,
    #[serde(default)]
    link: String,
}

impl From<DocEntry> for SearchResult {
    fn from(doc: DocEntry) -> Self {
        SearchResult {
            title: doc.title.rendered,
            link: doc.link,
        }
    }
}

#[derive(Debug, Serialize)]
struct DraftBody<'a> {
    title: &'a str,
    content: &'a str,
    status: &'static str,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    #[serde(default)]
    link: String,
}

/// Endpoint that accepts new docs, derived from the configured API URL.
pub fn draft_endpoint(api_url: &str) -> String {
    let mut base = api_url.trim_end_matches('/');
    if let Some(stripped) = base.strip_suffix("/docs") {
        base = stripped;
    }
    if base.contains("/wp-json") {
        format!("{}/docs", base)
    } else {
        format!("{}/wp-json/wp/v2/docs", base)
    }
}

/// Whether another page should be requested after `page`.
fn has_more_pages(page: u32, total_pages_header: Option<&str>) -> bool {
    let total = total_pages_header
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(1);
    page < total
}

pub struct WordPressClient {
    http: reqwest::Client,
    api_url: Option<String>,
    username: Option<String>,
    app_password: Option<String>,
    per_page: u32,
}

impl WordPressClient {
    pub fn new(
        http: reqwest::Client,
        api_url: Option<String>,
        username: Option<String>,
        app_password: Option<String>,
        per_page: u32,
    ) -> Self {
        Self {
            http,
            api_url,
            username,
            app_password,
            per_page,
        }
    }

    fn credentials(&self) -> Option<(&str, &str, &str)> {
        match (&self.api_url, &self.username, &self.app_password) {
            (Some(url), Some(user), Some(pass))
                if !url.is_empty() && !user.is_empty() && !pass.is_empty() =>
            {
                Some((url.as_str(), user.as_str(), pass.as_str()))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl ContentSearch for WordPressClient {
    async fn search_docs(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let (url, user, pass) = self
            .credentials()
            .ok_or(SearchError::NotConfigured("WP_API_URL, WP_USERNAME, WP_APP_PASSWORD"))?;

        let mut results = Vec::new();
        let mut page: u32 = 1;
        let per_page = self.per_page.to_string();

        loop {
            let page_param = page.to_string();
            debug!("[WORDPRESS] Searching '{}' page {}", query, page);
            let response = self
                .http
                .get(url)
                .basic_auth(user, Some(pass))
                .query(&[
                    ("search", query),
                    ("per_page", per_page.as_str()),
                    ("page", page_param.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            if status.as_u16() == 400 {
                // WordPress answers 400 for a page past the end.
                break;
            }
            if !status.is_success() {
                return Err(SearchError::Status(status.as_u16()));
            }

            let more = has_more_pages(
                page,
                response
                    .headers()
                    .get("X-WP-TotalPages")
                    .and_then(|v| v.to_str().ok()),
            );
            let docs: Vec<DocEntry> = response.json().await?;
            if docs.is_empty() {
                break;
            }
            results.extend(docs.into_iter().map(SearchResult::from));

            if !more {
                break;
            }
            page += 1;
        }

        info!("[WORDPRESS] {} results for '{}'", results.len(), query);
        Ok(results)
    }
}

#[async_trait]
impl Publisher for WordPressClient {
    async fn create_draft(&self, title: &str, content: &str) -> Result<String, PublishError> {
        let (url, user, pass) = self.credentials().ok_or(PublishError::MissingCredentials)?;
        let endpoint = draft_endpoint(url);
        debug!("[WORDPRESS] Creating draft at {}", endpoint);

        let response = self
            .http
            .post(&endpoint)
            .basic_auth(user, Some(pass))
            .json(&DraftBody {
                title,
                content,
                status: "draft",
            })
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 200 || status == 201 {
            let post: CreatedPost = response.json().await?;
            info!("[WORDPRESS] Draft created: {}", post.link);
            Ok(post.link)
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("[WORDPRESS] Draft rejected with status {}: {}", status, body);
            Err(PublishError::Rejected { status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_endpoint_normalization() {
        assert_eq!(
            draft_endpoint("https://site.example"),
            "https://site.example/wp-json/wp/v2/docs"
        );
        assert_eq!(
            draft_endpoint("https://site.example/wp-json/wp/v2/docs/"),
            "https://site.example/wp-json/wp/v2/docs"
        );
        assert_eq!(
            draft_endpoint("https://site.example/wp-json/wp/v2"),
            "https://site.example/wp-json/wp/v2/docs"
        );
        assert_eq!(
            draft_endpoint("https://site.example/docs"),
            "https://site.example/wp-json/wp/v2/docs"
        );
    }

    #[test]
    fn test_pagination_stops_at_total_pages() {
        assert!(has_more_pages(1, Some("3")));
        assert!(!has_more_pages(3, Some("3")));
        assert!(!has_more_pages(1, None));
        assert!(!has_more_pages(1, Some("garbage")));
    }

    #[test]
    fn test_doc_entries_deserialize_with_missing_fields() {
        let docs: Vec<DocEntry> = serde_json::from_str(
            r#"[
                {"title": {"rendered": "Install <em>nginx</em>"}, "link": "https://d/nginx", "excerpt": {"rendered": "..."}},
                {"link": "https://d/untitled"}
            ]"#,
        )
        .unwrap();
        let results: Vec<SearchResult> = docs.into_iter().map(SearchResult::from).collect();
        assert_eq!(results[0].title, "Install <em>nginx</em>");
        assert_eq!(results[1].title, "");
        assert_eq!(results[1].link, "https://d/untitled");
    }

    #[tokio::test]
    async fn test_missing_credentials_never_hit_the_network() {
        let client = WordPressClient::new(
            reqwest::Client::new(),
            Some("https://site.example".to_string()),
            None,
            Some("secret".to_string()),
            10,
        );
        assert!(matches!(
            client.create_draft("t", "c").await,
            Err(PublishError::MissingCredentials)
        ));
        assert!(matches!(
            client.search_docs("nginx").await,
            Err(SearchError::NotConfigured(_))
        ));
    }
}
