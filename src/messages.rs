// messages.rs - User-facing message catalog
// Built-in English texts, optionally overridden by config/messages.json.
// Placeholders use the `{name}` form and are filled with `fill`.

use log::{info, warn};
use serde::Deserialize;
use std::path::Path;

use crate::error::ArgumentError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub draft_missing_input: String,
    pub draft_invalid_attachment: String,
    pub draft_reference_not_found: String,
    pub draft_reference_forbidden: String,
    pub draft_processing: String,
    pub draft_success: String,
    pub draft_ai_error: String,
    pub draft_publish_error: String,
    pub draft_related_videos_found: String,
    pub draft_no_related_videos: String,
    pub argument_too_short: String,
    pub argument_too_long: String,
    pub argument_error: String,

    pub topic_missing_input: String,
    pub topic_searching: String,
    pub topic_no_results: String,
    pub topic_results_found: String,
    pub topic_results_page: String,
    pub topic_follow_up: String,
    pub topic_search_error: String,
    pub topic_thread_name: String,

    pub related_articles_heading: String,
    pub related_videos_heading: String,
    pub default_title: String,

    pub reload_prompts_success: String,
    pub reload_prompts_error: String,

    pub setrelatedarticles_current: String,
    pub setrelatedarticles_invalid: String,
    pub setrelatedarticles_success: String,
    pub setrelatedarticles_error: String,
    pub setrelatedvideos_current: String,
    pub setrelatedvideos_invalid: String,
    pub setrelatedvideos_success: String,
    pub setrelatedvideos_error: String,

    pub status_title: String,
    pub status_field_articles: String,
    pub status_field_videos: String,
    pub status_field_youtube: String,
    pub status_field_wordpress: String,
    pub status_channel_unavailable: String,
}

impl Default for Messages {
    fn default() -> Self {
        let s = |text: &str| text.to_string();
        Self {
            draft_missing_input: s("❌ Please provide a topic, attach a .txt file, or reply to a message with `!draft`."),
            draft_invalid_attachment: s("❌ Only .txt attachments are supported."),
            draft_reference_not_found: s("❌ The message you replied to could not be found."),
            draft_reference_forbidden: s("❌ I don't have permission to read the message you replied to."),
            draft_processing: s("⏳ Generating the article, this may take a minute..."),
            draft_success: s("✅ Draft created successfully! You can view it here: {url}"),
            draft_ai_error: s("❌ Something went wrong while generating the article, please try again later. ({error})"),
            draft_publish_error: s("❌ The article was generated but the draft could not be saved: {error}"),
            draft_related_videos_found: s("🎬 Found {count} related videos."),
            draft_no_related_videos: s("🎬 No related videos found."),
            argument_too_short: s("❌ The argument must be at least {min} characters long."),
            argument_too_long: s("❌ The argument cannot exceed {max} characters."),
            argument_error: s("❌ {error}"),

            topic_missing_input: s("❌ Please provide a search term, attach a .txt file, or reply to a message with `!topic`."),
            topic_searching: s("🔍 Searching documents about: {search_term}"),
            topic_no_results: s("No documents found for this topic."),
            topic_results_found: s("Found {total_results} results for **{search_term}**:"),
            topic_results_page: s("Results {start}-{end} of {total}"),
            topic_follow_up: s("Need something else? Start a new search with `!topic`."),
            topic_search_error: s("❌ {error}"),
            topic_thread_name: s("Search: {search_term}"),

            related_articles_heading: s("Related articles"),
            related_videos_heading: s("Related videos"),
            default_title: s("New article"),

            reload_prompts_success: s("✅ Prompts reloaded successfully"),
            reload_prompts_error: s("❌ Failed to reload prompts: {error}"),

            setrelatedarticles_current: s("📰 Related articles per draft: **{count}**"),
            setrelatedarticles_invalid: s("❌ The number of related articles must be between 1 and 10."),
            setrelatedarticles_success: s("✅ Related articles per draft set to **{count}**."),
            setrelatedarticles_error: s("❌ Could not update related articles: {error}"),
            setrelatedvideos_current: s("🎬 Related videos per draft: **{count}**"),
            setrelatedvideos_invalid: s("❌ The number of related videos must be between 1 and 10."),
            setrelatedvideos_success: s("✅ Related videos per draft set to **{count}**."),
            setrelatedvideos_error: s("❌ Could not update related videos: {error}"),

            status_title: s("🤖 Bot status"),
            status_field_articles: s("Related articles"),
            status_field_videos: s("Related videos"),
            status_field_youtube: s("YouTube channel"),
            status_field_wordpress: s("WordPress site"),
            status_channel_unavailable: s("unavailable"),
        }
    }
}

impl Messages {
    /// Load the catalog from `path`, falling back to the built-in texts.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(messages) => {
                    info!("[MESSAGES] Loaded message catalog from {}", path.display());
                    messages
                }
                Err(e) => {
                    warn!("[MESSAGES] Invalid {}: {} - using built-in messages", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("[MESSAGES] {} not found - using built-in messages", path.display());
                Self::default()
            }
        }
    }

    /// Chat text for an argument failure. `missing_input` differs per command.
    pub fn for_argument_error(&self, err: &ArgumentError, missing_input: &str) -> String {
        match err {
            ArgumentError::MissingInput => missing_input.to_string(),
            ArgumentError::InvalidAttachment => self.draft_invalid_attachment.clone(),
            ArgumentError::ReferenceNotFound => self.draft_reference_not_found.clone(),
            ArgumentError::ReferenceForbidden => self.draft_reference_forbidden.clone(),
            ArgumentError::TooShort { min } => {
                fill(&self.argument_too_short, &[("min", &min.to_string())])
            }
            ArgumentError::TooLong { max } => {
                fill(&self.argument_too_long, &[("max", &max.to_string())])
            }
            other => fill(&self.argument_error, &[("error", &other.to_string())]),
        }
    }
}

/// Replace every `{name}` in `template` with its value. Unknown placeholders
/// are left as they are; `{{` and `}}` produce literal braces.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('{') {
            match tail.find('}') {
                Some(end) => {
                    let name = &tail[1..end];
                    match values.iter().find(|(key, _)| *key == name) {
                        Some((_, value)) => out.push_str(value),
                        None => out.push_str(&tail[..=end]),
                    }
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        } else {
            out.push('}');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

/// Cut `text` to at most `limit` characters so it fits in one chat message.
pub fn clip(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(limit.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}
