// topic.rs - Topic Search Command Module
// Implements ^topic: searches the documentation site and lists the results as
// embeds inside a public thread created from the invoking message.
//
// Used by: main.rs (command registration and suffix invocation)

use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::{channel::Message, id::ChannelId},
    utils::Colour,
};

use crate::argument::{resolve_argument, validate_argument, CommandKind};
use crate::commands::{invocation_from, services, SerenityMessages};
use crate::messages::{clip, fill};
use crate::related::{strip_tags, ContentSearch, SearchResult};

static NUMERIC_ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#([xX]?)([0-9a-fA-F]+);").expect("valid entity regex"));

/// One embed worth of results. `start` and `end` are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPage {
    pub start: usize,
    pub end: usize,
    pub lines: Vec<String>,
}

/// Split results into numbered markdown link lines, `per_page` per embed.
pub fn result_pages(results: &[SearchResult], per_page: usize) -> Vec<ResultPage> {
    let per_page = per_page.max(1);
    results
        .chunks(per_page)
        .enumerate()
        .map(|(chunk_index, chunk)| {
            let start = chunk_index * per_page + 1;
            let lines = chunk
                .iter()
                .enumerate()
                .map(|(i, doc)| format!("{}. [{}]({})", start + i, clean_html_text(&doc.title), doc.link))
                .collect();
            ResultPage {
                start,
                end: start + chunk.len() - 1,
                lines,
            }
        })
        .collect()
}

/// Strip tags and decode HTML entities in a rendered WordPress title.
fn clean_html_text(html: &str) -> String {
    let text = strip_tags(html);
    let text = NUMERIC_ENTITY_RE.replace_all(&text, |caps: &regex::Captures| {
        let radix = if caps[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Thread name for a search, keeping the term within the channel-name budget.
pub fn thread_name(template: &str, search_term: &str, title_limit: usize) -> String {
    let term: String = search_term
        .chars()
        .take(title_limit.saturating_sub(10))
        .collect();
    fill(template, &[("search_term", &term)])
}

#[command]
/// Search the documentation and list results in a new thread
/// Supports:
///   - ^topic <search term>
///   - ^topic with a .txt attachment
///   - ^topic as a reply to another message
pub async fn topic(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    run_topic(ctx, msg, args.message()).await
}

pub async fn run_topic(ctx: &Context, msg: &Message, inline_text: &str) -> CommandResult {
    let services = match services(ctx).await {
        Some(services) => services,
        None => {
            error!("[TOPIC] Services not initialised");
            return Ok(());
        }
    };
    let _in_flight = match services.in_flight.enter() {
        Some(guard) => guard,
        None => return Ok(()),
    };
    let messages = &services.messages;
    let config = services.config.read().await;

    let source = SerenityMessages::new(ctx, msg, &services);
    let argument = match resolve_argument(&source, &invocation_from(msg, inline_text))
        .await
        .and_then(|raw| validate_argument(raw, CommandKind::Topic, &config))
    {
        Ok(argument) => argument,
        Err(e) => {
            info!("[TOPIC] Argument rejected: {}", e);
            let text = messages.for_argument_error(&e, &messages.topic_missing_input);
            msg.channel_id.say(&ctx.http, text).await?;
            return Ok(());
        }
    };
    let search_term = argument.text();
    info!("[TOPIC] Search by {} for '{}'", msg.author.name, search_term);

    let name = thread_name(
        &messages.topic_thread_name,
        search_term,
        config.discord.thread_title_limit,
    );
    let target: ChannelId = match msg
        .channel_id
        .create_public_thread(&ctx.http, msg.id, |t| {
            t.name(&name)
                .auto_archive_duration(config.thread_archive_duration)
        })
        .await
    {
        Ok(thread) => thread.id,
        Err(e) => {
            warn!("[TOPIC] Could not create thread, answering in channel: {}", e);
            msg.channel_id
        }
    };

    let searching = fill(&messages.topic_searching, &[("search_term", search_term)]);
    let mut status = target.say(&ctx.http, searching).await?;

    let results = match services.wordpress.search_docs(search_term).await {
        Ok(results) => results,
        Err(e) => {
            error!("[TOPIC] Search for '{}' failed: {}", search_term, e);
            let text = clip(
                &fill(&messages.topic_search_error, &[("error", &e.to_string())]),
                config.discord.message_limit,
            );
            status.edit(&ctx.http, |m| m.content(text)).await?;
            return Ok(());
        }
    };

    if results.is_empty() {
        info!("[TOPIC] No results for '{}'", search_term);
        let text = messages.topic_no_results.clone();
        status.edit(&ctx.http, |m| m.content(text)).await?;
        return Ok(());
    }

    let total = results.len();
    info!("[TOPIC] {} results for '{}'", total, search_term);
    let found = fill(
        &messages.topic_results_found,
        &[("total_results", &total.to_string()), ("search_term", search_term)],
    );
    status.edit(&ctx.http, |m| m.content(found)).await?;

    for page in result_pages(&results, config.discord.max_results_per_embed) {
        let title = fill(
            &messages.topic_results_page,
            &[
                ("start", &page.start.to_string()),
                ("end", &page.end.to_string()),
                ("total", &total.to_string()),
            ],
        );
        let description = page.lines.join("\n");
        target
            .send_message(&ctx.http, |m| {
                m.embed(|e| e.title(title).description(description).colour(Colour::BLUE))
            })
            .await?;
    }

    target.say(&ctx.http, &messages.topic_follow_up).await?;
    Ok(())
}

#[group]
#[commands(topic)]
pub struct Topics;
