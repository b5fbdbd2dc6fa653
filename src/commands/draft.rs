// draft.rs - Draft Command Module
// Implements ^draft (generate an article, attach related content, save it as a
// WordPress draft) and ^reloadprompts.
//
// Used by: main.rs (command registration and suffix invocation)

// ============================================================================
// IMPORTS
// ============================================================================

use log::{error, info};
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::channel::Message,
};

use crate::argument::{resolve_argument, validate_argument, CommandKind};
use crate::commands::{invocation_from, services, SerenityMessages};
use crate::messages::{clip, fill, Messages};
use crate::pipeline::PreparedDraft;

// ============================================================================
// COMMAND IMPLEMENTATION
// ============================================================================

#[command]
#[aliases("bozza")]
/// Generate a documentation article and save it as a WordPress draft
/// Supports:
///   - ^draft <text>
///   - ^draft with a .txt attachment
///   - ^draft as a reply to another message
pub async fn draft(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    run_draft(ctx, msg, args.message()).await
}

/// Shared by the command and by "<text> ^draft" suffix invocations.
/// `inline_text` is the text that came with the command, without the command itself.
pub async fn run_draft(ctx: &Context, msg: &Message, inline_text: &str) -> CommandResult {
    let services = match services(ctx).await {
        Some(services) => services,
        None => {
            error!("[DRAFT] Services not initialised");
            return Ok(());
        }
    };
    let _in_flight = match services.in_flight.enter() {
        Some(guard) => guard,
        None => {
            info!("[DRAFT] Shutting down, ignoring request from {}", msg.author.name);
            return Ok(());
        }
    };
    info!("[DRAFT] Command received from {} ({})", msg.author.name, msg.author.id);
    let messages = &services.messages;

    let config = services.config.read().await;
    let source = SerenityMessages::new(ctx, msg, &services);
    let argument = match resolve_argument(&source, &invocation_from(msg, inline_text))
        .await
        .and_then(|raw| validate_argument(raw, CommandKind::Draft, &config))
    {
        Ok(argument) => argument,
        Err(e) => {
            info!("[DRAFT] Argument rejected: {}", e);
            let text = messages.for_argument_error(&e, &messages.draft_missing_input);
            msg.channel_id.say(&ctx.http, text).await?;
            return Ok(());
        }
    };

    let mut status = msg.channel_id.say(&ctx.http, &messages.draft_processing).await?;
    let typing = msg.channel_id.start_typing(&ctx.http).ok();

    let prepared = services.pipeline.prepare(&argument).await;
    if let Some(typing) = typing {
        typing.stop();
    }

    let draft = match prepared {
        Ok(draft) => draft,
        Err(e) => {
            error!("[DRAFT] Generation failed: {} ({:?})", e, e);
            let text = clip(
                &fill(&messages.draft_ai_error, &[("error", &e.to_string())]),
                config.discord.message_limit,
            );
            status.edit(&ctx.http, |m| m.content(text)).await?;
            return Ok(());
        }
    };

    info!(
        "[DRAFT] '{}': {} keywords, {} related articles, {} related videos",
        draft.title,
        draft.keywords.len(),
        draft.article_count,
        draft.video_count.unwrap_or(0)
    );
    if let Some(note) = video_note(messages, &draft) {
        let text = format!("{}\n{}", messages.draft_processing, note);
        status.edit(&ctx.http, |m| m.content(text)).await?;
    }

    let text = match services.pipeline.publish(&draft).await {
        Ok(url) => fill(&messages.draft_success, &[("url", &url)]),
        Err(e) => fill(&messages.draft_publish_error, &[("error", &e.to_string())]),
    };
    let text = clip(&text, config.discord.message_limit);
    status.edit(&ctx.http, |m| m.content(text)).await?;
    Ok(())
}

/// Progress line about related videos; only shown when keywords were found.
fn video_note(messages: &Messages, draft: &PreparedDraft) -> Option<String> {
    if draft.keywords.is_empty() {
        return None;
    }
    Some(match draft.video_count {
        Some(count) if count > 0 => fill(
            &messages.draft_related_videos_found,
            &[("count", &count.to_string())],
        ),
        _ => messages.draft_no_related_videos.clone(),
    })
}

#[command]
/// Reload prompt templates from config/prompts.json
pub async fn reloadprompts(ctx: &Context, msg: &Message) -> CommandResult {
    let services = match services(ctx).await {
        Some(services) => services,
        None => return Ok(()),
    };
    info!("[DRAFT] reloadprompts requested by {}", msg.author.name);

    let text = match services.prompts.reload().await {
        Ok(count) => {
            info!("[DRAFT] Reloaded {} prompt templates", count);
            services.messages.reload_prompts_success.clone()
        }
        Err(e) => {
            error!("[DRAFT] Prompt reload failed: {}", e);
            fill(&services.messages.reload_prompts_error, &[("error", &e.to_string())])
        }
    };
    msg.channel_id.say(&ctx.http, text).await?;
    Ok(())
}

// ============================================================================
// COMMAND GROUP
// ============================================================================

#[group]
#[commands(draft, reloadprompts)]
pub struct Drafting;

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(keywords: &[&str], video_count: Option<usize>) -> PreparedDraft {
        PreparedDraft {
            title: "t".to_string(),
            content: "c".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            article_count: 0,
            video_count,
        }
    }

    #[test]
    fn test_video_note() {
        let messages = Messages::default();
        assert_eq!(video_note(&messages, &prepared(&[], Some(3))), None);
        assert_eq!(
            video_note(&messages, &prepared(&["nginx"], Some(2))).unwrap(),
            "🎬 Found 2 related videos."
        );
        assert_eq!(
            video_note(&messages, &prepared(&["nginx"], None)).unwrap(),
            messages.draft_no_related_videos
        );
        assert_eq!(
            video_note(&messages, &prepared(&["nginx"], Some(0))).unwrap(),
            messages.draft_no_related_videos
        );
    }
}
