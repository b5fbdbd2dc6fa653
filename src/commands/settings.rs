// settings.rs - Configuration Command Module
// ^setrelatedarticles / ^setrelatedvideos change the related-content caps stored in
// config/config.json; ^status shows the current settings.

use log::{error, info, warn};
use serenity::{
    client::Context,
    framework::standard::{macros::command, macros::group, Args, CommandResult},
    model::channel::Message,
    utils::Colour,
};

use crate::commands::services;
use crate::config::{ConfigStore, MAX_RELATED_ITEMS, MIN_RELATED_ITEMS};
use crate::error::ConfigError;
use crate::messages::{fill, Messages};
use crate::youtube::channel_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapKind {
    Articles,
    Videos,
}

#[derive(Debug)]
pub enum CapOutcome {
    Current(u32),
    OutOfRange,
    Updated(u32),
    Failed(ConfigError),
}

/// Show or change one cap. Anything that is not a number in 1..=10 is
/// rejected before the store is touched.
pub async fn apply_cap_change(store: &ConfigStore, kind: CapKind, input: Option<&str>) -> CapOutcome {
    let input = match input.map(str::trim).filter(|s| !s.is_empty()) {
        Some(input) => input,
        None => {
            let caps = store.related_caps().await;
            return CapOutcome::Current(match kind {
                CapKind::Articles => caps.max_articles,
                CapKind::Videos => caps.max_videos,
            });
        }
    };

    let count = match input.parse::<u32>() {
        Ok(count) if (MIN_RELATED_ITEMS..=MAX_RELATED_ITEMS).contains(&count) => count,
        _ => return CapOutcome::OutOfRange,
    };

    let result = store
        .update(|config| {
            let caps = &mut config.commands.draft.related_content;
            match kind {
                CapKind::Articles => caps.max_articles = count,
                CapKind::Videos => caps.max_videos = count,
            }
        })
        .await;
    match result {
        Ok(_) => CapOutcome::Updated(count),
        Err(e) => CapOutcome::Failed(e),
    }
}

fn outcome_text(messages: &Messages, kind: CapKind, outcome: &CapOutcome) -> String {
    let (current, invalid, success, failure) = match kind {
        CapKind::Articles => (
            &messages.setrelatedarticles_current,
            &messages.setrelatedarticles_invalid,
            &messages.setrelatedarticles_success,
            &messages.setrelatedarticles_error,
        ),
        CapKind::Videos => (
            &messages.setrelatedvideos_current,
            &messages.setrelatedvideos_invalid,
            &messages.setrelatedvideos_success,
            &messages.setrelatedvideos_error,
        ),
    };
    match outcome {
        CapOutcome::Current(count) => fill(current, &[("count", &count.to_string())]),
        CapOutcome::OutOfRange => invalid.clone(),
        CapOutcome::Updated(count) => fill(success, &[("count", &count.to_string())]),
        CapOutcome::Failed(e) => fill(failure, &[("error", &e.to_string())]),
    }
}

async fn cap_command(ctx: &Context, msg: &Message, args: Args, kind: CapKind) -> CommandResult {
    let services = match services(ctx).await {
        Some(services) => services,
        None => return Ok(()),
    };
    let input = args.rest().to_string();
    info!("[CONFIG] {:?} cap command from {} with '{}'", kind, msg.author.name, input);

    let outcome = apply_cap_change(&services.config, kind, Some(&input)).await;
    match &outcome {
        CapOutcome::Updated(count) => info!("[CONFIG] {:?} cap set to {}", kind, count),
        CapOutcome::Failed(e) => error!("[CONFIG] Could not save {:?} cap: {}", kind, e),
        _ => {}
    }

    msg.channel_id
        .say(&ctx.http, outcome_text(&services.messages, kind, &outcome))
        .await?;
    Ok(())
}

#[command]
/// Show or set how many related articles are added to each draft (1-10)
pub async fn setrelatedarticles(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    cap_command(ctx, msg, args, CapKind::Articles).await
}

#[command]
/// Show or set how many related videos are added to each draft (1-10)
pub async fn setrelatedvideos(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    cap_command(ctx, msg, args, CapKind::Videos).await
}

fn domain_label(domain: &str) -> &str {
    domain
        .trim_start_matches("https://")
        .trim_start_matches("http://")
}

#[command]
/// Show the current related-content caps, YouTube channel and WordPress site
pub async fn status(ctx: &Context, msg: &Message) -> CommandResult {
    let services = match services(ctx).await {
        Some(services) => services,
        None => return Ok(()),
    };
    info!("[CONFIG] status requested by {}", msg.author.name);
    let config = services.config.read().await;
    let messages = &services.messages;

    let channel_id = config.youtube.channel_id.clone();
    let channel_name = match services.youtube.channel_info().await {
        Ok(info) => {
            info!(
                "[CONFIG] Channel {} ({}): {} subscribers, {} videos",
                info.title, info.id, info.subscriber_count, info.video_count
            );
            info.title
        }
        Err(e) => {
            warn!("[CONFIG] Channel lookup failed: {}", e);
            messages.status_channel_unavailable.clone()
        }
    };
    let caps = config.commands.draft.related_content;
    let domain = config.wordpress.domain.clone();

    msg.channel_id
        .send_message(&ctx.http, |m| {
            m.embed(|e| {
                e.title(&messages.status_title)
                    .colour(Colour::BLUE)
                    .field(&messages.status_field_articles, caps.max_articles, false)
                    .field(&messages.status_field_videos, caps.max_videos, false)
                    .field(
                        &messages.status_field_youtube,
                        format!("[{}]({})", channel_name, channel_url(&channel_id)),
                        false,
                    )
                    .field(
                        &messages.status_field_wordpress,
                        format!("[{}]({})", domain_label(&domain), domain),
                        false,
                    )
            })
        })
        .await?;
    Ok(())
}

#[group]
#[commands(setrelatedarticles, setrelatedvideos, status)]
pub struct Settings;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use std::path::Path;

    fn store_in(dir: &Path) -> ConfigStore {
        let path = dir.join("config.json");
        std::fs::write(&path, serde_json::to_string_pretty(&BotConfig::default()).unwrap()).unwrap();
        ConfigStore::open(path).unwrap()
    }

    fn backups(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with("config_backup_")
            })
            .count()
    }

    #[tokio::test]
    async fn test_no_argument_reports_current_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(matches!(
            apply_cap_change(&store, CapKind::Videos, None).await,
            CapOutcome::Current(3)
        ));
        assert!(matches!(
            apply_cap_change(&store, CapKind::Articles, Some("  ")).await,
            CapOutcome::Current(5)
        ));
        assert_eq!(backups(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        for input in ["11", "0", "-3", "five"] {
            assert!(matches!(
                apply_cap_change(&store, CapKind::Articles, Some(input)).await,
                CapOutcome::OutOfRange
            ));
        }
        assert_eq!(backups(dir.path()), 0);
        assert_eq!(store.related_caps().await.max_articles, 5);
    }

    #[tokio::test]
    async fn test_valid_value_persists_with_one_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(matches!(
            apply_cap_change(&store, CapKind::Articles, Some("7")).await,
            CapOutcome::Updated(7)
        ));
        assert_eq!(backups(dir.path()), 1);
        assert_eq!(store.related_caps().await.max_articles, 7);

        let reopened = ConfigStore::open(dir.path().join("config.json")).unwrap();
        assert_eq!(reopened.related_caps().await.max_articles, 7);
        assert_eq!(reopened.related_caps().await.max_videos, 3);
    }

    #[test]
    fn test_outcome_texts() {
        let messages = Messages::default();
        let text = outcome_text(&messages, CapKind::Videos, &CapOutcome::Updated(4));
        assert!(text.contains("**4**"));
        assert_eq!(
            outcome_text(&messages, CapKind::Articles, &CapOutcome::OutOfRange),
            messages.setrelatedarticles_invalid
        );
        assert_eq!(domain_label("https://docs.example.com"), "docs.example.com");
    }
}
