// commands/mod.rs - Command Module Registry
// Declares the command modules and the glue they share: access to the Services
// bundle and the serenity-backed MessageSource used for argument resolution.

pub mod draft;          // Article generation and WordPress drafts
pub mod help;           // Command overview
pub mod settings;       // Related-content caps and bot status
pub mod topic;          // Documentation search in a dedicated thread

use async_trait::async_trait;
use serenity::{
    client::Context,
    http::{error::Error as HttpError, Http},
    model::{channel::Message, id::ChannelId, id::MessageId},
};
use std::sync::Arc;

use crate::argument::{AttachmentRef, FetchError, FetchedMessage, Invocation, MessageSource};
use crate::error::ArgumentError;
use crate::services::{Services, ServicesKey};

pub async fn services(ctx: &Context) -> Option<Arc<Services>> {
    let data = ctx.data.read().await;
    data.get::<ServicesKey>().cloned()
}

fn attachment_refs(msg: &Message) -> Vec<AttachmentRef> {
    msg.attachments
        .iter()
        .map(|a| AttachmentRef {
            filename: a.filename.clone(),
            url: a.url.clone(),
        })
        .collect()
}

/// Snapshot of `msg` for argument resolution. The inline text is passed
/// separately: framework arguments for prefixed commands, the leading text for
/// suffix invocations.
pub fn invocation_from(msg: &Message, inline_text: &str) -> Invocation {
    Invocation {
        inline_text: inline_text.to_string(),
        referenced_message_id: msg
            .message_reference
            .as_ref()
            .and_then(|r| r.message_id)
            .map(|id| id.0),
        attachments: attachment_refs(msg),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixCommand {
    Draft,
    Topic,
}

const SUFFIX_COMMANDS: [(&str, SuffixCommand); 3] = [
    ("draft", SuffixCommand::Draft),
    ("bozza", SuffixCommand::Draft),
    ("topic", SuffixCommand::Topic),
];

/// Recognise "<text><prefix>draft" and "<text><prefix>topic", with or without a
/// space before the prefix. Returns the command and the leading text.
pub fn suffix_invocation(content: &str, prefix: &str) -> Option<(SuffixCommand, String)> {
    let content = content.trim();
    if prefix.is_empty() || content.starts_with(prefix) {
        return None;
    }
    SUFFIX_COMMANDS.iter().find_map(|(name, command)| {
        let suffix = format!("{}{}", prefix, name);
        let split = content.len().checked_sub(suffix.len())?;
        if !content.is_char_boundary(split) || !content[split..].eq_ignore_ascii_case(&suffix) {
            return None;
        }
        let before = content[..split].trim();
        if before.is_empty() {
            None
        } else {
            Some((*command, before.to_string()))
        }
    })
}

/// Reads replied-to messages from the invoking channel and downloads attachments.
pub struct SerenityMessages {
    http: Arc<Http>,
    channel_id: ChannelId,
    downloader: reqwest::Client,
}

impl SerenityMessages {
    pub fn new(ctx: &Context, msg: &Message, services: &Services) -> Self {
        let channel_id = msg
            .message_reference
            .as_ref()
            .map(|r| r.channel_id)
            .unwrap_or(msg.channel_id);
        Self {
            http: ctx.http.clone(),
            channel_id,
            downloader: services.http.clone(),
        }
    }
}

fn fetch_error(err: serenity::Error) -> FetchError {
    if let serenity::Error::Http(http_err) = &err {
        if let HttpError::UnsuccessfulRequest(response) = http_err.as_ref() {
            match response.status_code.as_u16() {
                404 => return FetchError::NotFound,
                403 => return FetchError::Forbidden,
                _ => {}
            }
        }
    }
    FetchError::Other(err.to_string())
}

#[async_trait]
impl MessageSource for SerenityMessages {
    async fn fetch_message(&self, message_id: u64) -> Result<FetchedMessage, FetchError> {
        let message = self
            .channel_id
            .message(&self.http, MessageId(message_id))
            .await
            .map_err(fetch_error)?;
        Ok(FetchedMessage {
            attachments: attachment_refs(&message),
            content: message.content,
        })
    }

    async fn read_attachment(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, ArgumentError> {
        let download = |e: reqwest::Error| ArgumentError::AttachmentDownload(e.to_string());
        let response = self
            .downloader
            .get(&attachment.url)
            .send()
            .await
            .map_err(download)?
            .error_for_status()
            .map_err(download)?;
        let bytes = response.bytes().await.map_err(download)?;
        Ok(bytes.to_vec())
    }
}
