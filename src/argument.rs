// argument.rs - Command argument extraction, cleaning and validation
// A command's text can come from three places: the message it replies to, a .txt
// attachment, or the text after the command itself. The source is kept in the
// RawArgument variant because file uploads are exempt from length limits.

use async_trait::async_trait;
use log::{debug, info};

use crate::config::BotConfig;
use crate::error::ArgumentError;

/// Argument text tagged with the channel it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawArgument {
    InlineText(String),
    FileContent(String),
    ReferenceText(String),
}

impl RawArgument {
    pub fn text(&self) -> &str {
        match self {
            RawArgument::InlineText(text)
            | RawArgument::FileContent(text)
            | RawArgument::ReferenceText(text) => text,
        }
    }

    pub fn is_from_file(&self) -> bool {
        matches!(self, RawArgument::FileContent(_))
    }
}

/// An argument that passed the length checks for its command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedArgument(RawArgument);

impl ValidatedArgument {
    pub fn text(&self) -> &str {
        self.0.text()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Topic,
    Draft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub filename: String,
    pub url: String,
}

impl AttachmentRef {
    pub fn is_text_file(&self) -> bool {
        self.filename.to_lowercase().ends_with(".txt")
    }
}

/// What the resolver needs to know about the invoking message.
/// `inline_text` is whatever followed the command token, as parsed by the framework.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub inline_text: String,
    pub referenced_message_id: Option<u64>,
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchedMessage {
    pub content: String,
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    NotFound,
    Forbidden,
    Other(String),
}

/// Read access to the chat platform, as far as argument resolution goes.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_message(&self, message_id: u64) -> Result<FetchedMessage, FetchError>;
    async fn read_attachment(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, ArgumentError>;
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Pick the argument for a command. First match wins:
/// 1. the replied-to message (its .txt attachment, else its text)
/// 2. the first .txt attachment of the invoking message
/// 3. the text after the command token
pub async fn resolve_argument(
    source: &dyn MessageSource,
    invocation: &Invocation,
) -> Result<RawArgument, ArgumentError> {
    if let Some(message_id) = invocation.referenced_message_id {
        if let Some(argument) = resolve_reference(source, message_id).await? {
            return Ok(argument);
        }
        debug!("[ARGS] Referenced message {} has no usable content", message_id);
    }

    if !invocation.attachments.is_empty() {
        return match invocation.attachments.iter().find(|a| a.is_text_file()) {
            Some(attachment) => {
                let text = read_text_attachment(source, attachment).await?;
                debug!("[ARGS] Extracted {} characters from {}", text.len(), attachment.filename);
                Ok(RawArgument::FileContent(text))
            }
            None => {
                info!("[ARGS] {} attachments, none of them .txt", invocation.attachments.len());
                Err(ArgumentError::InvalidAttachment)
            }
        };
    }

    match inline_argument(&invocation.inline_text) {
        Some(text) => Ok(RawArgument::InlineText(text)),
        None => Err(ArgumentError::MissingInput),
    }
}

async fn resolve_reference(
    source: &dyn MessageSource,
    message_id: u64,
) -> Result<Option<RawArgument>, ArgumentError> {
    let referenced = source.fetch_message(message_id).await.map_err(|e| match e {
        FetchError::NotFound => ArgumentError::ReferenceNotFound,
        FetchError::Forbidden => ArgumentError::ReferenceForbidden,
        FetchError::Other(msg) => ArgumentError::ReferenceFetch(msg),
    })?;
    debug!("[ARGS] Referenced message {} fetched", message_id);

    if let Some(attachment) = referenced.attachments.iter().find(|a| a.is_text_file()) {
        let text = read_text_attachment(source, attachment).await?;
        return Ok(Some(RawArgument::FileContent(text)));
    }

    let text = sanitize(&referenced.content);
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(RawArgument::ReferenceText(text)))
    }
}

async fn read_text_attachment(
    source: &dyn MessageSource,
    attachment: &AttachmentRef,
) -> Result<String, ArgumentError> {
    let bytes = source.read_attachment(attachment).await?;
    let text = String::from_utf8(bytes).map_err(|_| ArgumentError::AttachmentEncoding)?;
    Ok(sanitize(&text))
}

fn inline_argument(inline_text: &str) -> Option<String> {
    let text = sanitize(inline_text);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ============================================================================
// SANITIZER
// ============================================================================

const FENCES: [&str; 3] = ["```", "``", "`"];
const QUOTE_MARKERS: [&str; 3] = [">>>", ">>", ">"];
const MARKUP_CHARS: [char; 4] = ['*', '_', '~', '`'];

/// Strip quote/code-fence wrappers and inline markup. Repeated until stable,
/// so running it twice gives the same text as running it once.
pub fn sanitize(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = sanitize_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_pass(input: &str) -> String {
    let mut text = input.trim();

    if let Some(marker) = QUOTE_MARKERS.iter().find(|m| text.starts_with(**m)) {
        text = text[marker.len()..].trim();
    }

    if let Some(fence) = FENCES.iter().find(|f| text.starts_with(**f)) {
        text = text[fence.len()..].trim();
        if text.ends_with(fence) {
            text = text[..text.len() - fence.len()].trim();
        }
    }

    text.chars()
        .filter(|c| !MARKUP_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Enforce the configured length bounds for `kind`. File uploads skip them.
pub fn validate_argument(
    argument: RawArgument,
    kind: CommandKind,
    config: &BotConfig,
) -> Result<ValidatedArgument, ArgumentError> {
    if argument.is_from_file() {
        return Ok(ValidatedArgument(argument));
    }

    let limits = match kind {
        CommandKind::Topic => config.commands.topic,
        CommandKind::Draft => config.commands.draft.limits(),
    };
    let length = argument.text().chars().count();

    if length < limits.min_length {
        return Err(ArgumentError::TooShort {
            min: limits.min_length,
        });
    }
    if length > limits.max_length {
        return Err(ArgumentError::TooLong {
            max: limits.max_length,
        });
    }
    Ok(ValidatedArgument(argument))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory chat: messages by id and attachment bodies by url.
    #[derive(Default)]
    struct FakeChat {
        messages: HashMap<u64, Result<FetchedMessage, FetchError>>,
        files: HashMap<String, Vec<u8>>,
        fetches: AtomicUsize,
        downloads: AtomicUsize,
    }

    #[async_trait]
    impl MessageSource for FakeChat {
        async fn fetch_message(&self, message_id: u64) -> Result<FetchedMessage, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.messages
                .get(&message_id)
                .cloned()
                .unwrap_or(Err(FetchError::NotFound))
        }

        async fn read_attachment(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, ArgumentError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            self.files
                .get(&attachment.url)
                .cloned()
                .ok_or_else(|| ArgumentError::AttachmentDownload("404".to_string()))
        }
    }

    fn attachment(name: &str) -> AttachmentRef {
        AttachmentRef {
            filename: name.to_string(),
            url: format!("https://cdn.test/{}", name),
        }
    }

    #[test]
    fn test_sanitize_strips_fences_and_markup() {
        assert_eq!(sanitize("  ```configure *nginx*```  "), "configure nginx");
        assert_eq!(sanitize("> quoted __text__"), "quoted text");
        assert_eq!(sanitize(">>> ~~struck~~ `code`"), "struck code");
        assert_eq!(sanitize("plain"), "plain");
        assert_eq!(sanitize("   "), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "> > nested quote",
            "*  leading star",
            "``` > fenced quote ```",
            "*> hidden marker",
            "`>>`",
            "a_b*c~d`e",
            ">>>>>>",
            "  \n```\nmulti\nline\n```\n",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[tokio::test]
    async fn test_inline_argument_after_command() {
        let chat = FakeChat::default();
        let invocation = Invocation {
            inline_text: "  configure nginx ".to_string(),
            ..Default::default()
        };
        let argument = resolve_argument(&chat, &invocation).await.unwrap();
        assert_eq!(argument, RawArgument::InlineText("configure nginx".to_string()));
    }

    #[tokio::test]
    async fn test_inline_argument_keeps_every_word() {
        // "! draft draft mode for nginx" reaches the command as "draft mode for nginx"
        let chat = FakeChat::default();
        let invocation = Invocation {
            inline_text: "draft mode for nginx".to_string(),
            ..Default::default()
        };
        let argument = resolve_argument(&chat, &invocation).await.unwrap();
        assert_eq!(argument, RawArgument::InlineText("draft mode for nginx".to_string()));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let chat = FakeChat::default();
        for inline_text in ["", "    ", "***"] {
            let invocation = Invocation {
                inline_text: inline_text.to_string(),
                ..Default::default()
            };
            assert_eq!(
                resolve_argument(&chat, &invocation).await,
                Err(ArgumentError::MissingInput)
            );
        }
    }

    #[tokio::test]
    async fn test_reply_wins_over_attachment_and_inline() {
        let mut chat = FakeChat::default();
        chat.messages.insert(
            42,
            Ok(FetchedMessage {
                content: "replied text".to_string(),
                attachments: vec![],
            }),
        );
        chat.files.insert(attachment("notes.txt").url, b"file text".to_vec());

        let invocation = Invocation {
            inline_text: "inline text".to_string(),
            referenced_message_id: Some(42),
            attachments: vec![attachment("notes.txt")],
        };
        let argument = resolve_argument(&chat, &invocation).await.unwrap();
        assert_eq!(argument, RawArgument::ReferenceText("replied text".to_string()));
        assert_eq!(chat.downloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reply_attachment_is_file_content() {
        let mut chat = FakeChat::default();
        chat.messages.insert(
            7,
            Ok(FetchedMessage {
                content: "ignored".to_string(),
                attachments: vec![attachment("image.png"), attachment("Draft.TXT")],
            }),
        );
        chat.files.insert(attachment("Draft.TXT").url, b"from the file".to_vec());

        let invocation = Invocation {
            inline_text: String::new(),
            referenced_message_id: Some(7),
            attachments: vec![],
        };
        let argument = resolve_argument(&chat, &invocation).await.unwrap();
        assert_eq!(argument, RawArgument::FileContent("from the file".to_string()));
    }

    #[tokio::test]
    async fn test_reference_fetch_failures_are_terminal() {
        let mut chat = FakeChat::default();
        chat.messages.insert(1, Err(FetchError::Forbidden));
        let invocation = Invocation {
            inline_text: "inline".to_string(),
            referenced_message_id: Some(1),
            attachments: vec![],
        };
        assert_eq!(
            resolve_argument(&chat, &invocation).await,
            Err(ArgumentError::ReferenceForbidden)
        );

        let invocation = Invocation {
            referenced_message_id: Some(2),
            ..invocation
        };
        assert_eq!(
            resolve_argument(&chat, &invocation).await,
            Err(ArgumentError::ReferenceNotFound)
        );
        assert_eq!(chat.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_reply_falls_through_to_inline() {
        let mut chat = FakeChat::default();
        chat.messages.insert(
            9,
            Ok(FetchedMessage {
                content: "  ".to_string(),
                attachments: vec![],
            }),
        );
        let invocation = Invocation {
            inline_text: "docker".to_string(),
            referenced_message_id: Some(9),
            attachments: vec![],
        };
        let argument = resolve_argument(&chat, &invocation).await.unwrap();
        assert_eq!(argument, RawArgument::InlineText("docker".to_string()));
    }

    #[tokio::test]
    async fn test_first_txt_attachment_is_used() {
        let mut chat = FakeChat::default();
        chat.files.insert(attachment("a.txt").url, b"first".to_vec());
        chat.files.insert(attachment("b.txt").url, b"second".to_vec());
        let invocation = Invocation {
            inline_text: "ignored inline".to_string(),
            referenced_message_id: None,
            attachments: vec![attachment("photo.jpg"), attachment("a.txt"), attachment("b.txt")],
        };
        let argument = resolve_argument(&chat, &invocation).await.unwrap();
        assert_eq!(argument, RawArgument::FileContent("first".to_string()));
        assert_eq!(chat.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_txt_attachments_are_rejected() {
        let chat = FakeChat::default();
        let invocation = Invocation {
            inline_text: "with text".to_string(),
            referenced_message_id: None,
            attachments: vec![attachment("doc.pdf"), attachment("img.png")],
        };
        assert_eq!(
            resolve_argument(&chat, &invocation).await,
            Err(ArgumentError::InvalidAttachment)
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_attachment() {
        let mut chat = FakeChat::default();
        chat.files.insert(attachment("bad.txt").url, vec![0xff, 0xfe, 0x00]);
        let invocation = Invocation {
            inline_text: String::new(),
            referenced_message_id: None,
            attachments: vec![attachment("bad.txt")],
        };
        assert_eq!(
            resolve_argument(&chat, &invocation).await,
            Err(ArgumentError::AttachmentEncoding)
        );
    }

    #[test]
    fn test_file_content_skips_length_limits() {
        let config = BotConfig::default();
        let huge = "x".repeat(config.commands.draft.max_length * 4);
        assert!(validate_argument(RawArgument::FileContent(huge), CommandKind::Draft, &config).is_ok());
        assert!(validate_argument(RawArgument::FileContent(String::new()), CommandKind::Topic, &config).is_ok());
    }

    #[test]
    fn test_inline_length_limits() {
        let config = BotConfig::default();
        assert_eq!(
            validate_argument(RawArgument::InlineText(String::new()), CommandKind::Draft, &config),
            Err(ArgumentError::TooShort {
                min: config.commands.draft.min_length
            })
        );

        let too_long = "y".repeat(config.commands.topic.max_length + 1);
        assert_eq!(
            validate_argument(RawArgument::ReferenceText(too_long), CommandKind::Topic, &config),
            Err(ArgumentError::TooLong {
                max: config.commands.topic.max_length
            })
        );

        let ok = validate_argument(
            RawArgument::InlineText("configure nginx".to_string()),
            CommandKind::Draft,
            &config,
        )
        .unwrap();
        assert_eq!(ok.text(), "configure nginx");
    }
}
