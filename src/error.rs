// error.rs - Error types for the drafting pipeline
// One enum per concern; the command layer turns each of them into a chat message.

use thiserror::Error;

/// Failures while extracting or validating the user's argument.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("no input was provided")]
    MissingInput,

    #[error("no .txt attachment found")]
    InvalidAttachment,

    #[error("referenced message not found")]
    ReferenceNotFound,

    #[error("missing permission to read the referenced message")]
    ReferenceForbidden,

    #[error("could not fetch the referenced message: {0}")]
    ReferenceFetch(String),

    #[error("could not download attachment: {0}")]
    AttachmentDownload(String),

    #[error("attachment is not valid UTF-8 text")]
    AttachmentEncoding,

    #[error("argument must be at least {min} characters")]
    TooShort { min: usize },

    #[error("argument must be at most {max} characters")]
    TooLong { max: usize },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("prompt template '{0}' is not defined")]
    MissingTemplate(String),

    #[error("no token limit configured for model {0}")]
    UnknownModel(String),

    #[error("the prompt is too long for model {model} (estimated {estimated} tokens, limit {limit})")]
    BudgetExceeded {
        model: String,
        estimated: usize,
        limit: usize,
    },

    #[error("article generation took too long")]
    TimedOut,

    #[error("generation failed: {0}")]
    Backend(String),

    #[error("no response generated by the model")]
    NoResponse,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search failed with status code {0}")]
    Status(u16),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("search backend is not configured: {0}")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Request(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("WordPress configuration is incomplete, check WP_API_URL, WP_USERNAME and WP_APP_PASSWORD")]
    MissingCredentials,

    #[error("draft creation failed: status code {status}")]
    Rejected { status: u16 },

    #[error("draft creation failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        PublishError::Request(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not create configuration backup: {0}")]
    Backup(#[source] std::io::Error),

    #[error("failed to write configuration: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("{0}")]
    Missing(String),
}

/// Terminal failure of a draft run. Publication failures are not here:
/// they are reported next to the generated result instead.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
}
