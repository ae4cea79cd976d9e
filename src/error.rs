use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("No valid accounts configured. Set WEAIOVE_ACCOUNTS to token|label@token|label.")]
    NoAccounts,

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Why a single pipeline step produced no usable result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("empty response")]
    EmptyResponse,

    #[error("{0}")]
    Rejected(String),

    #[error("response is missing {0}")]
    MissingField(&'static str),
}

/// Push-channel delivery failures. Always absorbed by falling back to the log.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("push request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("push server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("push server rejected the message (code {code}): {message}")]
    Rejected { code: i64, message: String },
}
