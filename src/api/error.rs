//! Failure classes produced by the request layer.
//!
//! Every outbound call ends in exactly one of these variants or in a parsed
//! body. Nothing here is retried: the caller decides what a failed step means
//! for the account being processed.

use thiserror::Error;

/// Platform code embedded in a parsed body meaning the member token was rejected.
pub const UNAUTHORIZED_CODE: i64 = 401;

/// Outcome classes for a failed call to the loyalty API.
///
/// - [`AuthInvalid`](ApiError::AuthInvalid): the body parsed but carried the
///   unauthorized sentinel (expired or wrong token)
/// - [`Timeout`](ApiError::Timeout): the fixed per-call timeout elapsed
/// - [`Http`](ApiError::Http): non-2xx HTTP status
/// - [`MalformedBody`](ApiError::MalformedBody): body is not JSON or does not
///   match the expected shape
/// - [`Transport`](ApiError::Transport): anything else below HTTP (DNS,
///   connection reset, TLS)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("token rejected: {message}")]
    AuthInvalid { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("malformed response body: {0}")]
    MalformedBody(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// Whether this failure raises an out-of-band notification in addition to
    /// being returned to the caller.
    pub fn escalates(&self) -> bool {
        matches!(self, ApiError::AuthInvalid { .. } | ApiError::Transport(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_invalid_display() {
        let err = ApiError::AuthInvalid {
            message: "登录已过期".into(),
        };
        assert_eq!(err.to_string(), "token rejected: 登录已过期");
    }

    #[test]
    fn http_error_display() {
        let err = ApiError::Http { status: 502 };
        assert_eq!(err.to_string(), "HTTP status 502");
    }

    #[test]
    fn only_auth_and_transport_escalate() {
        assert!(ApiError::AuthInvalid { message: String::new() }.escalates());
        assert!(ApiError::Transport("reset".into()).escalates());
        assert!(!ApiError::Timeout.escalates());
        assert!(!ApiError::Http { status: 500 }.escalates());
        assert!(!ApiError::MalformedBody("eof".into()).escalates());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
    }
}
