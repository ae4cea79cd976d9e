//! Classifying front for the loyalty API.
//!
//! [`Gateway`] runs a call through an [`ApiTransport`], decodes the common
//! envelope into a typed [`Reply`], and decides which failures are only logged
//! and which also raise a notification. It never retries.

use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use super::client::ApiTransport;
use super::error::{ApiError, UNAUTHORIZED_CODE};
use super::types::{ApiCall, Envelope, Reply};
use crate::notify::Notifier;

pub struct Gateway<'a, T, N> {
    transport: T,
    notifier: &'a N,
    account: String,
}

impl<'a, T: ApiTransport, N: Notifier> Gateway<'a, T, N> {
    /// `account` is the human label used in logs and escalation titles.
    pub fn new(transport: T, notifier: &'a N, account: impl Into<String>) -> Self {
        Self {
            transport,
            notifier,
            account: account.into(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Executes one call. `Ok(None)` means the server answered with an empty
    /// body; callers decide what that means for their operation.
    pub async fn execute<D: DeserializeOwned>(
        &self,
        action: &str,
        call: ApiCall,
    ) -> Result<Option<Reply<D>>, ApiError> {
        debug!(account = %self.account, action, method = %call.method, endpoint = %call.endpoint, "request");

        let result = match self.transport.send(&call).await {
            Ok(Some(body)) => decode(body).map(Some),
            Ok(None) => {
                info!(account = %self.account, action, "request succeeded with an empty body");
                Ok(None)
            }
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            self.report_failure(action, &call, err).await;
        }
        result
    }

    /// Sends an out-of-band notification through the run's channel.
    pub async fn escalate(&self, title: &str, body: &str) {
        self.notifier.notify(title, body).await;
    }

    async fn report_failure(&self, action: &str, call: &ApiCall, err: &ApiError) {
        let endpoint = call.endpoint.as_str();
        match err {
            ApiError::AuthInvalid { message } => {
                error!(account = %self.account, action, %message, "token rejected");
            }
            ApiError::Transport(reason) => {
                error!(account = %self.account, action, endpoint, %reason, "network failure");
            }
            ApiError::Timeout => {
                error!(account = %self.account, action, endpoint, "request timed out");
            }
            ApiError::Http { status } => {
                error!(account = %self.account, action, endpoint, status, "HTTP error");
            }
            ApiError::MalformedBody(reason) => {
                warn!(account = %self.account, action, endpoint, %reason, "unexpected response shape");
            }
        }
        if !err.escalates() {
            return;
        }

        let (title, body) = match err {
            ApiError::AuthInvalid { message } => (
                format!("⚠️ {} request rejected", self.account),
                format!(
                    "Action: {action}\nError: {message}\nCheck whether the token is correct or has expired."
                ),
            ),
            other => (
                format!("⚠️ {} network error", self.account),
                format!("Action: {action}\nError: {other}"),
            ),
        };
        self.escalate(&title, &body).await;
    }
}

fn decode<D: DeserializeOwned>(body: serde_json::Value) -> Result<Reply<D>, ApiError> {
    let envelope: Envelope =
        serde_json::from_value(body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;

    if envelope.code == UNAUTHORIZED_CODE {
        return Err(ApiError::AuthInvalid {
            message: envelope
                .msg
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "token may have expired".to_string()),
        });
    }

    let successful = envelope.code == 0 && envelope.successful;
    let data = if successful && !envelope.data.is_null() {
        Some(serde_json::from_value(envelope.data).map_err(|e| ApiError::MalformedBody(e.to_string()))?)
    } else {
        None
    };

    Ok(Reply {
        code: envelope.code,
        successful: envelope.successful,
        msg: envelope.msg.unwrap_or_default(),
        data,
    })
}
