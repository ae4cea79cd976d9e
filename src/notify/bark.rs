use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{info, warn};

use super::{LogNotifier, Notifier};
use crate::error::{AppError, NotifyError};

/// Pushes notifications to a Bark server (`{server}/{key}`).
///
/// A failed push is logged and the message is handed to [`LogNotifier`], so
/// the content is never lost and the run never fails on delivery.
pub struct BarkNotifier {
    http: Client,
    endpoint: Url,
    group: Option<String>,
    fallback: LogNotifier,
}

#[derive(Debug, Deserialize)]
struct BarkResponse {
    code: i64,
    #[serde(default)]
    message: String,
}

impl BarkNotifier {
    pub fn new(server: &str, key: &str, group: Option<String>) -> Result<Self, AppError> {
        let mut endpoint = Url::parse(server.trim_end_matches('/'))
            .map_err(|e| AppError::Config(format!("invalid Bark server {server:?}: {e}")))?;
        endpoint
            .path_segments_mut()
            .map_err(|_| AppError::Config(format!("Bark server {server:?} cannot carry a path")))?
            .pop_if_empty()
            .push(key);
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("cannot build push client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            group,
            fallback: LogNotifier,
        })
    }

    async fn push(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let mut payload = serde_json::json!({
            "title": title,
            "body": body,
            "isArchive": 1,
        });
        if let Some(group) = &self.group {
            payload["group"] = serde_json::Value::String(group.clone());
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Bark answers {"code":200,"message":"success"}; anything else is a soft rejection.
        match response.json::<BarkResponse>().await {
            Ok(reply) if reply.code != 200 => Err(NotifyError::Rejected {
                code: reply.code,
                message: reply.message,
            }),
            _ => Ok(()),
        }
    }
}

impl Notifier for BarkNotifier {
    async fn notify(&self, title: &str, body: &str) {
        match self.push(title, body).await {
            Ok(()) => info!(title, "Bark notification sent"),
            Err(err) => {
                warn!(title, error = %err, "Bark delivery failed, recording notification to log");
                self.fallback.notify(title, body).await;
            }
        }
    }
}
