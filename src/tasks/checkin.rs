use serde_json::json;
use tracing::{info, warn};

use super::AccountHandle;
use crate::api::{ApiCall, ApiTransport, Gateway};
use crate::notify::Notifier;

/// Literal `msg` of a successful check-in.
pub const SUCCESS_MESSAGE: &str = "success";
/// Fragment of the platform message for a second check-in on the same day.
pub const ALREADY_CHECKED_IN_MARKER: &str = "重复签到";

// Mini-program channel id expected by the sign endpoints.
const CHANNEL: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIn {
    pub message: String,
    pub succeeded: bool,
}

impl CheckIn {
    /// Classifies the platform message. A repeated check-in counts as success;
    /// any other message is a failure and is kept verbatim.
    pub fn from_message(msg: &str) -> Self {
        if msg == SUCCESS_MESSAGE {
            Self {
                message: "checked in".into(),
                succeeded: true,
            }
        } else if msg.contains(ALREADY_CHECKED_IN_MARKER) {
            Self {
                message: "already checked in today".into(),
                succeeded: true,
            }
        } else {
            Self {
                message: msg.to_string(),
                succeeded: false,
            }
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            message: reason,
            succeeded: false,
        }
    }

    pub fn report_line(&self) -> String {
        if self.succeeded {
            format!("📌 Check-in: {}", self.message)
        } else {
            format!("📌 Check-in failed: {}", self.message)
        }
    }
}

fn sign_body(handle: &AccountHandle, plaza_id: &str) -> serde_json::Value {
    json!({
        "channel": CHANNEL,
        "memberId": handle.member_id,
        "plazaId": plaza_id,
    })
}

/// Daily check-in. Safe to repeat on the same day.
pub async fn check_in<T: ApiTransport, N: Notifier>(
    gateway: &Gateway<'_, T, N>,
    handle: &AccountHandle,
    plaza_id: &str,
) -> CheckIn {
    let call = ApiCall::post("sign/clientSignIn", sign_body(handle, plaza_id));
    let outcome = match gateway.execute::<serde_json::Value>("check in", call).await {
        Ok(Some(reply)) => CheckIn::from_message(&reply.msg),
        Ok(None) => CheckIn::failed("empty response".into()),
        Err(err) => CheckIn::failed(format!("request failed ({err})")),
    };
    if outcome.succeeded {
        info!(account = gateway.account(), result = %outcome.message, "check-in done");
    } else {
        warn!(account = gateway.account(), reason = %outcome.message, "check-in failed");
    }
    outcome
}

/// Cumulative check-in days, as a report line. Never fails the pipeline.
pub async fn count_check_ins<T: ApiTransport, N: Notifier>(
    gateway: &Gateway<'_, T, N>,
    handle: &AccountHandle,
    plaza_id: &str,
) -> String {
    let call = ApiCall::post("sign/appSignCount", sign_body(handle, plaza_id));
    match gateway.execute::<i64>("count check-ins", call).await {
        Ok(Some(reply)) if reply.is_success() => {
            let days = reply.data.unwrap_or(0);
            info!(account = gateway.account(), days, "check-in count fetched");
            format!("📅 Checked in {days} days in total")
        }
        _ => {
            warn!(account = gateway.account(), "could not fetch check-in count");
            "⚠️ Check-in count unavailable".to_string()
        }
    }
}
