use tracing::{error, info};

use crate::api::types::MemberSummary;
use crate::api::{ApiCall, ApiTransport, Gateway};
use crate::error::StepError;
use crate::notify::Notifier;

const PHONE_PLACEHOLDER: &str = "unknown";

/// Stable identity of one account for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHandle {
    pub member_id: String,
    pub label: String,
    /// Masked mobile number as returned by the platform, or a placeholder.
    pub phone: String,
}

/// Looks up the member behind the gateway's token. Every later step needs the
/// member id, so a failure here ends the account.
pub async fn resolve<T: ApiTransport, N: Notifier>(
    gateway: &Gateway<'_, T, N>,
    label: &str,
) -> Result<AccountHandle, StepError> {
    let reply = gateway
        .execute::<MemberSummary>("resolve account", ApiCall::get("member/getAppById"))
        .await?
        .ok_or(StepError::EmptyResponse)?;

    if !reply.is_success() {
        error!(account = gateway.account(), reason = %reply.describe(), "account lookup rejected");
        return Err(StepError::Rejected(reply.describe()));
    }

    let summary = reply.data.ok_or(StepError::MissingField("memberId"))?;
    let Some(member_id) = summary.member_id else {
        error!(account = gateway.account(), "account lookup returned no member id");
        let title = format!("❌ {} account lookup failed", gateway.account());
        gateway
            .escalate(&title, "The API returned no usable member id.")
            .await;
        return Err(StepError::MissingField("memberId"));
    };

    let phone = summary
        .mobile
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| PHONE_PLACEHOLDER.to_string());
    info!(account = gateway.account(), %member_id, %phone, "account resolved");

    Ok(AccountHandle {
        member_id,
        label: label.to_string(),
        phone,
    })
}
