use tracing::{info, warn};

use super::AccountHandle;
use crate::api::types::MemberLevelDetail;
use crate::api::{ApiCall, ApiTransport, Gateway};
use crate::error::StepError;
use crate::notify::Notifier;

/// Tier and balances read fresh on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSnapshot {
    pub tier: String,
    pub points: f64,
    pub growth_total: f64,
    pub growth_to_next: f64,
    /// Growth value at which the next tier starts, when reported.
    pub next_tier_at: Option<f64>,
}

impl ProfileSnapshot {
    pub fn report_lines(&self) -> Vec<String> {
        vec![
            format!("⭐ Tier: {}", self.tier),
            format!("💰 Points: {}", self.points),
            format!(
                "📈 Growth: {} ({} to next tier)",
                self.growth_total, self.growth_to_next
            ),
        ]
    }
}

impl From<MemberLevelDetail> for ProfileSnapshot {
    fn from(detail: MemberLevelDetail) -> Self {
        Self {
            tier: detail.level_name,
            points: detail.points,
            growth_total: detail.growth_total,
            growth_to_next: detail.growth_to_next,
            next_tier_at: detail.next_level_growth,
        }
    }
}

pub async fn fetch<T: ApiTransport, N: Notifier>(
    gateway: &Gateway<'_, T, N>,
    handle: &AccountHandle,
) -> Result<ProfileSnapshot, StepError> {
    let endpoint = format!("member/getByMemberLevelDetailApp/{}", handle.member_id);
    let reply = gateway
        .execute::<MemberLevelDetail>("fetch profile", ApiCall::get(endpoint))
        .await?
        .ok_or(StepError::EmptyResponse)?;

    if !reply.is_success() {
        warn!(account = gateway.account(), reason = %reply.describe(), "profile lookup rejected");
        return Err(StepError::Rejected(reply.describe()));
    }
    let snapshot = ProfileSnapshot::from(reply.data.ok_or(StepError::MissingField("data"))?);
    info!(
        account = gateway.account(),
        tier = %snapshot.tier,
        points = snapshot.points,
        next_tier_at = ?snapshot.next_tier_at,
        "profile fetched"
    );
    Ok(snapshot)
}
