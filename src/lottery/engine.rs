use std::time::Duration;

use reqwest::Url;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::state::{LotteryMachine, LotteryState, Step};
use crate::api::types::{Advert, DrawResult};
use crate::api::{ApiCall, ApiTransport, Gateway};
use crate::config::{ExchangeDeduction, LotteryConfig};
use crate::notify::Notifier;
use crate::tasks::AccountHandle;

/// Fragment of the platform message when a pool has no chances left.
pub const NO_CHANCES_MARKER: &str = "机会已用完";
/// Fragment of the platform message when the balance cannot pay for a draw.
pub const INSUFFICIENT_POINTS_MARKER: &str = "积分不足";

// Prizes mentioning any of these are points or "thanks for taking part".
const TRIVIAL_PRIZE_MARKERS: &[&str] = &["积分", "谢谢", "points", "thank"];

// Page the share action is attributed to.
const SHARE_PAGE_CODE: &str = "GAD03";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    Won(String),
    NoChancesRemaining(String),
    InsufficientPoints(String),
    TransientFailure(String),
}

impl DrawOutcome {
    /// Classifies a refusal message from the draw or exchange endpoints.
    pub fn from_refusal(message: String) -> Self {
        if message.contains(NO_CHANCES_MARKER) {
            DrawOutcome::NoChancesRemaining(message)
        } else if message.contains(INSUFFICIENT_POINTS_MARKER) {
            DrawOutcome::InsufficientPoints(message)
        } else {
            DrawOutcome::TransientFailure(message)
        }
    }
}

/// Whether a prize deserves an immediate notification.
pub fn is_notable_prize(prize: &str) -> bool {
    let lower = prize.to_lowercase();
    !prize.trim().is_empty() && !TRIVIAL_PRIZE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Extracts `gameId` from an advertisement jump URL, absolute or relative.
pub fn parse_campaign_id(jump_url: &str) -> Option<String> {
    let base = Url::parse("https://mini.program/").ok()?;
    let url = base.join(jump_url.trim()).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "gameId")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

/// Local chance budgets. Both only ever count down and stop at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChancePool {
    pub shared: u32,
    pub exchange: u32,
}

impl ChancePool {
    fn consume_shared(&mut self) {
        self.shared = self.shared.saturating_sub(1);
    }

    fn consume_exchange(&mut self) {
        self.exchange = self.exchange.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Default)]
pub struct LotteryReport {
    pub lines: Vec<String>,
    pub path: Vec<LotteryState>,
    pub campaign: Option<String>,
    pub share_registered: bool,
    /// Chances left in the local budgets when the run ended.
    pub pool: ChancePool,
    pub shared_attempts: u32,
    pub exchange_attempts: u32,
    /// Exchange draws assumed to have cost points, counted at the configured
    /// deduction point.
    pub points_deducted: u32,
    pub outcomes: Vec<DrawOutcome>,
}

enum Precheck {
    Passed,
    Refused(DrawOutcome),
}

pub struct LotteryEngine<'a, T, N> {
    gateway: &'a Gateway<'a, T, N>,
    config: &'a LotteryConfig,
    handle: &'a AccountHandle,
    plaza_id: &'a str,
}

impl<'a, T: ApiTransport, N: Notifier> LotteryEngine<'a, T, N> {
    pub fn new(
        gateway: &'a Gateway<'a, T, N>,
        config: &'a LotteryConfig,
        handle: &'a AccountHandle,
        plaza_id: &'a str,
    ) -> Self {
        Self {
            gateway,
            config,
            handle,
            plaza_id,
        }
    }

    pub async fn run(&self) -> LotteryReport {
        let mut machine = LotteryMachine::new();
        let mut report = LotteryReport::default();
        info!(account = self.gateway.account(), "member-day lottery started");

        let Some(campaign) = self.resolve_campaign().await else {
            warn!(account = self.gateway.account(), "no campaign id, skipping draws");
            report.lines.push("No campaign id available, draws skipped".to_string());
            machine.next(Step::Abort);
            return finish(report, &machine);
        };
        report.campaign = Some(campaign.clone());
        machine.next(Step::Proceed);

        report.share_registered = self.register_share(&campaign).await;
        pause(self.config.share_settle_ms).await;
        machine.next(Step::Proceed);

        report.pool = ChancePool {
            shared: self.remaining_chances(&campaign).await,
            exchange: self.config.max_exchange_draws,
        };
        machine.next(Step::Proceed);
        self.draw_shared(&campaign, &mut report).await;

        machine.next(Step::Proceed);
        self.draw_exchange(&campaign, &mut report).await;

        machine.next(Step::Proceed);
        finish(report, &machine)
    }

    async fn resolve_campaign(&self) -> Option<String> {
        if self.config.dynamic_campaign {
            if let Some(id) = self.lookup_campaign().await {
                return Some(id);
            }
            warn!(account = self.gateway.account(), "dynamic campaign lookup failed, using fixed id");
        }
        self.config
            .campaign_id
            .clone()
            .filter(|id| !id.trim().is_empty())
    }

    async fn lookup_campaign(&self) -> Option<String> {
        let endpoint = format!("advertising/getUpList/{}", self.config.advert_code);
        let reply = self
            .gateway
            .execute::<Vec<Advert>>("look up campaign", ApiCall::get(endpoint))
            .await
            .ok()??;
        let jump_url = reply.data?.into_iter().next()?.jump_url?;
        let id = parse_campaign_id(&jump_url);
        match &id {
            Some(id) => info!(account = self.gateway.account(), campaign = %id, "campaign id resolved"),
            None => warn!(account = self.gateway.account(), %jump_url, "jump URL carries no gameId"),
        }
        id
    }

    async fn register_share(&self, campaign: &str) -> bool {
        let call = ApiCall::post(
            "shareRecords/save",
            json!({
                "appPageCode": SHARE_PAGE_CODE,
                "memberId": self.handle.member_id,
                "sharedById": "",
                "sharedType": 2,
                "gameId": campaign,
                "plazaId": self.plaza_id,
            }),
        );
        match self.gateway.execute::<Value>("register share", call).await {
            Ok(Some(reply)) if reply.is_success() => {
                info!(account = self.gateway.account(), "share registered");
                true
            }
            Ok(Some(reply)) => {
                warn!(account = self.gateway.account(), reason = %reply.describe(), "share rejected");
                false
            }
            Ok(None) | Err(_) => {
                warn!(account = self.gateway.account(), "share registration failed");
                false
            }
        }
    }

    async fn remaining_chances(&self, campaign: &str) -> u32 {
        let endpoint = format!("game/residue/{campaign}");
        match self
            .gateway
            .execute::<i64>("query chances", ApiCall::get(endpoint))
            .await
        {
            Ok(Some(reply)) if reply.is_success() => {
                let chances = u32::try_from(reply.data.unwrap_or(0).max(0)).unwrap_or(u32::MAX);
                info!(account = self.gateway.account(), chances, "shared chances available");
                chances
            }
            _ => {
                warn!(account = self.gateway.account(), "chance query failed, assuming none");
                0
            }
        }
    }

    async fn draw(&self, campaign: &str) -> DrawOutcome {
        let endpoint = format!("game/getById/{campaign}/0");
        match self
            .gateway
            .execute::<DrawResult>("draw", ApiCall::get(endpoint))
            .await
        {
            Ok(Some(reply)) if reply.is_success() => DrawOutcome::Won(
                reply
                    .data
                    .and_then(|d| d.message)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "a prize (details not reported)".to_string()),
            ),
            Ok(Some(reply)) => DrawOutcome::from_refusal(reply.describe()),
            Ok(None) => DrawOutcome::TransientFailure("empty response".to_string()),
            Err(err) => DrawOutcome::TransientFailure(err.to_string()),
        }
    }

    async fn precheck_exchange(&self, campaign: &str) -> Precheck {
        let endpoint = format!("game/getIntegralGame/{campaign}");
        match self
            .gateway
            .execute::<Value>("exchange points for a chance", ApiCall::get(endpoint))
            .await
        {
            Ok(Some(reply)) if reply.code == 0 => Precheck::Passed,
            Ok(Some(reply)) => Precheck::Refused(DrawOutcome::from_refusal(reply.describe())),
            Ok(None) => Precheck::Refused(DrawOutcome::TransientFailure("empty response".to_string())),
            Err(err) => Precheck::Refused(DrawOutcome::TransientFailure(err.to_string())),
        }
    }

    // The residue count is read once; the local counter is the loop's budget.
    async fn draw_shared(&self, campaign: &str, report: &mut LotteryReport) {
        while report.shared_attempts < self.config.max_shared_draws && report.pool.shared > 0 {
            self.pace(report).await;
            report.shared_attempts += 1;
            let outcome = self.draw(campaign).await;
            report.pool.consume_shared();

            let exhausted = matches!(outcome, DrawOutcome::NoChancesRemaining(_));
            match &outcome {
                DrawOutcome::Won(prize) => {
                    info!(account = self.gateway.account(), %prize, "shared draw won");
                    report.lines.push(format!("🎲 Shared draw: {prize}"));
                    self.announce(prize, "").await;
                }
                DrawOutcome::NoChancesRemaining(message) => {
                    report.lines.push(format!("🎲 Shared draw: {message}"));
                }
                DrawOutcome::InsufficientPoints(message) | DrawOutcome::TransientFailure(message) => {
                    warn!(account = self.gateway.account(), %message, "shared draw failed");
                    report.lines.push(format!("🎲 Shared draw failed: {message}"));
                }
            }
            report.outcomes.push(outcome);
            if exhausted {
                break;
            }
        }
    }

    // Stops at the first outcome that is not a win, so ambiguous errors never
    // keep spending points.
    async fn draw_exchange(&self, campaign: &str, report: &mut LotteryReport) {
        let deduct_on_precheck = self.config.exchange_deduction == ExchangeDeduction::Precheck;

        while report.exchange_attempts < self.config.max_exchange_draws && report.pool.exchange > 0 {
            self.pace(report).await;
            report.exchange_attempts += 1;

            if let Precheck::Refused(outcome) = self.precheck_exchange(campaign).await {
                let line = match &outcome {
                    DrawOutcome::NoChancesRemaining(m) | DrawOutcome::InsufficientPoints(m) => {
                        info!(account = self.gateway.account(), reason = %m, "points draws unavailable");
                        format!("🎲 Points draw: {m}")
                    }
                    DrawOutcome::TransientFailure(m) | DrawOutcome::Won(m) => {
                        warn!(account = self.gateway.account(), reason = %m, "points exchange failed");
                        format!("🎲 Points draw failed: exchange rejected ({m})")
                    }
                };
                report.lines.push(line);
                report.outcomes.push(outcome);
                break;
            }
            if deduct_on_precheck {
                report.points_deducted += 1;
            }

            let outcome = self.draw(campaign).await;
            report.pool.consume_exchange();
            let keep_going = matches!(outcome, DrawOutcome::Won(_));
            match &outcome {
                DrawOutcome::Won(prize) => {
                    if !deduct_on_precheck {
                        report.points_deducted += 1;
                    }
                    info!(account = self.gateway.account(), %prize, "points draw won");
                    report.lines.push(format!("🎲 Points draw: {prize}"));
                    self.announce(prize, " (points draw)").await;
                }
                DrawOutcome::NoChancesRemaining(message) | DrawOutcome::InsufficientPoints(message) => {
                    report.lines.push(format!("🎲 Points draw: {message}"));
                }
                DrawOutcome::TransientFailure(message) => {
                    warn!(account = self.gateway.account(), %message, "points draw failed");
                    let spent = if deduct_on_precheck {
                        " (points already spent on the exchange)"
                    } else {
                        ""
                    };
                    report.lines.push(format!("🎲 Points draw failed: {message}{spent}"));
                }
            }
            report.outcomes.push(outcome);
            if !keep_going {
                break;
            }
        }
    }

    async fn announce(&self, prize: &str, suffix: &str) {
        if is_notable_prize(prize) {
            let title = format!("🎉 {} lottery win{suffix}", self.gateway.account());
            self.gateway.escalate(&title, &format!("Won: {prize}")).await;
        }
    }

    async fn pace(&self, report: &LotteryReport) {
        if report.shared_attempts + report.exchange_attempts > 0 {
            pause(self.config.draw_delay_ms).await;
        }
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        sleep(Duration::from_millis(ms)).await;
    }
}

fn finish(mut report: LotteryReport, machine: &LotteryMachine) -> LotteryReport {
    if report.lines.is_empty() {
        report.lines.push("No draws executed".to_string());
    }
    report.path = machine.path();
    debug!(state = %machine.state(), path = ?report.path, "lottery finished");
    report
}
