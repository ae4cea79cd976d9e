//! Per-account task sequence.
//!
//! [`AccountPipeline`] runs identity, check-in, check-in count, profile, the
//! lottery on member day and the coupon scan, and turns the results into one
//! [`AccountReport`]. Only an identity failure ends the account early; every
//! other failure becomes a degraded line and the pipeline moves on.

use chrono::{Datelike, NaiveDateTime, Weekday};
use tracing::{info, warn};

use crate::api::{ApiTransport, Gateway};
use crate::config::{AppConfig, LotteryConfig};
use crate::lottery::LotteryEngine;
use crate::notify::Notifier;
use crate::tasks::{checkin, coupons, identity, profile};

/// When the member-day lottery runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LotteryMode {
    /// Only on the configured weekday.
    #[default]
    Auto,
    Always,
    Never,
}

impl LotteryMode {
    pub fn applies(self, member_day: Weekday, today: Weekday) -> bool {
        match self {
            LotteryMode::Auto => member_day == today,
            LotteryMode::Always => true,
            LotteryMode::Never => false,
        }
    }
}

/// Per-run values every account pipeline shares.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub plaza_id: String,
    pub lottery: LotteryConfig,
    pub lottery_mode: LotteryMode,
    pub coupon_page_size: u32,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig, lottery_mode: LotteryMode) -> Self {
        Self {
            plaza_id: config.api.plaza_id.clone(),
            lottery: config.lottery.clone(),
            lottery_mode,
            coupon_page_size: config.coupon_page_size,
        }
    }
}

/// Ordered report lines for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub lines: Vec<String>,
    /// The account stopped after a failed identity lookup.
    pub abandoned: bool,
}

impl AccountReport {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Display name of account `index` (1-based) used in logs, titles and reports.
pub fn account_name(index: usize, label: &str) -> String {
    format!("Account {index} ({label})")
}

pub struct AccountPipeline<'a, T, N> {
    gateway: Gateway<'a, T, N>,
    settings: &'a PipelineSettings,
    label: String,
}

impl<'a, T: ApiTransport, N: Notifier> AccountPipeline<'a, T, N> {
    pub fn new(gateway: Gateway<'a, T, N>, settings: &'a PipelineSettings, label: impl Into<String>) -> Self {
        Self {
            gateway,
            settings,
            label: label.into(),
        }
    }

    pub async fn run(&self, now: NaiveDateTime) -> AccountReport {
        let account = self.gateway.account().to_string();
        let mut lines = vec![
            format!("👤 {account}"),
            format!("🕕 Processed at: {}", now.format("%Y-%m-%d %H:%M:%S")),
        ];

        let handle = match identity::resolve(&self.gateway, &self.label).await {
            Ok(handle) => handle,
            Err(err) => {
                warn!(account = %account, error = %err, "identity lookup failed, skipping account");
                lines.push(format!("❌ Error: failed to resolve account ({err})"));
                return AccountReport {
                    lines,
                    abandoned: true,
                };
            }
        };
        lines[0] = format!("👤 {account} (phone: {})", handle.phone);

        let plaza_id = self.settings.plaza_id.as_str();
        lines.push(checkin::check_in(&self.gateway, &handle, plaza_id).await.report_line());
        lines.push(checkin::count_check_ins(&self.gateway, &handle, plaza_id).await);

        match profile::fetch(&self.gateway, &handle).await {
            Ok(snapshot) => lines.extend(snapshot.report_lines()),
            Err(err) => {
                warn!(account = %account, error = %err, "profile unavailable");
                lines.push("⚠️ Profile details unavailable".to_string());
            }
        }

        let lottery = &self.settings.lottery;
        if self.settings.lottery_mode.applies(lottery.weekday, now.weekday()) {
            let report = LotteryEngine::new(&self.gateway, lottery, &handle, plaza_id)
                .run()
                .await;
            info!(
                account = %account,
                campaign = ?report.campaign,
                share_registered = report.share_registered,
                shared_attempts = report.shared_attempts,
                exchange_attempts = report.exchange_attempts,
                points_deducted = report.points_deducted,
                shared_left = report.pool.shared,
                draws = report.outcomes.len(),
                "lottery done"
            );
            lines.push("\n--- Member-day lottery ---".to_string());
            lines.extend(report.lines);
            lines.push("--------------------------".to_string());
        }

        let coupons =
            coupons::list_unused(&self.gateway, &handle, self.settings.coupon_page_size).await;
        if coupons.is_empty() {
            lines.push("🎟️ No unused coupons".to_string());
        } else {
            lines.push("\n--- 🎟️ Unused coupons ---".to_string());
            lines.extend(coupons.iter().map(|name| format!("- {name}")));
            lines.push("-----------------------".to_string());
        }

        info!(account = %account, "account processed");
        AccountReport {
            lines,
            abandoned: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::testing::{RecordingNotifier, ScriptedTransport, replies};
    use chrono::NaiveDate;
    use serde_json::json;

    fn settings(mode: LotteryMode) -> PipelineSettings {
        PipelineSettings {
            plaza_id: "P1".into(),
            lottery: LotteryConfig {
                campaign_id: Some("G1".into()),
                draw_delay_ms: 0,
                share_settle_ms: 0,
                ..LotteryConfig::default()
            },
            lottery_mode: mode,
            coupon_page_size: 20,
        }
    }

    // 2026-10-14 is a Wednesday.
    fn wednesday() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    fn thursday() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    fn healthy() -> ScriptedTransport {
        ScriptedTransport::new()
            .reply("member/getAppById", replies::member("1001"))
            .reply("sign/clientSignIn", replies::ok(json!(null)))
            .reply("sign/appSignCount", replies::ok(json!(30)))
            .reply("member/getByMemberLevelDetailApp/1001", replies::level())
            .reply("member/getCopuonsPageList", replies::coupons(&["5元券"]))
            .reply("shareRecords/save", replies::ok(json!(null)))
            .reply("game/residue/G1", replies::ok(json!(1)))
            .reply("game/getById/G1/0", replies::prize("10积分"))
            .reply("game/getIntegralGame/G1", replies::fail(500, "积分不足"))
    }

    async fn run(
        transport: &ScriptedTransport,
        mode: LotteryMode,
        now: NaiveDateTime,
    ) -> (AccountReport, Vec<(String, String)>) {
        let notifier = RecordingNotifier::default();
        let settings = settings(mode);
        let gateway = Gateway::new(transport, &notifier, account_name(1, "main"));
        let report = AccountPipeline::new(gateway, &settings, "main").run(now).await;
        (report, notifier.sent())
    }

    #[test]
    fn lottery_mode_gates_on_weekday() {
        assert!(LotteryMode::Auto.applies(Weekday::Wed, Weekday::Wed));
        assert!(!LotteryMode::Auto.applies(Weekday::Wed, Weekday::Thu));
        assert!(LotteryMode::Always.applies(Weekday::Wed, Weekday::Thu));
        assert!(!LotteryMode::Never.applies(Weekday::Wed, Weekday::Wed));
    }

    #[tokio::test]
    async fn full_report_on_member_day() {
        let transport = healthy();
        let (report, sent) = run(&transport, LotteryMode::Auto, wednesday()).await;
        assert!(!report.abandoned);
        assert_eq!(
            report.lines,
            vec![
                "👤 Account 1 (main) (phone: 138****8888)",
                "🕕 Processed at: 2026-10-14 08:30:00",
                "📌 Check-in: checked in",
                "📅 Checked in 30 days in total",
                "⭐ Tier: Gold",
                "💰 Points: 320",
                "📈 Growth: 1500 (500 to next tier)",
                "\n--- Member-day lottery ---",
                "🎲 Shared draw: 10积分",
                "🎲 Points draw: 积分不足",
                "--------------------------",
                "\n--- 🎟️ Unused coupons ---",
                "- 5元券",
                "-----------------------",
            ]
        );
        assert!(sent.is_empty());
    }

    #[tokio::test]
    async fn no_lottery_on_other_days() {
        let transport = healthy();
        let (report, _) = run(&transport, LotteryMode::Auto, thursday()).await;
        assert!(!report.text().contains("lottery"));
        assert_eq!(transport.count("game/getById/G1/0"), 0);
        assert_eq!(transport.count("shareRecords/save"), 0);
    }

    #[tokio::test]
    async fn identity_failure_short_circuits() {
        let transport = ScriptedTransport::new().reply(
            "member/getAppById",
            json!({"code": 401, "successful": false, "msg": "登录已失效"}),
        );
        let (report, sent) = run(&transport, LotteryMode::Always, wednesday()).await;
        assert!(report.abandoned);
        assert_eq!(report.lines.len(), 3);
        assert_eq!(
            report.lines[2],
            "❌ Error: failed to resolve account (token rejected: 登录已失效)"
        );
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("Account 1 (main)"));
    }

    #[tokio::test]
    async fn later_failures_degrade_but_continue() {
        let transport = ScriptedTransport::new()
            .reply("member/getAppById", replies::member("1001"))
            .fail("sign/clientSignIn", ApiError::Timeout)
            .fail("sign/appSignCount", ApiError::Http { status: 502 })
            .reply(
                "member/getByMemberLevelDetailApp/1001",
                replies::ok(json!({"memberLevelName": 7})),
            )
            .empty("member/getCopuonsPageList");
        let (report, _) = run(&transport, LotteryMode::Never, wednesday()).await;
        assert!(!report.abandoned);
        assert_eq!(
            report.lines[2..],
            [
                "📌 Check-in failed: request failed (request timed out)",
                "⚠️ Check-in count unavailable",
                "⚠️ Profile details unavailable",
                "🎟️ No unused coupons",
            ]
        );
    }
}
