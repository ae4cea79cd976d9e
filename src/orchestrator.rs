use chrono::{Local, NaiveDateTime};
use tracing::{Instrument, error, info, info_span, warn};

use crate::accounts::{AccountEntry, Credential};
use crate::api::{Connector, Gateway};
use crate::notify::{NotificationBatcher, Notifier};
use crate::pipeline::{AccountPipeline, AccountReport, PipelineSettings, account_name};
use crate::tasks::{coupons, identity};
use crate::ui::RunProgress;

const NO_ACCOUNTS_TITLE: &str = "❌ Weaiove configuration error";
const NO_ACCOUNTS_BODY: &str =
    "No valid account configuration found. Check WEAIOVE_ACCOUNTS (token|label@token|label).";

/// Counts for one pass over the account list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    /// Accounts whose identity resolved and whose steps ran.
    pub succeeded: usize,
    /// Valid entries that stopped early.
    pub failed: usize,
    pub malformed: usize,
    pub notifications: usize,
}

/// Drives every configured account through its pipeline, strictly in input
/// order, and feeds the reports to the notification batcher.
pub struct Orchestrator<C, N> {
    connector: C,
    notifier: N,
    settings: PipelineSettings,
    chunk_size: usize,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl<C: Connector, N: Notifier> Orchestrator<C, N> {
    pub fn new(connector: C, notifier: N, settings: PipelineSettings, chunk_size: usize) -> Self {
        Self {
            connector,
            notifier,
            settings,
            chunk_size,
            clock: local_now,
        }
    }

    /// Replaces the wall clock used for report timestamps and the member-day check.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(&self, entries: &[AccountEntry], progress: &RunProgress) -> RunSummary {
        let total = entries.len();
        let mut summary = RunSummary {
            total,
            ..RunSummary::default()
        };
        if total == 0 {
            error!("no accounts configured");
            self.notifier.notify(NO_ACCOUNTS_TITLE, NO_ACCOUNTS_BODY).await;
            return summary;
        }
        info!(total, chunk_size = self.chunk_size, "processing accounts");

        let mut batcher = NotificationBatcher::new(self.chunk_size);
        for (position, entry) in entries.iter().enumerate() {
            let index = position + 1;
            match entry {
                AccountEntry::Malformed(raw) => {
                    error!(index, raw = %raw, "malformed account entry skipped");
                    progress.account(index, "malformed");
                    summary.malformed += 1;
                    batcher.append(format!("Account {index}: malformed configuration, skipped"));
                }
                AccountEntry::Valid(credential) => {
                    progress.account(index, credential.label());
                    let span = info_span!("account", index, label = %credential.label());
                    let report = self.process(index, credential).instrument(span).await;
                    if report.abandoned {
                        summary.failed += 1;
                    } else {
                        summary.succeeded += 1;
                    }
                    batcher.append(report.text());
                }
            }
            batcher.maybe_flush(&self.notifier, index, total).await;
        }
        summary.notifications = batcher.flushed();

        if summary.malformed == total {
            warn!("every account entry is malformed");
            self.notifier.notify(NO_ACCOUNTS_TITLE, NO_ACCOUNTS_BODY).await;
        }
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            malformed = summary.malformed,
            "all accounts processed"
        );
        summary
    }

    async fn process(&self, index: usize, credential: &Credential) -> AccountReport {
        let name = account_name(index, credential.label());
        info!(account = %name, "account started");

        let transport = match self.connector.connect(credential) {
            Ok(transport) => transport,
            Err(err) => {
                error!(account = %name, error = %err, "could not build client");
                return AccountReport {
                    lines: vec![
                        format!("👤 {name}"),
                        format!("❌ Error: could not prepare client ({err})"),
                    ],
                    abandoned: true,
                };
            }
        };
        let gateway = Gateway::new(transport, &self.notifier, name);
        AccountPipeline::new(gateway, &self.settings, credential.label())
            .run((self.clock)())
            .await
    }

    /// Coupon-only pass: one notification per account that holds unused
    /// coupons. Malformed entries are counted and skipped.
    pub async fn scan_coupons(&self, entries: &[AccountEntry], progress: &RunProgress) -> RunSummary {
        let mut summary = RunSummary {
            total: entries.len(),
            ..RunSummary::default()
        };

        for (position, entry) in entries.iter().enumerate() {
            let index = position + 1;
            let Some(credential) = entry.credential() else {
                progress.account(index, "malformed");
                summary.malformed += 1;
                continue;
            };
            progress.account(index, credential.label());
            let span = info_span!("account", index, label = %credential.label());
            let sent = self.scan_one(index, credential).instrument(span).await;
            match sent {
                Some(notified) => {
                    summary.succeeded += 1;
                    summary.notifications += usize::from(notified);
                }
                None => summary.failed += 1,
            }
        }

        if summary.total == summary.malformed {
            self.notifier.notify(NO_ACCOUNTS_TITLE, NO_ACCOUNTS_BODY).await;
        }
        summary
    }

    // None when the account could not be resolved, otherwise whether a
    // notification went out.
    async fn scan_one(&self, index: usize, credential: &Credential) -> Option<bool> {
        let name = account_name(index, credential.label());
        let transport = self
            .connector
            .connect(credential)
            .inspect_err(|err| error!(account = %name, error = %err, "could not build client"))
            .ok()?;
        let gateway = Gateway::new(transport, &self.notifier, name.clone());
        let handle = identity::resolve(&gateway, credential.label())
            .await
            .inspect_err(|err| warn!(account = %name, error = %err, "identity lookup failed"))
            .ok()?;

        let names = coupons::list_unused(&gateway, &handle, self.settings.coupon_page_size).await;
        if names.is_empty() {
            return Some(false);
        }
        let title = format!("🎟️ {name} holds {} unused coupons", names.len());
        let body = names
            .iter()
            .map(|n| format!("- {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        gateway.escalate(&title, &body).await;
        Some(true)
    }
}
