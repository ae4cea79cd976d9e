use tracing::info;

use super::Notifier;

/// Visible separator placed between account reports inside one notification.
pub const REPORT_SEPARATOR: &str = "\n\n====================\n\n";

/// Reports delivered together, covering accounts `first..=last` (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChunk {
    pub reports: Vec<String>,
    pub first: usize,
    pub last: usize,
}

impl NotificationChunk {
    pub fn title(&self) -> String {
        format!("💖 Weaiove report (accounts {}-{})", self.first, self.last)
    }

    pub fn body(&self) -> String {
        self.reports.join(REPORT_SEPARATOR)
    }
}

/// Accumulates per-account report text and flushes it in chunks of at most
/// `threshold` accounts. Every appended report is delivered exactly once.
#[derive(Debug)]
pub struct NotificationBatcher {
    pending: Vec<String>,
    range_start: usize,
    threshold: usize,
    flushed: usize,
}

impl NotificationBatcher {
    /// A zero threshold is treated as one.
    pub fn new(threshold: usize) -> Self {
        Self {
            pending: Vec::new(),
            range_start: 1,
            threshold: threshold.max(1),
            flushed: 0,
        }
    }

    pub fn append(&mut self, report: impl Into<String>) {
        self.pending.push(report.into());
    }

    /// Number of notifications sent so far.
    pub fn flushed(&self) -> usize {
        self.flushed
    }

    /// Returns the pending chunk when it is due: it has reached the threshold,
    /// or `current_index` (1-based) is the last account.
    pub fn take_due(&mut self, current_index: usize, total: usize) -> Option<NotificationChunk> {
        if self.pending.is_empty() {
            return None;
        }
        if self.pending.len() < self.threshold && current_index < total {
            return None;
        }
        let chunk = NotificationChunk {
            reports: std::mem::take(&mut self.pending),
            first: self.range_start,
            last: current_index,
        };
        self.range_start = current_index + 1;
        Some(chunk)
    }

    /// Sends the pending chunk through `notifier` if it is due. Returns whether
    /// a notification was sent.
    pub async fn maybe_flush<N: Notifier>(
        &mut self,
        notifier: &N,
        current_index: usize,
        total: usize,
    ) -> bool {
        let Some(chunk) = self.take_due(current_index, total) else {
            return false;
        };
        info!(
            first = chunk.first,
            last = chunk.last,
            reports = chunk.reports.len(),
            "flushing notification chunk"
        );
        notifier.notify(&chunk.title(), &chunk.body()).await;
        self.flushed += 1;
        true
    }
}
