//! Terminal output: the per-run progress bar, the diagnostic notification
//! block and the `check` listing.
//!
//! Uses `indicatif` for the progress bar and `console` for colours.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::accounts::AccountEntry;
use crate::orchestrator::RunSummary;

// Bar currently on screen; log-channel output is printed around it.
static LIVE_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn live_bar() -> MutexGuard<'static, Option<ProgressBar>> {
    LIVE_BAR.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Progress over the account list.
pub struct RunProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl RunProgress {
    pub fn start(total: usize) -> Self {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Self::live(pb)
    }

    fn live(pb: ProgressBar) -> Self {
        *live_bar() = Some(pb.clone());
        Self::with_bar(pb)
    }

    /// Draws nothing. Used by tests.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(pb: ProgressBar) -> Self {
        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Marks account `index` (1-based) as the one being processed.
    pub fn account(&self, index: usize, label: &str) {
        self.pb.set_position(index.saturating_sub(1) as u64);
        self.pb.set_message(format!("Account {index} ({label})"));
    }

    pub fn finish(&self, summary: &RunSummary) {
        *live_bar() = None;
        self.pb.finish_and_clear();
        let failed = summary.failed + summary.malformed;
        let mark = if failed == 0 {
            self.green.apply_to("✓")
        } else {
            self.yellow.apply_to("!")
        };
        println!(
            "  {mark} {} accounts: {} ok, {} failed, {} malformed, {} notifications sent",
            summary.total, summary.succeeded, summary.failed, summary.malformed, summary.notifications
        );
        if summary.total > 0 && summary.succeeded == 0 {
            println!("  {} No account completed", self.red.apply_to("✗"));
        }
    }
}

/// Prints a notification the way the log channel delivers it. A running
/// progress bar is hidden while the block is written.
pub fn print_notification(title: &str, body: &str) {
    let print = || {
        let bold = Style::new().magenta().bold();
        println!();
        println!("{}", bold.apply_to(format!("─── {title} ───")));
        println!("{body}");
    };
    let bar = live_bar().clone();
    match bar {
        Some(pb) => pb.suspend(print),
        None => print(),
    }
}

/// Lists parsed entries with masked tokens. Returns the number of valid ones.
pub fn print_entries(entries: &[AccountEntry]) -> usize {
    let green = Style::new().green();
    let red = Style::new().red();
    let mut valid = 0;
    for (position, entry) in entries.iter().enumerate() {
        match entry {
            AccountEntry::Valid(credential) => {
                valid += 1;
                println!(
                    "  {} {}. {} ({})",
                    green.apply_to("✓"),
                    position + 1,
                    credential.label(),
                    credential.masked_token()
                );
            }
            AccountEntry::Malformed(raw) => {
                println!(
                    "  {} {}. malformed entry: {raw:?}",
                    red.apply_to("✗"),
                    position + 1
                );
            }
        }
    }
    valid
}
