//! Outbound notifications.
//!
//! [`Notifier`] is the capability every component reports through. The run
//! picks one [`NotifyChannel`] at startup: Bark push when a key is configured,
//! otherwise the diagnostic log channel.

mod bark;
pub mod batcher;

pub use bark::BarkNotifier;
pub use batcher::NotificationBatcher;

use tracing::{info, warn};

use crate::config::BarkConfig;
use crate::ui;

/// Best-effort delivery of a titled message. Never fails the caller.
pub trait Notifier {
    async fn notify(&self, title: &str, body: &str);
}

/// Writes notifications to the log and the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, body: &str) {
        info!(title, "notification recorded to log");
        ui::print_notification(title, body);
    }
}

pub enum NotifyChannel {
    Bark(BarkNotifier),
    Log(LogNotifier),
}

impl NotifyChannel {
    /// Bark when a key is configured and the server URL is usable, the log
    /// otherwise.
    pub fn from_config(bark: &BarkConfig) -> Self {
        match bark.key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                match BarkNotifier::new(&bark.server, key, bark.group.clone()) {
                    Ok(notifier) => NotifyChannel::Bark(notifier),
                    Err(err) => {
                        warn!(server = %bark.server, error = %err, "Bark channel unavailable, notifications go to the log");
                        NotifyChannel::Log(LogNotifier)
                    }
                }
            }
            _ => {
                info!("no Bark key configured, notifications go to the log");
                NotifyChannel::Log(LogNotifier)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NotifyChannel::Bark(_) => "bark",
            NotifyChannel::Log(_) => "log",
        }
    }
}

impl Notifier for NotifyChannel {
    async fn notify(&self, title: &str, body: &str) {
        match self {
            NotifyChannel::Bark(bark) => bark.notify(title, body).await,
            NotifyChannel::Log(log) => log.notify(title, body).await,
        }
    }
}
