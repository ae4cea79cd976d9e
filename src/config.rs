//! Configuration loaded from `weaiove.toml`.
//!
//! [`AppConfig`] holds every tunable. Keys missing from the file use defaults.
//! `WEAIOVE_ACCOUNTS`, `NOTIFY_CHUNK_SIZE`, `BARK_KEY` and `BARK_SERVER` take
//! precedence over the file. Inner components never read the environment;
//! they receive the value objects built here.

use std::path::Path;

use chrono::Weekday;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::error::AppError;

pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Raw account list, `token|label@token|label`.
    #[serde(default)]
    pub accounts: String,

    /// Accounts per aggregated notification. `None` when the configured value
    /// is not an integer. Validated by [`AppConfig::chunk_size`].
    #[serde(default = "default_chunk_size", deserialize_with = "lenient_int")]
    pub notify_chunk_size: Option<i64>,

    /// Page size used when listing unused coupons.
    #[serde(default = "default_coupon_page_size")]
    pub coupon_page_size: u32,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub lottery: LotteryConfig,

    #[serde(default)]
    pub bark: BarkConfig,
}

/// Host and identity constants shared by every account.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub tenant_id: String,
    pub plaza_id: String,
    pub app_key: String,
    pub user_agent: String,
    /// Per-call timeout. Calls are never retried.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://vip.weaiove.com/api/minpro-api".into(),
            tenant_id: "1585937717626433537".into(),
            plaza_id: "1719238954936242177".into(),
            app_key: "wx360959f2f6ecfb97".into(),
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 16_4_1 like Mac OS X) AppleWebKit/605.1.15 \
                         (KHTML, like Gecko) Mobile/15E148 MicroMessenger/8.0.56(0x1800383b) \
                         NetType/WIFI Language/zh_CN"
                .into(),
            timeout_secs: 20,
        }
    }
}

/// Which call the platform is assumed to deduct points on for exchange draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeDeduction {
    Precheck,
    Draw,
}

/// Member-day lottery tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    /// Day of week the lottery runs on in `auto` mode.
    pub weekday: Weekday,
    pub max_shared_draws: u32,
    pub max_exchange_draws: u32,
    /// Fixed campaign id, used directly or as the fallback of the dynamic lookup.
    pub campaign_id: Option<String>,
    /// Look the campaign id up from the advertisement list first.
    pub dynamic_campaign: bool,
    pub advert_code: String,
    pub draw_delay_ms: u64,
    pub share_settle_ms: u64,
    pub exchange_deduction: ExchangeDeduction,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            weekday: Weekday::Wed,
            max_shared_draws: 7,
            max_exchange_draws: 5,
            campaign_id: Some("1899380877012918273".into()),
            dynamic_campaign: false,
            advert_code: "HOP01".into(),
            draw_delay_ms: 500,
            share_settle_ms: 1000,
            exchange_deduction: ExchangeDeduction::Draw,
        }
    }
}

/// Bark push channel. Without a key, notifications go to the log channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BarkConfig {
    pub key: Option<String>,
    pub server: String,
    pub group: Option<String>,
}

impl Default for BarkConfig {
    fn default() -> Self {
        Self {
            key: None,
            server: "https://api.day.app".into(),
            group: Some("weaiove".into()),
        }
    }
}

// Accounts per aggregated notification unless configured otherwise.
fn default_chunk_size() -> Option<i64> {
    Some(DEFAULT_CHUNK_SIZE as i64)
}

// Integers and integer strings are kept; anything else becomes `None`.
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match toml::Value::deserialize(deserializer)? {
        toml::Value::Integer(n) => Some(n),
        toml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn default_coupon_page_size() -> u32 {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            accounts: String::new(),
            notify_chunk_size: default_chunk_size(),
            coupon_page_size: default_coupon_page_size(),
            api: ApiConfig::default(),
            lottery: LotteryConfig::default(),
            bark: BarkConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads `path` (defaults when the file does not exist) and applies the
    /// process environment on top.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<AppConfig>(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overrides fields from `lookup`; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(accounts) = get("WEAIOVE_ACCOUNTS") {
            self.accounts = accounts;
        }
        if let Some(raw) = get("NOTIFY_CHUNK_SIZE") {
            self.notify_chunk_size = raw.trim().parse().ok();
        }
        if let Some(key) = get("BARK_KEY") {
            self.bark.key = Some(key);
        }
        if let Some(server) = get("BARK_SERVER") {
            self.bark.server = server;
        }
    }

    /// The validated chunk size. Non-positive or unparsable values fall back
    /// to the default.
    pub fn chunk_size(&self) -> usize {
        match self.notify_chunk_size.map(usize::try_from) {
            Some(Ok(size)) if size > 0 => size,
            Some(_) => {
                warn!(
                    value = ?self.notify_chunk_size,
                    "notify_chunk_size must be positive, using {DEFAULT_CHUNK_SIZE}"
                );
                DEFAULT_CHUNK_SIZE
            }
            None => {
                warn!("notify_chunk_size is not an integer, using {DEFAULT_CHUNK_SIZE}");
                DEFAULT_CHUNK_SIZE
            }
        }
    }
}
