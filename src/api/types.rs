//! Request descriptors and response shapes for the loyalty API.
//!
//! Every endpoint answers with the same envelope (`code`, `successful`, `msg`,
//! `data`). The envelope is decoded first; `data` is only decoded into the
//! endpoint's own type when the envelope reports success, so error replies
//! with an unexpected `data` shape still surface their `msg`.

use reqwest::Method;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One outbound call: method, endpoint path relative to the API base, optional
/// JSON body and query pairs. Identity headers are owned by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl ApiCall {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            endpoint: endpoint.into(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            endpoint: endpoint.into(),
            body: Some(body),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Raw envelope. `data` stays untyped until the reply is known to be a success.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// A decoded reply. `data` is `Some` only for successful replies with a
/// non-null payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<D> {
    pub code: i64,
    pub successful: bool,
    pub msg: String,
    pub data: Option<D>,
}

impl<D> Reply<D> {
    pub fn is_success(&self) -> bool {
        self.code == 0 && self.successful
    }

    /// The platform message, or the numeric code when the message is blank.
    pub fn describe(&self) -> String {
        if self.msg.trim().is_empty() {
            format!("code {}", self.code)
        } else {
            self.msg.clone()
        }
    }
}

/// `member/getAppById`
#[derive(Debug, Clone, Deserialize)]
pub struct MemberSummary {
    #[serde(rename = "memberId", default, deserialize_with = "opt_id")]
    pub member_id: Option<String>,
    #[serde(rename = "memberMobile", default)]
    pub mobile: Option<String>,
}

/// `member/getByMemberLevelDetailApp/{memberId}`
#[derive(Debug, Clone, Deserialize)]
pub struct MemberLevelDetail {
    #[serde(rename = "memberLevelName")]
    pub level_name: String,
    #[serde(rename = "acctRewardpointsAmt")]
    pub points: f64,
    #[serde(rename = "accGrowupAmt")]
    pub growth_total: f64,
    #[serde(rename = "accDifference")]
    pub growth_to_next: f64,
    #[serde(rename = "DGrowupValue", default)]
    pub next_level_growth: Option<f64>,
}

/// One entry of `advertising/getUpList/{code}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Advert {
    #[serde(rename = "jumpUrl", default)]
    pub jump_url: Option<String>,
}

/// `game/getById/{gameId}/0`
#[derive(Debug, Clone, Deserialize)]
pub struct DrawResult {
    #[serde(default)]
    pub message: Option<String>,
}

/// `member/getCopuonsPageList`
#[derive(Debug, Clone, Deserialize)]
pub struct CouponPage {
    #[serde(default)]
    pub items: Option<Vec<CouponItem>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CouponItem {
    #[serde(rename = "couponsName", default)]
    pub name: Option<String>,
}

// Member ids are 19-digit snowflakes; the platform sends them as strings but a
// bare number is accepted too.
fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(s)) if !s.trim().is_empty() => Some(s),
        Some(Id::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
