//! In-memory doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;

use crate::accounts::Credential;
use crate::api::{ApiCall, ApiError, ApiTransport, Connector};
use crate::notify::Notifier;

type Scripted = Result<Option<Value>, ApiError>;

/// Answers calls by endpoint from a script. Each endpoint replays its queue in
/// order and repeats the last answer once the queue is down to one. Unknown
/// endpoints answer HTTP 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, endpoint: &str, answer: Scripted) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(answer);
        self
    }

    pub fn reply(self, endpoint: &str, body: Value) -> Self {
        self.push(endpoint, Ok(Some(body)))
    }

    pub fn empty(self, endpoint: &str) -> Self {
        self.push(endpoint, Ok(None))
    }

    pub fn fail(self, endpoint: &str, err: ApiError) -> Self {
        self.push(endpoint, Err(err))
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }
}

impl ApiTransport for ScriptedTransport {
    async fn send(&self, call: &ApiCall) -> Result<Option<Value>, ApiError> {
        self.calls.lock().unwrap().push(call.clone());
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&call.endpoint) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Err(ApiError::Http { status: 404 }),
        }
    }
}

impl ApiTransport for &ScriptedTransport {
    async fn send(&self, call: &ApiCall) -> Result<Option<Value>, ApiError> {
        (**self).send(call).await
    }
}

/// Hands out a scripted transport per token; tokens without a script get an
/// empty one (every call 404s).
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    scripts: Mutex<HashMap<String, ScriptedTransport>>,
}

impl ScriptedConnector {
    pub fn with(self, token: &str, transport: ScriptedTransport) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(token.to_string(), transport);
        self
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&self, credential: &Credential) -> Result<ScriptedTransport, ApiError> {
        Ok(self
            .scripts
            .lock()
            .unwrap()
            .remove(credential.token())
            .unwrap_or_default())
    }
}

/// Keeps every notification as `(title, body)`.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

impl Notifier for &RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) {
        (**self).notify(title, body).await;
    }
}

/// Canned replies for the common endpoints.
pub mod replies {
    use serde_json::{Value, json};

    pub fn ok(data: Value) -> Value {
        json!({"code": 0, "successful": true, "msg": "success", "data": data})
    }

    pub fn fail(code: i64, msg: &str) -> Value {
        json!({"code": code, "successful": false, "msg": msg, "data": null})
    }

    pub fn member(id: &str) -> Value {
        ok(json!({"memberId": id, "memberMobile": "138****8888"}))
    }

    pub fn level() -> Value {
        ok(json!({
            "memberLevelName": "Gold",
            "acctRewardpointsAmt": 320.0,
            "accGrowupAmt": 1500.0,
            "accDifference": 500.0,
            "DGrowupValue": 2000.0
        }))
    }

    pub fn prize(message: &str) -> Value {
        ok(json!({"message": message}))
    }

    pub fn coupons(names: &[&str]) -> Value {
        let items: Vec<Value> = names.iter().map(|n| json!({"couponsName": n})).collect();
        ok(json!({"items": items}))
    }
}
