use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};
use serde_json::Value;

use super::error::ApiError;
use super::types::ApiCall;
use crate::accounts::Credential;
use crate::config::ApiConfig;

/// Sends one call and returns the parsed JSON body, `None` for an empty body.
pub trait ApiTransport {
    async fn send(&self, call: &ApiCall) -> Result<Option<Value>, ApiError>;
}

/// Builds a transport bound to one account's identity headers.
pub trait Connector {
    type Transport: ApiTransport;

    fn connect(&self, credential: &Credential) -> Result<Self::Transport, ApiError>;
}

/// Shares one HTTP client across all accounts of a run.
pub struct HttpConnector {
    http: Client,
    config: ApiConfig,
}

impl HttpConnector {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }
}

impl Connector for HttpConnector {
    type Transport = ApiClient;

    fn connect(&self, credential: &Credential) -> Result<ApiClient, ApiError> {
        ApiClient::with_client(self.http.clone(), &self.config, credential.token())
    }
}

/// The loyalty API as seen by one account. Headers are built once and reused
/// for every call made on behalf of that account.
pub struct ApiClient {
    http: Client,
    base_url: String,
    headers: HeaderMap,
}

impl ApiClient {
    pub fn with_client(http: Client, config: &ApiConfig, token: &str) -> Result<Self, ApiError> {
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers: identity_headers(config, token)?,
        })
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

impl ApiTransport for ApiClient {
    async fn send(&self, call: &ApiCall) -> Result<Option<Value>, ApiError> {
        let mut request = self
            .http
            .request(call.method.clone(), self.url_for(&call.endpoint))
            .headers(self.headers.clone());
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            let preview: String = String::from_utf8_lossy(&bytes).chars().take(200).collect();
            ApiError::MalformedBody(format!("{e} (body starts with {preview:?})"))
        })
    }
}

fn identity_headers(config: &ApiConfig, token: &str) -> Result<HeaderMap, ApiError> {
    let pairs = [
        (HeaderName::from_static("tenant-id"), config.tenant_id.as_str()),
        (HeaderName::from_static("plaza-id"), config.plaza_id.as_str()),
        (HeaderName::from_static("appkey"), config.app_key.as_str()),
        (HeaderName::from_static("member-token"), token),
        (CONTENT_TYPE, "application/json;charset=utf-8"),
        (USER_AGENT, config.user_agent.as_str()),
    ];

    let mut headers = HeaderMap::with_capacity(pairs.len() + 1);
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value)
            .map_err(|_| ApiError::Transport(format!("invalid value for header {name}")))?;
        headers.insert(name, value);
    }
    let referer = format!("https://servicewechat.com/{}/72/page-frame.html", config.app_key);
    let referer = HeaderValue::from_str(&referer)
        .map_err(|_| ApiError::Transport("invalid referer header".into()))?;
    headers.insert(REFERER, referer);
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ApiConfig {
        ApiConfig {
            base_url: format!("{}/api/minpro-api/", server.uri()),
            ..ApiConfig::default()
        }
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::with_client(Client::new(), &config_for(server), "tok-123").unwrap()
    }

    #[tokio::test]
    async fn sends_identity_headers_and_parses_json() {
        let server = MockServer::start().await;
        let config = config_for(&server);
        Mock::given(method("GET"))
            .and(path("/api/minpro-api/member/getAppById"))
            .and(header("member-token", "tok-123"))
            .and(header("tenant-id", config.tenant_id.as_str()))
            .and(header("plaza-id", config.plaza_id.as_str()))
            .and(header("appkey", config.app_key.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0, "successful": true, "data": {"memberId": "7"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server)
            .send(&ApiCall::get("member/getAppById"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body["data"]["memberId"], "7");
    }

    #[tokio::test]
    async fn posts_json_body_with_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/minpro-api/sign/clientSignIn"))
            .and(query_param("v", "2"))
            .and(body_json(serde_json::json!({"channel": 2, "memberId": "7"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0, "successful": true, "msg": "success"
            })))
            .mount(&server)
            .await;

        let call = ApiCall::post(
            "/sign/clientSignIn",
            serde_json::json!({"channel": 2, "memberId": "7"}),
        )
        .with_query("v", "2");
        let body = client_for(&server).send(&call).await.unwrap().unwrap();
        assert_eq!(body["msg"], "success");
    }

    #[tokio::test]
    async fn empty_body_is_an_empty_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/minpro-api/shareRecords/save"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let call = ApiCall::post("shareRecords/save", serde_json::json!({}));
        let body = client_for(&server).send(&call).await.unwrap();
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn non_2xx_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .send(&ApiCall::get("game/residue/1"))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Http { status: 503 });
    }

    #[tokio::test]
    async fn non_json_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .send(&ApiCall::get("game/residue/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedBody(ref m) if m.contains("<html>")));
    }

    #[tokio::test]
    async fn slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"code": 0}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let http = Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let client = ApiClient::with_client(http, &config_for(&server), "tok").unwrap();
        let err = client.send(&ApiCall::get("game/residue/1")).await.unwrap_err();
        assert_eq!(err, ApiError::Timeout);
    }

    #[test]
    fn token_with_control_characters_is_rejected() {
        let err = ApiClient::with_client(Client::new(), &ApiConfig::default(), "bad\ntoken")
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::Transport(ref m) if m.contains("member-token")));
    }
}
