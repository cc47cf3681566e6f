//! HTTP client for communicating with aided.

use aide_common::{
    AideError, ChatRequest, ExecuteRequest, HealthResponse, HistoryResponse, MonitorSnapshot, MonitorStartRequest,
    MonitorStatus, ResultEnvelope, TurnReply,
};
use anyhow::{anyhow, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;

/// Chat turns wait on the oracle and possibly a 30s command
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for communicating with aided
pub struct AideClient {
    http: reqwest::Client,
    base: String,
}

impl AideClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base, path))
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let response = req.send().await.map_err(|e| {
            if e.is_connect() {
                anyhow!(AideError::DaemonUnreachable(self.base.clone()))
            } else {
                anyhow!("Request failed: {}", e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Daemon returned {}: {}", status, body.trim()));
        }
        Ok(response.json().await?)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.send(self.request(Method::GET, "/health")).await
    }

    pub async fn chat(&self, message: &str) -> Result<TurnReply> {
        let body = ChatRequest {
            message: message.to_string(),
        };
        self.send(self.request(Method::POST, "/chat").json(&body)).await
    }

    pub async fn execute(&self, action: &str, params: Map<String, Value>) -> Result<ResultEnvelope> {
        let body = ExecuteRequest {
            action: action.to_string(),
            params,
        };
        self.send(self.request(Method::POST, "/system/execute").json(&body)).await
    }

    pub async fn history(&self) -> Result<HistoryResponse> {
        self.send(self.request(Method::GET, "/memory")).await
    }

    pub async fn forget(&self) -> Result<ResultEnvelope> {
        self.send(self.request(Method::DELETE, "/memory")).await
    }

    pub async fn monitor_start(&self, interval_secs: Option<u64>) -> Result<MonitorStatus> {
        let body = MonitorStartRequest { interval_secs };
        self.send(self.request(Method::POST, "/monitor/start").json(&body)).await
    }

    pub async fn monitor_stop(&self) -> Result<MonitorStatus> {
        self.send(self.request(Method::POST, "/monitor/stop")).await
    }

    pub async fn monitor_status(&self) -> Result<MonitorStatus> {
        self.send(self.request(Method::GET, "/monitor/status")).await
    }

    /// None when nothing has been recorded yet
    pub async fn monitor_latest(&self) -> Result<Option<MonitorSnapshot>> {
        let response = self
            .request(Method::GET, "/monitor/latest")
            .send()
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!("Daemon returned {}", response.status()));
        }
        Ok(Some(response.json().await?))
    }
}
