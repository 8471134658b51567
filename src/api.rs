//! HTTP side of the station API: login and the task feed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{GanttError, Result};
use crate::pipeline::{parse_payload, FeedPayload};

/// Optional query filters forwarded to the task feed endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedFilter {
    pub aircraft_id: Option<i64>,
    pub work_package_id: Option<i64>,
    pub location_code: Option<String>,
    pub is_historic: Option<bool>,
}

impl FeedFilter {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(id) = self.aircraft_id {
            q.push(("aircraftId", id.to_string()));
        }
        if let Some(id) = self.work_package_id {
            q.push(("aircraftWorkPackageId", id.to_string()));
        }
        if let Some(code) = &self.location_code {
            q.push(("locationCode", code.clone()));
        }
        if let Some(h) = self.is_historic {
            q.push(("isHistoric", h.to_string()));
        }
        q
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiUser {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<ApiUser>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    tasks_url: String,
    login_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(ApiClient {
            http,
            tasks_url: config.endpoint(&config.tasks_path),
            login_url: config.endpoint(&config.login_path),
            token,
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        log::debug!("POST {}", self.login_url);
        let response = self
            .http
            .post(&self.login_url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let response = check_status(response).await?;
        response.json::<LoginResponse>().await.map_err(|e| GanttError::FetchFailure {
            status: None,
            message: format!("unexpected login response: {e}"),
        })
    }

    /// Fetch and decode the task feed.
    ///
    /// Transport errors and non-success statuses fail; a reachable but oddly
    /// shaped body decodes to whatever records it does contain.
    pub async fn fetch_feed(&self, filter: &FeedFilter) -> Result<FeedPayload> {
        log::debug!("GET {}", self.tasks_url);
        let mut request = self.http.get(&self.tasks_url);
        let query = filter.query_pairs();
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GanttError::Unauthorized);
        }
        let response = check_status(response).await?;
        let body = response.text().await?;
        let payload = parse_payload(&body);
        log::info!("fetched {} tasks and {} links", payload.tasks.len(), payload.links.len());
        Ok(payload)
    }
}

/// Turn a non-success status into `FetchFailure`, keeping the server's
/// `error` text when the body carries one.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(text);
        return Err(GanttError::FetchFailure { status: Some(status.as_u16()), message });
    }
    Ok(response)
}
