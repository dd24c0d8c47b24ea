//! HTTP marketplace gateway implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::MarketplaceConfig;
use crate::metrics;

use super::{
    CampaignPatch, CampaignStatus, CreateCampaignRequest, MarketplaceError, MarketplaceGateway,
    SubmissionStatus, SubmittedTask, TaskRating,
};

/// HTTP client for the micro-task marketplace API.
pub struct HttpMarketplaceClient {
    client: Client,
    config: MarketplaceConfig,
}

impl HttpMarketplaceClient {
    /// Create a new marketplace client from explicit configuration.
    pub fn new(config: MarketplaceConfig) -> Result<Self, MarketplaceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| MarketplaceError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn map_send_error(e: reqwest::Error) -> MarketplaceError {
        if e.is_timeout() {
            MarketplaceError::Timeout
        } else if e.is_connect() {
            MarketplaceError::ConnectionFailed(e.to_string())
        } else {
            MarketplaceError::ApiError(e.to_string())
        }
    }

    /// Translate non-success responses into the error taxonomy.
    async fn check(subject: &str, response: Response) -> Result<Response, MarketplaceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(MarketplaceError::DoesNotExist(subject.to_string())),
            StatusCode::CONFLICT => {
                let detail = serde_json::from_str::<ErrorBody>(&body)
                    .map(|e| e.detail)
                    .unwrap_or(body);
                Err(MarketplaceError::AlreadyInState(detail))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let parsed = serde_json::from_str::<ValidationBody>(&body).unwrap_or_default();
                Err(MarketplaceError::ValidationFailed {
                    field: parsed.field.unwrap_or_else(|| "unknown".to_string()),
                    detail: parsed.detail.unwrap_or(body),
                })
            }
            _ => Err(MarketplaceError::ApiError(format!("HTTP {}: {}", status, body))),
        }
    }

    async fn get(&self, path: &str, subject: &str) -> Result<Response, MarketplaceError> {
        let url = format!("{}{}", self.base_url(), path);
        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::check(subject, response).await
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        subject: &str,
        body: &serde_json::Value,
    ) -> Result<Response, MarketplaceError> {
        let url = format!("{}{}", self.base_url(), path);
        let response = self
            .client
            .request(method, &url)
            .header("X-Api-Key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::check(subject, response).await
    }

    fn record(operation: &str, result: &Result<impl Sized, MarketplaceError>) {
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::MARKETPLACE_REQUESTS
            .with_label_values(&[operation, status])
            .inc();
    }
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: String,
}

#[derive(Debug, Default, Deserialize)]
struct ValidationBody {
    field: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct TaskListResponse {
    tasks: Vec<WireTask>,
}

#[derive(Debug, Deserialize)]
struct WireTask {
    id: String,
    campaign_id: String,
    worker_id: String,
    #[serde(default)]
    proof: String,
    status: SubmissionStatus,
    submitted_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> CampaignStatus {
    match raw {
        "running" => CampaignStatus::Running,
        "paused" => CampaignStatus::Paused,
        "paused_system" => CampaignStatus::PausedSystem,
        "finished" => CampaignStatus::Finished,
        "ended" => CampaignStatus::Ended,
        "not_found" => CampaignStatus::NotFound,
        _ => CampaignStatus::Error,
    }
}

#[async_trait]
impl MarketplaceGateway for HttpMarketplaceClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn create_template(
        &self,
        title: &str,
        body: &str,
    ) -> Result<String, MarketplaceError> {
        let payload = json!({ "title": title, "body": body });
        let result = async {
            let response = self
                .send_json(reqwest::Method::POST, "/api/v2/templates", title, &payload)
                .await?;
            let parsed: IdResponse = response
                .json()
                .await
                .map_err(|e| MarketplaceError::ApiError(e.to_string()))?;
            Ok(parsed.id)
        }
        .await;
        Self::record("create_template", &result);
        result
    }

    async fn update_template(
        &self,
        template_id: &str,
        body: &str,
    ) -> Result<(), MarketplaceError> {
        let payload = json!({ "body": body });
        let path = format!("/api/v2/templates/{}", template_id);
        let result = self
            .send_json(reqwest::Method::PUT, &path, template_id, &payload)
            .await
            .map(|_| ());
        Self::record("update_template", &result);
        result
    }

    async fn create_campaign(
        &self,
        request: CreateCampaignRequest,
    ) -> Result<String, MarketplaceError> {
        let payload = serde_json::to_value(&request)
            .map_err(|e| MarketplaceError::ApiError(e.to_string()))?;
        let result = async {
            let response = self
                .send_json(
                    reqwest::Method::POST,
                    "/api/v2/campaigns",
                    &request.title,
                    &payload,
                )
                .await?;
            let parsed: IdResponse = response
                .json()
                .await
                .map_err(|e| MarketplaceError::ApiError(e.to_string()))?;
            debug!("Created campaign {} ({})", parsed.id, request.title);
            Ok(parsed.id)
        }
        .await;
        Self::record("create_campaign", &result);
        result
    }

    async fn update_campaign(
        &self,
        campaign_id: &str,
        patch: CampaignPatch,
    ) -> Result<(), MarketplaceError> {
        if patch.is_empty() {
            return Ok(());
        }
        let payload = serde_json::to_value(&patch)
            .map_err(|e| MarketplaceError::ApiError(e.to_string()))?;
        let path = format!("/api/v2/campaigns/{}", campaign_id);
        let result = self
            .send_json(reqwest::Method::PATCH, &path, campaign_id, &payload)
            .await
            .map(|_| ());
        Self::record("update_campaign", &result);
        result
    }

    async fn pause_campaign(&self, campaign_id: &str) -> Result<(), MarketplaceError> {
        let path = format!("/api/v2/campaigns/{}/pause", campaign_id);
        let result = self
            .send_json(reqwest::Method::POST, &path, campaign_id, &json!({}))
            .await
            .map(|_| ());
        Self::record("pause_campaign", &result);
        result
    }

    async fn resume_campaign(&self, campaign_id: &str) -> Result<(), MarketplaceError> {
        let path = format!("/api/v2/campaigns/{}/resume", campaign_id);
        let result = self
            .send_json(reqwest::Method::POST, &path, campaign_id, &json!({}))
            .await
            .map(|_| ());
        Self::record("resume_campaign", &result);
        result
    }

    async fn restart_campaign(
        &self,
        campaign_id: &str,
        positions_to_add: u32,
    ) -> Result<(), MarketplaceError> {
        let path = format!("/api/v2/campaigns/{}/restart", campaign_id);
        let payload = json!({ "positions_to_add": positions_to_add });
        let result = self
            .send_json(reqwest::Method::POST, &path, campaign_id, &payload)
            .await
            .map(|_| ());
        Self::record("restart_campaign", &result);
        result
    }

    async fn campaign_status(
        &self,
        campaign_id: &str,
    ) -> Result<CampaignStatus, MarketplaceError> {
        let path = format!("/api/v2/campaigns/{}/status", campaign_id);
        let result = async {
            match self.get(&path, campaign_id).await {
                Ok(response) => {
                    let parsed: StatusResponse = response
                        .json()
                        .await
                        .map_err(|e| MarketplaceError::ApiError(e.to_string()))?;
                    Ok(parse_status(&parsed.status))
                }
                // A forgotten campaign is a status, not a failure.
                Err(MarketplaceError::DoesNotExist(_)) => Ok(CampaignStatus::NotFound),
                Err(e) => Err(e),
            }
        }
        .await;
        Self::record("campaign_status", &result);
        result
    }

    async fn list_submitted_tasks(
        &self,
        campaign_id: &str,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<SubmittedTask>, MarketplaceError> {
        let mut path = format!("/api/v2/campaigns/{}/tasks", campaign_id);
        if let Some(status) = status {
            path.push_str(&format!("?status={}", status.as_str()));
        }
        let result = async {
            let response = self.get(&path, campaign_id).await?;
            let parsed: TaskListResponse = response
                .json()
                .await
                .map_err(|e| MarketplaceError::ApiError(e.to_string()))?;
            Ok(parsed
                .tasks
                .into_iter()
                .map(|t| SubmittedTask {
                    id: t.id,
                    campaign_id: t.campaign_id,
                    worker_id: t.worker_id,
                    proof: t.proof,
                    status: t.status,
                    submitted_at: t.submitted_at,
                })
                .collect())
        }
        .await;
        Self::record("list_submitted_tasks", &result);
        result
    }

    async fn rate_task(
        &self,
        campaign_id: &str,
        task_id: &str,
        rating: TaskRating,
        reason: Option<&str>,
    ) -> Result<(), MarketplaceError> {
        let path = format!("/api/v2/campaigns/{}/tasks/{}/rate", campaign_id, task_id);
        let payload = json!({ "rating": rating.as_str(), "reason": reason });
        let result = self
            .send_json(reqwest::Method::POST, &path, task_id, &payload)
            .await
            .map(|_| ());
        Self::record("rate_task", &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("running"), CampaignStatus::Running);
        assert_eq!(parse_status("paused_system"), CampaignStatus::PausedSystem);
        assert_eq!(parse_status("ended"), CampaignStatus::Ended);
        assert_eq!(parse_status("garbage"), CampaignStatus::Error);
    }

    #[test]
    fn test_client_construction() {
        let config = MarketplaceConfig {
            url: "https://api.taskmarket.example/".to_string(),
            api_key: "k".to_string(),
            timeout_secs: 30,
            campaign_defaults: Default::default(),
        };
        let client = HttpMarketplaceClient::new(config).unwrap();
        assert_eq!(client.base_url(), "https://api.taskmarket.example");
        assert_eq!(client.name(), "http");
    }
}
