//! HTTP client for the scheduling API

use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};
use crate::models::{ErrorBody, PendingJob, ScheduleConfirmation, ScheduleRequest};
use chrono::{DateTime, Utc};
use reqwest::{Method, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tourney_domain::TournamentId;
use tracing::{debug, instrument, warn};
use url::Url;

/// Client the web tier uses to keep tournament processing scheduled
///
/// Each call is made exactly once. Callers decide whether a failure is worth
/// retrying with [`SdkError::is_retryable`].
///
/// # Example
///
/// ```rust,no_run
/// use tourney_sdk::SchedulerClient;
/// use tourney_domain::TournamentId;
///
/// # async fn example() -> Result<(), tourney_sdk::SdkError> {
/// let client = SchedulerClient::builder()
///     .base_url("http://scheduler.internal:8080")
///     .build()?;
///
/// let id = TournamentId::parse("spring-open").unwrap();
/// let deadline = chrono::Utc::now() + chrono::Duration::days(7);
/// let confirmation = client.schedule_processing(&id, deadline, None).await?;
/// println!("job {} due at {}", confirmation.job_id, confirmation.due_at);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SchedulerClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
}

impl SchedulerClient {
    /// Create a client with the given configuration
    pub fn new(config: ClientConfig) -> SdkResult<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url).map_err(|e| SdkError::Config {
            message: format!("Invalid base URL: {}", e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SdkError::Config {
                message: format!("Base URL cannot carry a path: {}", config.base_url),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| SdkError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                config,
            }),
        })
    }

    /// Create a client configured from the environment
    pub fn from_env() -> SdkResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Schedule processing for a newly created tournament
    pub async fn schedule_processing(
        &self,
        tournament_id: &TournamentId,
        application_deadline: DateTime<Utc>,
        processing_data: Option<serde_json::Value>,
    ) -> SdkResult<ScheduleConfirmation> {
        self.send_schedule(
            Method::POST,
            tournament_id,
            application_deadline,
            processing_data,
        )
        .await
    }

    /// Replace the scheduled processing after a tournament was edited
    pub async fn reschedule_processing(
        &self,
        tournament_id: &TournamentId,
        application_deadline: DateTime<Utc>,
        processing_data: Option<serde_json::Value>,
    ) -> SdkResult<ScheduleConfirmation> {
        self.send_schedule(
            Method::PUT,
            tournament_id,
            application_deadline,
            processing_data,
        )
        .await
    }

    /// Look up the tournament's outstanding job, if any
    #[instrument(skip(self), fields(tournament_id = %tournament_id))]
    pub async fn pending_job(&self, tournament_id: &TournamentId) -> SdkResult<Option<PendingJob>> {
        let response = self
            .request(Method::GET, &["api", "tournament", tournament_id.as_str(), "job"])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check(response).await?;
        Ok(Some(response.json().await?))
    }

    /// Whether the scheduler API reports itself healthy
    pub async fn health(&self) -> SdkResult<bool> {
        let response = self.request(Method::GET, &["health"]).send().await?;
        Ok(response.status().is_success())
    }

    #[instrument(skip(self, processing_data), fields(tournament_id = %tournament_id))]
    async fn send_schedule(
        &self,
        method: Method,
        tournament_id: &TournamentId,
        application_deadline: DateTime<Utc>,
        processing_data: Option<serde_json::Value>,
    ) -> SdkResult<ScheduleConfirmation> {
        let body = ScheduleRequest {
            tournament_id: tournament_id.clone(),
            application_deadline,
            processing_data,
        };

        let response = self
            .request(method, &["api", "tournament"])
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let confirmation: ScheduleConfirmation = response.json().await?;

        debug!(job_id = %confirmation.job_id, due_at = %confirmation.due_at, "Processing scheduled");
        Ok(confirmation)
    }

    /// Build a request for `segments` below the base URL; each segment is percent-encoded
    fn request(&self, method: Method, segments: &[&str]) -> reqwest::RequestBuilder {
        self.inner.http.request(method, self.endpoint(segments))
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        // Checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Pass 2xx responses through and map everything else to an error
    async fn check(response: Response) -> SdkResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| {
                if text.is_empty() {
                    status.to_string()
                } else {
                    text
                }
            });

        warn!(status = status.as_u16(), message = %message, "Scheduler request failed");
        Err(SdkError::from_status(status.as_u16(), message))
    }
}

/// Builder for [`SchedulerClient`]
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> SdkResult<SchedulerClient> {
        SchedulerClient::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_rejects_invalid_url() {
        let result = SchedulerClient::builder().base_url("::nope").build();
        assert!(matches!(result, Err(SdkError::Config { .. })));
    }

    #[test]
    fn test_endpoint_encodes_tournament_id() {
        let client = SchedulerClient::builder()
            .base_url("http://localhost:9000/scheduler/")
            .build()
            .unwrap();

        let url = client.endpoint(&["api", "tournament", "cup/2024?final#1", "job"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/scheduler/api/tournament/cup%2F2024%3Ffinal%231/job"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_builder_applies_settings() {
        let client = SchedulerClient::builder()
            .base_url("http://localhost:9000/")
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        assert_eq!(client.config().timeout, Duration::from_secs(3));
        assert_eq!(client.config().base_url, "http://localhost:9000/");
    }
}
