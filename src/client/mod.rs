use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::api::health::HealthReport;
use crate::config::Settings;
use crate::models::envelope::Envelope;
use crate::models::request::{CreateTaskRequest, UpdateTaskRequest};
use crate::models::task::{Task, TaskFilter, TaskStats};

pub mod board;
pub mod form;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Api { status: StatusCode, message: String },
    #[error("response envelope carried no data")]
    MissingData,
}

/// Typed client for the task API.
#[derive(Debug, Clone)]
pub struct TaskClient {
    http: Client,
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        Self::new(settings.api_url.as_str())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ClientError> {
        self.send(self.http.get(self.url("/api/tasks")).query(filter)).await
    }

    pub async fn get_task(&self, id: i32) -> Result<Task, ClientError> {
        self.send(self.http.get(self.task_url(id))).await
    }

    pub async fn create_task(&self, task: &CreateTaskRequest) -> Result<Task, ClientError> {
        self.send(self.http.post(self.url("/api/tasks")).json(task)).await
    }

    pub async fn update_task(
        &self,
        id: i32,
        task: &UpdateTaskRequest,
    ) -> Result<Task, ClientError> {
        self.send(self.http.put(self.task_url(id)).json(task)).await
    }

    pub async fn delete_task(&self, id: i32) -> Result<Task, ClientError> {
        self.send(self.http.delete(self.task_url(id))).await
    }

    pub async fn stats(&self) -> Result<TaskStats, ClientError> {
        self.send(self.http.get(self.url("/api/stats"))).await
    }

    /// The health report is returned for both healthy and unhealthy stores;
    /// only transport failures are errors.
    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn task_url(&self, id: i32) -> String {
        self.url(&format!("/api/tasks/{id}"))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<Envelope<T>>(&body) {
            Ok(envelope) if status.is_success() && envelope.success => {
                envelope.data.ok_or(ClientError::MissingData)
            }
            Ok(envelope) => Err(ClientError::Api {
                status,
                message: envelope
                    .message
                    .or(envelope.error)
                    .unwrap_or_else(|| status.to_string()),
            }),
            Err(err) => {
                tracing::debug!(error = %err, %status, "response was not a task envelope");
                Err(ClientError::Api {
                    status,
                    message: failure_message(status, &body),
                })
            }
        }
    }
}

/// Best-effort message for a response that is not a typed envelope.
fn failure_message(status: StatusCode, body: &[u8]) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_slice(body).ok();
    let from_json = parsed.as_ref().and_then(|value| {
        value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(|field| field.as_str())
            .map(str::to_string)
    });
    from_json
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| status.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = TaskClient::new("http://localhost:3001/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert_eq!(client.task_url(4), "http://localhost:3001/api/tasks/4");
    }

    #[test]
    fn failure_message_prefers_message_then_error() {
        let body = br#"{"success":false,"error":"Internal server error","message":"oops"}"#;
        assert_eq!(failure_message(StatusCode::INTERNAL_SERVER_ERROR, body), "oops");

        let body = br#"{"success":false,"error":"Endpoint not found","path":"/x","method":"GET"}"#;
        assert_eq!(failure_message(StatusCode::NOT_FOUND, body), "Endpoint not found");

        assert_eq!(failure_message(StatusCode::BAD_GATEWAY, b"upstream down"), "upstream down");
        assert_eq!(failure_message(StatusCode::BAD_GATEWAY, b""), "502 Bad Gateway");
    }
}
