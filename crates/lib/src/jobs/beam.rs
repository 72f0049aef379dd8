//! Beam task API client.
//! POST to the app endpoint creates a task; GET /v1/task/{id}/status/ reports progress.

use crate::config::JobsConfig;
use crate::jobs::types::{JobError, SubmitResponse, TaskStatusResponse};
use crate::jobs::JobService;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;

/// Client for the Beam task API. Cheap to clone; shares the connection pool.
#[derive(Clone)]
pub struct BeamClient {
    client: reqwest::Client,
    auth_header: String,
    submit_url: String,
    status_url: String,
    task_url: String,
}

fn fill(template: &str, endpoint: &str, task_id: &str) -> String {
    template
        .replace("{endpoint}", endpoint)
        .replace("{task_id}", task_id)
}

impl BeamClient {
    pub fn new(config: &JobsConfig, auth_token: &str) -> Result<Self, JobError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            auth_header: format!("Basic {}", auth_token),
            submit_url: config.submit_url.clone(),
            status_url: config.status_url.clone(),
            task_url: config.task_url.clone(),
        })
    }
}

#[async_trait]
impl JobService for BeamClient {
    /// POST {"prompt": ...} to the endpoint. Only 200 counts as accepted.
    async fn submit(&self, endpoint: &str, prompt: &str) -> Result<String, JobError> {
        let url = fill(&self.submit_url, endpoint, "");
        let res = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.auth_header)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;
        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            return Err(JobError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = res.text().await?;
        let data: SubmitResponse =
            serde_json::from_str(&text).map_err(|e| JobError::Decode(e.to_string()))?;
        log::debug!("beam: submitted task {} to {}", data.task_id, endpoint);
        Ok(data.task_id)
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, JobError> {
        let url = fill(&self.status_url, "", task_id);
        let res = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(JobError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|e| JobError::Decode(e.to_string()))
    }

    fn task_url(&self, endpoint: &str, task_id: &str) -> String {
        fill(&self.task_url, endpoint, task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::TaskStatus;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> BeamClient {
        let config = JobsConfig {
            submit_url: format!("{}/apps/{{endpoint}}", server.url()),
            status_url: format!("{}/v1/task/{{task_id}}/status/", server.url()),
            ..JobsConfig::default()
        };
        BeamClient::new(&config, "dG9rZW4=").unwrap()
    }

    #[tokio::test]
    async fn submit_returns_task_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/apps/sdxl-app")
            .match_header("authorization", "Basic dG9rZW4=")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({ "prompt": "a red fox" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"task_id": "abc123"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let task_id = client.submit("sdxl-app", "a red fox").await.unwrap();
        assert_eq!(task_id, "abc123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_rejects_non_ok_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/apps/sdxl-app")
            .with_status(201)
            .with_body(r#"{"task_id": "abc123"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.submit("sdxl-app", "a red fox").await.unwrap_err();
        assert!(matches!(err, JobError::Status { status: 201, .. }));
    }

    #[tokio::test]
    async fn submit_server_error_includes_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/apps/sdxl-app")
            .with_status(500)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.submit("sdxl-app", "a red fox").await.unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn submit_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/apps/sdxl-app")
            .with_status(200)
            .with_body(r#"{"id": "abc123"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.submit("sdxl-app", "a red fox").await.unwrap_err();
        assert!(matches!(err, JobError::Decode(_)));
    }

    #[tokio::test]
    async fn task_status_parses_outputs() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/task/abc123/status/")
            .match_header("authorization", "Basic dG9rZW4=")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "status": "COMPLETE",
                    "outputs": { "./output.png": { "url": "https://x/img.png" } }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let res = client.task_status("abc123").await.unwrap();
        assert_eq!(res.status, TaskStatus::Complete);
        assert_eq!(res.output_url("./output.png"), Some("https://x/img.png"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn task_status_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/task/abc123/status/")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.task_status("abc123").await.unwrap_err();
        assert!(matches!(err, JobError::Status { status: 404, .. }));
    }

    #[test]
    fn default_task_url() {
        let client = BeamClient::new(&JobsConfig::default(), "t").unwrap();
        assert_eq!(
            client.task_url("sdxl-app", "abc123"),
            "https://www.beam.cloud/apps/sdxl-app/tasks/abc123"
        );
    }
}
