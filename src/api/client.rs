use crate::config::Config;
use crate::types::{DatasetList, DatasetSample, HealthStatus};
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for the backend's dataset and health endpoints.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    server_url: String,
    api_base: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| anyhow!("failed to build HTTP client: {error}"))?;

        Ok(Self {
            http,
            server_url: config.server_url.clone(),
            api_base: config.api_url(""),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn fetch_sample(&self) -> Result<DatasetSample> {
        self.get_json(&format!("{}/datasets/sample", self.api_base))
            .await
    }

    pub async fn list_datasets(&self) -> Result<DatasetList> {
        self.get_json(&format!("{}/datasets/list", self.api_base))
            .await
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json(&format!("{}/health", self.server_url)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, request_url: &str) -> Result<T> {
        tracing::debug!(url = request_url, "GET");
        let response = self
            .http
            .get(request_url)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, request_url))?;

        response
            .json::<T>()
            .await
            .map_err(|error| anyhow!("unexpected response body from '{request_url}': {error}"))
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    let mapped = if error.is_connect() && is_local_endpoint_url(request_url) {
        anyhow!(
            "cannot reach local backend '{}': {}. Start the backend or update RLMSCOPE_SERVER_URL.",
            request_url,
            error
        )
    } else if error.is_connect() {
        anyhow!("cannot reach backend '{}': {}", request_url, error)
    } else if error.is_timeout() {
        anyhow!("request to '{}' timed out: {}", request_url, error)
    } else if let Some(status) = error.status() {
        anyhow!(
            "backend '{}' returned HTTP {}: {}",
            request_url,
            status,
            error
        )
    } else {
        anyhow!("request to '{}' failed: {}", request_url, error)
    };
    tracing::warn!(url = request_url, error = %mapped, "backend request failed");
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(server_url: &str) -> Config {
        Config {
            server_url: server_url.to_string(),
            stream_url: "ws://localhost:8000/api/rlm/stream".to_string(),
            enable_sub_llm: true,
            connect_timeout: Duration::from_secs(1),
            working_dir: PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn endpoints_hang_off_the_api_prefix() {
        let client = ApiClient::new(&config("http://localhost:8000")).expect("client");
        assert_eq!(client.api_base, "http://localhost:8000/api");
        assert_eq!(client.server_url(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn unreachable_local_backend_reports_hint() {
        // Port 9 (discard) is essentially never bound on test hosts.
        let client = ApiClient::new(&config("http://127.0.0.1:9")).expect("client");
        let error = client.fetch_sample().await.expect_err("no backend listening");
        let message = format!("{error:#}");
        assert!(
            message.contains("127.0.0.1:9/api/datasets/sample"),
            "error should name the request url: {message}"
        );
    }
}
