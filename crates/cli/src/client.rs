//! API client for communicating with the intrusion detector service

use anyhow::{Context, Result};
use ids_lib::{FeatureRecord, InferenceStats, Verdict};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// API client for the detector service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Fetch service health; the body is returned for 503 responses too
    pub async fn health(&self) -> Result<HealthReport> {
        let url = self.base_url.join("healthz").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        response.json().await.context("Failed to parse health response")
    }

    pub async fn predict(&self, features: &FeatureRecord) -> Result<PredictResponse> {
        self.post(
            "v1/predict",
            &PredictRequest {
                features: features.clone(),
            },
        )
        .await
    }

    pub async fn schema(&self) -> Result<SchemaResponse> {
        self.get("v1/schema").await
    }

    pub async fn stats(&self) -> Result<InferenceStats> {
        self.get("v1/stats").await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => anyhow::bail!("API error ({}, {}): {}", status, err.code, err.error),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        response.json().await.context("Failed to parse response")
    }
}

// API request/response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: FeatureRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub verdict: Verdict,
    pub label: i64,
    pub message: String,
    #[serde(default)]
    pub defaulted_features: Vec<String>,
    #[serde(default)]
    pub ignored_features: Vec<String>,
    pub artifact_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub features: Vec<String>,
    pub artifact_version: String,
    pub policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_version: Option<String>,
    #[serde(default)]
    pub components: HashMap<String, ComponentReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_predict_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/predict")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"verdict": "intrusion", "label": 1, "message": "Intrusion Detected",
                    "defaulted_features": ["dst_bytes"], "ignored_features": [],
                    "artifact_version": "v7"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let record = FeatureRecord::new().with("count", 500.0);
        let response = client.predict(&record).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.verdict, Verdict::Intrusion);
        assert_eq!(response.defaulted_features, vec!["dst_bytes"]);
        assert_eq!(response.artifact_version, "v7");
    }

    #[tokio::test]
    async fn test_error_response_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/predict")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "missing features: src_bytes", "code": "invalid_record"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .predict(&FeatureRecord::new().with("count", 5.0))
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("invalid_record"), "{}", err);
        assert!(err.contains("missing features: src_bytes"), "{}", err);
    }

    #[tokio::test]
    async fn test_health_reads_unavailable_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status": "unhealthy", "components": {"artifacts":
                    {"status": "unhealthy", "message": "manifest.json missing",
                     "last_check_timestamp": 1700000000}}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();
        assert_eq!(health.status, "unhealthy");
        assert_eq!(
            health.components["artifacts"].message.as_deref(),
            Some("manifest.json missing")
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/stats")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"total_inferences": 12, "rejected_records": 2, "failed_inferences": 1,
                    "intrusions": 4, "slow_inferences": 0}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let stats = client.stats().await.unwrap();
        assert_eq!(stats.total_inferences, 12);
        assert_eq!(stats.rejected_records, 2);
        assert_eq!(stats.intrusions, 4);
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
