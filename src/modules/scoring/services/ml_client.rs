use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::features::MlScoringRequest;
use crate::core::{AppError, Result};
use crate::modules::scoring::models::ScoreComponents;

/// Port onto the external ML scoring service
#[async_trait]
pub trait ExternalScoringClient: Send + Sync {
    /// Returns the raw prediction or fails with `AppError::ExternalService`
    async fn predict(&self, request: &MlScoringRequest) -> Result<MlScoringResponse>;
}

/// Response contract of the ML scoring service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlScoringResponse {
    /// Probability-like score in [0, 1]
    pub prediction: f64,
    pub model_version: String,
    pub confidence: f64,
    #[serde(default)]
    pub component_scores: Option<ScoreComponents>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// reqwest-based client with a bounded request timeout
pub struct HttpScoringClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpScoringClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build ML client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn predict_url(&self) -> String {
        format!("{}/predict", self.base_url)
    }
}

#[async_trait]
impl ExternalScoringClient for HttpScoringClient {
    async fn predict(&self, request: &MlScoringRequest) -> Result<MlScoringResponse> {
        let url = self.predict_url();

        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::external(format!("ML scoring request timed out: {}", e))
            } else {
                AppError::external(format!("ML scoring request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(AppError::external(format!(
                "ML scoring service error {}: {}",
                status, error_body
            )));
        }

        let body: MlScoringResponse = response
            .json()
            .await
            .map_err(|e| AppError::external(format!("Failed to parse ML response: {}", e)))?;

        if !(0.0..=1.0).contains(&body.prediction) || !body.prediction.is_finite() {
            return Err(AppError::external(format!(
                "ML prediction {} outside [0, 1]",
                body.prediction
            )));
        }

        tracing::debug!(
            company_id = %request.company_id,
            model_version = %body.model_version,
            prediction = body.prediction,
            "ML prediction received"
        );

        Ok(body)
    }
}
