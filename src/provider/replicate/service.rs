use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde_json::{json, Map, Value};
use tokio::time::sleep;

use crate::provider::{errors::ProviderError, service::ImageProvider};

use super::{
    config::API_URL, enums::replicate_prediction_status::ReplicatePredictionStatus,
    structs::replicate_prediction_response::ReplicatePredictionResponse,
};

/// Seconds Replicate may hold the create call open before answering.
const PREFER_WAIT_SECS: u64 = 60;

pub struct ReplicateClient {
    client: reqwest::Client,
    api_key: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl ReplicateClient {
    pub fn new(api_key: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            timeout,
            poll_interval: Duration::from_secs(1),
        }
    }

    async fn create_prediction(
        &self,
        model: &str,
        input: &Map<String, Value>,
    ) -> Result<ReplicatePredictionResponse, ProviderError> {
        let (url, body) = prediction_request(model, input);

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", format!("wait={}", PREFER_WAIT_SECS))
            .json(&body);

        self.send(request, &url).await
    }

    async fn get_prediction(&self, url: &str) -> Result<ReplicatePredictionResponse, ProviderError> {
        let request = self.client.get(url).bearer_auth(&self.api_key);

        self.send(request, url).await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<ReplicatePredictionResponse, ProviderError> {
        let res = request.send().await.map_err(|e| {
            tracing::warn!("replicate request (1): {:?}", e);
            ProviderError::new(format!("Request to {} failed: {}", url, e))
        })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| {
            tracing::warn!("replicate request (2): {:?}", e);
            ProviderError::new(format!("Request to {} failed: {}", url, e))
        })?;

        if !status.is_success() {
            return Err(ProviderError::new(format!(
                "Request to {} failed with status {} {}: {}",
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                text
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!("replicate request (3): {:?}", text);
            ProviderError::new(format!("Unexpected prediction response: {}", e))
        })
    }

    async fn await_completion(
        &self,
        mut prediction: ReplicatePredictionResponse,
    ) -> Result<ReplicatePredictionResponse, ProviderError> {
        let mut elapsed = Duration::ZERO;

        while !prediction.status.is_terminal() {
            if elapsed >= self.timeout {
                tracing::error!(id = %prediction.id, "await_completion ran out of time");
                return Err(ProviderError::new(format!(
                    "Prediction {} timed out after {}s",
                    prediction.id,
                    self.timeout.as_secs()
                )));
            }

            tracing::debug!(
                id = %prediction.id,
                status = prediction.status.value(),
                "waiting for prediction"
            );
            sleep(self.poll_interval).await;
            elapsed += self.poll_interval;

            prediction = self.get_prediction(&prediction.urls.get).await?;
        }

        Ok(prediction)
    }
}

#[async_trait]
impl ImageProvider for ReplicateClient {
    async fn run(&self, model: &str, input: &Map<String, Value>) -> Result<Value, ProviderError> {
        let prediction = self.create_prediction(model, input).await?;
        let prediction = self.await_completion(prediction).await?;

        into_output(prediction)
    }
}

/// `owner/name:version` pins a version; `owner/name` runs the latest.
pub fn prediction_request(model: &str, input: &Map<String, Value>) -> (String, Value) {
    match model.split_once(':') {
        Some((_, version)) => (
            format!("{}/predictions", API_URL),
            json!({ "version": version, "input": input }),
        ),
        None => (
            format!("{}/models/{}/predictions", API_URL, model),
            json!({ "input": input }),
        ),
    }
}

pub fn into_output(prediction: ReplicatePredictionResponse) -> Result<Value, ProviderError> {
    match prediction.status {
        ReplicatePredictionStatus::Succeeded => Ok(prediction.output.unwrap_or(Value::Null)),
        ReplicatePredictionStatus::Failed => Err(ProviderError::new(format!(
            "Prediction failed: {}",
            prediction.error_message()
        ))),
        ReplicatePredictionStatus::Canceled => Err(ProviderError::new(format!(
            "Prediction {} was canceled",
            prediction.id
        ))),
        status => Err(ProviderError::new(format!(
            "Prediction {} is still {}",
            prediction.id,
            status.value()
        ))),
    }
}
