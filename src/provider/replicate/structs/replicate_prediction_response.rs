use serde::Deserialize;
use serde_json::Value;

use crate::provider::replicate::enums::replicate_prediction_status::ReplicatePredictionStatus;

#[derive(Debug, Deserialize)]
pub struct ReplicatePredictionResponse {
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
    pub status: ReplicatePredictionStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub logs: Option<String>,
    pub urls: ReplicateUrls,
}

#[derive(Debug, Deserialize)]
pub struct ReplicateUrls {
    pub get: String,
    #[serde(default)]
    pub cancel: Option<String>,
}

impl ReplicatePredictionResponse {
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(error)) => error.to_string(),
            Some(Value::Null) | None => "unknown error".to_string(),
            Some(other) => other.to_string(),
        }
    }
}
