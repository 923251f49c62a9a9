use std::time::Duration;

use serde::Deserialize;

use crate::{quota::service::DEFAULT_DAILY_LIMIT, DEFAULT_MAX_UPLOAD_BYTES};

#[derive(Debug, Clone, Deserialize)]
pub struct Envy {
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub port: Option<u16>,

    pub replicate_api_key: String,
    pub provider_max_retries: Option<usize>,
    pub provider_timeout_secs: Option<u64>,

    pub revenuecat_api_key: Option<String>,
    pub revenuecat_entitlement: Option<String>,

    pub database_url: Option<String>,
    pub daily_free_limit: Option<u32>,

    pub max_upload_bytes: Option<usize>,
}

fn default_app_env() -> String {
    "development".to_string()
}

impl Envy {
    pub fn daily_limit(&self) -> u32 {
        self.daily_free_limit.unwrap_or(DEFAULT_DAILY_LIMIT)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.unwrap_or(300))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }
}
