use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

pub const REVENUECAT_API_URL: &str = "https://api.revenuecat.com";

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("subscription lookup failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("subscription lookup returned status {0}")]
    Status(StatusCode),
    #[error("invalid subscription lookup url: {0}")]
    Url(String),
}

#[async_trait]
pub trait SubscriptionProvider: Send + Sync {
    async fn is_subscribed(&self, user_id: &str) -> Result<bool, SubscriptionError>;
}

/// Used when no subscription backend is configured.
pub struct NoSubscriptions;

#[async_trait]
impl SubscriptionProvider for NoSubscriptions {
    async fn is_subscribed(&self, _user_id: &str) -> Result<bool, SubscriptionError> {
        Ok(false)
    }
}

pub struct RevenueCatClient {
    client: reqwest::Client,
    api_key: String,
    entitlement: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevenueCatSubscriberResponse {
    pub subscriber: RevenueCatSubscriber,
}

#[derive(Debug, Deserialize)]
pub struct RevenueCatSubscriber {
    #[serde(default)]
    pub entitlements: HashMap<String, RevenueCatEntitlement>,
}

#[derive(Debug, Deserialize)]
pub struct RevenueCatEntitlement {
    /// `None` for lifetime entitlements.
    pub expires_date: Option<DateTime<Utc>>,
}

impl RevenueCatClient {
    pub fn new(api_key: &str, entitlement: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            entitlement,
        }
    }

    fn subscriber_url(user_id: &str) -> Result<Url, SubscriptionError> {
        let mut url =
            Url::parse(REVENUECAT_API_URL).map_err(|e| SubscriptionError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SubscriptionError::Url(REVENUECAT_API_URL.to_string()))?
            .pop_if_empty()
            .extend(["v1", "subscribers", user_id]);

        Ok(url)
    }
}

#[async_trait]
impl SubscriptionProvider for RevenueCatClient {
    async fn is_subscribed(&self, user_id: &str) -> Result<bool, SubscriptionError> {
        let url = Self::subscriber_url(user_id)?;
        let res = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(SubscriptionError::Status(res.status()));
        }

        let response: RevenueCatSubscriberResponse = res.json().await?;

        Ok(has_active_entitlement(
            &response.subscriber,
            self.entitlement.as_deref(),
            Utc::now(),
        ))
    }
}

pub fn has_active_entitlement(
    subscriber: &RevenueCatSubscriber,
    entitlement: Option<&str>,
    now: DateTime<Utc>,
) -> bool {
    subscriber
        .entitlements
        .iter()
        .filter(|(id, _)| entitlement.map_or(true, |wanted| wanted == id.as_str()))
        .any(|(_, e)| e.expires_date.map_or(true, |expires| expires > now))
}
