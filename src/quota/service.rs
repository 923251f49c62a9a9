use std::sync::Arc;

use chrono::NaiveDate;

use crate::app::{
    models::api_error::ApiError,
    util::{
        events::{EventSink, PipelineEvent},
        time,
    },
};

use super::{
    enums::quota_decision::{DenialReason, QuotaDecision},
    errors::QuotaApiError,
    models::usage_record::UsageRecord,
    store::{StoreError, UsageStore},
    subscriptions::SubscriptionProvider,
};

pub const DEFAULT_DAILY_LIMIT: u32 = 5;

/// Gates metered generations: subscribers pass freely, everyone else gets
/// `daily_limit` generations per calendar day.
pub struct QuotaGuard {
    subscriptions: Arc<dyn SubscriptionProvider>,
    store: Arc<dyn UsageStore>,
    events: Arc<dyn EventSink>,
    daily_limit: u32,
}

impl QuotaGuard {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionProvider>,
        store: Arc<dyn UsageStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            subscriptions,
            store,
            events,
            daily_limit: DEFAULT_DAILY_LIMIT,
        }
    }

    pub fn with_daily_limit(mut self, daily_limit: u32) -> Self {
        self.daily_limit = daily_limit;
        self
    }

    pub async fn check(&self, user_id: Option<&str>) -> Result<QuotaDecision, ApiError> {
        self.check_on(user_id, time::today()).await
    }

    pub async fn check_on(
        &self,
        user_id: Option<&str>,
        today: NaiveDate,
    ) -> Result<QuotaDecision, ApiError> {
        let Some(user_id) = user_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Err(QuotaApiError::UserIdRequired.value());
        };

        let subscribed = match self.subscriptions.is_subscribed(user_id).await {
            Ok(subscribed) => subscribed,
            Err(e) => {
                tracing::warn!(%user_id, %e, "subscription lookup failed, treating as unsubscribed");
                false
            }
        };

        let decision = if subscribed {
            QuotaDecision::Subscribed
        } else {
            match self.current_record(user_id, today).await {
                Ok(record) if record.count >= self.daily_limit => {
                    QuotaDecision::Denied(DenialReason::LimitReached)
                }
                Ok(record) => QuotaDecision::Free {
                    remaining: self.daily_limit - record.count,
                },
                Err(e) => {
                    tracing::error!(%user_id, %e, "usage check failed, denying");
                    QuotaDecision::Denied(DenialReason::CheckFailed)
                }
            }
        };

        self.events.emit(PipelineEvent::QuotaDecided {
            user_id: user_id.to_string(),
            decision: decision.value(),
        });

        Ok(decision)
    }

    /// Counts one successful generation. Only call for `QuotaDecision::Free`.
    pub async fn record_usage(&self, user_id: &str) -> Result<UsageRecord, StoreError> {
        self.record_usage_on(user_id, time::today()).await
    }

    pub async fn record_usage_on(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<UsageRecord, StoreError> {
        let record = self.current_record(user_id, today).await?.incremented();
        self.store.set(user_id, &record).await?;

        Ok(record)
    }

    /// Today's record, resetting (and persisting) a missing or stale one.
    async fn current_record(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<UsageRecord, StoreError> {
        match self.store.get(user_id).await? {
            Some(record) if record.day == today => Ok(record),
            _ => {
                let record = UsageRecord::new(today);
                self.store.set(user_id, &record).await?;
                Ok(record)
            }
        }
    }
}
