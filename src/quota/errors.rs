use axum::http::StatusCode;

use crate::app::models::api_error::ApiError;

#[derive(Debug)]
pub enum QuotaApiError {
    UserIdRequired,
    DailyLimitReached,
    UsageUnavailable,
}

impl QuotaApiError {
    pub fn value(&self) -> ApiError {
        match *self {
            Self::UserIdRequired => ApiError::validation("userId is required."),
            Self::DailyLimitReached => ApiError {
                code: StatusCode::TOO_MANY_REQUESTS,
                error: "QuotaExceeded",
                message: "You have used all of today's free generations. Subscribe for unlimited generations or come back tomorrow.".to_string(),
            },
            Self::UsageUnavailable => ApiError {
                code: StatusCode::TOO_MANY_REQUESTS,
                error: "QuotaUnavailable",
                message: "Unable to verify your remaining generations. Please try again later.".to_string(),
            },
        }
    }
}
