use axum::http::StatusCode;
use thiserror::Error;

use crate::app::models::api_error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationErrorKind {
    ContentBlocked,
    PaymentRequired,
    GenerationFailed,
    ValidationError,
    Unknown,
}

impl GenerationErrorKind {
    pub fn value(&self) -> &'static str {
        match *self {
            Self::ContentBlocked => "ContentBlocked",
            Self::PaymentRequired => "PaymentRequired",
            Self::GenerationFailed => "GenerationFailed",
            Self::ValidationError => "ValidationError",
            Self::Unknown => "Unknown",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match *self {
            Self::ContentBlocked => StatusCode::BAD_REQUEST,
            Self::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            Self::GenerationFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::ValidationError, message)
    }

    /// Content and billing refusals are definitive.
    pub fn is_retryable(&self) -> bool {
        self.kind == GenerationErrorKind::GenerationFailed
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        ApiError {
            code: e.kind.status_code(),
            error: e.kind.value(),
            message: e.message,
        }
    }
}

/// Raw failure reported by an image provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub struct ErrorRule {
    pub patterns: &'static [&'static str],
    pub kind: GenerationErrorKind,
    pub message: &'static str,
    pub ignore_case: bool,
}

impl ErrorRule {
    fn matching_pattern(&self, message: &str) -> Option<&'static str> {
        self.patterns.iter().copied().find(|pattern| {
            if self.ignore_case {
                message.to_lowercase().contains(&pattern.to_lowercase())
            } else {
                message.contains(pattern)
            }
        })
    }
}

/// Evaluated in order, first match wins.
pub static ERROR_RULES: [ErrorRule; 5] = [
    ErrorRule {
        patterns: &["NSFW content detected"],
        kind: GenerationErrorKind::ContentBlocked,
        message: "Your image or prompt was flagged as inappropriate. Please try a different image or prompt.",
        ignore_case: false,
    },
    ErrorRule {
        patterns: &["flagged as sensitive"],
        kind: GenerationErrorKind::ContentBlocked,
        message: "The generated image was flagged as sensitive. Please try a different prompt.",
        ignore_case: false,
    },
    ErrorRule {
        patterns: &["402"],
        kind: GenerationErrorKind::PaymentRequired,
        message: "Image generation is temporarily unavailable. Please try again later.",
        ignore_case: false,
    },
    ErrorRule {
        patterns: &["Prediction failed"],
        kind: GenerationErrorKind::GenerationFailed,
        message: "Image generation failed. Please try again with a different image or prompt.",
        ignore_case: false,
    },
    ErrorRule {
        patterns: &["429", "rate limit"],
        kind: GenerationErrorKind::GenerationFailed,
        message: "The service is busy right now. Please try again in a moment.",
        ignore_case: true,
    },
];

/// Maps a provider failure onto the error taxonomy. Returns the matched
/// pattern alongside, `None` when nothing matched.
///
/// Patterns are matched case-sensitively; only the throttling rule ignores case.
pub fn classify_provider_error(message: &str) -> (GenerationError, Option<&'static str>) {
    for rule in ERROR_RULES.iter() {
        if let Some(pattern) = rule.matching_pattern(message) {
            return (GenerationError::new(rule.kind, rule.message), Some(pattern));
        }
    }

    (
        GenerationError::new(GenerationErrorKind::Unknown, message),
        None,
    )
}
