#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Subscribed,
    Free { remaining: u32 },
    Denied(DenialReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    LimitReached,
    /// Eligibility could not be computed; the guard fails closed.
    CheckFailed,
}

impl QuotaDecision {
    pub fn value(&self) -> String {
        match *self {
            Self::Subscribed => "subscribed".to_string(),
            Self::Free { remaining } => format!("free ({} remaining)", remaining),
            Self::Denied(DenialReason::LimitReached) => "denied (limit reached)".to_string(),
            Self::Denied(DenialReason::CheckFailed) => "denied (check failed)".to_string(),
        }
    }
}
