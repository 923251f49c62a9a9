use chrono::{NaiveDate, Utc};

pub fn current_time_in_secs() -> i64 {
    Utc::now().timestamp()
}

/// Calendar day that usage counters are bucketed by (UTC).
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
