use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Generations a user ran on `day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub count: u32,
    pub day: NaiveDate,
}

impl UsageRecord {
    pub fn new(day: NaiveDate) -> Self {
        Self { count: 0, day }
    }

    pub fn incremented(&self) -> Self {
        Self {
            count: self.count.saturating_add(1),
            day: self.day,
        }
    }
}
