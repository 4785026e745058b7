//! Trading-session window used to gate polling.

use chrono::{Datelike, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// A weekday set intersected with an hour-of-day window `[start_hour, end_hour)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketHours {
    pub start_hour: u32,
    pub end_hour: u32,
    pub days: Vec<Weekday>,
}

impl Default for MarketHours {
    /// Monday to Friday, 09:00 to 15:00.
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 15,
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

impl MarketHours {
    pub fn is_open<T: Datelike + Timelike>(&self, at: &T) -> bool {
        let hour = at.hour();
        self.days.contains(&at.weekday()) && hour >= self.start_hour && hour < self.end_hour
    }
}
