use chrono::{DateTime, Days, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::fixture::Fixture;

pub const DEFAULT_WINDOW_DAYS: u32 = 7;
const WEEK_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Today,
    Tomorrow,
    Week,
    Default,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 4] = [
        TimeWindow::Default,
        TimeWindow::Today,
        TimeWindow::Tomorrow,
        TimeWindow::Week,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "today" => Some(Self::Today),
            "tomorrow" => Some(Self::Tomorrow),
            "week" => Some(Self::Week),
            "default" | "upcoming" => Some(Self::Default),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Week => "week",
            Self::Default => "default",
        }
    }

    pub fn label(self, default_days: u32) -> String {
        match self {
            Self::Today => "Today".to_string(),
            Self::Tomorrow => "Tomorrow".to_string(),
            Self::Week => "This week".to_string(),
            Self::Default => format!("Next {default_days} days"),
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|w| *w == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Inclusive day range relative to `today`.
    pub fn day_range(self, today: NaiveDate, default_days: u32) -> (NaiveDate, NaiveDate) {
        let plus = |n: u32| today.checked_add_days(Days::new(n as u64)).unwrap_or(today);
        match self {
            Self::Today => (today, today),
            Self::Tomorrow => (plus(1), plus(1)),
            Self::Week => (today, plus(WEEK_DAYS)),
            Self::Default => (today, plus(default_days)),
        }
    }
}

/// Keeps the fixtures whose kickoff falls on a calendar day inside the
/// window, with days taken in `now`'s timezone. Both bounds are inclusive.
pub fn filter_by_window_at<'a, Tz: TimeZone>(
    fixtures: &'a [Fixture],
    window: TimeWindow,
    now: &DateTime<Tz>,
    default_days: u32,
) -> Vec<&'a Fixture> {
    let tz = now.timezone();
    let (start, end) = window.day_range(now.date_naive(), default_days);
    fixtures
        .iter()
        .filter(|f| {
            let day = f.kickoff_in(&tz).date_naive();
            day >= start && day <= end
        })
        .collect()
}

pub fn filter_by_window(
    fixtures: &[Fixture],
    window: TimeWindow,
    default_days: u32,
) -> Vec<&Fixture> {
    filter_by_window_at(fixtures, window, &Local::now(), default_days)
}
