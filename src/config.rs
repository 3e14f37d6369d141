use std::env;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

pub const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";
pub const DEFAULT_API_HOST: &str = "v3.football.api-sports.io";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub api_host: String,
    pub season: Option<u16>,
    pub horizon_days: u32,
    pub next_count: u32,
    pub stale_mins: i64,
    pub refresh_interval: Duration,
    pub default_window_days: u32,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_host: DEFAULT_API_HOST.to_string(),
            season: None,
            horizon_days: 14,
            next_count: 10,
            stale_mins: 30,
            refresh_interval: Duration::from_secs(30 * 60),
            default_window_days: 7,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy` first if `.env` files
    /// should be honoured.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_base_url: get("APISPORTS_BASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or(d.api_base_url),
            api_key: get("APISPORTS_KEY").map(|v| v.trim().to_string()),
            api_host: get("APISPORTS_HOST")
                .map(|v| v.trim().to_string())
                .unwrap_or(d.api_host),
            season: get("APP_SEASON").and_then(|v| v.trim().parse::<u16>().ok()),
            horizon_days: get("FIXTURE_HORIZON_DAYS")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(d.horizon_days)
                .clamp(1, 30),
            next_count: get("FIXTURE_NEXT_COUNT")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(d.next_count)
                .clamp(1, 50),
            stale_mins: get("FIXTURE_STALE_MINS")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(d.stale_mins)
                .max(1),
            refresh_interval: Duration::from_secs(
                get("FIXTURE_POLL_SECS")
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(d.refresh_interval.as_secs())
                    .max(60),
            ),
            default_window_days: get("WINDOW_DEFAULT_DAYS")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(d.default_window_days)
                .clamp(1, 14),
            request_timeout: Duration::from_secs(
                get("HTTP_TIMEOUT_SECS")
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(d.request_timeout.as_secs())
                    .clamp(2, 60),
            ),
        }
    }

    pub fn staleness(&self) -> ChronoDuration {
        ChronoDuration::minutes(self.stale_mins)
    }
}
