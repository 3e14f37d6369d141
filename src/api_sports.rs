use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::FixtureSource;
use crate::config::AppConfig;
use crate::error::FetchError;
use crate::fixture::{Fixture, FixtureStatus, Goals, TeamRef};
use crate::http_client::http_client;
use crate::league::League;

const FIXTURES_PATH: &str = "/fixtures";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureQuery {
    Range { from: NaiveDate, to: NaiveDate },
    Next(u32),
}

impl FixtureQuery {
    pub fn params(&self, league: &League) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("league", league.external_id.to_string()),
            ("season", league.season.to_string()),
        ];
        match self {
            FixtureQuery::Range { from, to } => {
                params.push(("from", from.format("%Y-%m-%d").to_string()));
                params.push(("to", to.format("%Y-%m-%d").to_string()));
            }
            FixtureQuery::Next(n) => params.push(("next", n.to_string())),
        }
        params
    }
}

/// Blocking client for the api-sports fixtures endpoint.
#[derive(Debug, Clone)]
pub struct ApiSportsClient {
    base_url: String,
    api_key: Option<String>,
    api_host: String,
    timeout: Duration,
}

impl ApiSportsClient {
    pub fn new(base_url: &str, api_key: Option<String>, api_host: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_host: api_host.to_string(),
            timeout: AppConfig::default().request_timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut client = Self::new(&config.api_base_url, config.api_key.clone(), &config.api_host);
        client.timeout = config.request_timeout;
        client
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn fetch(&self, league: &League, query: FixtureQuery) -> Result<Vec<Fixture>, FetchError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(FetchError::MissingApiKey);
        };
        let client = http_client(self.timeout).map_err(|e| FetchError::Transport(e.to_string()))?;
        let url = format!("{}{FIXTURES_PATH}", self.base_url);
        debug!(league = %league.key, ?query, "requesting fixtures");

        let resp = client
            .get(&url)
            .query(&query.params(league))
            .header("X-RapidAPI-Key", key)
            .header("X-RapidAPI-Host", &self.api_host)
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }
        parse_fixtures_json(&body, &league.key)
    }
}

impl FixtureSource for ApiSportsClient {
    fn fixtures_between(
        &self,
        league: &League,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Fixture>, FetchError> {
        self.fetch(league, FixtureQuery::Range { from, to })
    }

    fn next_fixtures(&self, league: &League, count: u32) -> Result<Vec<Fixture>, FetchError> {
        self.fetch(league, FixtureQuery::Next(count))
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    response: Vec<ApiItem>,
    #[serde(default)]
    errors: Value,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    fixture: ApiFixture,
    teams: ApiTeams,
    #[serde(default)]
    goals: Option<ApiGoals>,
}

#[derive(Debug, Deserialize)]
struct ApiFixture {
    id: u64,
    date: String,
    #[serde(default)]
    venue: Option<ApiVenue>,
    #[serde(default)]
    status: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiVenue {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    short: Option<String>,
    #[serde(default)]
    long: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTeams {
    home: ApiTeam,
    away: ApiTeam,
}

#[derive(Debug, Deserialize)]
struct ApiTeam {
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    logo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiGoals {
    #[serde(default)]
    home: Option<u8>,
    #[serde(default)]
    away: Option<u8>,
}

/// Decodes a `/fixtures` payload. A non-empty `errors` field is a failure
/// even when the HTTP status was 2xx.
pub fn parse_fixtures_json(raw: &str, league_key: &str) -> Result<Vec<Fixture>, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let envelope: ApiEnvelope =
        serde_json::from_str(trimmed).map_err(|e| FetchError::Decode(e.to_string()))?;
    if let Some(message) = errors_message(&envelope.errors) {
        return Err(FetchError::Api(message));
    }

    let mut fixtures = Vec::with_capacity(envelope.response.len());
    for item in envelope.response {
        match build_fixture(item, league_key) {
            Some(fixture) => fixtures.push(fixture),
            None => debug!(league = league_key, "skipping malformed fixture item"),
        }
    }
    Ok(fixtures)
}

fn build_fixture(item: ApiItem, league_key: &str) -> Option<Fixture> {
    let kickoff = DateTime::parse_from_rfc3339(item.fixture.date.trim())
        .ok()?
        .with_timezone(&Utc);
    let home_team = build_team(item.teams.home)?;
    let away_team = build_team(item.teams.away)?;
    let (status, status_long) = match item.fixture.status {
        Some(s) => (
            s.short
                .as_deref()
                .map(FixtureStatus::from_short)
                .unwrap_or(FixtureStatus::Unknown),
            s.long,
        ),
        None => (FixtureStatus::Unknown, None),
    };
    let goals = item
        .goals
        .map(|g| Goals {
            home: g.home,
            away: g.away,
        })
        .unwrap_or_default();

    Some(Fixture {
        fixture_id: item.fixture.id,
        kickoff,
        venue_name: item
            .fixture
            .venue
            .and_then(|v| v.name)
            .filter(|n| !n.trim().is_empty()),
        status,
        status_long,
        home_team,
        away_team,
        league_key: league_key.to_string(),
        goals,
    })
}

fn build_team(team: ApiTeam) -> Option<TeamRef> {
    let name = team.name?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some(TeamRef {
        team_id: team.id.unwrap_or(0),
        name,
        logo_url: team.logo.filter(|l| !l.trim().is_empty()),
    })
}

fn errors_message(errors: &Value) -> Option<String> {
    match errors {
        Value::Array(items) if !items.is_empty() => Some(errors.to_string()),
        Value::Object(map) if !map.is_empty() => Some(errors.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
