use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamRef {
    pub team_id: u32,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl TeamRef {
    pub fn new(team_id: u32, name: &str) -> Self {
        Self {
            team_id,
            name: name.to_string(),
            logo_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixtureStatus {
    NotStarted,
    FirstHalf,
    HalfTime,
    SecondHalf,
    ExtraTime,
    Penalties,
    Finished,
    Postponed,
    Cancelled,
    Unknown,
}

impl FixtureStatus {
    pub fn from_short(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "TBD" | "NS" => Self::NotStarted,
            "1H" | "LIVE" => Self::FirstHalf,
            "HT" => Self::HalfTime,
            "2H" => Self::SecondHalf,
            "ET" | "BT" => Self::ExtraTime,
            "P" => Self::Penalties,
            "FT" | "AET" | "PEN" => Self::Finished,
            "PST" => Self::Postponed,
            "CANC" | "ABD" | "AWD" | "WO" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            Self::FirstHalf | Self::HalfTime | Self::SecondHalf | Self::ExtraTime | Self::Penalties
        )
    }

    pub fn is_eligible(self) -> bool {
        self == Self::NotStarted || self.is_in_progress()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::FirstHalf => "1st half",
            Self::HalfTime => "Half time",
            Self::SecondHalf => "2nd half",
            Self::ExtraTime => "Extra time",
            Self::Penalties => "Penalties",
            Self::Finished => "Finished",
            Self::Postponed => "Postponed",
            Self::Cancelled => "Cancelled",
            Self::Unknown => "To be confirmed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    pub home: Option<u8>,
    pub away: Option<u8>,
}

impl Goals {
    pub fn both(&self) -> Option<(u8, u8)> {
        Some((self.home?, self.away?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture_id: u64,
    pub kickoff: DateTime<Utc>,
    #[serde(default)]
    pub venue_name: Option<String>,
    pub status: FixtureStatus,
    /// Provider's long status text, used when the short code is unmapped.
    #[serde(default)]
    pub status_long: Option<String>,
    pub home_team: TeamRef,
    pub away_team: TeamRef,
    pub league_key: String,
    #[serde(default)]
    pub goals: Goals,
}

impl Fixture {
    pub fn is_eligible(&self) -> bool {
        self.status.is_eligible()
    }

    pub fn status_label(&self) -> &str {
        if self.status == FixtureStatus::Unknown {
            if let Some(long) = self.status_long.as_deref().filter(|s| !s.trim().is_empty()) {
                return long;
            }
        }
        self.status.label()
    }

    pub fn involves(&self, team_name: &str) -> bool {
        self.home_team.name == team_name || self.away_team.name == team_name
    }

    pub fn title(&self) -> String {
        format!("{} vs {}", self.home_team.name, self.away_team.name)
    }

    pub fn kickoff_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Tz> {
        self.kickoff.with_timezone(tz)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueFixtureSet {
    pub league_key: String,
    pub fixtures: Vec<Fixture>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// True while the fixtures come from the built-in fallback dataset.
    pub synthetic: bool,
}

impl LeagueFixtureSet {
    pub fn empty(league_key: &str) -> Self {
        Self {
            league_key: league_key.to_string(),
            fixtures: Vec::new(),
            last_refreshed_at: None,
            synthetic: false,
        }
    }

    pub fn is_populated(&self) -> bool {
        self.last_refreshed_at.is_some()
    }

    pub fn eligible(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures.iter().filter(|f| f.is_eligible())
    }

    pub fn find(&self, fixture_id: u64) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.fixture_id == fixture_id)
    }
}

#[cfg(test)]
mod tests {
    use super::FixtureStatus;

    #[test]
    fn short_codes_map_to_status() {
        assert_eq!(FixtureStatus::from_short("NS"), FixtureStatus::NotStarted);
        assert_eq!(FixtureStatus::from_short("ht"), FixtureStatus::HalfTime);
        assert_eq!(FixtureStatus::from_short("PEN"), FixtureStatus::Finished);
        assert_eq!(FixtureStatus::from_short("PST"), FixtureStatus::Postponed);
        assert_eq!(FixtureStatus::from_short("CANC"), FixtureStatus::Cancelled);
        assert_eq!(FixtureStatus::from_short("SUSP"), FixtureStatus::Unknown);
    }

    #[test]
    fn only_upcoming_and_live_are_eligible() {
        assert!(FixtureStatus::NotStarted.is_eligible());
        assert!(FixtureStatus::Penalties.is_eligible());
        assert!(!FixtureStatus::Finished.is_eligible());
        assert!(!FixtureStatus::Postponed.is_eligible());
        assert!(!FixtureStatus::Cancelled.is_eligible());
        assert!(!FixtureStatus::Unknown.is_eligible());
    }
}
