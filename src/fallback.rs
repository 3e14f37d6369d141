use chrono::{DateTime, Duration, Utc};

use crate::fixture::{Fixture, FixtureStatus, Goals, TeamRef};
use crate::league::League;

pub const PLACEHOLDER_HOME: &str = "ALPHA";
pub const PLACEHOLDER_AWAY: &str = "OMEGA";

struct Seed {
    id: u64,
    days_ahead: i64,
    venue: &'static str,
    home: (u32, &'static str),
    away: (u32, &'static str),
}

const LALIGA: &[Seed] = &[
    Seed {
        id: 1001,
        days_ahead: 1,
        venue: "Santiago Bernabéu",
        home: (541, "Real Madrid"),
        away: (529, "FC Barcelona"),
    },
    Seed {
        id: 1002,
        days_ahead: 3,
        venue: "Riyadh Air Metropolitano",
        home: (530, "Atletico Madrid"),
        away: (536, "Sevilla"),
    },
];

const PREMIER: &[Seed] = &[
    Seed {
        id: 2001,
        days_ahead: 2,
        venue: "Old Trafford",
        home: (33, "Manchester United"),
        away: (40, "Liverpool"),
    },
    Seed {
        id: 2002,
        days_ahead: 4,
        venue: "Emirates Stadium",
        home: (42, "Arsenal"),
        away: (49, "Chelsea"),
    },
];

const FPC: &[Seed] = &[
    Seed {
        id: 3001,
        days_ahead: 3,
        venue: "El Campín",
        home: (1137, "Millonarios"),
        away: (1135, "Atletico Nacional"),
    },
    Seed {
        id: 3002,
        days_ahead: 5,
        venue: "Pascual Guerrero",
        home: (1127, "America de Cali"),
        away: (1128, "Deportivo Cali"),
    },
];

/// Built-in fixtures used when the provider is unreachable. Kickoffs are
/// placed a few days after `now` so they show up in upcoming views. Leagues
/// without seed data get a single placeholder fixture.
pub fn fallback_fixtures(league: &League, now: DateTime<Utc>) -> Vec<Fixture> {
    let seeds = match league.key.as_str() {
        "laliga" => LALIGA,
        "premier" => PREMIER,
        "fpc" => FPC,
        _ => &[],
    };
    if seeds.is_empty() {
        return vec![placeholder_fixture(league, now)];
    }
    seeds
        .iter()
        .map(|seed| Fixture {
            fixture_id: seed.id,
            kickoff: now + Duration::days(seed.days_ahead),
            venue_name: Some(seed.venue.to_string()),
            status: FixtureStatus::NotStarted,
            status_long: Some("Not Started".to_string()),
            home_team: TeamRef::new(seed.home.0, seed.home.1),
            away_team: TeamRef::new(seed.away.0, seed.away.1),
            league_key: league.key.clone(),
            goals: Goals::default(),
        })
        .collect()
}

fn placeholder_fixture(league: &League, now: DateTime<Utc>) -> Fixture {
    Fixture {
        fixture_id: 9_000_000 + league.external_id as u64,
        kickoff: now + Duration::days(1),
        venue_name: None,
        status: FixtureStatus::NotStarted,
        status_long: Some("Not Started".to_string()),
        home_team: TeamRef::new(0, PLACEHOLDER_HOME),
        away_team: TeamRef::new(0, PLACEHOLDER_AWAY),
        league_key: league.key.clone(),
        goals: Goals::default(),
    }
}
