use std::collections::HashSet;

use crate::fixture::{Fixture, TeamRef};
use crate::matcher::roster_allows;

pub const DEFAULT_SUGGESTIONS: usize = 5;
const MIN_SUGGEST_CHARS: usize = 2;

/// Distinct home/away teams of eligible fixtures, first appearance wins.
/// Uniqueness is by exact provider name; no fuzzy merging here.
pub fn extract_valid_teams(fixtures: &[Fixture]) -> Vec<TeamRef> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut teams = Vec::new();
    for fixture in fixtures.iter().filter(|f| f.is_eligible()) {
        for team in [&fixture.home_team, &fixture.away_team] {
            if seen.insert(team.name.as_str()) {
                teams.push(team.clone());
            }
        }
    }
    teams
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedTeamSet {
    teams: Vec<TeamRef>,
    names: HashSet<String>,
}

impl ValidatedTeamSet {
    pub fn derive(fixtures: &[Fixture], roster: Option<&[String]>) -> Self {
        let mut teams = extract_valid_teams(fixtures);
        if let Some(roster) = roster {
            teams.retain(|t| roster_allows(roster, &t.name));
        }
        let names = teams.iter().map(|t| t.name.clone()).collect();
        Self { teams, names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TeamRef> {
        self.teams.iter()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn suggest(&self, fragment: &str, limit: usize) -> Vec<TeamRef> {
        let fragment = fragment.trim().to_lowercase();
        if fragment.chars().count() < MIN_SUGGEST_CHARS {
            return Vec::new();
        }
        self.teams
            .iter()
            .filter(|t| t.name.to_lowercase().contains(&fragment))
            .take(limit)
            .cloned()
            .collect()
    }
}
