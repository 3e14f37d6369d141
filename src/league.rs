use serde::{Deserialize, Serialize};

pub const DEFAULT_SEASON: u16 = 2025;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub key: String,
    pub external_id: u32,
    pub display_name: String,
    pub country: String,
    pub season: u16,
    #[serde(default)]
    pub team_roster: Option<Vec<String>>,
}

impl League {
    pub fn new(
        key: &str,
        external_id: u32,
        display_name: &str,
        country: &str,
        season: u16,
    ) -> Self {
        Self {
            key: key.to_string(),
            external_id,
            display_name: display_name.to_string(),
            country: country.to_string(),
            season,
            team_roster: None,
        }
    }

    pub fn with_roster<I, S>(mut self, roster: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.team_roster = Some(roster.into_iter().map(Into::into).collect());
        self
    }

    pub fn roster(&self) -> Option<&[String]> {
        self.team_roster
            .as_deref()
            .filter(|roster| !roster.is_empty())
    }
}

/// Leagues in registration order. Order matters: the resolver breaks ties
/// by it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeagueRegistry {
    leagues: Vec<League>,
}

impl LeagueRegistry {
    pub fn new(leagues: Vec<League>) -> Self {
        let mut registry = Self::default();
        for league in leagues {
            registry.register(league);
        }
        registry
    }

    pub fn defaults(season: Option<u16>) -> Self {
        let season = season.unwrap_or(DEFAULT_SEASON);
        Self::new(vec![
            League::new("laliga", 140, "La Liga", "Spain", season),
            League::new("premier", 39, "Premier League", "England", season),
            League::new("fpc", 239, "Liga BetPlay", "Colombia", season),
        ])
    }

    pub fn register(&mut self, league: League) {
        if self.get(&league.key).is_some() {
            return;
        }
        self.leagues.push(league);
    }

    pub fn get(&self, key: &str) -> Option<&League> {
        self.leagues.iter().find(|l| l.key == key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.leagues.iter().position(|l| l.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &League> {
        self.leagues.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.leagues.iter().map(|l| l.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.leagues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leagues.is_empty()
    }

    pub fn label(&self, key: &str) -> String {
        self.get(key)
            .map(|l| format!("{} ({})", l.display_name, l.country))
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{League, LeagueRegistry};

    #[test]
    fn defaults_keep_registration_order() {
        let registry = LeagueRegistry::defaults(None);
        let keys: Vec<&str> = registry.keys().collect();
        assert_eq!(keys, vec!["laliga", "premier", "fpc"]);
        assert_eq!(registry.get("premier").map(|l| l.external_id), Some(39));
    }

    #[test]
    fn duplicate_key_is_ignored() {
        let mut registry = LeagueRegistry::defaults(Some(2026));
        registry.register(League::new("laliga", 1, "Other", "Nowhere", 2026));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("laliga").map(|l| l.external_id), Some(140));
        assert_eq!(registry.get("laliga").map(|l| l.season), Some(2026));
    }

    #[test]
    fn empty_roster_is_treated_as_absent() {
        let league = League::new("x", 1, "X", "Y", 2025).with_roster(Vec::<String>::new());
        assert!(league.roster().is_none());
    }
}
