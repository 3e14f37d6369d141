use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::cache::FixtureStore;
use crate::fixture::{Fixture, LeagueFixtureSet, TeamRef};
use crate::matcher::{SubstringMatcher, TeamMatcher};
use crate::teams::ValidatedTeamSet;

const SEPARATORS: [&[u8]; 3] = [b" vs ", b" v ", b" - "];
const MIN_SPACE_RUN: usize = 3;
const BISECT_MIN_WORDS: usize = 4;
const MAX_TOKENS: usize = 2;
pub const FAILURE_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionContext {
    pub tokens: Vec<String>,
    pub scope: Option<String>,
    pub suggestions: Vec<TeamRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("enter at least one team name")]
    NoTokensExtracted(ResolutionContext),
    #[error("no scheduled fixture matches \"{}\"", .0.tokens.join(" vs "))]
    NoFixtureFound(ResolutionContext),
    #[error("\"{token}\" looks like {team}, who play in {found_in}")]
    CrossLeagueMismatch {
        context: ResolutionContext,
        token: String,
        team: String,
        found_in: String,
    },
}

impl ResolutionError {
    pub fn context(&self) -> &ResolutionContext {
        match self {
            ResolutionError::NoTokensExtracted(ctx) | ResolutionError::NoFixtureFound(ctx) => ctx,
            ResolutionError::CrossLeagueMismatch { context, .. } => context,
        }
    }
}

/// Splits on ` vs `, ` v `, ` - ` (any case) or runs of three or more
/// spaces. A lone token of four or more words is cut in half at the middle
/// word boundary. At most two tokens are kept.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = split_on_separators(query)
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if tokens.len() == 1 {
        let words: Vec<&str> = tokens[0].split_whitespace().collect();
        if words.len() >= BISECT_MIN_WORDS {
            tokens = bisect(&words);
        }
    }
    tokens.truncate(MAX_TOKENS);
    tokens
}

fn split_on_separators(query: &str) -> Vec<&str> {
    let lower = query.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match separator_len(&bytes[i..]) {
            Some(len) => {
                parts.push(&query[start..i]);
                i += len;
                start = i;
            }
            None => i += 1,
        }
    }
    parts.push(&query[start..]);
    parts
}

fn separator_len(rest: &[u8]) -> Option<usize> {
    let spaces = rest.iter().take_while(|b| **b == b' ').count();
    if spaces > 0 {
        // A word separator may sit at the end of a longer run of spaces.
        let tail = &rest[spaces - 1..];
        if let Some(sep) = SEPARATORS.iter().find(|sep| tail.starts_with(sep)) {
            return Some(spaces - 1 + sep.len());
        }
    }
    if spaces >= MIN_SPACE_RUN {
        return Some(spaces);
    }
    None
}

fn bisect(words: &[&str]) -> Vec<String> {
    let mid = words.len() / 2;
    vec![words[..mid].join(" "), words[mid..].join(" ")]
}

pub struct QueryResolver<'a, M = SubstringMatcher> {
    store: &'a FixtureStore,
    matcher: M,
}

impl<'a> QueryResolver<'a> {
    pub fn new(store: &'a FixtureStore) -> Self {
        Self::with_matcher(store, SubstringMatcher)
    }
}

impl<'a, M: TeamMatcher> QueryResolver<'a, M> {
    pub fn with_matcher(store: &'a FixtureStore, matcher: M) -> Self {
        Self { store, matcher }
    }

    pub fn resolve(&self, query: &str, scope: Option<&str>) -> Result<Fixture, ResolutionError> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Err(ResolutionError::NoTokensExtracted(self.context(tokens, scope)));
        }
        let sets = self.scope_sets(scope);

        if tokens.len() >= 2
            && let Some(fixture) = self.first_match(&sets, |f| self.both_match(&tokens, f))
        {
            debug!(?tokens, fixture = fixture.fixture_id, "resolved on both teams");
            return Ok(fixture.clone());
        }

        if let Some(scope_key) = scope
            && let Some(err) = self.cross_league(&tokens, scope_key)
        {
            return Err(err);
        }

        if let Some(fixture) = self.first_match(&sets, |f| self.any_match(&tokens, f)) {
            debug!(?tokens, fixture = fixture.fixture_id, "resolved on one team");
            return Ok(fixture.clone());
        }

        // "Madrid Barcelona": a short unseparated query that matches nothing
        // whole gets one more try as two halves, both of which must match.
        if tokens.len() == 1 {
            let words: Vec<&str> = tokens[0].split_whitespace().collect();
            if words.len() >= 2 {
                let halves = bisect(&words);
                if let Some(fixture) = self.first_match(&sets, |f| self.both_match(&halves, f)) {
                    debug!(?halves, fixture = fixture.fixture_id, "resolved after bisecting");
                    return Ok(fixture.clone());
                }
                if let Some(scope_key) = scope
                    && let Some(err) = self.cross_league(&halves, scope_key)
                {
                    return Err(err);
                }
            }
        }

        Err(ResolutionError::NoFixtureFound(self.context(tokens, scope)))
    }

    pub fn find_by_id(&self, fixture_id: u64) -> Option<&'a Fixture> {
        self.store.find_fixture(fixture_id)
    }

    pub fn suggest(&self, fragment: &str, scope: Option<&str>, limit: usize) -> Vec<TeamRef> {
        let mut seen = HashSet::new();
        self.scope_teams(scope)
            .into_iter()
            .flat_map(|teams| teams.suggest(fragment, limit))
            .filter(|t| seen.insert(t.name.clone()))
            .take(limit)
            .collect()
    }

    fn scope_sets(&self, scope: Option<&str>) -> Vec<&'a LeagueFixtureSet> {
        match scope {
            Some(key) => self.store.league_set(key).into_iter().collect(),
            None => self.store.sets().collect(),
        }
    }

    fn scope_teams(&self, scope: Option<&str>) -> Vec<&'a ValidatedTeamSet> {
        match scope {
            Some(key) => self.store.teams(key).into_iter().collect(),
            None => self
                .store
                .registry()
                .keys()
                .filter_map(|k| self.store.teams(k))
                .collect(),
        }
    }

    fn first_match<F>(&self, sets: &[&'a LeagueFixtureSet], accept: F) -> Option<&'a Fixture>
    where
        F: Fn(&Fixture) -> bool,
    {
        for set in sets {
            let teams = self.store.teams(&set.league_key);
            for fixture in set.eligible() {
                if !accept(fixture) {
                    continue;
                }
                let valid = teams.is_some_and(|t| {
                    t.contains(&fixture.home_team.name) && t.contains(&fixture.away_team.name)
                });
                if valid {
                    return Some(fixture);
                }
                debug!(fixture = fixture.fixture_id, "candidate failed team validation");
            }
        }
        None
    }

    fn side_match(&self, token: &str, fixture: &Fixture) -> bool {
        self.matcher.matches(token, &fixture.home_team.name)
            || self.matcher.matches(token, &fixture.away_team.name)
    }

    fn both_match(&self, tokens: &[String], fixture: &Fixture) -> bool {
        let [a, b, ..] = tokens else {
            return false;
        };
        let home = &fixture.home_team.name;
        let away = &fixture.away_team.name;
        (self.matcher.matches(a, home) && self.matcher.matches(b, away))
            || (self.matcher.matches(a, away) && self.matcher.matches(b, home))
    }

    fn any_match(&self, tokens: &[String], fixture: &Fixture) -> bool {
        tokens.iter().any(|t| self.side_match(t, fixture))
    }

    fn cross_league(&self, tokens: &[String], scope_key: &str) -> Option<ResolutionError> {
        let scoped = self.store.teams(scope_key)?;
        for token in tokens {
            if scoped.iter().any(|team| self.matcher.matches(token, &team.name)) {
                continue;
            }
            let Some((league, team)) = self
                .store
                .league_of_team(|name| self.matcher.matches(token, name))
            else {
                continue;
            };
            if league != scope_key {
                return Some(ResolutionError::CrossLeagueMismatch {
                    context: self.context(tokens.to_vec(), Some(scope_key)),
                    token: token.clone(),
                    team: team.to_string(),
                    found_in: league.to_string(),
                });
            }
        }
        None
    }

    /// Up to three teams from the scope, those sharing a word with the query
    /// first.
    fn context(&self, tokens: Vec<String>, scope: Option<&str>) -> ResolutionContext {
        let words: Vec<String> = tokens
            .iter()
            .flat_map(|t| t.split_whitespace())
            .map(str::to_lowercase)
            .filter(|w| w.chars().count() >= 3)
            .collect();
        let mut seen = HashSet::new();
        let pool: Vec<&TeamRef> = self
            .scope_teams(scope)
            .into_iter()
            .flat_map(|teams| teams.iter())
            .filter(|t| seen.insert(t.name.as_str()))
            .collect();
        let (related, rest): (Vec<&TeamRef>, Vec<&TeamRef>) = pool.into_iter().partition(|t| {
            let name = t.name.to_lowercase();
            words.iter().any(|w| name.contains(w.as_str()))
        });
        let suggestions = related
            .into_iter()
            .chain(rest)
            .take(FAILURE_SUGGESTIONS)
            .cloned()
            .collect();
        ResolutionContext {
            tokens,
            scope: scope.map(str::to_string),
            suggestions,
        }
    }
}

pub fn query_for(fixture: &Fixture) -> String {
    fixture.title()
}
