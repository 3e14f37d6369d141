//! Per-league fixture cache.
//!
//! The cache is the only writer of fixture state. Every refresh is issued as
//! a [`RefreshTicket`] carrying a per-league sequence number; when the fetch
//! completes, its result is applied only if that ticket is still the latest
//! one issued for the league. Older in-flight responses are dropped, so a
//! manual refresh always supersedes a timer refresh started before it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::fallback::fallback_fixtures;
use crate::fixture::{Fixture, LeagueFixtureSet};
use crate::league::{League, LeagueRegistry};
use crate::teams::ValidatedTeamSet;

pub trait FixtureSource: Send + Sync {
    fn fixtures_between(
        &self,
        league: &League,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Fixture>, FetchError>;

    fn next_fixtures(&self, league: &League, count: u32) -> Result<Vec<Fixture>, FetchError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub staleness: ChronoDuration,
    pub horizon_days: u32,
    pub next_count: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl CachePolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            staleness: config.staleness(),
            horizon_days: config.horizon_days,
            next_count: config.next_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    pub force: bool,
    pub horizon_days: Option<u32>,
}

impl RefreshOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            horizon_days: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Cached,
    Fetched,
    Fallback,
    KeptPrevious,
    /// A newer refresh was issued while this one was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub league_key: String,
    pub outcome: RefreshOutcome,
    pub set: LeagueFixtureSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaleDataWarning {
    pub league_key: String,
    pub reason: String,
    pub synthetic: bool,
    pub at: DateTime<Utc>,
}

impl fmt::Display for StaleDataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.synthetic {
            write!(f, "{}: showing sample fixtures ({})", self.league_key, self.reason)
        } else {
            write!(f, "{}: keeping earlier fixtures ({})", self.league_key, self.reason)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    pub league: League,
    pub seq: u64,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub next_count: u32,
}

/// Date-bounded query first; if that comes back empty, ask for the next
/// N fixtures before concluding there are none.
pub fn fetch_ticket<S: FixtureSource + ?Sized>(
    source: &S,
    ticket: &RefreshTicket,
) -> Result<Vec<Fixture>, FetchError> {
    let fixtures = source.fixtures_between(&ticket.league, ticket.from, ticket.to)?;
    if !fixtures.is_empty() {
        return Ok(fixtures);
    }
    source.next_fixtures(&ticket.league, ticket.next_count)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureStore {
    registry: LeagueRegistry,
    sets: HashMap<String, LeagueFixtureSet>,
    teams: HashMap<String, ValidatedTeamSet>,
}

impl FixtureStore {
    pub fn new(registry: LeagueRegistry) -> Self {
        let sets = registry
            .keys()
            .map(|k| (k.to_string(), LeagueFixtureSet::empty(k)))
            .collect();
        let teams = registry
            .keys()
            .map(|k| (k.to_string(), ValidatedTeamSet::default()))
            .collect();
        Self {
            registry,
            sets,
            teams,
        }
    }

    pub fn registry(&self) -> &LeagueRegistry {
        &self.registry
    }

    pub fn league_set(&self, key: &str) -> Option<&LeagueFixtureSet> {
        self.sets.get(key)
    }

    pub fn teams(&self, key: &str) -> Option<&ValidatedTeamSet> {
        self.teams.get(key)
    }

    pub fn sets(&self) -> impl Iterator<Item = &LeagueFixtureSet> {
        self.registry.keys().filter_map(|k| self.sets.get(k))
    }

    pub fn replace(&mut self, set: LeagueFixtureSet) -> bool {
        let Some(league) = self.registry.get(&set.league_key) else {
            return false;
        };
        let teams = ValidatedTeamSet::derive(&set.fixtures, league.roster());
        self.teams.insert(set.league_key.clone(), teams);
        self.sets.insert(set.league_key.clone(), set);
        true
    }

    pub fn find_fixture(&self, fixture_id: u64) -> Option<&Fixture> {
        self.sets().find_map(|s| s.find(fixture_id))
    }

    pub fn league_of_team<F>(&self, mut pred: F) -> Option<(&str, &str)>
    where
        F: FnMut(&str) -> bool,
    {
        for key in self.registry.keys() {
            let Some(teams) = self.teams.get(key) else {
                continue;
            };
            if let Some(team) = teams.iter().find(|t| pred(&t.name)) {
                return Some((key, team.name.as_str()));
            }
        }
        None
    }

    pub fn totals(&self) -> (usize, usize) {
        let fixtures = self.sets().map(|s| s.eligible().count()).sum();
        let teams = self.teams.values().map(|t| t.len()).sum();
        (fixtures, teams)
    }
}

pub struct FixtureCache<S, C = SystemClock> {
    store: FixtureStore,
    source: Arc<S>,
    clock: C,
    policy: CachePolicy,
    next_seq: u64,
    issued: HashMap<String, u64>,
    warnings: Vec<StaleDataWarning>,
}

impl<S: FixtureSource> FixtureCache<S, SystemClock> {
    pub fn new(registry: LeagueRegistry, source: S, policy: CachePolicy) -> Self {
        Self::with_clock(registry, source, SystemClock, policy)
    }
}

impl<S: FixtureSource, C: Clock> FixtureCache<S, C> {
    pub fn with_clock(registry: LeagueRegistry, source: S, clock: C, policy: CachePolicy) -> Self {
        Self {
            store: FixtureStore::new(registry),
            source: Arc::new(source),
            clock,
            policy,
            next_seq: 0,
            issued: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn store(&self) -> &FixtureStore {
        &self.store
    }

    pub fn source(&self) -> Arc<S> {
        Arc::clone(&self.source)
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn warnings(&self) -> &[StaleDataWarning] {
        &self.warnings
    }

    pub fn drain_warnings(&mut self) -> Vec<StaleDataWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Issues a ticket for `key`, or `None` when the league is still fresh
    /// and the refresh is not forced. Issuing supersedes any earlier ticket
    /// for the same league.
    pub fn begin_refresh(
        &mut self,
        key: &str,
        opts: RefreshOptions,
    ) -> Result<Option<RefreshTicket>, FetchError> {
        let league = self
            .store
            .registry()
            .get(key)
            .cloned()
            .ok_or_else(|| FetchError::UnknownLeague(key.to_string()))?;
        let now = self.clock.now();

        if !opts.force {
            let last = self
                .store
                .league_set(key)
                .and_then(|s| s.last_refreshed_at);
            if let Some(last) = last
                && now - last < self.policy.staleness
            {
                return Ok(None);
            }
        }

        self.next_seq += 1;
        let seq = self.next_seq;
        self.issued.insert(league.key.clone(), seq);

        let horizon = opts.horizon_days.unwrap_or(self.policy.horizon_days);
        let from = now.date_naive();
        let to = from
            .checked_add_days(chrono::Days::new(horizon as u64))
            .unwrap_or(from);
        Ok(Some(RefreshTicket {
            league,
            seq,
            from,
            to,
            next_count: self.policy.next_count,
        }))
    }

    /// Applies a finished fetch. Transport failures are absorbed here: real
    /// data already held is kept, otherwise the fallback dataset is
    /// substituted and flagged synthetic.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<Fixture>, FetchError>,
    ) -> RefreshReport {
        let key = ticket.league.key.clone();
        if self.issued.get(&key) != Some(&ticket.seq) {
            warn!(league = %key, seq = ticket.seq, "discarding superseded refresh");
            return self.report(&key, RefreshOutcome::Discarded);
        }

        let now = self.clock.now();
        let outcome = match result {
            Ok(mut fixtures) => {
                for fixture in &mut fixtures {
                    fixture.league_key.clone_from(&key);
                }
                info!(league = %key, fixtures = fixtures.len(), "fixtures refreshed");
                self.store.replace(LeagueFixtureSet {
                    league_key: key.clone(),
                    fixtures,
                    last_refreshed_at: Some(now),
                    synthetic: false,
                });
                RefreshOutcome::Fetched
            }
            Err(err) => {
                let has_real = self
                    .store
                    .league_set(&key)
                    .map(|s| !s.synthetic && !s.fixtures.is_empty())
                    .unwrap_or(false);
                let synthetic = !has_real;
                warn!(league = %key, error = %err, synthetic, "fixture refresh failed");
                if synthetic {
                    self.store.replace(LeagueFixtureSet {
                        league_key: key.clone(),
                        fixtures: fallback_fixtures(&ticket.league, now),
                        last_refreshed_at: Some(now),
                        synthetic: true,
                    });
                }
                self.warnings.push(StaleDataWarning {
                    league_key: key.clone(),
                    reason: err.to_string(),
                    synthetic,
                    at: now,
                });
                if synthetic {
                    RefreshOutcome::Fallback
                } else {
                    RefreshOutcome::KeptPrevious
                }
            }
        };
        self.report(&key, outcome)
    }

    pub fn refresh_league(
        &mut self,
        key: &str,
        opts: RefreshOptions,
    ) -> Result<RefreshReport, FetchError> {
        let Some(ticket) = self.begin_refresh(key, opts)? else {
            return Ok(self.report(key, RefreshOutcome::Cached));
        };
        let result = fetch_ticket(self.source.as_ref(), &ticket);
        Ok(self.complete_refresh(ticket, result))
    }

    pub fn refresh_all(&mut self, opts: RefreshOptions) -> Vec<RefreshReport> {
        let keys: Vec<String> = self.store.registry().keys().map(str::to_string).collect();
        let mut reports = Vec::with_capacity(keys.len());
        let mut tickets = Vec::new();
        for key in &keys {
            match self.begin_refresh(key, opts) {
                Ok(Some(ticket)) => tickets.push(ticket),
                Ok(None) => reports.push(self.report(key, RefreshOutcome::Cached)),
                Err(err) => warn!(league = %key, error = %err, "cannot refresh"),
            }
        }

        let source = self.source.as_ref();
        let results: Vec<(RefreshTicket, Result<Vec<Fixture>, FetchError>)> =
            thread::scope(|scope| {
                let handles: Vec<_> = tickets
                    .into_iter()
                    .map(|ticket| {
                        let handle = scope.spawn({
                            let ticket = ticket.clone();
                            move || fetch_ticket(source, &ticket)
                        });
                        (ticket, handle)
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|(ticket, handle)| {
                        let result = handle.join().unwrap_or_else(|_| {
                            Err(FetchError::Transport("fetch worker panicked".to_string()))
                        });
                        (ticket, result)
                    })
                    .collect()
            });

        for (ticket, result) in results {
            reports.push(self.complete_refresh(ticket, result));
        }
        let registry = self.store.registry();
        reports.sort_by_key(|r| registry.position(&r.league_key).unwrap_or(usize::MAX));
        reports
    }

    fn report(&self, key: &str, outcome: RefreshOutcome) -> RefreshReport {
        RefreshReport {
            league_key: key.to_string(),
            outcome,
            set: self
                .store
                .league_set(key)
                .cloned()
                .unwrap_or_else(|| LeagueFixtureSet::empty(key)),
        }
    }
}
