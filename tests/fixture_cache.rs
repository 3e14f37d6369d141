use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use matchday_desk::cache::{
    CachePolicy, Clock, FixtureCache, FixtureSource, RefreshOptions, RefreshOutcome,
};
use matchday_desk::error::FetchError;
use matchday_desk::fallback::fallback_fixtures;
use matchday_desk::fixture::{Fixture, FixtureStatus, Goals, TeamRef};
use matchday_desk::league::{League, LeagueRegistry};
use matchday_desk::teams::extract_valid_teams;

type Reply = Result<Vec<Fixture>, FetchError>;

#[derive(Default)]
struct ScriptedSource {
    range: Mutex<HashMap<String, Reply>>,
    next: Mutex<HashMap<String, Reply>>,
    range_calls: AtomicUsize,
    next_calls: AtomicUsize,
}

impl ScriptedSource {
    fn set_range(&self, league: &str, reply: Reply) {
        self.range.lock().unwrap().insert(league.to_string(), reply);
    }

    fn set_next(&self, league: &str, reply: Reply) {
        self.next.lock().unwrap().insert(league.to_string(), reply);
    }

    fn range_calls(&self) -> usize {
        self.range_calls.load(Ordering::SeqCst)
    }

    fn next_calls(&self) -> usize {
        self.next_calls.load(Ordering::SeqCst)
    }
}

impl FixtureSource for ScriptedSource {
    fn fixtures_between(&self, league: &League, _: NaiveDate, _: NaiveDate) -> Reply {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        self.range
            .lock()
            .unwrap()
            .get(&league.key)
            .cloned()
            .unwrap_or(Ok(Vec::new()))
    }

    fn next_fixtures(&self, league: &League, _: u32) -> Reply {
        self.next_calls.fetch_add(1, Ordering::SeqCst);
        self.next
            .lock()
            .unwrap()
            .get(&league.key)
            .cloned()
            .unwrap_or(Ok(Vec::new()))
    }
}

#[derive(Clone)]
struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    fn at(now: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(now)))
    }

    fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 18, 9, 0, 0).unwrap()
}

fn fixture(id: u64, home: &str, away: &str, status: FixtureStatus) -> Fixture {
    Fixture {
        fixture_id: id,
        kickoff: start() + Duration::days(2),
        venue_name: None,
        status,
        status_long: None,
        home_team: TeamRef::new(id as u32, home),
        away_team: TeamRef::new(id as u32 + 1, away),
        league_key: String::new(),
        goals: Goals::default(),
    }
}

fn laliga_fixtures() -> Vec<Fixture> {
    vec![
        fixture(1, "Real Madrid", "Barcelona", FixtureStatus::NotStarted),
        fixture(2, "Sevilla", "Real Betis", FixtureStatus::SecondHalf),
        fixture(3, "Getafe", "Osasuna", FixtureStatus::Finished),
    ]
}

fn cache_with(
    source: ScriptedSource,
) -> (FixtureCache<ScriptedSource, ManualClock>, ManualClock) {
    let clock = ManualClock::at(start());
    let cache = FixtureCache::with_clock(
        LeagueRegistry::defaults(Some(2025)),
        source,
        clock.clone(),
        CachePolicy {
            staleness: Duration::minutes(30),
            horizon_days: 14,
            next_count: 10,
        },
    );
    (cache, clock)
}

#[test]
fn refresh_within_staleness_window_hits_network_once() {
    let source = ScriptedSource::default();
    source.set_range("laliga", Ok(laliga_fixtures()));
    let (mut cache, clock) = cache_with(source);

    let first = cache
        .refresh_league("laliga", RefreshOptions::default())
        .unwrap();
    assert_eq!(first.outcome, RefreshOutcome::Fetched);
    let second = cache
        .refresh_league("laliga", RefreshOptions::default())
        .unwrap();
    assert_eq!(second.outcome, RefreshOutcome::Cached);
    assert_eq!(second.set, first.set);
    assert_eq!(cache.source().range_calls(), 1);

    clock.advance(Duration::minutes(31));
    let third = cache
        .refresh_league("laliga", RefreshOptions::default())
        .unwrap();
    assert_eq!(third.outcome, RefreshOutcome::Fetched);
    assert_eq!(cache.source().range_calls(), 2);
}

#[test]
fn forced_refresh_ignores_staleness() {
    let source = ScriptedSource::default();
    source.set_range("laliga", Ok(laliga_fixtures()));
    let (mut cache, _) = cache_with(source);

    cache.refresh_league("laliga", RefreshOptions::default()).unwrap();
    let forced = cache.refresh_league("laliga", RefreshOptions::forced()).unwrap();
    assert_eq!(forced.outcome, RefreshOutcome::Fetched);
    assert_eq!(cache.source().range_calls(), 2);
}

#[test]
fn fetched_fixtures_are_stamped_with_league_key() {
    let source = ScriptedSource::default();
    source.set_range("laliga", Ok(laliga_fixtures()));
    let (mut cache, _) = cache_with(source);

    let report = cache.refresh_league("laliga", RefreshOptions::default()).unwrap();
    assert!(report.set.fixtures.iter().all(|f| f.league_key == "laliga"));
    assert_eq!(report.set.last_refreshed_at, Some(start()));
    assert!(!report.set.synthetic);
}

#[test]
fn failure_without_data_serves_fallback_and_warns() {
    let source = ScriptedSource::default();
    source.set_range("fpc", Err(FetchError::Transport("connection refused".into())));
    let (mut cache, _) = cache_with(source);

    let report = cache.refresh_league("fpc", RefreshOptions::default()).unwrap();
    assert_eq!(report.outcome, RefreshOutcome::Fallback);
    assert!(report.set.synthetic);
    assert_eq!(report.set.last_refreshed_at, Some(start()));

    let league = cache.store().registry().get("fpc").unwrap().clone();
    assert_eq!(report.set.fixtures, fallback_fixtures(&league, start()));

    let warnings = cache.drain_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].league_key, "fpc");
    assert!(warnings[0].synthetic);
    assert!(warnings[0].reason.contains("connection refused"));
    assert!(cache.warnings().is_empty());

    // Same clock, same failure, same fallback.
    let again = cache.refresh_league("fpc", RefreshOptions::forced()).unwrap();
    assert_eq!(again.set.fixtures, report.set.fixtures);
}

#[test]
fn failure_keeps_previous_real_fixtures() {
    let source = ScriptedSource::default();
    source.set_range("laliga", Ok(laliga_fixtures()));
    let (mut cache, clock) = cache_with(source);
    let before = cache.refresh_league("laliga", RefreshOptions::default()).unwrap();

    cache
        .source()
        .set_range("laliga", Err(FetchError::Status { status: 503, body: "busy".into() }));
    clock.advance(Duration::minutes(5));
    let after = cache.refresh_league("laliga", RefreshOptions::forced()).unwrap();

    assert_eq!(after.outcome, RefreshOutcome::KeptPrevious);
    assert_eq!(after.set, before.set);
    assert_eq!(after.set.last_refreshed_at, Some(start()));
    let warnings = cache.drain_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(!warnings[0].synthetic);
}

#[test]
fn superseded_ticket_is_discarded() {
    let source = ScriptedSource::default();
    let (mut cache, _) = cache_with(source);

    let older = cache
        .begin_refresh("laliga", RefreshOptions::forced())
        .unwrap()
        .unwrap();
    let newer = cache
        .begin_refresh("laliga", RefreshOptions::forced())
        .unwrap()
        .unwrap();
    assert!(newer.seq > older.seq);

    let newest_data = vec![fixture(10, "Valencia", "Villarreal", FixtureStatus::NotStarted)];
    let applied = cache.complete_refresh(newer, Ok(newest_data));
    assert_eq!(applied.outcome, RefreshOutcome::Fetched);

    let stale = cache.complete_refresh(older, Ok(laliga_fixtures()));
    assert_eq!(stale.outcome, RefreshOutcome::Discarded);
    let set = cache.store().league_set("laliga").unwrap();
    assert_eq!(set.fixtures.len(), 1);
    assert_eq!(set.fixtures[0].fixture_id, 10);
}

#[test]
fn stale_failure_cannot_clobber_newer_ticket() {
    let source = ScriptedSource::default();
    let (mut cache, _) = cache_with(source);

    let older = cache.begin_refresh("premier", RefreshOptions::forced()).unwrap().unwrap();
    let newer = cache.begin_refresh("premier", RefreshOptions::forced()).unwrap().unwrap();

    let dropped = cache.complete_refresh(older, Err(FetchError::Transport("timeout".into())));
    assert_eq!(dropped.outcome, RefreshOutcome::Discarded);
    assert!(cache.warnings().is_empty());
    assert!(!cache.store().league_set("premier").unwrap().synthetic);

    let applied = cache.complete_refresh(newer, Ok(Vec::new()));
    assert_eq!(applied.outcome, RefreshOutcome::Fetched);
}

#[test]
fn empty_range_falls_back_to_next_fixtures() {
    let source = ScriptedSource::default();
    source.set_next(
        "premier",
        Ok(vec![fixture(20, "Arsenal", "Chelsea", FixtureStatus::NotStarted)]),
    );
    let (mut cache, _) = cache_with(source);

    let report = cache.refresh_league("premier", RefreshOptions::default()).unwrap();
    assert_eq!(report.outcome, RefreshOutcome::Fetched);
    assert_eq!(report.set.fixtures.len(), 1);
    assert_eq!(cache.source().range_calls(), 1);
    assert_eq!(cache.source().next_calls(), 1);
}

#[test]
fn nothing_scheduled_is_an_empty_real_set() {
    let (mut cache, _) = cache_with(ScriptedSource::default());

    let report = cache.refresh_league("premier", RefreshOptions::default()).unwrap();
    assert_eq!(report.outcome, RefreshOutcome::Fetched);
    assert!(report.set.fixtures.is_empty());
    assert!(!report.set.synthetic);
    assert!(report.set.is_populated());
    assert!(cache.store().teams("premier").unwrap().is_empty());
}

#[test]
fn unknown_league_is_the_only_error() {
    let (mut cache, _) = cache_with(ScriptedSource::default());
    assert_eq!(
        cache.refresh_league("mls", RefreshOptions::default()),
        Err(FetchError::UnknownLeague("mls".to_string()))
    );
}

#[test]
fn refresh_all_isolates_league_failures() {
    let source = ScriptedSource::default();
    source.set_range("laliga", Ok(laliga_fixtures()));
    source.set_range("premier", Err(FetchError::MissingApiKey));
    source.set_range(
        "fpc",
        Ok(vec![fixture(30, "Millonarios", "Santa Fe", FixtureStatus::NotStarted)]),
    );
    let (mut cache, _) = cache_with(source);

    let reports = cache.refresh_all(RefreshOptions::default());
    let summary: Vec<(&str, RefreshOutcome)> = reports
        .iter()
        .map(|r| (r.league_key.as_str(), r.outcome))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("laliga", RefreshOutcome::Fetched),
            ("premier", RefreshOutcome::Fallback),
            ("fpc", RefreshOutcome::Fetched),
        ]
    );
    assert_eq!(cache.drain_warnings().len(), 1);

    let again = cache.refresh_all(RefreshOptions::default());
    assert!(again.iter().all(|r| r.outcome == RefreshOutcome::Cached));
}

#[test]
fn validated_teams_are_exactly_the_eligible_participants() {
    let source = ScriptedSource::default();
    source.set_range("laliga", Ok(laliga_fixtures()));
    let (mut cache, _) = cache_with(source);
    cache.refresh_league("laliga", RefreshOptions::default()).unwrap();

    let store = cache.store();
    let set = store.league_set("laliga").unwrap();
    let teams = store.teams("laliga").unwrap();

    for team in teams.iter() {
        assert!(
            set.eligible().any(|f| f.involves(&team.name)),
            "{} has no eligible fixture",
            team.name
        );
    }
    for fixture in set.eligible() {
        assert!(teams.contains(&fixture.home_team.name));
        assert!(teams.contains(&fixture.away_team.name));
    }
    assert!(!teams.contains("Getafe"));
    assert_eq!(teams.len(), extract_valid_teams(&set.fixtures).len());
}

#[test]
fn roster_filters_validated_teams() {
    let league = League::new("laliga", 140, "La Liga", "Spain", 2025)
        .with_roster(["Real Madrid", "FC Barcelona", "Sevilla FC"]);
    let source = ScriptedSource::default();
    source.set_range("laliga", Ok(laliga_fixtures()));
    let mut cache = FixtureCache::with_clock(
        LeagueRegistry::new(vec![league]),
        source,
        ManualClock::at(start()),
        CachePolicy::default(),
    );
    cache.refresh_league("laliga", RefreshOptions::default()).unwrap();

    let teams = cache.store().teams("laliga").unwrap();
    let names: Vec<&str> = teams.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Real Madrid", "Barcelona", "Sevilla"]);
}
