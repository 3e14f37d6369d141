use chrono::{Duration, Utc};

use matchday_desk::cache::{RefreshOutcome, StaleDataWarning};
use matchday_desk::fixture::{Fixture, FixtureStatus, Goals, LeagueFixtureSet, TeamRef};
use matchday_desk::league::LeagueRegistry;
use matchday_desk::state::{AppState, Delta, SearchStatus, apply_delta};

fn fixture(id: u64, league: &str, home: &str, away: &str, hours: i64) -> Fixture {
    Fixture {
        fixture_id: id,
        kickoff: Utc::now() + Duration::hours(hours),
        venue_name: Some("Ground".to_string()),
        status: FixtureStatus::NotStarted,
        status_long: None,
        home_team: TeamRef::new(id as u32 * 2, home),
        away_team: TeamRef::new(id as u32 * 2 + 1, away),
        league_key: league.to_string(),
        goals: Goals::default(),
    }
}

fn laliga_set() -> LeagueFixtureSet {
    LeagueFixtureSet {
        league_key: "laliga".to_string(),
        fixtures: vec![
            fixture(1, "laliga", "Real Madrid", "FC Barcelona", 30),
            fixture(2, "laliga", "Atletico Madrid", "Sevilla", 6),
            fixture(3, "laliga", "Villarreal", "Girona", 54),
        ],
        last_refreshed_at: Some(Utc::now()),
        synthetic: false,
    }
}

fn premier_set() -> LeagueFixtureSet {
    LeagueFixtureSet {
        league_key: "premier".to_string(),
        fixtures: vec![fixture(10, "premier", "Arsenal", "Liverpool", 20)],
        last_refreshed_at: Some(Utc::now()),
        synthetic: false,
    }
}

fn loaded_state() -> AppState {
    let mut state = AppState::new(LeagueRegistry::defaults(None), 7);
    for set in [laliga_set(), premier_set()] {
        apply_delta(
            &mut state,
            Delta::LeagueRefreshed {
                set,
                outcome: RefreshOutcome::Fetched,
            },
        );
    }
    state
}

fn warning(key: &str) -> StaleDataWarning {
    StaleDataWarning {
        league_key: key.to_string(),
        reason: "http 503".to_string(),
        synthetic: false,
        at: Utc::now(),
    }
}

#[test]
fn refresh_round_trip_updates_store_and_flags() {
    let mut state = AppState::new(LeagueRegistry::defaults(None), 7);
    apply_delta(
        &mut state,
        Delta::RefreshStarted {
            league_key: "laliga".to_string(),
        },
    );
    assert!(state.is_refreshing());

    apply_delta(
        &mut state,
        Delta::LeagueRefreshed {
            set: laliga_set(),
            outcome: RefreshOutcome::Fetched,
        },
    );
    assert!(!state.is_refreshing());
    assert_eq!(state.league_set().map(|s| s.fixtures.len()), Some(3));
    assert_eq!(state.validated_teams().map(|t| t.len()), Some(6));
    assert!(state.logs.back().unwrap().contains("3 upcoming fixtures"));
}

#[test]
fn visible_rows_are_sorted_by_kickoff() {
    let state = loaded_state();
    let ids: Vec<u64> = state
        .visible_fixtures_at(&Utc::now())
        .iter()
        .map(|f| f.fixture_id)
        .collect();
    assert_eq!(ids, vec![2, 1, 3]);
}

#[test]
fn discarded_refresh_leaves_store_and_flag_alone() {
    let mut state = loaded_state();
    apply_delta(
        &mut state,
        Delta::RefreshStarted {
            league_key: "laliga".to_string(),
        },
    );
    let mut stale = laliga_set();
    stale.fixtures.truncate(1);
    apply_delta(
        &mut state,
        Delta::LeagueRefreshed {
            set: stale,
            outcome: RefreshOutcome::Discarded,
        },
    );
    assert!(state.is_refreshing());
    assert_eq!(state.league_set().map(|s| s.fixtures.len()), Some(3));
}

#[test]
fn warnings_persist_until_a_real_fetch() {
    let mut state = loaded_state();
    apply_delta(&mut state, Delta::Notice(warning("laliga")));
    assert!(state.warnings.contains_key("laliga"));
    assert!(state.logs.back().unwrap().starts_with("[WARN]"));

    apply_delta(
        &mut state,
        Delta::LeagueRefreshed {
            set: laliga_set(),
            outcome: RefreshOutcome::KeptPrevious,
        },
    );
    assert!(state.warnings.contains_key("laliga"));

    apply_delta(
        &mut state,
        Delta::LeagueRefreshed {
            set: laliga_set(),
            outcome: RefreshOutcome::Fetched,
        },
    );
    assert!(!state.warnings.contains_key("laliga"));
}

#[test]
fn shrinking_set_clamps_selection() {
    let mut state = loaded_state();
    state.selected = 2;
    let mut smaller = laliga_set();
    smaller.fixtures.truncate(1);
    apply_delta(
        &mut state,
        Delta::LeagueRefreshed {
            set: smaller,
            outcome: RefreshOutcome::Fetched,
        },
    );
    assert_eq!(state.selected, 0);
}

#[test]
fn successful_search_selects_and_analyses() {
    let mut state = loaded_state();
    state.search_input = "barcelona vs real madrid".to_string();
    let found = state.submit_search().expect("fixture resolves");
    assert_eq!(found.fixture_id, 1);
    assert_eq!(
        state.search_status,
        SearchStatus::Resolved {
            fixture_id: 1,
            title: "Real Madrid vs FC Barcelona".to_string()
        }
    );
    assert_eq!(state.selected_fixture().map(|f| f.fixture_id), Some(1));
    let view = state.analysis.as_ref().expect("analysis stored");
    assert_eq!(view.fixture.fixture_id, 1);
    let r = &view.result;
    assert_eq!(r.home_win + r.draw + r.away_win, 100);
}

#[test]
fn failed_search_keeps_suggestions() {
    let mut state = loaded_state();
    state.search_input = "Nowhere Rovers".to_string();
    assert!(state.submit_search().is_none());
    match &state.search_status {
        SearchStatus::Failed { suggestions, .. } => {
            assert_eq!(suggestions.len(), 3);
            assert!(suggestions.iter().all(|s| s != "Arsenal"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(state.analysis.is_none());
}

#[test]
fn team_from_other_league_names_that_league() {
    let mut state = loaded_state();
    state.search_input = "Liverpool".to_string();
    assert!(state.submit_search().is_none());
    match &state.search_status {
        SearchStatus::Failed { message, .. } => assert!(message.contains("premier")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn league_cycle_wraps_and_resets_search() {
    let mut state = loaded_state();
    state.search_status = SearchStatus::Failed {
        message: "x".to_string(),
        suggestions: Vec::new(),
    };
    state.cycle_league();
    assert_eq!(state.league_key(), Some("premier"));
    assert_eq!(state.search_status, SearchStatus::Idle);
    state.cycle_league();
    state.cycle_league();
    assert_eq!(state.league_key(), Some("laliga"));

    assert!(!state.set_league("mls"));
    assert!(state.set_league("fpc"));
    assert!(state.visible_fixtures().is_empty());
}

#[test]
fn suggestions_follow_the_search_box() {
    let mut state = loaded_state();
    state.search_input = "ma".to_string();
    state.update_suggestions();
    let names: Vec<&str> = state.suggestions.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Real Madrid", "Atletico Madrid"]);
}

#[test]
fn log_buffer_is_capped() {
    let mut state = AppState::new(LeagueRegistry::defaults(None), 7);
    for i in 0..250 {
        apply_delta(&mut state, Delta::Log(format!("line {i}")));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("line 50"));
}
