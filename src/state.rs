use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Local, TimeZone};

use crate::analysis::{AnalysisResult, TeamStats, analyze, stats_for};
use crate::cache::{FixtureStore, RefreshOutcome, StaleDataWarning};
use crate::fixture::{Fixture, LeagueFixtureSet, TeamRef};
use crate::league::LeagueRegistry;
use crate::prefs::Theme;
use crate::resolver::{QueryResolver, ResolutionError};
use crate::teams::{DEFAULT_SUGGESTIONS, ValidatedTeamSet};
use crate::window::{TimeWindow, filter_by_window_at};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchStatus {
    #[default]
    Idle,
    Resolved {
        fixture_id: u64,
        title: String,
    },
    Failed {
        message: String,
        suggestions: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    pub fixture: Fixture,
    pub home: TeamStats,
    pub away: TeamStats,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: FixtureStore,
    pub league_idx: usize,
    pub window: TimeWindow,
    pub default_window_days: u32,
    pub selected: usize,
    pub search_active: bool,
    pub search_input: String,
    pub search_status: SearchStatus,
    pub suggestions: Vec<TeamRef>,
    pub analysis: Option<AnalysisView>,
    pub refreshing: HashSet<String>,
    pub warnings: HashMap<String, StaleDataWarning>,
    pub logs: VecDeque<String>,
    pub theme: Theme,
    pub help_overlay: bool,
}

impl AppState {
    pub fn new(registry: LeagueRegistry, default_window_days: u32) -> Self {
        Self {
            store: FixtureStore::new(registry),
            league_idx: 0,
            window: TimeWindow::Default,
            default_window_days,
            selected: 0,
            search_active: false,
            search_input: String::new(),
            search_status: SearchStatus::Idle,
            suggestions: Vec::new(),
            analysis: None,
            refreshing: HashSet::new(),
            warnings: HashMap::new(),
            logs: VecDeque::new(),
            theme: Theme::default(),
            help_overlay: false,
        }
    }

    pub fn league_key(&self) -> Option<&str> {
        self.store
            .registry()
            .iter()
            .nth(self.league_idx)
            .map(|l| l.key.as_str())
    }

    pub fn league_label(&self) -> String {
        match self.league_key() {
            Some(key) => self.store.registry().label(key),
            None => "No league".to_string(),
        }
    }

    pub fn set_league(&mut self, key: &str) -> bool {
        let Some(idx) = self.store.registry().position(key) else {
            return false;
        };
        self.league_idx = idx;
        self.reset_view();
        true
    }

    pub fn cycle_league(&mut self) {
        let total = self.store.registry().len();
        if total == 0 {
            return;
        }
        self.league_idx = (self.league_idx + 1) % total;
        self.reset_view();
    }

    pub fn cycle_window(&mut self) {
        self.window = self.window.next();
        self.selected = 0;
    }

    fn reset_view(&mut self) {
        self.selected = 0;
        self.search_status = SearchStatus::Idle;
        self.update_suggestions();
    }

    pub fn league_set(&self) -> Option<&LeagueFixtureSet> {
        self.league_key().and_then(|k| self.store.league_set(k))
    }

    pub fn validated_teams(&self) -> Option<&ValidatedTeamSet> {
        self.league_key().and_then(|k| self.store.teams(k))
    }

    pub fn is_refreshing(&self) -> bool {
        self.league_key()
            .is_some_and(|k| self.refreshing.contains(k))
    }

    pub fn visible_fixtures(&self) -> Vec<&Fixture> {
        self.visible_fixtures_at(&Local::now())
    }

    pub fn visible_fixtures_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<&Fixture> {
        let Some(set) = self.league_set() else {
            return Vec::new();
        };
        let mut rows: Vec<&Fixture> =
            filter_by_window_at(&set.fixtures, self.window, now, self.default_window_days)
                .into_iter()
                .filter(|f| f.is_eligible())
                .collect();
        rows.sort_by_key(|f| f.kickoff);
        rows
    }

    pub fn selected_fixture(&self) -> Option<&Fixture> {
        self.visible_fixtures().get(self.selected).copied()
    }

    pub fn select_next(&mut self) {
        let total = self.visible_fixtures().len();
        if total == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % total;
    }

    pub fn select_prev(&mut self) {
        let total = self.visible_fixtures().len();
        if total == 0 {
            self.selected = 0;
            return;
        }
        if self.selected == 0 {
            self.selected = total - 1;
        } else {
            self.selected -= 1;
        }
    }

    pub fn clamp_selection(&mut self) {
        let total = self.visible_fixtures().len();
        if total == 0 {
            self.selected = 0;
        } else if self.selected >= total {
            self.selected = total - 1;
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn update_suggestions(&mut self) {
        let resolver = QueryResolver::new(&self.store);
        self.suggestions =
            resolver.suggest(&self.search_input, self.league_key(), DEFAULT_SUGGESTIONS);
    }

    /// Resolves the search box against the current league. On success the
    /// fixture is selected (when visible) and analysed.
    pub fn submit_search(&mut self) -> Option<Fixture> {
        let scope = self.league_key().map(str::to_string);
        let outcome = QueryResolver::new(&self.store).resolve(&self.search_input, scope.as_deref());
        match outcome {
            Ok(fixture) => {
                self.search_status = SearchStatus::Resolved {
                    fixture_id: fixture.fixture_id,
                    title: fixture.title(),
                };
                let position = self
                    .visible_fixtures()
                    .iter()
                    .position(|f| f.fixture_id == fixture.fixture_id);
                if let Some(idx) = position {
                    self.selected = idx;
                }
                self.push_log(format!("[INFO] Found {}", fixture.title()));
                self.analyze(&fixture);
                Some(fixture)
            }
            Err(err) => {
                self.fail_search(&err);
                None
            }
        }
    }

    fn fail_search(&mut self, err: &ResolutionError) {
        let suggestions = err
            .context()
            .suggestions
            .iter()
            .map(|t| t.name.clone())
            .collect();
        self.push_log(format!("[WARN] {err}"));
        self.search_status = SearchStatus::Failed {
            message: err.to_string(),
            suggestions,
        };
    }

    pub fn analyze_selected(&mut self) -> bool {
        let Some(fixture) = self.selected_fixture().cloned() else {
            self.push_log("[INFO] No fixture selected");
            return false;
        };
        self.analyze(&fixture);
        true
    }

    pub fn analyze(&mut self, fixture: &Fixture) {
        let history: Vec<&Fixture> = self.store.sets().flat_map(|s| s.fixtures.iter()).collect();
        let (home, away) = stats_for(fixture, history.iter().copied());
        let result = analyze(fixture, &home, &away);
        self.analysis = Some(AnalysisView {
            fixture: fixture.clone(),
            home,
            away,
            result,
        });
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    RefreshStarted {
        league_key: String,
    },
    LeagueRefreshed {
        set: LeagueFixtureSet,
        outcome: RefreshOutcome,
    },
    Notice(StaleDataWarning),
    Log(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    RefreshLeague { key: String, force: bool },
    RefreshAll { force: bool },
    Shutdown,
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::RefreshStarted { league_key } => {
            state.refreshing.insert(league_key);
        }
        Delta::LeagueRefreshed { set, outcome } => {
            // A newer refresh for the league is still in flight.
            if outcome == RefreshOutcome::Discarded {
                return;
            }
            state.refreshing.remove(&set.league_key);
            if outcome == RefreshOutcome::Fetched {
                state.warnings.remove(&set.league_key);
            }
            let key = set.league_key.clone();
            let count = set.eligible().count();
            if state.store.replace(set) {
                state.push_log(format!(
                    "[INFO] {}: {count} upcoming fixtures ({})",
                    key,
                    outcome_label(outcome)
                ));
                state.clamp_selection();
                state.update_suggestions();
            }
        }
        Delta::Notice(warning) => {
            state.push_log(format!("[WARN] {warning}"));
            state.warnings.insert(warning.league_key.clone(), warning);
        }
        Delta::Log(line) => state.push_log(line),
    }
}

pub fn outcome_label(outcome: RefreshOutcome) -> &'static str {
    match outcome {
        RefreshOutcome::Cached => "cached",
        RefreshOutcome::Fetched => "fetched",
        RefreshOutcome::Fallback => "sample data",
        RefreshOutcome::KeptPrevious => "kept previous",
        RefreshOutcome::Discarded => "superseded",
    }
}
