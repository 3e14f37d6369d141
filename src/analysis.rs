use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::fixture::{Fixture, FixtureStatus};

const BASE_SCORE: f64 = 50.0;
const HOME_ADVANTAGE: f64 = 15.0;
const BALANCE_WEIGHT: f64 = 0.3;
const FORM_WEIGHT: f64 = 2.0;
const HOME_WIN_ABOVE: f64 = 65.0;
const AWAY_WIN_BELOW: f64 = 35.0;

const DRAW_MAX: f64 = 30.0;
const DRAW_MIN: f64 = 10.0;
const DRAW_DECAY: f64 = 0.4;

const FORM_LEN: usize = 5;
const MOMENTUM_LEN: usize = 3;
const MAX_KEY_FACTORS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormResult {
    Win,
    Draw,
    Loss,
}

impl FormResult {
    pub fn points(self) -> f64 {
        match self {
            FormResult::Win => 3.0,
            FormResult::Draw => 1.0,
            FormResult::Loss => 0.0,
        }
    }

    pub fn letter(self) -> char {
        match self {
            FormResult::Win => 'W',
            FormResult::Draw => 'D',
            FormResult::Loss => 'L',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub offensive: f64,
    pub defensive: f64,
    pub form: Vec<FormResult>,
    pub possession: f64,
    pub synthetic: bool,
}

impl TeamStats {
    pub fn from_history<'a, I>(team_name: &str, fixtures: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Fixture>,
    {
        let mut played: Vec<(&Fixture, u8, u8)> = fixtures
            .into_iter()
            .filter(|f| f.status == FixtureStatus::Finished)
            .filter_map(|f| {
                let (home, away) = f.goals.both()?;
                if f.home_team.name == team_name {
                    Some((f, home, away))
                } else if f.away_team.name == team_name {
                    Some((f, away, home))
                } else {
                    None
                }
            })
            .collect();
        if played.is_empty() {
            return None;
        }
        played.sort_by_key(|(f, _, _)| f.kickoff);

        let games = played.len() as f64;
        let scored: f64 = played.iter().map(|(_, gf, _)| *gf as f64).sum::<f64>() / games;
        let conceded: f64 = played.iter().map(|(_, _, ga)| *ga as f64).sum::<f64>() / games;
        let form = played
            .iter()
            .rev()
            .take(FORM_LEN)
            .rev()
            .map(|(_, gf, ga)| match gf.cmp(ga) {
                std::cmp::Ordering::Greater => FormResult::Win,
                std::cmp::Ordering::Equal => FormResult::Draw,
                std::cmp::Ordering::Less => FormResult::Loss,
            })
            .collect();

        Some(Self {
            offensive: clamp(55.0 + scored * 15.0, 0.0, 100.0),
            defensive: clamp(95.0 - conceded * 15.0, 0.0, 100.0),
            form,
            possession: 50.0,
            synthetic: false,
        })
    }

    pub fn synthetic<R: Rng>(rng: &mut R) -> Self {
        let form = (0..FORM_LEN)
            .map(|_| match rng.gen_range(0..3) {
                0 => FormResult::Win,
                1 => FormResult::Draw,
                _ => FormResult::Loss,
            })
            .collect();
        Self {
            offensive: rng.gen_range(70..=100) as f64,
            defensive: rng.gen_range(70..=100) as f64,
            form,
            possession: rng.gen_range(45..=55) as f64,
            synthetic: true,
        }
    }

    pub fn form_string(&self) -> String {
        self.form.iter().map(|r| r.letter()).collect()
    }
}

pub fn stats_for<'a, I>(fixture: &Fixture, history: I) -> (TeamStats, TeamStats)
where
    I: IntoIterator<Item = &'a Fixture> + Clone,
{
    let mut rng = StdRng::seed_from_u64(fixture.fixture_id);
    let home = TeamStats::from_history(&fixture.home_team.name, history.clone())
        .unwrap_or_else(|| TeamStats::synthetic(&mut rng));
    let away = TeamStats::from_history(&fixture.away_team.name, history)
        .unwrap_or_else(|| TeamStats::synthetic(&mut rng));
    (home, away)
}

/// Recency-weighted form: W=3, D=1, L=0, the i-th result weighted 0.2·(i+1).
pub fn form_score(form: &[FormResult]) -> f64 {
    form.iter()
        .enumerate()
        .map(|(i, r)| r.points() * 0.2 * (i + 1) as f64)
        .sum()
}

pub fn momentum(form: &[FormResult]) -> f64 {
    let recent = &form[form.len().saturating_sub(MOMENTUM_LEN)..];
    let wins = recent.iter().filter(|r| **r == FormResult::Win).count() as f64;
    let draws = recent.iter().filter(|r| **r == FormResult::Draw).count() as f64;
    (wins * 2.0 + draws) / 6.0 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    HomeWin,
    AwayWin,
    Close,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::HomeWin => "Home win",
            Verdict::AwayWin => "Away win",
            Verdict::Close => "Draw or tight result",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub fixture_id: u64,
    pub home_win: u8,
    pub draw: u8,
    pub away_win: u8,
    pub confidence: u8,
    pub verdict: Verdict,
    pub key_factors: Vec<String>,
    pub home_score: f64,
    pub home_momentum: f64,
    pub away_momentum: f64,
    pub synthetic: bool,
}

pub fn analyze(fixture: &Fixture, home: &TeamStats, away: &TeamStats) -> AnalysisResult {
    let balance = (home.offensive + home.defensive) - (away.offensive + away.defensive);
    let home_form = form_score(&home.form);
    let away_form = form_score(&away.form);
    let form_diff = home_form - away_form;

    let home_score = clamp(
        BASE_SCORE + balance * BALANCE_WEIGHT + form_diff * FORM_WEIGHT + HOME_ADVANTAGE,
        0.0,
        100.0,
    );

    let (verdict, confidence) = if home_score > HOME_WIN_ABOVE {
        (Verdict::HomeWin, home_score)
    } else if home_score < AWAY_WIN_BELOW {
        (Verdict::AwayWin, 100.0 - home_score)
    } else {
        (Verdict::Close, 100.0 - (home_score - BASE_SCORE).abs() * 2.0)
    };

    // Draw share shrinks as the home score moves away from a coin flip; the
    // remainder is split by the home score so the three always total 100.
    let draw = clamp(
        DRAW_MAX - (home_score - BASE_SCORE).abs() * DRAW_DECAY,
        DRAW_MIN,
        DRAW_MAX,
    )
    .round() as u8;
    let decisive = 100 - draw;
    let home_win = ((home_score / 100.0) * decisive as f64).round() as u8;
    let home_win = home_win.min(decisive);
    let away_win = decisive - home_win;

    let mut key_factors = vec![format!("Home advantage for {}", fixture.home_team.name)];
    if form_diff.abs() > 2.0 {
        let better = if form_diff > 0.0 {
            &fixture.home_team
        } else {
            &fixture.away_team
        };
        key_factors.push(format!("Better recent form: {}", better.name));
    }
    if balance.abs() > 10.0 {
        let stronger = if balance > 0.0 {
            &fixture.home_team
        } else {
            &fixture.away_team
        };
        key_factors.push(format!("Stronger squad balance: {}", stronger.name));
    }
    let home_momentum = momentum(&home.form);
    let away_momentum = momentum(&away.form);
    if (home_momentum - away_momentum).abs() >= 50.0 {
        let hotter = if home_momentum > away_momentum {
            &fixture.home_team
        } else {
            &fixture.away_team
        };
        key_factors.push(format!("Momentum: {}", hotter.name));
    }
    key_factors.truncate(MAX_KEY_FACTORS);

    AnalysisResult {
        fixture_id: fixture.fixture_id,
        home_win,
        draw,
        away_win,
        confidence: clamp(confidence, 0.0, 100.0).round() as u8,
        verdict,
        key_factors,
        home_score,
        home_momentum,
        away_momentum,
        synthetic: home.synthetic || away.synthetic,
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}
