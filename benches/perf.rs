use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use chrono::{Duration, TimeZone, Utc};

use matchday_desk::cache::FixtureStore;
use matchday_desk::fixture::{Fixture, FixtureStatus, Goals, LeagueFixtureSet, TeamRef};
use matchday_desk::league::LeagueRegistry;
use matchday_desk::resolver::{QueryResolver, tokenize};
use matchday_desk::teams::extract_valid_teams;

const CLUBS: [&str; 20] = [
    "Real Madrid",
    "FC Barcelona",
    "Atletico Madrid",
    "Sevilla",
    "Real Betis",
    "Valencia",
    "Villarreal",
    "Real Sociedad",
    "Athletic Club",
    "Girona",
    "Osasuna",
    "Getafe",
    "Celta Vigo",
    "Mallorca",
    "Rayo Vallecano",
    "Alaves",
    "Espanyol",
    "Levante",
    "Elche",
    "Real Oviedo",
];

fn season(league: &str, rounds: usize) -> Vec<Fixture> {
    let start = Utc.with_ymd_and_hms(2025, 8, 15, 18, 0, 0).unwrap();
    let mut fixtures = Vec::new();
    let mut id = 0u64;
    for round in 0..rounds {
        for pair in 0..CLUBS.len() / 2 {
            let home = CLUBS[(pair + round) % CLUBS.len()];
            let away = CLUBS[(CLUBS.len() - 1 - pair + round) % CLUBS.len()];
            id += 1;
            fixtures.push(Fixture {
                fixture_id: id,
                kickoff: start + Duration::days(7 * round as i64),
                venue_name: None,
                status: if round + 2 < rounds {
                    FixtureStatus::Finished
                } else {
                    FixtureStatus::NotStarted
                },
                status_long: None,
                home_team: TeamRef::new(id as u32 * 2, home),
                away_team: TeamRef::new(id as u32 * 2 + 1, away),
                league_key: league.to_string(),
                goals: Goals::default(),
            });
        }
    }
    fixtures
}

fn store() -> FixtureStore {
    let mut store = FixtureStore::new(LeagueRegistry::defaults(None));
    for key in ["laliga", "premier", "fpc"] {
        store.replace(LeagueFixtureSet {
            league_key: key.to_string(),
            fixtures: season(key, 38),
            last_refreshed_at: Some(Utc::now()),
            synthetic: false,
        });
    }
    store
}

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize", |b| {
        b.iter(|| {
            black_box(tokenize(black_box("Real Madrid    vs   FC Barcelona")));
            black_box(tokenize(black_box("Atletico Madrid Real Sociedad")));
        })
    });
}

fn bench_resolve(c: &mut Criterion) {
    let store = store();
    let resolver = QueryResolver::new(&store);
    c.bench_function("resolve_scoped", |b| {
        b.iter(|| {
            let found = resolver.resolve(black_box("Oviedo vs Elche"), Some("laliga"));
            black_box(found.is_ok());
        })
    });
    c.bench_function("resolve_miss_unscoped", |b| {
        b.iter(|| {
            let found = resolver.resolve(black_box("Nowhere Rovers"), None);
            black_box(found.is_err());
        })
    });
}

fn bench_extract_teams(c: &mut Criterion) {
    let fixtures = season("laliga", 38);
    c.bench_function("extract_valid_teams", |b| {
        b.iter(|| black_box(extract_valid_teams(black_box(&fixtures)).len()))
    });
}

criterion_group!(perf, bench_tokenize, bench_resolve, bench_extract_teams);
criterion_main!(perf);
