use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use serde_json::json;

use matchday_desk::analysis::{analyze, stats_for};
use matchday_desk::api_sports::ApiSportsClient;
use matchday_desk::cache::{CachePolicy, FixtureCache, RefreshOptions};
use matchday_desk::config::AppConfig;
use matchday_desk::league::LeagueRegistry;
use matchday_desk::logging;
use matchday_desk::resolver::QueryResolver;
use matchday_desk::window::{TimeWindow, filter_by_window};

#[derive(Debug, Default)]
struct Args {
    query: Option<String>,
    league: Option<String>,
    window: Option<TimeWindow>,
    force: bool,
    list: bool,
    json: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init_stderr();

    let args = parse_args(std::env::args().skip(1))?;
    if args.query.is_none() && !args.list {
        bail!(concat!(
            "usage: resolve \"<home> vs <away>\" ",
            "[--league KEY] [--window W] [--force] [--list] [--json]"
        ));
    }

    let config = AppConfig::from_env();
    let registry = LeagueRegistry::defaults(config.season);
    if let Some(key) = &args.league
        && registry.get(key).is_none()
    {
        let known = registry.keys().collect::<Vec<_>>().join(", ");
        bail!("unknown league '{key}' (known: {known})");
    }

    let source = ApiSportsClient::from_config(&config);
    let mut cache = FixtureCache::new(registry, source, CachePolicy::from_config(&config));
    let opts = RefreshOptions {
        force: args.force,
        horizon_days: None,
    };
    match &args.league {
        Some(key) => {
            cache.refresh_league(key, opts)?;
        }
        None => {
            cache.refresh_all(opts);
        }
    }
    for warning in cache.drain_warnings() {
        eprintln!("warning: {warning}");
    }

    let store = cache.store();
    if args.list {
        let window = args.window.unwrap_or(TimeWindow::Default);
        for set in store.sets() {
            if args.league.as_deref().is_some_and(|k| k != set.league_key) {
                continue;
            }
            println!(
                "{} ({}){}",
                store.registry().label(&set.league_key),
                window.label(config.default_window_days),
                if set.synthetic { " [sample data]" } else { "" }
            );
            let fixtures = filter_by_window(&set.fixtures, window, config.default_window_days);
            for fixture in fixtures.into_iter().filter(|f| f.is_eligible()) {
                println!(
                    "  {:>8}  {}  {}  [{}]",
                    fixture.fixture_id,
                    fixture.kickoff_in(&Local).format("%Y-%m-%d %H:%M"),
                    fixture.title(),
                    fixture.status_label()
                );
            }
        }
    }

    let Some(query) = args.query.as_deref() else {
        return Ok(());
    };
    let resolver = QueryResolver::new(store);
    let fixture = match resolver.resolve(query, args.league.as_deref()) {
        Ok(fixture) => fixture,
        Err(err) => {
            let names = err
                .context()
                .suggestions
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>();
            if !names.is_empty() {
                eprintln!("did you mean: {}", names.join(", "));
            }
            return Err(anyhow!(err));
        }
    };

    let history: Vec<_> = store.sets().flat_map(|s| s.fixtures.iter()).collect();
    let (home, away) = stats_for(&fixture, history.iter().copied());
    let result = analyze(&fixture, &home, &away);

    if args.json {
        let out = json!({ "fixture": fixture, "analysis": result });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("encode result")?
        );
        return Ok(());
    }

    println!("{}", fixture.title());
    println!(
        "  {} | {} | {}",
        store.registry().label(&fixture.league_key),
        fixture.kickoff_in(&Local).format("%a %d %b %Y %H:%M"),
        fixture.venue_name.as_deref().unwrap_or("venue tbc")
    );
    println!(
        "  H {}%  D {}%  A {}%  | {} ({}% confidence)",
        result.home_win,
        result.draw,
        result.away_win,
        result.verdict.label(),
        result.confidence
    );
    for factor in &result.key_factors {
        println!("  - {factor}");
    }
    if result.synthetic {
        println!("  (ratings simulated)");
    }
    Ok(())
}

fn parse_args<I>(raw: I) -> Result<Args>
where
    I: IntoIterator<Item = String>,
{
    let mut args = Args::default();
    let mut words = Vec::new();
    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--league" | "-l" => {
                args.league = Some(iter.next().context("--league needs a key")?);
            }
            "--window" | "-w" => {
                let raw = iter.next().context("--window needs a value")?;
                args.window = Some(
                    TimeWindow::parse(&raw)
                        .with_context(|| format!("unknown window '{raw}'"))?,
                );
            }
            "--force" | "-f" => args.force = true,
            "--list" => args.list = true,
            "--json" => args.json = true,
            _ => words.push(arg),
        }
    }
    if !words.is_empty() {
        args.query = Some(words.join(" "));
    }
    Ok(args)
}
