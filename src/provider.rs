use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cache::{
    CachePolicy, FixtureCache, FixtureSource, RefreshOptions, RefreshOutcome, RefreshTicket,
    fetch_ticket,
};
use crate::config::AppConfig;
use crate::error::FetchError;
use crate::fixture::Fixture;
use crate::league::LeagueRegistry;
use crate::state::{Delta, ProviderCommand, outcome_label};

const IDLE_WAIT: Duration = Duration::from_millis(200);

type FetchDone = (RefreshTicket, Result<Vec<Fixture>, FetchError>);

pub struct ProviderHandle {
    cmd_tx: Sender<ProviderCommand>,
    join: Option<JoinHandle<()>>,
}

impl ProviderHandle {
    pub fn sender(&self) -> Sender<ProviderCommand> {
        self.cmd_tx.clone()
    }

    pub fn send(&self, cmd: ProviderCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    pub fn stop(mut self) {
        let _ = self.cmd_tx.send(ProviderCommand::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

pub fn spawn_provider<S>(
    config: AppConfig,
    registry: LeagueRegistry,
    source: S,
    tx: Sender<Delta>,
) -> ProviderHandle
where
    S: FixtureSource + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let join = thread::spawn(move || {
        let cache = FixtureCache::new(registry, source, CachePolicy::from_config(&config));
        Provider::new(cache, tx, config.refresh_interval).run(cmd_rx);
    });
    ProviderHandle {
        cmd_tx,
        join: Some(join),
    }
}

struct Provider<S: FixtureSource> {
    cache: FixtureCache<S>,
    tx: Sender<Delta>,
    done_tx: Sender<FetchDone>,
    done_rx: Receiver<FetchDone>,
    interval: Duration,
}

impl<S: FixtureSource + 'static> Provider<S> {
    fn new(cache: FixtureCache<S>, tx: Sender<Delta>, interval: Duration) -> Self {
        let (done_tx, done_rx) = mpsc::channel();
        Self {
            cache,
            tx,
            done_tx,
            done_rx,
            interval,
        }
    }

    fn run(mut self, cmd_rx: Receiver<ProviderCommand>) {
        info!(leagues = self.cache.store().registry().len(), "provider started");
        self.refresh_all(false);
        let mut last_timer = Instant::now();

        loop {
            match cmd_rx.recv_timeout(IDLE_WAIT) {
                Ok(ProviderCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(ProviderCommand::RefreshLeague { key, force }) => {
                    self.refresh_league(&key, force);
                }
                Ok(ProviderCommand::RefreshAll { force }) => self.refresh_all(force),
                Err(RecvTimeoutError::Timeout) => {}
            }

            while let Ok((ticket, result)) = self.done_rx.try_recv() {
                self.complete(ticket, result);
            }

            if last_timer.elapsed() >= self.interval {
                self.refresh_all(false);
                last_timer = Instant::now();
            }
        }
        info!("provider stopped");
    }

    fn refresh_all(&mut self, force: bool) {
        let keys: Vec<String> = self
            .cache
            .store()
            .registry()
            .keys()
            .map(str::to_string)
            .collect();
        for key in keys {
            self.refresh_league(&key, force);
        }
    }

    fn refresh_league(&mut self, key: &str, force: bool) {
        let opts = RefreshOptions {
            force,
            horizon_days: None,
        };
        match self.cache.begin_refresh(key, opts) {
            Ok(Some(ticket)) => self.spawn_fetch(ticket),
            Ok(None) => debug!(league = %key, "fixtures still fresh"),
            Err(err) => {
                warn!(league = %key, error = %err, "refresh rejected");
                let _ = self.tx.send(Delta::Log(format!("[WARN] {err}")));
            }
        }
    }

    fn spawn_fetch(&self, ticket: RefreshTicket) {
        let _ = self.tx.send(Delta::RefreshStarted {
            league_key: ticket.league.key.clone(),
        });
        let source = self.cache.source();
        let done_tx = self.done_tx.clone();
        thread::spawn(move || {
            let result = fetch_ticket(Arc::as_ref(&source), &ticket);
            let _ = done_tx.send((ticket, result));
        });
    }

    fn complete(&mut self, ticket: RefreshTicket, result: Result<Vec<Fixture>, FetchError>) {
        let report = self.cache.complete_refresh(ticket, result);
        for warning in self.cache.drain_warnings() {
            let _ = self.tx.send(Delta::Notice(warning));
        }
        if report.outcome == RefreshOutcome::Discarded {
            let _ = self.tx.send(Delta::Log(format!(
                "[INFO] {}: older refresh {}",
                report.league_key,
                outcome_label(report.outcome)
            )));
        }
        let _ = self.tx.send(Delta::LeagueRefreshed {
            set: report.set,
            outcome: report.outcome,
        });
    }
}
