use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph, Wrap};
use tracing::{info, warn};

use matchday_desk::analysis::AnalysisResult;
use matchday_desk::api_sports::ApiSportsClient;
use matchday_desk::config::AppConfig;
use matchday_desk::fixture::Fixture;
use matchday_desk::league::LeagueRegistry;
use matchday_desk::logging;
use matchday_desk::prefs::{PrefsStore, Theme};
use matchday_desk::provider::{ProviderHandle, spawn_provider};
use matchday_desk::state::{AppState, Delta, ProviderCommand, SearchStatus, apply_delta};

struct App {
    state: AppState,
    should_quit: bool,
    provider: ProviderHandle,
    prefs: PrefsStore,
}

impl App {
    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.state.search_active {
            self.on_search_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('l') | KeyCode::Char('L') => {
                self.state.cycle_league();
                self.request_refresh(false);
            }
            KeyCode::Char('w') | KeyCode::Char('W') => self.state.cycle_window(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.request_refresh(true),
            KeyCode::Char('/') => {
                self.state.search_active = true;
                self.state.search_input.clear();
                self.state.update_suggestions();
            }
            KeyCode::Enter | KeyCode::Char('a') => {
                self.state.analyze_selected();
            }
            KeyCode::Char('t') | KeyCode::Char('T') => self.state.theme = self.state.theme.toggle(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => {
                self.state.help_overlay = false;
                self.state.analysis = None;
            }
            _ => {}
        }
    }

    fn on_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.state.search_active = false,
            KeyCode::Enter => {
                if self.state.submit_search().is_some() {
                    self.state.search_active = false;
                }
            }
            KeyCode::Tab => {
                if let Some(first) = self.state.suggestions.first() {
                    self.state.search_input = first.name.clone();
                    self.state.update_suggestions();
                }
            }
            KeyCode::Backspace => {
                self.state.search_input.pop();
                self.state.update_suggestions();
            }
            KeyCode::Char(c) => {
                self.state.search_input.push(c);
                self.state.update_suggestions();
            }
            _ => {}
        }
    }

    fn request_refresh(&mut self, force: bool) {
        let Some(key) = self.state.league_key().map(str::to_string) else {
            return;
        };
        if self.provider.send(ProviderCommand::RefreshLeague {
            key: key.clone(),
            force,
        }) {
            if force {
                self.state.push_log(format!("[INFO] Refreshing {key}"));
            }
        } else {
            self.state.push_log("[WARN] Refresh request failed");
        }
    }

    fn save_prefs(&mut self) {
        self.prefs.set_theme(self.state.theme);
        self.prefs.set_window(self.state.window);
        if let Some(key) = self.state.league_key() {
            self.prefs.set_league(key);
        }
        if let Err(err) = self.prefs.save() {
            warn!(error = %err, "could not save preferences");
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let log_path = logging::init_file()?;
    let config = AppConfig::from_env();
    let registry = LeagueRegistry::defaults(config.season);
    let prefs = PrefsStore::load();

    let mut state = AppState::new(registry.clone(), config.default_window_days);
    state.theme = prefs.theme();
    state.window = prefs.window();
    if let Some(key) = prefs.league() {
        state.set_league(key);
    }
    if config.api_key.is_none() {
        state.push_log("[WARN] APISPORTS_KEY not set, sample fixtures will be shown");
    }
    if let Some(path) = &log_path {
        info!(path = %path.display(), "dashboard starting");
    }

    let (tx, rx) = mpsc::channel();
    let source = ApiSportsClient::from_config(&config);
    let provider = spawn_provider(config, registry, source, tx);

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App {
        state,
        should_quit: false,
        provider,
        prefs,
    };
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.save_prefs();
    app.provider.stop();

    res.context("dashboard loop failed")
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, &app.state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

struct Palette {
    text: Color,
    muted: Color,
    accent: Color,
    selected_fg: Color,
    selected_bg: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            text: Color::White,
            muted: Color::DarkGray,
            accent: Color::Cyan,
            selected_fg: Color::White,
            selected_bg: Color::DarkGray,
        },
        Theme::Light => Palette {
            text: Color::Black,
            muted: Color::Gray,
            accent: Color::Blue,
            selected_fg: Color::Black,
            selected_bg: Color::LightCyan,
        },
    }
}

fn ui(frame: &mut Frame, state: &AppState) {
    let pal = palette(state.theme);
    let search_height = if state.search_active { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(search_height),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(state))
        .style(Style::default().fg(pal.text))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(chunks[1]);
    render_fixtures(frame, body[0], state, &pal);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(body[1]);
    render_teams(frame, side[0], state, &pal);
    render_analysis(frame, side[1], state, &pal);

    if state.search_active {
        render_search(frame, chunks[2], state, &pal);
    }

    let console = Paragraph::new(console_text(state))
        .style(Style::default().fg(pal.muted))
        .block(Block::default().title("Log").borders(Borders::ALL));
    frame.render_widget(console, chunks[3]);

    let footer = Paragraph::new(footer_text(state)).style(Style::default().fg(pal.muted));
    frame.render_widget(footer, chunks[4]);

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let refreshing = if state.is_refreshing() {
        " | refreshing…"
    } else {
        ""
    };
    let line1 = format!(
        "MATCHDAY DESK | {} | {}{} | {}",
        state.league_label(),
        state.window.label(state.default_window_days),
        refreshing,
        Local::now().format("%H:%M:%S")
    );
    let line2 = match state.league_set() {
        Some(set) if set.synthetic => "Sample fixtures: live data unavailable".to_string(),
        Some(set) => match set.last_refreshed_at {
            Some(at) => format!(
                "Updated {} | {} teams",
                at.with_timezone(&Local).format("%d %b %H:%M"),
                state.validated_teams().map(|t| t.len()).unwrap_or(0)
            ),
            None => "Waiting for fixtures…".to_string(),
        },
        None => String::new(),
    };
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    if state.search_active {
        "type team names | Tab complete | Enter resolve | Esc cancel".to_string()
    } else {
        concat!(
            "j/k Move | Enter Analyse | / Search | l League | w Window | ",
            "r Refresh | t Theme | ? Help | q Quit"
        )
        .to_string()
    }
}

fn render_fixtures(frame: &mut Frame, area: Rect, state: &AppState, pal: &Palette) {
    let block = Block::default().title("Fixtures").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = state.visible_fixtures();
    if rows.is_empty() {
        let msg = if state.is_refreshing() {
            "Loading fixtures…"
        } else {
            "No fixtures in this window"
        };
        frame.render_widget(
            Paragraph::new(msg).style(Style::default().fg(pal.muted)),
            inner,
        );
        return;
    }
    if inner.height == 0 {
        return;
    }

    let (start, end) = visible_range(state.selected, rows.len(), inner.height as usize);
    let lines: Vec<Line> = (start..end)
        .map(|idx| {
            let style = if idx == state.selected {
                Style::default().fg(pal.selected_fg).bg(pal.selected_bg)
            } else {
                Style::default().fg(pal.text)
            };
            Line::styled(fixture_row(rows[idx]), style)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn fixture_row(fixture: &Fixture) -> String {
    let score = match fixture.goals.both() {
        Some((h, a)) if fixture.status.is_in_progress() => format!(" {h}-{a}"),
        _ => String::new(),
    };
    format!(
        "{}  {}{}  [{}]",
        fixture.kickoff_in(&Local).format("%a %d %b %H:%M"),
        fixture.title(),
        score,
        fixture.status_label()
    )
}

fn render_teams(frame: &mut Frame, area: Rect, state: &AppState, pal: &Palette) {
    let suggesting = state.search_active && !state.suggestions.is_empty();
    let (title, names): (&str, Vec<&str>) = if suggesting {
        (
            "Suggestions",
            state.suggestions.iter().map(|t| t.name.as_str()).collect(),
        )
    } else {
        (
            "Teams with fixtures",
            state
                .validated_teams()
                .map(|teams| teams.iter().map(|t| t.name.as_str()).collect())
                .unwrap_or_default(),
        )
    };
    let text = if names.is_empty() {
        "No teams yet".to_string()
    } else {
        names.join("\n")
    };
    let para = Paragraph::new(text)
        .style(Style::default().fg(pal.text))
        .wrap(Wrap { trim: true })
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(para, area);
}

fn render_analysis(frame: &mut Frame, area: Rect, state: &AppState, pal: &Palette) {
    let block = Block::default().title("Analysis").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(view) = &state.analysis else {
        frame.render_widget(
            Paragraph::new("Select a fixture and press Enter, or / to search")
                .style(Style::default().fg(pal.muted))
                .wrap(Wrap { trim: true }),
            inner,
        );
        return;
    };

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(5)])
        .split(inner);

    let result = &view.result;
    let mut lines = vec![
        Line::styled(
            view.fixture.title(),
            Style::default().fg(pal.accent).add_modifier(Modifier::BOLD),
        ),
        Line::raw(format!(
            "{} ({}% confidence)",
            result.verdict.label(),
            result.confidence
        )),
        Line::raw(format!(
            "Form {} vs {}",
            view.home.form_string(),
            view.away.form_string()
        )),
    ];
    for factor in &result.key_factors {
        lines.push(Line::raw(format!("• {factor}")));
    }
    if result.synthetic {
        lines.push(Line::styled(
            "Ratings are simulated",
            Style::default().fg(pal.muted),
        ));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(pal.text))
            .wrap(Wrap { trim: true }),
        parts[0],
    );
    frame.render_widget(win_bar_chart(result), parts[1]);
}

fn win_bar_chart(result: &AnalysisResult) -> BarChart<'static> {
    let bar = |label: &'static str, value: u8, color: Color| {
        Bar::default()
            .label(label.into())
            .value(value as u64)
            .text_value(format!("{value}%"))
            .style(Style::default().fg(color))
    };
    let bars = [
        bar("H", result.home_win, Color::Green),
        bar("D", result.draw, Color::Yellow),
        bar("A", result.away_win, Color::Red),
    ];
    BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(0)
        .max(100)
}

fn render_search(frame: &mut Frame, area: Rect, state: &AppState, pal: &Palette) {
    let status = match &state.search_status {
        SearchStatus::Idle => String::new(),
        SearchStatus::Resolved { title, .. } => format!("  → {title}"),
        SearchStatus::Failed {
            message,
            suggestions,
        } => {
            if suggestions.is_empty() {
                format!("  ✗ {message}")
            } else {
                format!("  ✗ {message} (try {})", suggestions.join(", "))
            }
        }
    };
    let text = format!("/ {}▏{status}", state.search_input);
    let para = Paragraph::new(text)
        .style(Style::default().fg(pal.text))
        .block(Block::default().title("Search").borders(Borders::ALL));
    frame.render_widget(para, area);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    let skip = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Matchday Desk - Help",
        "",
        "Browse:",
        "  j/k or ↑/↓   Move",
        "  Enter / a    Analyse selected fixture",
        "  l            Next league",
        "  w            Next time window",
        "  r            Force refresh",
        "  t            Toggle theme",
        "  Esc          Clear analysis",
        "",
        "Search:",
        "  /            Start search (\"Madrid vs Barcelona\")",
        "  Tab          Take first suggestion",
        "  Enter        Resolve",
        "",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
