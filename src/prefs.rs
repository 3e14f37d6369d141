use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::window::TimeWindow;

pub const APP_DIR: &str = "matchday_desk";
const PREFS_FILE: &str = "prefs.json";
const PREFS_VERSION: u32 = 1;

const KEY_THEME: &str = "theme";
const KEY_LEAGUE: &str = "league";
const KEY_WINDOW: &str = "window";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PrefsFile {
    version: u32,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// Small key-value store for UI preferences. A missing, unreadable or
/// out-of-version file behaves like an empty one.
#[derive(Debug, Clone, Default)]
pub struct PrefsStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl PrefsStore {
    pub fn load() -> Self {
        match cache_dir() {
            Some(dir) => Self::load_from(dir.join(PREFS_FILE)),
            None => Self::default(),
        }
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = read_file(&path)
            .filter(|f| f.version == PREFS_VERSION)
            .map(|f| f.values)
            .unwrap_or_default();
        Self {
            path: Some(path),
            values,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn theme(&self) -> Theme {
        self.get(KEY_THEME).and_then(Theme::parse).unwrap_or_default()
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.set(KEY_THEME, theme.as_str());
    }

    pub fn league(&self) -> Option<&str> {
        self.get(KEY_LEAGUE)
    }

    pub fn set_league(&mut self, key: &str) {
        self.set(KEY_LEAGUE, key);
    }

    pub fn window(&self) -> TimeWindow {
        self.get(KEY_WINDOW)
            .and_then(TimeWindow::parse)
            .unwrap_or(TimeWindow::Default)
    }

    pub fn set_window(&mut self, window: TimeWindow) {
        self.set(KEY_WINDOW, window.as_str());
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create prefs dir {}", dir.display()))?;
        }
        let file = PrefsFile {
            version: PREFS_VERSION,
            values: self.values.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("encode prefs")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
        Ok(())
    }
}

fn read_file(path: &Path) -> Option<PrefsFile> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str::<PrefsFile>(&raw).ok()
}

pub fn cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}
