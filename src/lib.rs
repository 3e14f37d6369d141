pub mod analysis;
pub mod api_sports;
pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod fixture;
pub mod http_client;
pub mod league;
pub mod logging;
pub mod matcher;
pub mod prefs;
pub mod provider;
pub mod resolver;
pub mod state;
pub mod teams;
pub mod window;
