use thiserror::Error;

/// Everything that can go wrong while pulling fixtures from the provider.
/// The fixture cache absorbs all of these except `UnknownLeague`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider reported errors: {0}")]
    Api(String),
    #[error("invalid fixtures payload: {0}")]
    Decode(String),
    #[error("unknown league `{0}`")]
    UnknownLeague(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}
