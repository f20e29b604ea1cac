use crate::validator::Rejection;
use thiserror::Error;

/// Error type for session operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A local precondition failed; nothing was sent to the authority.
    #[error(transparent)]
    Validation(#[from] Rejection),
    /// The request failed or the response could not be trusted.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The authority answered with an explicit error payload.
    #[error("{0}")]
    Authority(String),
    /// The authority answered, but the payload breaks session invariants.
    #[error("invalid outcome: {0}")]
    InvalidOutcome(String),
    #[error("player session already bootstrapped")]
    AlreadyBootstrapped,
    #[error("player session not bootstrapped")]
    NotBootstrapped,
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The message the authority sent, if this error carries one.
    pub fn authority_message(&self) -> Option<&str> {
        match self {
            Error::Authority(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::InvalidOutcome(_))
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("authority responded with {0}")]
    Status(reqwest::StatusCode),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type for session operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
