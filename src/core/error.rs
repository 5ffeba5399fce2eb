//! Error handling - one hierarchy for the whole ingestion core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// DepthWire error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed market descriptor or config file. Fatal for the affected
    /// market; other markets are unaffected.
    #[error("config error: {0}")]
    Config(String),

    /// An inbound frame is not valid JSON or matches no translator rule.
    /// The translation state may be ambiguous afterwards, so sessions treat
    /// this like a transport failure and reconnect.
    #[error("decode error: {0}")]
    Decode(String),

    /// Disconnect, timeout, or write failure on the venue transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// A downstream consumer refused an event. Surfaced upward, never
    /// retried by the core.
    #[error("sink error: {0}")]
    Sink(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
