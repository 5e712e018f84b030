use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use strum_macros::Display;
use tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue;

/// Broad category of an [`Error`], used to decide how to react to it.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Kind {
    /// Bad endpoint, token or other caller input
    Validation,
    /// A frame or payload did not have the expected JSON shape
    Payload,
    /// Handshake, heartbeat or socket failure, see [`crate::ws::WsError`]
    #[strum(serialize = "websocket")]
    WebSocket,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn validation<S: Into<String>>(reason: S) -> Self {
        Self::with_source(
            Kind::Validation,
            Validation {
                reason: reason.into(),
            },
        )
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// The transport error behind this one, if it came from the socket.
    #[must_use]
    pub fn as_ws(&self) -> Option<&crate::ws::WsError> {
        self.downcast_ref()
    }

    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.as_deref()?.downcast_ref::<E>()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{} error: {src}", self.kind),
            None => write!(f, "{} error", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Caller input that was refused before anything touched the network.
#[non_exhaustive]
#[derive(Debug)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl StdError for Validation {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::Payload, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}

impl From<InvalidHeaderValue> for Error {
    fn from(e: InvalidHeaderValue) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}
