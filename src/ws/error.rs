#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use tokio_tungstenite::tungstenite;

/// Transport failures surfaced by the connection task and the event stream.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// I/O or protocol failure on the socket
    Connection(tungstenite::Error),
    /// The server answered the upgrade request with a non-101 status, e.g. 401 for a stale token
    Rejected {
        /// HTTP status of the refusal
        status: u16,
    },
    /// The upgrade did not complete within the configured connect timeout
    ConnectTimeout {
        /// Timeout that elapsed
        after: Duration,
    },
    /// No pong frame arrived within the heartbeat timeout
    HeartbeatTimeout,
    /// The connection was closed, or was never established
    ConnectionClosed,
    /// An `events()` consumer fell behind and missed events
    Lagged {
        /// Number of events that were missed
        count: u64,
    },
}

impl WsError {
    /// Classify a failed upgrade, separating HTTP refusals from socket errors.
    pub(crate) fn from_handshake(e: tungstenite::Error) -> Self {
        match e {
            tungstenite::Error::Http(response) => Self::Rejected {
                status: response.status().as_u16(),
            },
            other => Self::Connection(other),
        }
    }

    /// Whether the server refused the credentials attached to the handshake.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status: 401 | 403 })
    }
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "transport error: {e}"),
            Self::Rejected { status } => write!(f, "handshake rejected with HTTP {status}"),
            Self::ConnectTimeout { after } => {
                write!(f, "handshake did not complete within {}ms", after.as_millis())
            }
            Self::HeartbeatTimeout => write!(f, "no heartbeat reply from server"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::Lagged { count } => write!(f, "event stream lagged, missed {count} events"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WsError> for crate::error::Error {
    fn from(e: WsError) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, e)
    }
}

impl From<tungstenite::Error> for crate::error::Error {
    fn from(e: tungstenite::Error) -> Self {
        WsError::from_handshake(e).into()
    }
}
