use std::io;

/// Error type returned by this crate.
///
/// Only failures that prevent an operation from producing an [`OpResult`]
/// are reported here. Non-success statuses and undecodable bodies travel
/// inside the [`OpResult`] instead.
///
/// [`OpResult`]: crate::OpResult
#[derive(Debug, thiserror::Error)]
pub enum KvsError {
    /// Connection could not be established (refused, unreachable, DNS).
    #[error("connection failed: {0}")]
    Connect(reqwest::Error),
    /// Connection dropped while the request was in flight.
    #[error("server disconnected: {0}")]
    Disconnected(reqwest::Error),
    /// Per-request timeout elapsed.
    #[error("request timed out: {0}")]
    Timeout(reqwest::Error),
    /// Any other error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Operation issued on a session that is no longer open.
    #[error("invalid session state: {0}")]
    InvalidState(String),
    /// Invalid client configuration or usage outside an async runtime.
    #[error("configuration error: {0}")]
    Config(String),
    /// Value could not be encoded into a request body.
    #[error("encode error: {0}")]
    Encode(String),
}

impl KvsError {
    /// Classifies a `reqwest` failure into the matching variant.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else if err.is_connect() {
            Self::Connect(err)
        } else if is_disconnect(&err) {
            Self::Disconnected(err)
        } else {
            Self::Transport(err)
        }
    }

    /// Returns `true` when the session as a whole should be considered
    /// unusable: the server went away or stopped answering in time.
    pub fn is_session_failure(&self) -> bool {
        matches!(self, Self::Disconnected(_) | Self::Timeout(_))
    }

    /// Returns `true` for connection-level failures worth another attempt.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Disconnected(_))
    }
}

// A request that was handed to the connection but failed before a response
// arrived means the peer closed or reset it.
fn is_disconnect(err: &reqwest::Error) -> bool {
    if err.is_request() || err.is_body() {
        return true;
    }

    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            );
        }
        source = inner.source();
    }
    false
}
