use std::time::Duration;

/// Failure to turn external input into a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    Malformed(String),
}

impl DocumentError {
    pub(crate) fn malformed(e: impl std::fmt::Display) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Errors raised by outbound calls (generative text, cloud storage).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Rate limiting or a transport-level fault. Retried by the resilient caller.
    #[error("temporary failure{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// Any other non-2xx response. Never retried.
    #[error("request failed ({status}): {body}")]
    Permanent { status: u16, body: String },

    #[error("not signed in to the storage account")]
    Unauthenticated,

    #[error("missing configuration: {0}")]
    Configuration(String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("request did not complete within {0:?}")]
    DeadlineExceeded(Duration),
}

impl RemoteError {
    pub fn transport(e: impl std::fmt::Display) -> Self {
        Self::Transient {
            status: None,
            message: e.to_string(),
        }
    }

    pub fn rate_limited(body: impl Into<String>) -> Self {
        Self::Transient {
            status: Some(429),
            message: body.into(),
        }
    }

    pub fn parse(e: impl std::fmt::Display) -> Self {
        Self::Parse(e.to_string())
    }

    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// The account token is missing, or the remote side rejected it.
    #[inline]
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::Permanent { status: 401, .. }
        )
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
