//! Classification of failed frame fetches
//!
//! Every failure collapses into one of two kinds: the service answered but
//! with a failure (server), or it could not be reached at all (network).

use std::fmt;

/// The two kinds of failure reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Server,
    Network,
}

impl ErrorKind {
    /// Text shown to the user when a fetch of this kind fails
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Server => "A server error occurred. Please try again later.",
            ErrorKind::Network => {
                "A network error occurred. Please check your internet connection or try again later."
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Server => write!(f, "server"),
            ErrorKind::Network => write!(f, "network"),
        }
    }
}

/// Why a frame could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Service reachable but answered with a failure (or an unreadable body)
    Server { status: Option<u16>, detail: String },

    /// Service unreachable, or the request failed at the transport level
    Network { detail: String },
}

impl FetchError {
    pub fn server(status: Option<u16>, detail: impl Into<String>) -> Self {
        FetchError::Server {
            status,
            detail: detail.into(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        FetchError::Network { detail: detail.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Server { .. } => ErrorKind::Server,
            FetchError::Network { .. } => ErrorKind::Network,
        }
    }

    /// Classify an HTTP status that is not a success
    pub fn from_status_code(status: u16) -> Self {
        FetchError::server(Some(status), format!("HTTP {}", status))
    }

    /// Classify a reqwest error
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() || error.is_request() {
            FetchError::network(error.to_string())
        } else if let Some(status) = error.status() {
            Self::from_status_code(status.as_u16())
        } else if error.is_decode() {
            FetchError::server(None, format!("invalid response body: {}", error))
        } else {
            FetchError::network(error.to_string())
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Server { status: Some(status), detail } => {
                write!(f, "server error ({}): {}", status, detail)
            }
            FetchError::Server { status: None, detail } => write!(f, "server error: {}", detail),
            FetchError::Network { detail } => write!(f, "network error: {}", detail),
        }
    }
}

impl std::error::Error for FetchError {}
