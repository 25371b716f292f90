use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    NotFound,
    InvalidRequest,
    RateLimit,
    Server,
    Timeout,
    Connect,
    Unknown,
}

impl ErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Auth,
            404 => Self::NotFound,
            400 | 422 => Self::InvalidRequest,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }

    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect
        } else {
            Self::Unknown
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Server | Self::Timeout | Self::Connect
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        kind: ErrorKind,
        message: String,
    },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        kind: ErrorKind,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl ClientError {
    pub(crate) fn status(endpoint: &str, status: StatusCode, body: &str) -> Self {
        Self::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            kind: ErrorKind::from_status(status),
            message: error_message(status, body),
        }
    }

    pub(crate) fn transport(endpoint: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            kind: ErrorKind::from_transport(&source),
            source,
        }
    }

    pub(crate) fn decode(endpoint: &str, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Status { kind, .. } | Self::Transport { kind, .. } => *kind,
            Self::Decode { .. } => ErrorKind::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }
}

const MAX_MESSAGE_CHARS: usize = 200;

/// Pulls a readable message out of an error body: `detail`, `error` or
/// `message` JSON fields, else the raw text, else the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["detail", "error", "message"].iter().find_map(|key| {
                value.get(key).map(|field| match field.as_str() {
                    Some(text) => text.to_string(),
                    None => field.to_string(),
                })
            })
        });
    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string();
    }
    message.chars().take(MAX_MESSAGE_CHARS).collect()
}
