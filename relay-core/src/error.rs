use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A request or payload signature did not verify.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Structural or business-rule rejection. The reason is returned to
    /// clients verbatim.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No active stream for rendezvous key {0}")]
    NoActiveStream(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Store and backing-service failures the caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Redis(_) | Self::Timeout(_))
    }

    /// Machine-readable error code exposed by the API layer.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::InvalidMessage(_) => "invalid_message",
            Self::PermissionDenied(_) => "permission_denied",
            Self::NotFound(_) => "not_found",
            Self::NoActiveStream(_) => "no_active_stream",
            Self::Redis(_) | Self::Timeout(_) => "unavailable",
            Self::Serialization(_)
            | Self::Decode(_)
            | Self::Configuration(_)
            | Self::Internal(_) => "internal",
        }
    }

    /// The client-facing reason, without the variant prefix.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Unauthenticated(msg)
            | Self::InvalidMessage(msg)
            | Self::PermissionDenied(msg)
            | Self::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidMessage(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
