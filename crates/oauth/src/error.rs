use std::{net::SocketAddr, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty parameter: {name} must be set")]
    InvalidParameter { name: &'static str },

    #[error("authorization timed out after {}s", .timeout.as_secs_f32())]
    AuthorizationTimeout { timeout: Duration },

    #[error("invalid state in authorization callback: {received}")]
    StateMismatch { received: String },

    #[error("authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("failed to bind callback listener on {addr}: {source}")]
    CallbackBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("callback listener stopped before receiving a redirect")]
    CallbackClosed,

    #[error("token request failed: {0}")]
    TokenRequestFailed(#[source] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    TokenEndpointRejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse token response: {0}")]
    TokenResponseParseError(#[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether retrying the same operation may succeed without user or
    /// developer intervention.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AuthorizationTimeout { .. } | Self::TokenRequestFailed(_) => true,
            Self::TokenEndpointRejected { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(
            Error::AuthorizationTimeout {
                timeout: Duration::from_secs(5)
            }
            .is_retryable()
        );
        assert!(
            Error::TokenEndpointRejected {
                status: reqwest::StatusCode::BAD_GATEWAY,
                body: String::new(),
            }
            .is_retryable()
        );
        assert!(
            !Error::TokenEndpointRejected {
                status: reqwest::StatusCode::BAD_REQUEST,
                body: String::new(),
            }
            .is_retryable()
        );
        assert!(
            !Error::StateMismatch {
                received: "stale".into()
            }
            .is_retryable()
        );
        assert!(!Error::InvalidParameter { name: "client_id" }.is_retryable());
    }

    #[test]
    fn timeout_message_mentions_duration() {
        let err = Error::AuthorizationTimeout {
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "authorization timed out after 5s");
    }
}
