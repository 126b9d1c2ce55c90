//! Error types for the relay.
//!
//! Every failure that happens before a response is committed maps to an HTTP status and
//! an [`ErrorEnvelope`] body. Failures after a stream has started are reported in-band
//! by the streaming relay instead.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Missing {header} header")]
    MissingCredential { header: String },

    #[error("Invalid request body: {message}")]
    InvalidRequest { message: String },

    #[error("Upstream returned status {status}: {detail}")]
    UpstreamHttp { status: u16, detail: String },

    #[error("Upstream unreachable: {message}")]
    UpstreamTransport { message: String },

    #[error("Upstream returned an invalid response: {message}")]
    UpstreamDecode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RelayError {
    pub fn missing_credential(header: impl Into<String>) -> Self {
        Self::MissingCredential {
            header: header.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: msg.into(),
        }
    }

    pub fn upstream_http(status: u16, detail: impl Into<String>) -> Self {
        Self::UpstreamHttp {
            status,
            detail: detail.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::UpstreamTransport {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::UpstreamDecode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// HTTP status surfaced to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredential { .. } => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UpstreamHttp { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamTransport { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamDecode { .. } => StatusCode::BAD_GATEWAY,
            Self::Config { .. } | Self::Io(_) | Self::Toml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Uniform `{status_code, detail}` body for this error.
    pub fn envelope(&self) -> ErrorEnvelope {
        let detail = match self {
            Self::UpstreamHttp { detail, .. } => detail.clone(),
            Self::UpstreamTransport { message } => message.clone(),
            other => other.to_string(),
        };
        ErrorEnvelope {
            status_code: self.status().as_u16(),
            detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub detail: String,
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_is_mirrored() {
        let err = RelayError::upstream_http(429, "rate limited");
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            err.envelope(),
            ErrorEnvelope {
                status_code: 429,
                detail: "rate limited".to_string(),
            }
        );
    }

    #[test]
    fn test_unrepresentable_upstream_status_becomes_bad_gateway() {
        let err = RelayError::upstream_http(1000, "weird");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_failure_classes() {
        assert_eq!(
            RelayError::missing_credential("X-XAI-API-Key").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RelayError::transport("connection refused").status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            RelayError::decode("expected value").status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RelayError::transport("connection refused").envelope().detail,
            "connection refused"
        );
    }
}
