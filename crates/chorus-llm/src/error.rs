use http::StatusCode;
use thiserror::Error;

/// Canonical error taxonomy for a completion call
///
/// Every vendor and transport fault is converted into one of these at the
/// adapter boundary. Producing one ends the owning call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// Credential missing, invalid, or lacking permission
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Vendor-supplied explanation
        message: String,
    },

    /// Vendor is throttling requests
    #[error("rate limited: {message}")]
    RateLimited {
        /// Seconds until the vendor accepts requests again, when advertised
        retry_after: Option<u64>,
        /// Vendor-supplied explanation
        message: String,
    },

    /// Vendor-side failure or rejection
    #[error("server error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    ServerError {
        /// HTTP status, absent for in-stream error envelopes
        status: Option<u16>,
        /// Raw vendor message text
        message: String,
    },

    /// Body could not be decoded at all
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Body decoded but did not have the expected shape
    #[error("decoding failed: {0}")]
    DecodingFailed(String),

    /// Caller-side configuration problem (no usable target)
    #[error("no API service: {0}")]
    NoApiService(String),

    /// Connectivity, timeout, or body transfer failure
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Anything not covered above
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl LlmError {
    /// Raw message text carried by this error
    pub fn message(&self) -> &str {
        match self {
            Self::Unauthorized { message }
            | Self::RateLimited { message, .. }
            | Self::ServerError { message, .. } => message,
            Self::InvalidResponse(message)
            | Self::DecodingFailed(message)
            | Self::NoApiService(message)
            | Self::RequestFailed(message)
            | Self::Unknown(message) => message,
        }
    }

    /// Classify a non-success HTTP status with an already extracted message
    pub fn from_status(status: StatusCode, retry_after: Option<u64>, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized { message },
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { retry_after, message },
            _ => Self::ServerError {
                status: Some(status.as_u16()),
                message,
            },
        }
    }

    /// Classify an error envelope that arrived inside a stream or body
    ///
    /// `error_type` is the vendor's type or status string, e.g.
    /// `rate_limit_error` or `RESOURCE_EXHAUSTED`.
    pub fn from_envelope(error_type: Option<&str>, status: Option<u16>, message: String) -> Self {
        let error_type = error_type.unwrap_or_default().to_ascii_lowercase();

        if status == Some(429) || error_type.contains("rate_limit") || error_type == "resource_exhausted" {
            return Self::RateLimited {
                retry_after: None,
                message,
            };
        }
        if matches!(status, Some(401 | 403))
            || matches!(
                error_type.as_str(),
                "authentication_error" | "permission_error" | "invalid_api_key" | "unauthenticated" | "permission_denied"
            )
        {
            return Self::Unauthorized { message };
        }

        Self::ServerError { status, message }
    }

    /// Short machine-readable kind, used in logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::DecodingFailed(_) => "decoding_failed",
            Self::NoApiService(_) => "no_api_service",
            Self::RequestFailed(_) => "request_failed",
            Self::Unknown(_) => "unknown",
        }
    }
}

// Bodies are decoded by `decode_json`, never by reqwest, so every reqwest
// failure is a transport failure
impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        Self::RequestFailed(e.to_string())
    }
}

/// Decode a JSON body, separating "not JSON" from "wrong shape"
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, LlmError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(format!("body is not JSON: {e}")))?;
    serde_json::from_value(value).map_err(|e| LlmError::DecodingFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            LlmError::from_status(StatusCode::UNAUTHORIZED, None, "bad key".into()),
            LlmError::Unauthorized { .. }
        ));
        assert!(matches!(
            LlmError::from_status(StatusCode::FORBIDDEN, None, "no access".into()),
            LlmError::Unauthorized { .. }
        ));
        assert_eq!(
            LlmError::from_status(StatusCode::TOO_MANY_REQUESTS, Some(7), "slow down".into()),
            LlmError::RateLimited {
                retry_after: Some(7),
                message: "slow down".into()
            }
        );
        assert_eq!(
            LlmError::from_status(StatusCode::BAD_REQUEST, None, "nope".into()),
            LlmError::ServerError {
                status: Some(400),
                message: "nope".into()
            }
        );
    }

    #[test]
    fn envelope_classification() {
        assert!(matches!(
            LlmError::from_envelope(Some("rate_limit_error"), None, "slow".into()),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(
            LlmError::from_envelope(Some("RESOURCE_EXHAUSTED"), Some(429), "quota".into()),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(
            LlmError::from_envelope(Some("authentication_error"), None, "bad key".into()),
            LlmError::Unauthorized { .. }
        ));
        assert_eq!(
            LlmError::from_envelope(Some("overloaded_error"), None, "Overloaded".into()),
            LlmError::ServerError {
                status: None,
                message: "Overloaded".into()
            }
        );
    }

    #[test]
    fn server_error_display_includes_status() {
        let err = LlmError::ServerError {
            status: Some(500),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "server error (500): boom");

        let err = LlmError::ServerError {
            status: None,
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "server error: overloaded");
    }

    #[test]
    fn decode_json_separates_syntax_from_shape() {
        #[derive(Debug, serde::Deserialize)]
        struct Shape {
            #[allow(dead_code)]
            id: String,
        }

        assert!(matches!(decode_json::<Shape>("<html>"), Err(LlmError::InvalidResponse(_))));
        assert!(matches!(decode_json::<Shape>(r#"{"id": 4}"#), Err(LlmError::DecodingFailed(_))));
        assert!(decode_json::<Shape>(r#"{"id": "x"}"#).is_ok());
    }
}
