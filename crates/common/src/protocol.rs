//! Request and response types exchanged over the public HTTP API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Time-to-live
// ---------------------------------------------------------------------------

/// How long a shared secret stays retrievable if nobody reads it.
///
/// `Month` is a fixed 5208 hours, not a calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeToLive {
    #[default]
    Hour,
    Day,
    Week,
    Month,
}

impl TimeToLive {
    /// Lifetime in whole hours.
    pub const fn hours(self) -> i64 {
        match self {
            TimeToLive::Hour => 1,
            TimeToLive::Day => 24,
            TimeToLive::Week => 168,
            TimeToLive::Month => 5208,
        }
    }

    /// Lifetime in seconds.
    pub const fn seconds(self) -> i64 {
        self.hours() * 3600
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TimeToLive::Hour => "hour",
            TimeToLive::Day => "day",
            TimeToLive::Week => "week",
            TimeToLive::Month => "month",
        }
    }
}

impl fmt::Display for TimeToLive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeToLive {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(TimeToLive::Hour),
            "day" => Ok(TimeToLive::Day),
            "week" => Ok(TimeToLive::Week),
            "month" => Ok(TimeToLive::Month),
            other => Err(format!("unknown time-to-live: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Share endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /secrets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRequest {
    /// The plaintext secret. Never logged.
    pub secret: String,
    /// Lifetime of the secret; defaults to one hour.
    #[serde(default)]
    pub ttl: TimeToLive,
}

/// Successful response body for `POST /secrets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    /// Opaque, URL-safe token that reveals the secret exactly once.
    pub token: String,
    pub ttl: TimeToLive,
    pub expires_in_secs: i64,
}

// ---------------------------------------------------------------------------
// Status / reveal endpoints
// ---------------------------------------------------------------------------

/// Response body for `GET /secrets/{token}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub available: bool,
}

/// Response body for `POST /secrets/{token}/reveal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealResponse {
    pub secret: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"not_found"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        let message = match err {
            crate::ServiceError::BadRequest(m) | crate::ServiceError::NotFound(m) => m.clone(),
            // Internal details stay in the logs.
            crate::ServiceError::Internal(_) => "internal error".to_owned(),
        };
        Self::new(err.code(), message)
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: String,
    /// Name of the active storage backend (`"memory"` or `"sqlite"`).
    pub backend: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceError;
    use serde_json::json;

    #[test]
    fn ttl_hours_policy() {
        assert_eq!(TimeToLive::Hour.hours(), 1);
        assert_eq!(TimeToLive::Day.hours(), 24);
        assert_eq!(TimeToLive::Week.hours(), 168);
        assert_eq!(TimeToLive::Month.hours(), 5208);
        assert_eq!(TimeToLive::Hour.seconds(), 3600);
    }

    #[test]
    fn ttl_parses_case_insensitively() {
        assert_eq!("Week".parse::<TimeToLive>().unwrap(), TimeToLive::Week);
        assert_eq!(" month ".parse::<TimeToLive>().unwrap(), TimeToLive::Month);
        assert!("year".parse::<TimeToLive>().is_err());
    }

    #[test]
    fn share_request_defaults_ttl_to_hour() {
        let req: ShareRequest = serde_json::from_value(json!({"secret": "s3cr3t"})).unwrap();
        assert_eq!(req.ttl, TimeToLive::Hour);
    }

    #[test]
    fn share_request_accepts_lowercase_ttl() {
        let req: ShareRequest =
            serde_json::from_value(json!({"secret": "x", "ttl": "day"})).unwrap();
        assert_eq!(req.ttl, TimeToLive::Day);
        assert!(serde_json::from_value::<ShareRequest>(json!({"secret": "x", "ttl": "Day"}))
            .is_err());
    }

    #[test]
    fn internal_error_body_hides_details() {
        let err = ServiceError::Internal("sqlite: disk I/O error".into());
        let body = ErrorResponse::from(&err);
        assert_eq!(body.code, "internal_error");
        assert!(!body.message.contains("sqlite"));
    }

    #[test]
    fn health_response_serde() {
        let h = HealthResponse {
            status: "ok".into(),
            backend: "sqlite".into(),
        };
        let json = serde_json::to_string(&h).unwrap();
        let decoded: HealthResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.backend, "sqlite");
    }
}
