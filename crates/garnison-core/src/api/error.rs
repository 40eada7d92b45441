use serde_json::Value;
use thiserror::Error;

use crate::models::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Strapi error message if the body is a Strapi error, else the
    /// (truncated) raw body
    fn describe_body(body: &str) -> String {
        let message = serde_json::from_str::<Value>(body).ok().and_then(|v| {
            let error = v.get("error")?;
            let message = error.get("message")?.as_str()?;
            Some(match error.get("name").and_then(Value::as_str) {
                Some(name) => format!("{}: {}", name, message),
                None => message.to_string(),
            })
        });
        let text = message.unwrap_or_else(|| body.to_string());
        if text.chars().count() <= MAX_ERROR_BODY_LENGTH {
            text
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                text.chars().take(MAX_ERROR_BODY_LENGTH).collect::<String>(),
                text.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let described = Self::describe_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(described),
            404 => ApiError::NotFound(described),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(described),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, described)),
        }
    }
}

/// Failure of a remark batch submission
#[derive(Error, Debug)]
pub enum BatchError {
    /// A draft failed validation; nothing was sent
    #[error("Remark #{}: {source}", .index + 1)]
    Invalid {
        index: usize,
        #[source]
        source: ValidationError,
    },

    /// Some creates failed. Remarks that were created are kept.
    #[error("{} of {total} remarks could not be created", .failures.len())]
    Failed {
        total: usize,
        failures: Vec<(usize, String)>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_maps_codes() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "down"),
            ApiError::ServerError(m) if m == "down"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "x"),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_strapi_error_body_is_summarized() {
        let body = r#"{"data":null,"error":{"status":403,"name":"ForbiddenError","message":"Forbidden","details":{}}}"#;
        match ApiError::from_status(StatusCode::FORBIDDEN, body) {
            ApiError::AccessDenied(m) => assert_eq!(m, "ForbiddenError: Forbidden"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "é".repeat(800);
        match ApiError::from_status(StatusCode::NOT_FOUND, &body) {
            ApiError::NotFound(m) => {
                assert!(m.contains("truncated"));
                assert!(m.chars().count() < 600);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_batch_error_messages() {
        let err = BatchError::Invalid {
            index: 1,
            source: ValidationError::MissingField("contenu"),
        };
        assert!(err.to_string().starts_with("Remark #2:"));

        let err = BatchError::Failed {
            total: 3,
            failures: vec![(0, "x".into())],
        };
        assert_eq!(err.to_string(), "1 of 3 remarks could not be created");
    }
}
