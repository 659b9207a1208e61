// ============================================================================
// ERRORS - Typed failures surfaced by the auth gateway, API client and views
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Failure of any identity or resource call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("session expired or invalid")]
    Unauthenticated,

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("validation failed (HTTP {status}): {message}")]
    ValidationError {
        status: u16,
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("referential conflict: {0}")]
    ReferentialConflict(String),
}

/// Sign-up is two calls; the caller must know which one failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignUpError {
    #[error("signup failed: {0}")]
    Registration(ApiError),

    #[error("account created but sign-in failed: {0}")]
    SignInAfterRegistration(ApiError),
}

/// Failure below HTTP: the request never produced a status code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::ServiceUnavailable(err.to_string())
    }
}

impl ApiError {
    /// Maps a non-2xx response to the error taxonomy
    pub fn from_response(status: u16, body: &str) -> Self {
        match status {
            401 => ApiError::Unauthenticated,
            404 => ApiError::NotFound(
                error_message(body).unwrap_or_else(|| "resource".to_string()),
            ),
            400..=499 => Self::validation(status, body),
            500..=599 => ApiError::ServiceUnavailable(format!("server returned HTTP {}", status)),
            _ => ApiError::ProtocolError(format!("unexpected HTTP status {}", status)),
        }
    }

    /// Builds a `ValidationError` from a DRF-style body (`{"field": ["msg"]}`)
    pub fn validation(status: u16, body: &str) -> Self {
        let fields = field_errors(body);
        let message = if !fields.is_empty() {
            fields
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                .collect::<Vec<_>>()
                .join("; ")
        } else {
            error_message(body).unwrap_or_else(|| format!("request rejected (HTTP {})", status))
        };

        ApiError::ValidationError { status, message, fields }
    }

    /// Message shown inline next to the form or list that failed
    pub fn user_message(&self) -> String {
        match self {
            ApiError::InvalidCredentials(message) => message.clone(),
            ApiError::Unauthenticated => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ApiError::ServiceUnavailable(_) => {
                "The server is unavailable right now. Please try again.".to_string()
            }
            ApiError::ProtocolError(_) => "The server sent an unexpected response.".to_string(),
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::NotFound(what) => format!("{} was not found", what),
            ApiError::ReferentialConflict(reason) => reason.clone(),
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::InvalidCredentials(_) | ApiError::Unauthenticated)
    }
}

impl SignUpError {
    pub fn user_message(&self) -> String {
        match self {
            SignUpError::Registration(err) => format!("Signup failed: {}", err.user_message()),
            SignUpError::SignInAfterRegistration(err) => format!(
                "Your account was created, but signing in failed: {}",
                err.user_message()
            ),
        }
    }
}

const MESSAGE_KEYS: [&str; 3] = ["error", "detail", "message"];

/// Top-level `error`/`detail`/`message` string, or the raw text when it is not HTML
pub(crate) fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('<') {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => MESSAGE_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string),
        Ok(serde_json::Value::String(text)) => Some(text),
        Ok(_) => None,
        Err(_) => Some(trimmed.chars().take(200).collect()),
    }
}

fn field_errors(body: &str) -> BTreeMap<String, Vec<String>> {
    let mut fields = BTreeMap::new();
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) else {
        return fields;
    };

    for (field, value) in map {
        if MESSAGE_KEYS.contains(&field.as_str()) {
            continue;
        }
        let messages = match value {
            serde_json::Value::String(text) => vec![text],
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(text) => text,
                    other => other.to_string(),
                })
                .collect(),
            other => vec![other.to_string()],
        };
        fields.insert(field, messages);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert_eq!(ApiError::from_response(401, ""), ApiError::Unauthenticated);
        assert!(matches!(ApiError::from_response(404, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_response(503, ""), ApiError::ServiceUnavailable(_)));
        assert!(matches!(ApiError::from_response(302, ""), ApiError::ProtocolError(_)));
        assert!(matches!(
            ApiError::from_response(400, "{}"),
            ApiError::ValidationError { status: 400, .. }
        ));
    }

    #[test]
    fn validation_error_keeps_field_detail() {
        let body = r#"{"name": ["department with this name already exists."], "status": "invalid"}"#;
        let ApiError::ValidationError { fields, message, .. } = ApiError::validation(400, body) else {
            panic!("expected validation error");
        };

        assert_eq!(fields["name"], vec!["department with this name already exists.".to_string()]);
        assert_eq!(fields["status"], vec!["invalid".to_string()]);
        assert!(message.contains("name: department with this name already exists."));
    }

    #[test]
    fn validation_error_falls_back_to_detail() {
        let err = ApiError::validation(403, r#"{"detail": "You do not have permission."}"#);
        assert_eq!(err.user_message(), "You do not have permission.");
    }

    #[test]
    fn html_bodies_are_not_echoed() {
        assert_eq!(error_message("<!DOCTYPE html><html></html>"), None);
        let err = ApiError::validation(400, "<!DOCTYPE html>");
        assert_eq!(err.user_message(), "request rejected (HTTP 400)");
    }

    #[test]
    fn transport_errors_become_service_unavailable() {
        let err: ApiError = TransportError::Timeout(Duration::from_secs(20)).into();
        assert_eq!(
            err,
            ApiError::ServiceUnavailable("request timed out after 20s".to_string())
        );
    }

    #[test]
    fn sign_up_errors_name_the_failed_step() {
        let registration = SignUpError::Registration(ApiError::validation(
            400,
            r#"{"error": "Email already registered"}"#,
        ));
        assert_eq!(registration.user_message(), "Signup failed: Email already registered");

        let login = SignUpError::SignInAfterRegistration(ApiError::InvalidCredentials(
            "Invalid credentials".to_string(),
        ));
        assert!(login.user_message().starts_with("Your account was created"));
    }
}
