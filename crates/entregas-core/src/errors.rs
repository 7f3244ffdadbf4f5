//! Typed HTTP failures and backend error-body normalization.

use std::fmt;

use serde_json::Value;

use crate::validation::FieldErrors;

pub const GENERIC_MESSAGE: &str = "An unexpected error occurred. Try again later.";
pub const NETWORK_MESSAGE: &str = "Could not reach the server. Check your connection and try again.";
pub const TIMEOUT_MESSAGE: &str = "The server took too long to respond. Try again.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Sign in again.";

/// Keys of the error envelope itself, never form fields.
const META_KEYS: &[&str] = &["success", "message", "detail", "error", "details", "code"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Connection refused, DNS, TLS and other transport failures.
    Network,
    Timeout,
    /// HTTP 401.
    Unauthorized,
    /// Other HTTP 4xx.
    Validation,
    /// HTTP 5xx and unexpected statuses.
    Server,
    /// Response body did not match the expected shape.
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Network => write!(f, "network"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Unauthorized => write!(f, "unauthorized"),
            ApiErrorKind::Validation => write!(f, "validation"),
            ApiErrorKind::Server => write!(f, "server"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Failure of one backend request.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    /// One-line summary for logs and `Display`.
    pub message: String,
    /// Parsed response body; non-JSON bodies are kept as a string value.
    pub body: Option<Value>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    /// Local validation failure, shaped like a backend 400 so callers handle
    /// both the same way. No request was sent.
    pub fn invalid(fields: &FieldErrors) -> Self {
        let message = fields.first_message().unwrap_or(GENERIC_MESSAGE).to_string();
        let details: serde_json::Map<String, Value> = fields
            .iter()
            .map(|(field, msg)| (field.to_string(), Value::from(vec![msg])))
            .collect();
        Self {
            kind: ApiErrorKind::Validation,
            status: None,
            message: message.clone(),
            body: Some(serde_json::json!({ "message": message, "details": details })),
        }
    }

    /// Classifies a non-2xx status and attaches the body.
    pub fn http_status(status: u16, body: Option<Value>) -> Self {
        let kind = match status {
            401 => ApiErrorKind::Unauthorized,
            400..=499 => ApiErrorKind::Validation,
            _ => ApiErrorKind::Server,
        };
        let message = match body.as_ref().and_then(extract_message) {
            Some(detail) => format!("HTTP {status}: {detail}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind,
            status: Some(status),
            message,
            body,
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request timed out: {err}"))
        } else if err.is_decode() {
            Self::parse(format!("Failed to decode response: {err}"))
        } else {
            Self::network(format!("Request failed: {err}"))
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self.kind {
            ApiErrorKind::Network => NETWORK_MESSAGE.to_string(),
            ApiErrorKind::Timeout => TIMEOUT_MESSAGE.to_string(),
            ApiErrorKind::Unauthorized => self
                .body
                .as_ref()
                .and_then(extract_message)
                .unwrap_or_else(|| SESSION_EXPIRED_MESSAGE.to_string()),
            ApiErrorKind::Validation => self
                .body
                .as_ref()
                .map_or_else(|| GENERIC_MESSAGE.to_string(), normalize_error),
            ApiErrorKind::Server | ApiErrorKind::Parse => GENERIC_MESSAGE.to_string(),
        }
    }

    /// Per-field messages from a 4xx body; empty for other kinds.
    pub fn field_errors(&self) -> FieldErrors {
        match (&self.kind, &self.body) {
            (ApiErrorKind::Validation, Some(body)) => field_errors(body),
            _ => FieldErrors::new(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Human-readable message from whichever error field the backend used.
///
/// Priority: `message`, `detail`, `error` (string, or object with
/// `message`), `non_field_errors[0]`, a raw string body, then
/// [`GENERIC_MESSAGE`].
pub fn normalize_error(body: &Value) -> String {
    extract_message(body).unwrap_or_else(|| GENERIC_MESSAGE.to_string())
}

fn extract_message(body: &Value) -> Option<String> {
    fn non_empty(v: Option<&Value>) -> Option<String> {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    match body {
        Value::Object(map) => non_empty(map.get("message"))
            .or_else(|| non_empty(map.get("detail")))
            .or_else(|| non_empty(map.get("error")))
            .or_else(|| non_empty(map.get("error").and_then(|e| e.get("message"))))
            .or_else(|| first_message(map.get("non_field_errors"))),
        Value::String(raw) => {
            let raw = raw.trim();
            // HTML error pages are not worth showing.
            (!raw.is_empty() && !raw.starts_with('<')).then(|| raw.to_string())
        }
        _ => None,
    }
}

/// First string of an array, or the value itself if it is a string.
fn first_message(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(|item| first_message(Some(item))),
        _ => None,
    }
}

/// Maps backend field errors onto form field names.
///
/// Reads the `details` object when present, otherwise top-level fields.
/// `non_field_errors` is shown on the password confirmation field.
pub fn field_errors(body: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let source = match body.get("details") {
        Some(Value::Object(details)) => details,
        _ => match body {
            Value::Object(map) => map,
            _ => return errors,
        },
    };

    for (field, value) in source {
        if META_KEYS.contains(&field.as_str()) {
            continue;
        }
        let Some(message) = first_message(Some(value)) else {
            continue;
        };
        if field == "non_field_errors" {
            errors.insert("password_confirm", message);
        } else {
            errors.insert(field.as_str(), message);
        }
    }
    errors
}
