//! Normalization of heterogeneous backend error bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The single error shape surfaced to callers, regardless of which backend
/// format produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub message: String,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub status_code: u16,
}

impl ApiError {
    /// Status used when the failure never produced an HTTP response.
    pub const DEFAULT_STATUS: u16 = 500;

    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            error_code: None,
            status_code,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_code {
            Some(code) => write!(f, "{} ({code}, status {})", self.message, self.status_code),
            None => write!(f, "{} (status {})", self.message, self.status_code),
        }
    }
}

const UNKNOWN_MESSAGE: &str = "Unknown error";

type Extracted = (String, Option<String>);

/// Matchers tried in order; the first that recognizes the body wins.
const MATCHERS: &[fn(&Value) -> Option<Extracted>] =
    &[match_errors_array, match_error_object, match_flat_message];

/// Build an [`ApiError`] from a response body and transport status.
///
/// `status` is `None` when no response was received; the default status is
/// used in that case.
pub fn normalize_body(body: Option<&Value>, status: Option<u16>) -> ApiError {
    let status_code = status.unwrap_or(ApiError::DEFAULT_STATUS);
    let (message, error_code) = body
        .and_then(|body| MATCHERS.iter().find_map(|matcher| matcher(body)))
        .unwrap_or_else(|| (UNKNOWN_MESSAGE.to_string(), None));
    ApiError {
        message,
        error_code,
        status_code,
    }
}

/// `{ errors: [{ message, extensions: { code } }, ...] }`
fn match_errors_array(body: &Value) -> Option<Extracted> {
    let first = body.get("errors")?.as_array()?.first()?;
    let message = non_empty_str(first.get("message")).unwrap_or(UNKNOWN_MESSAGE);
    let code = first
        .get("extensions")
        .and_then(|ext| ext.get("code"))
        .and_then(scalar_to_string);
    Some((message.to_string(), code))
}

/// `{ error: { message, code } }`
fn match_error_object(body: &Value) -> Option<Extracted> {
    let error = body.get("error")?;
    let message = non_empty_str(error.get("message"))?;
    let code = error.get("code").and_then(scalar_to_string);
    Some((message.to_string(), code))
}

/// `{ message }`
fn match_flat_message(body: &Value) -> Option<Extracted> {
    let message = non_empty_str(body.get("message"))?;
    Some((message.to_string(), None))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
