//! Wire DTOs for the auth endpoints and server error bodies

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{access_token, refresh_token?}`
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OtpVerifyRequest<'a> {
    pub phone: &'a str,
    pub code: &'a str,
}

/// Structured error body: `{error, message}` or `{detail}`
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    /// Lenient parse; anything that is not a JSON object yields an empty body
    pub fn parse(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    /// Human-readable message: `message`, then `detail`, then `error`
    pub fn message(&self) -> Option<String> {
        if let Some(message) = self.message.as_ref().filter(|m| !m.is_empty()) {
            return Some(message.clone());
        }
        match &self.detail {
            Some(Value::String(detail)) if !detail.is_empty() => return Some(detail.clone()),
            Some(Value::Null) | None => {}
            Some(Value::String(_)) => {}
            Some(other) => return Some(other.to_string()),
        }
        self.error.clone().filter(|e| !e.is_empty())
    }
}
