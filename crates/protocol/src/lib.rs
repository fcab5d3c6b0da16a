use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CAPABILITIES_SCHEMA_VERSION: u32 = 1;

/// Stable error kinds. Callers branch on these instead of matching message text.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    DirectoryNotFound,
    NotADirectory,
    PermissionDenied,
    MemoryBudgetExceeded,
    DeadlineExceeded,
    SessionNotFound,
    InvalidArgument,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectoryNotFound => "directory_not_found",
            Self::NotADirectory => "not_a_directory",
            Self::PermissionDenied => "permission_denied",
            Self::MemoryBudgetExceeded => "memory_budget_exceeded",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::SessionNotFound => "session_not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ToolNextAction {
    pub tool: String,
    pub args: serde_json::Value,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<ToolNextAction>,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            hint: None,
            next_actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_next_action(mut self, action: ToolNextAction) -> Self {
        self.next_actions.push(action);
        self
    }
}

/// Limits a client can rely on without reading the tool schemas.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DefaultLimits {
    pub batch_size: usize,
    pub min_batch_size: usize,
    pub max_batch_size: usize,
    pub max_depth: usize,
    pub scan_memory_budget_mb: f64,
    pub metadata_memory_budget_mb: f64,
    pub stream_memory_budget_mb: f64,
    pub cache_ttl_secs: u64,
    pub stream_idle_ttl_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct CapabilitiesServer {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub schema_version: u32,
    pub server: CapabilitiesServer,
    pub default_limits: DefaultLimits,
    pub tools: Vec<String>,
    pub start_route: ToolNextAction,
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, ErrorEnvelope, ToolNextAction};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn error_codes_serialize_as_snake_case() {
        let raw = serde_json::to_value(ErrorCode::MemoryBudgetExceeded).unwrap();
        assert_eq!(raw, json!("memory_budget_exceeded"));
        assert_eq!(ErrorCode::SessionNotFound.to_string(), "session_not_found");
    }

    #[test]
    fn envelope_omits_empty_optionals() {
        let envelope = ErrorEnvelope::new(ErrorCode::DirectoryNotFound, "missing");
        let raw = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            raw,
            json!({ "code": "directory_not_found", "message": "missing" })
        );
    }

    #[test]
    fn envelope_keeps_details_and_next_actions() {
        let envelope = ErrorEnvelope::new(ErrorCode::SessionNotFound, "gone")
            .with_details(json!({ "streamId": "abc" }))
            .with_next_action(ToolNextAction {
                tool: "stream_start".to_string(),
                args: json!({ "directory": "/tmp" }),
                reason: "start a new session".to_string(),
            });
        let raw = serde_json::to_value(&envelope).unwrap();
        assert_eq!(raw["details"]["streamId"], json!("abc"));
        assert_eq!(raw["next_actions"][0]["tool"], json!("stream_start"));
    }
}
