use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single natural-language instruction submitted for one automation run.
///
/// Immutable once handed to the runner. `context` carries named values the
/// instruction may need (username, password, file excerpts); values are
/// opaque strings and are never written to logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub text: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Reasoning-backend selector. `None` uses the configured default.
    #[serde(default)]
    pub provider: Option<String>,
}

impl Command {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            context: BTreeMap::new(),
            provider: None,
        }
    }

    pub fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }

    /// True when the context carries a usable username-equivalent and
    /// password pair.
    pub fn has_credentials(&self) -> bool {
        context_has_credentials(&self.context)
    }
}

/// Whether a context map carries both a non-empty username-equivalent
/// (`username` | `email` | `user`) and a non-empty `password` entry.
pub fn context_has_credentials(context: &BTreeMap<String, String>) -> bool {
    let has_user = ["username", "email", "user"]
        .iter()
        .any(|k| context.get(*k).is_some_and(|v| !v.trim().is_empty()));
    let has_pass = context
        .get("password")
        .is_some_and(|v| !v.trim().is_empty());
    has_user && has_pass
}

/// Terminal outcome of one automation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The backend completed the instruction.
    Succeeded,
    /// The backend raised an error that is not a login wall.
    Failed,
    /// The wall-clock budget elapsed; the browser was reset.
    TimedOut,
    /// A login wall was detected and no credentials were supplied.
    NeedsCredentials,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Succeeded => write!(f, "succeeded"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::TimedOut => write!(f, "timed_out"),
            ExecutionStatus::NeedsCredentials => write!(f, "needs_credentials"),
        }
    }
}

/// Record of one completed run, appended to session history.
///
/// `error` is always `None` for `succeeded` and `needs_credentials`; for
/// `needs_credentials` the human-readable prompt lives in `output`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// The raw command text as submitted (not the augmented instruction).
    pub command: String,
    pub output: String,
    #[serde(default)]
    pub current_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the submitted context carried a credential pair. Never the
    /// values themselves.
    #[serde(default)]
    pub credentials_used: bool,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Succeeded
    }
}
