use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use webpilot_core::ExecutionResult;

/// Stored login for one service. The password is masked in Debug output and
/// must never reach a log line.
#[derive(Clone)]
pub struct CredentialRecord {
    pub username: String,
    pub password: String,
    pub stored_at: DateTime<Utc>,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("username", &self.username)
            .field("password", &"***")
            .field("stored_at", &self.stored_at)
            .finish()
    }
}

pub(crate) struct SessionInner {
    pub credentials: HashMap<String, CredentialRecord>,
    pub history: VecDeque<ExecutionResult>,
    pub active_targets: HashSet<String>,
    pub current_url: String,
    pub last_screenshot: Option<String>,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            credentials: HashMap::new(),
            history: VecDeque::new(),
            active_targets: HashSet::new(),
            current_url: String::new(),
            last_screenshot: None,
        }
    }
}

/// Per-session aggregate: credentials, bounded run history, visited hosts.
///
/// A cheap-clone handle; every caller/session owns its own instance. There
/// is no process-wide session. The lock guards short critical sections only
/// and is never held across a backend call.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner::new())),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().await
    }

    pub async fn credential(&self, service: &str) -> Option<CredentialRecord> {
        self.inner.lock().await.credentials.get(service).cloned()
    }

    /// Service names with stored credentials, sorted. Values are never
    /// exposed through this accessor.
    pub async fn credential_services(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut names: Vec<String> = inner.credentials.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub async fn current_url(&self) -> String {
        self.inner.lock().await.current_url.clone()
    }

    pub async fn last_screenshot(&self) -> Option<String> {
        self.inner.lock().await.last_screenshot.clone()
    }

    /// Hostnames visited this session, sorted.
    pub async fn visited_targets(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut hosts: Vec<String> = inner.active_targets.iter().cloned().collect();
        hosts.sort_unstable();
        hosts
    }

    pub async fn history_len(&self) -> usize {
        self.inner.lock().await.history.len()
    }

    /// Drop all session data: credentials, history, visited hosts, page
    /// state. The handle stays usable.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        *inner = SessionInner::new();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_password() {
        let record = CredentialRecord {
            username: "turing-user".to_string(),
            password: "hunter2".to_string(),
            stored_at: Utc::now(),
        };
        let rendered = format!("{:?}", record);
        assert!(rendered.contains("turing-user"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let state = SessionState::new();
        {
            let mut inner = state.lock().await;
            inner.credentials.insert(
                "turing".to_string(),
                CredentialRecord {
                    username: "u".to_string(),
                    password: "p".to_string(),
                    stored_at: Utc::now(),
                },
            );
            inner.active_targets.insert("example.com".to_string());
            inner.current_url = "https://example.com".to_string();
        }
        state.reset().await;
        assert!(state.credential("turing").await.is_none());
        assert!(state.visited_targets().await.is_empty());
        assert!(state.current_url().await.is_empty());
        assert_eq!(state.history_len().await, 0);
    }
}
