//! Login-wall detection and credential storage.

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::info;

use crate::session::{CredentialRecord, SessionState};
use webpilot_core::types::context_has_credentials;
use webpilot_core::{Error, Result};

/// Decides whether a backend signal indicates a login wall.
///
/// The phrase set is configuration (`runner.loginIndicators`), not a
/// constant: what counts as a login wall varies per target site.
pub struct LoginDetector {
    phrases: Vec<String>,
}

impl LoginDetector {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// True iff `signal` contains one of the indicator phrases
    /// (case-insensitive) and `context` does not already carry a usable
    /// username+password pair. Pure and deterministic.
    pub fn needs_login(&self, signal: &str, context: &BTreeMap<String, String>) -> bool {
        if context_has_credentials(context) {
            return false;
        }
        let signal_lower = signal.to_lowercase();
        self.phrases.iter().any(|p| signal_lower.contains(p))
    }
}

/// Store a credential pair for `service`, overwriting any previous entry.
///
/// Rejects empty username or password with no state mutation. Does not
/// trigger re-execution: the caller resubmits the original command with the
/// context populated from the stored entry.
pub async fn store_credentials(
    state: &SessionState,
    service: &str,
    username: &str,
    password: &str,
) -> Result<()> {
    if username.trim().is_empty() {
        return Err(Error::InvalidCredential("username must not be empty".to_string()));
    }
    if password.trim().is_empty() {
        return Err(Error::InvalidCredential("password must not be empty".to_string()));
    }

    let mut inner = state.lock().await;
    inner.credentials.insert(
        service.to_string(),
        CredentialRecord {
            username: username.to_string(),
            password: password.to_string(),
            stored_at: Utc::now(),
        },
    );
    info!(service = %service, "Credentials stored");
    Ok(())
}
