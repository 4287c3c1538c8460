//! Automation-backend contract.
//!
//! The component that actually drives a browser lives outside this
//! repository (a local bridge service wrapping a prebuilt agent library).
//! The orchestration core only depends on this trait.

pub mod http;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use webpilot_providers::Provider;
use webpilot_core::Result;

/// Best-effort capture of the live browser state.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    pub url: String,
    pub screenshot_ref: Option<String>,
}

/// Handle to a running browser-automation driver.
///
/// The browser is a serially reusable resource: callers must not issue
/// overlapping `run` calls against one handle. The orchestration layer
/// enforces this with a lock; implementations may assume it.
#[async_trait]
pub trait AutomationBackend: Send + Sync {
    /// Execute one augmented instruction against the live browser.
    ///
    /// `reasoner` is the LLM client the driver consults for decisions,
    /// selected per command. `timeout` is advisory for the transport; the
    /// caller enforces the hard wall-clock bound.
    async fn run(
        &self,
        instruction: &str,
        reasoner: Arc<dyn Provider>,
        timeout: Duration,
    ) -> Result<String>;

    /// Capture the current URL and a screenshot reference. Must work on a
    /// best-effort basis even after a failed run.
    async fn capture_state(&self) -> Result<PageState>;

    /// Discard the current page/tab and return the browser to a clean
    /// state. Required after a timed-out run, whose page state is
    /// untrusted.
    async fn reset(&self) -> Result<()>;
}

pub use http::HttpBridge;
