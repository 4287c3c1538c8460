//! One bounded automation attempt per submitted command.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::credentials::{store_credentials, LoginDetector};
use crate::recorder;
use crate::session::SessionState;
use webpilot_backend::AutomationBackend;
use webpilot_core::{Command, Config, Error, ExecutionResult, ExecutionStatus, Result};
use webpilot_providers::{create_provider, Provider};

/// Resolves a reasoning backend from an optional per-command provider name.
pub trait ProviderResolver: Send + Sync {
    fn resolve(&self, provider: Option<&str>) -> Result<Arc<dyn Provider>>;
}

/// Config-backed resolver: explicit name, else the configured default.
pub struct ConfigProviderResolver {
    config: Config,
}

impl ConfigProviderResolver {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ProviderResolver for ConfigProviderResolver {
    fn resolve(&self, provider: Option<&str>) -> Result<Arc<dyn Provider>> {
        let explicit = provider.or(self.config.agent.provider.as_deref());
        let boxed = create_provider(&self.config, &self.config.agent.model, explicit)?;
        Ok(Arc::from(boxed))
    }
}

/// Keys whose context values count as credentials and must never appear in
/// stored or logged strings.
const CREDENTIAL_KEYS: [&str; 4] = ["username", "email", "user", "password"];

/// Replace credential values from the context wherever they appear in
/// `text`.
fn redact(text: &str, context: &BTreeMap<String, String>) -> String {
    let mut out = text.to_string();
    for key in CREDENTIAL_KEYS {
        if let Some(value) = context.get(key) {
            if !value.trim().is_empty() {
                out = out.replace(value, "[redacted]");
            }
        }
    }
    out
}

/// Concatenate the raw command with the execution rules that keep a run
/// bounded, plus any supplied context values.
///
/// The step cap and the stop conditions are the only safety mechanism
/// between a free-form instruction and a live browser; they are always
/// present.
fn build_instruction(text: &str, context: &BTreeMap<String, String>, step_cap: u32) -> String {
    let mut instruction = String::with_capacity(text.len() + 512);
    instruction.push_str(text);
    instruction.push_str("\n\nEXECUTION RULES:\n");
    instruction.push_str(&format!(
        "- Perform at most {} browser actions, then stop and report what you did.\n",
        step_cap
    ));
    instruction.push_str("- Stop as soon as the stated objective is reached.\n");
    instruction.push_str("- Do not repeat a search you have already performed; never loop back to a search engine.\n");
    instruction.push_str("- If you find a login page, stay on it; do not navigate away to look for another.\n");
    instruction.push_str("- Complete one action at a time and report the outcome of each step.\n");

    if !context.is_empty() {
        instruction.push_str("\nCONTEXT VALUES:\n");
        for (key, value) in context {
            instruction.push_str(&format!("- {}: \"{}\"\n", key, value));
        }
    }

    instruction
}

fn hostname_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Turns one `Command` into exactly one bounded automation attempt.
///
/// The backend handle sits behind a mutex: the browser is a serially
/// reusable resource, and concurrent `execute` calls queue FIFO on it.
/// Ordinary automation outcomes are encoded in `ExecutionResult.status`;
/// only contract violations surface as `Err`.
pub struct CommandRunner {
    backend: Mutex<Box<dyn AutomationBackend>>,
    resolver: Box<dyn ProviderResolver>,
    detector: LoginDetector,
    config: Config,
}

impl CommandRunner {
    pub fn new(
        backend: Box<dyn AutomationBackend>,
        resolver: Box<dyn ProviderResolver>,
        config: Config,
    ) -> Self {
        let detector = LoginDetector::new(&config.runner.login_indicators);
        Self {
            backend: Mutex::new(backend),
            resolver,
            detector,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `command` once against the backend and record the outcome in
    /// `state`. Returns `Err` only for an empty instruction; every other
    /// outcome is an `ExecutionResult`.
    pub async fn execute(&self, command: &Command, state: &SessionState) -> Result<ExecutionResult> {
        let text = command.text.trim();
        if text.is_empty() {
            return Err(Error::InvalidCommand(
                "command text must not be empty".to_string(),
            ));
        }

        info!(
            command_len = text.len(),
            provider = command.provider.as_deref().unwrap_or("default"),
            context_keys = command.context.len(),
            step_cap = self.config.runner.step_cap,
            timeout_secs = self.config.runner.timeout_secs,
            "Command submitted"
        );

        let reasoner = match self.resolver.resolve(command.provider.as_deref()) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Provider resolution failed");
                let result = self.finish(
                    command,
                    text,
                    ExecutionStatus::Failed,
                    String::new(),
                    Some(e.to_string()),
                    String::new(),
                    None,
                );
                self.record(state, result.clone()).await;
                return Ok(result);
            }
        };

        let instruction = build_instruction(text, &command.context, self.config.runner.step_cap);
        let timeout = Duration::from_secs(self.config.runner.timeout_secs);

        // Serialization point: one in-flight run per backend, FIFO.
        let backend = self.backend.lock().await;
        debug!("Command running");

        let outcome = tokio::time::timeout(timeout, backend.run(&instruction, reasoner, timeout)).await;

        let result = match outcome {
            Err(_elapsed) => {
                warn!(timeout_secs = timeout.as_secs(), "Automation run timed out");
                // The in-progress page state is untrusted; force a clean
                // slate before the next queued command can start.
                if let Err(e) = backend.reset().await {
                    warn!(error = %e, "Backend reset after timeout failed");
                }
                self.finish(
                    command,
                    text,
                    ExecutionStatus::TimedOut,
                    String::new(),
                    Some(format!(
                        "Run exceeded the {}s budget; the browser session was reset",
                        timeout.as_secs()
                    )),
                    String::new(),
                    None,
                )
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                let (url, screenshot) = Self::capture(&**backend).await;
                if self.detector.needs_login(&message, &command.context) {
                    info!("Login wall detected, suspending run for credentials");
                    let detail = redact(&message, &command.context);
                    let output = if url.is_empty() {
                        format!(
                            "Login required: {}. Provide credentials and resubmit the command.",
                            detail
                        )
                    } else {
                        format!(
                            "Login required at {}: {}. Provide credentials and resubmit the command.",
                            url, detail
                        )
                    };
                    self.finish(
                        command,
                        text,
                        ExecutionStatus::NeedsCredentials,
                        output,
                        None,
                        url,
                        screenshot,
                    )
                } else {
                    warn!("Automation run failed");
                    self.finish(
                        command,
                        text,
                        ExecutionStatus::Failed,
                        String::new(),
                        Some(redact(&message, &command.context)),
                        url,
                        screenshot,
                    )
                }
            }
            Ok(Ok(output)) => {
                let (url, screenshot) = Self::capture(&**backend).await;
                info!(output_len = output.len(), url = %url, "Automation run succeeded");
                self.finish(
                    command,
                    text,
                    ExecutionStatus::Succeeded,
                    output,
                    None,
                    url,
                    screenshot,
                )
            }
        };
        drop(backend);

        self.record(state, result.clone()).await;
        Ok(result)
    }

    /// Best-effort state capture; failure never changes the run's status.
    async fn capture(backend: &dyn AutomationBackend) -> (String, Option<String>) {
        match backend.capture_state().await {
            Ok(page) => (page.url, page.screenshot_ref),
            Err(e) => {
                debug!(error = %e, "State capture failed");
                (String::new(), None)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        command: &Command,
        text: &str,
        status: ExecutionStatus,
        output: String,
        error: Option<String>,
        current_url: String,
        screenshot_ref: Option<String>,
    ) -> ExecutionResult {
        debug!(status = %status, "Command reached terminal state");
        ExecutionResult {
            status,
            command: text.to_string(),
            output,
            current_url,
            screenshot_ref,
            error,
            credentials_used: command.has_credentials(),
            timestamp: chrono::Utc::now(),
        }
    }

    async fn record(&self, state: &SessionState, result: ExecutionResult) {
        let url = result.current_url.clone();
        let screenshot = result.screenshot_ref.clone();
        recorder::append(state, result, self.config.runner.history_cap).await;

        let mut inner = state.lock().await;
        if !url.is_empty() {
            inner.current_url = url.clone();
            if let Some(host) = hostname_of(&url) {
                inner.active_targets.insert(host);
            }
        }
        if screenshot.is_some() {
            inner.last_screenshot = screenshot;
        }
    }
}

/// Caller-facing surface over one runner and one session.
pub struct Agent {
    runner: CommandRunner,
    state: SessionState,
}

impl Agent {
    pub fn new(backend: Box<dyn AutomationBackend>, config: Config) -> Self {
        let resolver = Box::new(ConfigProviderResolver::new(config.clone()));
        Self {
            runner: CommandRunner::new(backend, resolver, config),
            state: SessionState::new(),
        }
    }

    pub fn with_resolver(
        backend: Box<dyn AutomationBackend>,
        resolver: Box<dyn ProviderResolver>,
        config: Config,
    ) -> Self {
        Self {
            runner: CommandRunner::new(backend, resolver, config),
            state: SessionState::new(),
        }
    }

    pub async fn submit(&self, command: Command) -> Result<ExecutionResult> {
        self.runner.execute(&command, &self.state).await
    }

    pub async fn history(&self, n: usize) -> Vec<ExecutionResult> {
        recorder::recent(&self.state, n).await
    }

    pub async fn store_credentials(
        &self,
        service: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        store_credentials(&self.state, service, username, password).await
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        self.runner.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use webpilot_backend::PageState;

    struct StubReasoner;

    #[async_trait]
    impl Provider for StubReasoner {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(String::new())
        }

        fn model(&self) -> &str {
            "stub-model"
        }
    }

    struct StubResolver;

    impl ProviderResolver for StubResolver {
        fn resolve(&self, _provider: Option<&str>) -> Result<Arc<dyn Provider>> {
            Ok(Arc::new(StubReasoner))
        }
    }

    struct FailingResolver;

    impl ProviderResolver for FailingResolver {
        fn resolve(&self, provider: Option<&str>) -> Result<Arc<dyn Provider>> {
            Err(Error::Provider(format!(
                "no such provider: {}",
                provider.unwrap_or("default")
            )))
        }
    }

    #[derive(Clone)]
    enum Behavior {
        Succeed(String),
        Fail(String),
        Sleep(Duration),
    }

    struct StubBackend {
        behavior: Behavior,
        state: PageState,
        invocations: std::sync::Mutex<Vec<(Instant, Instant)>>,
        resets: AtomicUsize,
    }

    impl StubBackend {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                state: PageState {
                    url: "https://example.com/dashboard".to_string(),
                    screenshot_ref: Some("/tmp/shot-1.png".to_string()),
                },
                invocations: std::sync::Mutex::new(Vec::new()),
                resets: AtomicUsize::new(0),
            }
        }

        fn invocation_count(&self) -> usize {
            self.invocations.lock().unwrap().len()
        }

        fn intervals(&self) -> Vec<(Instant, Instant)> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AutomationBackend for StubBackend {
        async fn run(
            &self,
            _instruction: &str,
            _reasoner: Arc<dyn Provider>,
            _timeout: Duration,
        ) -> Result<String> {
            let start = Instant::now();
            let outcome = match &self.behavior {
                Behavior::Succeed(output) => Ok(output.clone()),
                Behavior::Fail(message) => Err(Error::Backend(message.clone())),
                Behavior::Sleep(duration) => {
                    tokio::time::sleep(*duration).await;
                    Ok("late".to_string())
                }
            };
            self.invocations.lock().unwrap().push((start, Instant::now()));
            outcome
        }

        async fn capture_state(&self) -> Result<PageState> {
            Ok(self.state.clone())
        }

        async fn reset(&self) -> Result<()> {
            self.resets.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn runner_with(behavior: Behavior) -> (Arc<StubBackend>, CommandRunner) {
        let backend = Arc::new(StubBackend::new(behavior));
        let boxed: Box<dyn AutomationBackend> = Box::new(SharedBackend(backend.clone()));
        let runner = CommandRunner::new(boxed, Box::new(StubResolver), Config::default());
        (backend, runner)
    }

    /// Lets the test keep a handle to the stub after it is boxed.
    struct SharedBackend(Arc<StubBackend>);

    #[async_trait]
    impl AutomationBackend for SharedBackend {
        async fn run(
            &self,
            instruction: &str,
            reasoner: Arc<dyn Provider>,
            timeout: Duration,
        ) -> Result<String> {
            self.0.run(instruction, reasoner, timeout).await
        }

        async fn capture_state(&self) -> Result<PageState> {
            self.0.capture_state().await
        }

        async fn reset(&self) -> Result<()> {
            self.0.reset().await
        }
    }

    #[tokio::test]
    async fn test_empty_command_rejected_before_backend() {
        let (backend, runner) = runner_with(Behavior::Succeed("ok".to_string()));
        let state = SessionState::new();
        let err = runner
            .execute(&Command::new("   "), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCommand(_)));
        assert_eq!(backend.invocation_count(), 0);
        assert_eq!(state.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_success_captures_url_and_target() {
        let (backend, runner) = runner_with(Behavior::Succeed("Logged in successfully".to_string()));
        let state = SessionState::new();
        let command = Command::new("log into example.com")
            .with_context("username", "u")
            .with_context("password", "p");
        let result = runner.execute(&command, &state).await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Succeeded);
        assert_eq!(result.output, "Logged in successfully");
        assert_eq!(result.current_url, "https://example.com/dashboard");
        assert_eq!(result.screenshot_ref.as_deref(), Some("/tmp/shot-1.png"));
        assert!(result.credentials_used);
        assert_eq!(backend.invocation_count(), 1);
        assert_eq!(state.history_len().await, 1);
        assert_eq!(state.visited_targets().await, vec!["example.com".to_string()]);
        assert_eq!(state.current_url().await, "https://example.com/dashboard");
    }

    #[tokio::test]
    async fn test_login_wall_without_credentials() {
        let (backend, runner) = runner_with(Behavior::Fail("Please log in".to_string()));
        let state = SessionState::new();
        let result = runner
            .execute(&Command::new("log into example.com"), &state)
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::NeedsCredentials);
        assert!(result.error.is_none());
        assert!(result.output.contains("Login required"));
        assert!(result.output.contains("resubmit"));
        assert_eq!(backend.invocation_count(), 1);
        assert_eq!(state.history_len().await, 1);
        assert!(state.credential_services().await.is_empty());
    }

    #[tokio::test]
    async fn test_login_phrase_with_credentials_is_plain_failure() {
        let (_backend, runner) = runner_with(Behavior::Fail("Login failed: wrong password".to_string()));
        let state = SessionState::new();
        let command = Command::new("log into example.com")
            .with_context("username", "u")
            .with_context("password", "hunter2");
        let result = runner.execute(&command, &state).await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_failure_error_is_redacted() {
        let (_backend, runner) = runner_with(Behavior::Fail(
            "Could not type 'hunter2' into #password-field".to_string(),
        ));
        let state = SessionState::new();
        let command = Command::new("fill the form")
            .with_context("username", "dev@example.com")
            .with_context("password", "hunter2");
        let result = runner.execute(&command, &state).await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Failed);
        let error = result.error.unwrap();
        assert!(!error.contains("hunter2"));
        assert!(error.contains("[redacted]"));
    }

    #[tokio::test]
    async fn test_timeout_is_bounded_and_resets_backend() {
        let (backend, mut runner) = runner_with(Behavior::Sleep(Duration::from_secs(5)));
        runner.config.runner.timeout_secs = 1;
        let state = SessionState::new();

        let started = Instant::now();
        let result = runner
            .execute(&Command::new("scrape something slow"), &state)
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(result.status, ExecutionStatus::TimedOut);
        assert!(result.error.is_some());
        assert!(elapsed < Duration::from_millis(2500), "blocked for {:?}", elapsed);
        assert_eq!(backend.resets.load(Ordering::SeqCst), 1);
        assert_eq!(state.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_provider_resolution_failure_is_recorded() {
        let backend = Arc::new(StubBackend::new(Behavior::Succeed("ok".to_string())));
        let boxed: Box<dyn AutomationBackend> = Box::new(SharedBackend(backend.clone()));
        let runner = CommandRunner::new(boxed, Box::new(FailingResolver), Config::default());
        let state = SessionState::new();

        let result = runner
            .execute(&Command::new("do a thing").with_provider("acme-llm"), &state)
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.error.unwrap().contains("acme-llm"));
        assert_eq!(backend.invocation_count(), 0);
        assert_eq!(state.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_executes_never_interleave() {
        let (backend, runner) = runner_with(Behavior::Sleep(Duration::from_millis(100)));
        let runner = Arc::new(runner);
        let state = SessionState::new();

        let first = Command::new("first");
        let second = Command::new("second");
        let a = runner.execute(&first, &state);
        let b = runner.execute(&second, &state);
        let (ra, rb) = futures::future::join(a, b).await;
        ra.unwrap();
        rb.unwrap();

        let intervals = backend.intervals();
        assert_eq!(intervals.len(), 2);
        let (s1, e1) = intervals[0];
        let (s2, e2) = intervals[1];
        let overlap = s1 < e2 && s2 < e1 && !(e1 <= s2 || e2 <= s1);
        assert!(!overlap, "backend invocations overlapped");
        assert_eq!(state.history_len().await, 2);
    }

    #[tokio::test]
    async fn test_agent_resubmission_after_storing_credentials() {
        // First run hits a login wall; after storing credentials and
        // resubmitting with context, the (now succeeding) backend completes.
        let login_wall = Agent::with_resolver(
            Box::new(StubBackend::new(Behavior::Fail("Please log in".to_string()))),
            Box::new(StubResolver),
            Config::default(),
        );
        let first = login_wall
            .submit(Command::new("log into example.com"))
            .await
            .unwrap();
        assert_eq!(first.status, ExecutionStatus::NeedsCredentials);

        login_wall.store_credentials("example", "u", "p").await.unwrap();
        let record = login_wall.state().credential("example").await.unwrap();

        let succeeding = Agent::with_resolver(
            Box::new(StubBackend::new(Behavior::Succeed(
                "Logged in successfully".to_string(),
            ))),
            Box::new(StubResolver),
            Config::default(),
        );
        let second = succeeding
            .submit(
                Command::new("log into example.com")
                    .with_context("username", &record.username)
                    .with_context("password", &record.password),
            )
            .await
            .unwrap();
        assert_eq!(second.status, ExecutionStatus::Succeeded);
        assert!(!second.current_url.is_empty());
    }

    #[test]
    fn test_build_instruction_contains_cap_and_context() {
        let context: BTreeMap<String, String> = [
            ("username".to_string(), "dev@example.com".to_string()),
            ("resume".to_string(), "ten years of Rust".to_string()),
        ]
        .into_iter()
        .collect();
        let instruction = build_instruction("apply to the job", &context, 10);
        assert!(instruction.starts_with("apply to the job"));
        assert!(instruction.contains("at most 10 browser actions"));
        assert!(instruction.contains("Stop as soon as the stated objective is reached"));
        assert!(instruction.contains("username: \"dev@example.com\""));
        assert!(instruction.contains("resume: \"ten years of Rust\""));
    }

    #[test]
    fn test_build_instruction_without_context() {
        let instruction = build_instruction("go to example.com", &BTreeMap::new(), 5);
        assert!(instruction.contains("at most 5 browser actions"));
        assert!(!instruction.contains("CONTEXT VALUES"));
    }

    #[test]
    fn test_redact_replaces_all_credential_values() {
        let context: BTreeMap<String, String> = [
            ("username".to_string(), "dev@example.com".to_string()),
            ("password".to_string(), "hunter2".to_string()),
        ]
        .into_iter()
        .collect();
        let redacted = redact("typed dev@example.com then hunter2 twice: hunter2", &context);
        assert!(!redacted.contains("hunter2"));
        assert!(!redacted.contains("dev@example.com"));
        assert_eq!(redacted.matches("[redacted]").count(), 3);
    }

    #[test]
    fn test_hostname_of() {
        assert_eq!(
            hostname_of("https://app.example.com/path?q=1"),
            Some("app.example.com".to_string())
        );
        assert_eq!(hostname_of(""), None);
        assert_eq!(hostname_of("not a url"), None);
    }
}
