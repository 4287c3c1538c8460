pub mod onboard;
pub mod repl;
pub mod run_cmd;
pub mod status;

use webpilot_agent::Agent;
use webpilot_backend::HttpBridge;
use webpilot_core::{Config, Paths};

/// Load config and wire an agent against the configured bridge endpoint.
pub(crate) fn build_agent() -> anyhow::Result<Agent> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let bridge = HttpBridge::new(&config.bridge);
    Ok(Agent::new(Box::new(bridge), config))
}

/// Render one execution result for the terminal.
pub(crate) fn print_result(result: &webpilot_core::ExecutionResult) {
    println!("status:  {}", result.status);
    if !result.output.is_empty() {
        println!("output:  {}", result.output);
    }
    if let Some(error) = &result.error {
        println!("error:   {}", error);
    }
    if !result.current_url.is_empty() {
        println!("url:     {}", result.current_url);
    }
    if let Some(screenshot) = &result.screenshot_ref {
        println!("capture: {}", screenshot);
    }
}
