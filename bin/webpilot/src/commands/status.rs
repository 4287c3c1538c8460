use webpilot_core::{Config, Paths};

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!("webpilot status");
    println!("===============");
    println!();

    let config_path = paths.config_file();
    let config_exists = config_path.exists();
    println!(
        "Config:   {} {}",
        config_path.display(),
        if config_exists { "✓" } else { "✗ (not found)" }
    );

    if !config_exists {
        println!();
        println!("Run `webpilot onboard` to initialize.");
        return Ok(());
    }

    let config = Config::load(&config_path)?;

    println!("Model:    {}", config.agent.model);
    println!("Bridge:   {}", config.bridge.endpoint);
    println!(
        "Runner:   step cap {}, timeout {}s, history cap {}",
        config.runner.step_cap, config.runner.timeout_secs, config.runner.history_cap
    );
    println!();

    // Key presence only; never the values.
    println!("Providers:");
    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort_unstable();
    for name in names {
        let provider = &config.providers[name];
        let status = if !provider.api_key.is_empty() {
            "✓ configured"
        } else {
            "✗ no key"
        };
        println!("  {:<10} {}", name, status);
    }

    Ok(())
}
