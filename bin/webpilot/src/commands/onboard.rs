use webpilot_core::{Config, Paths};

pub async fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config_path = paths.config_file();

    if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
        println!("Use --force to overwrite.");
        return Ok(());
    }

    paths.ensure_dirs()?;
    let config = Config::default();
    config.save(&config_path)?;

    println!("webpilot initialized");
    println!();
    println!("Config:      {}", config_path.display());
    println!("Screenshots: {}", paths.screenshots_dir().display());
    println!();
    println!("Next steps:");
    println!("  1. Add a provider API key to the config (providers.anthropic.apiKey, ...)");
    println!("  2. Point bridge.endpoint at your running automation bridge");
    println!("  3. webpilot run \"go to example.com and describe the page\"");

    Ok(())
}
