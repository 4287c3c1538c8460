mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "webpilot")]
#[command(about = "Natural-language browser automation, one bounded run at a time", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize webpilot configuration and directories
    Onboard {
        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration status
    Status,

    /// Execute one automation command and print the result
    Run {
        /// Natural-language instruction
        text: String,

        /// Reasoning provider (anthropic, openai, gemini, deepseek, ollama)
        #[arg(short, long)]
        provider: Option<String>,

        /// Username to make available to the run
        #[arg(long)]
        username: Option<String>,

        /// Password to make available to the run
        #[arg(long)]
        password: Option<String>,
    },

    /// Interactive session against one browser
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Onboard { force } => {
            commands::onboard::run(force).await?;
        }
        Commands::Status => {
            commands::status::run().await?;
        }
        Commands::Run {
            text,
            provider,
            username,
            password,
        } => {
            commands::run_cmd::run(text, provider, username, password).await?;
        }
        Commands::Repl => {
            commands::repl::run().await?;
        }
    }

    Ok(())
}
