use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use webpilot_core::Command;

use super::{build_agent, print_result};

const HELP: &str = "\
Commands:
  <text>                          run an automation command
  :run <service> <text>           run with stored credentials for <service>
  :creds <service> <user> <pass>  store credentials
  :history [n]                    show recent results (default 10)
  :targets                        show hosts visited this session
  :reset                          clear session state
  :help                           show this help
  :quit                           exit";

pub async fn run() -> anyhow::Result<()> {
    let agent = build_agent()?;

    println!("webpilot interactive session (:help for commands, :quit to exit)");
    println!("Bridge: {}", agent.config().bridge.endpoint);
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_whitespace().collect::<Vec<_>>().as_slice() {
            [":quit"] | [":exit"] => break,
            [":help"] => println!("{}", HELP),
            [":reset"] => {
                agent.state().reset().await;
                println!("Session cleared.");
            }
            [":targets"] => {
                let targets = agent.state().visited_targets().await;
                if targets.is_empty() {
                    println!("No sites visited yet.");
                } else {
                    for host in targets {
                        println!("  {}", host);
                    }
                }
            }
            [":history", rest @ ..] => {
                let n = rest
                    .first()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(10);
                let entries = agent.history(n).await;
                if entries.is_empty() {
                    println!("No history yet.");
                }
                for entry in entries {
                    println!(
                        "[{}] {} {} {}",
                        entry.timestamp.format("%H:%M:%S"),
                        entry.status,
                        entry.command,
                        if entry.current_url.is_empty() {
                            String::new()
                        } else {
                            format!("({})", entry.current_url)
                        }
                    );
                }
            }
            [":creds", service, username, password] => {
                match agent.store_credentials(service, username, password).await {
                    Ok(()) => println!("Credentials stored for {}.", service),
                    Err(e) => println!("{}", e),
                }
            }
            [":creds", ..] => println!("Usage: :creds <service> <username> <password>"),
            [":run", service, ..] => {
                let text = line
                    .splitn(3, char::is_whitespace)
                    .nth(2)
                    .unwrap_or("")
                    .trim();
                if text.is_empty() {
                    println!("Usage: :run <service> <text>");
                    continue;
                }
                let Some(record) = agent.state().credential(service).await else {
                    println!("No credentials stored for {}. Use :creds first.", service);
                    continue;
                };
                let command = Command::new(text)
                    .with_context("username", &record.username)
                    .with_context("password", &record.password);
                submit(&agent, command).await;
            }
            _ => {
                submit(&agent, Command::new(line)).await;
            }
        }
    }

    Ok(())
}

async fn submit(agent: &webpilot_agent::Agent, command: Command) {
    match agent.submit(command).await {
        Ok(result) => print_result(&result),
        Err(e) => println!("{}", e),
    }
}
