use webpilot_core::Command;

use super::{build_agent, print_result};

pub async fn run(
    text: String,
    provider: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let agent = build_agent()?;

    let mut command = Command::new(&text);
    if let Some(p) = provider {
        command = command.with_provider(&p);
    }
    if let Some(u) = username {
        command = command.with_context("username", &u);
    }
    if let Some(pw) = password {
        command = command.with_context("password", &pw);
    }

    let result = agent.submit(command).await?;
    print_result(&result);

    Ok(())
}
