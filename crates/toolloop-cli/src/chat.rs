//! Interactive chat loop

use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use toolloop_core::session::ExportFormat;
use toolloop_core::{Agent, Error};

const HELP: &str = "\
Commands:
  /reset              Start a new session
  /metrics            Show request and tool metrics
  /search <query>     Search saved sessions
  /export [format]    Export the current session (json or markdown)
  /stats              Show session statistics
  /save               Save the current session
  /help               Show this help
  /quit               Exit

Press Ctrl-C while a request is running to cancel it.";

/// Cancel `token` on the first Ctrl-C; abort the handle once the request is done.
pub fn cancel_on_ctrl_c(token: &CancellationToken) -> JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}

enum Flow {
    Continue,
    Quit,
}

pub async fn run(mut agent: Agent) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;

    println!("{}", style("toolloop").bold().cyan());
    println!(
        "{}",
        style(format!(
            "Model: {} | Workspace: {} | /help for commands",
            agent.config().model.model,
            agent.config().working_dir().display()
        ))
        .dim()
    );
    println!();

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(input) {
            warn!("Failed to record line history: {}", e);
        }

        if let Some(command) = input.strip_prefix('/') {
            match handle_command(&mut agent, command) {
                Ok(Flow::Continue) => continue,
                Ok(Flow::Quit) => break,
                Err(e) => {
                    println!("{}", style(format!("Error: {}", e)).red());
                    continue;
                }
            }
        }

        let cancel = CancellationToken::new();
        let ctrl_c = cancel_on_ctrl_c(&cancel);
        let result = agent.submit_with_cancel(input, None, &cancel).await;
        ctrl_c.abort();

        match result {
            Ok(reply) => println!("{}: {}\n", style("Assistant").bold().green(), reply),
            Err(Error::Cancelled) => println!("{}\n", style("Request cancelled").yellow()),
            Err(e) => println!("{}\n", style(format!("Error: {}", e)).red()),
        }
    }

    if let Err(e) = agent.shutdown() {
        println!("{}", style(format!("Warning: {}", e)).yellow());
    }
    println!("{}", style("Goodbye!").dim());
    Ok(())
}

fn handle_command(agent: &mut Agent, command: &str) -> anyhow::Result<Flow> {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => return Ok(Flow::Quit),
        "help" => println!("{}", HELP),
        "reset" => {
            let id = agent.reset().id.clone();
            println!("{}", style(format!("Started session {}", id)).green());
        }
        "metrics" => println!("{}", serde_json::to_string_pretty(&agent.metrics())?),
        "stats" => println!("{}", serde_json::to_string_pretty(&agent.statistics()?)?),
        "search" => {
            if arg.is_empty() {
                println!("{}", style("Usage: /search <query>").yellow());
            } else {
                let hits = agent.search(arg)?;
                if hits.is_empty() {
                    println!("{}", style("No matching sessions").dim());
                }
                for hit in hits {
                    println!("  {} {}", style(&hit.session_id).cyan(), hit.summary);
                }
            }
        }
        "export" => {
            let format: ExportFormat = if arg.is_empty() {
                ExportFormat::default()
            } else {
                arg.parse()?
            };
            println!("{}", agent.export(None, format)?);
        }
        "save" => {
            agent.save()?;
            println!("{}", style("Session saved").green());
        }
        other => println!(
            "{}",
            style(format!("Unknown command: /{} (try /help)", other)).yellow()
        ),
    }
    Ok(Flow::Continue)
}
