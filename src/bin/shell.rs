//! Headless shell: drives the front end from stdin against a host process.
//!
//! Chat output goes to stdout; tracing goes to stderr.

use clap::Parser;
use singularity::attachment::SelectedFile;
use singularity::host::process::ProcessHost;
use singularity::shell::{ShellCommand, render_message};
use singularity::{BridgeAdapter, BridgeHost, Frontend, ShellConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Chat with an agent host from the terminal.
#[derive(Parser)]
#[command(name = "singularity-shell", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host command to spawn, overriding the config file.
    #[arg(long)]
    host: Option<String>,

    /// Arguments for the host command.
    #[arg(last = true)]
    host_args: Vec<String>,
}

/// What changed since the last redraw.
#[derive(Default)]
struct Printed {
    messages: usize,
    pull_progress: String,
    console: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("singularity=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(ShellConfig::resolve_config_path);
    let mut config = ShellConfig::load_or_default(&config_path)?;
    if let Some(command) = cli.host {
        config.host.command = command;
        config.host.args = cli.host_args;
    }

    println!("Singularity v{}", env!("CARGO_PKG_VERSION"));

    let mut adapter = BridgeAdapter::new();
    let process = ProcessHost::spawn(&config.host, adapter.push_sink())?;
    adapter.attach_host(Arc::new(BridgeHost::new(process)));
    let frontend = adapter.frontend(&config.ui);
    let mut ui = adapter.register(frontend)?;
    if let Err(e) = adapter.signal_ready().await {
        eprintln!("host did not accept the connection: {e}");
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Vec<SelectedFile> = Vec::new();
    let mut printed = Printed::default();

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(ui.handlers_mut(), &mut pending, &line).await {
                    break;
                }
            }
            // The frontend holds a sink, so the queue never closes here.
            _ = ui.next() => {}
        }
        ui.drain();
        redraw(ui.handlers(), &mut printed);
    }

    tracing::info!("shell exiting");
    Ok(())
}

/// Apply one line of input. Returns `false` on `/quit`.
async fn handle_line(frontend: &mut Frontend, pending: &mut Vec<SelectedFile>, line: &str) -> bool {
    let command = match ShellCommand::parse(line) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            return true;
        }
    };

    match command {
        ShellCommand::Message(text) => {
            if !frontend.send_message(&text, pending.clone()) {
                eprintln!("not sent (disconnected or empty)");
            } else {
                pending.clear();
            }
        }
        ShellCommand::TogglePanel(panel) => {
            let open = frontend.toggle_panel(panel);
            println!("{panel} {}", if open { "opened" } else { "closed" });
        }
        ShellCommand::ChangeRole { role, model } => {
            if !frontend.change_role(role, &model) {
                eprintln!("not connected");
            }
        }
        ShellCommand::Pull(name) => {
            if !frontend.pull_model(&name) {
                eprintln!("pull not started");
            }
        }
        ShellCommand::Attach(path) => match SelectedFile::from_path(&path).await {
            Ok(file) => {
                println!("attached {} ({} bytes)", file.name, file.size);
                pending.push(file);
            }
            Err(e) => eprintln!("{e}"),
        },
        ShellCommand::Open(path) => {
            if !frontend.open_file(&path) {
                eprintln!("cannot open {path}");
            }
        }
        ShellCommand::Run => {
            if !frontend.run_code() {
                eprintln!("nothing to run");
            }
        }
        ShellCommand::Save => {
            if !frontend.save_file() {
                eprintln!("no open file");
            }
        }
        ShellCommand::ToggleTheme => println!("theme: {}", frontend.toggle_theme()),
        ShellCommand::Feedback {
            message_id,
            feedback,
        } => {
            if !frontend.set_feedback(&message_id, feedback) {
                eprintln!("no message {message_id}");
            }
        }
        ShellCommand::Quit => return false,
    }
    true
}

fn redraw(frontend: &Frontend, printed: &mut Printed) {
    let messages = frontend.conversation().messages();
    for message in messages.iter().skip(printed.messages) {
        println!("{}", render_message(message));
    }
    printed.messages = messages.len();

    let progress = frontend.registry().pull_progress();
    if progress != printed.pull_progress {
        if !progress.is_empty() {
            println!("pull: {progress}");
        }
        printed.pull_progress = progress.to_owned();
    }

    let console = frontend.workspace().console();
    if console != printed.console {
        println!("{console}");
        printed.console = console.to_owned();
    }
}
