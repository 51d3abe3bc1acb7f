//! gitmessage - CLI entry point.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, Password};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gitmessage::config::{config_path, config_path_label, save_api_key};
use gitmessage::generate::report;
use gitmessage::host::{
    MessageFileSink, MessageSink, Notifier, Spinner, StdoutSink, TerminalNotifier,
};
use gitmessage::llm::AgentClient;
use gitmessage::{ConfigSource, Generator, Settings};

/// Suggest a commit message for your working tree changes.
#[derive(Parser, Debug)]
#[command(name = "gitmessage")]
#[command(about = "Suggest a commit message for your working tree changes using a Mistral agent")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    generate: GenerateArgs,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a commit message (default)
    Generate(GenerateArgs),

    /// Inspect or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone)]
struct GenerateArgs {
    /// Directory inside the working tree to inspect
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Write the message into this file instead of stdout (e.g. a prepare-commit-msg hook's file)
    #[arg(long)]
    message_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Store the Mistral API key in the config file
    SetKey {
        /// API key; prompted for when omitted
        key: Option<String>,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Command::Config { action }) => {
            run_config(action)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Generate(args)) => run_generate(args).await,
        None => run_generate(cli.generate).await,
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "gitmessage=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run the generate pipeline and translate its result into an exit code.
async fn run_generate(args: GenerateArgs) -> Result<ExitCode> {
    let notifier = TerminalNotifier;

    let settings = Settings::load().context("Failed to load configuration")?;
    let timeout = settings.timeout;

    let client = AgentClient::new(&settings.endpoint, &settings.agent_id, timeout)
        .context("Failed to set up the completion client")?;
    debug!("Using completion endpoint {}", client.endpoint());

    let sink: Box<dyn MessageSink> = match args.message_file {
        Some(path) => {
            let sink = MessageFileSink::new(path);
            debug!("Writing message to {}", sink.path().display());
            Box::new(sink)
        }
        None => Box::new(StdoutSink),
    };

    let generator = Generator::new(Box::new(settings), Box::new(client), sink)
        .with_git_timeout(timeout);

    let spinner = Spinner::start("Generating commit message...");
    let result = generator.run(&args.dir).await;
    spinner.finish();
    report(&result, &notifier);

    match result {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_informational() => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_missing_credential() => {
            offer_key_setup(&notifier)?;
            Ok(ExitCode::FAILURE)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

/// Offer to store an API key right away when running interactively.
fn offer_key_setup(notifier: &dyn Notifier) -> Result<()> {
    if !std::io::stdin().is_terminal() || !std::io::stderr().is_terminal() {
        return Ok(());
    }

    let set_now = Confirm::new()
        .with_prompt("Set your Mistral API key now?")
        .default(true)
        .interact()
        .context("Failed to read confirmation")?;

    if !set_now {
        return Ok(());
    }

    let path = store_key(None)?;
    notifier.info(&format!(
        "API key saved to {}. Run gitmessage again to generate a message.",
        path.display()
    ));
    Ok(())
}

fn run_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::SetKey { key } => {
            let path = store_key(key)?;
            println!("✓ API key saved to {}", path.display());
        }
        ConfigAction::Show => {
            let settings = Settings::load().context("Failed to load configuration")?;

            println!("Config file: {}", config_path_label());
            println!("Endpoint:    {}", settings.endpoint);
            println!("Agent:       {}", settings.agent_id);
            println!("Timeout:     {}s", settings.timeout.as_secs());
            println!(
                "API key:     {}",
                settings
                    .masked_api_key()
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            if settings.credential().is_none() {
                println!("\nRun 'gitmessage config set-key' to add one.");
            }
        }
    }
    Ok(())
}

/// Save `key` (or one read from a hidden prompt) to the config file.
fn store_key(key: Option<String>) -> Result<PathBuf> {
    let key = match key {
        Some(key) => key,
        None => Password::new()
            .with_prompt("Mistral API key")
            .interact()
            .context("Failed to read API key")?,
    };

    if key.trim().is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    let path = config_path().context("Failed to locate config file")?;
    save_api_key(&path, &key).context("Failed to save API key")?;
    Ok(path)
}
