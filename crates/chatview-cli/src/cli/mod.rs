//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chatview_core::config::{self, Config};
use chatview_core::logging::{self, LogTarget};
use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(name = "chatview")]
#[command(version)]
#[command(about = "Terminal client for remote chat sessions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Session service base URL (overrides config and CHATVIEW_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// User identity whose sessions are listed
    #[arg(long, global = true, value_name = "ID")]
    identity: Option<String>,

    /// Config file to load instead of $CHATVIEW_HOME/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Open the interactive chat client (default)
    Chat,
    /// Inspect and create remote sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Send one message and print the rendered reply
    Send {
        #[arg(value_name = "SESSION_ID")]
        session_id: String,
        /// Message text
        #[arg(value_name = "TEXT")]
        text: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Render a content JSON document to stdout
    Render {
        /// File to read, or `-` for stdin
        #[arg(value_name = "FILE", default_value = "-")]
        input: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum SessionCommands {
    /// Lists sessions for the identity
    List,
    /// Prints a session's rendered transcript
    Show {
        #[arg(value_name = "SESSION_ID")]
        id: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Creates a session and prints its id
    New {
        /// Session title
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

/// Rendering options for commands that print content.
#[derive(clap::Args, Debug, Clone, Copy)]
struct OutputArgs {
    /// Wrap width in columns
    #[arg(long, default_value_t = 80)]
    width: usize,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the existing file is broken.
    if let Some(Commands::Config { command }) = &cli.command {
        let path = cli.config.clone().unwrap_or_else(config::paths::config_path);
        return match command {
            ConfigCommands::Path => {
                commands::config::path(&path);
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(&path),
        };
    }

    let config = load_config(&cli)?;
    let interactive = matches!(cli.command, None | Some(Commands::Chat));
    let target = if interactive {
        LogTarget::interactive(&config)
    } else {
        LogTarget::Stderr
    };
    let _log_guard = logging::init(&config, target)?;

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli.command, config).await })
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("load config")?,
    };
    config
        .with_env_overrides()?
        .with_overrides(cli.base_url.as_deref(), cli.identity.as_deref())
}

async fn dispatch(command: Option<Commands>, config: Config) -> Result<()> {
    let Some(command) = command else {
        return commands::chat::run(&config).await;
    };

    match command {
        Commands::Chat => commands::chat::run(&config).await,
        Commands::Sessions { command } => match command {
            SessionCommands::List => commands::sessions::list(&config).await,
            SessionCommands::Show { id, output } => {
                commands::sessions::show(&config, &id, output.width).await
            }
            SessionCommands::New { title } => {
                commands::sessions::new(&config, title.as_deref()).await
            }
        },
        Commands::Send {
            session_id,
            text,
            output,
        } => commands::send::run(&config, &session_id, &text, output.width).await,
        Commands::Render { input, output } => {
            commands::render::run(&config, &input, output.width)
        }
        // Handled before config loading.
        Commands::Config { .. } => Ok(()),
    }
}
