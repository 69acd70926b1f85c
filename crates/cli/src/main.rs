//! The `fitcoach` binary.
//!
//! `chat` is the default subcommand; `sessions`, `history` and `init` are
//! housekeeping around the session database and config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "fitcoach",
    about = "FitCoach: a personal fitness coach backed by a team of Gemini agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./fitcoach.toml, then ~/.fitcoach/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the fitness coach
    Chat(commands::chat::ChatArgs),

    /// List stored sessions
    Sessions {
        /// Whose sessions to list
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Print the messages of a stored session
    History {
        #[arg(short, long)]
        user: Option<String>,

        /// Session to show (defaults to the most recent one)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Write a default config file to ~/.fitcoach/config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command.unwrap_or_default() {
        Commands::Chat(args) => commands::chat::run(config, args).await?,
        Commands::Sessions { user } => commands::sessions::run(config, user).await?,
        Commands::History { user, session } => commands::history::run(config, user, session).await?,
        Commands::Init => commands::init::run().await?,
    }

    Ok(())
}

/// Logs go to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn,fitcoach=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Chat(commands::chat::ChatArgs::default())
    }
}
