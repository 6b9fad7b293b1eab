//! Lumen - main entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumen_common::config::Config;
use lumen_common::logging::init_logging_with_exclusions;
use lumen_web::provider::GeminiProvider;
use lumen_web::repl::run_chat;
use lumen_web::session::{resolve_key, SessionStore};
use std::path::PathBuf;
use tokio::io::BufReader;

/// Lumen - chat and writing helpers on top of Gemini.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(version)]
#[command(about = "Session-keyed chat backend for the Gemini API", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.lumen/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind, overrides server.host
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on, overrides server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Chat with the model in this terminal
    Chat {
        /// Session name to keep the conversation under
        #[arg(short, long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_with_env(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            config.override_server(host, port);
            config.validate().context("Invalid configuration")?;

            init_logging_with_exclusions(
                &config.observability.log_level,
                &config.observability.log_format,
                &config.observability.excluded_targets,
            );
            tracing::info!("Lumen v{}", env!("CARGO_PKG_VERSION"));

            lumen_web::start_server(&config).await
        }
        Commands::Chat { session } => {
            config.validate().context("Invalid configuration")?;

            // Keep log lines out of the conversation.
            init_logging_with_exclusions("warn", "pretty", &config.observability.excluded_targets);

            let provider = GeminiProvider::new(&config.gemini);
            let store = SessionStore::new();
            let session_id = resolve_key(session.as_deref()).to_string();

            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            run_chat(
                &provider,
                &store,
                &session_id,
                config.chat.system_prompt.clone(),
                stdin,
                &mut stdout,
            )
            .await
        }
    }
}
