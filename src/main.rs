//! Google Workspace MCP Server
//!
//! HTTP Model Context Protocol server giving agents access to Gmail,
//! Calendar and Drive on behalf of authorized users.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use workspace_mcp_server::auth::SystemClock;
use workspace_mcp_server::config::Config;
use workspace_mcp_server::error::Result;
use workspace_mcp_server::google::{build_token_store, WorkspaceBroker};
use workspace_mcp_server::server::{serve, AppState};

/// Google Workspace MCP Server
#[derive(Parser)]
#[command(name = "workspace-mcp-server")]
#[command(author, version, about = "Google Workspace MCP Server - Gmail, Calendar and Drive tools over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Print the Google consent URL
    LoginUrl {
        /// Opaque state echoed back to the callback
        #[arg(long, default_value = "")]
        state: String,
    },

    /// Open the Google consent URL in a browser
    OpenLogin,

    /// Remove the stored Google tokens of a user
    Disconnect {
        /// Google account email
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let store = build_token_store(&config)?;
            let state = AppState::new(config, store, Arc::new(SystemClock))?;
            serve(state).await?;
        }
        Commands::LoginUrl { state } => {
            let broker = broker(config)?;
            println!("{}", broker.auth_url(&state)?);
        }
        Commands::OpenLogin => {
            let url = broker(config)?.auth_url("")?;
            eprintln!("Opening {}", url);
            if let Err(e) = open::that(url.as_str()) {
                eprintln!("Could not open a browser ({}). Visit the URL above manually.", e);
            }
        }
        Commands::Disconnect { email } => {
            broker(config)?.disconnect(&email).await?;
            eprintln!("Removed Google authorization for {}", email);
        }
    }

    Ok(())
}

fn broker(config: Config) -> Result<WorkspaceBroker> {
    let store = build_token_store(&config)?;
    WorkspaceBroker::new(Arc::new(config), store, Arc::new(SystemClock))
}
