//! MISPA CLI - Lightweight chat client
//!
//! A terminal client for the MISPA chat server.

mod api;
mod auth;
mod config;
mod models;
mod realtime;
mod session;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mispa-cli")]
#[command(about = "Lightweight CLI client for MISPA chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store and validate a bearer token
    Login {
        /// Bearer token issued by the server
        token: String,

        /// Server base URL (e.g. https://chat.example.org)
        #[arg(short, long)]
        server: Option<String>,
    },

    /// Log out and clear cached credentials
    Logout,

    /// Show current authentication status
    Status,

    /// Show current user info (verify auth works)
    Whoami,

    /// Search users by name or email
    Search {
        /// Query (at least two characters)
        query: String,
    },

    /// Add a user to your contacts
    AddContact {
        /// User ID (from `search` output)
        user_id: i64,
    },

    /// Get or set the theme preference
    Theme {
        /// New theme (e.g. dark, light); omit to show the current one
        set: Option<String>,
    },

    /// Read message history from a chat
    History {
        /// Chat ID (the contact's user ID)
        chat_id: i64,
    },

    /// Send a message over REST (no realtime connection)
    Send {
        /// Chat ID (the contact's user ID)
        #[arg(short, long)]
        to: i64,

        /// Message content
        message: String,
    },

    /// Upload files to a chat
    Upload {
        /// Chat ID (the contact's user ID)
        chat_id: i64,

        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Send a recorded voice message
    Voice {
        /// Chat ID (the contact's user ID)
        chat_id: i64,

        /// Audio file to send
        audio: PathBuf,
    },

    /// Translate text via the server
    Translate {
        /// Text to translate
        text: String,

        /// Target language code (e.g. fr, en)
        #[arg(long, default_value = "en")]
        to: String,
    },

    /// List supported translation languages
    Languages,

    /// Connect to the realtime channel and print incoming events
    Listen,

    /// Launch the terminal user interface
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Login { token, server } => {
            tracing::info!("Validating token...");
            auth::login(token, server).await?;
        }
        Commands::Logout => {
            auth::logout().await?;
        }
        Commands::Status => {
            auth::status().await?;
        }
        Commands::Whoami => {
            api::whoami().await?;
        }
        Commands::Search { query } => {
            api::search_users(&query).await?;
        }
        Commands::AddContact { user_id } => {
            api::add_contact(user_id).await?;
        }
        Commands::Theme { set } => match set {
            Some(theme) => {
                api::set_theme(theme).await?;
            }
            None => {
                api::show_theme().await?;
            }
        },
        Commands::History { chat_id } => {
            api::read_messages(chat_id).await?;
        }
        Commands::Send { to, message } => {
            tracing::info!("Sending message...");
            api::send_message(to, &message).await?;
        }
        Commands::Upload { chat_id, files } => {
            tracing::info!("Uploading {} file(s)...", files.len());
            api::upload_files(chat_id, files).await?;
        }
        Commands::Voice { chat_id, audio } => {
            api::send_voice_message(chat_id, audio).await?;
        }
        Commands::Translate { text, to } => {
            api::translate(&text, &to).await?;
        }
        Commands::Languages => {
            api::list_languages().await?;
        }
        Commands::Listen => {
            realtime::listen().await?;
        }
        Commands::Tui => {
            tui::run().await?;
        }
    }

    Ok(())
}
