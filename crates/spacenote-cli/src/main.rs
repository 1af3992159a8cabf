//! SpaceNote command-line front-end.
//!
//! The session lives only for one invocation: when `SPACENOTE_USERNAME` and
//! `SPACENOTE_PASSWORD` are set, the CLI logs in before running the command.

mod commands;
mod io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spacenote_client::{ClientConfig, NotesQuery, SpaceNoteClient};
use spacenote_core::defaults::{NOTES_FIRST_PAGE, NOTES_PAGE_LIMIT};
use spacenote_core::{Error, NoteView};

use crate::io::parse_assignment;

#[derive(Debug, Parser)]
#[command(name = "spacenote", version, about = "Work with SpaceNote spaces and notes")]
struct Cli {
    /// Backend origin, e.g. http://127.0.0.1:3100
    #[arg(long, env = "SPACENOTE_API_URL", global = true)]
    api_url: Option<String>,

    #[arg(long, env = "SPACENOTE_USERNAME", global = true)]
    username: Option<String>,

    #[arg(long, env = "SPACENOTE_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check credentials and show the profile
    Login,
    /// List visible spaces (* marks membership)
    Spaces,
    /// Show a space's fields, input widgets and saved filters
    Fields { space: String },
    /// List notes of a space
    Notes {
        space: String,
        /// Saved filter name
        #[arg(long)]
        filter: Option<String>,
        /// Ad-hoc query, e.g. status:eq:open,note.number:gt:10
        #[arg(long)]
        q: Option<String>,
        #[arg(long, default_value_t = NOTES_FIRST_PAGE)]
        page: u32,
        #[arg(long, default_value_t = NOTES_PAGE_LIMIT)]
        limit: u32,
    },
    /// Show one note
    Note {
        space: String,
        number: i64,
        /// default, template or json
        #[arg(long, default_value = "default")]
        view: NoteView,
    },
    /// Create a note
    Create {
        space: String,
        /// Field value as NAME=VALUE (repeatable)
        #[arg(long = "field", value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
        /// Image as FIELD=PATH (repeatable)
        #[arg(long = "image", value_parser = parse_assignment)]
        images: Vec<(String, String)>,
    },
    /// Change fields of a note
    Edit {
        space: String,
        number: i64,
        #[arg(long = "field", value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
        #[arg(long = "image", value_parser = parse_assignment)]
        images: Vec<(String, String)>,
    },
    /// Delete a note
    Delete { space: String, number: i64 },
    /// Comment on a note
    Comment {
        space: String,
        number: i64,
        text: String,
        /// Reply to this comment number
        #[arg(long)]
        reply_to: Option<i64>,
    },
    /// Upload a file to a space or a note
    Upload {
        space: String,
        path: PathBuf,
        #[arg(long)]
        note: Option<i64>,
    },
    /// Export a space as JSON
    Export {
        space: String,
        /// Include notes and comments
        #[arg(long)]
        include_data: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import a space from an export file
    Import { path: PathBuf },
    /// Query string tools
    #[command(subcommand)]
    Query(QueryCommand),
}

#[derive(Debug, Subcommand)]
enum QueryCommand {
    /// Parse a q string and print its conditions
    Parse { q: String },
    /// Print the q string equivalent to a saved filter
    Filter { space: String, name: String },
}

fn init_tracing() {
    // LOG_FORMAT - "json" or "text" (default: "text")
    // RUST_LOG   - standard env filter (default: "spacenote=warn")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "spacenote=warn,spacenote_client=warn,spacenote_core=warn".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_client(cli: &Cli) -> Result<SpaceNoteClient> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url.clone());
    }
    SpaceNoteClient::new(config).context("Invalid client configuration")
}

/// Log in when credentials are configured.
async fn start_session(client: &SpaceNoteClient, cli: &Cli) -> Result<()> {
    if let (Some(username), Some(password)) = (&cli.username, &cli.password) {
        client.login(username, password).await?;
        debug!(subsystem = "cli", username = %username, "Session started");
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Query(QueryCommand::Parse { q }) = &cli.command {
        commands::parse(q);
        return Ok(());
    }

    let client = build_client(&cli)?;
    if let Command::Login = &cli.command {
        let username = cli.username.as_deref().context("SPACENOTE_USERNAME is not set")?;
        let password = cli.password.as_deref().context("SPACENOTE_PASSWORD is not set")?;
        return commands::login(&client, username, password).await;
    }
    start_session(&client, &cli).await?;

    match &cli.command {
        Command::Login | Command::Query(QueryCommand::Parse { .. }) => Ok(()),
        Command::Spaces => commands::spaces(&client).await,
        Command::Fields { space } => commands::fields(&client, space).await,
        Command::Notes {
            space,
            filter,
            q,
            page,
            limit,
        } => {
            let query = NotesQuery {
                filter: filter.clone(),
                q: q.clone(),
                limit: *limit,
                ..NotesQuery::default()
            }
            .page(*page);
            commands::notes(&client, space, query).await
        }
        Command::Note {
            space,
            number,
            view,
        } => commands::show_note(&client, space, *number, *view).await,
        Command::Create {
            space,
            fields,
            images,
        } => commands::create_note(&client, space, fields, images).await,
        Command::Edit {
            space,
            number,
            fields,
            images,
        } => commands::edit_note(&client, space, *number, fields, images).await,
        Command::Delete { space, number } => commands::delete_note(&client, space, *number).await,
        Command::Comment {
            space,
            number,
            text,
            reply_to,
        } => commands::comment(&client, space, *number, text, *reply_to).await,
        Command::Upload { space, path, note } => {
            commands::upload(&client, space, path, *note).await
        }
        Command::Export {
            space,
            include_data,
            out,
        } => commands::export(&client, space, *include_data, out.as_deref()).await,
        Command::Import { path } => commands::import(&client, path).await,
        Command::Query(QueryCommand::Filter { space, name }) => {
            commands::filter(&client, space, name).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    info!(subsystem = "cli", command = ?cli.command, "Running command");

    run(cli).await.map_err(|e| match e.downcast_ref::<Error>() {
        Some(Error::Unauthorized(_)) => {
            e.context("Not logged in: set SPACENOTE_USERNAME and SPACENOTE_PASSWORD")
        }
        _ => e,
    })
}
