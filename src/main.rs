use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use timber::config::Config;
use timber::engage::{self, EngageAction, EngagementState};
use timber::feed::fetcher::{self, FeedRequest};
use timber::feed::FeedMode;
use timber::output::terminal;
use timber::store;

/// Timber: the feed for a work-log network.
///
/// Fetches and ranks pages of the suggested or following feed against the
/// configured backend, and records likes/relogs.
#[derive(Parser)]
#[command(name = "timber", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one page of a feed
    Feed {
        /// Feed mode: following or suggested
        #[arg(long, default_value = "suggested")]
        mode: String,

        /// Viewer user id (omit for an anonymous view)
        #[arg(long)]
        viewer: Option<String>,

        /// Continuation cursor from a previous page (RFC 3339 timestamp)
        #[arg(long)]
        cursor: Option<String>,

        /// Page size (overrides TIMBER_PAGE_SIZE)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Like (or with --undo, unlike) a log
    Like {
        /// The log id
        log_id: String,

        /// Acting user id
        #[arg(long)]
        viewer: String,

        /// Remove the like instead
        #[arg(long)]
        undo: bool,
    },

    /// Relog (or with --undo, un-relog) a log
    Relog {
        /// The log id
        log_id: String,

        /// Acting user id
        #[arg(long)]
        viewer: String,

        /// Remove the relog instead
        #[arg(long)]
        undo: bool,
    },

    /// Show the configured backend and feed settings
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("timber=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Feed {
            mode,
            viewer,
            cursor,
            limit,
        } => {
            config.require_backend()?;
            let store = store::open_store(&config).await?;

            let mode: FeedMode = mode.parse()?;
            let mut request = FeedRequest::new(mode, viewer, limit.unwrap_or(config.page_size));
            request.cursor = cursor.as_deref().map(parse_cursor).transpose()?;
            request.deadline = config.fetch_deadline;

            let page = fetcher::fetch_page(store.as_ref(), &request).await?;
            terminal::display_feed_page(&page, mode.as_str());
        }

        Commands::Like {
            log_id,
            viewer,
            undo,
        } => {
            config.require_backend()?;
            let store = store::open_store(&config).await?;

            let action = if undo {
                EngageAction::Unlike
            } else {
                EngageAction::Like
            };
            let mut state = EngagementState::default();
            engage::engage(store.as_ref(), &viewer, &log_id, action, &mut state).await?;
            println!(
                "{} log {log_id}",
                if undo { "Unliked" } else { "Liked" }
            );
        }

        Commands::Relog {
            log_id,
            viewer,
            undo,
        } => {
            config.require_backend()?;
            let store = store::open_store(&config).await?;

            let action = if undo {
                EngageAction::Unrelog
            } else {
                EngageAction::Relog
            };
            let mut state = EngagementState::default();
            engage::engage(store.as_ref(), &viewer, &log_id, action, &mut state).await?;
            println!(
                "{} log {log_id}",
                if undo { "Un-relogged" } else { "Relogged" }
            );
        }

        Commands::Status => {
            let backend = if config.database_url.is_some() {
                "PostgreSQL (DATABASE_URL)"
            } else if config.api_url.is_some() {
                "hosted data API (TIMBER_API_URL)"
            } else {
                "none configured"
            };
            println!("Backend:        {backend}");
            println!("Page size:      {}", config.page_size);
            match config.fetch_deadline {
                Some(deadline) => println!("Fetch deadline: {deadline:?}"),
                None => println!("Fetch deadline: none"),
            }
        }
    }

    Ok(())
}

fn parse_cursor(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| anyhow::anyhow!("Invalid cursor '{raw}': {e}"))?;
    Ok(parsed.with_timezone(&Utc))
}
