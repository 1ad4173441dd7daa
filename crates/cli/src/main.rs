//! Jalapeño CLI - order groceries from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Ask the assistant, streaming the reply
//! jalapeno chat 5 lb chicken breast and a dozen eggs
//!
//! # Keep a conversation (and cart) going across turns
//! jalapeno chat --interactive
//!
//! # Place an order and follow it to delivery
//! jalapeno order place --item 12:5 --item 3:1 --watch
//!
//! # Show the recorded status timestamps of an order
//! jalapeno order timeline 42
//! ```
//!
//! # Environment Variables
//!
//! - `JALAPENO_API_URL` - Base URL of the API (default: http://localhost:8000)
//! - `JALAPENO_TIMEOUT_SECS` - Request timeout for non-streaming calls
//! - `JALAPENO_TIMELINE_DIR` - Where order timelines are stored
//! - `JALAPENO_STATUS_DELAYS` - Status progression offsets, e.g. `5,15,30`
//! - `SENTRY_DSN` - Report errors to Sentry when set
//! - `RUST_LOG` - Log filter (default: `jalapeno=info,jalapeno_client=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jalapeno_client::{ClientConfig, JalapenoClient};
use jalapeno_core::{NewOrderItem, OrderId, OrderStatus};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "jalapeno")]
#[command(author, version, about = "Jalapeño grocery ordering from the terminal")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the API is reachable
    Health,
    /// Chat with the ordering assistant
    Chat {
        /// Message to send (ignored with --interactive)
        #[arg(required_unless_present = "interactive")]
        message: Vec<String>,

        /// Start a conversation that keeps history and cart across turns
        #[arg(short, long)]
        interactive: bool,
    },
    /// Order by voice from a recorded audio file (webm)
    Voice {
        /// Path to the recording
        file: PathBuf,
    },
    /// Show example prompts
    Prompts,
    /// Place and inspect orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Place an order and run its status progression
    Place {
        /// Order line as `<product_id>:<quantity>`, repeatable
        #[arg(short, long = "item", value_parser = commands::order::parse_item, required = true)]
        items: Vec<NewOrderItem>,

        /// Print each status change as it happens
        #[arg(short, long)]
        watch: bool,
    },
    /// Show one order
    Show {
        /// Order ID
        id: OrderId,
    },
    /// List recent orders
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,

        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Set an order's status (`pending`, `confirmed`, `shipped`, `delivered`, `cancelled`)
    SetStatus {
        /// Order ID
        id: OrderId,

        /// New status
        status: OrderStatus,
    },
    /// Show when an order reached each status
    Timeline {
        /// Order ID
        id: OrderId,
    },
}

/// Initialize Sentry when `SENTRY_DSN` is set.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the tracing subscriber. Logs go to stderr; stdout is for output.
fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "jalapeno=info,jalapeno_client=info".into());

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env before Sentry reads SENTRY_DSN
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry();
    init_tracing(cli.log_json);

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        // Flush pending Sentry events before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let client = JalapenoClient::new(&config)?;

    match cli.command {
        Commands::Health => commands::health::check(&client).await?,
        Commands::Chat {
            message,
            interactive,
        } => {
            if interactive {
                commands::chat::interactive(&client, &config).await?;
            } else {
                commands::chat::once(&client, &message.join(" ")).await?;
            }
        }
        Commands::Voice { file } => commands::chat::voice(&client, &file).await?,
        Commands::Prompts => commands::chat::prompts(&client).await?,
        Commands::Order { action } => match action {
            OrderAction::Place { items, watch } => {
                commands::order::place(&client, &config, items, watch).await?;
            }
            OrderAction::Show { id } => commands::order::show(&client, id).await?,
            OrderAction::List { skip, limit } => {
                commands::order::list(&client, skip, limit).await?;
            }
            OrderAction::SetStatus { id, status } => {
                commands::order::set_status(&client, id, status).await?;
            }
            OrderAction::Timeline { id } => commands::order::timeline(&config, id).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_order_place() {
        let cli = Cli::try_parse_from([
            "jalapeno", "order", "place", "--item", "12:5", "--item", "3:0.5", "--watch",
        ])
        .expect("parse");

        let Commands::Order {
            action: OrderAction::Place { items, watch },
        } = cli.command
        else {
            panic!("expected order place");
        };
        assert!(watch);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].quantity, 0.5);
    }

    #[test]
    fn test_parse_set_status_rejects_unknown() {
        let result = Cli::try_parse_from(["jalapeno", "order", "set-status", "4", "lost"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_chat_requires_message_unless_interactive() {
        assert!(Cli::try_parse_from(["jalapeno", "chat"]).is_err());
        assert!(Cli::try_parse_from(["jalapeno", "chat", "--interactive"]).is_ok());
    }
}
