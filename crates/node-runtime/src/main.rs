//! # Lattice Node Runtime
//!
//! The `lattice-node` binary: an embedded gateway server over the
//! configured backend stack, plus one-shot CLI commands against the same
//! stack.
//!
//! ```text
//! lattice-node node                 # run the server (default)
//! lattice-node read  <uri>
//! lattice-node list  <uri> [--page N] [--limit N] [--pattern S]
//! lattice-node write <uri> <value>
//! lattice-node delete <uri>
//! ```
//!
//! Configuration comes from the environment: `PORT`, `CORS_ORIGIN`,
//! `BACKEND_URL`, `SCHEMA_MODULE`, `RUST_LOG`.

mod backends;
mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::RuntimeConfig;
use shared_types::{ListOptions, SortBy, SortOrder};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lattice-node", version, about = "URI-addressed persistence node")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the embedded server (the default).
    Node,
    /// Read the record at a URI.
    Read { uri: String },
    /// List the children of a path prefix.
    List {
        uri: String,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long, value_parser = ["name", "ts"])]
        sort_by: Option<String>,
        #[arg(long, value_parser = ["asc", "desc"])]
        sort_order: Option<String>,
    },
    /// Write a value (JSON or plain string) to a URI.
    Write { uri: String, value: String },
    /// Delete the record at a URI.
    Delete { uri: String },
}

fn list_options(
    page: Option<usize>,
    limit: Option<usize>,
    pattern: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
) -> ListOptions {
    let defaults = ListOptions::default();
    ListOptions {
        page: page.unwrap_or(defaults.page),
        limit: limit.unwrap_or(defaults.limit),
        pattern,
        sort_by: match sort_by.as_deref() {
            Some("ts") => SortBy::Ts,
            _ => defaults.sort_by,
        },
        sort_order: match sort_order.as_deref() {
            Some("desc") => SortOrder::Desc,
            _ => defaults.sort_order,
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = RuntimeConfig::from_env()?;
    let node = backends::build_stack(&config.backend_urls, &config.schema_module).await?;

    let outcome = match cli.command.unwrap_or(Command::Node) {
        Command::Node => {
            info!(
                port = config.port,
                backends = ?config.backend_urls,
                schema = %config.schema_module,
                "lattice node starting"
            );
            return commands::serve(&config, node).await;
        }
        Command::Read { uri } => commands::read(node, &uri).await,
        Command::List {
            uri,
            page,
            limit,
            pattern,
            sort_by,
            sort_order,
        } => {
            commands::list(
                node,
                &uri,
                list_options(page, limit, pattern, sort_by, sort_order),
            )
            .await
        }
        Command::Write { uri, value } => commands::write(node, &uri, &value).await,
        Command::Delete { uri } => commands::delete(node, &uri).await,
    };

    if let Err(err) = outcome {
        eprintln!("{}", err);
        std::process::exit(commands::exit_code(&err));
    }
    Ok(())
}
