//! srcq - Source engine server query tool
//!
//! Queries game servers (info, players, rules, ping) and the master server
//! directory, printing the results as JSON.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use srcquery_config::{parse_filter_value, QueryOptions};
use srcquery_core::Region;
use srcquery_network::{DirectoryClient, SourceServer};
use srcquery_protocol::START_OF_LIST;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "srcq")]
#[command(about = "Query Source engine game servers and the master server directory")]
#[command(version)]
struct Cli {
    /// Options file (defaults to ./queryoptions.txt when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the query timeout, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    timeout: Option<u64>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query server information
    Info {
        /// Server address (host:port)
        address: String,
    },

    /// List connected players
    Players {
        /// Server address (host:port)
        address: String,
    },

    /// List server rules (cvars)
    Rules {
        /// Server address (host:port)
        address: String,
    },

    /// Measure round-trip latency
    Ping {
        /// Server address (host:port)
        address: String,
    },

    /// Query the master server directory
    Master {
        /// Region name or code (overrides the options file)
        #[arg(short, long)]
        region: Option<String>,

        /// Address to continue the listing from
        #[arg(long, default_value = START_OF_LIST)]
        start: String,

        /// Filter entry, repeatable
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Follow pages until the end of the list
        #[arg(long)]
        all: bool,
    },
}

#[derive(Serialize)]
struct PingReport<'a> {
    address: &'a str,
    rtt_ms: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut options = match &cli.config {
        Some(path) => QueryOptions::load(path)
            .with_context(|| format!("failed to load options from {}", path.display()))?,
        None => QueryOptions::load_default().context("failed to load queryoptions.txt")?,
    };
    if let Some(ms) = cli.timeout {
        options.timeout = Duration::from_millis(ms);
    }
    if cli.verbose {
        options.display();
    }

    match cli.command {
        Commands::Info { address } => {
            let server = SourceServer::new(address).with_timeout(options.timeout);
            let info = server.info().await?;
            info!("{} is running {} ({}/{})", info.name, info.map, info.players, info.max_players);
            print_json(&info, cli.pretty)?;
        }
        Commands::Players { address } => {
            let server = SourceServer::new(address).with_timeout(options.timeout);
            let players = server.players().await?;
            info!("{} players", players.len());
            print_json(&players, cli.pretty)?;
        }
        Commands::Rules { address } => {
            let server = SourceServer::new(address).with_timeout(options.timeout);
            let rules = server.rules().await?;
            info!("{} rules", rules.len());
            print_json(&rules, cli.pretty)?;
        }
        Commands::Ping { address } => {
            let server = SourceServer::new(address.as_str()).with_timeout(options.timeout);
            let rtt = server.ping().await?;
            info!("{} answered in {:?}", address, rtt);
            let report = PingReport {
                address: &address,
                rtt_ms: rtt.as_secs_f64() * 1000.0,
            };
            print_json(&report, cli.pretty)?;
        }
        Commands::Master {
            region,
            start,
            filters,
            all,
        } => {
            if let Some(name) = region {
                options.region = match Region::from_name(&name) {
                    Some(region) => region,
                    None => bail!("unknown region '{}'", name),
                };
            }
            for entry in &filters {
                let (key, value) = parse_filter_arg(entry)?;
                options.filter.set(key, parse_filter_value(value));
            }

            let filter = options.filter.clone();
            let mut client = DirectoryClient::from_config(&options.into_client_config())?;
            client.set_filter(filter);
            debug!("Directory region {:?}", client.region());

            let records = if all {
                client.query_all().await?
            } else {
                client.query(&start).await?
            };
            info!("{} addresses", records.len());

            let addresses: Vec<String> = records.iter().map(ToString::to_string).collect();
            print_json(&addresses, cli.pretty)?;
        }
    }

    Ok(())
}

fn parse_filter_arg(entry: &str) -> anyhow::Result<(&str, &str)> {
    match entry.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => bail!("filter must be KEY=VALUE, got '{}'", entry),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
