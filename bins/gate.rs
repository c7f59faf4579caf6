//! `gate`: the watchman's terminal client.
//!
//! Logs visitors against the server and queues them locally while the server is
//! unreachable; `gate sync` replays the queue once it is back.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, warn};

use client::{ClientError, GateClient, OfflineQueue, Session};
use common::types::{VisitorStatus, VisitorSubmission};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// Visitor log client for the society gate
#[derive(Debug, Parser)]
#[command(name = "gate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding the saved session and the offline queue
    #[arg(long, global = true, value_name = "DIR", default_value = ".gatelog")]
    data_dir: PathBuf,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and save the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Server base URL
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
    /// Log a visitor; queued locally when the server is unreachable
    Add(AddArgs),
    /// Replay queued visitors in order
    Sync,
    /// Show the offline queue
    Queue {
        /// Drop every queued entry
        #[arg(long)]
        clear: bool,
    },
    /// List visitors visible to the logged-in account
    List {
        /// pending, approved or rejected
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        per_page: u32,
    },
}

#[derive(Debug, clap::Args)]
struct AddArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    purpose: String,
    /// Flat or house number of the resident being visited
    #[arg(long)]
    resident: String,
    #[arg(long)]
    resident_name: Option<String>,
    #[arg(long)]
    vehicle: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
}

impl From<AddArgs> for VisitorSubmission {
    fn from(a: AddArgs) -> Self {
        VisitorSubmission {
            name: a.name,
            phone_number: a.phone,
            purpose: a.purpose,
            vehicle_number: a.vehicle,
            resident_id: a.resident,
            resident_name: a.resident_name.unwrap_or_default(),
            image_url: a.image_url,
            timestamp: None,
        }
    }
}

impl Cli {
    fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    fn queue_path(&self) -> PathBuf {
        self.data_dir.join("queue.json")
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let session_path = cli.session_path();
    let queue_path = cli.queue_path();
    match cli.command {
        Command::Login { email, password, server } => {
            let mut client = GateClient::new(&server)?;
            let out = client.login(&email, &password).await?;
            let session = Session { base_url: server, email: out.email.clone(), role: out.role, token: out.token };
            session.save(&session_path).await?;
            println!("logged in as {} ({})", out.name, out.role);
        }
        Command::Add(args) => {
            let client = Session::load(&session_path).await?.client()?;
            let submission = VisitorSubmission::from(args);
            match client.add_visitor(&submission).await {
                Ok(v) => println!("{} logged for {} ({})", v.name, v.resident_id, v.id),
                Err(e) if e.is_unreachable() => {
                    warn!(error = %e, "server unreachable; queueing");
                    let queue = OfflineQueue::open(&queue_path).await?;
                    queue.push(submission).await?;
                    println!("server unreachable; queued ({} pending)", queue.len().await);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Sync => {
            let client = Session::load(&session_path).await?.client()?;
            let queue = OfflineQueue::open(&queue_path).await?;
            let report = queue
                .flush(|sub| {
                    let client = client.clone();
                    async move {
                        let outcome = client.sync_visitors(std::slice::from_ref(&sub)).await.map_err(|e: ClientError| e.to_string())?;
                        match outcome.into_iter().next() {
                            Some(o) if o.is_ok() => Ok(()),
                            Some(o) => Err(format!("{}: {}", sub.name, o.error.unwrap_or_default())),
                            None => Err(format!("{}: no outcome returned", sub.name)),
                        }
                    }
                })
                .await?;
            println!("synced {}, {} still queued", report.sent, report.remaining);
            if let Some(e) = report.error {
                anyhow::bail!("sync stopped: {e}");
            }
        }
        Command::Queue { clear } => {
            let queue = OfflineQueue::open(&queue_path).await?;
            if clear {
                queue.clear().await?;
                println!("queue cleared");
                return Ok(());
            }
            let entries = queue.list().await;
            if entries.is_empty() {
                println!("queue is empty");
            }
            for (i, e) in entries.iter().enumerate() {
                println!(
                    "{:>3}  {}  {:<20} {:<12} flat {}",
                    i + 1,
                    e.queued_at.format("%Y-%m-%d %H:%M:%S"),
                    e.submission.name,
                    e.submission.purpose,
                    e.submission.resident_id
                );
            }
        }
        Command::List { status, page, per_page } => {
            let status = status.map(|s| s.parse::<VisitorStatus>()).transpose()?;
            let client = Session::load(&session_path).await?.client()?;
            let out = client.list_visitors(status, page, per_page).await?;
            for v in &out.items {
                println!(
                    "{}  {:<8} {:<20} {:<12} flat {}",
                    v.timestamp.format("%Y-%m-%d %H:%M"),
                    v.status.as_str(),
                    v.name,
                    v.purpose,
                    v.resident_id
                );
            }
            println!("page {} of {} visitors", out.page, out.total);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    common::utils::logging::init_logging_cli(cli.log_directive());
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gate command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_parses_into_submission() {
        let cli = Cli::try_parse_from([
            "gate", "add", "--name", "Ravi", "--phone", "9876543210", "--purpose", "Delivery", "--resident", "101",
            "--vehicle", "KA01",
        ])
        .unwrap();
        let Command::Add(args) = cli.command else { panic!("expected add") };
        let sub = VisitorSubmission::from(args);
        assert_eq!(sub.resident_id, "101");
        assert_eq!(sub.vehicle_number.as_deref(), Some("KA01"));
        assert!(sub.resident_name.is_empty());
    }

    #[test]
    fn verbosity_maps_to_directive() {
        let cli = Cli::try_parse_from(["gate", "-vv", "sync"]).unwrap();
        assert_eq!(cli.log_directive(), "trace");
        assert_eq!(cli.queue_path(), PathBuf::from(".gatelog/queue.json"));
    }
}
