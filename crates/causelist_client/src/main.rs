use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use causelist_client::{
    ApiClient, AuthContext, CaseSearch, Cause, ClientConfig, ControllerSettings, DisplaySink,
    FileTokenStore, JobController, RunEnd,
};
use causelist_core::{ControllerView, ReentryPolicy};
use causelist_gateway::{Forwarder, ReqwestForwarder};
use causelist_logging::{cl_warn, LogDestination};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "causelist", about = "Cause list lookup and extraction control")]
struct Cli {
    /// Log debug output to the terminal.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Also write log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Obtain a session token and store it.
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "CAUSELIST_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session token.
    Logout,
    /// Show the aggregate scraper status.
    Status,
    /// Show past extraction runs.
    Logs {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Trigger an extraction run and follow its progress until it ends.
    Run {
        /// Cause list date to extract (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Refuse to start while this client already has a run in flight.
        #[arg(long)]
        reject_reentry: bool,
    },
    /// Ask the upstream to cancel the current run.
    Stop,
    /// Search cases.
    Search {
        query: Option<String>,
        #[arg(long)]
        case_no: Option<String>,
        #[arg(long)]
        advocate: Option<String>,
        #[arg(long)]
        court_no: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        fuzzy: bool,
        #[arg(long)]
        hrce: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one case and its related cases.
    Case { id: i64 },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let destination = match cli.log_file.clone() {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    causelist_logging::initialize(destination, level);

    let config = ClientConfig::from_env().context("Failed to load client configuration")?;
    let forwarder: Arc<dyn Forwarder> =
        Arc::new(ReqwestForwarder::new(&config.api_base).context("Invalid CAUSELIST_API_BASE")?);
    let auth = AuthContext::new(Arc::new(FileTokenStore::new(config.token_file.clone())));
    let api = ApiClient::new(forwarder, auth);

    match cli.command {
        Command::Login { username, password } => {
            api.login(&username, &password).await?;
            println!("Logged in as {username}");
        }
        Command::Logout => {
            api.logout()?;
            println!("Logged out");
        }
        Command::Status => {
            let status = api.status().await?;
            println!("Status:                {}", status.status);
            println!(
                "Last run:              {}",
                status.last_run.as_deref().unwrap_or("N/A")
            );
            println!("Total records:         {}", status.total_records);
            println!("Last extraction count: {}", status.last_extraction_count);
        }
        Command::Logs { limit } => {
            let entries = api.logs(limit).await?;
            if entries.is_empty() {
                println!("No logs available");
            }
            for entry in entries {
                println!(
                    "{:>5}  {}  {:<8} {:>6}  {}",
                    entry.id,
                    entry.run_date,
                    entry.status,
                    entry.records_extracted,
                    entry.error_message.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Run {
            date,
            reject_reentry,
        } => {
            let settings = ControllerSettings {
                poll_interval: config.poll_interval,
                reentry: if reject_reentry {
                    ReentryPolicy::Reject
                } else {
                    ReentryPolicy::Allow
                },
            };
            run_job(api, settings, date).await?;
        }
        Command::Stop => {
            api.stop().await?;
            println!("Stop requested");
        }
        Command::Search {
            query,
            case_no,
            advocate,
            court_no,
            from,
            to,
            fuzzy,
            hrce,
            limit,
        } => {
            let search = CaseSearch {
                query,
                case_no,
                advocate,
                court_no,
                hearing_date_from: from,
                hearing_date_to: to,
                fuzzy,
                is_hrce: hrce,
                limit,
            };
            let causes = api.search(&search).await?;
            if causes.is_empty() {
                println!("No cases found");
            }
            for cause in &causes {
                print_cause_line(cause);
            }
        }
        Command::Case { id } => {
            let cause = api.case(id).await?;
            print_cause_line(&cause);
            for related in api.related(id).await? {
                print!("  {:.2} {:<24} ", related.similarity_score, related.match_reason);
                print_cause_line(&related.cause);
            }
        }
    }
    Ok(())
}

async fn run_job(
    api: ApiClient,
    settings: ControllerSettings,
    date: Option<NaiveDate>,
) -> Result<()> {
    if !api.auth().has_token() {
        bail!("Please login first");
    }

    let mut controller = JobController::spawn(api, settings, Arc::new(TerminalSink::default()));
    let before = controller.view().finished_runs;
    controller.trigger(date);

    let (interrupt_tx, mut interrupts) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            if let Err(err) = tokio::signal::ctrl_c().await {
                cl_warn!("Failed to listen for Ctrl-C: {}", err);
                break;
            }
            if interrupt_tx.send(()).is_err() {
                break;
            }
        }
    });

    let view = match controller.follow_run(before, &mut interrupts).await {
        RunEnd::Finished(view) => view,
        RunEnd::Abandoned => {
            controller.shutdown().await;
            bail!("Stopped waiting; the run may still be in progress upstream");
        }
        RunEnd::Closed => bail!("job controller stopped unexpectedly"),
    };
    controller.shutdown().await;

    match (&view.last_error, &view.last_message) {
        (Some(error), _) => bail!("{error}"),
        (None, Some(message)) => {
            println!("{message}");
            if view.stop_requested {
                println!("Note: the run may have completed before the stop request took effect.");
            }
        }
        (None, None) => println!("Extracted {} records", view.last_extraction_count),
    }
    Ok(())
}

fn print_cause_line(cause: &Cause) {
    println!(
        "#{:<6} {:<20} {:<10} {} vs {}{}",
        cause.id,
        cause.case_no.as_deref().unwrap_or("-"),
        cause
            .hearing_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "-".to_string()),
        cause.petitioner.as_deref().unwrap_or("-"),
        cause.respondent.as_deref().unwrap_or("-"),
        if cause.is_hrce { " [HR&CE]" } else { "" }
    );
}

/// Prints snapshot lines to stdout. Lines already shown are skipped while the
/// new snapshot extends the old one; a snapshot that does not is reprinted whole.
#[derive(Default)]
struct TerminalSink {
    shown: Mutex<Vec<String>>,
}

impl DisplaySink for TerminalSink {
    fn render(&self, view: &ControllerView) {
        let mut shown = self.shown.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *shown == view.logs {
            return;
        }
        if view.logs.starts_with(&shown) {
            for line in &view.logs[shown.len()..] {
                println!("{line}");
            }
        } else if !view.logs.is_empty() {
            println!("--- progress ---");
            for line in &view.logs {
                println!("{line}");
            }
        }
        *shown = view.logs.clone();
    }
}
