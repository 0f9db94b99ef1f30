//! CLI for rezsync - report sync, audits, and the dispatch server
//!
//! Usage:
//!   rezsync configure endpoint <short-name>
//!   rezsync configure credentials <username> <token>
//!   rezsync init <spreadsheet-id>
//!   rezsync query "<starql>" [--html]
//!   rezsync report <report-id> [--body '<json>']
//!   rezsync sync jobs.json
//!   rezsync audit plan.json
//!   rezsync dispatch '{"action": ...}'
//!   rezsync serve --bind 127.0.0.1:8080

#![allow(clippy::exit)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use rezsync::audit::AuditPlan;
use rezsync::types::{Grid, ResponseOutcome};
use rezsync::{
    logging, parse_jobs, server, sync_reports, AuditRunner, Backend, BackendClient, Dispatcher,
    LogNotifier, ReqwestClient, RequestInput, Result, Settings, SyncError, WorkbookStore,
    XlsxStore,
};
use serde_json::Value;
use tracing::info;

#[derive(Parser)]
#[clap(name = "rezsync", version)]
struct Cli {
    /// Settings file.
    #[clap(long, env = "REZSYNC_CONFIG", default_value = "rezsync.json")]
    config: PathBuf,
    /// Workbook directory, overriding `workbookDir` from the settings.
    #[clap(long, env = "REZSYNC_WORKBOOKS")]
    workbooks: Option<PathBuf>,
    /// More logging (-v debug, -vv trace).
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store the backend endpoint or credentials in the settings file.
    #[clap(subcommand)]
    Configure(Configure),
    /// Create an empty workbook.
    Init { spreadsheet_id: String },
    /// Run a StarQL query and print the result.
    Query {
        starql: String,
        /// Print an HTML table instead of TSV.
        #[clap(long)]
        html: bool,
    },
    /// Fetch a report and print the result.
    Report {
        report_id: String,
        /// JSON parameter object.
        #[clap(long)]
        body: Option<String>,
    },
    /// Run a jobs file (JSON array of report jobs).
    Sync { jobs: PathBuf },
    /// Run an audit plan.
    Audit { plan: PathBuf },
    /// Handle one dispatch request given as JSON.
    Dispatch { request: String },
    /// Serve `/exec` over HTTP.
    Serve {
        #[clap(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}

#[derive(Subcommand)]
enum Configure {
    /// Customer short name, e.g. `myschool`.
    Endpoint { short_name: String },
    Credentials { username: String, token: String },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(&cli.config)?;
    let store = XlsxStore::new(
        cli.workbooks
            .or_else(|| settings.workbook_dir.clone())
            .unwrap_or_else(|| PathBuf::from("workbooks")),
    );

    match cli.command {
        Command::Configure(what) => {
            match what {
                Configure::Endpoint { short_name } => settings.configure_endpoint(&short_name)?,
                Configure::Credentials { username, token } => {
                    settings.configure_credentials(&username, &token)?;
                }
            }
            settings.save(&cli.config)?;
            info!(path = %cli.config.display(), "Settings saved");
        }
        Command::Init { spreadsheet_id } => println!("{}", init(&store, &spreadsheet_id)?),
        Command::Query { starql, html } => {
            let outcome = backend(&settings)?.execute_query(&starql)?.into_grid()?;
            print_outcome(outcome, html)?;
        }
        Command::Report { report_id, body } => {
            let body: Option<Value> = body.as_deref().map(serde_json::from_str::<Value>).transpose()?;
            let outcome = backend(&settings)?
                .execute_report(&report_id, body.as_ref())?
                .into_grid()?;
            print_outcome(outcome, false)?;
        }
        Command::Sync { jobs } => {
            let jobs = parse_jobs(&read(&jobs)?)?;
            let backend = backend(&settings)?;
            for job in sync_reports(&backend, &store, &jobs)? {
                match job.result {
                    Ok(summary) => println!("{}\t{summary:?}", job.report_id),
                    Err(e) => println!("{}\tERROR {e}", job.report_id),
                }
            }
        }
        Command::Audit { plan } => {
            let plan: AuditPlan = serde_json::from_str(&read(&plan)?)?;
            let notifier = LogNotifier {
                default_recipient: settings.notify_email.clone(),
            };
            let report = AuditRunner::new(backend(&settings)?, &store, notifier).run(&plan)?;
            for result in &report.results {
                println!("{}\t{}", result.name, result.status.glyph());
            }
            println!(
                "{} failures, {} errors: {}",
                report.failures, report.errors, report.url
            );
        }
        Command::Dispatch { request } => {
            println!("{}", Dispatcher::new(&store).handle(&RequestInput::from_body(request)));
        }
        Command::Serve { bind } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(bind, Dispatcher::new(store)))?;
        }
    }
    Ok(())
}

fn backend(settings: &Settings) -> Result<BackendClient<ReqwestClient, Settings>> {
    let http = ReqwestClient::new(Duration::from_secs(settings.timeout_secs))?;
    Ok(BackendClient::new(http, settings.clone()))
}

/// Create a workbook, returning its URL or a note that it already exists.
fn init(store: &XlsxStore, spreadsheet_id: &str) -> Result<String> {
    Ok(if store.create(spreadsheet_id)? {
        store.url(spreadsheet_id)
    } else {
        format!("{spreadsheet_id} already exists")
    })
}

fn read(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

fn print_outcome(outcome: ResponseOutcome<Grid>, html: bool) -> Result<()> {
    match outcome {
        ResponseOutcome::Success(grid) if html => println!("{}", grid.to_html_table()),
        ResponseOutcome::Success(grid) => print!("{}", grid.to_tsv()),
        ResponseOutcome::Empty => eprintln!("No records"),
        ResponseOutcome::Failure { status, message } => {
            return Err(SyncError::Backend { status, message })
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_init_reports_url_then_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = XlsxStore::new(dir.path());
        assert_eq!(init(&store, "weekly").unwrap(), store.url("weekly"));
        assert_eq!(init(&store, "weekly").unwrap(), "weekly already exists");
    }

    #[test]
    fn test_cli_parses_init() {
        let cli = Cli::try_parse_from(["rezsync", "init", "weekly"]).unwrap();
        assert!(matches!(cli.command, Command::Init { spreadsheet_id } if spreadsheet_id == "weekly"));
    }
}
