//! Fetch a repository, start a sync and follow the spawned task until the
//! server reports a terminal state.

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use pulp_core::{Client, GetRepositoryOptions, Task, TaskState};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pulp-sync", version, about = "Sync a Pulp repository and follow its task")]
struct Cli {
    /// Repository id to sync.
    repository: String,

    /// Pulp host, optionally with a port.
    #[arg(long, env = "PULP_HOST")]
    host: String,

    #[arg(long, env = "PULP_USER")]
    user: Option<String>,

    #[arg(long, env = "PULP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Use plain http.
    #[arg(long)]
    no_ssl: bool,

    /// Skip TLS certificate verification.
    #[arg(long)]
    insecure: bool,

    /// Delay between task polls, in milliseconds.
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, thiserror::Error)]
enum SyncError {
    #[error(transparent)]
    Pulp(#[from] pulp_core::Error),

    #[error("sync of {0} spawned no tasks")]
    NoTasks(String),

    #[error("task {id} ended in state {state}: {reason}")]
    TaskFailed {
        id: String,
        state: TaskState,
        reason: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_client(cli: &Cli) -> Result<Client, pulp_core::Error> {
    let mut builder = Client::builder(&cli.host)
        .disable_ssl(cli.no_ssl)
        .skip_ssl_verify(cli.insecure);
    if cli.user.is_some() || cli.password.is_some() {
        builder = builder.credentials(
            cli.user.clone().unwrap_or_default(),
            cli.password.clone().unwrap_or_default(),
        );
    }
    builder.build()
}

#[tracing::instrument(skip(cli), fields(repository = %cli.repository))]
fn run(cli: &Cli) -> Result<(), SyncError> {
    let client = build_client(cli)?;
    info!(base_url = %client.base_url(), "connecting");

    let opts = GetRepositoryOptions {
        details: true,
        ..GetRepositoryOptions::default()
    };
    let (repo, _) = client.repositories().get(&cli.repository, &opts)?;
    println!(
        "repository: {} ({} units)",
        repo.display_name.as_deref().unwrap_or(&repo.id),
        repo.total_repository_units.unwrap_or_default()
    );

    let (report, _) = client.repositories().sync(&cli.repository)?;
    let task_id = report
        .task_ids()
        .next()
        .ok_or_else(|| SyncError::NoTasks(cli.repository.clone()))?
        .to_string();
    println!("task: {task_id}");

    let task = follow(&client, &task_id, Duration::from_millis(cli.interval_ms))?;
    check_outcome(&task)?;

    if let Some(content) = &task.result.details.content {
        println!("synced {} items", content.items_total);
    }
    Ok(())
}

fn follow(client: &Client, task_id: &str, interval: Duration) -> Result<Task, SyncError> {
    loop {
        let (task, _) = client.tasks().get(task_id)?;
        debug!(state = %task.state, "polled task");
        println!("{}", progress_line(&task));
        if task.is_terminal() {
            return Ok(task);
        }
        thread::sleep(interval);
    }
}

fn progress_line(task: &Task) -> String {
    let mut line = format!("state: {}", task.state);
    if let Some(kind) = task.importer_kind() {
        line.push_str(&format!(", importer: {kind}"));
    }
    if let Some(content) = task.content_progress() {
        line.push_str(&format!(
            ", items: {}/{} ({} left)",
            content.items_done(),
            content.items_total,
            content.items_left
        ));
    }
    line
}

fn check_outcome(task: &Task) -> Result<(), SyncError> {
    if task.state == TaskState::Finished {
        return Ok(());
    }
    let reason = match &task.error {
        Some(err) => err.to_string(),
        None => "no error reported".to_string(),
    };
    Err(SyncError::TaskFailed {
        id: task.id.clone(),
        state: task.state,
        reason,
    })
}
