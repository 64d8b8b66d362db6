//! `Tasklist`: a persisted task list for the terminal.
//!
//! Tasks live in a data directory shared by every `tasklist` process, so a
//! change made in one shell shows up in any `tasklist watch` running
//! elsewhere. Configuration via CLI flags, environment variables, or config
//! file (`~/.config/tasklist/config.toml`).
//!
//! ```bash
//! cargo run --bin tasklist -- add Buy milk
//! cargo run --bin tasklist -- toggle 0190
//! cargo run --bin tasklist -- watch --interval-ms 250
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing_appender::non_blocking::WorkerGuard;

use tasklist::binding::DurableBinding;
use tasklist::config::{CliArgs, Command, TasklistConfig};
use tasklist::storage::KeyValueStore;
use tasklist::storage::file::FileStore;
use tasklist::tasks::{TaskState, TaskStateManager};
use tasklist::view::{self, IdMatch};
use tasklist_proto::task::TaskId;

const MIN_WATCH_INTERVAL: Duration = Duration::from_millis(10);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > env > config file > defaults).
    let config = match TasklistConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            TasklistConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        key = %config.storage_key,
        "tasklist starting"
    );

    let store = match FileStore::open(config.data_dir.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let kv: Arc<dyn KeyValueStore> = Arc::clone(&store) as Arc<dyn KeyValueStore>;
    let binding = DurableBinding::new(kv, config.storage_key.clone());
    let mut manager = TaskStateManager::new(binding).with_limits(config.task_limits());

    let code = match cli.command.clone().unwrap_or(Command::List) {
        Command::List => {
            print!("{}", view::render(&manager.snapshot()));
            ExitCode::SUCCESS
        }
        Command::Add { text } => finish(&manager.add_task(&text.join(" "))),
        Command::Toggle { id } => match lookup(&manager, &id) {
            Some(id) => finish(&manager.toggle_task(&id)),
            None => ExitCode::FAILURE,
        },
        Command::Delete { id } => match lookup(&manager, &id) {
            Some(id) => finish(&manager.delete_task(&id)),
            None => ExitCode::FAILURE,
        },
        Command::Watch { .. } => {
            watch(&manager, &store, config.watch_interval).await;
            ExitCode::SUCCESS
        }
    };

    manager.close();
    tracing::debug!("tasklist exiting");
    code
}

/// Initialize logging.
///
/// Logs go to stderr unless `file_path` is given. When writing to a file,
/// returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    let Some((log_dir, file_name)) = file_path.and_then(|p| {
        let dir = p
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        p.file_name().map(|name| (dir, name))
    }) else {
        builder.with_writer(std::io::stderr).init();
        return None;
    };

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    builder.with_writer(non_blocking).with_ansi(false).init();
    Some(guard)
}

/// Prints the outcome of a mutation and maps it to an exit code.
fn finish(state: &TaskState) -> ExitCode {
    if let Some(error) = &state.error {
        eprintln!("error: {error}");
        return ExitCode::FAILURE;
    }
    print!("{}", view::render(state));
    ExitCode::SUCCESS
}

fn lookup(manager: &TaskStateManager, input: &str) -> Option<TaskId> {
    match view::resolve_id(&manager.snapshot(), input) {
        IdMatch::Found(id) => Some(id),
        IdMatch::NotFound => {
            eprintln!("error: no task matches {input:?}");
            None
        }
        IdMatch::Ambiguous(count) => {
            eprintln!("error: {input:?} matches {count} tasks, give more of the id");
            None
        }
    }
}

/// Reprints the list on every change until Ctrl-C.
///
/// Changes made by other processes are picked up by polling the store.
async fn watch(manager: &TaskStateManager, store: &FileStore, interval: Duration) {
    let mut updates = manager.watch();
    let mut ticker = tokio::time::interval(interval.max(MIN_WATCH_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tracing::info!(dir = %store.dir().display(), ?interval, "watching for changes");
    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                }
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = store.poll_changes() {
                    tracing::warn!(error = %e, "failed to poll store");
                }
            }
            Some(state) = updates.recv() => {
                println!("--- {} ---", chrono::Local::now().format("%H:%M:%S"));
                print!("{}", view::render(&state));
            }
        }
    }
}
