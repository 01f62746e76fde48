mod config;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dex_core::duration::parse_archive_duration;
use dex_core::error::DexError;
use dex_core::ids::{Clock, SystemClock};
use dex_core::model::{ArchivedTask, Task, TaskMetadata};
use dex_service::{
    Archiver, BulkCriteria, CreateInput, GithubSyncHook, Importer, ListFilters, NoopSyncHook, SyncHook, TaskService,
    TaskView, UpdateInput,
};
use dex_storage::{TokioActiveStore, TokioArchiveLog, TokioSyncStateStore};
use dex_sync::{parse_issue_ref, GithubClient, RepoRef};
use telemetry::LogFormat;
use tracing::warn;

/// A local-first task graph, mirrored to GitHub Issues when configured.
///
/// This binary is a thin wiring layer: config loading, logging setup, and a
/// minimal subcommand surface over `dex-service`. It does not aim to be a
/// polished CLI (see the workspace's Non-goals) — it exists so the
/// task graph is drivable from a shell.
#[derive(Parser)]
#[command(name = "dex", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Explicit config file; otherwise global then project `.dex/config.toml` are layered.
    #[arg(long, global = true, env = "DEX_CONFIG")]
    config: Option<std::path::PathBuf>,

    #[arg(long, global = true, env = "DEX_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, global = true, env = "DEX_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    /// `owner/name` of the GitHub repo to sync against. Required whenever
    /// `sync.github.enabled` is true, or for `import`.
    #[arg(long, global = true, env = "DEX_REPO")]
    repo: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a task.
    Create {
        name: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
        #[arg(long = "blocked-by")]
        blocked_by: Vec<String>,
    },
    /// List tasks.
    List {
        #[arg(long)]
        all: bool,
        #[arg(long)]
        completed: bool,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        blocked: bool,
        #[arg(long)]
        ready: bool,
    },
    /// Show a single task.
    Show { id: String },
    /// Edit a task's fields.
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        clear_parent: bool,
        #[arg(long = "add-blocked-by")]
        add_blocked_by: Vec<String>,
        #[arg(long = "remove-blocked-by")]
        remove_blocked_by: Vec<String>,
    },
    /// Mark a task complete.
    Complete { id: String, result: String },
    /// Mark a task started.
    Start {
        id: String,
        #[arg(long)]
        force: bool,
    },
    /// Delete a task and its descendants.
    Delete { id: String },
    /// Full-text search across active (and optionally archived) tasks.
    Search {
        query: String,
        #[arg(long)]
        include_archive: bool,
    },
    /// Archive a single completed lineage.
    Archive { id: String },
    /// Archive every eligible completed lineage.
    ArchiveBulk {
        #[arg(long = "older-than")]
        older_than: Option<String>,
        #[arg(long)]
        except: Vec<String>,
        /// Ignore age entirely; archive every completed, eligible lineage.
        #[arg(long)]
        completed: bool,
    },
    /// Import (or re-import with `--update`) a GitHub issue as a task.
    Import {
        /// `#N`, `owner/repo#N`, or a full issue URL.
        issue: String,
        #[arg(long)]
        update: bool,
    },
}

fn print_task(task: &Task) {
    println!(
        "{}  [{}]  p{}  {}{}",
        task.id,
        if task.completed { "x" } else { " " },
        task.priority,
        task.name,
        task.parent_id
            .as_ref()
            .map(|p| format!("  (parent: {p})"))
            .unwrap_or_default()
    );
}

fn print_archived(task: &ArchivedTask) {
    println!(
        "{}  [archived {}]  {}",
        task.id,
        task.archived_at.format("%Y-%m-%d"),
        task.name
    );
}

fn print_view(view: &TaskView) {
    match view {
        TaskView::Active(t) => print_task(t),
        TaskView::Archived(a) => print_archived(a),
    }
}

/// Maps a failure to the process exit code required at the CLI boundary:
/// `0` success, `1` user error, `2` storage/I/O failure, `3` remote sync
/// failure surfaced to the user.
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = err
                .downcast_ref::<DexError>()
                .map(DexError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let cfg = config::load(cli.config.as_deref(), &cwd).context("failed to load configuration")?;

    telemetry::init_telemetry(&cli.log_level, cli.log_format).context("failed to initialize logging")?;

    let central_home = config::home_dir().join(".dex");
    let store_dir = dex_storage::resolve_store_dir(cfg.storage.file.mode, &cwd, &central_home);
    let git_root = dex_storage::find_git_root(&cwd);
    let identifier = dex_storage::project_key(git_root.as_deref().unwrap_or(&cwd));

    let active = Arc::new(TokioActiveStore::new(store_dir.clone(), identifier));
    let archive = Arc::new(TokioArchiveLog::new(store_dir.clone()));
    let sync_state = Arc::new(TokioSyncStateStore::new(store_dir.clone()));
    let clock = Arc::new(SystemClock);

    let github_hook = if cfg.sync.github.enabled {
        let repo_str = cli
            .repo
            .clone()
            .context("sync.github.enabled requires --repo or DEX_REPO")?;
        let repo = RepoRef::parse(&repo_str)?;
        let token = GithubClient::acquire_token(&cfg.sync.github.token_env)?;
        Some(Arc::new(GithubSyncHook::new(
            cfg.sync.github.clone(),
            repo,
            token,
            sync_state.clone(),
        )))
    } else {
        None
    };

    let sync_hook: Arc<dyn SyncHook> = match &github_hook {
        Some(hook) => hook.clone(),
        None => Arc::new(NoopSyncHook),
    };

    let svc = TaskService::new(active.clone(), archive.clone(), clock.clone(), sync_hook);
    let archiver = Archiver::new(active.clone(), archive.clone());

    let importer = match &cli.repo {
        Some(repo_str) => {
            let repo = RepoRef::parse(repo_str)?;
            let token = GithubClient::acquire_token(&cfg.sync.github.token_env)?;
            Some(Importer::new(repo, token, active.clone(), clock.clone()))
        }
        None => None,
    };

    match cli.command {
        Command::Create { name, id, parent, description, priority, blocked_by } => {
            let task = svc
                .create(CreateInput {
                    id,
                    name,
                    description,
                    parent_id: parent,
                    priority,
                    blocked_by: if blocked_by.is_empty() { None } else { Some(blocked_by) },
                })
                .await?;
            apply_pending_metadata(&svc, &github_hook, &task.id).await;
            print_task(&task);
        }
        Command::List { all, completed, query, blocked, ready } => {
            let tasks = svc
                .list(ListFilters {
                    all,
                    completed: if all { None } else { Some(completed) },
                    query,
                    blocked: blocked.then_some(true),
                    ready: ready.then_some(true),
                    in_progress: None,
                })
                .await?;
            for task in &tasks {
                print_task(task);
            }
        }
        Command::Show { id } => match svc.get_with_archive(&id).await? {
            Some(view) => print_view(&view),
            None => println!("no such task: {id}"),
        },
        Command::Update {
            id,
            name,
            description,
            priority,
            parent,
            clear_parent,
            add_blocked_by,
            remove_blocked_by,
        } => {
            let parent_id = if clear_parent {
                Some(None)
            } else {
                parent.map(Some)
            };
            let task = svc
                .update(
                    &id,
                    UpdateInput {
                        name,
                        description,
                        priority,
                        parent_id,
                        add_blocked_by: (!add_blocked_by.is_empty()).then_some(add_blocked_by),
                        remove_blocked_by: (!remove_blocked_by.is_empty()).then_some(remove_blocked_by),
                        ..Default::default()
                    },
                )
                .await?;
            print_task(&task);
        }
        Command::Complete { id, result } => {
            let task = svc.complete(&id, result, None).await?;
            apply_pending_metadata(&svc, &github_hook, &task.id).await;
            print_task(&task);
        }
        Command::Start { id, force } => {
            let task = svc.start(&id, force).await?;
            print_task(&task);
        }
        Command::Delete { id } => {
            let task = svc.delete(&id).await?;
            println!("deleted {} and its descendants", task.id);
        }
        Command::Search { query, include_archive } => {
            let results = svc.search(&query, include_archive).await?;
            for view in &results {
                print_view(view);
            }
        }
        Command::Archive { id } => {
            let records = archiver.archive_lineage(&id, clock.now()).await?;
            println!("archived {} task(s)", records.len());
        }
        Command::ArchiveBulk { older_than, except, completed } => {
            let mut criteria = BulkCriteria { except, ignore_age: completed, ..Default::default() };
            if let Some(spec) = older_than {
                let parsed = parse_archive_duration(&spec)
                    .with_context(|| format!("invalid --older-than value: {spec}"))?;
                criteria.min_age_days = parsed.num_days();
            }
            let records = archiver.archive_bulk(clock.now(), &criteria).await?;
            println!("archived {} task(s)", records.len());
        }
        Command::Import { issue, update } => {
            let importer = importer.context("import requires --repo or DEX_REPO")?;
            let issue_ref = parse_issue_ref(&issue)?;
            let task = importer.import(issue_ref, update).await?;
            print_task(&task);
        }
    }

    Ok(())
}

async fn apply_pending_metadata(svc: &TaskService, hook: &Option<Arc<GithubSyncHook>>, root_id: &str) {
    let Some(hook) = hook else { return };
    if let Some(meta) = hook.take_pending_metadata(root_id).await {
        let update = UpdateInput {
            metadata: Some(TaskMetadata { github: Some(meta), commit: None }),
            ..Default::default()
        };
        if let Err(e) = svc.update(root_id, update).await {
            warn!(task = %root_id, error = %e, "failed to record GitHub issue metadata");
        }
    }
}
