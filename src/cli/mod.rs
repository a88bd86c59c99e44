use std::env;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;

use crate::config::{load_config, WatchConfig};
use crate::core::{classify_all, StatusSnapshot};
use crate::error::{Result, StatusWatchError};
use crate::git::{GitBackend, MutationOp, RepositoryBackend};
use crate::util::output;
use crate::watch::{Notification, SessionState, StatusSync, WatchSession};

#[derive(Parser, Debug)]
#[command(name = "statuswatch")]
#[command(about = "Live staged/unstaged status for a git working tree", long_about = None)]
pub struct Cli {
    #[arg(short = 'C', long, env = "STATUSWATCH_ROOT")]
    pub root: Option<PathBuf>,
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[arg(short, long)]
    pub quiet: bool,
    #[arg(long)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Status(StatusArgs),
    Watch(WatchArgs),
    Stage(PathArgs),
    Unstage(PathArgs),
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[arg(long)]
    pub json: bool,
    #[arg(long = "quiet-period", value_name = "MS")]
    pub quiet_period: Option<u64>,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    #[arg(required = true)]
    pub paths: Vec<String>,
    #[arg(long)]
    pub json: bool,
}

pub fn run() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        output::disable_colors();
    }
    if let Err(err) = dispatch(cli) {
        output::error(&err.to_string());
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

fn dispatch(cli: Cli) -> Result<()> {
    let root = resolve_root(cli.root)?;
    let config = load_config(Some(&root), cli.config)?;
    match cli.command {
        Commands::Status(args) => handle_status(args, &root),
        Commands::Watch(args) => handle_watch(args, &root, config),
        Commands::Stage(args) => handle_mutation(args, &root, config, MutationOp::Stage),
        Commands::Unstage(args) => handle_mutation(args, &root, config, MutationOp::Unstage),
    }
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let requested = match root {
        Some(root) => root,
        None => env::current_dir()?,
    };
    WatchSession::resolve_root(&requested).ok_or_else(|| {
        StatusWatchError::InvalidArgument(format!(
            "{} is not a directory",
            requested.display()
        ))
    })
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StatusWatchError::from)
}

fn handle_status(args: StatusArgs, root: &Path) -> Result<()> {
    let raw = GitBackend.status(root)?;
    let snapshot = StatusSnapshot::from_entries(Some(root.to_path_buf()), 1, classify_all(&raw));
    print_snapshot(&snapshot, args.json)
}

fn handle_watch(args: WatchArgs, root: &Path, mut config: WatchConfig) -> Result<()> {
    if let Some(ms) = args.quiet_period {
        config.quiet_period_ms = ms;
    }
    config.validate()?;

    runtime()?.block_on(async move {
        let sync = StatusSync::with_git(config)?;
        let mut snapshots = sync.subscribe();
        let mut notifications = sync.notifications();
        sync.set_root(root)?;
        sync.wait_idle().await;

        if !args.json {
            output::info(&format!("watching {} (ctrl-c to stop)", root.display()));
        }
        let mut last = snapshots.borrow_and_update().clone();
        print_snapshot(&last, args.json)?;
        drain_notifications(&mut notifications);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    log::info!("received shutdown signal");
                    break;
                }
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = snapshots.borrow_and_update().clone();
                    if !current.same_entries(&last) {
                        print_snapshot(&current, args.json)?;
                    }
                    last = current;
                }
                received = notifications.recv() => match received {
                    Ok(notification) => output::notification(&notification),
                    Err(RecvError::Lagged(skipped)) => {
                        output::warn(&format!("{skipped} notification(s) dropped"));
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        sync.clear_root();
        Ok::<(), StatusWatchError>(())
    })
}

fn handle_mutation(args: PathArgs, root: &Path, config: WatchConfig, op: MutationOp) -> Result<()> {
    runtime()?.block_on(async move {
        let sync = StatusSync::with_git(config)?;
        let mut notifications = sync.notifications();
        sync.set_root(root)?;
        if sync.session_state() != SessionState::Active {
            return Err(StatusWatchError::InvalidArgument(format!(
                "{} cannot be watched",
                root.display()
            )));
        }
        sync.wait_idle().await;

        for path in &args.paths {
            match op {
                MutationOp::Stage => sync.stage(path).await?,
                MutationOp::Unstage => sync.unstage(path).await?,
            };
        }
        sync.wait_idle().await;

        // Mutation failures are returned above; only refresh failures remain.
        drain_notifications(&mut notifications);
        let snapshot = sync.snapshot();
        sync.clear_root();
        print_snapshot(&snapshot, args.json)
    })
}

fn drain_notifications(notifications: &mut Receiver<Notification>) {
    loop {
        match notifications.try_recv() {
            Ok(notification) => output::notification(&notification),
            Err(TryRecvError::Lagged(skipped)) => {
                output::warn(&format!("{skipped} notification(s) dropped"));
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return,
        }
    }
}

fn print_snapshot(snapshot: &StatusSnapshot, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(snapshot)
            .map_err(|err| StatusWatchError::Other(anyhow::Error::new(err)))?;
        println!("{}", line);
    } else {
        output::print_snapshot(snapshot);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Commands};

    #[test]
    fn parses_global_flags_and_watch_options() {
        let cli = Cli::try_parse_from([
            "statuswatch",
            "-C",
            "/repo",
            "-vv",
            "watch",
            "--quiet-period",
            "250",
            "--json",
        ])
        .expect("parse watch");
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.root.as_deref(), Some(std::path::Path::new("/repo")));
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.quiet_period, Some(250));
                assert!(args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn stage_requires_a_path() {
        assert!(Cli::try_parse_from(["statuswatch", "stage"]).is_err());
        let cli = Cli::try_parse_from(["statuswatch", "unstage", "a.txt", "b.txt"])
            .expect("parse unstage");
        match cli.command {
            Commands::Unstage(args) => assert_eq!(args.paths, vec!["a.txt", "b.txt"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
