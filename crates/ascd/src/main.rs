use asc_core::config::{load_config, ConfigError, DEFAULT_CONFIG_FILE};
use asc_core::env::{load_env_file, present_api_keys, EnvFileError, DEFAULT_ENV_FILE, KNOWN_API_KEYS};
use asc_core::templates::{write_template, ConfigTemplate};
use asc_core::validation::{has_errors, ValidationIssue, ValidationLevel, SERVICE_PROCESS_NAME};
use asc_notify::{ChannelSink, NotificationDispatcher, StdoutSink, TracingSink};
use asc_process::{resolve_state_dir, ProcessError, ProcessSupervisor, SupervisorConfig};
use asc_tui::{run_tui, AgentRow, TuiApp, TuiError, TuiEvent, DEFAULT_TICK_RATE};
use ascd::{
    cleanup_logs, init_logging, install_termination_flag, service_state, start_service,
    stop_service, wait_for_termination, ConfigWatcher, LogTarget, LoggingError,
    ReconciliationEngine, ReloadWorker, ServiceStart, ServiceState, ServiceStop, StatusPoller,
    WatchError, WatchOptions, WorkerError, DEFAULT_LOG_RETENTION_DAYS, DEFAULT_POLL_INTERVAL,
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "asc", version, about = "Run and supervise a stack of coding agents")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Start the service and every agent, then watch the config for changes.
    Up(UpArgs),
    /// Stop every process recorded by a previous `asc up`.
    Down,
    /// Show recorded processes.
    Status,
    /// Validate the config and .env without starting anything.
    Check(CheckArgs),
    /// Write a starter asc.toml.
    Init(InitArgs),
    /// Remove old log files from the log directory.
    Cleanup(CleanupArgs),
    /// Manage the mcp_agent_mail service without touching agents.
    Services {
        #[command(subcommand)]
        command: ServicesCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ServicesCommand {
    /// Start mcp_agent_mail in the background.
    Start(ServiceStartArgs),
    /// Stop mcp_agent_mail.
    Stop,
    /// Report whether mcp_agent_mail is running.
    Status,
}

#[derive(Debug, Args)]
struct UpArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env: PathBuf,
    /// Print notifications to stdout instead of running the dashboard.
    #[arg(long)]
    headless: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env: PathBuf,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, default_value_t = ConfigTemplate::Team)]
    template: ConfigTemplate,
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    path: PathBuf,
    /// Overwrite an existing file.
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct CleanupArgs {
    /// Remove logs last written more than this many days ago.
    #[arg(long, default_value_t = DEFAULT_LOG_RETENTION_DAYS)]
    days: u32,
    /// List what would be removed without removing it.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct ServiceStartArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env: PathBuf,
}

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    EnvFile(#[from] EnvFileError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("failed to start {name}: {source}")]
    Service {
        name: &'static str,
        #[source]
        source: ProcessError,
    },
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Tui(#[from] TuiError),
    #[error("failed to install signal handlers: {source}")]
    Signal {
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn status poller: {source}")]
    Poller {
        #[source]
        source: std::io::Error,
    },
    #[error("config check found {errors} error(s)")]
    CheckFailed { errors: usize },
    #[error("{failures} process(es) failed to stop")]
    StopFailed { failures: usize },
    #[error("{failures} log file(s) could not be removed")]
    CleanupFailed { failures: usize },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("asc: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), MainError> {
    let cli = Cli::parse();
    match cli.command {
        CliCommand::Up(args) => run_up(args),
        CliCommand::Down => run_down(),
        CliCommand::Status => run_status(),
        CliCommand::Check(args) => run_check(args),
        CliCommand::Init(args) => run_init(args),
        CliCommand::Cleanup(args) => run_cleanup(args),
        CliCommand::Services { command } => run_services(command),
    }
}

fn run_up(args: UpArgs) -> Result<(), MainError> {
    let state_dir = resolve_state_dir()?;
    let supervisor_config = SupervisorConfig::under(&state_dir);
    let log_target = if args.headless {
        LogTarget::Stderr
    } else {
        LogTarget::File {
            dir: supervisor_config.log_dir.clone(),
        }
    };
    let _log_guard = init_logging(&log_target, "info")?;
    // Installed before anything is spawned so no signal can leave orphans.
    let terminate = install_termination_flag().map_err(|source| MainError::Signal { source })?;

    let loaded = load_config(&args.config)?;
    print_issues(&loaded.warnings);
    let config = loaded.config;
    let base_env = load_base_env(&args.env)?;

    let supervisor = Arc::new(ProcessSupervisor::new(supervisor_config));
    for name in supervisor.prune()? {
        info!(agent = %name, "removed stale record from a previous run");
    }
    start_service(&supervisor, &config.services, &base_env).map_err(|source| {
        MainError::Service {
            name: SERVICE_PROCESS_NAME,
            source,
        }
    })?;

    let (engine, launched) =
        ReconciliationEngine::launch(config, Arc::clone(&supervisor), base_env);
    info!(started = launched.added.len(), "agents launched");
    for (name, error) in &launched.errors {
        warn!(agent = %name, error = %error, "agent failed to launch");
    }

    let (tui_tx, tui_rx) = mpsc::channel::<TuiEvent>();
    let mut dispatcher = NotificationDispatcher::new(vec![Box::new(TracingSink)]);
    if args.headless {
        dispatcher.push(Box::new(StdoutSink));
    } else {
        dispatcher.push(Box::new(ChannelSink::new(tui_tx.clone())));
    }

    let worker = ReloadWorker::spawn(engine, dispatcher)?;
    let watcher = ConfigWatcher::spawn(&args.config, WatchOptions::default(), worker.sender())?;

    let front_end = if args.headless {
        drop(tui_tx);
        println!("asc running headless; press Ctrl-C to stop");
        wait_for_termination(&terminate, Duration::from_millis(100));
        Ok(())
    } else {
        run_dashboard(&args.config, &supervisor, tui_tx, &tui_rx, &terminate)
    };
    info!("stopping agents");

    watcher.stop();
    let failures = worker.shutdown();
    drop(tui_rx);
    report_stop_failures(&failures);
    front_end?;
    if failures.is_empty() {
        Ok(())
    } else {
        Err(MainError::StopFailed {
            failures: failures.len(),
        })
    }
}

fn run_dashboard(
    config_path: &Path,
    supervisor: &Arc<ProcessSupervisor>,
    tui_tx: mpsc::Sender<TuiEvent>,
    tui_rx: &mpsc::Receiver<TuiEvent>,
    terminate: &AtomicBool,
) -> Result<(), MainError> {
    let poller = StatusPoller::spawn(Arc::clone(supervisor), DEFAULT_POLL_INTERVAL, tui_tx)
        .map_err(|source| MainError::Poller { source })?;
    let mut app = TuiApp::new(config_path.display().to_string());
    let result = run_tui(&mut app, tui_rx, DEFAULT_TICK_RATE, terminate);
    poller.stop();
    result.map_err(MainError::from)
}

fn run_down() -> Result<(), MainError> {
    let _log_guard = init_logging(&LogTarget::Stderr, "warn")?;
    let supervisor = ProcessSupervisor::new(SupervisorConfig::under(&resolve_state_dir()?));
    let recorded = supervisor.list()?.len();
    let failures = supervisor.stop_all();
    report_stop_failures(&failures);
    println!(
        "stopped {} of {recorded} recorded process(es)",
        recorded.saturating_sub(failures.len())
    );
    if failures.is_empty() {
        Ok(())
    } else {
        Err(MainError::StopFailed {
            failures: failures.len(),
        })
    }
}

fn run_status() -> Result<(), MainError> {
    let _log_guard = init_logging(&LogTarget::Stderr, "warn")?;
    let supervisor = ProcessSupervisor::new(SupervisorConfig::under(&resolve_state_dir()?));
    supervisor.prune()?;
    let records = supervisor.list()?;
    if records.is_empty() {
        println!("no processes recorded");
        return Ok(());
    }

    let now = Utc::now();
    println!(
        "{:<20} {:>8} {:<8} {:>8}  LOG",
        "NAME", "PID", "STATUS", "UPTIME"
    );
    for record in &records {
        let row = AgentRow::from_record(record, supervisor.get_status(record.pid));
        println!(
            "{:<20} {:>8} {:<8} {:>8}  {}",
            row.name,
            row.pid,
            row.status.as_str(),
            row.uptime(now),
            record.log_file.display()
        );
    }
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), MainError> {
    let _log_guard = init_logging(&LogTarget::Stderr, "warn")?;
    let mut errors = 0;

    match load_config(&args.config) {
        Ok(loaded) => {
            print_issues(&loaded.warnings);
            println!(
                "{}: {} agent(s) configured",
                args.config.display(),
                loaded.config.agents.len()
            );
        }
        Err(ConfigError::Invalid { issues, .. }) => {
            print_issues(&issues);
            errors += issues
                .iter()
                .filter(|issue| issue.level == ValidationLevel::Error)
                .count();
        }
        Err(err) => {
            println!("error: {err}");
            errors += 1;
        }
    }

    if args.env.exists() {
        match load_env_file(&args.env) {
            Ok(vars) => {
                let keys = present_api_keys(&vars);
                if keys.is_empty() {
                    println!(
                        "warning: {} defines none of {}",
                        args.env.display(),
                        KNOWN_API_KEYS.join(", ")
                    );
                } else {
                    println!("{}: found {}", args.env.display(), keys.join(", "));
                }
            }
            Err(err) => {
                println!("error: {err}");
                errors += 1;
            }
        }
    } else {
        println!("warning: {} not found; agents get no API keys", args.env.display());
    }

    if errors > 0 {
        return Err(MainError::CheckFailed { errors });
    }
    println!("ok");
    Ok(())
}

fn run_init(args: InitArgs) -> Result<(), MainError> {
    write_template(&args.path, args.template, args.force)?;
    println!(
        "wrote {} ({} template: {})",
        args.path.display(),
        args.template,
        args.template.description()
    );
    Ok(())
}

fn run_cleanup(args: CleanupArgs) -> Result<(), MainError> {
    let _log_guard = init_logging(&LogTarget::Stderr, "warn")?;
    let supervisor = ProcessSupervisor::new(SupervisorConfig::under(&resolve_state_dir()?));
    let log_dir = supervisor.config().log_dir.display().to_string();
    let report = cleanup_logs(&supervisor, args.days, args.dry_run, SystemTime::now())?;

    if args.dry_run {
        println!(
            "would remove {} log(s) older than {} day(s) from {log_dir}",
            report.stale.len(),
            args.days
        );
        for path in &report.stale {
            println!("  {}", path.display());
        }
        return Ok(());
    }

    for err in &report.failures {
        eprintln!("asc: {err}");
    }
    println!(
        "removed {} log(s) older than {} day(s) from {log_dir}",
        report.removed(),
        args.days
    );
    if report.failures.is_empty() {
        Ok(())
    } else {
        Err(MainError::CleanupFailed {
            failures: report.failures.len(),
        })
    }
}

fn run_services(command: ServicesCommand) -> Result<(), MainError> {
    let _log_guard = init_logging(&LogTarget::Stderr, "warn")?;
    let supervisor = ProcessSupervisor::new(SupervisorConfig::under(&resolve_state_dir()?));
    match command {
        ServicesCommand::Start(args) => {
            let loaded = load_config(&args.config)?;
            print_issues(&loaded.warnings);
            let settings = loaded.config.services;
            let base_env = load_base_env(&args.env)?;
            let started = start_service(&supervisor, &settings, &base_env).map_err(|source| {
                MainError::Service {
                    name: SERVICE_PROCESS_NAME,
                    source,
                }
            })?;
            match started {
                ServiceStart::Started { pid } => {
                    println!("{SERVICE_PROCESS_NAME} started (pid {pid})")
                }
                ServiceStart::AlreadyRunning { pid } => {
                    println!("{SERVICE_PROCESS_NAME} is already running (pid {pid})")
                }
            }
            println!("  url: {}", settings.url);
            println!(
                "  log: {}",
                supervisor.log_path(SERVICE_PROCESS_NAME).display()
            );
        }
        ServicesCommand::Stop => match stop_service(&supervisor)? {
            ServiceStop::Stopped { pid } => println!("{SERVICE_PROCESS_NAME} stopped (pid {pid})"),
            ServiceStop::NotRunning => println!("{SERVICE_PROCESS_NAME} is not running"),
        },
        ServicesCommand::Status => match service_state(&supervisor)? {
            ServiceState::Running(record) => {
                println!("{SERVICE_PROCESS_NAME}: running (pid {})", record.pid);
                println!(
                    "  started: {}",
                    record.started_at.format("%Y-%m-%d %H:%M:%S")
                );
                println!("  log: {}", record.log_file.display());
            }
            ServiceState::Stopped => println!("{SERVICE_PROCESS_NAME}: stopped"),
            ServiceState::Stale(_) => {
                println!("{SERVICE_PROCESS_NAME}: stopped (stale pid record removed)")
            }
        },
    }
    Ok(())
}

fn load_base_env(path: &Path) -> Result<BTreeMap<String, String>, MainError> {
    if !path.exists() {
        warn!(path = %path.display(), "env file not found; agents get no API keys");
        return Ok(BTreeMap::new());
    }
    Ok(load_env_file(path)?)
}

fn print_issues(issues: &[ValidationIssue]) {
    for issue in issues {
        let level = match issue.level {
            ValidationLevel::Error => "error",
            ValidationLevel::Warning => "warning",
        };
        eprintln!("{level} [{}]: {}", issue.code, issue.message);
    }
    if has_errors(issues) {
        eprintln!("fix the errors above and try again");
    }
}

fn report_stop_failures(failures: &[ProcessError]) {
    for err in failures {
        match err.name() {
            Some(name) => eprintln!("asc: failed to stop {name}: {err}"),
            None => eprintln!("asc: stop failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, CliCommand, ServicesCommand};
    use asc_core::templates::ConfigTemplate;
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn up_defaults_to_local_config_and_env() {
        let cli = Cli::try_parse_from(["asc", "up"]).expect("parse up");
        match cli.command {
            CliCommand::Up(args) => {
                assert_eq!(args.config, PathBuf::from("asc.toml"));
                assert_eq!(args.env, PathBuf::from(".env"));
                assert!(!args.headless);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn init_parses_template_names() {
        let cli = Cli::try_parse_from(["asc", "init", "--template", "swarm", "--force"])
            .expect("parse init");
        match cli.command {
            CliCommand::Init(args) => {
                assert_eq!(args.template, ConfigTemplate::Swarm);
                assert!(args.force);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["asc", "init", "--template", "huge"]).is_err());
    }

    #[test]
    fn cleanup_defaults_to_thirty_days() {
        let cli = Cli::try_parse_from(["asc", "cleanup"]).expect("parse cleanup");
        match cli.command {
            CliCommand::Cleanup(args) => {
                assert_eq!(args.days, 30);
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
        let cli = Cli::try_parse_from(["asc", "cleanup", "--days", "7", "--dry-run"])
            .expect("parse cleanup flags");
        assert!(matches!(
            cli.command,
            CliCommand::Cleanup(ref args) if args.days == 7 && args.dry_run
        ));
    }

    #[test]
    fn services_subcommands_parse() {
        let cli = Cli::try_parse_from(["asc", "services", "start", "--config", "stack.toml"])
            .expect("parse services start");
        match cli.command {
            CliCommand::Services {
                command: ServicesCommand::Start(args),
            } => assert_eq!(args.config, PathBuf::from("stack.toml")),
            other => panic!("unexpected command {other:?}"),
        }
        for name in ["stop", "status"] {
            assert!(Cli::try_parse_from(["asc", "services", name]).is_ok());
        }
        assert!(Cli::try_parse_from(["asc", "services"]).is_err());
    }
}
