//! tableau-refresh CLI
//!
//! Entry point for the `tableau-refresh` command-line tool.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use tableau_refresh::config::{
    default_user_config_path, parse_sign_in_method, process_env_layer, set_path,
    EffectiveConfig, Settings,
};
use tableau_refresh::{
    run_refresh, run_resolve, run_status_check, ExitOutcome, HandleStore, JobId, PipelineError,
    RefreshOptions, ResourceKind, ResourceRef, RestServer, RunReport, SignInMethod, StatusOptions,
    SystemClock,
};

#[derive(Parser)]
#[command(name = "tableau-refresh")]
#[command(about = "Trigger Tableau extract refreshes and converge on their outcome", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a config file (layered over the user config)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Print the result as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Server URL (e.g. https://tableau.example.com)
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Site content URL ("default" for the default site)
    #[arg(long, global = true)]
    site: Option<String>,

    /// REST API version (discovered from the server when unset)
    #[arg(long, global = true)]
    api_version: Option<String>,

    /// Username or access token name
    #[arg(long, global = true)]
    username: Option<String>,

    /// Sign-in method (username_password, access_token)
    #[arg(long, global = true, value_parser = parse_sign_in_method)]
    sign_in_method: Option<SignInMethod>,

    /// Artifacts root for the persisted job handle
    #[arg(long, global = true)]
    artifacts_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a resource, trigger its refresh and wait for the result
    Refresh {
        #[command(flatten)]
        target: TargetArgs,

        /// Wait for the job to finish (false: trigger, save the handle and exit)
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        check_status: bool,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Check on a previously triggered job
    Status {
        /// Job id (default: the persisted handle)
        #[arg(long)]
        job_id: Option<String>,

        /// Wait for the job to finish instead of checking once
        #[arg(long)]
        wait: bool,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Print the id of a resource
    Resolve {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the effective configuration (secrets redacted)
    Config,
}

#[derive(clap::Args)]
struct TargetArgs {
    /// Resource kind
    #[arg(long, value_enum)]
    kind: KindArg,

    /// Project containing the resource (or its workbook)
    #[arg(long)]
    project: String,

    /// Owning workbook (views only)
    #[arg(long)]
    workbook: Option<String>,

    /// Resource name (exact, case-sensitive)
    #[arg(long)]
    name: String,
}

#[derive(clap::Args)]
struct PollArgs {
    /// Seconds between status queries
    #[arg(long)]
    interval: Option<u64>,

    /// Seconds to wait before giving up (0 = no limit)
    #[arg(long)]
    max_wait: Option<u64>,

    /// Consecutive failed status queries tolerated
    #[arg(long)]
    failure_streak: Option<u32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Datasource,
    Workbook,
    View,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Datasource => ResourceKind::Datasource,
            KindArg::Workbook => ResourceKind::Workbook,
            KindArg::View => ResourceKind::View,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl TargetArgs {
    fn to_ref(&self) -> ResourceRef {
        ResourceRef {
            kind: self.kind.into(),
            project_name: self.project.clone(),
            container_name: self.workbook.clone(),
            name: self.name.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    let outcome = run(&cli);
    process::exit(outcome.as_i32());
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn run(cli: &Cli) -> ExitOutcome {
    let effective = match load_config(cli) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            eprintln!("Error: {}", e);
            return e.outcome();
        }
    };
    tracing::debug!(
        config = %effective.config,
        sources = effective.sources.len(),
        "effective configuration"
    );

    if let Commands::Config = cli.command {
        return match effective.to_json() {
            Ok(json) => {
                println!("{}", json);
                ExitOutcome::Success
            }
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                ExitOutcome::UnknownError
            }
        };
    }

    match execute(cli, effective.settings()) {
        Ok(Some(report)) => {
            print_report(&report, cli.json);
            report.outcome
        }
        Ok(None) => ExitOutcome::Success,
        Err(e) => {
            tracing::error!(error = %e, outcome = %e.outcome(), "run failed");
            eprintln!("Error: {}", e);
            if cli.json {
                print_report(&RunReport::from_error(&e), true);
            }
            e.outcome()
        }
    }
}

/// Run a server command; `None` when the command printed its own output
fn execute(cli: &Cli, settings: &Settings) -> Result<Option<RunReport>, PipelineError> {
    let credentials = settings.credentials()?;
    let server = RestServer::new(settings.rest_config()?)?;
    let store = HandleStore::new(&settings.artifacts.root);
    let policy = settings.poll_policy();
    let clock = SystemClock;

    match &cli.command {
        Commands::Refresh {
            target,
            check_status,
            ..
        } => {
            let options = RefreshOptions {
                target: target.to_ref(),
                check_status: *check_status,
                policy,
            };
            run_refresh(&server, &credentials, &options, &store, &clock).map(Some)
        }
        Commands::Status { job_id, wait, .. } => {
            let options = StatusOptions {
                job_id: job_id.as_deref().map(JobId::new),
                wait: *wait,
                policy,
            };
            run_status_check(&server, &credentials, &options, &store, &clock).map(Some)
        }
        Commands::Resolve { target } => {
            let found = run_resolve(&server, &credentials, &target.to_ref())?;
            if cli.json {
                match serde_json::to_string_pretty(&found) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Error serializing output: {}", e),
                }
            } else {
                println!("{}", found.id);
            }
            Ok(None)
        }
        Commands::Config => Ok(None),
    }
}

fn load_config(cli: &Cli) -> Result<EffectiveConfig, tableau_refresh::config::ConfigError> {
    let user_path = default_user_config_path();
    EffectiveConfig::build(
        user_path.as_deref(),
        cli.config.as_deref(),
        process_env_layer(),
        Some(cli_layer(cli)),
    )
}

/// Config layer built from command-line flags
fn cli_layer(cli: &Cli) -> Value {
    let mut layer = json!({});

    let strings = [
        ("server.url", &cli.server_url),
        ("server.site", &cli.site),
        ("server.api_version", &cli.api_version),
        ("auth.username", &cli.username),
    ];
    for (key, value) in strings {
        if let Some(v) = value {
            set_path(&mut layer, key, json!(v));
        }
    }
    if let Some(method) = cli.sign_in_method {
        set_path(&mut layer, "auth.method", json!(method.as_str()));
    }
    if let Some(ref dir) = cli.artifacts_dir {
        set_path(&mut layer, "artifacts.root", json!(dir.to_string_lossy()));
    }

    let poll = match &cli.command {
        Commands::Refresh { poll, .. } | Commands::Status { poll, .. } => Some(poll),
        _ => None,
    };
    if let Some(poll) = poll {
        if let Some(v) = poll.interval {
            set_path(&mut layer, "poll.interval_seconds", json!(v));
        }
        if let Some(v) = poll.max_wait {
            set_path(&mut layer, "poll.max_wait_seconds", json!(v));
        }
        if let Some(v) = poll.failure_streak {
            set_path(&mut layer, "poll.failure_streak", json!(v));
        }
    }

    layer
}

fn print_report(report: &RunReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Error serializing output: {}", e),
        }
        return;
    }

    let Some(ref job_id) = report.job_id else {
        return;
    };
    let progress = report.progress.as_deref().unwrap_or("-");
    println!(
        "{} (exit {}) job {} progress {}",
        report.outcome, report.exit_code, job_id, progress
    );
}
