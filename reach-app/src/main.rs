use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use reach_common::observability::{init_logging, LogConfig};
use reach_common::{ReachError, RunMode};
use reach_config::ReachConfig;
use reach_runtime::ReachRuntime;
use tracing::{error, info};

mod app;

/// Paced outreach automation for a single account.
#[derive(Debug, Parser)]
#[command(name = "reach", version, about)]
struct Cli {
    /// YAML configuration file; `reach.yaml` is read when present.
    #[arg(short, long, env = "REACH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured mode (discovery, invitation, demo, auth, messaging).
    #[arg(short, long)]
    mode: Option<RunMode>,

    /// Report the schedule verdict and today's budgets, then exit.
    #[arg(long)]
    dry_schedule: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match ReachConfig::load_validated(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Logging is configured from the file we failed to read.
            let err = ReachError::from(e);
            if let Some(line) = report_config_failure(&err, init_logging(LogConfig::default())) {
                eprintln!("{line}");
            }
            return exit_code(&err);
        }
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    let log_file = match init_logging(log_config(&config)) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("reach: cannot initialise logging: {e:#}");
            return ExitCode::from(1);
        }
    };
    info!(mode = %config.mode, log_file = %log_file.display(), "app.start");

    let runtime = match ReachRuntime::build("reach-worker", Some(2)) {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "runtime.build_failed");
            return ExitCode::from(1);
        }
    };
    let _ctrl_c = runtime.cancel_on_ctrl_c();
    let cancel = runtime.cancellation();

    let result = runtime.block_on(app::run(config, cli.dry_schedule, cancel));
    runtime.shutdown(Duration::from_secs(2));

    match result {
        Ok(()) => {
            info!("app.finish");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, code = err.exit_code(), "app.failed");
            exit_code(&err)
        }
    }
}

fn log_config(config: &ReachConfig) -> LogConfig {
    LogConfig {
        app_name: "reach",
        log_dir: config.logging.dir.clone(),
        emit_stderr: config.logging.stderr,
        format: config.logging.format,
        default_filter: config.logging.filter.clone(),
    }
}

/// Log a config failure, or return the stderr line when logging is down too.
fn report_config_failure<E: fmt::Display>(
    err: &ReachError,
    logging: Result<PathBuf, E>,
) -> Option<String> {
    match logging {
        Ok(_) => {
            error!(error = %err, "config.invalid");
            None
        }
        Err(log_err) => Some(format!("reach: {err} (logging unavailable: {log_err:#})")),
    }
}

fn exit_code(err: &ReachError) -> ExitCode {
    ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
}
