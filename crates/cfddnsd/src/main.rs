// # cfddnsd - Cloudflare DDNS Daemon
//
// Thin integration layer: parses the command line, loads `config.json`,
// wires the Cloudflare client and the supervisor detector into a
// `Scheduler`, and translates signals into a shutdown token. All DNS logic
// lives in `cfddns-core`.
//
// ## Invocation
//
// ```bash
// cfddnsd                 # one cycle, then exit
// cfddnsd --repeat        # one cycle every 5 minutes until SIGTERM/SIGINT
// ```
//
// ## Environment
//
// - `CONFIG_PATH`: directory holding `config.json` (default: current directory)
// - `SUPERVISOR_TOKEN`: bearer token for the network-info endpoint
// - `SUPERVISOR_NETWORK_INFO_URL`: network-info endpoint override
// - `CFDDNS_LOG_LEVEL`: trace, debug, info, warn or error (default: info)

use anyhow::{Context, Result};
use cfddns_core::{CfddnsConfig, ReconciliationEngine, RunContext, RunMode, Scheduler};
use cfddns_ip_supervisor::{DEFAULT_NETWORK_INFO_URL, SupervisorDetector};
use cfddns_provider_cloudflare::CloudflareClient;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// File name looked up inside the configuration directory
const CONFIG_FILE_NAME: &str = "config.json";

/// Pause before exiting on a configuration error, so a supervised restart
/// loop does not spin
const CONFIG_ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CfddnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<CfddnsExitCode> for ExitCode {
    fn from(code: CfddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep Cloudflare A/AAAA records pointed at this host
#[derive(Debug, Parser)]
#[command(name = "cfddnsd", version)]
struct Cli {
    /// Keep running, refreshing records every 5 minutes
    #[arg(long)]
    repeat: bool,

    /// Directory containing config.json
    #[arg(long, env = "CONFIG_PATH", default_value = ".")]
    config_dir: PathBuf,

    /// Supervisor network-info endpoint
    #[arg(long, env = "SUPERVISOR_NETWORK_INFO_URL", default_value = DEFAULT_NETWORK_INFO_URL)]
    network_info_url: String,

    /// Bearer token for the network-info endpoint
    #[arg(long, env = "SUPERVISOR_TOKEN", hide_env_values = true)]
    supervisor_token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CFDDNS_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn mode(&self) -> RunMode {
        if self.repeat {
            RunMode::Repeat
        } else {
            RunMode::Once
        }
    }

    fn config_path(&self) -> PathBuf {
        config_path(&self.config_dir)
    }
}

fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Read and validate the configuration file
fn load_config(path: &Path) -> Result<CfddnsConfig> {
    CfddnsConfig::from_file(path)
        .with_context(|| format!("Error reading config file {}", path.display()))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return CfddnsExitCode::ConfigError.into();
        }
        Err(e) => {
            // --help / --version
            let _ = e.print();
            return CfddnsExitCode::CleanShutdown.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_log_level(&cli.log_level))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CfddnsExitCode::ConfigError.into();
    }

    let config = match load_config(&cli.config_path()) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            info!("Exiting in {:?}", CONFIG_ERROR_BACKOFF);
            std::thread::sleep(CONFIG_ERROR_BACKOFF);
            return CfddnsExitCode::ConfigError.into();
        }
    };

    info!("Starting cfddnsd");
    info!("Configuration loaded: {} zone(s)", config.zones.len());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CfddnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(&cli, &config).await {
            Ok(()) => CfddnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                CfddnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Wire the components together and run until done
async fn run_daemon(cli: &Cli, config: &CfddnsConfig) -> Result<()> {
    let provider = CloudflareClient::new().context("Failed to create Cloudflare client")?;
    let detector = SupervisorDetector::new(&cli.network_info_url, cli.supervisor_token.clone())
        .context("Failed to create address detector")?;

    let engine = ReconciliationEngine::new(Box::new(provider));
    let mut scheduler = Scheduler::new(engine, Box::new(detector), RunContext::from_config(config));

    let shutdown = CancellationToken::new();
    let mode = cli.mode();
    if mode == RunMode::Repeat {
        spawn_signal_listener(shutdown.clone())?;
    }

    let cycles = scheduler.run(mode, shutdown).await;
    info!("Stopped after {} cycle(s)", cycles);

    Ok(())
}

/// Cancel `shutdown` on SIGTERM or SIGINT
///
/// The scheduler finishes its in-flight cycle before observing the token.
#[cfg(unix)]
fn spawn_signal_listener(shutdown: CancellationToken) -> Result<()> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", name);
        shutdown.cancel();
    });

    Ok(())
}

/// Fallback for non-Unix platforms (CTRL-C only)
#[cfg(not(unix))]
fn spawn_signal_listener(shutdown: CancellationToken) -> Result<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal: CTRL-C");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to wait for CTRL-C: {}", e),
        }
    });

    Ok(())
}
