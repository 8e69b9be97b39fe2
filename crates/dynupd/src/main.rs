// # dynupd - Dynamic DNS Update Daemon
//
// Thin integration layer over the dynup crates. The daemon is
// responsible for:
//
// 1. Parsing the command line and reading the configuration file
// 2. Initializing logging and the runtime
// 3. Taking the single-instance pid-file lock
// 4. Wiring an address source, the provider client, and the state
//    store into the reconciliation engine
//
// All reconciliation logic lives in dynup-core.
//
// ## Configuration
//
// One TOML file, passed with `--config`:
//
// ```toml
// hostname = "home.example.org"
// update_interval_secs = 300
// state_file = "/var/lib/dynup/last_addresses"
// pid_file = "/run/dynup.pid"
//
// [provider]
// api_url = "https://api.dreamhost.com/"
// api_key = "YOUR_API_KEY"
//
// [interfaces]
// AF_INET = "eth0"
// AF_INET6 = "eth0"
//
// [external]
// enabled = false
// url = "https://checkip.example.net/"
// ```
//
// ## Exit Codes
//
// - 0: clean shutdown
// - 1: unexpected runtime error
// - 2: configuration error (load, parse, validation, logging setup)
// - 5: provider API client could not be built
// - 6: pid file held by another instance or unwritable
// - 7: unknown address-family token in [interfaces]
// - 8: no usable local addresses
// - 9: external address lookup failed

use clap::Parser;
use dynup_addr_external::ExternalSource;
use dynup_addr_ifaces::InterfaceSource;
use dynup_core::{AddressSource, Error, FileStateStore, ReconcileEngine, Settings};
use dynup_provider_dreamhost::DreamhostStore;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Dynamic DNS update daemon
#[derive(Parser)]
#[command(name = "dynupd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single reconciliation cycle and exit
    #[arg(long)]
    oneshot: bool,
}

/// Exit codes for the distinct termination scenarios
///
/// Each startup failure gets its own code so service units and
/// monitoring can tell a bad key from a missing interface without
/// parsing logs.
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Unexpected runtime failure
    RuntimeError = 1,
    /// Configuration could not be loaded or validated
    ConfigError = 2,
    /// Provider API client could not be built
    ProviderSetupError = 5,
    /// Pid file held by another instance or unwritable
    PidFileError = 6,
    /// Unknown address-family token in the interface table
    AddressFamilyError = 7,
    /// No usable local addresses could be resolved
    NoAddresses = 8,
    /// External address lookup failed
    ExternalLookupError = 9,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl DaemonExitCode {
    /// Map a fatal engine error onto its exit code
    fn for_error(err: &Error) -> Self {
        match err {
            Error::Config(_) => Self::ConfigError,
            Error::ProviderSetup(_) => Self::ProviderSetupError,
            Error::InvalidAddressFamily(_) => Self::AddressFamilyError,
            Error::NoAddressesFound | Error::InterfaceUnavailable(_) => Self::NoAddresses,
            Error::ExternalAddressUnavailable(_) => Self::ExternalLookupError,
            _ => Self::RuntimeError,
        }
    }
}

/// Single-instance lock: a pid file created exclusively at startup
///
/// Holding the guard holds the lock; dropping it removes the file. An
/// existing file means another instance is running, or crashed without
/// cleanup, which an operator resolves by removing the file.
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Create the pid file, failing if it already exists
    fn acquire(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create_new(path)?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            error!("Failed to remove pid file {}: {}", self.path.display(), e);
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();

    // Logging first: every later failure gets reported through it
    if let Err(e) = init_tracing(&args.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let settings = match load_settings(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    info!("Starting dynupd for {}", settings.hostname);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(&args, settings)).into()
}

/// Install the global tracing subscriber
fn init_tracing(level: &str) -> anyhow::Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => anyhow::bail!(
            "'{}' is not a log level (trace, debug, info, warn, error)",
            other
        ),
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(())
}

/// Read, parse, and validate the configuration file
fn load_settings(path: &Path) -> Result<Settings, Error> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read {}: {}", path.display(), e)))?;

    let settings = Settings::from_toml_str(&content)?;
    settings.validate()?;

    Ok(settings)
}

/// Take the instance lock, then build and run the engine
async fn run_daemon(args: &Cli, settings: Settings) -> DaemonExitCode {
    let _pid_file = match PidFile::acquire(Path::new(&settings.pid_file)) {
        Ok(guard) => guard,
        Err(e) => {
            error!("Failed to acquire pid file {}: {}", settings.pid_file, e);
            return DaemonExitCode::PidFileError;
        }
    };

    match build_and_run(args, settings).await {
        Ok(()) => {
            info!("Shutdown complete");
            DaemonExitCode::CleanShutdown
        }
        Err(e) => {
            error!("{}", e);
            DaemonExitCode::for_error(&e)
        }
    }
}

/// Wire the configured components into an engine and run it
async fn build_and_run(args: &Cli, settings: Settings) -> dynup_core::Result<()> {
    let mut source: Box<dyn AddressSource> =
        Box::new(InterfaceSource::new(settings.interface_map()?)?);

    if settings.external.enabled {
        info!("External-IP mode: resolving the public IPv4 address");
        source = Box::new(ExternalSource::new(source, &settings.external.url).await?);
    }

    let store = Box::new(DreamhostStore::new(
        settings.provider.api_url.clone(),
        settings.provider.api_key.clone(),
    )?);

    let state_store = Box::new(FileStateStore::new(&settings.state_file).await?);

    let mut engine =
        ReconcileEngine::new(source, store, state_store, settings.hostname.clone()).await?;

    if args.oneshot {
        let outcome = engine.update_if_necessary().await?;
        info!("Single cycle finished: {:?}", outcome);
        return Ok(());
    }

    engine
        .run(Duration::from_secs(settings.update_interval_secs))
        .await
}
