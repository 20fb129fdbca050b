//! wloc-spoof - report a chosen location to Wi-Fi positioning clients.
//!
//! Runs a local proxy that intercepts the location service, answers lookups
//! with the configured coordinates and tunnels everything else.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wloc_app::SpoofSettings;
use wloc_core::Coordinates;
use wloc_proxy::{
    generate_ca, start, CaManager, ProxyConfig, ProxyError, DEFAULT_PROXY_PORT, VERSION,
};

/// wloc-spoof - Wi-Fi location spoofing proxy
#[derive(Parser, Debug)]
#[command(name = "wloc-spoof", version, about)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the proxy until interrupted
    Run(RunArgs),
    /// Generate a new root CA and write it as PEM files
    GenerateCa {
        /// Output directory (defaults to the data directory)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Overwrite an existing CA
        #[arg(long)]
        force: bool,
    },
    /// Store the coordinates to report
    SetLocation {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Forget the stored coordinates
    ClearLocation,
    /// Print the version
    Version,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Latitude to report for this run
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    lat: Option<f64>,

    /// Longitude to report for this run
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lon: Option<f64>,

    /// Relay location traffic without rewriting it
    #[arg(long)]
    disable_spoofing: bool,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Directory holding the CA certificate and key
    #[arg(long)]
    ca_dir: Option<PathBuf>,

    /// Persist the coordinate and port overrides
    #[arg(long)]
    save: bool,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "wloc-spoof", "wloc-spoof").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if cli.debug { "debug" } else { &cli.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "wloc_spoof={0},wloc_app={0},wloc_proxy={0},wloc_core={0},warn",
            log_level
        ))
    });

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("wloc-spoof")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stderr))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::debug!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

fn settings_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(SpoofSettings::default_path()?),
    }
}

fn ca_manager(dir: Option<&PathBuf>) -> Result<CaManager> {
    match dir {
        Some(dir) => Ok(CaManager::new(dir)),
        None => Ok(CaManager::with_default_dir()?),
    }
}

async fn run(cli: &Cli, args: &RunArgs) -> Result<()> {
    let path = settings_path(cli)?;
    let mut settings = SpoofSettings::load(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        settings.set_coordinates(Coordinates::new(lat, lon)?);
    }
    if let Some(port) = args.port {
        settings.port = Some(port);
    }
    if args.save {
        settings.save(&path)?;
    }
    if args.disable_spoofing {
        settings.disabled = true;
    }

    if !settings.is_spoofing_enabled() {
        tracing::warn!("No spoof location configured, location traffic will pass through");
    }

    let ca = match ca_manager(args.ca_dir.as_ref())?.ensure_ca() {
        Ok(ca) => Some(ca),
        Err(e) => {
            tracing::error!("Failed to load CA: {}", e);
            None
        }
    };

    let mut config = ProxyConfig::new(settings.spoof_config())
        .with_port(settings.port.unwrap_or(DEFAULT_PROXY_PORT));
    if let Some(ca) = ca {
        config = config.with_ca(ca);
    }

    let handle = start(config).await.context("failed to start proxy")?;
    tracing::info!(
        "Proxy listening on {} ({}), press Ctrl-C to stop",
        handle.addr(),
        handle.mode()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");

    match handle.stop().await {
        Ok(()) => Ok(()),
        Err(ProxyError::ShutdownTimeout(deadline)) => {
            tracing::warn!("Connections still open after {:?} were closed", deadline);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn generate(out: Option<&PathBuf>, force: bool) -> Result<()> {
    let manager = ca_manager(out)?;
    if manager.ca_exists() && !force {
        bail!(
            "CA already exists at {} (use --force to replace it)",
            manager.cert_path().display()
        );
    }

    let material = generate_ca()?;
    manager.store(&material)?;

    println!("Certificate: {}", manager.cert_path().display());
    println!("Private key: {}", manager.key_path().display());
    Ok(())
}

fn update_location(cli: &Cli, coordinates: Option<Coordinates>) -> Result<()> {
    let path = settings_path(cli)?;
    let mut settings = SpoofSettings::load(&path)?;
    match coordinates {
        Some(coordinates) => {
            settings.set_coordinates(coordinates);
            println!("Spoof location set to {}", coordinates);
        }
        None => {
            settings.clear_coordinates();
            println!("Spoof location cleared");
        }
    }
    settings.save(&path)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli);

    match &cli.command {
        Command::Run(args) => run(&cli, args).await,
        Command::GenerateCa { out, force } => generate(out.as_ref(), *force),
        Command::SetLocation {
            latitude,
            longitude,
        } => update_location(&cli, Some(Coordinates::new(*latitude, *longitude)?)),
        Command::ClearLocation => update_location(&cli, None),
        Command::Version => {
            println!("wloc-spoof {}", VERSION);
            Ok(())
        }
    }
}
