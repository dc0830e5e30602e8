//! Location Tracker CLI Application
//!
//! Command-line host for the location-tracker library. It stands in for the
//! platform around the service:
//! - Simulated location source (route replay)
//! - JSON preference file
//! - Console notification and permission prompts
//! - Start/stop/status commands and a scripted demo session

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use location_tracker::{
    DetachReason, JsonFileStore, KeyValueStore, LocationService, MemoryStore, NotificationAction,
    PermissionResult, PreferenceStore, ServiceLifecycleController, ServiceSnapshot,
    SimulatedProvider, StopOutcome, ToggleOutcome, TrackingClient,
};
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod console;

use config::AppConfig;
use console::{ConsoleGate, ConsolePresenter};

/// Location Tracker - while-in-use location tracking service host
#[derive(Parser, Debug)]
#[command(name = "location-tracker-cli")]
#[command(about = "Start, stop and inspect while-in-use location tracking", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Preference file (overrides [store] path from the config)
    #[arg(long, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the persisted tracking flag and last known position
    Status,
    /// Start tracking and keep the service running in the background
    Start {
        /// How long to keep the service alive
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Stop tracking and wait for the source to confirm
    Stop,
    /// Scripted session: attach, start, rotate, detach, cancel from notification
    Demo {
        /// Number of fixes to observe in each phase
        #[arg(long, default_value_t = 3)]
        fixes: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Location Tracker CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using tracker library v{}", location_tracker::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    if let Some(store) = &args.store {
        config.store.path = store.clone();
    }

    match args.command {
        Command::Status => status_mode(&config),
        Command::Start { seconds } => start_mode(&config, seconds).await,
        Command::Stop => stop_mode(&config).await,
        Command::Demo { fixes } => demo_mode(&config, fixes).await,
    }
}

type CliController<S> = ServiceLifecycleController<SimulatedProvider, S, ConsolePresenter>;

fn build_controller<S: KeyValueStore>(config: &AppConfig, store: S) -> CliController<S> {
    ServiceLifecycleController::new(
        SimulatedProvider::new(config.simulation.clone()),
        store,
        ConsolePresenter::new(),
        config.tracker_config(),
    )
}

fn open_store(config: &AppConfig) -> Result<JsonFileStore> {
    JsonFileStore::open(&config.store.path)
        .with_context(|| format!("Failed to open preference file: {:?}", config.store.path))
}

/// Restore persisted state; a failure here only means tracking stays off
fn restore<S: KeyValueStore>(controller: &mut CliController<S>) {
    match controller.restore() {
        Ok(true) => println!("↻ Tracking restored from preferences"),
        Ok(false) => {}
        Err(e) => {
            log::warn!("Could not restore tracking: {}", e);
            println!("✗ Could not restore tracking: {}", e);
        }
    }
}

/// Status mode - read the preference file, nothing is started
fn status_mode(config: &AppConfig) -> Result<()> {
    let prefs = PreferenceStore::new(open_store(config)?);

    println!("═══════════════════════════════════════════════");
    println!("  Location Tracker - Status");
    println!("═══════════════════════════════════════════════\n");

    println!("  Preferences: {:?}", config.store.path);
    println!(
        "  Tracking:    {}",
        if prefs.location_tracking() { "on" } else { "off" }
    );
    println!("  Location:    {}", prefs.current_location());
    if let Some((latitude, longitude)) = prefs.current_coordinates() {
        let position = location_tracker::Position::new(latitude, longitude, chrono::Utc::now());
        println!("  Map:         {}", position.map_url());
    }

    Ok(())
}

/// Start mode - tracking with no UI attached, so the notification is shown
async fn start_mode(config: &AppConfig, seconds: u64) -> Result<()> {
    println!("═══════════════════════════════════════════════");
    println!("  Location Tracker - Background Tracking");
    println!("═══════════════════════════════════════════════\n");

    let mut controller = build_controller(config, open_store(config)?);
    restore(&mut controller);
    let already_tracking = controller.is_subscribed();

    let (service, task) = LocationService::spawn(controller);

    if !already_tracking {
        if let Err(e) = service.start_tracking().await {
            if !e.is_permission_denied() {
                return Err(e.into());
            }
            println!("✗ Location permission denied, tracking stays off");
            service.shutdown().await?;
            task.await.context("Location service task failed")?;
            return Ok(());
        }
        println!("✓ Tracking started");
    }

    println!("  Running for {}s...\n", seconds);
    tokio::time::sleep(Duration::from_secs(seconds)).await;

    let snapshot = service.snapshot().await?;
    service.shutdown().await?;
    task.await.context("Location service task failed")?;

    println!();
    print_snapshot(&snapshot);
    println!("\n  Tracking stays enabled; run `stop` to end it.");
    Ok(())
}

/// Stop mode - restore whatever was persisted, then stop it
async fn stop_mode(config: &AppConfig) -> Result<()> {
    let mut controller = build_controller(config, open_store(config)?);
    restore(&mut controller);

    let (service, task) = LocationService::spawn(controller);
    let outcome = service.stop_tracking().await?;
    let snapshot = service.snapshot().await?;
    service.shutdown().await?;
    task.await.context("Location service task failed")?;

    match outcome {
        StopOutcome::Stopped => println!("✓ Location updates removed, tracking stopped"),
        StopOutcome::AlreadyStopped => println!("✓ Tracking was not running"),
        StopOutcome::CancellationFailed => {
            println!("⚠️  Location source did not confirm the cancellation; tracking stays on")
        }
    }
    print_snapshot(&snapshot);
    Ok(())
}

/// Demo mode - scripted UI session against an in-memory store
async fn demo_mode(config: &AppConfig, fixes: usize) -> Result<()> {
    println!("═══════════════════════════════════════════════");
    println!("  Location Tracker - Demo Session");
    println!("═══════════════════════════════════════════════\n");

    let controller = build_controller(config, MemoryStore::new());
    let (service, task) = LocationService::spawn(controller);
    let mut client = TrackingClient::new(
        service.clone(),
        ConsoleGate::new(config.simulation.permission_granted),
    );

    println!("📱 UI attached");
    let snapshot = client.connect().await?;
    println!("  Showing: {}\n", snapshot.location_text);

    let mut outcome = client.toggle().await;
    if let Ok(ToggleOutcome::PermissionRequested) = outcome {
        outcome = client.on_permission_result(PermissionResult::Denied).await;
    }
    match outcome {
        Ok(ToggleOutcome::Started) => println!("▶ Tracking started"),
        Ok(other) => {
            println!("✗ Tracking not started: {:?}", other);
            return finish(service, task).await;
        }
        Err(e) if e.is_permission_denied() => {
            println!("✗ Location permission lost: {}", e);
            return finish(service, task).await;
        }
        Err(e) => return Err(e.into()),
    }

    for _ in 0..fixes {
        match client.next_position().await {
            Some(position) => println!("  📍 UI received {}", position),
            None => {
                println!("  ⚠️  Location source ended the stream");
                return finish(service, task).await;
            }
        }
    }

    println!("\n🔄 Screen rotation");
    service.configuration_changed().await?;
    client.disconnect(DetachReason::ConfigurationChange).await?;
    client.connect().await?;
    println!("  (no notification while the UI comes straight back)");

    println!("\n📴 UI left the foreground");
    client.disconnect(DetachReason::Genuine).await?;
    let interval = config
        .simulation
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.request.interval());
    tokio::time::sleep(interval * fixes as u32).await;

    println!("\n✋ Cancel tapped on the notification");
    let outcome = service
        .notification_action(NotificationAction::Cancel)
        .await?;
    println!("  Outcome: {:?}", outcome);

    finish(service, task).await
}

async fn finish<S: KeyValueStore + 'static>(
    service: location_tracker::ServiceHandle,
    task: tokio::task::JoinHandle<CliController<S>>,
) -> Result<()> {
    let snapshot = service.snapshot().await?;
    service.shutdown().await?;
    task.await.context("Location service task failed")?;

    println!();
    print_snapshot(&snapshot);
    Ok(())
}

fn print_snapshot(snapshot: &ServiceSnapshot) {
    println!("📊 Service state:");
    println!("  Phase:         {}", snapshot.phase);
    println!("  Tracking:      {}", snapshot.tracking_enabled);
    println!("  Subscribed:    {}", snapshot.subscribed);
    println!("  Notification:  {}", snapshot.notification_visible);
    println!("  May tear down: {}", snapshot.teardown_allowed);
    println!("  Location:      {}", snapshot.location_text);
}

/// Map `-q` / `-v` flags to a log level
fn log_level(verbose: u8, quiet: bool) -> log::LevelFilter {
    use log::LevelFilter;

    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use std::io::Write;

    Builder::new()
        .filter_level(log_level(verbose, quiet))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
