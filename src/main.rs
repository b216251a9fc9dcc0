use anyhow::{Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand};
use stampcam::platform::simulated::{SimulatedLocation, SimulatedPlatform};
use stampcam::platform::{LocalMediaLibrary, Platform};
use stampcam::settings::{CameraMode, Theme, TimestampFormat, VideoResolution};
use stampcam::{
    format_duration, format_location, maps_url, AppContext, LifecycleEvent, LocationData,
    PermissionKind, PermissionStatus, ScreenLifecycle, SessionEvent, SessionState,
    SettingsPatch, StampcamConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "stampcam")]
#[command(about = "Camera capture core with date, time and location overlay")]
#[command(version)]
#[command(long_about = "Manages capture preferences and the local media library of the \
stampcam camera core, and can drive a full capture session against a simulated device.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "stampcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Override the data directory from the configuration
    #[arg(long, value_name = "DIR")]
    data_dir: Option<String>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to daily files in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show or change capture preferences
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Browse and clean up saved media
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },
    /// Run a capture session against the simulated device
    Simulate(SimulateArgs),
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the current settings as JSON
    Show,
    /// Change one or more settings
    Set {
        #[arg(long)]
        theme: Option<Theme>,
        #[arg(long)]
        default_mode: Option<CameraMode>,
        #[arg(long)]
        resolution: Option<VideoResolution>,
        /// 12h or 24h
        #[arg(long)]
        timestamp_format: Option<TimestampFormat>,
        /// IANA zone name or "device"
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        location_tagging: Option<bool>,
        /// 0 keeps media forever
        #[arg(long)]
        auto_delete_days: Option<u32>,
    },
    /// Restore defaults
    Reset,
}

#[derive(Subcommand, Debug)]
enum LibraryAction {
    /// List saved videos
    List {
        /// Include photos
        #[arg(long)]
        all: bool,
    },
    /// Delete a saved capture by id
    Delete { id: String },
    /// Remove media older than the auto-delete setting
    Prune {
        /// Override the configured number of days
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// Photos to take once the camera is ready
    #[arg(long, default_value_t = 1)]
    photos: u32,

    /// Length of the recorded video in seconds (0 skips recording)
    #[arg(long, default_value_t = 3)]
    record_seconds: u64,

    /// Simulated position
    #[arg(long, requires = "longitude", allow_hyphen_values = true)]
    latitude: Option<f64>,

    #[arg(long, requires = "latitude", allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Answer the camera permission prompt with "deny"
    #[arg(long)]
    deny_camera: bool,

    /// Answer the microphone permission prompt with "deny"
    #[arg(long)]
    deny_microphone: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("# Stampcam configuration file");
        print!("{}", StampcamConfig::default().to_toml()?);
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    let mut config = StampcamConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;
    if let Some(data_dir) = &args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Settings { action } => run_settings(config, action).await,
        Command::Library { action } => run_library(config, action).await,
        Command::Simulate(opts) => run_simulate(config, opts).await,
    }
}

/// Simulated device services with real file removal for `file://` media
fn host_platform(sim: &SimulatedPlatform) -> Platform {
    Platform {
        media_library: Arc::new(LocalMediaLibrary::new()),
        ..sim.platform()
    }
}

async fn run_settings(mut config: StampcamConfig, action: SettingsAction) -> Result<()> {
    config.library.prune_on_startup = false;
    let context = AppContext::initialize(config, host_platform(&SimulatedPlatform::new())).await?;
    let store = context.settings();

    let settings = match action {
        SettingsAction::Show => store.get(),
        SettingsAction::Set {
            theme,
            default_mode,
            resolution,
            timestamp_format,
            timezone,
            location_tagging,
            auto_delete_days,
        } => {
            let patch = SettingsPatch {
                theme,
                default_mode,
                video_resolution: resolution,
                timestamp_format,
                timezone,
                location_tagging,
                auto_delete_days,
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to change; pass at least one setting");
            }
            store.update(patch).await
        }
        SettingsAction::Reset => store.reset().await,
    };

    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

async fn run_library(mut config: StampcamConfig, action: LibraryAction) -> Result<()> {
    config.library.prune_on_startup = false;
    let context = AppContext::initialize(config, host_platform(&SimulatedPlatform::new())).await?;
    let library = context.library();

    match action {
        LibraryAction::List { all } => {
            let media = if all {
                library.all_media().await
            } else {
                library.videos().await
            };
            if media.is_empty() {
                println!("No videos saved yet");
            }
            for item in media {
                let place = item
                    .address
                    .clone()
                    .unwrap_or_else(|| format_location(item.location.as_ref()));
                println!(
                    "{:<15} {:<5} {:>6}  {} {}  {}  {}",
                    item.id,
                    item.media_type,
                    format_duration(item.duration),
                    item.date,
                    item.time,
                    item.resolution,
                    place
                );
                if let Some(location) = &item.location {
                    println!("{:<15} {}", "", maps_url(location));
                }
            }
        }
        LibraryAction::Delete { id } => {
            if library.delete(&id).await? {
                println!("Deleted {}", id);
            } else {
                println!("No media with id {}", id);
            }
        }
        LibraryAction::Prune { days } => {
            let days = days.unwrap_or_else(|| context.settings().get().auto_delete_days);
            let report = library.prune_expired(days, Utc::now()).await?;
            println!(
                "Removed {} records ({} files)",
                report.records_deleted, report.assets_removed
            );
            for problem in report.errors {
                println!("  {}", problem);
            }
        }
    }
    Ok(())
}

async fn run_simulate(config: StampcamConfig, opts: SimulateArgs) -> Result<()> {
    let mut location = SimulatedLocation::new();
    if let (Some(latitude), Some(longitude)) = (opts.latitude, opts.longitude) {
        location = location.with_fix(LocationData::new(latitude, longitude));
    }
    let sim = SimulatedPlatform::new().with_location(location);
    if opts.deny_camera {
        sim.permissions
            .set(PermissionKind::Camera, PermissionStatus::Denied);
    }
    if opts.deny_microphone {
        sim.permissions
            .set(PermissionKind::Microphone, PermissionStatus::Denied);
    }

    let context = AppContext::initialize(config, host_platform(&sim)).await?;
    let mut events = context.event_bus().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::ClockTick { .. }) => {}
                Ok(event) => println!("  · {}", event.description()),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let session = context.new_session()?;
    let mut lifecycle = ScreenLifecycle::new(session.clone());
    if lifecycle.handle(LifecycleEvent::Focus).await == SessionState::Opening {
        session.camera_ready();
    }

    if session.state() == SessionState::Ready {
        for _ in 0..opts.photos {
            match session.take_photo().await {
                Ok(photo) => println!("Photo {} saved at {} {}", photo.id, photo.date, photo.time),
                Err(e) if e.is_recoverable() => println!("Photo failed: {}", e.user_message()),
                Err(e) => {
                    error!("Giving up on photos: {}", e);
                    break;
                }
            }
        }

        if opts.record_seconds > 0 {
            match session.start_recording().await {
                Ok(()) => {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(opts.record_seconds)) => {}
                        _ = tokio::signal::ctrl_c() => info!("Interrupted, stopping the recording"),
                    }
                    match session.stop_recording().await {
                        Ok(Some(video)) => println!(
                            "Video {} saved ({})",
                            video.id,
                            format_duration(video.duration)
                        ),
                        Ok(None) => println!("Recording discarded"),
                        Err(e) => println!("Recording failed: {}", e.user_message()),
                    }
                }
                Err(e) if e.is_recoverable() => {
                    println!("Recording unavailable: {}", e.user_message())
                }
                Err(e) => error!("Recording aborted: {}", e),
            }
        }
    }

    let snapshot = session.snapshot();
    println!("Session state: {}", snapshot.state);
    if let Some(notice) = snapshot.notice {
        println!("Notice: {}", notice.message);
    }
    if let Some(address) = snapshot.overlay.address {
        println!("Overlay location: {}", address);
    }

    lifecycle.handle(LifecycleEvent::Blur).await;
    let exit_code = context.shutdown().await;
    printer.abort();

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stampcam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "stampcam.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}
