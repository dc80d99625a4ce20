//! # Lumen Art-Net Controller Binary
//!
//! Discovers Art-Net nodes and streams a chase test pattern to the
//! configured universes, unicasting to subscribers where known.
//!
//! # Usage
//!
//! ```bash
//! # Defaults from /etc/lumen/artnet.toml
//! lumen_artnet
//!
//! # Specific interface, broadcast only, half level
//! lumen_artnet --interface eth1 --broadcast-only --master 128
//!
//! # Verbose JSON logging
//! lumen_artnet -c artnet.toml -v --json
//! ```

#![deny(warnings)]

use clap::Parser;
use lumen_artnet::config::AppConfig;
use lumen_artnet::pattern::Chase;
use lumen_artnet::{
    ArtNetController, MonotonicClock, NetworkInterface, PollTable, UdpTransport,
};
use lumen_common::consts::DEFAULT_CONFIG_PATH;
use lumen_common::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Level};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Receive loop idle time between ticks.
const IDLE: Duration = Duration::from_millis(1);

/// Lumen Art-Net controller
#[derive(Parser, Debug)]
#[command(name = "lumen_artnet")]
#[command(version)]
#[command(about = "Art-Net controller: node discovery, DMX fanout and synchronization")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Network interface to transmit on (overrides config)
    #[arg(short, long)]
    interface: Option<String>,

    /// Broadcast every frame instead of unicasting to subscribers
    #[arg(long)]
    broadcast_only: bool,

    /// Do not send ArtSync after each frame
    #[arg(long)]
    no_sync: bool,

    /// Master dimmer level, 0-255 (overrides config)
    #[arg(short, long)]
    master: Option<u8>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Art-Net controller failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Installed before the config is read so load errors are reported;
    // the configured level is applied once the file is parsed.
    let filter = setup_tracing(&args);

    info!("Lumen Art-Net v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load_or_default(&args.config)?;
    if let Err(e) = filter.reload(level_filter(&args, config.shared.log_level)) {
        warn!("Configured log level not applied: {e}");
    }

    apply_overrides(&args, &mut config);
    config.validate()?;

    let interface = NetworkInterface::resolve(config.artnet.interface.as_deref())?;
    let transport = UdpTransport::open(config.artnet.port, &interface)?;
    let directory = Box::new(PollTable::new(config.artnet.node_timeout_ms));

    let mut controller =
        ArtNetController::new(&config.artnet, transport, directory, MonotonicClock::new());
    for &universe in &config.output.universes {
        controller.register_universe(universe)?;
    }
    controller.set_trigger_handler(|key: u8, sub_key: u8, payload: &[u8]| {
        info!(key, sub_key, len = payload.len(), "Trigger received");
    });

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    info!("{} ({})\n{controller}", config.shared.service_name, interface.name);
    controller.start()?;

    stream(&mut controller, &config, &running);

    controller.blackout()?;
    controller.stop();

    info!("Lumen Art-Net shutdown complete");
    Ok(())
}

/// Stream the chase until `running` drops. Transport errors are logged and
/// the loop carries on with the next frame.
fn stream(
    controller: &mut ArtNetController<UdpTransport, Box<PollTable>, MonotonicClock>,
    config: &AppConfig,
    running: &AtomicBool,
) {
    let period = Duration::from_secs(1) / config.output.fps;
    let mut chase = Chase::new();
    let mut buffer = [0u8; DMX_UNIVERSE_SIZE];
    let mut next_frame = Instant::now();

    info!(
        universes = ?config.output.universes,
        fps = config.output.fps,
        "Streaming test pattern"
    );

    while running.load(Ordering::SeqCst) {
        if let Err(e) = controller.run_once() {
            warn!("Receive failed: {e}");
        }

        let now = Instant::now();
        if now >= next_frame {
            for &universe in &config.output.universes {
                chase.render(universe, &mut buffer);
                if let Err(e) = controller.send_dmx(universe, &buffer, config.output.port_index) {
                    warn!(universe, "ArtDmx send failed: {e}");
                }
            }
            if let Err(e) = controller.flush_sync() {
                warn!("ArtSync send failed: {e}");
            }
            chase.advance();

            next_frame += period;
            if next_frame < now {
                next_frame = now + period;
            }
        }

        std::thread::sleep(IDLE);
    }
}

/// Command-line flags win over the configuration file.
fn apply_overrides(args: &Args, config: &mut AppConfig) {
    if let Some(ref interface) = args.interface {
        config.artnet.interface = Some(interface.clone());
    }
    if args.broadcast_only {
        config.artnet.unicast = false;
    }
    if args.no_sync {
        config.artnet.synchronization = false;
    }
    if let Some(master) = args.master {
        config.artnet.master = master;
    }
}

/// Setup tracing subscriber based on CLI arguments. Returns the handle used
/// to apply the configured level later.
fn setup_tracing(args: &Args) -> reload::Handle<EnvFilter, Registry> {
    let (filter, handle) = reload::Layer::new(level_filter(args, LogLevel::default()));
    let registry = tracing_subscriber::registry().with(filter);

    if args.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
    handle
}

/// `-v` forces debug; otherwise the configured level applies.
fn level_filter(args: &Args, configured: LogLevel) -> EnvFilter {
    let configured = if args.verbose {
        LogLevel::Debug
    } else {
        configured
    };
    let level: Level = configured.as_directive().parse().unwrap_or(Level::INFO);

    EnvFilter::from_default_env().add_directive(level.into())
}
