//! Core application runner for `eddystone-listener`.
//!
//! This module is decoupled from process setup (logging, exit codes) so the
//! whole pipeline can be driven by a fake scanner in tests.

use crate::detector::{Detector, DetectorConfig, EngineAction};
use crate::frame;
use crate::output::OutputFormatter;
use crate::output::influxdb::InfluxDbFormatter;
use crate::proximity::DEFAULT_REFERENCE_POWER;
use crate::registry::{BeaconTarget, Registry, RegistryError, builtin_targets};
use crate::scanner::{Advertisement, Backend, ScanError};
use crate::status::Status;
use clap::Parser;
use std::future::Future;
use std::io;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "eddystone_beacon")]
    pub influxdb_measurement: String,

    /// Add a beacon to the allow-list.
    /// Format: --beacon 00000000000000000001:000000000004=https://example.org/page
    #[arg(long = "beacon", value_parser = crate::registry::parse_beacon, value_name = "BEACON")]
    pub beacons: Vec<BeaconTarget>,

    /// Do not load the compiled-in beacon table.
    #[arg(long)]
    pub no_builtin_beacons: bool,

    /// How long a beacon stays detected without new advertisements.
    /// Accepts duration with suffix: 5s, 1m, 500ms, 2h.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, default_value = "5s", value_parser = crate::detector::parse_duration)]
    pub reset_after: Duration,

    /// Expected RSSI at one meter from the beacon, in dBm.
    #[arg(long, default_value_t = DEFAULT_REFERENCE_POWER, allow_negative_numbers = true)]
    pub reference_power: i16,

    /// Command run with the resource URL as its last argument when a beacon
    /// is seen for the first time, e.g. "xdg-open".
    #[arg(long, value_name = "CMD")]
    pub open_command: Option<String>,

    /// Verbose output, log ignored advertisements
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Bluetooth scanner backend to use
    #[arg(long, default_value_t, value_enum)]
    pub backend: Backend,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("beacon configuration: {0}")]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Scanner abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Scanner: Send + Sync {
    fn start_scan(
        &self,
        backend: Backend,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Advertisement>, ScanError>> + Send + '_>>;
}

/// Real scanner implementation that delegates to the compiled-in backends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealScanner;

impl Scanner for RealScanner {
    fn start_scan(
        &self,
        backend: Backend,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Advertisement>, ScanError>> + Send + '_>>
    {
        Box::pin(async move { crate::scanner::start_scan(backend).await })
    }
}

/// Build the allow-list from the compiled-in table and `--beacon` options.
///
/// # Errors
/// Fails if any entry is invalid or two entries share an identifier.
pub fn build_registry(options: &Options) -> Result<Registry, RegistryError> {
    let mut targets = if options.no_builtin_beacons {
        Vec::new()
    } else {
        builtin_targets()?
    };
    targets.extend(options.beacons.iter().cloned());
    Registry::new(targets)
}

fn write_status(
    formatter: &dyn OutputFormatter,
    status: &Status,
    out: &mut dyn Write,
) -> io::Result<()> {
    let line = formatter.format(status, SystemTime::now());
    writeln!(out, "{line}")
}

/// Build the process that opens `url`. The command string is split on
/// whitespace; the URL is appended as the last argument.
fn open_command(command: &str, url: &Url) -> Option<Command> {
    let mut parts = command.split_whitespace();
    let mut cmd = Command::new(parts.next()?);
    cmd.args(parts).arg(url.as_str());
    Some(cmd)
}

/// Spawn the open command for `url`. Failures are logged, never fatal.
///
/// Returns whether the process was started.
fn open_resource(command: &str, url: &Url) -> bool {
    let Some(mut cmd) = open_command(command, url) else {
        warn!("empty open command");
        return false;
    };
    match cmd.spawn() {
        Ok(_child) => {
            info!(%url, command, "opened resource");
            true
        }
        Err(e) => {
            warn!(%url, command, error = %e, "failed to run open command");
            false
        }
    }
}

/// Wait for the detector's reset deadline, or forever if none is pending.
async fn sleep_until_deadline(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Run the core processing loop, writing one formatted status line to `out`
/// for every status change.
///
/// Advertisements and the reset deadline are handled by this single task, so
/// detector updates never interleave. Returns when the scanner closes its
/// channel.
pub async fn run_with_io(
    options: Options,
    scanner: &dyn Scanner,
    out: &mut dyn Write,
) -> Result<(), RunError> {
    let registry = Arc::new(build_registry(&options)?);
    info!(beacons = registry.len(), "loaded beacon registry");

    let formatter = InfluxDbFormatter::new(options.influxdb_measurement.clone());
    let mut detector = Detector::new(
        registry,
        DetectorConfig {
            reset_after: options.reset_after,
            reference_power: options.reference_power,
        },
    );

    let mut advertisements = scanner.start_scan(options.backend).await?;

    loop {
        tokio::select! {
            biased;

            received = advertisements.recv() => {
                let Some(advertisement) = received else {
                    break;
                };

                if detector.expire(advertisement.received_at) {
                    write_status(&formatter, detector.status(), out)?;
                }

                let frame = frame::decode(&advertisement.service_data);
                let action = detector.observe(&frame, advertisement.rssi, advertisement.received_at);
                if action == EngineAction::NoMatch {
                    continue;
                }
                debug!(?action, rssi = advertisement.rssi, "matched advertisement");
                write_status(&formatter, detector.status(), out)?;

                if detector.take_trigger()
                    && let (Some(command), Some(url)) =
                        (options.open_command.as_deref(), &detector.status().resource_url)
                {
                    open_resource(command, url);
                }
            }

            () = sleep_until_deadline(detector.deadline()) => {
                if detector.expire(Instant::now().into_std()) {
                    write_status(&formatter, detector.status(), out)?;
                }
            }
        }
    }

    Ok(())
}
