//! DesktopStation HTTP bridge.
//!
//! Opens the controller on a serial port, powers the track, keeps the S88
//! sensor cache fresh and serves the HTTP API until Ctrl-C, then cuts track
//! power and closes the port.
//!
//! # Usage
//!
//! ```bash
//! # Linux
//! cargo run --features server --bin dcc_server -- /dev/ttyUSB0
//!
//! # Windows, two S88 devices, API on port 3000, more log output
//! RUST_LOG=rs_dcc=debug cargo run --features server --bin dcc_server -- COM3 --s88-devices 2 --http-port 3000
//! ```
//!
//! Without an argument the first serial port found is used.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use rs_dcc::hal::SerialTransport;
use rs_dcc::services::{run_server_until, WebServerConfig};
use rs_dcc::{Config, Power, SensorConfig, SerialConfig, Station, WebConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// DesktopStation HTTP bridge
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Serial port of the controller (first port found when omitted)
    port: Option<String>,

    /// HTTP listen port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// Number of S88 devices on the bus
    #[arg(long, default_value_t = 1)]
    s88_devices: usize,

    /// Sensor poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // =========================================================================
    // Configuration
    // =========================================================================
    let port = match args.port {
        Some(port) => port,
        None => {
            let ports = SerialTransport::available_ports().context("listing serial ports")?;
            match ports.into_iter().next() {
                Some(port) => port,
                None => bail!("no serial port given and none found"),
            }
        }
    };
    let config = Config::default()
        .with_serial(SerialConfig::default().with_port(&port))
        .with_sensors(
            SensorConfig::default()
                .with_device_count(args.s88_devices)
                .with_poll_interval_ms(args.poll_ms),
        )
        .with_web(WebConfig::default().with_port(args.http_port));
    let web_config = WebServerConfig::from_config(&config.web);

    // =========================================================================
    // Controller
    // =========================================================================
    let station = Arc::new(Station::new(SerialTransport::new(), config));
    {
        let station = Arc::clone(&station);
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            station
                .open_default()
                .with_context(|| format!("opening controller on {port}"))?;
            if !station.set_power(Power::On) {
                warn!("track power on not acknowledged");
            }
            station.start_polling_default()?;
            Ok(())
        })
        .await??;
    }

    // =========================================================================
    // HTTP API
    // =========================================================================
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler failed");
        }
        info!("shutdown requested");
    };
    run_server_until(Arc::clone(&station), web_config, shutdown).await?;

    tokio::task::spawn_blocking(move || station.stop()).await?;
    info!("station stopped");
    Ok(())
}
