//! Serial-to-Bluetooth bridge
//!
//! Waits for one of the given serial devices to appear, opens it and serves
//! it to a single Bluetooth peer as an RFCOMM serial port. When either side
//! goes away the session is torn down and the bridge waits again.
//!
//! # Usage
//!
//! ```bash
//! # Bridge a GPS receiver at 4800 8N1 (the defaults)
//! bt-serial-bridge -u 5e0b4a71-3c2f-4d9e-9b1a-2f6c8d7e0a13 /dev/ttyUSB0 /dev/ttyACM0
//!
//! # First run on a fresh Pi: make the adapter discoverable and pairable
//! bt-serial-bridge -i -d -r 115200 -u 5e0b4a71-3c2f-4d9e-9b1a-2f6c8d7e0a13 /dev/serial0
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use uuid::Uuid;

use bt_serial_bridge::config::{
    settings::{DEFAULT_BAUD_RATE, DEFAULT_BYTE_SIZE},
    BridgeConfig, FlowControl, Parity, SerialSettings, StopBits,
};
use bt_serial_bridge::indicator::{LedConfig, DEFAULT_LED_PATH, DEFAULT_TRIGGER};
use bt_serial_bridge::wireless::ServiceAdvertisement;

/// Serial-to-Bluetooth bridge
///
/// Exposes a local serial device to one Bluetooth peer at a time as an
/// RFCOMM serial port.
#[derive(Parser)]
#[command(name = "bt-serial-bridge")]
#[command(version)]
#[command(about = "Serial-to-Bluetooth RFCOMM bridge")]
struct Cli {
    /// Baud rate
    #[arg(short = 'r', long = "baud", default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Data bits per character (5-8)
    #[arg(short = 'b', long = "bits", default_value_t = DEFAULT_BYTE_SIZE)]
    bits: u8,

    /// Parity: none, even, odd, mark or space
    #[arg(short = 'p', long, default_value = "none")]
    parity: Parity,

    /// Stop bits: 1, 1.5 or 2
    #[arg(short = 's', long = "stop-bits", default_value = "1")]
    stop_bits: StopBits,

    /// Flow control: none, xonxoff, rtscts or dsrdtr
    #[arg(short = 'f', long = "flow-control", default_value = "none")]
    flow_control: FlowControl,

    /// Service UUID to advertise; generate a random one for your setup
    #[arg(short = 'u', long = "bt-uuid")]
    bt_uuid: Uuid,

    /// RFCOMM channel to serve on
    #[arg(short = 'c', long, default_value_t = 1)]
    channel: u8,

    /// Make the adapter discoverable and pairable before serving
    #[arg(short = 'i', long = "init-bt")]
    init_bt: bool,

    /// Debug logging, including every byte bridged
    #[arg(short = 'd', long)]
    debug: bool,

    /// Minimum time between session attempts, in milliseconds
    #[arg(long = "retry-interval-ms", default_value_t = 1000)]
    retry_interval_ms: u64,

    /// Sysfs directory of the status LED
    #[arg(long = "led-path", default_value = DEFAULT_LED_PATH)]
    led_path: PathBuf,

    /// Trigger to restore on the status LED at exit
    #[arg(long = "led-trigger", default_value = DEFAULT_TRIGGER)]
    led_trigger: String,

    /// Leave the status LED alone
    #[arg(long = "no-led")]
    no_led: bool,

    /// Serial devices to watch for, in priority order
    #[arg(required = true, value_name = "PORT")]
    ports: Vec<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<BridgeConfig> {
        let serial = SerialSettings::new(
            self.baud,
            self.bits,
            self.parity,
            self.stop_bits,
            self.flow_control,
        )?;
        let advertisement = ServiceAdvertisement::new(self.bt_uuid).with_channel(self.channel);

        let mut config = BridgeConfig::new(self.ports, serial, advertisement);
        config.retry_interval = Duration::from_millis(self.retry_interval_ms);
        config.led = (!self.no_led).then(|| LedConfig {
            path: self.led_path,
            default_trigger: self.led_trigger,
        });
        config.init_adapter = self.init_bt;
        config.debug = self.debug;
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stdout)
        .init();

    let config = cli.into_config()?;
    bt_serial_bridge::run(config).await
}
