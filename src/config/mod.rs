pub mod settings;

pub use settings::{FlowControl, Parity, SerialSettings, StopBits};

use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::indicator::LedConfig;
use crate::wireless::ServiceAdvertisement;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Low 96 bits of the Bluetooth base UUID (xxxxxxxx-0000-1000-8000-00805f9b34fb).
const BLUETOOTH_BASE_SUFFIX: u128 = 0x0000_1000_8000_0080_5f9b_34fb;
const SUFFIX_MASK: u128 = (1u128 << 96) - 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid baud rate: {0}")]
    InvalidBaudRate(u32),

    #[error("Invalid byte size: {0} (expected 5-8)")]
    InvalidByteSize(u8),

    #[error("Invalid parity: {0} (expected none, even, odd, mark or space)")]
    InvalidParity(String),

    #[error("Invalid stop bits: {0} (expected 1, 1.5 or 2)")]
    InvalidStopBits(String),

    #[error("Invalid flow control: {0} (expected none, xonxoff, rtscts or dsrdtr)")]
    InvalidFlowControl(String),

    #[error("Service UUID {0} is on the Bluetooth base UUID and reserved; use a random UUID")]
    ReservedUuid(Uuid),

    #[error("Invalid RFCOMM channel: {0} (expected 1-30)")]
    InvalidChannel(u8),

    #[error("No serial ports given")]
    NoPorts,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Reject UUIDs derived from the Bluetooth base UUID; those are assigned by
/// the Bluetooth SIG.
pub fn validate_service_uuid(uuid: Uuid) -> Result<Uuid> {
    if uuid.as_u128() & SUFFIX_MASK == BLUETOOTH_BASE_SUFFIX {
        return Err(ConfigError::ReservedUuid(uuid));
    }
    Ok(uuid)
}

/// Everything the bridge needs to run, built once at startup.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Candidate device paths, in priority order
    pub ports: Vec<PathBuf>,
    pub serial: SerialSettings,
    pub advertisement: ServiceAdvertisement,
    /// Minimum time between the starts of two session attempts
    pub retry_interval: Duration,
    /// `None` disables the status LED entirely
    pub led: Option<LedConfig>,
    pub init_adapter: bool,
    pub debug: bool,
}

impl BridgeConfig {
    pub fn new(
        ports: Vec<PathBuf>,
        serial: SerialSettings,
        advertisement: ServiceAdvertisement,
    ) -> Self {
        Self {
            ports,
            serial,
            advertisement,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            led: Some(LedConfig::default()),
            init_adapter: false,
            debug: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ports.is_empty() {
            return Err(ConfigError::NoPorts);
        }
        validate_service_uuid(self.advertisement.service_id)?;
        if !(1..=30).contains(&self.advertisement.channel) {
            return Err(ConfigError::InvalidChannel(self.advertisement.channel));
        }
        Ok(())
    }
}
