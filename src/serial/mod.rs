pub mod interface;
#[cfg(target_os = "linux")]
mod termios;

pub use interface::SerialInterface;

use std::path::Path;

use async_trait::async_trait;

use crate::config::SerialSettings;

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Port is closed")]
    Closed,

    #[error("Unsupported setting: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;

/// Byte-level access to an open serial line, as used by the bridge loop.
#[async_trait]
pub trait SerialPortIO: Send {
    /// Wait until the port is readable, then read whatever is available.
    /// `Ok(0)` is not an error on its own; check [`SerialPortIO::is_open`].
    async fn read_data(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `data` and flush it to the device.
    async fn send_data(&mut self, data: &[u8]) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Opens serial handles for the session orchestrator.
#[async_trait]
pub trait SerialOpener: Send + Sync {
    type Port: SerialPortIO;

    async fn open(&self, path: &Path, settings: &SerialSettings) -> Result<Self::Port>;
}

/// Opens real devices through [`SerialInterface`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceOpener;

#[async_trait]
impl SerialOpener for DeviceOpener {
    type Port = SerialInterface;

    async fn open(&self, path: &Path, settings: &SerialSettings) -> Result<SerialInterface> {
        SerialInterface::open(path, settings)
    }
}
