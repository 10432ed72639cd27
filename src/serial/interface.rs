use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

use super::{Result, SerialError, SerialPortIO};
use crate::config::{FlowControl, SerialSettings};

/// A configured, non-blocking serial connection scoped to one bridging
/// session. Dropping it closes the device.
pub struct SerialInterface {
    port: Option<SerialStream>,
    path: PathBuf,
    failed: bool,
}

impl SerialInterface {
    /// Open `path` with all line settings applied before returning.
    pub fn open(path: &Path, settings: &SerialSettings) -> Result<Self> {
        if settings.flow_control() == FlowControl::DsrDtr {
            log::warn!(
                "DSR/DTR flow control has no termios equivalent; opening {} without flow control",
                path.display()
            );
        }

        #[cfg(not(target_os = "linux"))]
        if settings.parity().is_sticky() {
            return Err(SerialError::Unsupported(format!("{} parity", settings.parity())));
        }

        let port = tokio_serial::new(path.to_string_lossy(), settings.baud_rate())
            .data_bits(settings.data_bits_setting())
            .parity(settings.parity_setting())
            .stop_bits(settings.stop_bits_setting())
            .flow_control(settings.flow_control_setting())
            .timeout(Duration::ZERO)
            .open_native_async()
            .map_err(|e| SerialError::ConnectionFailed(format!("{}: {}", path.display(), e)))?;

        #[cfg(target_os = "linux")]
        if settings.parity().is_sticky() {
            use std::os::unix::io::AsRawFd;
            super::termios::apply_sticky_parity(port.as_raw_fd(), settings.parity())?;
        }

        log::debug!("Opened {} ({})", path.display(), settings);
        Ok(Self {
            port: Some(port),
            path: path.to_path_buf(),
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes waiting in the input buffer.
    pub fn bytes_to_read(&self) -> Result<u32> {
        let port = self.port.as_ref().ok_or(SerialError::Closed)?;
        Ok(port.bytes_to_read()?)
    }

    /// Close the device. Further reads and writes fail with [`SerialError::Closed`].
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            log::debug!("Closed {}", self.path.display());
        }
    }

    fn port_mut(&mut self) -> Result<&mut SerialStream> {
        if self.failed {
            return Err(SerialError::Closed);
        }
        self.port.as_mut().ok_or(SerialError::Closed)
    }
}

#[async_trait]
impl SerialPortIO for SerialInterface {
    async fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        let res = self.port_mut()?.read(buf).await;
        res.map_err(|e| {
            self.failed = true;
            SerialError::IoError(e)
        })
    }

    async fn send_data(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port_mut()?;
        let res = async {
            port.write_all(data).await?;
            port.flush().await
        }
        .await;
        res.map_err(|e| {
            self.failed = true;
            SerialError::IoError(e)
        })
    }

    /// False once closed, after an I/O failure, or when the device node is gone.
    fn is_open(&self) -> bool {
        self.port.is_some() && !self.failed && self.path.exists()
    }
}

impl Drop for SerialInterface {
    fn drop(&mut self) {
        self.close();
    }
}
