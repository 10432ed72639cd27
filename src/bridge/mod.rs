//! Bidirectional byte pump between a serial port and a connected peer.

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep_until, Instant};

use crate::serial::{SerialError, SerialPortIO};

/// Bounded wait per iteration, so the loop stays responsive
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Matches the default buffer size of the usual stream readers
pub const BUFFER_SIZE: usize = 8192;

/// Why a bridging session ended
#[derive(Debug)]
pub enum TerminationReason {
    /// Zero-length read from the peer
    PeerClosed,
    /// Zero-length read from a serial port that is no longer open
    SerialClosed,
    IoError(BridgeIoError),
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeIoError {
    #[error("serial: {0}")]
    Serial(#[from] SerialError),

    #[error("peer: {0}")]
    Peer(#[from] std::io::Error),
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::PeerClosed => f.write_str("empty Bluetooth data"),
            TerminationReason::SerialClosed => f.write_str("serial disconnect"),
            TerminationReason::IoError(e) => write!(f, "I/O error ({})", e),
        }
    }
}

enum Ready {
    Peer(std::io::Result<usize>),
    Serial(crate::serial::Result<usize>),
    Tick,
}

/// Copy bytes both ways until one side closes or fails.
///
/// Each iteration waits on both sources at once plus the poll tick. An empty
/// read from a serial port that is still open is not a disconnect; the serial
/// side is parked until the next tick instead of being polled in a tight loop.
pub async fn bridge<S, P>(serial: &mut S, peer: &mut P, debug: bool) -> TerminationReason
where
    S: SerialPortIO,
    P: AsyncRead + AsyncWrite + Unpin,
{
    let mut peer_buf = vec![0u8; BUFFER_SIZE];
    let mut serial_buf = vec![0u8; BUFFER_SIZE];
    let mut serial_parked = false;
    let mut next_tick = Instant::now() + POLL_INTERVAL;

    loop {
        let ready = tokio::select! {
            res = peer.read(&mut peer_buf) => Ready::Peer(res),
            res = serial.read_data(&mut serial_buf), if !serial_parked => Ready::Serial(res),
            _ = sleep_until(next_tick) => Ready::Tick,
        };

        match ready {
            Ready::Tick => {
                serial_parked = false;
                next_tick = Instant::now() + POLL_INTERVAL;
            }
            Ready::Peer(Ok(0)) => {
                log::info!("Stopping because of empty Bluetooth data");
                return TerminationReason::PeerClosed;
            }
            Ready::Peer(Ok(n)) => {
                let data = &peer_buf[..n];
                if debug {
                    log::debug!("BT -> Serial: {}", data.escape_ascii());
                }
                if let Err(e) = serial.send_data(data).await {
                    return stop_on(BridgeIoError::Serial(e));
                }
            }
            Ready::Peer(Err(e)) => return stop_on(BridgeIoError::Peer(e)),
            Ready::Serial(Ok(0)) => {
                if !serial.is_open() {
                    log::info!("Stopping because of serial disconnect");
                    return TerminationReason::SerialClosed;
                }
                serial_parked = true;
            }
            Ready::Serial(Ok(n)) => {
                let data = &serial_buf[..n];
                if debug {
                    log::debug!("Serial -> BT: {}", data.escape_ascii());
                }
                let res = async {
                    peer.write_all(data).await?;
                    peer.flush().await
                }
                .await;
                if let Err(e) = res {
                    return stop_on(BridgeIoError::Peer(e));
                }
            }
            Ready::Serial(Err(e)) => return stop_on(BridgeIoError::Serial(e)),
        }
    }
}

fn stop_on(err: BridgeIoError) -> TerminationReason {
    log::info!("Stopping due to {}", err);
    TerminationReason::IoError(err)
}
