//! RFCOMM service side of the bridge.
//!
//! A [`ServiceAdvertiser`] registers the service record and hands back a
//! [`PeerListener`] whose lifetime is the lifetime of the advertisement:
//! dropping the listener withdraws the record and closes the server side,
//! whether or not a peer ever connected.

pub mod adapter;
pub mod advertisement;
pub mod bluez;

pub use advertisement::{ServiceAdvertisement, SERIAL_PORT_CLASS};
pub use bluez::{BluezAdvertiser, BluezListener};

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, thiserror::Error)]
pub enum WirelessError {
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] bluer::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Service registration ended before a peer connected")]
    AdvertisementClosed,

    #[error("Adapter initialization command `{command}` failed: {status}")]
    AdapterInit {
        command: String,
        status: std::process::ExitStatus,
    },
}

pub type Result<T> = std::result::Result<T, WirelessError>;

/// Identity of an accepted peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub address: String,
    pub channel: Option<u8>,
}

impl PeerInfo {
    pub fn new(address: impl Into<String>, channel: Option<u8>) -> Self {
        Self {
            address: address.into(),
            channel,
        }
    }
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel {
            Some(channel) => write!(f, "{} (channel {})", self.address, channel),
            None => f.write_str(&self.address),
        }
    }
}

/// An active service advertisement waiting for its single peer.
#[async_trait]
pub trait PeerListener: Send {
    type Peer: AsyncRead + AsyncWrite + Unpin + Send;

    /// Block until one inbound connection is accepted.
    async fn accept_one(&mut self) -> Result<(Self::Peer, PeerInfo)>;
}

/// Publishes the service record and opens the server side.
#[async_trait]
pub trait ServiceAdvertiser: Send + Sync {
    type Listener: PeerListener;

    async fn advertise(&self, advertisement: &ServiceAdvertisement) -> Result<Self::Listener>;
}
