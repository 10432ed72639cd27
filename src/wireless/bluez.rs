use async_trait::async_trait;
use bluer::rfcomm::{Profile, ProfileHandle, Role, Stream};
use futures_util::StreamExt;
use uuid::Uuid;

use super::{PeerInfo, PeerListener, Result, ServiceAdvertisement, ServiceAdvertiser, WirelessError};

/// Registers the RFCOMM server as a BlueZ profile over D-Bus.
///
/// bluetoothd owns the listening socket on the configured channel and
/// publishes the service record for as long as the profile stays registered.
#[derive(Debug, Default)]
pub struct BluezAdvertiser;

impl BluezAdvertiser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceAdvertiser for BluezAdvertiser {
    type Listener = BluezListener;

    async fn advertise(&self, advertisement: &ServiceAdvertisement) -> Result<BluezListener> {
        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;

        let profile = Profile {
            uuid: advertisement.service_id,
            name: Some(advertisement.name.clone()),
            channel: Some(u16::from(advertisement.channel)),
            role: Some(Role::Server),
            require_authentication: Some(false),
            require_authorization: Some(false),
            service_record: Some(advertisement.sdp_record()),
            ..Default::default()
        };
        let handle = session.register_profile(profile).await?;

        log::debug!(
            "Waiting for RFCOMM connection on {} channel {}...",
            adapter.name(),
            advertisement.channel
        );

        Ok(BluezListener {
            handle,
            session,
            service_id: advertisement.service_id,
            channel: advertisement.channel,
        })
    }
}

/// A registered profile. Dropping it unregisters the profile, which withdraws
/// the service record, closes bluetoothd's listening socket and rejects any
/// connection requests that were never accepted.
pub struct BluezListener {
    // Field order is drop order: the profile goes before its D-Bus session
    handle: ProfileHandle,
    #[allow(dead_code)]
    session: bluer::Session,
    service_id: Uuid,
    channel: u8,
}

#[async_trait]
impl PeerListener for BluezListener {
    type Peer = Stream;

    async fn accept_one(&mut self) -> Result<(Stream, PeerInfo)> {
        let request = self
            .handle
            .next()
            .await
            .ok_or(WirelessError::AdvertisementClosed)?;
        let address = request.device();
        let stream = request.accept()?;
        Ok((stream, PeerInfo::new(address.to_string(), Some(self.channel))))
    }
}

impl Drop for BluezListener {
    fn drop(&mut self) {
        log::debug!("Withdrawing service record {}", self.service_id);
    }
}
