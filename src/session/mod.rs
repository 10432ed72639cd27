//! Session lifecycle: wait for a serial device, open it, advertise the
//! service, accept one peer, bridge, tear everything down, repeat.

pub mod rate_limit;

pub use rate_limit::RateLimiter;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::bridge::{bridge, TerminationReason};
use crate::config::SerialSettings;
use crate::device::{DeviceError, PortWatcher, WatchOutcome};
use crate::indicator::{IndicatorSender, LedSignal};
use crate::serial::{SerialError, SerialOpener};
use crate::wireless::{
    PeerInfo, PeerListener, ServiceAdvertisement, ServiceAdvertiser, WirelessError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No serial handle held
    Idle,
    /// Serial open, service advertised, no peer yet
    PortOpen,
    Bridging,
    /// Resources released; the next attempt starts from `Idle`
    Terminated,
}

impl SessionState {
    pub fn indicator_signal(self) -> LedSignal {
        match self {
            SessionState::Idle => LedSignal::NoSerial,
            SessionState::PortOpen | SessionState::Terminated => LedSignal::WaitingPeer,
            SessionState::Bridging => LedSignal::Connected,
        }
    }
}

/// How a session with an open serial port ended
#[derive(Debug)]
pub enum SessionEnd {
    AdvertiseFailed(WirelessError),
    AcceptFailed(WirelessError),
    Bridged { peer: PeerInfo, reason: TerminationReason },
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::AdvertiseFailed(e) => write!(f, "could not advertise service: {}", e),
            SessionEnd::AcceptFailed(e) => write!(f, "no peer accepted: {}", e),
            SessionEnd::Bridged { peer, reason } => write!(f, "peer {} left, {}", peer, reason),
        }
    }
}

/// Outcome of one [`Orchestrator::run_once`] iteration
#[derive(Debug)]
pub enum Attempt {
    /// No candidate existed; returned after the next filesystem change
    NoDevice,
    OpenFailed { path: PathBuf, error: SerialError },
    Session { path: PathBuf, end: SessionEnd },
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub serial: SerialSettings,
    pub advertisement: ServiceAdvertisement,
    pub retry_interval: Duration,
    pub debug: bool,
}

/// Per-session resources. Field order is release order: the peer goes
/// first, then the serial handle, then the advertisement.
struct SessionResources<S, L: PeerListener> {
    peer: Option<L::Peer>,
    serial: S,
    listener: Option<L>,
}

pub struct Orchestrator<O, A> {
    watcher: PortWatcher,
    opener: O,
    advertiser: A,
    indicator: IndicatorSender,
    config: SessionConfig,
    limiter: RateLimiter,
    state: SessionState,
}

impl<O, A> Orchestrator<O, A>
where
    O: SerialOpener,
    A: ServiceAdvertiser,
{
    pub fn new(
        watcher: PortWatcher,
        opener: O,
        advertiser: A,
        indicator: IndicatorSender,
        config: SessionConfig,
    ) -> Self {
        let limiter = RateLimiter::new(config.retry_interval);
        Self {
            watcher,
            opener,
            advertiser,
            indicator,
            config,
            limiter,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Serve sessions forever. Only a dead filesystem watch ends the loop.
    pub async fn run(&mut self) -> Result<(), DeviceError> {
        self.indicator.send(LedSignal::NoSerial);
        loop {
            self.run_once().await?;
        }
    }

    /// One rate-limited attempt. Per-session failures are reported in the
    /// returned [`Attempt`]; only watcher failures are errors.
    pub async fn run_once(&mut self) -> Result<Attempt, DeviceError> {
        self.limiter.wait().await;
        self.transition(SessionState::Idle);

        if self.watcher.first_existing().is_none() {
            self.indicator.send(LedSignal::NoSerial);
        }
        let path = match self.watcher.wait_for_candidate().await? {
            WatchOutcome::Present(path) => path,
            WatchOutcome::Changed => return Ok(Attempt::NoDevice),
        };

        let serial = match self.opener.open(&path, &self.config.serial).await {
            Ok(serial) => serial,
            Err(error) => {
                // Usually a device that vanished between the check and the open
                log::debug!("Ignoring {}: {}", path.display(), error);
                return Ok(Attempt::OpenFailed { path, error });
            }
        };
        log::info!("Opened {}, will now serve via Bluetooth", path.display());
        self.transition(SessionState::PortOpen);

        let end = self.serve(serial).await;
        self.transition(SessionState::Terminated);
        log::info!("Session on {} ended: {}", path.display(), end);

        Ok(Attempt::Session { path, end })
    }

    async fn serve(&mut self, serial: O::Port) -> SessionEnd {
        let mut resources: SessionResources<O::Port, A::Listener> = SessionResources {
            peer: None,
            serial,
            listener: None,
        };

        let listener = match self.advertiser.advertise(&self.config.advertisement).await {
            Ok(listener) => resources.listener.insert(listener),
            Err(e) => return SessionEnd::AdvertiseFailed(e),
        };
        log::info!(
            "Advertising {} on RFCOMM channel {}",
            self.config.advertisement.service_id,
            self.config.advertisement.channel
        );

        let (peer, info) = match listener.accept_one().await {
            Ok(accepted) => accepted,
            Err(e) => return SessionEnd::AcceptFailed(e),
        };
        log::info!("Accepted connection from {}", info);
        self.transition(SessionState::Bridging);

        let peer = resources.peer.insert(peer);
        let reason = bridge(&mut resources.serial, peer, self.config.debug).await;
        SessionEnd::Bridged { peer: info, reason }
    }

    /// Idle leaves the LED alone; it only starts fast blinking once no
    /// device is found.
    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            log::debug!("Session {:?} -> {:?}", self.state, next);
            self.state = next;
        }
        if next != SessionState::Idle {
            self.indicator.send(next.indicator_signal());
        }
    }
}
