#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

use bt_serial_bridge::config::SerialSettings;
use bt_serial_bridge::indicator::{IndicatorSender, LedSignal};
use bt_serial_bridge::serial::{self, SerialError, SerialOpener, SerialPortIO};
use bt_serial_bridge::wireless::{
    self, PeerInfo, PeerListener, ServiceAdvertisement, ServiceAdvertiser, WirelessError,
};

pub const PEER_ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

/// Release order of mock resources
pub type EventLog = Arc<Mutex<Vec<&'static str>>>;

pub fn events(log: &EventLog) -> Vec<&'static str> {
    log.lock().unwrap().clone()
}

/// Test side of a [`MockSerial`]
pub struct SerialControl {
    /// Chunks the device "receives"; an empty chunk is an empty read
    pub incoming: mpsc::UnboundedSender<Vec<u8>>,
    pub written: Arc<Mutex<Vec<u8>>>,
    pub open: Arc<AtomicBool>,
}

impl SerialControl {
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    /// Wait until exactly `len` bytes have been written to the device
    pub async fn wait_written(&self, len: usize) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(3);
        loop {
            let written = self.written();
            if written.len() >= len {
                return written;
            }
            let got = written.len();
            assert!(Instant::now() < deadline, "only {} of {} bytes reached the port", got, len);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

pub struct MockSerial {
    incoming: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: Vec<u8>,
    written: Arc<Mutex<Vec<u8>>>,
    open: Arc<AtomicBool>,
    log: EventLog,
}

impl MockSerial {
    pub fn new(log: EventLog) -> (MockSerial, SerialControl) {
        let (tx, rx) = mpsc::unbounded_channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        let open = Arc::new(AtomicBool::new(true));
        let port = MockSerial {
            incoming: rx,
            pending: Vec::new(),
            written: written.clone(),
            open: open.clone(),
            log,
        };
        (port, SerialControl { incoming: tx, written, open })
    }
}

#[async_trait]
impl SerialPortIO for MockSerial {
    async fn read_data(&mut self, buf: &mut [u8]) -> serial::Result<usize> {
        if self.pending.is_empty() {
            match self.incoming.recv().await {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    async fn send_data(&mut self, data: &[u8]) -> serial::Result<()> {
        if !self.is_open() {
            return Err(SerialError::Closed);
        }
        self.written.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Drop for MockSerial {
    fn drop(&mut self) {
        self.log.lock().unwrap().push("serial");
    }
}

pub struct MockOpener {
    pub fail: bool,
    pub attempts: Arc<Mutex<Vec<Instant>>>,
    controls: mpsc::UnboundedSender<SerialControl>,
    log: EventLog,
}

#[async_trait]
impl SerialOpener for MockOpener {
    type Port = MockSerial;

    async fn open(&self, _path: &Path, _settings: &SerialSettings) -> serial::Result<MockSerial> {
        self.attempts.lock().unwrap().push(Instant::now());
        if self.fail {
            return Err(SerialError::ConnectionFailed("device vanished".into()));
        }
        let (port, control) = MockSerial::new(self.log.clone());
        let _ = self.controls.send(control);
        Ok(port)
    }
}

/// Peer stream that records when it is dropped
pub struct TrackedPeer {
    inner: DuplexStream,
    log: EventLog,
}

impl AsyncRead for TrackedPeer {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TrackedPeer {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl Drop for TrackedPeer {
    fn drop(&mut self) {
        self.log.lock().unwrap().push("peer");
    }
}

pub enum Incoming {
    Peer(TrackedPeer, PeerInfo),
    Fail,
}

pub struct MockAdvertiser {
    pub fail: bool,
    pub advertised: Arc<AtomicUsize>,
    pub live: Arc<AtomicUsize>,
    incoming: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Incoming>>>,
    log: EventLog,
}

#[async_trait]
impl ServiceAdvertiser for MockAdvertiser {
    type Listener = MockListener;

    async fn advertise(
        &self,
        _advertisement: &ServiceAdvertisement,
    ) -> wireless::Result<MockListener> {
        if self.fail {
            return Err(WirelessError::Io(io::Error::new(io::ErrorKind::Other, "no adapter")));
        }
        self.advertised.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(MockListener {
            incoming: self.incoming.clone(),
            live: self.live.clone(),
            log: self.log.clone(),
        })
    }
}

pub struct MockListener {
    incoming: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Incoming>>>,
    live: Arc<AtomicUsize>,
    log: EventLog,
}

#[async_trait]
impl PeerListener for MockListener {
    type Peer = TrackedPeer;

    async fn accept_one(&mut self) -> wireless::Result<(TrackedPeer, PeerInfo)> {
        let mut rx = self.incoming.lock().await;
        match rx.recv().await {
            Some(Incoming::Peer(peer, info)) => Ok((peer, info)),
            Some(Incoming::Fail) | None => Err(WirelessError::AdvertisementClosed),
        }
    }
}

impl Drop for MockListener {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.log.lock().unwrap().push("listener");
    }
}

/// Test side of the mocked serial and wireless stacks
pub struct Harness {
    pub serial: mpsc::UnboundedReceiver<SerialControl>,
    pub peers: mpsc::UnboundedSender<Incoming>,
    pub leds: mpsc::UnboundedReceiver<LedSignal>,
    pub advertised: Arc<AtomicUsize>,
    pub live: Arc<AtomicUsize>,
    pub attempts: Arc<Mutex<Vec<Instant>>>,
    pub log: EventLog,
}

impl Harness {
    pub fn new() -> (MockOpener, MockAdvertiser, IndicatorSender, Harness) {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let advertised = Arc::new(AtomicUsize::new(0));
        let live = Arc::new(AtomicUsize::new(0));
        let (serial_tx, serial_rx) = mpsc::unbounded_channel();
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let (led_tx, led_rx) = mpsc::unbounded_channel();

        let opener = MockOpener {
            fail: false,
            attempts: attempts.clone(),
            controls: serial_tx,
            log: log.clone(),
        };
        let advertiser = MockAdvertiser {
            fail: false,
            advertised: advertised.clone(),
            live: live.clone(),
            incoming: Arc::new(tokio::sync::Mutex::new(peer_rx)),
            log: log.clone(),
        };
        let harness = Harness {
            serial: serial_rx,
            peers: peer_tx,
            leds: led_rx,
            advertised,
            live,
            attempts,
            log,
        };
        (opener, advertiser, IndicatorSender::new(led_tx), harness)
    }

    /// Hand a new peer to the listener; returns the remote end
    pub fn connect(&self) -> DuplexStream {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let peer = TrackedPeer {
            inner: server,
            log: self.log.clone(),
        };
        let _ = self.peers.send(Incoming::Peer(peer, PeerInfo::new(PEER_ADDRESS, Some(1))));
        client
    }

    pub fn fail_accept(&self) {
        let _ = self.peers.send(Incoming::Fail);
    }

    pub async fn next_serial(&mut self) -> SerialControl {
        tokio::time::timeout(Duration::from_secs(3), self.serial.recv())
            .await
            .expect("serial port was never opened")
            .expect("opener dropped")
    }

    /// Skip signals until `expected` arrives
    pub async fn expect_led(&mut self, expected: LedSignal) {
        let wait = async {
            while let Some(signal) = self.leds.recv().await {
                if signal == expected {
                    return;
                }
            }
            panic!("indicator channel closed while waiting for {:?}", expected);
        };
        tokio::time::timeout(Duration::from_secs(3), wait)
            .await
            .unwrap_or_else(|_| panic!("no {:?} signal", expected));
    }
}
