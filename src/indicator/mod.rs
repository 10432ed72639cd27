//! Status LED driven from session state changes.
//!
//! The LED runs in its own task and only ever receives signals. Sending never
//! blocks, and a failing LED only disables itself.

pub mod sysfs;

pub use sysfs::SysfsLed;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

pub const DEFAULT_LED_PATH: &str = "/sys/class/leds/ACT";
/// Trigger the Raspberry Pi firmware uses for the activity LED
pub const DEFAULT_TRIGGER: &str = "actpwr";

pub const FAST_BLINK: Duration = Duration::from_millis(100);
pub const SLOW_BLINK: Duration = Duration::from_millis(500);
/// How often the solid "on" state is written again
pub const HOLD_REFRESH: Duration = Duration::from_millis(500);
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedSignal {
    /// No serial device: fast blink
    NoSerial,
    /// Serial open, waiting for a Bluetooth peer: solid on
    WaitingPeer,
    /// Bridging: slow blink
    Connected,
    /// Hand the LED back to its default trigger and end the task
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedConfig {
    pub path: PathBuf,
    pub default_trigger: String,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LED_PATH),
            default_trigger: DEFAULT_TRIGGER.to_string(),
        }
    }
}

/// Hardware side of the indicator.
pub trait LedBackend: Send + 'static {
    /// Switch to manual control. Called once, before anything else.
    fn take_control(&mut self) -> io::Result<()>;

    fn set(&mut self, on: bool) -> io::Result<()>;

    /// Give the LED back to its default trigger. Called once, last.
    fn release(&mut self) -> io::Result<()>;
}

/// Cheap, cloneable sending side. Sends are fire-and-forget.
#[derive(Debug, Clone)]
pub struct IndicatorSender {
    tx: mpsc::UnboundedSender<LedSignal>,
}

impl IndicatorSender {
    pub fn new(tx: mpsc::UnboundedSender<LedSignal>) -> Self {
        Self { tx }
    }

    pub fn send(&self, signal: LedSignal) {
        // A stopped indicator is not an error for the caller
        let _ = self.tx.send(signal);
    }
}

/// Owner of the indicator task.
pub struct StatusIndicator {
    sender: IndicatorSender,
    task: Option<JoinHandle<()>>,
}

impl StatusIndicator {
    pub fn spawn<B: LedBackend>(backend: B) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(indicator_loop(backend, rx));
        Self {
            sender: IndicatorSender::new(tx),
            task: Some(task),
        }
    }

    /// An indicator that drops every signal.
    pub fn disabled() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self {
            sender: IndicatorSender::new(tx),
            task: None,
        }
    }

    pub fn sender(&self) -> IndicatorSender {
        self.sender.clone()
    }

    pub fn send(&self, signal: LedSignal) {
        self.sender.send(signal);
    }

    /// Send [`LedSignal::Stop`] and wait up to `limit` for the task to finish.
    /// Returns false if it had to be abandoned.
    pub async fn shutdown(mut self, limit: Duration) -> bool {
        self.sender.send(LedSignal::Stop);
        let Some(task) = self.task.take() else {
            return true;
        };
        match timeout(limit, task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::warn!("Status LED task failed: {}", e);
                true
            }
            Err(_) => {
                log::warn!("Status LED task did not stop within {:?}", limit);
                false
            }
        }
    }
}

/// Owns the backend and runs each call on the blocking pool, so a slow
/// sysfs write never holds up a runtime thread.
struct Blinker<B> {
    backend: Option<B>,
    on: bool,
}

impl<B: LedBackend> Blinker<B> {
    async fn call<F>(&mut self, op: F) -> io::Result<()>
    where
        F: FnOnce(&mut B) -> io::Result<()> + Send + 'static,
    {
        let mut backend = self
            .backend
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "LED backend lost"))?;
        let joined = tokio::task::spawn_blocking(move || {
            let res = op(&mut backend);
            (backend, res)
        })
        .await;
        match joined {
            Ok((backend, res)) => {
                self.backend = Some(backend);
                res
            }
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }

    async fn toggle(&mut self) -> io::Result<()> {
        self.set(!self.on).await
    }

    async fn set(&mut self, on: bool) -> io::Result<()> {
        self.on = on;
        self.call(move |backend| backend.set(on)).await
    }
}

async fn indicator_loop<B: LedBackend>(backend: B, mut rx: mpsc::UnboundedReceiver<LedSignal>) {
    let mut led = Blinker {
        backend: Some(backend),
        on: false,
    };
    if let Err(e) = led.call(|backend| backend.take_control()).await {
        log::warn!("Status LED unavailable, indicator disabled: {}", e);
        return;
    }

    let mut state = LedSignal::NoSerial;
    let mut result = led.toggle().await;

    while result.is_ok() {
        // Latest signal wins; a closed channel means nobody will stop us
        loop {
            match rx.try_recv() {
                Ok(signal) => state = signal,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => state = LedSignal::Stop,
            }
            if state == LedSignal::Stop {
                break;
            }
        }

        result = match state {
            LedSignal::NoSerial => {
                sleep(FAST_BLINK).await;
                led.toggle().await
            }
            LedSignal::WaitingPeer => {
                let res = led.set(true).await;
                sleep(HOLD_REFRESH).await;
                res
            }
            LedSignal::Connected => {
                sleep(SLOW_BLINK).await;
                led.toggle().await
            }
            LedSignal::Stop => break,
        };
    }

    if let Err(e) = result {
        log::warn!("Status LED write failed, indicator disabled: {}", e);
    }
    if led.backend.is_some() {
        if let Err(e) = led.call(|backend| backend.release()).await {
            log::warn!("Could not restore status LED trigger: {}", e);
        }
    }
}
