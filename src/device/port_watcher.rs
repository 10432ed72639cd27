use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::{DeviceError, Result};

/// Result of one [`PortWatcher::wait_for_candidate`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// This candidate exists right now
    Present(PathBuf),
    /// Something changed in a watched directory; check again
    Changed,
}

/// Watches the parent directories of the candidate device paths.
///
/// Waiting is driven by inotify events, never by a timer. At most one event
/// stays queued between waits: it is only a wake-up, and the existence check
/// that follows it sees every change that was dropped meanwhile.
pub struct PortWatcher {
    candidates: Vec<PathBuf>,
    watched_dirs: Vec<PathBuf>,
    rx: mpsc::Receiver<notify::Result<Event>>,
    _watcher: RecommendedWatcher,
}

impl PortWatcher {
    /// Set up watches. Fails if any parent directory does not exist.
    pub fn new(candidates: Vec<PathBuf>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(DeviceError::NoCandidates);
        }

        let watched_dirs = watch_dirs(&candidates);
        // Writes to an open tty in /dev raise events too; keep a single one
        let (tx, rx) = mpsc::channel(1);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.try_send(res);
        })
        .map_err(|source| DeviceError::Watch { path: PathBuf::new(), source })?;

        for dir in &watched_dirs {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|source| DeviceError::Watch { path: dir.clone(), source })?;
        }
        log::debug!("Watching {:?} for serial ports", watched_dirs);

        Ok(Self {
            candidates,
            watched_dirs,
            rx,
            _watcher: watcher,
        })
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched_dirs
    }

    /// First candidate that currently exists, in list order.
    pub fn first_existing(&self) -> Option<&Path> {
        self.candidates.iter().map(PathBuf::as_path).find(|p| p.exists())
    }

    /// Drop the queued wake-up, if any. Returns how many events were queued.
    pub fn discard_pending(&mut self) -> usize {
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    /// Discard queued events and check the candidates. Never blocks.
    pub fn poll_candidate(&mut self) -> Option<PathBuf> {
        self.discard_pending();
        self.first_existing().map(Path::to_path_buf)
    }

    /// Block until the next filesystem event in any watched directory.
    pub async fn wait_for_change(&mut self) -> Result<()> {
        match self.rx.recv().await {
            Some(Ok(event)) => {
                log::debug!("Filesystem event {:?} on {:?}", event.kind, event.paths);
                Ok(())
            }
            Some(Err(e)) => {
                // Still a wake-up; the caller re-checks existence anyway
                log::warn!("Filesystem watch error: {}", e);
                Ok(())
            }
            None => Err(DeviceError::WatcherClosed),
        }
    }

    /// Return an existing candidate immediately, or wait for the next change
    /// and let the caller check again.
    pub async fn wait_for_candidate(&mut self) -> Result<WatchOutcome> {
        if let Some(path) = self.poll_candidate() {
            return Ok(WatchOutcome::Present(path));
        }
        log::debug!("No ports, watching {:?} for changes", self.watched_dirs);
        self.wait_for_change().await?;
        Ok(WatchOutcome::Changed)
    }
}

/// Sorted, deduplicated parent directories. A bare file name lives in `.`.
pub fn watch_dirs(candidates: &[PathBuf]) -> Vec<PathBuf> {
    let dirs: BTreeSet<PathBuf> = candidates
        .iter()
        .map(|p| match p.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        })
        .collect();
    dirs.into_iter().collect()
}
