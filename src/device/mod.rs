pub mod port_watcher;

pub use port_watcher::{PortWatcher, WatchOutcome};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No candidate device paths given")]
    NoCandidates,

    #[error("Cannot watch {path:?}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Filesystem watcher stopped")]
    WatcherClosed,
}

pub type Result<T> = std::result::Result<T, DeviceError>;
