use tickbridge_wire::WireError;

use crate::worker::WorkerError;

/// Errors that can occur while starting or running a frame bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The worker factory or its entry-point lookup failed.
    #[error("worker startup failed: {0}")]
    Startup(#[from] WorkerError),

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The worker thread ended before reporting whether startup succeeded.
    #[error("worker thread exited during startup")]
    WorkerExited,

    /// The configuration was rejected before anything started.
    #[error("invalid bridge config: {0}")]
    InvalidConfig(String),

    /// A buffer could not grow to hold a frame's data.
    #[error("failed to allocate {requested} bytes for {buffer} buffer")]
    Allocation {
        buffer: &'static str,
        requested: usize,
    },

    /// Input or output bytes did not follow the channel wire format.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
