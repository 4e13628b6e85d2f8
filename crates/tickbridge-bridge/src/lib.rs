//! Per-frame handoff between a real-time driver and a worker.
//!
//! The driver calls [`FrameBridge::submit`] once per tick with that tick's
//! input channel blob. The worker turns batches of input into multiplexed
//! command frames. Two modes are available:
//! - **direct**: the worker runs inside `submit`, on the caller's thread
//! - **pipelined**: the worker runs on its own thread; the driver may run up
//!   to `throttle_threshold` frames ahead, with late input merged into one batch
//!
//! Buffers move between the two sides under a single mutex and are never
//! shared while one side is reading them.

pub mod bridge;
pub mod buffer;
pub mod config;
pub mod context;
pub mod error;
pub mod state;
pub mod worker;

pub use bridge::FrameBridge;
pub use buffer::{FrameBuffer, Merge};
pub use config::{
    BridgeConfig, BridgeMode, DEFAULT_BUFFER_CAPACITY, DEFAULT_ENTRY_POINT, DEFAULT_THROTTLE_THRESHOLD,
};
pub use context::BridgeContext;
pub use error::{BridgeError, Result};
pub use state::{BridgeState, BridgeStats, ShutdownHandle};
pub use worker::{FrameTick, FrameWorker, WorkerError};
