use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use bytes::Bytes;

use crate::context::BridgeContext;

/// Everything a worker sees for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameTick<'a> {
    /// Latest driver frame index folded into this batch.
    pub frame: i32,
    /// Seconds elapsed across every driver frame folded into this batch.
    pub delta: f64,
    /// Merged input channel blob. Empty when the driver sent nothing.
    pub input: &'a [u8],
    pub context: &'a BridgeContext,
}

/// Failures raised by a worker. None of them stop the bridge once it runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// The worker's runtime could not be initialised.
    #[error("worker init failed: {0}")]
    Init(String),

    /// The configured entry point does not exist.
    #[error("entry point not found: {0}")]
    EntryPointMissing(String),

    /// The entry point ran and reported an error.
    #[error("frame failed: {0}")]
    Failed(String),

    /// The entry point panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Turns one frame of input into one frame of output commands.
pub trait FrameWorker {
    /// Run the entry point for one frame.
    fn run_frame(&mut self, tick: FrameTick<'_>) -> Result<Bytes, WorkerError>;

    /// Release runtime resources. Called once, on the worker's own thread,
    /// before the worker is dropped.
    fn shutdown(&mut self) {}
}

impl<F> FrameWorker for F
where
    F: FnMut(FrameTick<'_>) -> Result<Bytes, WorkerError>,
{
    fn run_frame(&mut self, tick: FrameTick<'_>) -> Result<Bytes, WorkerError> {
        self(tick)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run one frame, turning a panic into [`WorkerError::Panicked`].
pub(crate) fn run_guarded<W: FrameWorker + ?Sized>(
    worker: &mut W,
    tick: FrameTick<'_>,
) -> Result<Bytes, WorkerError> {
    catch_unwind(AssertUnwindSafe(|| worker.run_frame(tick)))
        .unwrap_or_else(|payload| Err(WorkerError::Panicked(panic_message(payload.as_ref()))))
}
