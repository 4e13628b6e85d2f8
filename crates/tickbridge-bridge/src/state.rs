use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::buffer::FrameBuffer;

/// Where the handoff currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    /// Nothing staged, nothing published.
    Idle,
    /// Input waits for the worker to claim it.
    InputStaged,
    /// The worker is running a frame.
    WorkerClaimed,
    /// Output waits for the caller to collect it.
    OutputPublished,
    /// Stopped. Every `submit` returns an empty slice.
    NotRunning,
}

/// Counters kept by a bridge since it started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// Calls to `submit` while running.
    pub frames_submitted: u64,
    /// Frames the worker ran, failed ones included.
    pub worker_frames: u64,
    /// Submissions merged into input the worker had not yet claimed.
    pub frames_coalesced: u64,
    /// Frames whose worker call failed and produced empty output.
    pub worker_failures: u64,
    /// Submissions whose input could not be staged.
    pub input_dropped: u64,
    /// Outputs handed to the caller.
    pub outputs_delivered: u64,
    /// Highest pending-frame count seen at the start of a `submit`.
    pub max_pending_at_submit: usize,
}

/// Everything guarded by the bridge mutex.
#[derive(Debug)]
pub(crate) struct State {
    pub running: bool,
    /// Caller-side input accumulator.
    pub accumulator: FrameBuffer,
    /// Output slot. `None` while the worker holds it to write a frame.
    pub back: Option<FrameBuffer>,
    pub input_ready: bool,
    pub output_ready: bool,
    pub pending_frames: usize,
    pub frame: i32,
    pub delta: f64,
    pub stats: BridgeStats,
}

impl State {
    pub fn new(capacity: usize) -> Self {
        Self {
            running: true,
            accumulator: FrameBuffer::with_capacity("input", capacity),
            back: Some(FrameBuffer::with_capacity("output", capacity)),
            input_ready: false,
            output_ready: false,
            pending_frames: 0,
            frame: 0,
            delta: 0.0,
            stats: BridgeStats::default(),
        }
    }

    pub fn phase(&self) -> BridgeState {
        if !self.running {
            BridgeState::NotRunning
        } else if self.output_ready {
            BridgeState::OutputPublished
        } else if self.back.is_none() {
            BridgeState::WorkerClaimed
        } else if self.input_ready {
            BridgeState::InputStaged
        } else {
            BridgeState::Idle
        }
    }

    /// Swap published output into `front`. Returns false if none was ready.
    pub fn collect_into(&mut self, front: &mut FrameBuffer) -> bool {
        if !self.output_ready {
            return false;
        }
        match self.back.as_mut() {
            Some(back) => std::mem::swap(back, front),
            None => return false,
        }
        self.output_ready = false;
        self.stats.outputs_delivered += 1;
        true
    }
}

/// The mutex and the two signals shared by caller and worker.
#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<State>,
    /// Caller to worker: input staged, output slot freed, or stopping.
    to_worker: Condvar,
    /// Worker to caller: input claimed, output published, or stopped.
    to_caller: Condvar,
}

impl Shared {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State::new(capacity)),
            to_worker: Condvar::new(),
            to_caller: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wait_worker<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.to_worker
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wait_caller<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.to_caller
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn notify_worker(&self) {
        self.to_worker.notify_all();
    }

    pub fn notify_caller(&self) {
        self.to_caller.notify_all();
    }

    /// Clear the running flag and wake both sides. Returns false if already stopped.
    pub fn stop(&self) -> bool {
        let mut state = self.lock();
        let was_running = state.running;
        state.running = false;
        drop(state);
        self.notify_worker();
        self.notify_caller();
        was_running
    }
}

/// Stops a bridge from any thread.
///
/// A `submit` blocked on throttling or on the first frame returns an empty
/// slice once this fires. The worker finishes any frame it is running and
/// then exits.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    pub(crate) shared: Arc<Shared>,
}

impl ShutdownHandle {
    pub fn stop(&self) {
        if self.shared.stop() {
            tracing::debug!("bridge stop requested");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_progression() {
        let mut state = State::new(64);
        assert_eq!(state.phase(), BridgeState::Idle);
        state.input_ready = true;
        assert_eq!(state.phase(), BridgeState::InputStaged);
        let back = state.back.take();
        state.input_ready = false;
        assert_eq!(state.phase(), BridgeState::WorkerClaimed);
        state.back = back;
        state.output_ready = true;
        assert_eq!(state.phase(), BridgeState::OutputPublished);
        state.running = false;
        assert_eq!(state.phase(), BridgeState::NotRunning);
    }

    #[test]
    fn test_collect_swaps_buffers() {
        let mut state = State::new(64);
        if let Some(back) = state.back.as_mut() {
            back.replace_with(b"published").unwrap();
        }
        let mut front = FrameBuffer::with_capacity("front", 64);
        assert!(!state.collect_into(&mut front));

        state.output_ready = true;
        assert!(state.collect_into(&mut front));
        assert_eq!(front.as_slice(), b"published");
        assert!(!state.output_ready);
        assert_eq!(state.stats.outputs_delivered, 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let shared = Shared::new(64);
        assert!(shared.stop());
        assert!(!shared.stop());
        assert!(!shared.lock().running);
    }
}
