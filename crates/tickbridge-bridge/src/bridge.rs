use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use crate::buffer::{FrameBuffer, Merge};
use crate::config::{BridgeConfig, BridgeMode};
use crate::context::BridgeContext;
use crate::error::{BridgeError, Result};
use crate::state::{BridgeState, BridgeStats, Shared, ShutdownHandle, State};
use crate::worker::{run_guarded, FrameTick, FrameWorker, WorkerError};

enum Engine {
    /// The worker runs inside `submit`. `None` once it has been shut down.
    Direct(Option<Box<dyn FrameWorker>>),
    /// The worker runs on this thread. `None` once joined.
    Pipelined(Option<JoinHandle<()>>),
}

/// Hands each driver frame to a worker and returns the worker's output.
///
/// In [`BridgeMode::Direct`] the worker runs synchronously inside
/// [`submit`](Self::submit). In [`BridgeMode::Pipelined`] it runs on its own
/// thread and may fall up to `throttle_threshold` frames behind; input
/// submitted while it is busy is merged into one larger batch.
///
/// The slice returned by `submit` is valid until the next call. An empty slice
/// means either "no output this frame" or "stopped"; use
/// [`is_running`](Self::is_running) to tell them apart.
///
/// The bridge stays on the thread that started it. Use
/// [`shutdown_handle`](Self::shutdown_handle) to stop it from elsewhere.
pub struct FrameBridge {
    shared: Arc<Shared>,
    context: Arc<BridgeContext>,
    engine: Engine,
    /// Caller-owned output buffer returned by `submit`.
    front: FrameBuffer,
    threshold: usize,
    primed: bool,
}

impl FrameBridge {
    /// Build the worker and start the bridge.
    ///
    /// In pipelined mode `factory` runs on the worker thread, so workers that
    /// must stay on one thread are created where they run. A factory error is
    /// returned as [`BridgeError::Startup`] and nothing keeps running.
    pub fn start<W, F>(config: BridgeConfig, factory: F) -> Result<Self>
    where
        W: FrameWorker + 'static,
        F: FnOnce(&BridgeContext) -> std::result::Result<W, WorkerError> + Send + 'static,
    {
        config.validate()?;
        let context = Arc::new(BridgeContext::from_config(&config));
        let shared = Arc::new(Shared::new(config.initial_buffer_capacity));

        let engine = match config.mode {
            BridgeMode::Direct => {
                let worker = factory(&*context).inspect_err(|err| {
                    tracing::error!(error = %err, "worker startup failed");
                })?;
                Engine::Direct(Some(Box::new(worker)))
            }
            BridgeMode::Pipelined => {
                let handle = spawn_worker(&config, Arc::clone(&shared), Arc::clone(&context), factory)?;
                Engine::Pipelined(Some(handle))
            }
        };

        tracing::debug!(
            mode = %config.mode,
            throttle = config.throttle_threshold,
            entry_point = %config.entry_point,
            "frame bridge started"
        );

        Ok(Self {
            shared,
            context,
            engine,
            front: FrameBuffer::with_capacity("output", config.initial_buffer_capacity),
            threshold: config.throttle_threshold,
            primed: false,
        })
    }

    /// Submit one driver frame and collect whatever output is ready.
    pub fn submit(&mut self, frame: i32, delta: f64, input: &[u8]) -> &[u8] {
        match self.engine {
            Engine::Direct(_) => self.submit_direct(frame, delta, input),
            Engine::Pipelined(_) => self.submit_pipelined(frame, delta, input),
        }
    }

    fn submit_direct(&mut self, frame: i32, delta: f64, input: &[u8]) -> &[u8] {
        let Engine::Direct(slot) = &mut self.engine else {
            return &[];
        };
        let running = {
            let mut state = self.shared.lock();
            if state.running {
                state.stats.frames_submitted += 1;
                state.stats.worker_frames += 1;
            }
            state.running
        };
        if !running {
            release_direct(slot);
            return &[];
        }
        let Some(worker) = slot.as_mut() else {
            return &[];
        };

        let tick = FrameTick {
            frame,
            delta,
            input,
            context: &self.context,
        };
        let outcome = run_guarded(worker.as_mut(), tick);
        let failed = publish(&mut self.front, frame, outcome);

        let mut state = self.shared.lock();
        if failed {
            state.stats.worker_failures += 1;
        }
        state.stats.outputs_delivered += 1;
        drop(state);

        self.front.as_slice()
    }

    fn submit_pipelined(&mut self, frame: i32, delta: f64, input: &[u8]) -> &[u8] {
        let shared = &*self.shared;
        let front = &mut self.front;
        let mut state = shared.lock();
        if !state.running {
            return &[];
        }

        state.stats.frames_submitted += 1;
        state.stats.max_pending_at_submit = state.stats.max_pending_at_submit.max(state.pending_frames);

        // Throttled: keep draining output so the worker can free its slot and
        // claim the backlog. One drain per call is enough for that.
        let mut collected = false;
        while state.running && state.pending_frames > self.threshold {
            if !collected && state.collect_into(front) {
                collected = true;
                shared.notify_worker();
                tracing::trace!(frame, "collected output while throttled");
            }
            tracing::trace!(frame, pending = state.pending_frames, "throttled");
            state = shared.wait_caller(state);
        }
        if !state.running {
            return &[];
        }

        stage_input(&mut state, frame, delta, input);
        shared.notify_worker();

        if !collected && state.collect_into(front) {
            collected = true;
            shared.notify_worker();
        }

        if !self.primed {
            while state.running && !collected {
                state = shared.wait_caller(state);
                if state.collect_into(front) {
                    collected = true;
                    shared.notify_worker();
                }
            }
            self.primed = collected;
        }
        let running = state.running;
        drop(state);

        if collected && running {
            tracing::trace!(frame, bytes = front.len(), "output collected");
            front.as_slice()
        } else {
            &[]
        }
    }

    /// Stop the worker and wait for its thread to exit. Safe to call twice.
    pub fn stop(&mut self) {
        if self.shared.stop() {
            tracing::debug!("frame bridge stopping");
        }
        match &mut self.engine {
            Engine::Direct(slot) => release_direct(slot),
            Engine::Pipelined(handle) => {
                if let Some(handle) = handle.take() {
                    if handle.join().is_err() {
                        tracing::warn!("worker thread panicked during shutdown");
                    }
                    tracing::debug!("worker thread joined");
                }
            }
        }
        self.front.clear();
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    pub fn mode(&self) -> BridgeMode {
        self.context.mode()
    }

    pub fn context(&self) -> &BridgeContext {
        &self.context
    }

    /// Current position in the handoff cycle.
    pub fn state(&self) -> BridgeState {
        self.shared.lock().phase()
    }

    /// Driver frames submitted since the worker last claimed input.
    pub fn pending_frames(&self) -> usize {
        self.shared.lock().pending_frames
    }

    pub fn stats(&self) -> BridgeStats {
        self.shared.lock().stats
    }

    /// A cloneable handle that stops this bridge from any thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for FrameBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for FrameBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBridge")
            .field("mode", &self.context.mode())
            .field("threshold", &self.threshold)
            .field("state", &self.state())
            .finish()
    }
}

fn release_direct(slot: &mut Option<Box<dyn FrameWorker>>) {
    if let Some(mut worker) = slot.take() {
        worker.shutdown();
        tracing::debug!("direct worker released");
    }
}

/// Merge caller input into the accumulator and mark it ready.
fn stage_input(state: &mut State, frame: i32, delta: f64, input: &[u8]) {
    match state.accumulator.merge_batch(input) {
        Ok(Merge::Coalesced) => {
            state.stats.frames_coalesced += 1;
            tracing::trace!(frame, pending = state.pending_frames, "input coalesced");
        }
        Ok(Merge::Staged | Merge::Nothing) => {}
        Err(err @ BridgeError::Allocation { .. }) => {
            state.stats.input_dropped += 1;
            tracing::error!(frame, error = %err, "input dropped");
        }
        Err(err) => {
            state.stats.input_dropped += 1;
            tracing::warn!(frame, error = %err, "input dropped");
        }
    }
    state.frame = frame;
    state.delta += delta;
    state.pending_frames += 1;
    state.input_ready = true;
    tracing::trace!(frame, pending = state.pending_frames, "input staged");
}

/// Copy a worker result into `out`. Returns true if the frame failed.
fn publish(
    out: &mut FrameBuffer,
    frame: i32,
    outcome: std::result::Result<bytes::Bytes, WorkerError>,
) -> bool {
    match outcome {
        Ok(bytes) => {
            if let Err(err) = out.replace_with(&bytes) {
                tracing::error!(frame, error = %err, "output dropped");
            }
            false
        }
        Err(err) => {
            tracing::warn!(frame, error = %err, "worker frame failed");
            out.clear();
            true
        }
    }
}

fn spawn_worker<W, F>(
    config: &BridgeConfig,
    shared: Arc<Shared>,
    context: Arc<BridgeContext>,
    factory: F,
) -> Result<JoinHandle<()>>
where
    W: FrameWorker + 'static,
    F: FnOnce(&BridgeContext) -> std::result::Result<W, WorkerError> + Send + 'static,
{
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);
    let capacity = config.initial_buffer_capacity;

    let handle = thread::Builder::new()
        .name(config.thread_name.clone())
        .spawn(move || {
            let worker = match factory(&*context) {
                Ok(worker) => worker,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            worker_loop(&shared, &context, worker, capacity);
        })?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "worker startup failed");
            let _ = handle.join();
            Err(BridgeError::Startup(err))
        }
        Err(_) => {
            let _ = handle.join();
            Err(BridgeError::WorkerExited)
        }
    }
}

fn worker_loop<W: FrameWorker>(shared: &Shared, context: &BridgeContext, mut worker: W, capacity: usize) {
    let mut processor = FrameBuffer::with_capacity("input", capacity);

    loop {
        let mut state = shared.lock();
        while state.running && !(state.input_ready && !state.output_ready) {
            state = shared.wait_worker(state);
        }
        if !state.running {
            break;
        }

        std::mem::swap(&mut state.accumulator, &mut processor);
        state.accumulator.clear();
        state.input_ready = false;
        state.pending_frames = 0;
        let frame = state.frame;
        let delta = std::mem::take(&mut state.delta);
        let mut back = state
            .back
            .take()
            .unwrap_or_else(|| FrameBuffer::with_capacity("output", capacity));
        drop(state);
        shared.notify_caller();
        tracing::trace!(frame, bytes = processor.len(), "input claimed");

        let tick = FrameTick {
            frame,
            delta,
            input: processor.as_slice(),
            context,
        };
        let outcome = run_guarded(&mut worker, tick);
        let failed = publish(&mut back, frame, outcome);

        let mut state = shared.lock();
        state.back = Some(back);
        state.output_ready = true;
        state.stats.worker_frames += 1;
        if failed {
            state.stats.worker_failures += 1;
        }
        drop(state);
        shared.notify_caller();
        tracing::trace!(frame, "output published");
    }

    worker.shutdown();
    drop(worker);
    tracing::debug!("worker thread exiting");
}
