use std::ffi::{c_void, CString};

use bytes::Bytes;
use tickbridge_bridge::{BridgeContext, FrameTick, FrameWorker, WorkerError};

use crate::types::{TbFrameFn, TbInitFn, TbOutput, TbShutdownFn, TbWorkerVTable};

/// Opaque driver pointer handed back to every callback.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UserData(*mut c_void);

// SAFETY: The C caller owns `user_data` and promises it may be used from the
// worker thread for the bridge's lifetime.
unsafe impl Send for UserData {}

impl UserData {
    fn get(self) -> *mut c_void {
        self.0
    }
}

/// A worker implemented by C callbacks.
#[derive(Debug)]
pub(crate) struct CallbackWorker {
    user_data: UserData,
    frame: TbFrameFn,
    shutdown: Option<TbShutdownFn>,
}

/// Callbacks validated at start, moved into the worker factory.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Callbacks {
    user_data: UserData,
    init: Option<TbInitFn>,
    frame: TbFrameFn,
    shutdown: Option<TbShutdownFn>,
}

impl Callbacks {
    /// Returns `None` if the vtable has no frame callback.
    pub(crate) fn from_vtable(vtable: &TbWorkerVTable) -> Option<Self> {
        Some(Self {
            user_data: UserData(vtable.user_data),
            init: vtable.init,
            frame: vtable.frame?,
            shutdown: vtable.shutdown,
        })
    }

    /// Run the init callback, if any, and build the worker.
    pub(crate) fn into_worker(self, context: &BridgeContext) -> Result<CallbackWorker, WorkerError> {
        if let Some(init) = self.init {
            let base_path = CString::new(context.base_path().to_string_lossy().into_owned())
                .map_err(|_| WorkerError::Init("base path contains NUL".to_string()))?;
            let entry_point = CString::new(context.entry_point())
                .map_err(|_| WorkerError::Init("entry point contains NUL".to_string()))?;
            // SAFETY: The vtable contract requires `init` to accept these
            // arguments; the strings outlive the call.
            let code = unsafe { init(self.user_data.get(), base_path.as_ptr(), entry_point.as_ptr()) };
            if code != 0 {
                return Err(WorkerError::Init(format!("init callback returned {code}")));
            }
        }
        Ok(CallbackWorker {
            user_data: self.user_data,
            frame: self.frame,
            shutdown: self.shutdown,
        })
    }
}

impl FrameWorker for CallbackWorker {
    fn run_frame(&mut self, tick: FrameTick<'_>) -> Result<Bytes, WorkerError> {
        let mut out = TbOutput::default();
        // SAFETY: `input` is valid for the call; `out` is a live local.
        let code = unsafe {
            (self.frame)(
                self.user_data.get(),
                tick.frame,
                tick.delta,
                tick.input.as_ptr(),
                tick.input.len(),
                &mut out,
            )
        };
        if code != 0 {
            return Err(WorkerError::Failed(format!(
                "{} returned {code}",
                tick.context.entry_point()
            )));
        }
        if out.data.is_null() || out.len == 0 {
            return Ok(Bytes::new());
        }
        // SAFETY: The callback guarantees `data` is readable for `len` bytes
        // until it is invoked again; we copy before that.
        let data = unsafe { std::slice::from_raw_parts(out.data, out.len) };
        Ok(Bytes::copy_from_slice(data))
    }

    fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown {
            // SAFETY: Called once, after the last frame, per the vtable contract.
            unsafe { shutdown(self.user_data.get()) };
        }
    }
}
