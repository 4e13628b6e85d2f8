use std::ffi::c_void;
use std::os::raw::c_char;

use std::cell::UnsafeCell;

use tickbridge_bridge::{FrameBridge, ShutdownHandle};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TbResult {
    Ok = 0,
    InvalidArgument = 1,
    StartupFailed = 2,
    InvalidConfig = 3,
    WorkerExited = 4,
    Allocation = 5,
    WireError = 6,
    Internal = 99,
}

pub const TB_MODE_DIRECT: u32 = 0;
pub const TB_MODE_PIPELINED: u32 = 1;

/// Output written by a frame callback.
///
/// `data` must stay valid until the callback is invoked again or the worker
/// is shut down. The bridge copies it before returning to the driver.
#[repr(C)]
#[derive(Debug)]
pub struct TbOutput {
    pub data: *const u8,
    pub len: usize,
}

impl Default for TbOutput {
    fn default() -> Self {
        Self {
            data: std::ptr::null(),
            len: 0,
        }
    }
}

/// Called once on the worker thread before the first frame. Non-zero fails startup.
pub type TbInitFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    base_path: *const c_char,
    entry_point: *const c_char,
) -> i32;

/// Called once per worker frame. Non-zero marks the frame failed.
pub type TbFrameFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    frame: i32,
    delta: f64,
    input: *const u8,
    input_len: usize,
    out: *mut TbOutput,
) -> i32;

/// Called once on the worker thread after the last frame.
pub type TbShutdownFn = unsafe extern "C" fn(user_data: *mut c_void);

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TbWorkerVTable {
    pub user_data: *mut c_void,
    pub init: Option<TbInitFn>,
    pub frame: Option<TbFrameFn>,
    pub shutdown: Option<TbShutdownFn>,
}

/// Bridge options. Zero or null fields take the default.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TbBridgeOptions {
    pub mode: u32,
    pub throttle_threshold: u32,
    pub initial_buffer_capacity: usize,
    pub base_path: *const c_char,
    pub entry_point: *const c_char,
}

pub type TbBridgeHandle = *mut c_void;

/// Heap state behind a `TbBridgeHandle`.
///
/// `shutdown` is read through `&BridgeHandle` from any thread. `bridge` is
/// only reached through the cell by the thread that drives the handle.
pub(crate) struct BridgeHandle {
    pub(crate) shutdown: ShutdownHandle,
    pub(crate) bridge: UnsafeCell<FrameBridge>,
}

impl BridgeHandle {
    pub(crate) fn new(bridge: FrameBridge) -> Self {
        Self {
            shutdown: bridge.shutdown_handle(),
            bridge: UnsafeCell::new(bridge),
        }
    }
}
