use std::path::PathBuf;

use tickbridge_bridge::{BridgeConfig, BridgeMode, FrameBridge};

use crate::args;
use crate::error;
use crate::types::{
    BridgeHandle, TbBridgeHandle, TbBridgeOptions, TbResult, TbWorkerVTable, TB_MODE_DIRECT,
    TB_MODE_PIPELINED,
};
use crate::worker::Callbacks;

fn with_bridge<T>(handle: TbBridgeHandle, on_error: T, f: impl FnOnce(&BridgeHandle) -> T) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("bridge handle cannot be null");
        return on_error;
    }

    let bridge_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &*(handle as *const BridgeHandle) }
    };

    f(bridge_handle)
}

/// # Safety
/// Only the thread driving `handle` may call this, and never re-entrantly.
unsafe fn with_bridge_mut<T>(
    handle: TbBridgeHandle,
    on_error: T,
    f: impl FnOnce(&mut FrameBridge) -> T,
) -> T {
    with_bridge(handle, on_error, |h| {
        // SAFETY: The driving thread is the only one that touches the cell.
        let bridge = unsafe { &mut *h.bridge.get() };
        f(bridge)
    })
}

/// Build a config from C options. Returns `None` after recording an error.
///
/// # Safety
/// `options` must be null or point to a valid `TbBridgeOptions` whose string
/// fields are null or valid NUL-terminated C strings.
unsafe fn config_from_options(options: *const TbBridgeOptions) -> Option<BridgeConfig> {
    let mut config = BridgeConfig::default();
    if options.is_null() {
        return Some(config);
    }
    let options = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &*options }
    };

    config.mode = match options.mode {
        TB_MODE_DIRECT => BridgeMode::Direct,
        TB_MODE_PIPELINED => BridgeMode::Pipelined,
        other => {
            let _ = error::set_invalid_argument(format!("unknown bridge mode {other}"));
            return None;
        }
    };
    if options.throttle_threshold > 0 {
        config.throttle_threshold = options.throttle_threshold as usize;
    }
    if options.initial_buffer_capacity > 0 {
        config.initial_buffer_capacity = options.initial_buffer_capacity;
    }
    // SAFETY: String fields are null or valid C strings per the contract above.
    if let Some(base_path) = unsafe { args::option_string(options.base_path, "base_path")? } {
        config.base_path = PathBuf::from(base_path);
    }
    // SAFETY: As above.
    if let Some(entry_point) = unsafe { args::option_string(options.entry_point, "entry_point")? } {
        config.entry_point = entry_point;
    }
    Some(config)
}

/// Start a bridge driving the worker described by `vtable`.
///
/// Returns null on failure; `tb_last_error` describes why. In pipelined mode
/// `init`, `frame`, and `shutdown` run on the worker thread.
///
/// # Safety
/// `vtable` must point to a valid `TbWorkerVTable` whose callbacks stay
/// callable, and whose `user_data` stays valid, until `tb_bridge_free`.
/// `options` must be null or point to a valid `TbBridgeOptions`.
#[no_mangle]
pub unsafe extern "C" fn tb_bridge_start(
    vtable: *const TbWorkerVTable,
    options: *const TbBridgeOptions,
) -> TbBridgeHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        if vtable.is_null() {
            let _ = error::set_invalid_argument("vtable cannot be null");
            return std::ptr::null_mut();
        }
        let vtable = {
            // SAFETY: Pointer validity is guaranteed by the caller.
            unsafe { &*vtable }
        };
        let Some(callbacks) = Callbacks::from_vtable(vtable) else {
            let _ = error::set_invalid_argument("vtable.frame cannot be null");
            return std::ptr::null_mut();
        };
        // SAFETY: Validated per the function contract.
        let Some(config) = (unsafe { config_from_options(options) }) else {
            return std::ptr::null_mut();
        };

        match FrameBridge::start(config, move |ctx| callbacks.into_worker(ctx)) {
            Ok(bridge) => {
                tracing::debug!(mode = %bridge.mode(), "bridge started over ffi");
                Box::into_raw(Box::new(BridgeHandle::new(bridge))) as TbBridgeHandle
            }
            Err(err) => {
                tracing::debug!(error = %err, "bridge start over ffi failed");
                let _ = error::map_bridge_error(&err);
                std::ptr::null_mut()
            }
        }
    })
}

/// Submit one driver frame and return the output that is ready, if any.
///
/// The returned pointer stays valid until the next call on this handle. A
/// zero `*out_len` means no output this frame, or that the bridge stopped.
///
/// Another thread may end a blocked call with `tb_bridge_request_stop`.
///
/// # Safety
/// `handle` must be a live handle from `tb_bridge_start`, driven from this
/// thread only. If `input_len > 0`, `input` must be readable for that many
/// bytes. `out_len` must be non-null.
#[no_mangle]
pub unsafe extern "C" fn tb_bridge_submit(
    handle: TbBridgeHandle,
    frame: i32,
    delta: f64,
    input: *const u8,
    input_len: usize,
    out_len: *mut usize,
) -> *const u8 {
    crate::ffi_boundary(std::ptr::null(), || {
        error::clear_error_state();

        if out_len.is_null() {
            let _ = error::set_invalid_argument("out_len cannot be null");
            return std::ptr::null();
        }
        // SAFETY: Checked non-null above; the caller owns the pointee.
        unsafe { *out_len = 0 };

        // SAFETY: Validated per the function contract.
        let Some(input) = (unsafe { args::input_blob(input, input_len) }) else {
            return std::ptr::null();
        };

        // SAFETY: Called from the driving thread per the function contract.
        unsafe {
            with_bridge_mut(handle, std::ptr::null(), |bridge| {
                let output = bridge.submit(frame, delta, input);
                *out_len = output.len();
                if output.is_empty() {
                    std::ptr::null()
                } else {
                    output.as_ptr()
                }
            })
        }
    })
}

/// Stop the bridge and wait for its worker to exit. Safe to call twice.
///
/// # Safety
/// `handle` must be a live handle from `tb_bridge_start`, called from the
/// thread that drives it. Use `tb_bridge_request_stop` from other threads.
#[no_mangle]
pub unsafe extern "C" fn tb_bridge_stop(handle: TbBridgeHandle) -> TbResult {
    crate::ffi_boundary(TbResult::Internal, || {
        error::clear_error_state();
        // SAFETY: Called from the driving thread per the function contract.
        unsafe {
            with_bridge_mut(handle, TbResult::InvalidArgument, |bridge| {
                bridge.stop();
                TbResult::Ok
            })
        }
    })
}

/// Ask the bridge to stop without waiting for the worker.
///
/// Callable from any thread. A `tb_bridge_submit` blocked on throttling or
/// on the first frame returns with no output. The driving thread still calls
/// `tb_bridge_stop` or `tb_bridge_free` afterwards.
///
/// # Safety
/// `handle` must be a live handle from `tb_bridge_start` that is not freed
/// before this call returns.
#[no_mangle]
pub unsafe extern "C" fn tb_bridge_request_stop(handle: TbBridgeHandle) -> TbResult {
    crate::ffi_boundary(TbResult::Internal, || {
        error::clear_error_state();
        with_bridge(handle, TbResult::InvalidArgument, |h| {
            h.shutdown.stop();
            TbResult::Ok
        })
    })
}

/// Returns 1 while the bridge runs, 0 once stopped or on a null handle.
/// Callable from any thread.
///
/// # Safety
/// `handle` must be null or a live handle from `tb_bridge_start`.
#[no_mangle]
pub unsafe extern "C" fn tb_bridge_is_running(handle: TbBridgeHandle) -> i32 {
    crate::ffi_boundary(0, || with_bridge(handle, 0, |h| i32::from(h.shutdown.is_running())))
}

/// Driver frames submitted since the worker last claimed input.
///
/// # Safety
/// `handle` must be null or a live handle from `tb_bridge_start`, called
/// from the thread that drives it.
#[no_mangle]
pub unsafe extern "C" fn tb_bridge_pending_frames(handle: TbBridgeHandle) -> usize {
    // SAFETY: Called from the driving thread per the function contract.
    crate::ffi_boundary(0, || unsafe {
        with_bridge_mut(handle, 0, |bridge| bridge.pending_frames())
    })
}

/// Stop the bridge if needed and free the handle.
///
/// # Safety
/// `handle` must be null or a handle from `tb_bridge_start` not yet freed,
/// called from the thread that drives it once no other thread uses it.
#[no_mangle]
pub unsafe extern "C" fn tb_bridge_free(handle: TbBridgeHandle) {
    crate::ffi_boundary((), || {
        if handle.is_null() {
            return;
        }

        // SAFETY: Pointer originated from Box::into_raw in tb_bridge_start.
        unsafe {
            drop(Box::from_raw(handle as *mut BridgeHandle));
        }
    });
}
