//! tickbridge-ffi: C-ABI exports for a native driver and a native worker.

mod args;
mod bridge;
mod error;
mod types;
mod worker;

use std::panic::AssertUnwindSafe;

pub use bridge::{
    tb_bridge_free, tb_bridge_is_running, tb_bridge_pending_frames, tb_bridge_request_stop,
    tb_bridge_start, tb_bridge_stop, tb_bridge_submit,
};
pub use types::{
    TbBridgeHandle, TbBridgeOptions, TbFrameFn, TbInitFn, TbOutput, TbResult, TbShutdownFn,
    TbWorkerVTable, TB_MODE_DIRECT, TB_MODE_PIPELINED,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("panic caught at ffi boundary");
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn tb_clear_error() {
    ffi_boundary((), error::clear_error_state);
}

/// Message for the last failed call on this thread, or an empty string.
#[no_mangle]
pub extern "C" fn tb_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

/// Fixed payload size of an event kind; 0 for unknown kinds.
#[no_mangle]
pub extern "C" fn tb_event_payload_size(kind: u32) -> usize {
    ffi_boundary(0, || tickbridge_wire::payload_size(kind))
}

#[cfg(test)]
mod tests {
    use std::ffi::{c_void, CStr, CString};
    use std::os::raw::c_char;
    use std::ptr;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct Driver {
        inits: AtomicI32,
        frames: AtomicI32,
        shutdowns: AtomicI32,
        hold: AtomicBool,
        out: std::sync::Mutex<Vec<u8>>,
    }

    unsafe extern "C" fn on_init(user: *mut c_void, _base: *const c_char, entry: *const c_char) -> i32 {
        // SAFETY: Tests pass a live `Driver` and the bridge passes valid strings.
        let (driver, entry) = unsafe { (&*(user as *const Driver), CStr::from_ptr(entry)) };
        driver.inits.fetch_add(1, Ordering::SeqCst);
        if entry.to_bytes() == b"missing" {
            1
        } else {
            0
        }
    }

    unsafe extern "C" fn on_frame(
        user: *mut c_void,
        frame: i32,
        _delta: f64,
        input: *const u8,
        input_len: usize,
        out: *mut TbOutput,
    ) -> i32 {
        // SAFETY: Tests pass a live `Driver`; the bridge passes valid buffers.
        let driver = unsafe { &*(user as *const Driver) };
        driver.frames.fetch_add(1, Ordering::SeqCst);
        while driver.hold.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        if frame < 0 {
            return 7;
        }
        let mut buf = driver.out.lock().unwrap();
        buf.clear();
        buf.extend_from_slice(&frame.to_le_bytes());
        if input_len > 0 {
            // SAFETY: As above.
            buf.extend_from_slice(unsafe { std::slice::from_raw_parts(input, input_len) });
        }
        // SAFETY: `out` is valid for the duration of the call.
        unsafe {
            (*out).data = buf.as_ptr();
            (*out).len = buf.len();
        }
        0
    }

    unsafe extern "C" fn on_shutdown(user: *mut c_void) {
        // SAFETY: Tests pass a live `Driver`.
        let driver = unsafe { &*(user as *const Driver) };
        driver.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn vtable(driver: &Driver) -> TbWorkerVTable {
        TbWorkerVTable {
            user_data: driver as *const Driver as *mut c_void,
            init: Some(on_init),
            frame: Some(on_frame),
            shutdown: Some(on_shutdown),
        }
    }

    fn options(mode: u32, entry: Option<&CString>) -> TbBridgeOptions {
        TbBridgeOptions {
            mode,
            throttle_threshold: 0,
            initial_buffer_capacity: 0,
            base_path: ptr::null(),
            entry_point: entry.map_or(ptr::null(), |e| e.as_ptr()),
        }
    }

    fn last_error() -> String {
        // SAFETY: tb_last_error returns a pointer to a thread-local CString.
        unsafe { CStr::from_ptr(tb_last_error()).to_string_lossy().into_owned() }
    }

    #[test]
    fn last_error_starts_empty() {
        tb_clear_error();
        assert!(last_error().is_empty());
    }

    #[test]
    fn payload_size_matches_catalog() {
        assert_eq!(tb_event_payload_size(0), 128);
        assert_eq!(tb_event_payload_size(123_456), 0);
    }

    #[test]
    fn direct_bridge_round_trip() {
        let driver = Driver::default();
        let vt = vtable(&driver);
        let opts = options(TB_MODE_DIRECT, None);
        // SAFETY: vtable and options are valid for the bridge's lifetime.
        let handle = unsafe { tb_bridge_start(&vt, &opts) };
        assert!(!handle.is_null(), "{}", last_error());

        let input = [1u8, 2, 3];
        let mut len = 0usize;
        // SAFETY: handle is live; input and len are valid.
        let out = unsafe { tb_bridge_submit(handle, 9, 0.016, input.as_ptr(), input.len(), &mut len) };
        // SAFETY: out is valid for len bytes until the next call.
        let bytes = unsafe { std::slice::from_raw_parts(out, len) };
        assert_eq!(bytes, &[9, 0, 0, 0, 1, 2, 3]);

        // SAFETY: handle is live.
        let out = unsafe { tb_bridge_submit(handle, -1, 0.0, ptr::null(), 0, &mut len) };
        assert!(out.is_null());
        assert_eq!(len, 0);

        // SAFETY: handle is live, then freed once.
        unsafe {
            assert_eq!(tb_bridge_is_running(handle), 1);
            assert_eq!(tb_bridge_stop(handle), TbResult::Ok);
            assert_eq!(tb_bridge_is_running(handle), 0);
            tb_bridge_free(handle);
        }
        assert_eq!(driver.inits.load(Ordering::SeqCst), 1);
        assert_eq!(driver.frames.load(Ordering::SeqCst), 2);
        assert_eq!(driver.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pipelined_bridge_runs_callbacks_on_worker() {
        let driver = Driver::default();
        let vt = vtable(&driver);
        let opts = options(TB_MODE_PIPELINED, None);
        // SAFETY: vtable and options are valid for the bridge's lifetime.
        let handle = unsafe { tb_bridge_start(&vt, &opts) };
        assert!(!handle.is_null(), "{}", last_error());

        let mut len = 0usize;
        // SAFETY: handle is live.
        let out = unsafe { tb_bridge_submit(handle, 0, 0.0, ptr::null(), 0, &mut len) };
        assert_eq!(len, 4);
        assert!(!out.is_null());

        // SAFETY: handle is live, then freed once.
        unsafe { tb_bridge_free(handle) };
        assert_eq!(driver.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn request_stop_releases_blocked_submit_from_another_thread() {
        let driver = Driver::default();
        driver.hold.store(true, Ordering::SeqCst);
        let vt = vtable(&driver);
        let opts = options(TB_MODE_PIPELINED, None);
        // SAFETY: vtable and options are valid for the bridge's lifetime.
        let handle = unsafe { tb_bridge_start(&vt, &opts) };
        assert!(!handle.is_null(), "{}", last_error());

        let addr = handle as usize;
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            // SAFETY: The handle outlives this thread; it is freed after join.
            unsafe { tb_bridge_request_stop(addr as TbBridgeHandle) }
        });

        // The worker is held inside its first frame, so this blocks until stopped.
        let mut len = 7usize;
        // SAFETY: handle is live and driven from this thread.
        let out = unsafe { tb_bridge_submit(handle, 0, 0.0, ptr::null(), 0, &mut len) };
        assert!(out.is_null());
        assert_eq!(len, 0);
        assert_eq!(stopper.join().unwrap(), TbResult::Ok);

        // SAFETY: handle is live, then freed once.
        unsafe {
            assert_eq!(tb_bridge_is_running(handle), 0);
            driver.hold.store(false, Ordering::SeqCst);
            assert_eq!(tb_bridge_stop(handle), TbResult::Ok);
            tb_bridge_free(handle);
        }
        assert_eq!(driver.shutdowns.load(Ordering::SeqCst), 1);
        // SAFETY: Null handles are rejected.
        assert_eq!(unsafe { tb_bridge_request_stop(ptr::null_mut()) }, TbResult::InvalidArgument);
    }

    #[test]
    fn init_failure_returns_null_with_error() {
        let driver = Driver::default();
        let vt = vtable(&driver);
        let entry = CString::new("missing").unwrap();
        let opts = options(TB_MODE_PIPELINED, Some(&entry));
        // SAFETY: vtable and options are valid for the call.
        let handle = unsafe { tb_bridge_start(&vt, &opts) };
        assert!(handle.is_null());
        assert!(last_error().contains("init callback returned 1"), "{}", last_error());
        assert_eq!(driver.shutdowns.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn null_arguments_are_rejected() {
        // SAFETY: Null pointers are explicitly handled.
        unsafe {
            assert!(tb_bridge_start(ptr::null(), ptr::null()).is_null());
            assert!(last_error().contains("vtable"));

            let mut len = 5usize;
            assert!(tb_bridge_submit(ptr::null_mut(), 0, 0.0, ptr::null(), 0, &mut len).is_null());
            assert_eq!(len, 0);
            assert_eq!(tb_bridge_stop(ptr::null_mut()), TbResult::InvalidArgument);
            tb_bridge_free(ptr::null_mut());
        }

        let vt = TbWorkerVTable {
            user_data: ptr::null_mut(),
            init: None,
            frame: None,
            shutdown: None,
        };
        // SAFETY: vtable is valid for the call.
        assert!(unsafe { tb_bridge_start(&vt, ptr::null()) }.is_null());
        assert!(last_error().contains("frame"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let driver = Driver::default();
        let vt = vtable(&driver);
        let opts = options(42, None);
        // SAFETY: vtable and options are valid for the call.
        assert!(unsafe { tb_bridge_start(&vt, &opts) }.is_null());
        assert!(last_error().contains("unknown bridge mode 42"));
    }
}
