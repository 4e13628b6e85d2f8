use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use tickbridge_bridge::BridgeError;

use crate::types::TbResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> TbResult {
    set_error_message(message);
    TbResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_bridge_error(err: &BridgeError) -> TbResult {
    set_error_message(err.to_string());
    match err {
        BridgeError::Startup(_) => TbResult::StartupFailed,
        BridgeError::Spawn(_) | BridgeError::WorkerExited => TbResult::WorkerExited,
        BridgeError::InvalidConfig(_) => TbResult::InvalidConfig,
        BridgeError::Allocation { .. } => TbResult::Allocation,
        BridgeError::Wire(_) => TbResult::WireError,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
