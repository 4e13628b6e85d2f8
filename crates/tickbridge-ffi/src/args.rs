use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error;

/// Read an optional option string. Null means "use the default".
///
/// Returns `None` after recording an error when the string is not UTF-8.
///
/// # Safety
/// `value` must be null or a valid NUL-terminated C string.
pub(crate) unsafe fn option_string(value: *const c_char, field: &str) -> Option<Option<String>> {
    if value.is_null() {
        return Some(None);
    }
    // SAFETY: Non-null and NUL-terminated per the contract above.
    let raw = unsafe { CStr::from_ptr(value) };
    match raw.to_str() {
        Ok(s) => Some(Some(s.to_owned())),
        Err(_) => {
            let _ = error::set_invalid_argument(format!("options.{field} must be valid UTF-8"));
            None
        }
    }
}

/// View the driver's input blob. A zero length is an empty batch, whatever
/// the pointer.
///
/// # Safety
/// If `len > 0`, `data` must be readable for `len` bytes for the whole call.
pub(crate) unsafe fn input_blob<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    match (len, data.is_null()) {
        (0, _) => Some(&[]),
        (_, true) => {
            let _ = error::set_invalid_argument(format!("input is null but input_len is {len}"));
            None
        }
        // SAFETY: Non-null and readable for `len` bytes per the contract above.
        (_, false) => Some(unsafe { std::slice::from_raw_parts(data, len) }),
    }
}
