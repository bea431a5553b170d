//! Result-code translation.

use std::ffi::c_int;

use rusqlite::ffi;

use crate::error::EngineError;

/// Codes the engine uses to report success.
pub const SUCCESS_CODES: [c_int; 3] = [ffi::SQLITE_OK, ffi::SQLITE_DONE, ffi::SQLITE_ROW];

#[must_use]
pub fn is_success(code: c_int) -> bool {
    SUCCESS_CODES.contains(&code)
}

/// Translate a raw status code into `Ok(code)` or an [`EngineError`].
///
/// `message` is only invoked when `code` is a failure.
///
/// # Errors
/// Returns [`EngineError`] for any code outside [`SUCCESS_CODES`].
pub fn translate(code: c_int, message: impl FnOnce() -> String) -> Result<c_int, EngineError> {
    if is_success(code) {
        Ok(code)
    } else {
        Err(EngineError::new(code, message()))
    }
}
