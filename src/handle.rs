//! Owner of the native `sqlite3*`.
//!
//! Every FFI call against a connection handle goes through [`RawHandle`].

#![allow(unsafe_code)]

use std::ffi::{CStr, c_int};
use std::ptr::{self, NonNull};

use rusqlite::ffi;

use crate::error::{EngineError, SqliteConnectionError};
use crate::hook::{self, UpdateHook};
use crate::status;

pub(crate) struct RawHandle {
    db: NonNull<ffi::sqlite3>,
}

// SAFETY: handles are always opened with SQLITE_OPEN_FULLMUTEX, so the engine
// serializes access to the underlying connection across threads.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

impl RawHandle {
    pub(crate) fn open(filename: &CStr, flags: c_int) -> Result<Self, EngineError> {
        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        // SAFETY: filename is NUL-terminated and db is a valid out-pointer
        let rc = unsafe { ffi::sqlite3_open_v2(filename.as_ptr(), &mut db, flags, ptr::null()) };

        let Some(db) = NonNull::new(db) else {
            let code = if status::is_success(rc) {
                ffi::SQLITE_NOMEM
            } else {
                rc
            };
            return Err(EngineError::new(code, error_string(code)));
        };

        // On failure the engine still hands back a handle that must be closed;
        // dropping `handle` takes care of that.
        let handle = Self { db };
        handle.check(rc)?;
        Ok(handle)
    }

    fn as_ptr(&self) -> *mut ffi::sqlite3 {
        self.db.as_ptr()
    }

    /// Run `code` through the translator, fetching this handle's message on failure.
    pub(crate) fn check(&self, code: c_int) -> Result<c_int, EngineError> {
        status::translate(code, || self.errmsg())
    }

    fn errmsg(&self) -> String {
        // SAFETY: the handle is open; sqlite3_errmsg never returns NULL for a live handle
        unsafe {
            CStr::from_ptr(ffi::sqlite3_errmsg(self.as_ptr()))
                .to_string_lossy()
                .into_owned()
        }
    }

    pub(crate) fn exec(&self, sql: &CStr) -> Result<(), EngineError> {
        // SAFETY: sql is NUL-terminated; no callback or error out-pointer is passed
        let rc = unsafe {
            ffi::sqlite3_exec(
                self.as_ptr(),
                sql.as_ptr(),
                None,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        self.check(rc).map(|_| ())
    }

    pub(crate) fn is_read_only(&self) -> bool {
        // SAFETY: handle is open and the schema name is a static C string
        unsafe { ffi::sqlite3_db_readonly(self.as_ptr(), c"main".as_ptr()) == 1 }
    }

    pub(crate) fn last_insert_rowid(&self) -> i64 {
        // SAFETY: handle is open
        unsafe { ffi::sqlite3_last_insert_rowid(self.as_ptr()) }
    }

    pub(crate) fn changes(&self) -> i64 {
        // SAFETY: handle is open
        i64::from(unsafe { ffi::sqlite3_changes(self.as_ptr()) })
    }

    pub(crate) fn total_changes(&self) -> i64 {
        // SAFETY: handle is open
        i64::from(unsafe { ffi::sqlite3_total_changes(self.as_ptr()) })
    }

    pub(crate) fn interrupt(&self) {
        // SAFETY: handle is open; sqlite3_interrupt is safe to call from any thread
        unsafe { ffi::sqlite3_interrupt(self.as_ptr()) }
    }

    pub(crate) fn busy_timeout(&self, ms: c_int) -> Result<(), EngineError> {
        // SAFETY: handle is open
        let rc = unsafe { ffi::sqlite3_busy_timeout(self.as_ptr(), ms) };
        self.check(rc).map(|_| ())
    }

    /// Must be called on the connection's lane.
    pub(crate) fn set_update_hook(
        &self,
        hook: Option<Box<UpdateHook>>,
    ) -> Result<(), SqliteConnectionError> {
        // SAFETY: handle is open and only this crate registers update hooks on it
        unsafe { hook::install(self.as_ptr(), hook) }
    }

    /// Release the handle now and report the close status.
    pub(crate) fn close(self) -> Result<(), EngineError> {
        let db = self.as_ptr();
        std::mem::forget(self);
        // SAFETY: `self` was forgotten, so Drop will not close the handle a second time
        let rc = unsafe { release(db) };
        status::translate(rc, || error_string(rc)).map(|_| ())
    }
}

impl Drop for RawHandle {
    fn drop(&mut self) {
        // SAFETY: Drop runs at most once and the handle is still open
        let rc = unsafe { release(self.as_ptr()) };
        if !status::is_success(rc) {
            tracing::warn!(code = rc, "sqlite3_close failed: {}", error_string(rc));
        }
    }
}

/// Detach any update hook and close the handle.
///
/// # Safety
/// `db` must be an open handle that is never used again.
unsafe fn release(db: *mut ffi::sqlite3) -> c_int {
    tracing::debug!("closing sqlite handle");
    // SAFETY: caller guarantees `db` is open; clearing cannot fail outside a hook
    if let Err(err) = unsafe { hook::install(db, None) } {
        tracing::warn!("failed to detach update hook before close: {err}");
    }
    // SAFETY: caller guarantees `db` is open and unused afterwards; sqlite3_exec
    // finalizes its own statements, so none are left to keep the handle busy
    unsafe { ffi::sqlite3_close(db) }
}

/// English description of a result code, independent of any handle.
pub(crate) fn error_string(code: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a static string for every code
    unsafe {
        CStr::from_ptr(ffi::sqlite3_errstr(code))
            .to_string_lossy()
            .into_owned()
    }
}

/// Version of the linked SQLite library.
#[must_use]
pub fn sqlite_version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a static string
    unsafe {
        CStr::from_ptr(ffi::sqlite3_libversion())
            .to_str()
            .unwrap_or("unknown")
    }
}
