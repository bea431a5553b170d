//! Row change notifications delivered by the engine's update hook.

#![allow(unsafe_code)]

use std::cell::Cell;
use std::ffi::{CStr, c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use rusqlite::ffi;

use crate::error::SqliteConnectionError;

/// Kind of row change reported by the update hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Map an engine action code; anything other than insert/update/delete is `None`.
    #[must_use]
    pub fn from_code(code: c_int) -> Option<Self> {
        match code {
            ffi::SQLITE_INSERT => Some(Operation::Insert),
            ffi::SQLITE_UPDATE => Some(Operation::Update),
            ffi::SQLITE_DELETE => Some(Operation::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEvent {
    pub operation: Operation,
    /// Schema name, `main` unless the table lives in an attached database.
    pub database: String,
    pub table: String,
    pub rowid: i64,
}

pub(crate) type UpdateHook = dyn Fn(&UpdateEvent) + Send + Sync + 'static;

thread_local! {
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Register `hook` on `db`, freeing whatever hook was registered before.
///
/// # Safety
/// `db` must be an open handle whose update hook argument, if any, was
/// installed by this function.
pub(crate) unsafe fn install(
    db: *mut ffi::sqlite3,
    hook: Option<Box<UpdateHook>>,
) -> Result<(), SqliteConnectionError> {
    if IN_HOOK.with(Cell::get) {
        return Err(SqliteConnectionError::InvalidInput(
            "update hook cannot be replaced from inside an update hook".into(),
        ));
    }

    let previous = match hook {
        Some(hook) => {
            let arg = Box::into_raw(Box::new(hook));
            // SAFETY: arg stays alive until replaced here or cleared on close
            unsafe { ffi::sqlite3_update_hook(db, Some(dispatch_update), arg.cast()) }
        }
        // SAFETY: clearing the hook is always valid on an open handle
        None => unsafe { ffi::sqlite3_update_hook(db, None, ptr::null_mut()) },
    };

    if !previous.is_null() {
        // SAFETY: every non-null argument was produced by Box::into_raw above
        drop(unsafe { Box::from_raw(previous.cast::<Box<UpdateHook>>()) });
    }
    Ok(())
}

unsafe extern "C" fn dispatch_update(
    arg: *mut c_void,
    action: c_int,
    database: *const c_char,
    table: *const c_char,
    rowid: i64,
) {
    let Some(operation) = Operation::from_code(action) else {
        return;
    };
    // SAFETY: arg is the Box<UpdateHook> registered by `install`
    let hook = unsafe { &*arg.cast::<Box<UpdateHook>>() };
    let event = UpdateEvent {
        operation,
        // SAFETY: the engine passes NUL-terminated names valid for this call
        database: unsafe { lossy(database) },
        table: unsafe { lossy(table) },
        rowid,
    };

    IN_HOOK.with(|flag| flag.set(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| hook(&event)));
    IN_HOOK.with(|flag| flag.set(false));

    if outcome.is_err() {
        tracing::warn!(table = %event.table, rowid, "update hook panicked; event dropped");
    }
}

unsafe fn lossy(text: *const c_char) -> String {
    if text.is_null() {
        return String::new();
    }
    // SAFETY: caller guarantees a NUL-terminated string
    unsafe { CStr::from_ptr(text) }
        .to_string_lossy()
        .into_owned()
}
