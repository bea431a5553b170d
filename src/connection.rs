use std::ffi::{CString, c_int};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rusqlite::ffi;

use crate::config::ConnectionOptions;
use crate::error::SqliteConnectionError;
use crate::handle::RawHandle;
use crate::hook::{UpdateEvent, UpdateHook};
use crate::lane::{LaneId, SerialLane};
use crate::location::StorageLocation;

/// One SQLite connection whose statements run on a dedicated serial lane.
///
/// `Connection` is `Send + Sync`; share it with `Arc`. Statements submitted
/// from different threads are executed one at a time in submission order.
/// Metadata reads (`changes`, `is_read_only`, ...) and [`interrupt`] go to the
/// handle directly and never wait on the lane.
///
/// The handle is released exactly once, by [`close`] or when the last owner
/// drops the connection.
///
/// [`interrupt`]: Connection::interrupt
/// [`close`]: Connection::close
pub struct Connection {
    // declared before `handle` so the lane shuts down first
    lane: SerialLane,
    handle: Arc<RawHandle>,
    location: StorageLocation,
    busy_timeout_ms: AtomicU64,
}

impl Connection {
    /// Open a connection.
    ///
    /// # Errors
    /// Returns the engine failure if the database cannot be opened; no
    /// connection is produced in that case.
    pub fn open(
        location: impl Into<StorageLocation>,
        read_only: bool,
    ) -> Result<Self, SqliteConnectionError> {
        Self::open_on_lane(location.into(), read_only, None)
    }

    /// Shorthand for `open(StorageLocation::Named(filename), read_only)`.
    ///
    /// # Errors
    /// See [`Connection::open`].
    pub fn open_path(
        filename: impl AsRef<Path>,
        read_only: bool,
    ) -> Result<Self, SqliteConnectionError> {
        Self::open(filename.as_ref(), read_only)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// See [`Connection::open`].
    pub fn open_in_memory() -> Result<Self, SqliteConnectionError> {
        Self::open(StorageLocation::InMemory, false)
    }

    /// Open with [`ConnectionOptions`], applying the configured busy timeout.
    ///
    /// # Errors
    /// See [`Connection::open`].
    pub fn open_with(options: &ConnectionOptions) -> Result<Self, SqliteConnectionError> {
        let conn = Self::open_on_lane(
            options.location.clone(),
            options.read_only,
            options.lane_name.clone(),
        )?;
        if !options.busy_timeout.is_zero() {
            conn.set_busy_timeout(options.busy_timeout)?;
        }
        Ok(conn)
    }

    fn open_on_lane(
        location: StorageLocation,
        read_only: bool,
        lane_name: Option<String>,
    ) -> Result<Self, SqliteConnectionError> {
        let filename = to_cstring(location.open_string(), "database location")?;
        let flags = open_flags(read_only);
        tracing::debug!(%location, read_only, flags, "opening sqlite connection");

        let handle = RawHandle::open(&filename, flags)?;
        let lane = match lane_name {
            Some(name) => SerialLane::with_name(name)?,
            None => SerialLane::spawn()?,
        };
        tracing::debug!(%location, lane = %lane.id(), "sqlite connection open");

        Ok(Self {
            lane,
            handle: Arc::new(handle),
            location,
            busy_timeout_ms: AtomicU64::new(0),
        })
    }

    /// Run `sql` (one or more statements) on the lane, discarding result rows.
    ///
    /// # Errors
    /// Returns the engine failure for this handle, or `InvalidInput` if `sql`
    /// contains a NUL byte.
    pub fn execute(&self, sql: &str) -> Result<(), SqliteConnectionError> {
        let sql = to_cstring(sql, "SQL text")?;
        let handle = Arc::clone(&self.handle);
        self.lane.run(move || handle.exec(&sql))??;
        Ok(())
    }

    /// Async adapter over [`Connection::execute`] for tokio callers.
    ///
    /// # Errors
    /// As [`Connection::execute`], plus `Join` if the blocking task fails.
    pub async fn execute_async(
        self: Arc<Self>,
        sql: impl Into<String>,
    ) -> Result<(), SqliteConnectionError> {
        let sql = sql.into();
        tokio::task::spawn_blocking(move || self.execute(&sql))
            .await
            .map_err(|e| SqliteConnectionError::Join(format!("sqlite spawn_blocking join error: {e}")))?
    }

    /// Run arbitrary work on this connection's lane, ordered with its statements.
    ///
    /// Calls made from inside `work` (for example `execute`) run inline.
    ///
    /// # Errors
    /// Returns `LaneUnavailable` if the lane has shut down.
    pub fn confined<F, T>(&self, work: F) -> Result<T, SqliteConnectionError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.lane.run(work)
    }

    /// Whether the calling thread is this connection's lane.
    #[must_use]
    pub fn is_confined(&self) -> bool {
        self.lane.is_current()
    }

    #[must_use]
    pub fn lane_id(&self) -> LaneId {
        self.lane.id()
    }

    #[must_use]
    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Whether the main database is open read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.handle.is_read_only()
    }

    /// Rowid of the most recent successful insert, 0 if none.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.handle.last_insert_rowid()
    }

    /// Rows modified by the most recently completed statement.
    #[must_use]
    pub fn changes(&self) -> i64 {
        self.handle.changes()
    }

    /// Rows modified since the connection was opened.
    #[must_use]
    pub fn total_changes(&self) -> i64 {
        self.handle.total_changes()
    }

    /// Ask a running statement to abort. Returns immediately.
    pub fn interrupt(&self) {
        tracing::debug!(location = %self.location, "interrupt requested");
        self.handle.interrupt();
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms.load(Ordering::Relaxed))
    }

    /// How long the engine waits on a locked database before reporting busy.
    ///
    /// Whole milliseconds are applied, saturating at `i32::MAX`. Zero fails
    /// immediately on contention.
    ///
    /// # Errors
    /// Returns the engine failure if the timeout cannot be applied.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<(), SqliteConnectionError> {
        let ms = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
        self.handle.busy_timeout(ms)?;
        self.busy_timeout_ms
            .store(u64::from(ms.unsigned_abs()), Ordering::Relaxed);
        Ok(())
    }

    /// Register a callback for every inserted, updated or deleted row.
    ///
    /// The hook runs on the lane while a statement executes and must not use
    /// the connection to modify the database. Passing `None` removes it.
    ///
    /// # Errors
    /// Returns `InvalidInput` when called from inside an update hook.
    pub fn set_update_hook<F>(&self, hook: Option<F>) -> Result<(), SqliteConnectionError>
    where
        F: Fn(&UpdateEvent) + Send + Sync + 'static,
    {
        let hook = hook.map(|f| Box::new(f) as Box<UpdateHook>);
        tracing::debug!(location = %self.location, installed = hook.is_some(), "update hook");
        let handle = Arc::clone(&self.handle);
        self.lane.run(move || handle.set_update_hook(hook))?
    }

    /// # Errors
    /// See [`Connection::set_update_hook`].
    pub fn clear_update_hook(&self) -> Result<(), SqliteConnectionError> {
        self.set_update_hook(None::<fn(&UpdateEvent)>)
    }

    /// Shut down the lane and release the handle, reporting the close status.
    ///
    /// # Errors
    /// Returns the engine failure if `sqlite3_close` does not succeed.
    pub fn close(self) -> Result<(), SqliteConnectionError> {
        let Self {
            lane,
            handle,
            location,
            ..
        } = self;
        drop(lane);
        tracing::debug!(%location, "closing sqlite connection");
        match Arc::try_unwrap(handle) {
            Ok(handle) => handle.close()?,
            // Still held by a job running on this thread; released when it returns.
            Err(shared) => drop(shared),
        }
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("location", &self.location)
            .field("lane", &self.lane)
            .field("busy_timeout", &self.busy_timeout())
            .finish_non_exhaustive()
    }
}

/// Flags passed to `sqlite3_open_v2`.
pub(crate) fn open_flags(read_only: bool) -> c_int {
    let mode = if read_only {
        ffi::SQLITE_OPEN_READONLY
    } else {
        ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
    };
    mode | ffi::SQLITE_OPEN_FULLMUTEX | ffi::SQLITE_OPEN_URI
}

fn to_cstring(text: &str, what: &str) -> Result<CString, SqliteConnectionError> {
    CString::new(text)
        .map_err(|_| SqliteConnectionError::InvalidInput(format!("{what} contains a NUL byte")))
}
