use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::error::SqliteConnectionError;

type Job = Box<dyn FnOnce() + Send>;

enum Command {
    Run(Job),
    Shutdown,
}

/// Identity of a [`SerialLane`], unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneId(u64);

impl LaneId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        LaneId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

thread_local! {
    static CURRENT_LANE: Cell<Option<LaneId>> = const { Cell::new(None) };
}

/// A dedicated worker thread that runs submitted work one item at a time.
///
/// Work submitted from outside the lane is queued in submission order and the
/// caller blocks until it finishes. Work submitted from code already running
/// on the lane executes inline, so nested calls never deadlock.
pub struct SerialLane {
    id: LaneId,
    sender: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl SerialLane {
    /// Spawn a lane whose worker thread is named `sqlite-lane-{id}`.
    ///
    /// # Errors
    /// Returns [`SqliteConnectionError::LaneUnavailable`] if the thread cannot be spawned.
    pub fn spawn() -> Result<Self, SqliteConnectionError> {
        Self::spawn_named(None)
    }

    /// Spawn a lane with an explicit worker thread name.
    ///
    /// # Errors
    /// Returns [`SqliteConnectionError::LaneUnavailable`] if the thread cannot be spawned.
    pub fn with_name(name: impl Into<String>) -> Result<Self, SqliteConnectionError> {
        Self::spawn_named(Some(name.into()))
    }

    fn spawn_named(name: Option<String>) -> Result<Self, SqliteConnectionError> {
        let id = LaneId::next();
        let (sender, receiver) = mpsc::channel::<Command>();
        let name = name.unwrap_or_else(|| format!("sqlite-lane-{id}"));
        let worker = thread::Builder::new()
            .name(name)
            .spawn(move || {
                CURRENT_LANE.with(|lane| lane.set(Some(id)));
                while let Ok(command) = receiver.recv() {
                    match command {
                        Command::Run(job) => job(),
                        Command::Shutdown => break,
                    }
                }
                tracing::trace!(lane = %id, "lane worker exiting");
            })
            .map_err(|err| {
                SqliteConnectionError::LaneUnavailable(format!(
                    "failed to spawn lane worker thread: {err}"
                ))
            })?;

        Ok(Self {
            id,
            sender,
            worker: Some(worker),
        })
    }

    #[must_use]
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Whether the calling thread is this lane's worker.
    #[must_use]
    pub fn is_current(&self) -> bool {
        CURRENT_LANE.with(Cell::get) == Some(self.id)
    }

    /// Run `work` on the lane and return its result.
    ///
    /// A panic in `work` is re-raised on the caller; the lane keeps running.
    ///
    /// # Errors
    /// Returns [`SqliteConnectionError::LaneUnavailable`] if the worker has shut down.
    pub fn run<F, T>(&self, work: F) -> Result<T, SqliteConnectionError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_current() {
            return Ok(work());
        }

        let (respond_to, response) = mpsc::sync_channel(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work));
            let _ = respond_to.send(outcome);
        });
        tracing::trace!(lane = %self.id, "dispatching onto lane");
        self.sender
            .send(Command::Run(job))
            .map_err(|_| lane_closed(self.id))?;

        match response.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => Err(lane_closed(self.id)),
        }
    }
}

impl fmt::Debug for SerialLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialLane").field("id", &self.id).finish()
    }
}

impl Drop for SerialLane {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Dropped by a job on the lane itself: the worker exits once that job returns.
        if self.is_current() {
            return;
        }
        if worker.join().is_err() {
            tracing::error!(lane = %self.id, "lane worker panicked");
        }
    }
}

fn lane_closed(id: LaneId) -> SqliteConnectionError {
    SqliteConnectionError::LaneUnavailable(format!("lane {id} has shut down"))
}
