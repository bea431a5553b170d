//! A single SQLite connection confined to its own serial worker lane.
//!
//! Every statement against the native handle runs on one dedicated thread,
//! in submission order. Work issued from that thread (for instance from an
//! update hook or a [`Connection::confined`] closure) runs inline instead of
//! being queued behind itself.
//!
//! ```no_run
//! use confined_sqlite::{Connection, StorageLocation};
//!
//! # fn main() -> Result<(), confined_sqlite::SqliteConnectionError> {
//! let conn = Connection::open(StorageLocation::InMemory, false)?;
//! conn.execute("create table t(name text, email text)")?;
//! conn.execute("insert into t(name) values('a')")?;
//! assert_eq!(conn.last_insert_rowid(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod hook;
pub mod lane;
pub mod location;
pub mod status;

mod handle;

pub use config::{ConnectionOptions, ConnectionOptionsBuilder};
pub use connection::Connection;
pub use error::{EngineError, SqliteConnectionError};
pub use handle::sqlite_version;
pub use hook::{Operation, UpdateEvent};
pub use lane::{LaneId, SerialLane};
pub use location::StorageLocation;
