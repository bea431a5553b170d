use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::error::SqliteConnectionError;
use crate::location::StorageLocation;

/// Options for opening a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionOptions {
    pub location: StorageLocation,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, rename = "busy_timeout_ms", with = "duration_ms")]
    pub busy_timeout: Duration,
    /// Worker thread name; defaults to `sqlite-lane-{id}`.
    #[serde(default)]
    pub lane_name: Option<String>,
}

impl ConnectionOptions {
    #[must_use]
    pub fn new(location: impl Into<StorageLocation>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

/// Fluent builder for [`ConnectionOptions`].
#[derive(Debug, Clone)]
pub struct ConnectionOptionsBuilder {
    opts: ConnectionOptions,
}

impl ConnectionOptionsBuilder {
    #[must_use]
    pub fn new(location: impl Into<StorageLocation>) -> Self {
        Self {
            opts: ConnectionOptions::new(location),
        }
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.opts.read_only = read_only;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.opts.busy_timeout = busy_timeout;
        self
    }

    #[must_use]
    pub fn lane_name(mut self, name: impl Into<String>) -> Self {
        self.opts.lane_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectionOptions {
        self.opts
    }

    /// Open a connection with the accumulated options.
    ///
    /// # Errors
    ///
    /// Returns `SqliteConnectionError` if the engine refuses to open the
    /// database or the busy timeout cannot be applied.
    pub fn open(self) -> Result<Connection, SqliteConnectionError> {
        Connection::open_with(&self.finish())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
