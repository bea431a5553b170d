use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where a database lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum StorageLocation {
    /// A private database that disappears when the connection closes.
    #[default]
    InMemory,
    /// A private on-disk database, deleted when the connection closes.
    Temporary,
    /// A filesystem path or `file:` URI.
    ///
    /// Connections open with `SQLITE_OPEN_URI`, so text starting with `file:`
    /// is parsed as a URI (query parameters included) rather than used as a
    /// literal filename.
    Named(String),
}

impl StorageLocation {
    pub const MEMORY_SENTINEL: &'static str = ":memory:";

    /// The filename argument `sqlite3_open_v2` expects for this location.
    #[must_use]
    pub fn open_string(&self) -> &str {
        match self {
            StorageLocation::InMemory => Self::MEMORY_SENTINEL,
            StorageLocation::Temporary => "",
            StorageLocation::Named(name) => name,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        StorageLocation::Named(name.into())
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.open_string())
    }
}

impl From<&str> for StorageLocation {
    fn from(name: &str) -> Self {
        StorageLocation::Named(name.to_string())
    }
}

impl From<String> for StorageLocation {
    fn from(name: String) -> Self {
        StorageLocation::Named(name)
    }
}

impl From<&Path> for StorageLocation {
    fn from(path: &Path) -> Self {
        StorageLocation::Named(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for StorageLocation {
    fn from(path: PathBuf) -> Self {
        StorageLocation::from(path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_strings() {
        assert_eq!(StorageLocation::InMemory.open_string(), ":memory:");
        assert_eq!(StorageLocation::Temporary.open_string(), "");
        assert_eq!(
            StorageLocation::named("file:app.db?mode=ro").open_string(),
            "file:app.db?mode=ro"
        );
    }

    #[test]
    fn path_conversion_is_named() {
        let location = StorageLocation::from(Path::new("/tmp/app.db"));
        assert_eq!(location, StorageLocation::Named("/tmp/app.db".into()));
        assert_eq!(location.to_string(), "/tmp/app.db");
    }
}
