use std::time::Duration;

use confined_sqlite::{
    Connection, ConnectionOptions, ConnectionOptionsBuilder, SqliteConnectionError,
    StorageLocation,
};
use serde_json::json;

#[test]
fn options_deserialize_from_json() -> Result<(), serde_json::Error> {
    let opts: ConnectionOptions = serde_json::from_value(json!({
        "location": { "kind": "named", "path": "data/app.db" },
        "read_only": true,
        "busy_timeout_ms": 1500
    }))?;
    assert_eq!(opts.location, StorageLocation::named("data/app.db"));
    assert!(opts.read_only);
    assert_eq!(opts.busy_timeout, Duration::from_millis(1500));
    assert_eq!(opts.lane_name, None);

    let memory: ConnectionOptions =
        serde_json::from_value(json!({ "location": { "kind": "in_memory" } }))?;
    assert_eq!(memory, ConnectionOptions::default());

    let encoded = serde_json::to_value(&opts)?;
    assert_eq!(encoded["busy_timeout_ms"], json!(1500));
    Ok(())
}

#[test]
fn builder_applies_timeout_and_lane_name() -> Result<(), SqliteConnectionError> {
    let conn = ConnectionOptionsBuilder::new(StorageLocation::InMemory)
        .busy_timeout(Duration::from_millis(750))
        .lane_name("options-test-lane")
        .open()?;
    assert_eq!(conn.busy_timeout(), Duration::from_millis(750));

    let thread_name = conn.confined(|| std::thread::current().name().map(str::to_string))?;
    assert_eq!(thread_name.as_deref(), Some("options-test-lane"));
    Ok(())
}

#[test]
fn open_with_read_only_options() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("opts.db");
    Connection::open_path(&path, false)?.execute("create table t(x)")?;

    let conn = Connection::open_with(
        &ConnectionOptions::new(path.as_path()).with_read_only(true),
    )?;
    assert!(conn.is_read_only());
    Ok(())
}
