use confined_sqlite::{Connection, SqliteConnectionError};
use rusqlite::ErrorCode;

#[test]
fn second_read_only_connection_rejects_writes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ro.db");

    let writer = Connection::open_path(&path, false)?;
    writer.execute("create table t(name text)")?;
    assert!(!writer.is_read_only());

    let reader = Connection::open_path(&path, true)?;
    assert!(reader.is_read_only());

    let err = reader
        .execute("insert into t(name) values('a')")
        .expect_err("read-only insert");
    let engine = err.engine().expect("engine failure");
    assert_eq!(engine.kind(), ErrorCode::ReadOnly);
    assert_eq!(reader.total_changes(), 0);

    // reads still work
    reader.execute("select count(*) from t")?;
    Ok(())
}

#[test]
fn read_only_open_of_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");

    match Connection::open_path(&path, true) {
        Err(SqliteConnectionError::Engine(err)) => {
            assert_eq!(err.kind(), ErrorCode::CannotOpen);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("read-only open must not create the file"),
    }
    assert!(!path.exists());
}
