use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use confined_sqlite::{Connection, SqliteConnectionError};

#[test]
fn reentrant_execute_runs_inline() -> Result<(), SqliteConnectionError> {
    let conn = Arc::new(Connection::open_in_memory()?);
    conn.execute("create table t(name text)")?;

    let inner = Arc::clone(&conn);
    let rowid = conn.confined(move || -> Result<i64, SqliteConnectionError> {
        assert!(inner.is_confined());
        inner.execute("insert into t(name) values('nested')")?;
        // a second level of nesting
        inner.confined({
            let again = Arc::clone(&inner);
            move || again.execute("insert into t(name) values('deeper')")
        })??;
        Ok(inner.last_insert_rowid())
    })??;

    assert_eq!(rowid, 2);
    assert_eq!(conn.total_changes(), 2);
    assert!(!conn.is_confined());
    Ok(())
}

#[test]
fn panics_in_confined_work_reach_the_caller() -> Result<(), SqliteConnectionError> {
    let conn = Connection::open_in_memory()?;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = conn.confined(|| -> i32 { panic!("boom") });
    }));
    assert!(outcome.is_err());

    // the lane survived
    conn.execute("create table t(x)")?;
    Ok(())
}

#[test]
fn interrupt_does_not_wait_for_the_lane() -> Result<(), SqliteConnectionError> {
    let conn = Arc::new(Connection::open_in_memory()?);
    let runner = Arc::clone(&conn);
    let query = std::thread::spawn(move || {
        runner.execute(
            "with recursive c(x) as (select 1 union all select x + 1 from c)
             select count(*) from c",
        )
    });

    // keep interrupting until the unbounded query has started and aborted
    let started = Instant::now();
    while !query.is_finished() {
        conn.interrupt();
        assert!(started.elapsed() < Duration::from_secs(10), "query never aborted");
        std::thread::sleep(Duration::from_millis(10));
    }

    let err = query
        .join()
        .expect("query thread panicked")
        .expect_err("statement was interrupted");
    assert_eq!(
        err.engine().map(|e| e.kind()),
        Some(rusqlite::ErrorCode::OperationInterrupted)
    );
    Ok(())
}

#[test]
fn each_connection_has_its_own_lane() -> Result<(), SqliteConnectionError> {
    let a = Connection::open_in_memory()?;
    let b = Arc::new(Connection::open_in_memory()?);
    assert_ne!(a.lane_id(), b.lane_id());

    let other = Arc::clone(&b);
    assert!(!a.confined(move || other.is_confined())?);
    Ok(())
}
