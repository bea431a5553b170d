use std::time::{Duration, Instant};

use confined_sqlite::{Connection, SqliteConnectionError};

fn locked_pair() -> Result<(tempfile::TempDir, Connection, Connection), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("busy.db");

    let holder = Connection::open_path(&path, false)?;
    holder.execute("create table t(x integer)")?;
    holder.execute("begin exclusive; insert into t values (1);")?;

    let contender = Connection::open_path(&path, false)?;
    Ok((dir, holder, contender))
}

#[test]
fn zero_timeout_fails_immediately_with_busy() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, holder, contender) = locked_pair()?;
    contender.set_busy_timeout(Duration::ZERO)?;

    let started = Instant::now();
    let err = contender
        .execute("insert into t values (2)")
        .expect_err("database is held exclusively");
    assert!(started.elapsed() < Duration::from_millis(500));
    let engine = err.engine().expect("engine failure");
    assert!(engine.is_busy(), "{engine}");

    holder.execute("commit")?;
    contender.execute("insert into t values (2)")?;
    assert_eq!(contender.changes(), 1);
    Ok(())
}

#[test]
fn configured_timeout_waits_before_reporting_busy() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, holder, contender) = locked_pair()?;
    contender.set_busy_timeout(Duration::from_millis(200))?;
    assert_eq!(contender.busy_timeout(), Duration::from_millis(200));

    let started = Instant::now();
    let err = contender
        .execute("insert into t values (2)")
        .expect_err("lock is never released");
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert!(err.engine().is_some_and(|e| e.is_busy()));

    holder.execute("rollback")?;
    Ok(())
}

#[test]
fn timeout_lets_the_writer_through_once_released() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, holder, contender) = locked_pair()?;
    contender.set_busy_timeout(Duration::from_secs(5))?;

    let writer = std::thread::spawn(move || -> Result<i64, SqliteConnectionError> {
        contender.execute("insert into t values (2)")?;
        Ok(contender.changes())
    });
    std::thread::sleep(Duration::from_millis(100));
    holder.execute("commit")?;

    assert_eq!(writer.join().expect("writer panicked")?, 1);
    Ok(())
}
