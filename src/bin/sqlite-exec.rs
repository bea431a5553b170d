use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use confined_sqlite::{ConnectionOptionsBuilder, StorageLocation, sqlite_version};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run SQL statements against one SQLite database")]
struct Args {
    /// Database path or `file:` URI; `:memory:` and `""` select the private variants.
    database: String,
    /// Statements to execute, in order.
    #[arg(required = true)]
    sql: Vec<String>,
    #[arg(long)]
    read_only: bool,
    #[arg(long, value_parser = humantime::parse_duration, default_value = "0s")]
    busy_timeout: Duration,
    #[arg(short, long)]
    verbose: bool,
}

fn location_for(database: &str) -> StorageLocation {
    match database {
        StorageLocation::MEMORY_SENTINEL => StorageLocation::InMemory,
        "" => StorageLocation::Temporary,
        other => StorageLocation::named(other),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();
    tracing::debug!("linked against SQLite {}", sqlite_version());

    let conn = match ConnectionOptionsBuilder::new(location_for(&args.database))
        .read_only(args.read_only)
        .busy_timeout(args.busy_timeout)
        .open()
    {
        Ok(conn) => conn,
        Err(err) => {
            tracing::error!("failed to open {}: {err}", args.database);
            return ExitCode::FAILURE;
        }
    };

    for sql in &args.sql {
        if let Err(err) = conn.execute(sql) {
            tracing::error!("{sql}: {err}");
            return ExitCode::FAILURE;
        }
        println!(
            "changes={} total_changes={} last_insert_rowid={}",
            conn.changes(),
            conn.total_changes(),
            conn.last_insert_rowid()
        );
    }

    match conn.close() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("close failed: {err}");
            ExitCode::FAILURE
        }
    }
}
