use anyhow::Result;
use rusqlite::{Connection, OpenFlags};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS task_lists (
    id          TEXT PRIMARY KEY CHECK(length(id) > 0),
    title       TEXT NOT NULL CHECK(length(trim(title)) > 0),
    created_at  INTEGER NOT NULL,
    tasks       TEXT NOT NULL DEFAULT '[]' CHECK(json_valid(tasks)),
    revision    INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS task_lists_created_at ON task_lists(created_at);
";

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    set_pragmas(&conn)?;
    Ok(conn)
}

/// Open a database that must already exist. Used by long-lived readers that
/// should not conjure an empty store when the real one is unreachable.
pub fn open_existing(path: &str) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    set_pragmas(&conn)?;
    Ok(conn)
}

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init(&conn)?;
    Ok(conn)
}
