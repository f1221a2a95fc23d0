use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use rusqlite::Connection;

pub mod queries;
pub mod schema;

fn configure(conn: &Connection) -> Result<()> {
    // Enable WAL mode
    conn.pragma_update(None, "journal_mode", &"WAL")?;
    conn.pragma_update(None, "synchronous", &"NORMAL")?;
    conn.pragma_update(None, "foreign_keys", &"ON")?;
    Ok(())
}

pub fn init_database(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure(&conn)?;
    schema::create_tables(&conn)?;
    Ok(conn)
}

/// Shared handle to the local store. Query helpers in [`queries`] take a
/// `&Connection`; components go through `with_conn` so the lock never spans
/// an await point.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(init_database(db_path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        f(&conn)
    }
}
