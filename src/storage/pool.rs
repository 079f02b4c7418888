//! Bounded pool of SQLite connections
//!
//! Connections are opened eagerly and handed out through [`PooledConnection`]
//! guards. A guard returns its connection when dropped, so a connection is
//! released on every exit path, including early returns and panics.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StoreError, StoreResult};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Prepared statements kept per connection
const STATEMENT_CACHE_CAPACITY: usize = 64;

/// A fixed-size set of connections to one database
pub struct ConnectionPool {
    idle: Mutex<Vec<Connection>>,
    available: Condvar,
    capacity: usize,
}

impl ConnectionPool {
    /// Opens `capacity` connections to the database file at `path`
    ///
    /// The schema is created on the first connection if needed.
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectionPool)` - All connections opened and configured
    /// * `Err(StoreError)` - A connection could not be opened
    pub fn open(path: &Path, capacity: usize) -> StoreResult<Self> {
        if capacity == 0 {
            return Err(StoreError::EmptyPool);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut connections = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            let conn = Connection::open(path).map_err(|source| StoreError::Open {
                path: path.display().to_string(),
                source,
            })?;
            configure(&conn)?;
            if connections.is_empty() {
                initialize_schema(&conn)?;
            }
            connections.push(conn);
        }

        tracing::debug!(
            "Opened {} connections to {}",
            capacity,
            path.display()
        );

        Ok(Self::from_connections(connections))
    }

    /// Creates a single-connection pool over a private in-memory database
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        initialize_schema(&conn)?;
        Ok(Self::from_connections(vec![conn]))
    }

    fn from_connections(connections: Vec<Connection>) -> Self {
        let capacity = connections.len();
        Self {
            idle: Mutex::new(connections),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Takes a connection, blocking until one is idle
    pub fn acquire(&self) -> PooledConnection<'_> {
        let mut idle = self.lock_idle();
        loop {
            if let Some(conn) = idle.pop() {
                return PooledConnection {
                    pool: self,
                    conn: Some(conn),
                };
            }
            idle = self
                .available
                .wait(idle)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Takes a connection if one is idle right now
    pub fn try_acquire(&self) -> Option<PooledConnection<'_>> {
        self.lock_idle().pop().map(|conn| PooledConnection {
            pool: self,
            conn: Some(conn),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of connections not currently handed out
    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    fn release(&self, conn: Connection) {
        self.lock_idle().push(conn);
        self.available.notify_one();
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<Connection>> {
        // The guarded Vec is never left half-updated, so a poisoned lock is still usable
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn configure(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA temp_store = MEMORY;
    ",
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
    Ok(())
}

/// A connection on loan from a [`ConnectionPool`]
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only taken in drop
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
