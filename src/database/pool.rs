//! Bounded SQLite connection pool with overflow.
//!
//! `get` never blocks: when no idle connection is available a fresh overflow
//! connection is opened. A checked-out connection goes back to the idle set
//! when its guard drops, or is closed if the idle set is already full.

use crate::error::Result;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool of connections to one SQLite database.
pub struct ConnectionPool {
    target: String,
    capacity: usize,
    idle: Mutex<Vec<Connection>>,
    overflow_opened: AtomicU64,
}

impl ConnectionPool {
    /// Open `capacity` connections to `target` (a path or SQLite URI).
    ///
    /// # Errors
    ///
    /// Returns an error if any connection cannot be opened.
    pub fn open(target: impl Into<String>, capacity: usize) -> Result<Self> {
        let target = target.into();
        let idle = (0..capacity)
            .map(|_| open_connection(&target))
            .collect::<Result<Vec<_>>>()?;
        debug!("Opened pool of {} connections to {}", capacity, target);

        Ok(Self {
            target,
            capacity,
            idle: Mutex::new(idle),
            overflow_opened: AtomicU64::new(0),
        })
    }

    /// Check out a connection, opening an overflow one if none is idle.
    ///
    /// # Errors
    ///
    /// Returns an error if an overflow connection cannot be opened.
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        let pooled = self.idle.lock().pop();
        let conn = match pooled {
            Some(conn) => conn,
            None => {
                self.overflow_opened.fetch_add(1, Ordering::Relaxed);
                debug!("Pool exhausted, opening overflow connection");
                open_connection(&self.target)?
            }
        };
        Ok(PooledConnection {
            conn: Some(conn),
            pool: self,
        })
    }

    fn release(&self, conn: Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(conn);
        }
    }

    /// Connections currently idle.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Overflow connections opened so far.
    #[must_use]
    pub fn overflow_opened(&self) -> u64 {
        self.overflow_opened.load(Ordering::Relaxed)
    }

    /// Close every idle connection.
    pub fn close_all(&self) {
        self.idle.lock().clear();
    }
}

fn open_connection(target: &str) -> Result<Connection> {
    let conn = Connection::open(target)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// A checked-out connection, returned to its pool on drop.
pub struct PooledConnection<'a> {
    conn: Option<Connection>,
    pool: &'a ConnectionPool,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    #[allow(clippy::expect_used)]
    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    #[allow(clippy::expect_used)]
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
