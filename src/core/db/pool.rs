/// Connection Pool Module
///
/// This module provides a bounded pool of SQLite connections, the RAII guard
/// that returns a connection on every exit path, and the process-wide slot
/// the application installs its pool into at startup.

use crate::config::PoolConfig;
use crate::core::{OrmError, Result};
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex, RwLock};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Process-wide pool slot
///
/// Filled by `create_pool` before the application starts serving requests.
static GLOBAL_POOL: Lazy<RwLock<Option<Pool>>> = Lazy::new(|| RwLock::new(None));

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Connections currently open (idle and checked out)
    pub size: usize,
    /// Connections waiting in the idle set
    pub idle: usize,
    /// Upper bound on open connections
    pub max_size: usize,
}

#[derive(Debug)]
struct PoolState {
    idle: Vec<Connection>,
    open: usize,
    closed: bool,
}

#[derive(Debug)]
struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
    /// Signalled whenever a connection is returned or a slot frees up
    available: Condvar,
}

/// Shared handle to a bounded set of database connections.
///
/// Cloning is cheap; all clones refer to the same pool.
#[derive(Debug, Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Creates a pool and opens `min_size` connections up front.
    ///
    /// # Errors
    ///
    /// `OrmError::Config` when required options are missing and
    /// `OrmError::Database` when a connection cannot be opened.
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "create database connection pool: {}@{}:{}/{} (min {}, max {})",
            config.user.as_deref().unwrap_or_default(),
            config.host,
            config.port,
            config.database_path(),
            config.min_size,
            config.max_size
        );

        let mut idle = Vec::with_capacity(config.max_size);
        for _ in 0..config.min_size {
            idle.push(open_connection(&config)?);
        }
        let open = idle.len();

        Ok(Pool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(PoolState {
                    idle,
                    open,
                    closed: false,
                }),
                available: Condvar::new(),
            }),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Checks out a connection, waiting while the pool is exhausted.
    ///
    /// The connection goes back to the pool when the returned guard drops.
    ///
    /// # Errors
    ///
    /// `PoolClosed` once `close` has run, `AcquireTimeout` when the
    /// configured acquire timeout elapses, `Database` if opening a new
    /// connection fails.
    pub fn acquire(&self) -> Result<PooledConnection> {
        let deadline = self.inner.config.acquire_timeout().map(|t| Instant::now() + t);
        let mut state = self.inner.state.lock();
        loop {
            if state.closed {
                return Err(OrmError::PoolClosed);
            }
            if let Some(conn) = state.idle.pop() {
                debug!("checked out pooled connection ({} idle)", state.idle.len());
                return Ok(self.guard(conn));
            }
            if state.open < self.inner.config.max_size {
                state.open += 1;
                drop(state);
                return match open_connection(&self.inner.config) {
                    Ok(conn) => Ok(self.guard(conn)),
                    Err(e) => {
                        let mut state = self.inner.state.lock();
                        state.open -= 1;
                        self.inner.available.notify_one();
                        Err(e)
                    }
                };
            }
            match deadline {
                Some(deadline) => {
                    if self.inner.available.wait_until(&mut state, deadline).timed_out()
                        && state.idle.is_empty()
                        && state.open >= self.inner.config.max_size
                        && !state.closed
                    {
                        let waited = self.inner.config.acquire_timeout().unwrap_or_default();
                        return Err(OrmError::AcquireTimeout(waited));
                    }
                }
                None => self.inner.available.wait(&mut state),
            }
        }
    }

    /// Releases every idle connection and refuses further checkouts.
    ///
    /// Connections still checked out are closed as their guards drop.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let released = state.idle.len();
        state.open -= released;
        state.idle.clear();
        self.inner.available.notify_all();
        info!("closed database connection pool ({} connections released)", released);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state.lock();
        PoolStatus {
            size: state.open,
            idle: state.idle.len(),
            max_size: self.inner.config.max_size,
        }
    }

    fn guard(&self, conn: Connection) -> PooledConnection {
        PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
        }
    }
}

/// A connection checked out of a `Pool`.
#[derive(Debug)]
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `drop` takes the connection out.
        self.conn.as_ref().unwrap()
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().unwrap()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        let mut state = self.pool.state.lock();
        if state.closed || !conn.is_autocommit() {
            // Closed pool, or a transaction left open by a panic mid-statement:
            // either way the connection is not handed out again.
            state.open -= 1;
            drop(state);
            drop(conn);
        } else {
            state.idle.push(conn);
            debug!("returned pooled connection ({} idle)", state.idle.len());
        }
        self.pool.available.notify_one();
    }
}

/// Opens and configures one SQLite connection.
fn open_connection(config: &PoolConfig) -> Result<Connection> {
    let conn = Connection::open(config.database_path())?;
    conn.busy_timeout(config.busy_timeout())?;
    conn.pragma_update(None, "encoding", config.encoding()?)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!("opened connection to {} (journal_mode={})", config.database_path(), mode);
    Ok(conn)
}

/// Creates the process-wide pool, replacing (and closing) any previous one.
///
/// Must complete before the application begins serving requests.
pub fn create_pool(config: PoolConfig) -> Result<Pool> {
    let pool = Pool::new(config)?;
    let previous = GLOBAL_POOL.write().replace(pool.clone());
    if let Some(previous) = previous {
        previous.close();
    }
    Ok(pool)
}

/// Returns a handle to the process-wide pool.
///
/// # Errors
///
/// `PoolNotInitialized` if `create_pool` has not run (or `close_pool` has).
pub fn global_pool() -> Result<Pool> {
    GLOBAL_POOL
        .read()
        .as_ref()
        .cloned()
        .ok_or(OrmError::PoolNotInitialized)
}

/// Closes and removes the process-wide pool, if any.
pub fn close_pool() {
    if let Some(pool) = GLOBAL_POOL.write().take() {
        pool.close();
    }
}
