/// # Test Utilities Module
///
/// Fixtures shared by the unit tests: every fixture owns a fresh temporary
/// directory and a pool over a database file inside it, so tests never see
/// each other's tables.

use crate::config::PoolConfig;
use crate::core::db::Pool;
use crate::core::Result;
use tempfile::TempDir;
use uuid::Uuid;

/// Isolated database pool test fixture
pub struct PoolFixture {
    pub pool: Pool,
    /// Kept alive for as long as the pool uses the database file
    pub dir: TempDir,
}

impl PoolFixture {
    /// Create a fixture with the default pool configuration
    pub fn new() -> Result<Self> {
        Self::with_config(|_| {})
    }

    /// Create a fixture, letting the caller adjust the configuration first
    pub fn with_config(adjust: impl FnOnce(&mut PoolConfig)) -> Result<Self> {
        let dir = TempDir::new()?;
        let path = dir.path().join(format!("test_{}.db", Uuid::new_v4()));
        let mut config = PoolConfig::new("test", "test", &path.to_string_lossy());
        config.max_size = 4;
        adjust(&mut config);
        let pool = Pool::new(config)?;
        Ok(PoolFixture { pool, dir })
    }
}

impl Drop for PoolFixture {
    fn drop(&mut self) {
        self.pool.close();
    }
}
