// db/db.rs
use sqlx::{Pool, Postgres};

#[derive(Clone)]
pub struct DBClient {
    /// Privileged pool: every write goes through here.
    pub pool: Pool<Postgres>,
    /// Public tier used for anonymous reads. Same pool when no read URL is configured.
    pub read_pool: Pool<Postgres>,
    separate_read_tier: bool,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("separate_read_tier", &self.separate_read_tier)
            .finish()
    }
}

impl DBClient {
    /// Create a new DBClient with a single pool for reads and writes
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient {
            read_pool: pool.clone(),
            pool,
            separate_read_tier: false,
        }
    }

    /// Create a DBClient whose anonymous reads use a separate, less privileged pool
    pub fn with_read_pool(pool: Pool<Postgres>, read_pool: Pool<Postgres>) -> Self {
        DBClient {
            pool,
            read_pool,
            separate_read_tier: true,
        }
    }

    pub fn read_tier_status(&self) -> &str {
        if self.separate_read_tier {
            "separate"
        } else {
            "shared"
        }
    }

    /// (size, idle) of the privileged pool, for monitoring
    pub fn pool_status(&self) -> (u32, usize) {
        (self.pool.size(), self.pool.num_idle())
    }
}
