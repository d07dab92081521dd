pub mod db_utils;
pub mod username_cache;
pub mod username_filter;

use sqlx::SqlitePool;

use self::{username_cache::UsernameCache, username_filter::UsernameFilter};

/// Username availability: cuckoo filter for fast negatives, moka cache for
/// fast positives, database for everything in between.
#[derive(Default)]
pub struct UsernameIndex {
    pub filter: UsernameFilter,
    pub cache: UsernameCache,
}

impl UsernameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ok(true)  => username AVAILABLE
    /// Ok(false) => username TAKEN
    pub async fn is_available(&self, username: &str, pool: &SqlitePool) -> Result<bool, sqlx::Error> {
        // 1️⃣ Cuckoo filter: fast negative
        if !self.filter.might_exist(username) {
            return Ok(true);
        }

        // 2️⃣ Moka cache: fast positive
        if self.cache.is_taken(username).await {
            return Ok(false);
        }

        // 3️⃣ Database fallback
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE lower(username) = lower(?) LIMIT 1)",
        )
        .bind(username.trim())
        .fetch_one(pool)
        .await?;

        if exists {
            self.cache.mark_taken(username).await;
        }

        Ok(!exists)
    }

    pub async fn remember(&self, username: &str) {
        self.filter.insert(username);
        self.cache.mark_taken(username).await;
    }

    pub async fn forget(&self, username: &str) {
        self.filter.remove(username);
        self.cache.forget(username).await;
    }
}
