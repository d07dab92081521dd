use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use sqlx::SqlitePool;
use std::sync::{PoisonError, RwLock};

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Probabilistic set of registered usernames. A miss means the name is free.
pub struct UsernameFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for UsernameFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

impl UsernameFilter {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }

    /// Check if a username might exist (false positives possible)
    pub fn might_exist(&self, username: &str) -> bool {
        let username = normalize(username);
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&username)
    }

    pub fn insert(&self, username: &str) {
        let username = normalize(username);
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&username);
    }

    pub fn remove(&self, username: &str) {
        let username = normalize(username);
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&username);
    }

    fn insert_batch(&self, usernames: &[String]) {
        let mut filter = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        for username in usernames {
            filter.add(username);
        }
    }

    /// Load every registered username, streamed in batches.
    pub async fn warmup(&self, pool: &SqlitePool, batch_size: usize) -> Result<usize> {
        let mut stream = sqlx::query_as::<_, (String,)>("SELECT username FROM users").fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let (username,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

            batch.push(normalize(&username));
            total += 1;

            if batch.len() == batch_size {
                self.insert_batch(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_batch(&batch);
        }

        tracing::info!(total, "Username filter warmup complete");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case() {
        let filter = UsernameFilter::new();
        filter.insert("Mario");

        assert!(filter.might_exist("mario"));
        assert!(filter.might_exist("MARIO"));
    }

    #[test]
    fn removed_names_are_free_again() {
        let filter = UsernameFilter::new();
        filter.insert("luigi");
        filter.remove("luigi");

        assert!(!filter.might_exist("luigi"));
    }
}
