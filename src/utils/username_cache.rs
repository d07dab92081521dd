use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::SqlitePool;
use std::time::Duration;

/// Recently seen usernames that are known to be taken.
#[derive(Clone)]
pub struct UsernameCache {
    inner: Cache<String, bool>,
}

impl Default for UsernameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl UsernameCache {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(500_000)
                .time_to_live(Duration::from_secs(86400)) // 24h TTL
                .build(),
        }
    }

    pub async fn mark_taken(&self, username: &str) {
        self.inner.insert(username.trim().to_lowercase(), true).await;
    }

    pub async fn is_taken(&self, username: &str) -> bool {
        self.inner
            .get(&username.trim().to_lowercase())
            .await
            .unwrap_or(false)
    }

    pub async fn forget(&self, username: &str) {
        self.inner.invalidate(&username.trim().to_lowercase()).await;
    }

    async fn batch_mark(&self, usernames: &[String]) {
        let inserts: Vec<_> = usernames
            .iter()
            .map(|u| self.inner.insert(u.to_lowercase(), true))
            .collect();

        futures::future::join_all(inserts).await;
    }

    /// Load only RECENT usernames (logged in within `days`), batched.
    pub async fn warmup(&self, pool: &SqlitePool, days: i64, batch_size: usize) -> Result<usize> {
        let since = Utc::now() - ChronoDuration::days(days);

        let mut stream = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT username
            FROM users
            WHERE last_login_at >= ?
            ORDER BY last_login_at DESC
            "#,
        )
        .bind(since)
        .fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let (username,) = row?;
            batch.push(username);
            total += 1;

            if batch.len() >= batch_size {
                self.batch_mark(&batch).await;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.batch_mark(&batch).await;
        }

        tracing::info!(total, days, "Username cache warmup complete");
        Ok(total)
    }
}
