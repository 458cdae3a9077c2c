use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use deadpool_redis::{Config as RedisConfig, Pool, Runtime};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

/// Short-lived storage for password reset codes, keyed by email.
/// A later `put` for the same email replaces the earlier code.
#[async_trait]
pub trait VerificationCodeStore: Send + Sync {
    async fn put(&self, email: &str, code: &str, ttl: Duration) -> Result<()>;
    async fn get(&self, email: &str) -> Result<Option<String>>;
    async fn remove(&self, email: &str) -> Result<()>;
}

// ==============================================================================
// IN-PROCESS STORE
// ==============================================================================

struct StoredCode {
    code: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemoryCodeStore {
    entries: RwLock<HashMap<String, StoredCode>>,
}

impl InMemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationCodeStore for InMemoryCodeStore {
    async fn put(&self, email: &str, code: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, stored| stored.expires_at > now);
        entries.insert(email.to_string(), StoredCode {
            code: code.to_string(),
            expires_at: now + ttl,
        });
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(email)
            .filter(|stored| stored.expires_at > Instant::now())
            .map(|stored| stored.code.clone()))
    }

    async fn remove(&self, email: &str) -> Result<()> {
        self.entries.write().await.remove(email);
        Ok(())
    }
}

// ==============================================================================
// REDIS STORE
// ==============================================================================

pub struct RedisCodeStore {
    pool: Pool,
}

impl RedisCodeStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        let pool = RedisConfig::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| anyhow!("Failed to create Redis pool: {}", e))?;

        Ok(Self { pool })
    }

    fn key(email: &str) -> String {
        format!("reset_code:{}", email)
    }
}

#[async_trait]
impl VerificationCodeStore for RedisCodeStore {
    async fn put(&self, email: &str, code: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.pool.get().await?;
        redis::cmd("SET")
            .arg(Self::key(email))
            .arg(code)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;

        debug!("Stored reset code in Redis");
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<String>> {
        let mut conn = self.pool.get().await?;
        let code: Option<String> = redis::cmd("GET")
            .arg(Self::key(email))
            .query_async(&mut conn)
            .await?;

        Ok(code)
    }

    async fn remove(&self, email: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;
        redis::cmd("DEL")
            .arg(Self::key(email))
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(())
    }
}

/// Redis when `REDIS_URL` is set and usable, otherwise the in-process store.
pub fn code_store_from_config(config: &AppConfig) -> Arc<dyn VerificationCodeStore> {
    match config.redis_url.as_deref() {
        Some(url) => match RedisCodeStore::new(url) {
            Ok(store) => {
                info!("Using Redis for verification codes");
                Arc::new(store)
            }
            Err(e) => {
                warn!("Redis unavailable ({}), keeping verification codes in memory", e);
                Arc::new(InMemoryCodeStore::new())
            }
        },
        None => {
            info!("REDIS_URL not set, keeping verification codes in memory");
            Arc::new(InMemoryCodeStore::new())
        }
    }
}
