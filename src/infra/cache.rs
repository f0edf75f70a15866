//! Redis cache.
//!
//! Fixed-window rate limiting, the user profile cache and the distributed
//! lock that keeps a batch from running twice at once.

use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{
    Config, CACHE_PREFIX_LOCK, CACHE_PREFIX_RATE_LIMIT, CACHE_PREFIX_USER,
    DEFAULT_CACHE_TTL_SECONDS,
};
use crate::domain::UserResponse;
use crate::errors::{AppError, AppResult};

/// Increment the window counter, starting the window on first hit.
/// Returns `{count, ttl}`.
const RATE_LIMIT_SCRIPT: &str = r#"
    local count = redis.call("INCR", KEYS[1])
    if count == 1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    local ttl = redis.call("TTL", KEYS[1])
    return {count, ttl}
"#;

/// Delete the lock only if we still own it
const RELEASE_LOCK_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    else
        return 0
    end
"#;

/// Extend the lock only if we still own it
const EXTEND_LOCK_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("EXPIRE", KEYS[1], ARGV[2])
    else
        return 0
    end
"#;

/// Outcome of one rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub count: u64,
    pub limit: u64,
    pub allowed: bool,
    /// Seconds until the window resets
    pub reset_in: u64,
}

impl RateLimitStatus {
    pub fn new(count: u64, limit: u64, ttl: i64) -> Self {
        Self {
            count,
            limit,
            allowed: count <= limit,
            reset_in: ttl.max(1) as u64,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
    default_ttl: u64,
}

impl Cache {
    /// Connect to Redis.
    pub async fn connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self {
            connection,
            default_ttl: DEFAULT_CACHE_TTL_SECONDS,
        })
    }

    /// Round-trip a PING.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }

    // =========================================================================
    // Generic Cache Operations
    // =========================================================================

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(cache_error)?;

        match value {
            Some(json) => {
                let parsed = serde_json::from_str(&json).map_err(|e| {
                    AppError::internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::internal(format!("Cache serialization error: {}", e)))?;

        conn.set_ex::<_, _, ()>(key, json, ttl_seconds)
            .await
            .map_err(cache_error)?;

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await.map_err(cache_error)?;
        Ok(())
    }

    // =========================================================================
    // User Profile Cache
    // =========================================================================

    pub async fn get_user(&self, user_id: &Uuid) -> AppResult<Option<UserResponse>> {
        self.get(&user_key(user_id)).await
    }

    pub async fn set_user(&self, user: &UserResponse) -> AppResult<()> {
        self.set(&user_key(&user.id), user).await
    }

    pub async fn invalidate_user(&self, user_id: &Uuid) -> AppResult<()> {
        self.delete(&user_key(user_id)).await
    }

    // =========================================================================
    // Rate Limiting
    // =========================================================================

    /// Count one request against `identifier`'s current window.
    pub async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<RateLimitStatus> {
        let key = format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier);
        let mut conn = self.connection.clone();

        let (count, ttl): (i64, i64) = redis::Script::new(RATE_LIMIT_SCRIPT)
            .key(&key)
            .arg(window_seconds)
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(RateLimitStatus::new(count.max(0) as u64, max_requests, ttl))
    }

    // =========================================================================
    // Distributed Locks
    // =========================================================================

    /// Take the lock on `resource` if nobody holds it. `None` when held.
    pub async fn try_acquire_lock(
        &self,
        resource: &str,
        ttl_seconds: u64,
    ) -> AppResult<Option<LockGuard>> {
        let key = format!("{}{}", CACHE_PREFIX_LOCK, resource);
        let lock_id = Uuid::new_v4().to_string();
        let mut conn = self.connection.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&lock_id)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;

        if reply.is_none() {
            return Ok(None);
        }

        tracing::debug!(resource = %resource, lock_id = %lock_id, "Lock acquired");
        Ok(Some(LockGuard {
            cache: Arc::new(self.clone()),
            key,
            lock_id,
            released: false,
        }))
    }

    async fn release_lock(&self, key: &str, lock_id: &str) -> AppResult<bool> {
        let mut conn = self.connection.clone();

        let released: i32 = redis::Script::new(RELEASE_LOCK_SCRIPT)
            .key(key)
            .arg(lock_id)
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(released == 1)
    }
}

fn user_key(user_id: &Uuid) -> String {
    format!("{}{}", CACHE_PREFIX_USER, user_id)
}

// =============================================================================
// Lock Guard (RAII)
// =============================================================================

/// Held distributed lock. Released on `release` or, failing that, by a
/// task spawned on drop.
pub struct LockGuard {
    cache: Arc<Cache>,
    key: String,
    lock_id: String,
    released: bool,
}

impl LockGuard {
    pub async fn release(mut self) -> AppResult<()> {
        if !self.released {
            self.released = true;
            if self.cache.release_lock(&self.key, &self.lock_id).await? {
                tracing::debug!(key = %self.key, "Lock released");
            }
        }
        Ok(())
    }

    /// Push the expiry out to `ttl_seconds` from now. False if the lock
    /// expired and someone else took it.
    pub async fn extend(&self, ttl_seconds: u64) -> AppResult<bool> {
        let mut conn = self.cache.connection.clone();

        let extended: i32 = redis::Script::new(EXTEND_LOCK_SCRIPT)
            .key(&self.key)
            .arg(&self.lock_id)
            .arg(ttl_seconds)
            .invoke_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(extended == 1)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(key = %self.key, "Lock dropped outside a runtime; left to expire");
            return;
        };

        let cache = self.cache.clone();
        let key = self.key.clone();
        let lock_id = self.lock_id.clone();

        handle.spawn(async move {
            if let Err(e) = cache.release_lock(&key, &lock_id).await {
                tracing::error!(key = %key, error = %e, "Failed to release lock on drop");
            } else {
                tracing::debug!(key = %key, "Lock released on drop");
            }
        });
    }
}

/// Convert Redis error to AppError.
fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::internal(format!("Cache error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_status_allows_up_to_limit() {
        let at_limit = RateLimitStatus::new(10, 10, 42);
        assert!(at_limit.allowed);
        assert_eq!(at_limit.remaining(), 0);
        assert_eq!(at_limit.reset_in, 42);

        let over = RateLimitStatus::new(11, 10, 42);
        assert!(!over.allowed);
        assert_eq!(over.remaining(), 0);
    }

    #[test]
    fn missing_ttl_reports_at_least_one_second() {
        assert_eq!(RateLimitStatus::new(1, 10, -1).reset_in, 1);
    }

    #[test]
    fn user_keys_are_prefixed() {
        let id = Uuid::nil();
        assert_eq!(user_key(&id), format!("user:{}", id));
    }
}
