//! Key-value store for short-lived sign-in codes and sessions.
//!
//! The service never caches store contents in process memory; every call goes
//! to Redis. Handlers only see the [`KeyValueStore`] trait so tests can swap in
//! an in-memory store.

use async_trait::async_trait;
use redis::{AsyncCommands, Script, aio::ConnectionManager};
use std::time::Duration;

/// Compare-and-delete in a single server-side step.
///
/// Returns `-1` when the key is absent or empty, `0` on mismatch (key untouched),
/// `1` when the value matched and the key was deleted.
const CONSUME_IF_EQUAL: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current or current == '' then
    return -1
end
if current == ARGV[1] then
    redis.call('DEL', KEYS[1])
    return 1
end
return 0
"#;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result of an atomic compare-and-delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Nothing (or an empty value) stored under the key.
    Missing,
    /// A value is stored but differs; it was left in place.
    Mismatch,
    /// The value matched and has been removed.
    Consumed,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value. `None` keeps it until evicted.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Delete `key` only if it currently holds `expected`, as one atomic step.
    async fn consume_if_equal(&self, key: &str, expected: &str)
    -> Result<ConsumeOutcome, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// Longest expiry ever sent to Redis (100 years). Redis rejects a `PX` whose
/// deadline overflows, so larger lifetimes are capped here.
const MAX_EXPIRY_MILLIS: u64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// `PX` argument for `ttl`, between 1 ms and [`MAX_EXPIRY_MILLIS`].
fn expiry_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis())
        .unwrap_or(u64::MAX)
        .clamp(1, MAX_EXPIRY_MILLIS)
}

/// Redis-backed store sharing one multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    consume_script: Script,
}

impl RedisStore {
    /// Connect to `url` and verify the server answers.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        let store = Self {
            conn,
            consume_script: Script::new(CONSUME_IF_EQUAL),
        };
        store.ping().await?;

        Ok(store)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(expiry_millis(ttl));
        }

        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn consume_if_equal(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<ConsumeOutcome, CacheError> {
        let mut conn = self.conn.clone();
        let outcome: i64 = self
            .consume_script
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;

        Ok(match outcome {
            1 => ConsumeOutcome::Consumed,
            0 => ConsumeOutcome::Mismatch,
            _ => ConsumeOutcome::Missing,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
pub mod memory {
    //! In-process store with the same semantics as [`RedisStore`](super::RedisStore).

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    pub struct MemoryStore {
        entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
        fail: Mutex<bool>,
        fail_writes: Mutex<bool>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent call return an error.
        pub fn fail_all(&self) {
            *self.fail.lock().unwrap() = true;
        }

        /// Make every subsequent `set` return an error; reads and deletes still work.
        pub fn fail_writes(&self) {
            *self.fail_writes.lock().unwrap() = true;
        }

        pub fn keys(&self) -> Vec<String> {
            self.entries.lock().unwrap().keys().cloned().collect()
        }

        fn check(&self) -> Result<(), CacheError> {
            if *self.fail.lock().unwrap() {
                return Err(redis::RedisError::from((redis::ErrorKind::IoError, "store down")).into());
            }
            Ok(())
        }

        fn live(entries: &mut HashMap<String, (String, Option<Instant>)>, key: &str) -> Option<String> {
            let expired = matches!(entries.get(key), Some((_, Some(at))) if *at <= Instant::now());
            if expired {
                entries.remove(key);
            }
            entries.get(key).map(|(value, _)| value.clone())
        }
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
            self.check()?;
            if *self.fail_writes.lock().unwrap() {
                return Err(redis::RedisError::from((redis::ErrorKind::IoError, "write refused")).into());
            }
            let expires_at = ttl.map(|ttl| Instant::now() + ttl);
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), expires_at));
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.check()?;
            Ok(Self::live(&mut self.entries.lock().unwrap(), key))
        }

        async fn consume_if_equal(
            &self,
            key: &str,
            expected: &str,
        ) -> Result<ConsumeOutcome, CacheError> {
            self.check()?;
            let mut entries = self.entries.lock().unwrap();
            match Self::live(&mut entries, key) {
                None => Ok(ConsumeOutcome::Missing),
                Some(current) if current.is_empty() => Ok(ConsumeOutcome::Missing),
                Some(current) if current == expected => {
                    entries.remove(key);
                    Ok(ConsumeOutcome::Consumed)
                }
                Some(_) => Ok(ConsumeOutcome::Mismatch),
            }
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.check()?;
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }

        async fn ping(&self) -> Result<(), CacheError> {
            self.check()
        }
    }
}
