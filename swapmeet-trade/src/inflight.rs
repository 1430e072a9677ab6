//! Cross-instance guard against duplicate submissions of the same action.
//!
//! A key `inflight:{user}:{target}:{action}` is taken with `SET NX EX` for the
//! duration of the handler. The row locks keep data consistent regardless;
//! the guard turns a double-click into a clean `ActionInFlight` instead of a
//! second upload or a confusing no-op.
//!
//! The key is released when the handler finishes, and also when the handler
//! future is dropped early (client disconnect), so a retry is not locked out
//! until the TTL runs down.

use std::future::Future;

use uuid::Uuid;

use swapmeet_shared::clients::redis::RedisClient;
use swapmeet_shared::errors::{AppError, AppResult, ErrorCode};

pub fn inflight_key(user_id: Uuid, target_id: Uuid, action: &str) -> String {
    format!("inflight:{user_id}:{target_id}:{action}")
}

/// Expiring key store backing the guard.
pub trait KeyLock: Clone + Send + Sync + 'static {
    /// `true` when this call took the key.
    fn acquire(&self, key: &str, ttl_secs: u64) -> impl Future<Output = anyhow::Result<bool>> + Send;
    fn release(&self, key: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl KeyLock for RedisClient {
    async fn acquire(&self, key: &str, ttl_secs: u64) -> anyhow::Result<bool> {
        Ok(self.set_nx(key, "1", ttl_secs).await?)
    }

    async fn release(&self, key: &str) -> anyhow::Result<()> {
        Ok(self.del(key).await?)
    }
}

/// A taken key. Dropping it without `release` frees the key in the background.
struct Held<L: KeyLock> {
    lock: L,
    key: Option<String>,
}

impl<L: KeyLock> Held<L> {
    async fn release(mut self) {
        if let Some(key) = self.key.take() {
            free(&self.lock, &key).await;
        }
    }
}

impl<L: KeyLock> Drop for Held<L> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(key = %key, "no runtime to release in-flight key; left to expire");
            return;
        };
        tracing::debug!(key = %key, "request abandoned, releasing in-flight key");
        let lock = self.lock.clone();
        runtime.spawn(async move { free(&lock, &key).await });
    }
}

async fn free<L: KeyLock>(lock: &L, key: &str) {
    if let Err(e) = lock.release(key).await {
        tracing::warn!(key = %key, error = %e, "failed to release in-flight key");
    }
}

/// Run `work` while holding the in-flight key.
///
/// If the lock store is unreachable the work runs unguarded.
pub async fn exclusive<L, T, F>(lock: &L, key: String, ttl_secs: u64, work: F) -> AppResult<T>
where
    L: KeyLock,
    F: Future<Output = AppResult<T>>,
{
    match lock.acquire(&key, ttl_secs).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(key = %key, "duplicate submission rejected");
            return Err(AppError::new(
                ErrorCode::ActionInFlight,
                "this action is already in progress",
            ));
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "in-flight guard unavailable");
            return work.await;
        }
    }

    let held = Held { lock: lock.clone(), key: Some(key) };
    let result = work.await;
    held.release().await;
    result
}
