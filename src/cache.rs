use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};
use tokio::time::Instant;

use crate::error::{AppError, Result};

/// Session registry and rate-limit counters. Backed by Redis in production
/// and by [`MemoryCache`] when no `REDIS_URL` is configured.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Returns `false` once `key` has been hit `limit` times in the window.
    async fn check_rate_limit(&self, key: &str, limit: u32, window_seconds: usize) -> Result<bool>;
    async fn store_session(&self, session_id: &str, user_id: &str, ttl_seconds: usize) -> Result<()>;
    async fn get_session(&self, session_id: &str) -> Result<Option<String>>;
    async fn delete_session(&self, session_id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryCache {
    sessions: Mutex<HashMap<String, (String, Instant)>>,
    counters: Mutex<HashMap<String, (u32, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Internal("cache lock poisoned".to_string())
}

#[async_trait]
impl SessionCache for MemoryCache {
    async fn check_rate_limit(&self, key: &str, limit: u32, window_seconds: usize) -> Result<bool> {
        let now = Instant::now();
        let mut counters = self.counters.lock().map_err(poisoned)?;
        let entry = counters
            .entry(key.to_string())
            .or_insert((0, now + Duration::from_secs(window_seconds as u64)));

        if entry.1 <= now {
            *entry = (0, now + Duration::from_secs(window_seconds as u64));
        }
        if entry.0 >= limit {
            return Ok(false);
        }
        entry.0 += 1;
        Ok(true)
    }

    async fn store_session(&self, session_id: &str, user_id: &str, ttl_seconds: usize) -> Result<()> {
        let expires = Instant::now() + Duration::from_secs(ttl_seconds as u64);
        self.sessions
            .lock()
            .map_err(poisoned)?
            .insert(session_id.to_string(), (user_id.to_string(), expires));
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<String>> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        match sessions.get(session_id) {
            Some((user_id, expires)) if *expires > Instant::now() => Ok(Some(user_id.clone())),
            Some(_) => {
                sessions.remove(session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.sessions.lock().map_err(poisoned)?.remove(session_id);
        Ok(())
    }
}
