use crate::{cache::SessionCache, error::Result};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct RedisClient {
    manager: Arc<Mutex<ConnectionManager>>,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager: Arc::new(Mutex::new(manager)),
        })
    }
}

#[async_trait]
impl SessionCache for RedisClient {
    // Rate limiting
    async fn check_rate_limit(&self, key: &str, limit: u32, window_seconds: usize) -> Result<bool> {
        let mut conn = self.manager.lock().await;

        let current: Option<u32> = conn.get(key).await?;
        let current = current.unwrap_or(0);

        if current >= limit {
            return Ok(false);
        }

        let _: () = conn.incr(key, 1).await?;
        if current == 0 {
            let _: () = conn.expire(key, window_seconds as i64).await?;
        }

        Ok(true)
    }

    // Session management
    async fn store_session(&self, session_id: &str, user_id: &str, ttl_seconds: usize) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let key = format!("session:{}", session_id);

        let _: () = conn.set_ex(key, user_id, ttl_seconds as u64).await?;
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<String>> {
        let mut conn = self.manager.lock().await;
        let key = format!("session:{}", session_id);

        let user_id: Option<String> = conn.get(key).await?;
        Ok(user_id)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let key = format!("session:{}", session_id);

        let _: () = conn.del(key).await?;
        Ok(())
    }
}
