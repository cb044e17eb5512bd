use forum_core::{cache::SessionCache, redis::RedisClient};
use redis::AsyncCommands;
use uuid::Uuid;

async fn redis_cache() -> Option<(RedisClient, redis::aio::MultiplexedConnection)> {
    let url = std::env::var("REDIS_URL").ok()?;
    let cache = RedisClient::new(&url).await.ok()?;
    let raw = redis::Client::open(url.as_str())
        .ok()?
        .get_multiplexed_async_connection()
        .await
        .ok()?;
    Some((cache, raw))
}

#[tokio::test]
async fn rate_limit_counts_within_the_window() {
    let Some((cache, _)) = redis_cache().await else {
        eprintln!("skip: no REDIS_URL");
        return;
    };
    let key = format!("vote:{}", Uuid::new_v4());

    assert!(cache.check_rate_limit(&key, 2, 60).await.unwrap());
    assert!(cache.check_rate_limit(&key, 2, 60).await.unwrap());
    assert!(!cache.check_rate_limit(&key, 2, 60).await.unwrap());
}

#[tokio::test]
async fn unreadable_counter_is_an_error() {
    let Some((cache, mut raw)) = redis_cache().await else {
        eprintln!("skip: no REDIS_URL");
        return;
    };
    let key = format!("vote:{}", Uuid::new_v4());
    let _: () = raw.set_ex(&key, "not-a-number", 60).await.unwrap();

    assert!(cache.check_rate_limit(&key, 100, 60).await.is_err());
    let stored: String = raw.get(&key).await.unwrap();
    assert_eq!(stored, "not-a-number");
}

#[tokio::test]
async fn deleted_session_is_gone() {
    let Some((cache, _)) = redis_cache().await else {
        eprintln!("skip: no REDIS_URL");
        return;
    };
    let jti = Uuid::new_v4().to_string();
    let user = Uuid::new_v4().to_string();

    cache.store_session(&jti, &user, 60).await.unwrap();
    assert_eq!(cache.get_session(&jti).await.unwrap(), Some(user));
    cache.delete_session(&jti).await.unwrap();
    assert_eq!(cache.get_session(&jti).await.unwrap(), None);
}
