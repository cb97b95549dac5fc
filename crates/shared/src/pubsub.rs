//! Redis 发布订阅客户端
//!
//! 进程内只建立一条多路复用连接，所有请求克隆该连接句柄并发使用，
//! 避免每次发布都重新建连。连接断开后由下一次调用触发重连。

use crate::config::RedisConfig;
use crate::error::{BadgeError, Result};
use redis::Client;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Redis 发布订阅客户端
pub struct PubSub {
    client: Client,
    connect_timeout: Duration,
    conn: RwLock<Option<MultiplexedConnection>>,
}

impl PubSub {
    /// 创建客户端（不立即建连）
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self {
            client,
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
            conn: RwLock::new(None),
        })
    }

    /// 获取共享连接，首次调用或连接失效后重新建立
    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        if let Some(conn) = self.conn.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut guard = self.conn.write().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| BadgeError::Timeout {
            operation: "redis connect".to_string(),
        })??;

        info!("Redis multiplexed connection established");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// 丢弃当前连接，下次调用时重连
    async fn reset_conn(&self) {
        let mut guard = self.conn.write().await;
        if guard.take().is_some() {
            warn!("Redis connection reset after error");
        }
    }

    /// 预先建立连接（启动时调用，失败不影响服务启动）
    pub async fn warm_up(&self) -> Result<()> {
        self.get_conn().await.map(|_| ())
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let result = redis::cmd("PING").query_async::<String>(&mut conn).await;
        if result.is_err() {
            self.reset_conn().await;
        }
        result.map(|_| ()).map_err(BadgeError::from)
    }

    /// 向频道发布消息
    ///
    /// 返回收到消息的订阅者数量。没有订阅者时消息直接丢弃，这不是错误。
    #[instrument(skip(self, payload))]
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<i64> {
        let mut conn = self.get_conn().await?;
        let result = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await;

        match result {
            Ok(receivers) => Ok(receivers),
            Err(e) => {
                self.reset_conn().await;
                Err(BadgeError::from(e))
            }
        }
    }
}
