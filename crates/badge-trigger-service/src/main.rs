//! 徽章触发服务
//!
//! 提供 `POST /api/badges/trigger` 端点，同步完成规则评估、徽章发放与实时通知。

use std::sync::Arc;
use std::time::Duration;

use badge_shared::{
    config::AppConfig, database::Database, observability, pubsub::PubSub,
};
use badge_trigger::{
    AuthPolicy, EventIntake, MIGRATOR, RuleEngine, TriggerService,
    notification::RedisBadgePublisher,
    repository::{PgAwardStore, PgRunRepository},
    routes,
    state::AppState,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "badge-trigger-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 从 config/{service_name}.toml 与 BADGE_ 前缀环境变量加载
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    // 连接池延迟建立：数据库暂不可达时服务照常启动，请求返回 503
    let db = Database::connect_lazy(&config.database)?;
    if config.database.run_migrations {
        db.run_migrations(&MIGRATOR).await?;
        info!("Database migrations applied");
    }

    let pubsub = Arc::new(PubSub::new(&config.redis)?);
    if let Err(e) = pubsub.warm_up().await {
        warn!(error = %e, "Redis 预连接失败，通知将在首次发布时重试连接");
    }

    let policy = AuthPolicy::from_token(config.auth.service_token.clone());
    if policy.is_open() {
        if config.is_production() {
            warn!("生产环境未配置 BADGE_SERVICE_TOKEN，触发接口对所有调用方开放");
        } else {
            info!("未配置服务令牌，触发接口以开放模式运行");
        }
    }

    let engine = RuleEngine::with_defaults(config.trigger.first_compile_max_runs);
    info!(rules = engine.len(), "规则引擎初始化完成");

    let service = TriggerService::new(
        engine,
        Arc::new(PgAwardStore::new(db.pool().clone())),
        Arc::new(PgRunRepository::new(db.pool().clone())),
        Arc::new(RedisBadgePublisher::new(pubsub.clone())),
        Duration::from_millis(config.trigger.operation_timeout_ms),
    );

    let state = AppState::new(Arc::new(service), Arc::new(EventIntake::new(policy)))
        .with_infrastructure(db.clone(), pubsub);

    let app = routes::build_router(
        state,
        Duration::from_secs(config.trigger.request_timeout_seconds),
    );

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM 或 Ctrl+C 时停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 信号处理器注册失败时只记录错误，对应分支永不完成。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
