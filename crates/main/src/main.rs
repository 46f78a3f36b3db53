//! 主应用程序入口
//!
//! 加载配置、装配存储与服务，启动 Axum Web API 和实时中继。

use std::sync::Arc;

use application::{
    services::{MessageService, UserService, UserServiceDependencies},
    Clock, PresenceTable, RelayEngine, RelayEngineDependencies, SessionValidator, SystemClock,
};
use config::AppConfig;
use infrastructure::Infrastructure;
use tracing_subscriber::EnvFilter;
use web_api::{router, trace_layer, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，未设置 RUST_LOG 时默认 info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(backend = ?config.storage.backend, "configuration loaded");

    let infra = Infrastructure::connect(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    // 在线状态只存在于本进程内
    let presence = Arc::new(PresenceTable::new());

    let user_service = UserService::new(UserServiceDependencies {
        user_repository: infra.user_repository.clone(),
        session_repository: infra.session_repository.clone(),
        password_hasher: infra.password_hasher.clone(),
        clock: clock.clone(),
        presence: presence.clone(),
        session_ttl: chrono::Duration::hours(config.session.ttl_hours),
    });
    let message_service = MessageService::new(infra.message_repository.clone());
    let relay = RelayEngine::new(
        RelayEngineDependencies {
            validator: SessionValidator::new(infra.session_repository.clone(), clock),
            message_repository: infra.message_repository.clone(),
            presence,
        },
        &config.relay,
    );

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(message_service),
        Arc::new(relay),
    );

    let app = router(state).layer(trace_layer());
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("消息中继服务启动在 http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}
