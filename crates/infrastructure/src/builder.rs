use std::sync::Arc;

use application::{
    memory::{MemoryMessageRepository, MemorySessionRepository, MemoryUserRepository},
    MessageRepository, PasswordHasher, SessionRepository, UserRepository,
};
use config::{AppConfig, StorageBackend};
use thiserror::Error;

use crate::{
    migrations::MIGRATOR,
    password::BcryptPasswordHasher,
    repository::{create_pg_pool, PgStorage},
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 按配置装配好的存储和密码哈希
#[derive(Clone)]
pub struct Infrastructure {
    pub user_repository: Arc<dyn UserRepository>,
    pub session_repository: Arc<dyn SessionRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
}

impl Infrastructure {
    /// 根据 `storage.backend` 选择存储；PostgreSQL 会先执行迁移
    pub async fn connect(config: &AppConfig) -> Result<Self, InfrastructureError> {
        let password_hasher = Arc::new(BcryptPasswordHasher::new(config.server.bcrypt_cost));
        match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage, data is lost on restart");
                Ok(Self::in_memory(password_hasher))
            }
            StorageBackend::Postgres => {
                let pool =
                    create_pg_pool(&config.database.url, config.database.max_connections).await?;
                MIGRATOR.run(&pool).await?;
                tracing::info!("database migrations applied");
                Ok(Self::postgres(PgStorage::new(pool), password_hasher))
            }
        }
    }

    pub fn in_memory(password_hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            user_repository: Arc::new(MemoryUserRepository::new()),
            session_repository: Arc::new(MemorySessionRepository::new()),
            message_repository: Arc::new(MemoryMessageRepository::new()),
            password_hasher,
        }
    }

    pub fn postgres(storage: PgStorage, password_hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            user_repository: storage.user_repository,
            session_repository: storage.session_repository,
            message_repository: storage.message_repository,
            password_hasher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_needs_no_database() {
        let config = AppConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Memory);

        let infra = Infrastructure::connect(&config).await.unwrap();
        assert!(infra
            .user_repository
            .find_by_id(domain::UserId::new(1))
            .await
            .unwrap()
            .is_none());
    }
}
