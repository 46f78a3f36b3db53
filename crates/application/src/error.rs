use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::password::PasswordHasherError;
use crate::session::RejectionReason;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("password error: {0}")]
    Password(#[from] PasswordHasherError),
    /// 会话校验失败，连接在任何在线状态或存储变更之前终止
    #[error("authentication failed: {0}")]
    Authentication(RejectionReason),
    #[error("invalid credentials")]
    InvalidCredentials,
}

impl ApplicationError {
    /// 底层存储不可用（区别于"未找到"或约束冲突）
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Repository(RepositoryError::Storage { .. }))
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
